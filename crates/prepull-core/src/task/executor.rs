//! Task executor trait.
//!
//! Defines the create/wait/delete capability set that the parallel
//! orchestrator drives. Implementations bind it to a control plane, a local
//! process manager, or a test double.

use super::model::TaskId;
use crate::error::Result;
use async_trait::async_trait;

/// The capability set for performing work in a create-wait-delete fashion.
///
/// The orchestrator calls `create` sequentially for every task, then runs
/// one `wait` per task concurrently and calls `delete` for each task whose
/// `wait` returned. Nothing is retried by the caller; retry policy belongs
/// in the implementation.
///
/// # Implementation Notes
///
/// - `wait` has no result: returning means the readiness condition holds.
///   It may never return if readiness is never observed.
/// - When the orchestrator gives up (deadline or cleanup failure) it aborts
///   outstanding `wait` futures at their next `.await`. An implementation
///   that blocks a thread inside `wait` cannot be interrupted that way and
///   keeps running in the background after the orchestration returns.
/// - On any error path, resources already created are left in place.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Creates the resource backing `task`.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Resource created
    /// - `Err(_)`: Creation failed; the orchestration stops immediately
    async fn create(&self, task: &TaskId) -> Result<()>;

    /// Blocks until `task` satisfies its readiness condition.
    async fn wait(&self, task: &TaskId);

    /// Tears down the resource backing `task`.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Resource removed
    /// - `Err(_)`: Cleanup failed; remaining completions are not processed
    async fn delete(&self, task: &TaskId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TaskExecutor for RecordingExecutor {
        async fn create(&self, task: &TaskId) -> Result<()> {
            self.calls.lock().unwrap().push(format!("create {task}"));
            Ok(())
        }

        async fn wait(&self, task: &TaskId) {
            self.calls.lock().unwrap().push(format!("wait {task}"));
        }

        async fn delete(&self, task: &TaskId) -> Result<()> {
            self.calls.lock().unwrap().push(format!("delete {task}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_executor_is_object_safe() {
        let executor: Box<dyn TaskExecutor> = Box::new(RecordingExecutor::default());
        let task = TaskId::from("etcd");

        executor.create(&task).await.unwrap();
        executor.wait(&task).await;
        executor.delete(&task).await.unwrap();
    }

    #[tokio::test]
    async fn test_executor_receives_task_ids() {
        let executor = RecordingExecutor::default();
        let task = TaskId::from("kube-scheduler");

        executor.create(&task).await.unwrap();
        executor.delete(&task).await.unwrap();

        let calls = executor.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec!["create kube-scheduler".to_string(), "delete kube-scheduler".to_string()]
        );
    }
}
