#![cfg(unix)]

use prepull_core::config::ProcessConfig;
use prepull_core::task::task_ids;
use prepull_core::{PrepullError, TaskExecutor, TaskId};
use prepull_execution::prepull_in_parallel;
use prepull_infrastructure::ProcessExecutor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const SCRIPT: &str = r#"
if [ "$PREPULL_TASK" = "never-ready" ]; then exec sleep 30; fi
touch "$PREPULL_READY_FILE"
exec sleep 30
"#;

fn executor(temp_dir: &TempDir) -> Arc<ProcessExecutor> {
    Arc::new(ProcessExecutor::new(&ProcessConfig {
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), SCRIPT.to_string()],
        state_dir: Some(temp_dir.path().to_path_buf()),
        poll_interval_ms: 20,
    }))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_prepull_with_processes() {
    let temp_dir = TempDir::new().unwrap();
    let executor = executor(&temp_dir);
    let tasks = task_ids(["etcd", "kube-apiserver", "kube-scheduler"]);

    prepull_in_parallel(executor.clone(), Duration::from_secs(10), &tasks)
        .await
        .expect("all processes should become ready");

    assert_eq!(executor.running(), 0);
    for task in &tasks {
        assert!(!executor.ready_file(task).exists());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_process_that_never_becomes_ready_times_out() {
    let temp_dir = TempDir::new().unwrap();
    let executor = executor(&temp_dir);
    let tasks = task_ids(["etcd", "never-ready"]);

    let err = prepull_in_parallel(executor.clone(), Duration::from_millis(1500), &tasks)
        .await
        .unwrap_err();

    match err {
        PrepullError::TimeoutExceeded { outstanding, .. } => {
            assert_eq!(outstanding, vec![TaskId::from("never-ready")])
        }
        other => panic!("expected timeout, got {other:?}"),
    }

    // The unready process is left for out-of-band cleanup
    assert_eq!(executor.running(), 1);
    executor.delete(&TaskId::from("never-ready")).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_spawn_failure_aborts_before_waiting() {
    let temp_dir = TempDir::new().unwrap();
    let executor = Arc::new(ProcessExecutor::new(&ProcessConfig {
        program: "/nonexistent/prepull-helper".to_string(),
        args: Vec::new(),
        state_dir: Some(temp_dir.path().to_path_buf()),
        poll_interval_ms: 20,
    }));

    let err = prepull_in_parallel(executor.clone(), Duration::from_secs(5), &task_ids(["etcd"]))
        .await
        .unwrap_err();

    assert!(err.is_creation_failed());
    assert_eq!(err.task(), Some(&TaskId::from("etcd")));
}
