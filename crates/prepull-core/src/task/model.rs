//! Task domain model.
//!
//! Identifiers are caller supplied and compared as plain strings. The
//! prefixed resource name exists only to address the underlying resource.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix prepended to every task identifier to form its resource name.
pub const PREPULL_PREFIX: &str = "upgrade-prepull-";

/// Label key carrying the resource name, used by readiness selectors.
pub const PREPULL_LABEL_KEY: &str = "k8s-app";

/// An opaque, unique identifier for one task (e.g. a component name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespaced name of the resource backing this task.
    pub fn resource_name(&self) -> String {
        resource_name(self)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps a task identifier to its resource name by prepending [`PREPULL_PREFIX`].
///
/// The same string is used as the resource name and as the value of its
/// [`PREPULL_LABEL_KEY`] label, so creation, readiness lookup and deletion
/// all address one resource.
pub fn resource_name(task: &TaskId) -> String {
    format!("{}{}", PREPULL_PREFIX, task.as_str())
}

/// Label selector matching the resource created for `task`.
pub fn selector_label(task: &TaskId) -> String {
    format!("{}={}", PREPULL_LABEL_KEY, resource_name(task))
}

/// Converts a list of component names into task identifiers, keeping order.
pub fn task_ids<I, S>(components: I) -> Vec<TaskId>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    components.into_iter().map(TaskId::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_resource_name_prepends_prefix() {
        let task = TaskId::from("kube-apiserver");
        assert_eq!(resource_name(&task), "upgrade-prepull-kube-apiserver");
        assert_eq!(task.resource_name(), resource_name(&task));
    }

    #[test]
    fn test_selector_label_uses_resource_name() {
        let task = TaskId::from("etcd");
        assert_eq!(selector_label(&task), "k8s-app=upgrade-prepull-etcd");
    }

    #[test]
    fn test_resource_name_is_injective() {
        let tasks = task_ids(["etcd", "kube-apiserver", "kube-scheduler", "a", "aa", ""]);
        let names: HashSet<_> = tasks.iter().map(resource_name).collect();
        assert_eq!(names.len(), tasks.len());
    }

    #[test]
    fn test_task_ids_preserve_order() {
        let tasks = task_ids(vec!["b".to_string(), "a".to_string()]);
        assert_eq!(tasks, vec![TaskId::from("b"), TaskId::from("a")]);
    }

    #[test]
    fn test_task_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&TaskId::from("etcd")).unwrap();
        assert_eq!(json, "\"etcd\"");
    }
}
