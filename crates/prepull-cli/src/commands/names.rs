use anyhow::Result;
use prepull_core::task::{TaskId, resource_name, selector_label, task_ids};
use prepull_infrastructure::ConfigService;

/// Prints `<component>\t<resource name>\t<selector>` per component.
pub fn print(config: &ConfigService, components: Vec<String>) -> Result<()> {
    let tasks: Vec<TaskId> = if components.is_empty() {
        config.get_config()?.tasks()
    } else {
        task_ids(components)
    };

    for task in &tasks {
        println!("{}\t{}\t{}", task, resource_name(task), selector_label(task));
    }
    Ok(())
}
