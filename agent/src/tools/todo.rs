//! Todo list tools backed by [`TodoStore`](crate::io::todo_store::TodoStore).

use crate::io::todo_store::TodoStatus;
use crate::tools::{ToolContext, ToolError, ToolResult};

pub fn create_todo(ctx: &ToolContext, task: &str, priority: &str) -> ToolResult {
    let task = task.trim();
    if task.is_empty() {
        return Err(ToolError::Argument(
            "create_todo() task must not be empty".to_string(),
        ));
    }
    let priority = match priority.trim() {
        "" => "medium",
        other => other,
    };
    let item = ctx.todos().add(task, priority)?;
    Ok(format!(
        "Success: Todo #{} '{}' created with {} priority.",
        item.id, item.task, item.priority
    ))
}

pub fn list_todos(ctx: &ToolContext) -> ToolResult {
    let items = ctx.todos().load()?;
    if items.is_empty() {
        return Ok("No todos found.".to_string());
    }
    let mut lines = vec!["Todo list:".to_string()];
    lines.extend(items.iter().map(|item| {
        let mark = match item.status {
            TodoStatus::Pending => ' ',
            TodoStatus::Completed => 'x',
        };
        format!(
            "[{mark}] #{} [{}] {} (created {})",
            item.id,
            item.priority.to_uppercase(),
            item.task,
            item.created
        )
    }));
    Ok(lines.join("\n"))
}

pub fn complete_todo(ctx: &ToolContext, id: i64) -> ToolResult {
    let found = match u64::try_from(id) {
        Ok(id) => ctx.todos().complete(id)?,
        Err(_) => None,
    };
    match found {
        Some(item) => Ok(format!("Success: Todo #{} marked as completed.", item.id)),
        None => Err(ToolError::TodoNotFound(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestWorkspace;

    #[test]
    fn empty_list_message() {
        let ws = TestWorkspace::new();
        assert_eq!(list_todos(ws.ctx()).expect("list"), "No todos found.");
    }

    #[test]
    fn created_todo_is_listed_with_upper_priority() {
        let ws = TestWorkspace::new();
        assert_eq!(
            create_todo(ws.ctx(), "buy milk", "High").expect("create"),
            "Success: Todo #1 'buy milk' created with high priority."
        );

        let listing = list_todos(ws.ctx()).expect("list");
        let mut lines = listing.lines();
        assert_eq!(lines.next(), Some("Todo list:"));
        let line = lines.next().expect("item line");
        assert!(line.starts_with("[ ] #1 [HIGH] buy milk (created "), "{line}");
    }

    #[test]
    fn completed_todo_is_checked() {
        let ws = TestWorkspace::new();
        create_todo(ws.ctx(), "a", "low").expect("create a");
        create_todo(ws.ctx(), "b", "medium").expect("create b");

        assert_eq!(
            complete_todo(ws.ctx(), 2).expect("complete"),
            "Success: Todo #2 marked as completed."
        );
        let listing = list_todos(ws.ctx()).expect("list");
        assert!(listing.contains("[ ] #1 [LOW] a"));
        assert!(listing.contains("[x] #2 [MEDIUM] b"));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let ws = TestWorkspace::new();
        for id in [3, -1] {
            let err = complete_todo(ws.ctx(), id).expect_err("missing");
            assert_eq!(err.to_result_text(), format!("Error: Todo #{id} not found."));
        }
    }

    #[test]
    fn blank_task_is_rejected() {
        let ws = TestWorkspace::new();
        assert!(create_todo(ws.ctx(), "  ", "low").is_err());
        assert!(!ws.root().join("tasks.json").exists());
    }
}
