//! The fixed tool set the model can call.
//!
//! Every tool is total: whatever the arguments, the caller gets a string
//! back. Failures are [`ToolError`]s rendered at [`Tool::invoke`].

use std::time::Duration;

use tracing::{debug, instrument};

use crate::core::types::ToolInvocation;
use crate::io::config::ToolsConfig;
use crate::io::todo_store::{TODO_FILE, TodoStore};
use crate::io::workspace::Workspace;

pub mod args;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod files;
pub mod todo;

use args::{BoundArgs, Param, bind};
pub use error::{ToolError, ToolResult};

/// Limits applied by the subprocess and network tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLimits {
    pub exec_timeout: Duration,
    pub fetch_timeout: Duration,
    pub fetch_preview_chars: usize,
    pub output_limit_bytes: usize,
    pub python: Vec<String>,
    pub shell: Vec<String>,
}

impl ToolLimits {
    pub fn from_config(cfg: &ToolsConfig) -> Self {
        Self {
            exec_timeout: Duration::from_secs(cfg.exec_timeout_secs),
            fetch_timeout: Duration::from_secs(cfg.fetch_timeout_secs),
            fetch_preview_chars: cfg.fetch_preview_chars,
            output_limit_bytes: cfg.output_limit_bytes,
            python: cfg.python.clone(),
            shell: cfg.shell.clone(),
        }
    }
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

/// Everything a tool may touch, passed explicitly into every call.
#[derive(Debug)]
pub struct ToolContext {
    workspace: Workspace,
    todos: TodoStore,
    limits: ToolLimits,
    http: ureq::Agent,
}

impl ToolContext {
    pub fn new(workspace: Workspace, limits: ToolLimits) -> Self {
        let todos = TodoStore::new(workspace.root().join(TODO_FILE));
        let http = ureq::AgentBuilder::new()
            .timeout(limits.fetch_timeout)
            .build();
        Self {
            workspace,
            todos,
            limits,
            http,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn todos(&self) -> &TodoStore {
        &self.todos
    }

    pub fn limits(&self) -> &ToolLimits {
        &self.limits
    }

    pub fn http(&self) -> &ureq::Agent {
        &self.http
    }
}

const CREATE_FILE_PARAMS: &[Param] = &[Param::required("path"), Param::optional("content", "")];
const PATH_PARAMS: &[Param] = &[Param::required("path")];
const LIST_DIRECTORY_PARAMS: &[Param] = &[Param::optional("path", ".")];
const WRITE_TO_FILE_PARAMS: &[Param] = &[
    Param::required("path"),
    Param::required("content"),
    Param::optional("mode", "append"),
];
const EXECUTE_PYTHON_PARAMS: &[Param] = &[Param::required("code")];
const EXECUTE_SHELL_PARAMS: &[Param] = &[Param::required("command")];
const FETCH_URL_PARAMS: &[Param] = &[Param::required("url")];
const ANALYZE_DATA_PARAMS: &[Param] = &[
    Param::required("path"),
    Param::optional("analysis_type", "summary"),
];
const CREATE_TODO_PARAMS: &[Param] = &[
    Param::required("task"),
    Param::optional("priority", "medium"),
];
const COMPLETE_TODO_PARAMS: &[Param] = &[Param::required("todo_id")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    CreateFile,
    CreateFolder,
    ListDirectory,
    ReadFile,
    WriteToFile,
    ExecutePython,
    ExecuteShell,
    FetchUrl,
    AnalyzeData,
    CreateTodo,
    ListTodos,
    CompleteTodo,
}

impl Tool {
    pub const ALL: [Tool; 12] = [
        Tool::CreateFile,
        Tool::CreateFolder,
        Tool::ListDirectory,
        Tool::ReadFile,
        Tool::WriteToFile,
        Tool::ExecutePython,
        Tool::ExecuteShell,
        Tool::FetchUrl,
        Tool::AnalyzeData,
        Tool::CreateTodo,
        Tool::ListTodos,
        Tool::CompleteTodo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::CreateFile => "create_file",
            Tool::CreateFolder => "create_folder",
            Tool::ListDirectory => "list_directory",
            Tool::ReadFile => "read_file",
            Tool::WriteToFile => "write_to_file",
            Tool::ExecutePython => "execute_python",
            Tool::ExecuteShell => "execute_shell",
            Tool::FetchUrl => "fetch_url",
            Tool::AnalyzeData => "analyze_data",
            Tool::CreateTodo => "create_todo",
            Tool::ListTodos => "list_todos",
            Tool::CompleteTodo => "complete_todo",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn params(self) -> &'static [Param] {
        match self {
            Tool::CreateFile => CREATE_FILE_PARAMS,
            Tool::CreateFolder | Tool::ReadFile => PATH_PARAMS,
            Tool::ListDirectory => LIST_DIRECTORY_PARAMS,
            Tool::WriteToFile => WRITE_TO_FILE_PARAMS,
            Tool::ExecutePython => EXECUTE_PYTHON_PARAMS,
            Tool::ExecuteShell => EXECUTE_SHELL_PARAMS,
            Tool::FetchUrl => FETCH_URL_PARAMS,
            Tool::AnalyzeData => ANALYZE_DATA_PARAMS,
            Tool::CreateTodo => CREATE_TODO_PARAMS,
            Tool::ListTodos => &[],
            Tool::CompleteTodo => COMPLETE_TODO_PARAMS,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::CreateFile => {
                "Create a file with the given content, replacing it if it exists. Missing parent folders are created."
            }
            Tool::CreateFolder => {
                "Create a folder and any missing parents. Succeeds if it already exists."
            }
            Tool::ListDirectory => "List the names in a folder, sorted.",
            Tool::ReadFile => "Return the full text of a file.",
            Tool::WriteToFile => {
                "Write content to a file. mode is 'append' (default) or 'overwrite'."
            }
            Tool::ExecutePython => {
                "Run Python code in the workspace with a time limit and return its output."
            }
            Tool::ExecuteShell => {
                "Run a shell command in the workspace with a time limit and return its output."
            }
            Tool::FetchUrl => "Fetch an http(s) URL and return the start of the response body.",
            Tool::AnalyzeData => {
                "Count lines, words and characters in a file. analysis_type: 'summary'."
            }
            Tool::CreateTodo => "Add a task to the todo list. priority: low, medium or high.",
            Tool::ListTodos => "Show every todo with its id, priority and status.",
            Tool::CompleteTodo => "Mark the todo with the given id as completed.",
        }
    }

    /// Call form shown in prompts, e.g. `write_to_file(path, content, mode="append")`.
    pub fn signature(self) -> String {
        let params: Vec<String> = self
            .params()
            .iter()
            .map(|param| match param.default {
                Some(default) => format!("{}={default:?}", param.name),
                None => param.name.to_string(),
            })
            .collect();
        format!("{}({})", self.name(), params.join(", "))
    }

    /// Bind arguments, run the tool, and render the outcome as a result string.
    #[instrument(skip_all, fields(tool = self.name()))]
    pub fn invoke(self, ctx: &ToolContext, invocation: &ToolInvocation) -> String {
        let outcome = bind(self.name(), self.params(), invocation).and_then(|args| self.run(ctx, &args));
        match outcome {
            Ok(output) => {
                debug!(bytes = output.len(), "tool succeeded");
                output
            }
            Err(err) => {
                debug!(err = %err, "tool failed");
                err.to_result_text()
            }
        }
    }

    fn run(self, ctx: &ToolContext, args: &BoundArgs) -> ToolResult {
        match self {
            Tool::CreateFile => files::create_file(ctx, args.str("path")?, args.str("content")?),
            Tool::CreateFolder => files::create_folder(ctx, args.str("path")?),
            Tool::ListDirectory => files::list_directory(ctx, args.str("path")?),
            Tool::ReadFile => files::read_file(ctx, args.str("path")?),
            Tool::WriteToFile => files::write_to_file(
                ctx,
                args.str("path")?,
                args.str("content")?,
                args.str("mode")?,
            ),
            Tool::ExecutePython => exec::execute_python(ctx, args.str("code")?),
            Tool::ExecuteShell => exec::execute_shell(ctx, args.str("command")?),
            Tool::FetchUrl => fetch::fetch_url(ctx, args.str("url")?),
            Tool::AnalyzeData => {
                files::analyze_data(ctx, args.str("path")?, args.str("analysis_type")?)
            }
            Tool::CreateTodo => todo::create_todo(ctx, args.str("task")?, args.str("priority")?),
            Tool::ListTodos => todo::list_todos(ctx),
            Tool::CompleteTodo => todo::complete_todo(ctx, args.int("todo_id")?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::literal::parse_call;
    use crate::test_support::TestWorkspace;

    #[test]
    fn names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(Tool::from_name("Create_File"), None);
    }

    #[test]
    fn parameter_lists_are_static() {
        let counts: Vec<(&str, usize)> = Tool::ALL
            .into_iter()
            .map(|tool| (tool.name(), tool.params().len()))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("create_file", 2),
                ("create_folder", 1),
                ("list_directory", 1),
                ("read_file", 1),
                ("write_to_file", 3),
                ("execute_python", 1),
                ("execute_shell", 1),
                ("fetch_url", 1),
                ("analyze_data", 2),
                ("create_todo", 2),
                ("list_todos", 0),
                ("complete_todo", 1),
            ]
        );
        let params: &'static [Param] = Tool::WriteToFile.params();
        assert_eq!(params[2], Param::optional("mode", "append"));
    }

    #[test]
    fn signatures_show_defaults() {
        assert_eq!(
            Tool::WriteToFile.signature(),
            "write_to_file(path, content, mode=\"append\")"
        );
        assert_eq!(Tool::ListTodos.signature(), "list_todos()");
        assert_eq!(
            Tool::CreateFile.signature(),
            "create_file(path, content=\"\")"
        );
    }

    #[test]
    fn invoke_renders_binding_errors() {
        let ws = TestWorkspace::new();
        let invocation = parse_call("read_file()").expect("parse");
        assert_eq!(
            Tool::ReadFile.invoke(ws.ctx(), &invocation),
            "Error executing tool: read_file() missing required argument 'path'"
        );
    }

    #[test]
    fn invoke_runs_with_defaults() {
        let ws = TestWorkspace::new();
        let invocation = parse_call("create_file('empty.txt')").expect("parse");
        assert_eq!(
            Tool::CreateFile.invoke(ws.ctx(), &invocation),
            "Success: File 'empty.txt' created."
        );
        assert_eq!(ws.read("empty.txt"), "");
    }
}
