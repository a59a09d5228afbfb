use crate::core::literal::ParseError;
use crate::io::workspace::PathViolation;

/// Tool-level failure. Never leaves the tool boundary: it is rendered to the
/// result string the model sees on its next turn.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Path(#[from] PathViolation),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Argument(String),
    #[error("Tool '{name}' not found{}.", .view.map(|v| format!(" in {v}")).unwrap_or_default())]
    UnknownTool {
        name: String,
        view: Option<&'static str>,
    },
    #[error("'{0}' is started by the dispatcher and cannot be called as a tool.")]
    NotCallable(String),
    #[error("File '{0}' not found.")]
    FileNotFound(String),
    #[error("'{0}' is not a directory.")]
    NotADirectory(String),
    #[error("Invalid mode '{0}'. Use 'append' or 'overwrite'.")]
    InvalidMode(String),
    #[error("Execution timed out after {0} seconds.")]
    Timeout(u64),
    #[error("{0}")]
    Fetch(String),
    #[error("Analysis type '{0}' is not implemented.")]
    UnsupportedAnalysis(String),
    #[error("Todo #{0} not found.")]
    TodoNotFound(i64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    /// Result string handed back to the model.
    pub fn to_result_text(&self) -> String {
        match self {
            ToolError::Parse(_) | ToolError::Argument(_) => format!("Error executing tool: {self}"),
            ToolError::Fetch(_) => format!("Error fetching URL: {self}"),
            _ => format!("Error: {self}"),
        }
    }
}

pub type ToolResult = Result<String, ToolError>;
