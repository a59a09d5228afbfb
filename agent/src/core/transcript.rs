//! Loop-local conversation history used to re-prompt the model each turn.

pub const HISTORY_HEADER: &str = "**Internal Monologue History:**";

/// Append-only record of one loop run. The model is stateless, so every
/// turn re-sends the full transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<String>,
}

impl Transcript {
    pub fn new(task: &str) -> Self {
        Self {
            entries: vec![format!("User task: {task}")],
        }
    }

    /// Record one tool turn: the raw model output and the tool result it produced.
    pub fn record_turn(&mut self, model_output: &str, tool_output: &str) {
        self.entries.push(format!("AI Thought: {model_output}"));
        self.entries.push(format!("Tool Output: {tool_output}"));
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Full prompt for the next turn.
    pub fn render_prompt(&self, system_prompt: &str) -> String {
        format!(
            "{system_prompt}\n\n{HISTORY_HEADER}\n{}",
            self.entries.join("\n")
        )
    }
}
