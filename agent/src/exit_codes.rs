//! Stable exit codes for agent CLI commands.

/// Command succeeded, or the run ended with a final answer.
pub const OK: i32 = 0;
/// Invalid invocation, config, or workspace.
pub const INVALID: i32 = 1;
/// `agent run` ended with an `error` event.
pub const AGENT_ERROR: i32 = 2;
