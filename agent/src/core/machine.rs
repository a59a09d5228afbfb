//! Turn-level state machine for the reasoning loop.
//!
//! The transition functions here are pure: the driver in `agent_loop` feeds
//! them model replies and tool completions, and performs the side effects
//! they ask for.

use crate::core::call_parser::{ParsedResponse, parse_response};
use crate::core::literal::ParseError;
use crate::core::types::{ModelReply, ToolInvocation};

/// Loop-terminal failure. The display text is the content of the final `error` event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    #[error("Agent failed to respond during loop.")]
    ProviderFailure,
    #[error("Agent exceeded maximum turns ({max_turns}).")]
    TurnBudgetExceeded { max_turns: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// `turn` tool turns have completed so far.
    Running { turn: u32 },
    DoneFinal { model: String },
    DoneError(LoopError),
}

impl LoopState {
    pub fn start() -> Self {
        LoopState::Running { turn: 0 }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoopState::Running { .. })
    }
}

/// What the loop must do with one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnDecision<'a> {
    ProviderFailure,
    FinalAnswer {
        answer: &'a str,
        model: &'a str,
    },
    ToolCall {
        thought: Option<&'a str>,
        expression: &'a str,
        invocation: Result<ToolInvocation, ParseError>,
    },
}

/// Classify a model reply. `None` means every backing model failed.
pub fn decide(reply: Option<&ModelReply>) -> TurnDecision<'_> {
    let Some(reply) = reply else {
        return TurnDecision::ProviderFailure;
    };
    if reply.text.trim().is_empty() {
        return TurnDecision::ProviderFailure;
    }
    match parse_response(&reply.text) {
        ParsedResponse::FinalAnswer => TurnDecision::FinalAnswer {
            answer: &reply.text,
            model: &reply.model,
        },
        ParsedResponse::ToolCall {
            thought,
            expression,
            invocation,
        } => TurnDecision::ToolCall {
            thought,
            expression,
            invocation,
        },
    }
}

/// State after the tool for turn `turn` (0-based) has produced its result.
pub fn after_tool_turn(turn: u32, max_turns: u32) -> LoopState {
    let completed = turn + 1;
    if completed >= max_turns {
        return LoopState::DoneError(LoopError::TurnBudgetExceeded { max_turns });
    }
    LoopState::Running { turn: completed }
}
