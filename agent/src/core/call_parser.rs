//! Extraction of a single tool invocation from raw model output.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::literal::{ParseError, parse_call};
use crate::core::types::ToolInvocation;

pub const CALL_START: &str = "<tool_code>";
pub const CALL_END: &str = "</tool_code>";

static CALL_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "(?s){}(.*?){}",
        regex::escape(CALL_START),
        regex::escape(CALL_END)
    ))
    .expect("tool call block pattern should be valid")
});

/// How one model response should be treated by the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse<'a> {
    /// No complete call block: the whole response is the answer.
    FinalAnswer,
    /// A call block was found. Only the first block is honored.
    ToolCall {
        /// Trimmed narration before the block, when non-empty.
        thought: Option<&'a str>,
        /// Trimmed call expression as written by the model.
        expression: &'a str,
        invocation: Result<ToolInvocation, ParseError>,
    },
}

pub fn parse_response(text: &str) -> ParsedResponse<'_> {
    let Some(caps) = CALL_BLOCK_RE.captures(text) else {
        return ParsedResponse::FinalAnswer;
    };
    let (Some(block), Some(inner)) = (caps.get(0), caps.get(1)) else {
        return ParsedResponse::FinalAnswer;
    };

    let thought = text[..block.start()].trim();
    let expression = strip_code_fence(inner.as_str().trim());
    ParsedResponse::ToolCall {
        thought: (!thought.is_empty()).then_some(thought),
        expression,
        invocation: parse_call(expression),
    }
}

/// Drop a Markdown fence some models wrap around the call.
fn strip_code_fence(expression: &str) -> &str {
    let Some(fenced) = expression.strip_prefix("```") else {
        return expression;
    };
    let body = match fenced.find('\n') {
        Some(idx) => &fenced[idx + 1..],
        None => fenced,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}
