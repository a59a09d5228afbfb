//! Shared deterministic types for the agent loop.
//!
//! These types define stable contracts between core components. They carry no
//! I/O and serialize to the event format handed to callers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind tag for a caller-visible loop event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Thought,
    ToolCall,
    ToolOutput,
    FinalAnswer,
    Error,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Thought => "thought",
            EventKind::ToolCall => "tool_call",
            EventKind::ToolOutput => "tool_output",
            EventKind::FinalAnswer => "final_answer",
            EventKind::Error => "error",
        }
    }

    /// `final_answer` and `error` end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, EventKind::FinalAnswer | EventKind::Error)
    }
}

/// One record of loop activity, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub content: String,
    /// Only set on `final_answer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

impl Event {
    fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            model_used: None,
        }
    }

    pub fn thought(content: impl Into<String>) -> Self {
        Self::new(EventKind::Thought, content)
    }

    pub fn tool_call(content: impl Into<String>) -> Self {
        Self::new(EventKind::ToolCall, content)
    }

    pub fn tool_output(content: impl Into<String>) -> Self {
        Self::new(EventKind::ToolOutput, content)
    }

    pub fn final_answer(content: impl Into<String>, model_used: impl Into<String>) -> Self {
        Self {
            model_used: Some(model_used.into()),
            ..Self::new(EventKind::FinalAnswer, content)
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(EventKind::Error, content)
    }
}

/// Text produced by a model together with the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    pub model: String,
}

impl ModelReply {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
        }
    }
}

/// A literal value accepted as a tool argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Short type name used in argument errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::None => "None",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Str(_) => "str",
            Literal::List(_) => "list",
            Literal::Tuple(_) => "tuple",
            Literal::Dict(_) => "dict",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value:?}"),
            Literal::Str(value) => write!(f, "{value:?}"),
            Literal::List(items) => {
                f.write_str("[")?;
                write_items(f, items)?;
                f.write_str("]")
            }
            Literal::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Literal::Dict(entries) => {
                f.write_str("{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Literal]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// A parsed `name(args...)` call taken from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub args: Vec<Literal>,
    /// `key=value` arguments in source order.
    pub kwargs: Vec<(String, Literal)>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, args: Vec<Literal>) -> Self {
        Self {
            name: name.into(),
            args,
            kwargs: Vec::new(),
        }
    }
}
