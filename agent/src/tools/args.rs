//! Binding of parsed call arguments to a tool's declared parameters.

use crate::core::types::{Literal, ToolInvocation};
use crate::tools::error::ToolError;

/// One declared parameter. A `default` makes it optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub default: Option<&'static str>,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }
}

/// Arguments bound to parameter names, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgs {
    tool: &'static str,
    values: Vec<(&'static str, Literal)>,
}

impl BoundArgs {
    fn get(&self, name: &str) -> Result<&Literal, ToolError> {
        self.values
            .iter()
            .find(|(param, _)| *param == name)
            .map(|(_, value)| value)
            .ok_or_else(|| {
                ToolError::Argument(format!("{}() has no parameter '{name}'", self.tool))
            })
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        match self.get(name)? {
            Literal::Str(value) => Ok(value),
            other => Err(self.type_error(name, "str", other)),
        }
    }

    /// Integer argument. Numeric strings are accepted too.
    pub fn int(&self, name: &str) -> Result<i64, ToolError> {
        match self.get(name)? {
            Literal::Int(value) => Ok(*value),
            Literal::Str(text) => text
                .trim()
                .parse()
                .map_err(|_| self.type_error(name, "int", &Literal::Str(text.clone()))),
            other => Err(self.type_error(name, "int", other)),
        }
    }

    fn type_error(&self, name: &str, expected: &str, got: &Literal) -> ToolError {
        ToolError::Argument(format!(
            "{}() argument '{name}' must be {expected}, not {}",
            self.tool,
            got.type_name()
        ))
    }
}

/// Bind positional arguments in order, then keyword arguments by name, then defaults.
pub fn bind(
    tool: &'static str,
    params: &'static [Param],
    invocation: &ToolInvocation,
) -> Result<BoundArgs, ToolError> {
    if invocation.args.len() > params.len() {
        return Err(ToolError::Argument(format!(
            "{tool}() takes {} argument{} but {} were given",
            params.len(),
            if params.len() == 1 { "" } else { "s" },
            invocation.args.len()
        )));
    }

    let mut slots: Vec<Option<Literal>> = vec![None; params.len()];
    for (slot, value) in slots.iter_mut().zip(&invocation.args) {
        *slot = Some(value.clone());
    }

    for (key, value) in &invocation.kwargs {
        let Some(idx) = params.iter().position(|p| p.name == key) else {
            return Err(ToolError::Argument(format!(
                "{tool}() got an unexpected keyword argument '{key}'"
            )));
        };
        if slots[idx].is_some() {
            return Err(ToolError::Argument(format!(
                "{tool}() got multiple values for argument '{key}'"
            )));
        }
        slots[idx] = Some(value.clone());
    }

    let mut values = Vec::with_capacity(params.len());
    for (param, slot) in params.iter().zip(slots) {
        let value = match (slot, param.default) {
            (Some(value), _) => value,
            (None, Some(default)) => Literal::Str(default.to_string()),
            (None, None) => {
                return Err(ToolError::Argument(format!(
                    "{tool}() missing required argument '{}'",
                    param.name
                )));
            }
        };
        values.push((param.name, value));
    }
    Ok(BoundArgs { tool, values })
}
