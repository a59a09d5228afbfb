//! System prompts for the reasoning loop and the router, rendered from templates.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::call_parser::{CALL_END, CALL_START};
use crate::registry::{AUTONOMOUS_LOOP, ToolRegistry};

const AGENT_TEMPLATE: &str = include_str!("prompts/agent.md");
const ROUTER_TEMPLATE: &str = include_str!("prompts/router.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("agent", AGENT_TEMPLATE)
            .expect("agent template should be valid");
        env.add_template("router", ROUTER_TEMPLATE)
            .expect("router template should be valid");
        Self { env }
    }

    /// System prompt for the loop, listing the tools of `registry`.
    pub fn agent_prompt(&self, registry: &ToolRegistry, max_turns: u32) -> Result<String> {
        let template = self.env.get_template("agent")?;
        let rendered = template
            .render(context! {
                call_start => CALL_START,
                call_end => CALL_END,
                max_turns => max_turns,
                tools => registry.descriptions(),
            })
            .context("render agent prompt")?;
        debug!(bytes = rendered.len(), "rendered agent prompt");
        Ok(rendered)
    }

    /// Prompt that lets the model either answer or hand off to the loop.
    pub fn router_prompt(&self, registry: &ToolRegistry) -> Result<String> {
        let template = self.env.get_template("router")?;
        let rendered = template
            .render(context! {
                call_start => CALL_START,
                call_end => CALL_END,
                loop_tool => AUTONOMOUS_LOOP,
                tools => registry.descriptions(),
            })
            .context("render router prompt")?;
        debug!(bytes = rendered.len(), "rendered router prompt");
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_prompt_lists_sub_tools_only() {
        let engine = PromptEngine::new();
        let prompt = engine
            .agent_prompt(ToolRegistry::sub_tools(), 7)
            .expect("render");

        assert!(prompt.contains("- create_file(path, content=\"\"): "));
        assert!(prompt.contains("- list_todos(): "));
        assert!(prompt.contains("<tool_code>tool_name("));
        assert!(prompt.contains("at most 7 tool calls"));
        assert!(!prompt.contains(AUTONOMOUS_LOOP));
    }

    #[test]
    fn router_prompt_names_the_loop_tool() {
        let engine = PromptEngine::new();
        let prompt = engine
            .router_prompt(ToolRegistry::master())
            .expect("render");

        assert!(prompt.contains("<tool_code>autonomous_loop(\"the user's request\")</tool_code>"));
        assert!(prompt.contains("- autonomous_loop(task): "));
        assert!(prompt.contains("- execute_shell(command): "));
    }
}
