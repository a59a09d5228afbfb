//! Name to tool lookup, in the two views the agent exposes.
//!
//! The sub-tool view is what the loop dispatches through. The master view
//! adds `autonomous_loop` for the router, which starts the loop itself; the
//! registry never runs the loop, so a model cannot nest loops.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::types::ToolInvocation;
use crate::tools::{Tool, ToolContext, ToolError};

pub const AUTONOMOUS_LOOP: &str = "autonomous_loop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEntry {
    Tool(Tool),
    AutonomousLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryView {
    SubTools,
    Master,
}

/// Tool listing entry rendered into prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescription {
    pub name: &'static str,
    pub signature: String,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct ToolRegistry {
    view: RegistryView,
    entries: BTreeMap<&'static str, RegistryEntry>,
}

static SUB_TOOLS: LazyLock<ToolRegistry> =
    LazyLock::new(|| ToolRegistry::build(RegistryView::SubTools));
static MASTER: LazyLock<ToolRegistry> = LazyLock::new(|| ToolRegistry::build(RegistryView::Master));

impl ToolRegistry {
    pub fn sub_tools() -> &'static ToolRegistry {
        &SUB_TOOLS
    }

    pub fn master() -> &'static ToolRegistry {
        &MASTER
    }

    fn build(view: RegistryView) -> Self {
        let mut entries: BTreeMap<_, _> = Tool::ALL
            .into_iter()
            .map(|tool| (tool.name(), RegistryEntry::Tool(tool)))
            .collect();
        if view == RegistryView::Master {
            entries.insert(AUTONOMOUS_LOOP, RegistryEntry::AutonomousLoop);
        }
        Self { view, entries }
    }

    pub fn view(&self) -> RegistryView {
        self.view
    }

    /// Case-sensitive exact lookup.
    pub fn lookup(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn descriptions(&self) -> Vec<ToolDescription> {
        self.entries
            .iter()
            .map(|(&name, entry)| match entry {
                RegistryEntry::Tool(tool) => ToolDescription {
                    name,
                    signature: tool.signature(),
                    description: tool.description(),
                },
                RegistryEntry::AutonomousLoop => ToolDescription {
                    name,
                    signature: format!("{AUTONOMOUS_LOOP}(task)"),
                    description: "Hand a multi-step task to the autonomous agent, which works through it with the tools above.",
                },
            })
            .collect()
    }

    /// Run the named tool. Unknown names and the loop entry yield error strings.
    #[instrument(skip_all, fields(tool = %invocation.name, view = ?self.view))]
    pub fn dispatch(&self, ctx: &ToolContext, invocation: &ToolInvocation) -> String {
        match self.lookup(&invocation.name) {
            Some(RegistryEntry::Tool(tool)) => tool.invoke(ctx, invocation),
            Some(RegistryEntry::AutonomousLoop) => {
                debug!("loop entry is not dispatchable");
                ToolError::NotCallable(invocation.name.clone()).to_result_text()
            }
            None => {
                warn!("unknown tool requested");
                let view = match self.view {
                    RegistryView::SubTools => Some("sub-tools"),
                    RegistryView::Master => None,
                };
                ToolError::UnknownTool {
                    name: invocation.name.clone(),
                    view,
                }
                .to_result_text()
            }
        }
    }
}
