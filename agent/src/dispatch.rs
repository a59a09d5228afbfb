//! Per-request routing between a direct model answer and the reasoning loop.

use tracing::{debug, info, instrument, warn};

use crate::agent_loop::{LoopConfig, run_autonomous_loop};
use crate::core::call_parser::{ParsedResponse, parse_response};
use crate::core::types::{Event, ModelReply};
use crate::io::config::RouteMode;
use crate::io::model::ModelCaller;
use crate::registry::{AUTONOMOUS_LOOP, RegistryEntry, ToolRegistry};
use crate::tools::ToolContext;

/// Where one request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Answer with this reply, no tools.
    Direct(ModelReply),
    /// Run the reasoning loop on the request.
    Loop,
    /// No model could be reached to decide.
    Unavailable,
}

pub trait RoutingPolicy {
    fn route(&self, prompt: &str, model: &dyn ModelCaller) -> Route;
}

/// Lets the model choose: a reply that calls `autonomous_loop` starts the
/// loop, anything else is the answer.
pub struct SentinelRouting {
    router_prompt: String,
}

impl SentinelRouting {
    pub fn new(router_prompt: impl Into<String>) -> Self {
        Self {
            router_prompt: router_prompt.into(),
        }
    }
}

impl RoutingPolicy for SentinelRouting {
    #[instrument(skip_all)]
    fn route(&self, prompt: &str, model: &dyn ModelCaller) -> Route {
        let full_prompt = format!("{}\n\nUser request: {prompt}", self.router_prompt);
        let Some(reply) = model.call(&full_prompt) else {
            return Route::Unavailable;
        };
        if requests_loop(&reply.text) {
            debug!(model = %reply.model, "model asked for the loop");
            return Route::Loop;
        }
        Route::Direct(reply)
    }
}

/// True when the reply's call block targets the loop entry. A call whose
/// arguments fail to parse still counts if it names the loop.
fn requests_loop(text: &str) -> bool {
    match parse_response(text) {
        ParsedResponse::FinalAnswer => false,
        ParsedResponse::ToolCall {
            invocation: Ok(invocation),
            ..
        } => ToolRegistry::master().lookup(&invocation.name) == Some(RegistryEntry::AutonomousLoop),
        ParsedResponse::ToolCall { expression, .. } => expression
            .strip_prefix(AUTONOMOUS_LOOP)
            .is_some_and(|rest| rest.trim_start().starts_with('(')),
    }
}

/// Same route for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedRouting {
    Loop,
    Direct,
}

impl RoutingPolicy for FixedRouting {
    fn route(&self, prompt: &str, model: &dyn ModelCaller) -> Route {
        match self {
            FixedRouting::Loop => Route::Loop,
            FixedRouting::Direct => model
                .call(prompt)
                .map_or(Route::Unavailable, Route::Direct),
        }
    }
}

/// Build the policy for a configured mode. `router_prompt` is only used by `Auto`.
pub fn policy_for(mode: RouteMode, router_prompt: String) -> Box<dyn RoutingPolicy> {
    match mode {
        RouteMode::Auto => Box::new(SentinelRouting::new(router_prompt)),
        RouteMode::Loop => Box::new(FixedRouting::Loop),
        RouteMode::Direct => Box::new(FixedRouting::Direct),
    }
}

/// Entry point for one user request: route it, then answer or run the loop.
pub struct Dispatcher<'a> {
    pub model: &'a dyn ModelCaller,
    pub policy: &'a dyn RoutingPolicy,
    pub ctx: &'a ToolContext,
    pub system_prompt: &'a str,
    pub loop_config: LoopConfig,
}

impl Dispatcher<'_> {
    /// Handle `prompt` and return its events. The last event is always a
    /// `final_answer` or an `error`.
    #[instrument(skip_all, fields(prompt_bytes = prompt.len()))]
    pub fn handle<F: FnMut(&Event)>(&self, prompt: &str, mut on_event: F) -> Vec<Event> {
        match self.policy.route(prompt, self.model) {
            Route::Direct(reply) => {
                info!(model = %reply.model, "answered directly");
                let event = Event::final_answer(reply.text, reply.model);
                on_event(&event);
                vec![event]
            }
            Route::Unavailable => {
                warn!("no model available for routing");
                let event = Event::error(self.model.unavailable_message());
                on_event(&event);
                vec![event]
            }
            Route::Loop => {
                info!("starting autonomous loop");
                run_autonomous_loop(
                    prompt,
                    self.model,
                    self.system_prompt,
                    self.ctx,
                    &self.loop_config,
                    on_event,
                )
                .events
            }
        }
    }
}
