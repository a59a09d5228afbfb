//! Driver for the multi-turn reasoning loop.

use tracing::{debug, info, instrument, warn};

use crate::core::machine::{LoopError, LoopState, TurnDecision, after_tool_turn, decide};
use crate::core::transcript::Transcript;
use crate::core::types::Event;
use crate::io::model::ModelCaller;
use crate::registry::ToolRegistry;
use crate::tools::{ToolContext, ToolError};

pub const DEFAULT_MAX_TURNS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Tool turns allowed before the loop stops with an error.
    pub max_turns: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

/// Reason why `run_autonomous_loop` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// The model replied without a tool call.
    FinalAnswer { model: String },
    /// No model produced a usable reply.
    ProviderFailure,
    /// The turn budget ran out while the model still wanted tools.
    TurnBudgetExceeded { max_turns: u32 },
}

impl From<LoopError> for LoopStop {
    fn from(err: LoopError) -> Self {
        match err {
            LoopError::ProviderFailure => LoopStop::ProviderFailure,
            LoopError::TurnBudgetExceeded { max_turns } => LoopStop::TurnBudgetExceeded { max_turns },
        }
    }
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    /// Every event, in the order produced. The last one is terminal.
    pub events: Vec<Event>,
    /// Tool turns executed.
    pub turns: u32,
    pub stop: LoopStop,
}

impl LoopOutcome {
    pub fn final_answer(&self) -> Option<&str> {
        match self.stop {
            LoopStop::FinalAnswer { .. } => self.events.last().map(|e| e.content.as_str()),
            _ => None,
        }
    }
}

struct EventLog<F> {
    events: Vec<Event>,
    on_event: F,
}

impl<F: FnMut(&Event)> EventLog<F> {
    fn push(&mut self, event: Event) {
        (self.on_event)(&event);
        self.events.push(event);
    }
}

/// Drive the model through tool calls until it answers, fails, or runs out of turns.
///
/// Tools are dispatched through the sub-tool view, so the loop cannot start
/// itself. Tool and parse failures are fed back to the model as text; only
/// provider failure and the turn budget end the loop early. `on_event` sees
/// each event as it is produced.
#[instrument(skip_all, fields(max_turns = config.max_turns))]
pub fn run_autonomous_loop<M, F>(
    initial_prompt: &str,
    model: &M,
    system_prompt: &str,
    ctx: &ToolContext,
    config: &LoopConfig,
    on_event: F,
) -> LoopOutcome
where
    M: ModelCaller + ?Sized,
    F: FnMut(&Event),
{
    let registry = ToolRegistry::sub_tools();
    let mut transcript = Transcript::new(initial_prompt);
    let mut log = EventLog {
        events: Vec::new(),
        on_event,
    };
    let mut state = LoopState::start();
    let mut turns = 0;

    let stop = loop {
        let turn = match state {
            LoopState::Running { turn } => turn,
            LoopState::DoneFinal { model } => break LoopStop::FinalAnswer { model },
            LoopState::DoneError(err) => break err.into(),
        };

        let prompt = transcript.render_prompt(system_prompt);
        debug!(turn, prompt_bytes = prompt.len(), "requesting model turn");
        let reply = model.call(&prompt);

        match decide(reply.as_ref()) {
            TurnDecision::ProviderFailure => {
                warn!(turn, "model produced no reply");
                let err = LoopError::ProviderFailure;
                log.push(Event::error(err.to_string()));
                state = LoopState::DoneError(err);
            }
            TurnDecision::FinalAnswer { answer, model } => {
                info!(turn, model = %model, "final answer");
                log.push(Event::final_answer(answer, model));
                state = LoopState::DoneFinal {
                    model: model.to_string(),
                };
            }
            TurnDecision::ToolCall {
                thought,
                expression,
                invocation,
            } => {
                if let Some(thought) = thought {
                    log.push(Event::thought(thought));
                }
                log.push(Event::tool_call(expression));
                let output = match &invocation {
                    Ok(invocation) => registry.dispatch(ctx, invocation),
                    Err(err) => {
                        debug!(turn, err = %err, "unparseable tool call");
                        ToolError::Parse(err.clone()).to_result_text()
                    }
                };
                log.push(Event::tool_output(output.as_str()));

                let raw = reply.as_ref().map(|r| r.text.as_str()).unwrap_or_default();
                transcript.record_turn(raw, &output);
                turns = turn + 1;

                state = after_tool_turn(turn, config.max_turns);
                if let LoopState::DoneError(err) = &state {
                    warn!(turns, "turn budget exhausted");
                    log.push(Event::error(err.to_string()));
                }
            }
        }
    };

    LoopOutcome {
        events: log.events,
        turns,
        stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EventKind;
    use crate::test_support::{ScriptedModel, TestWorkspace, call_block};

    fn kinds(outcome: &LoopOutcome) -> Vec<EventKind> {
        outcome.events.iter().map(|e| e.kind).collect()
    }

    fn run(model: &ScriptedModel, ws: &TestWorkspace, max_turns: u32) -> LoopOutcome {
        run_autonomous_loop(
            "task",
            model,
            "SYSTEM",
            ws.ctx(),
            &LoopConfig { max_turns },
            |_| {},
        )
    }

    #[test]
    fn plain_reply_is_a_single_final_answer() {
        let ws = TestWorkspace::new();
        let model = ScriptedModel::answering(&["All done."]);

        let outcome = run(&model, &ws, 7);
        assert_eq!(outcome.events, vec![Event::final_answer("All done.", "scripted-model")]);
        assert_eq!(outcome.turns, 0);
        assert_eq!(
            outcome.stop,
            LoopStop::FinalAnswer {
                model: "scripted-model".to_string()
            }
        );
        assert_eq!(outcome.final_answer(), Some("All done."));
    }

    #[test]
    fn provider_failure_is_terminal() {
        let ws = TestWorkspace::new();
        let model = ScriptedModel::failing();

        let outcome = run(&model, &ws, 7);
        assert_eq!(
            outcome.events,
            vec![Event::error("Agent failed to respond during loop.")]
        );
        assert_eq!(outcome.stop, LoopStop::ProviderFailure);
        assert_eq!(outcome.final_answer(), None);
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn budget_stops_after_max_turns_tool_calls() {
        let ws = TestWorkspace::new();
        let model = ScriptedModel::repeating(&call_block("list_todos()"));

        let outcome = run(&model, &ws, 3);
        assert_eq!(model.calls(), 3);
        assert_eq!(outcome.turns, 3);
        assert_eq!(outcome.stop, LoopStop::TurnBudgetExceeded { max_turns: 3 });
        assert_eq!(
            kinds(&outcome),
            vec![
                EventKind::ToolCall,
                EventKind::ToolOutput,
                EventKind::ToolCall,
                EventKind::ToolOutput,
                EventKind::ToolCall,
                EventKind::ToolOutput,
                EventKind::Error,
            ]
        );
        assert_eq!(
            outcome.events.last().map(|e| e.content.as_str()),
            Some("Agent exceeded maximum turns (3).")
        );
    }

    #[test]
    fn each_prompt_carries_full_history() {
        let ws = TestWorkspace::new();
        let first = format!("Checking.\n{}", call_block("list_todos()"));
        let model = ScriptedModel::answering(&[&first, "Nothing to do."]);

        let outcome = run(&model, &ws, 7);
        assert_eq!(outcome.turns, 1);
        let prompts = model.prompts();
        assert_eq!(
            prompts[0],
            "SYSTEM\n\n**Internal Monologue History:**\nUser task: task"
        );
        assert_eq!(
            prompts[1],
            format!(
                "SYSTEM\n\n**Internal Monologue History:**\nUser task: task\nAI Thought: {first}\nTool Output: No todos found."
            )
        );
    }

    #[test]
    fn thought_precedes_call_and_output() {
        let ws = TestWorkspace::new();
        let first = format!("Let me look.\n{}", call_block("list_directory('.')"));
        let model = ScriptedModel::answering(&[&first, "Empty."]);

        let outcome = run(&model, &ws, 7);
        assert_eq!(
            outcome.events,
            vec![
                Event::thought("Let me look."),
                Event::tool_call("list_directory('.')"),
                Event::tool_output("Directory '.' is empty."),
                Event::final_answer("Empty.", "scripted-model"),
            ]
        );
    }

    #[test]
    fn parse_failure_is_fed_back_and_loop_continues() {
        let ws = TestWorkspace::new();
        let model = ScriptedModel::answering(&[
            &call_block("create_file(path)"),
            "Gave up.",
        ]);

        let outcome = run(&model, &ws, 7);
        assert_eq!(outcome.events.len(), 3);
        assert_eq!(outcome.events[1].kind, EventKind::ToolOutput);
        assert!(
            outcome.events[1]
                .content
                .starts_with("Error executing tool: "),
            "{}",
            outcome.events[1].content
        );
        assert_eq!(outcome.final_answer(), Some("Gave up."));
    }

    #[test]
    fn loop_tool_is_not_available_inside_the_loop() {
        let ws = TestWorkspace::new();
        let model = ScriptedModel::answering(&[&call_block("autonomous_loop('again')"), "ok"]);

        let outcome = run(&model, &ws, 7);
        assert_eq!(
            outcome.events[1].content,
            "Error: Tool 'autonomous_loop' not found in sub-tools."
        );
    }

    #[test]
    fn on_event_sees_events_in_order() {
        let ws = TestWorkspace::new();
        let model = ScriptedModel::answering(&[&call_block("list_todos()"), "Done."]);
        let mut seen = Vec::new();

        let outcome = run_autonomous_loop(
            "task",
            &model,
            "SYSTEM",
            ws.ctx(),
            &LoopConfig::default(),
            |event| seen.push(event.clone()),
        );
        assert_eq!(seen, outcome.events);
    }
}
