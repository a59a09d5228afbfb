//! Autonomous tool-calling agent over a confined workspace.
//!
//! A language model is driven turn by turn: each reply either calls one tool
//! or gives the final answer. The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (call parsing, literal
//!   arguments, the turn state machine, the transcript). No I/O.
//! - **[`io`]**: Side-effecting operations (workspace paths, subprocesses,
//!   model HTTP calls, config and todo files).
//!
//! [`tools`] and [`registry`] expose the tool set by name, [`agent_loop`]
//! runs the loop, and [`dispatch`] decides per request whether to run it.

pub mod agent_loop;
pub mod core;
pub mod dispatch;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod registry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
