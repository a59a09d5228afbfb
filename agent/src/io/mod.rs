//! Side-effecting helpers: file system, subprocesses, HTTP, configuration.

pub mod atomic;
pub mod config;
pub mod model;
pub mod process;
pub mod prompt;
pub mod todo_store;
pub mod workspace;
