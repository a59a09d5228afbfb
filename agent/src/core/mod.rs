//! Deterministic, pure logic shared by the agent loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod call_parser;
pub mod literal;
pub mod machine;
pub mod transcript;
pub mod types;
