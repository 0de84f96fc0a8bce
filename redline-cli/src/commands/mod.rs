//! Command implementations for the Redline CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod compare;
pub mod completions;
