//! Channel layer for the interactive device shell.
//!
//! Handles reading shell output until a prompt pattern appears,
//! with ANSI stripping and tail-only pattern search.

mod buffer;
mod shell;

pub use buffer::PromptBuffer;
pub use shell::ShellChannel;
