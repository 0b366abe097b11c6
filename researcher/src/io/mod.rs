//! I/O helpers for research runs.

pub mod config;
pub mod content;
pub mod executor;
pub mod links;
pub mod output;
pub mod process;
pub mod prompt;
pub mod search;
pub mod terminal;
