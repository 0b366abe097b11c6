//! Stable exit codes for the researcher CLI.

/// The run completed and its report was written.
pub const OK: i32 = 0;
/// Unreadable base directory, invalid config, or any fatal error during the run.
pub const INVALID: i32 = 1;
/// The base directory contains no files to start from.
pub const NO_FILES: i32 = 2;
