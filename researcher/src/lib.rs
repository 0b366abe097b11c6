//! Multi-file code research driven by an external reasoning oracle.
//!
//! Starting from an entry file, the researcher walks the file-dependency graph
//! breadth-first, asks the oracle about each file once, escalates to the full
//! file when a shallow answer is inconclusive, and renders everything it learned
//! into a navigable report. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (ledger, accumulator, escalation
//!   policy, import scanning, summarizing, report rendering). No I/O.
//! - **[`io`]**: Side-effecting operations (filesystem, process execution,
//!   prompts, persistence). Isolated behind traits to enable fakes in tests.
//!
//! [`agents`] adapts the oracle process into verdicts, [`engine`] owns the
//! traversal, and [`research`] wires both into a complete run.

pub mod agents;
pub mod core;
pub mod engine;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod research;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
