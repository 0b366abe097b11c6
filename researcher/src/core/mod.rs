//! Deterministic, pure logic shared by the researcher.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod accumulator;
pub mod escalation;
pub mod imports;
pub mod journal;
pub mod ledger;
pub mod path;
pub mod report;
pub mod summarize;
pub mod types;
