//! Shared deterministic types for the exploration core.
//!
//! These types define stable contracts between the engine, the oracle adapter,
//! and the report stage. They carry no I/O and serialize deterministically.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Independent unit of research on a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Aspect {
    /// First pass over a file; produces its `FileRecord`.
    Summary,
    /// Deep pass over the verbatim file (recorded when escalation happened).
    Full,
    /// Cross-file usage search (recorded when the oracle requested one).
    Usage,
}

impl Aspect {
    pub fn as_str(self) -> &'static str {
        match self {
            Aspect::Summary => "summary",
            Aspect::Full => "full",
            Aspect::Usage => "usage",
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending unit of work in the engine queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub file: String,
    pub parent_file: Option<String>,
    pub aspect: Aspect,
}

impl WorkItem {
    pub fn entry(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            parent_file: None,
            aspect: Aspect::Summary,
        }
    }

    pub fn discovered(file: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            parent_file: Some(parent.into()),
            aspect: Aspect::Summary,
        }
    }
}

/// Completed research for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub summary: String,
    pub links: Vec<String>,
    /// File this one was discovered from; `None` for the entry file.
    pub parent: Option<String>,
    pub note: Option<FileNote>,
}

/// Reader-facing description of one researched file, written by the oracle
/// from the file's answer and links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNote {
    pub title: String,
    pub explanation: String,
    pub use_case: String,
    pub responsibility: String,
    pub functions_used: Vec<String>,
}

/// One element of the context chain handed to the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    pub file: String,
    pub summary: String,
    pub links: Vec<String>,
}

/// Background for a single research call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchContext {
    /// Previously researched files, in research order.
    pub chain: Vec<ContextEntry>,
    /// File that linked to (or requested) the file under research.
    pub parent_file: Option<String>,
}

/// Cross-file text search requested by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    pub pattern: String,
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default)]
    pub file_types: BTreeSet<String>,
}

/// Structured answer produced once per research call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchVerdict {
    pub answer: String,
    /// Files the oracle wants reviewed next, in the order it listed them.
    pub needed_files: Vec<String>,
    pub error: Option<String>,
    pub usage_query: Option<UsageQuery>,
    /// The answer came from a second pass over the verbatim file.
    pub escalated: bool,
    /// `needed_files` was extended by a usage search.
    pub usage_searched: bool,
}

impl ResearchVerdict {
    /// Verdict used when no structured answer could be obtained.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            answer: FAILED_ANSWER.to_string(),
            needed_files: Vec::new(),
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Answer text attached to verdicts that carry an adapter-level failure.
pub const FAILED_ANSWER: &str = "Sorry, I was unable to research this file.";

/// A referenced file that could not be located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFileEntry {
    pub file: String,
    pub source: String,
    pub reason: String,
}

/// Stage of a step in which a problem was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Oracle,
    LinkExtraction,
    Unexpected,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Oracle => "oracle",
            Phase::LinkExtraction => "link-extraction",
            Phase::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the error journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemEntry {
    pub file: String,
    pub phase: Phase,
    pub message: String,
    pub suggestion: Option<String>,
}
