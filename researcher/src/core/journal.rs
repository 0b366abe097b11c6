//! Append-only logs of per-file problems and missing references.

use std::collections::HashSet;

use crate::core::types::{MissingFileEntry, Phase, ProblemEntry};

/// Per-file failures recorded during a run. Never stops the engine.
#[derive(Debug, Clone, Default)]
pub struct ErrorJournal {
    entries: Vec<ProblemEntry>,
}

impl ErrorJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index.
    pub fn record(&mut self, file: &str, phase: Phase, message: impl Into<String>) -> usize {
        self.entries.push(ProblemEntry {
            file: file.to_string(),
            phase,
            message: message.into(),
            suggestion: None,
        });
        self.entries.len() - 1
    }

    /// Attach a recovery suggestion to an existing entry.
    pub fn attach_suggestion(&mut self, idx: usize, suggestion: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.suggestion = Some(suggestion.into());
        }
    }

    pub fn entries(&self) -> &[ProblemEntry] {
        &self.entries
    }
}

/// Referenced files that could not be located. The first report of a file wins.
#[derive(Debug, Clone, Default)]
pub struct MissingFiles {
    entries: Vec<MissingFileEntry>,
    seen: HashSet<String>,
}

impl MissingFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this is the first report for `file`.
    pub fn record(&mut self, file: &str, source: &str, reason: impl Into<String>) -> bool {
        if !self.seen.insert(file.to_string()) {
            return false;
        }
        self.entries.push(MissingFileEntry {
            file: file.to_string(),
            source: source.to_string(),
            reason: reason.into(),
        });
        true
    }

    pub fn entries(&self) -> &[MissingFileEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_attaches_to_recorded_entry() {
        let mut journal = ErrorJournal::new();
        let idx = journal.record("a.ts", Phase::Oracle, "timeout");
        journal.attach_suggestion(idx, "retry with a smaller prompt");

        let entry = &journal.entries()[0];
        assert_eq!(entry.phase, Phase::Oracle);
        assert_eq!(
            entry.suggestion.as_deref(),
            Some("retry with a smaller prompt")
        );
        assert_eq!(entry.file, "a.ts");
    }

    #[test]
    fn missing_file_keeps_first_source() {
        let mut missing = MissingFiles::new();
        assert!(missing.record("gone.ts", "a.ts", "imported"));
        assert!(!missing.record("gone.ts", "b.ts", "requested"));

        assert_eq!(missing.entries().len(), 1);
        assert_eq!(missing.entries()[0].source, "a.ts");
    }
}
