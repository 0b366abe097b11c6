//! Append-only, insertion-ordered record of researched files.

use std::collections::HashSet;

use anyhow::{Result, anyhow};

use crate::core::types::{ContextEntry, FileRecord};

#[derive(Debug, Clone, Default)]
pub struct ContextAccumulator {
    records: Vec<FileRecord>,
    written: HashSet<String>,
}

impl ContextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Writing the same path twice is a bookkeeping fault.
    pub fn insert(&mut self, record: FileRecord) -> Result<()> {
        if !self.written.insert(record.path.clone()) {
            return Err(anyhow!("record for {} already written", record.path));
        }
        self.records.push(record);
        Ok(())
    }

    /// Records in the order they were written.
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Snapshot of the current state as an oracle context chain.
    pub fn chain(&self) -> Vec<ContextEntry> {
        self.records
            .iter()
            .map(|record| ContextEntry {
                file: record.path.clone(),
                summary: record.summary.clone(),
                links: record.links.clone(),
            })
            .collect()
    }
}
