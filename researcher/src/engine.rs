//! Exploration engine: breadth-first research of the file graph reachable from
//! an entry file.
//!
//! The engine owns the work queue, the aspect ledger, the accumulator, the
//! error journal and the missing-file log. Nothing else mutates them. Per-file
//! failures are journaled and never stop the traversal.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::agents::ResearchOracle;
use crate::core::accumulator::ContextAccumulator;
use crate::core::escalation::strip_markers;
use crate::core::journal::{ErrorJournal, MissingFiles};
use crate::core::ledger::AspectLedger;
use crate::core::path::{escapes_base, identifier_under, is_within, normalize_identifier};
use crate::core::report::{ReportBuilder, ReportInput};
use crate::core::types::{
    Aspect, FileRecord, MissingFileEntry, Phase, ProblemEntry, ResearchContext, WorkItem,
};
use crate::io::links::LinkExtractor;

/// Result of a single `step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The queue was empty.
    Idle,
    /// The item's `(file, aspect)` pair was already processed.
    Skipped { file: String, aspect: Aspect },
    /// The file was researched and its record written.
    Researched {
        file: String,
        enqueued: usize,
        missing: usize,
        escalated: bool,
    },
    /// Research failed; the problem was journaled.
    Failed {
        file: String,
        phase: Phase,
        message: String,
    },
}

/// Counters for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: usize,
    pub researched: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct ExplorationEngine<R, L> {
    base_dir: PathBuf,
    canonical_base: Option<PathBuf>,
    excluded: Vec<String>,
    question: String,
    entry: Option<String>,
    oracle: R,
    links: L,
    queue: VecDeque<WorkItem>,
    ledger: AspectLedger,
    accumulator: ContextAccumulator,
    journal: ErrorJournal,
    missing: MissingFiles,
}

impl<R: ResearchOracle, L: LinkExtractor> ExplorationEngine<R, L> {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        question: impl Into<String>,
        oracle: R,
        links: L,
    ) -> Self {
        let base_dir = base_dir.into();
        Self {
            canonical_base: fs::canonicalize(&base_dir).ok(),
            excluded: Vec::new(),
            base_dir,
            question: question.into(),
            entry: None,
            oracle,
            links,
            queue: VecDeque::new(),
            ledger: AspectLedger::new(),
            accumulator: ContextAccumulator::new(),
            journal: ErrorJournal::new(),
            missing: MissingFiles::new(),
        }
    }

    /// Base-relative directories whose files are never enqueued.
    pub fn with_excluded(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded;
        self
    }

    /// Enqueue the entry file for its summary pass.
    pub fn seed(&mut self, entry_file: &str) -> Result<()> {
        let entry = normalize_identifier(entry_file);
        if entry.is_empty() {
            bail!("entry file identifier is empty");
        }
        info!(entry = %entry, "seeding exploration");
        self.entry.get_or_insert_with(|| entry.clone());
        self.queue.push_back(WorkItem::entry(entry));
        Ok(())
    }

    /// Process the head of the queue.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let Some(item) = self.queue.pop_front() else {
            return Ok(StepOutcome::Idle);
        };
        if self.ledger.is_complete(&item.file, item.aspect) {
            debug!(file = %item.file, aspect = %item.aspect, "already processed");
            return Ok(StepOutcome::Skipped {
                file: item.file,
                aspect: item.aspect,
            });
        }

        let context = ResearchContext {
            chain: self.accumulator.chain(),
            parent_file: item.parent_file.clone(),
        };
        let verdict = match self.oracle.research(&item.file, &self.question, &context) {
            Ok(verdict) => verdict,
            Err(err) => return Ok(self.fail_unexpected(&item, &format!("{err:#}"))),
        };

        if let Some(error) = verdict.error.as_deref() {
            return Ok(self.fail_oracle(&item, error));
        }

        let links = match self.links.links(&item.file) {
            Ok(links) => links,
            Err(err) => {
                let message = format!("{err:#}");
                warn!(file = %item.file, err = %message, "link extraction failed");
                self.journal.record(&item.file, Phase::LinkExtraction, message);
                Vec::new()
            }
        };

        let note = match self
            .oracle
            .file_note(&item.file, strip_markers(&verdict.answer), &links)
        {
            Ok(note) => note,
            Err(err) => {
                warn!(file = %item.file, err = %format!("{err:#}"), "file note skipped");
                None
            }
        };
        let record = FileRecord {
            path: item.file.clone(),
            summary: verdict.answer.clone(),
            links: links.clone(),
            parent: item.parent_file.clone(),
            note,
        };
        if let Err(err) = self.accumulator.insert(record) {
            return Ok(self.fail_unexpected(&item, &format!("{err:#}")));
        }
        self.ledger.mark(&item.file, Aspect::Summary);
        self.ledger.mark(&item.file, item.aspect);

        let escalated = verdict.escalated;
        if escalated {
            self.ledger.mark(&item.file, Aspect::Full);
        }
        if verdict.usage_searched {
            self.ledger.mark(&item.file, Aspect::Usage);
        }

        let mut enqueued = 0;
        let mut missing = 0;
        let linked = links
            .iter()
            .map(|link| (link.as_str(), format!("linked from {}", item.file)));
        let requested = verdict.needed_files.iter().map(|needed| {
            (
                needed.as_str(),
                format!("requested while researching {}", item.file),
            )
        });
        for (raw, reason) in linked.chain(requested) {
            let target = match self.identify(raw) {
                Ok(target) => target,
                Err(outside) => {
                    let reason = format!("{reason} (outside the base directory)");
                    if self.missing.record(&outside, &item.file, reason) {
                        debug!(file = %outside, source = %item.file, "reference leaves base dir");
                        missing += 1;
                    }
                    continue;
                }
            };
            if target.is_empty() || self.ledger.is_complete(&target, Aspect::Summary) {
                continue;
            }
            if self.excluded.iter().any(|prefix| is_within(&target, prefix)) {
                debug!(file = %target, source = %item.file, "reference in excluded dir");
                continue;
            }
            if self.exists(&target) {
                self.queue
                    .push_back(WorkItem::discovered(target, item.file.as_str()));
                enqueued += 1;
            } else if self.missing.record(&target, &item.file, reason) {
                debug!(file = %target, source = %item.file, "referenced file missing");
                missing += 1;
            }
        }

        info!(file = %item.file, enqueued, missing, escalated, "researched file");
        Ok(StepOutcome::Researched {
            file: item.file,
            enqueued,
            missing,
            escalated,
        })
    }

    /// Step until the queue is empty, calling `on_step` after every processed item.
    ///
    /// An error from `on_step` aborts the run.
    pub fn run<F>(&mut self, mut on_step: F) -> Result<RunSummary>
    where
        F: FnMut(&StepOutcome, &Self) -> Result<()>,
    {
        let mut summary = RunSummary::default();
        loop {
            let outcome = self.step()?;
            match &outcome {
                StepOutcome::Idle => break,
                StepOutcome::Skipped { .. } => summary.skipped += 1,
                StepOutcome::Researched { .. } => summary.researched += 1,
                StepOutcome::Failed { .. } => summary.failed += 1,
            }
            summary.steps += 1;
            on_step(&outcome, self)?;
        }
        info!(
            steps = summary.steps,
            researched = summary.researched,
            failed = summary.failed,
            skipped = summary.skipped,
            "exploration finished"
        );
        Ok(summary)
    }

    fn fail_oracle(&mut self, item: &WorkItem, error: &str) -> StepOutcome {
        warn!(file = %item.file, err = %error, "oracle reported an error");
        let idx = self.journal.record(&item.file, Phase::Oracle, error);
        match self.oracle.recovery_suggestion(&item.file, error) {
            Ok(Some(suggestion)) => self.journal.attach_suggestion(idx, suggestion),
            Ok(None) => {}
            Err(err) => {
                debug!(file = %item.file, err = %format!("{err:#}"), "no recovery suggestion");
            }
        }
        self.ledger.mark(&item.file, item.aspect);
        StepOutcome::Failed {
            file: item.file.clone(),
            phase: Phase::Oracle,
            message: error.to_string(),
        }
    }

    fn fail_unexpected(&mut self, item: &WorkItem, message: &str) -> StepOutcome {
        warn!(file = %item.file, err = %message, "unexpected fault while researching");
        self.journal.record(&item.file, Phase::Unexpected, message);
        self.ledger.mark(&item.file, item.aspect);
        StepOutcome::Failed {
            file: item.file.clone(),
            phase: Phase::Unexpected,
            message: message.to_string(),
        }
    }

    /// Base-relative identifier for a referenced path.
    ///
    /// `Err` carries the path as written when it points outside the base directory.
    fn identify(&self, raw: &str) -> Result<String, String> {
        let raw = raw.trim();
        let path = Path::new(raw);
        if path.is_absolute() {
            return identifier_under(&self.base_dir, path)
                .or_else(|| {
                    let base = self.canonical_base.as_deref()?;
                    identifier_under(base, path)
                })
                .map(|id| normalize_identifier(&id))
                .filter(|id| !escapes_base(id))
                .ok_or_else(|| raw.replace('\\', "/"));
        }
        let id = normalize_identifier(raw);
        if escapes_base(&id) { Err(id) } else { Ok(id) }
    }

    fn exists(&self, identifier: &str) -> bool {
        self.base_dir.join(identifier).is_file()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub fn records(&self) -> &[FileRecord] {
        self.accumulator.records()
    }

    pub fn problems(&self) -> &[ProblemEntry] {
        self.journal.entries()
    }

    pub fn missing_files(&self) -> &[MissingFileEntry] {
        self.missing.entries()
    }

    pub fn ledger(&self) -> &AspectLedger {
        &self.ledger
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn oracle(&self) -> &R {
        &self.oracle
    }

    /// Report over the current (possibly partial) state.
    pub fn report(&self) -> ReportBuilder<'_> {
        ReportBuilder::new(ReportInput {
            question: &self.question,
            entry: self.entry.as_deref().unwrap_or_default(),
            records: self.accumulator.records(),
            missing: self.missing.entries(),
            problems: self.journal.entries(),
        })
    }
}
