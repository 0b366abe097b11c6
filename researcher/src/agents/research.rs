//! Research agent: turns one file plus accumulated context into a verdict.
//!
//! A call starts from the file's structural outline and escalates once to the
//! verbatim file when the answer is inconclusive or the outline is too thin.
//! A usage search requested by the oracle extends the files to review next.

use std::cell::Cell;
use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::core::escalation::{
    EscalationPolicy, FULL_FILE_MARKER, USAGE_SEARCH_MARKER, strip_markers, with_marker,
};
use crate::core::types::{FileNote, ResearchContext, ResearchVerdict, UsageQuery};
use crate::io::content::{ContentProvider, Depth};
use crate::io::executor::Executor;
use crate::io::prompt::{PromptBuilder, ResearchPromptInput};
use crate::io::search::search_usages;

use super::note::NoteAgent;
use super::recovery::RecoveryAgent;
use super::review::{FinalReview, ReviewAgent};
use super::{OracleSettings, ResearchOracle, call_oracle};

pub(crate) const RESEARCH_OUTPUT_SCHEMA: &str =
    include_str!("../../schemas/research_output.schema.json");

/// Oracle output as written to disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResearchOutput {
    answer: String,
    needed_files: Vec<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    usage_query: Option<UsageQuery>,
}

impl From<ResearchOutput> for ResearchVerdict {
    fn from(output: ResearchOutput) -> Self {
        Self {
            // Markers are ours to add; the oracle cannot claim them.
            answer: strip_markers(&output.answer).to_string(),
            needed_files: output.needed_files,
            error: output.error.filter(|e| !e.trim().is_empty()),
            usage_query: output.usage_query,
            escalated: false,
            usage_searched: false,
        }
    }
}

pub struct ResearchAgent<E, C> {
    executor: E,
    content: C,
    settings: OracleSettings,
    policy: EscalationPolicy,
    recovery: Option<RecoveryAgent>,
    notes: Option<NoteAgent>,
    excluded: Vec<String>,
    schema_path: PathBuf,
    calls: Cell<usize>,
}

impl<E: Executor, C: ContentProvider> ResearchAgent<E, C> {
    pub fn new(
        executor: E,
        content: C,
        settings: OracleSettings,
        policy: EscalationPolicy,
    ) -> Self {
        let schema_path = settings.schema_dir().join("research_output.schema.json");
        let calls = Cell::new(settings.last_call_seq());
        Self {
            executor,
            content,
            settings,
            policy,
            recovery: None,
            notes: None,
            excluded: Vec::new(),
            schema_path,
            calls,
        }
    }

    /// Enable recovery suggestions for journaled failures.
    pub fn with_recovery(mut self) -> Self {
        self.recovery = Some(RecoveryAgent::new(&self.settings.schema_dir()));
        self
    }

    /// Enable a note call for every successfully researched file.
    pub fn with_file_notes(mut self) -> Self {
        self.notes = Some(NoteAgent::new(&self.settings.schema_dir()));
        self
    }

    /// Base-relative directories the usage search never descends into.
    pub fn with_excluded(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn next_call_dir(&self, file: &str, kind: &str) -> Result<PathBuf> {
        let seq = self.calls.get() + 1;
        self.calls.set(seq);
        self.settings.call_dir(seq, file, kind)
    }

    /// One oracle round trip. Only artifact and prompt faults are `Err`.
    fn ask(
        &self,
        file: &str,
        question: &str,
        context: &ResearchContext,
        content: &str,
        depth: Depth,
    ) -> Result<ResearchVerdict> {
        let kind = match depth {
            Depth::Shallow => "shallow",
            Depth::Full => "full",
        };
        let call_dir = self.next_call_dir(file, kind)?;
        let prompt = PromptBuilder::new(self.settings.prompt_budget_bytes)
            .build_research(&ResearchPromptInput {
                file,
                question,
                content,
                depth,
                parent_file: context.parent_file.as_deref(),
                chain: &context.chain,
            })?
            .render();

        let output: Result<ResearchOutput> = call_oracle(
            &self.executor,
            &self.settings,
            &call_dir,
            &self.schema_path,
            RESEARCH_OUTPUT_SCHEMA,
            prompt,
        );
        match output {
            Ok(output) => Ok(output.into()),
            Err(err) => {
                warn!(file, depth = kind, err = %format!("{err:#}"), "oracle call failed");
                Ok(ResearchVerdict::failed(format!("{err:#}")))
            }
        }
    }

    fn apply_usage_search(&self, file: &str, verdict: &mut ResearchVerdict) {
        let Some(query) = verdict.usage_query.as_ref() else {
            return;
        };
        match search_usages(&self.settings.workdir, query, &self.excluded) {
            Ok(hits) => {
                debug!(file, hits = hits.len(), "merging usage search results");
                for hit in hits {
                    if !verdict.needed_files.contains(&hit) {
                        verdict.needed_files.push(hit);
                    }
                }
                verdict.answer = with_marker(USAGE_SEARCH_MARKER, &verdict.answer);
                verdict.usage_searched = true;
            }
            Err(err) => {
                warn!(
                    file,
                    pattern = %query.pattern,
                    err = %format!("{err:#}"),
                    "skipping usage search"
                );
            }
        }
    }

    /// Run the three-pass review over the raw `review.md` text.
    pub fn final_review(&self, question: &str, review: &str) -> Result<FinalReview> {
        ReviewAgent::new(&self.settings.schema_dir()).run(
            &self.executor,
            &self.settings,
            |pass| self.next_call_dir("review", pass),
            question,
            review,
        )
    }
}

impl<E: Executor, C: ContentProvider> ResearchOracle for ResearchAgent<E, C> {
    #[instrument(skip_all, fields(file = %file))]
    fn research(
        &self,
        file: &str,
        question: &str,
        context: &ResearchContext,
    ) -> Result<ResearchVerdict> {
        let shallow = self.content.get(file, Depth::Shallow);
        let mut verdict = self.ask(file, question, context, &shallow, Depth::Shallow)?;
        if verdict.is_error() {
            return Ok(verdict);
        }

        if self.policy.should_escalate(&verdict.answer, &shallow) {
            info!(file, "escalating to full file content");
            let full = self.content.get(file, Depth::Full);
            verdict = self.ask(file, question, context, &full, Depth::Full)?;
            if verdict.is_error() {
                return Ok(verdict);
            }
            verdict.answer = with_marker(FULL_FILE_MARKER, &verdict.answer);
            verdict.escalated = true;
        }

        self.apply_usage_search(file, &mut verdict);
        Ok(verdict)
    }

    fn recovery_suggestion(&self, file: &str, error: &str) -> Result<Option<String>> {
        let Some(recovery) = &self.recovery else {
            return Ok(None);
        };
        let call_dir = self.next_call_dir(file, "recovery")?;
        let suggestion = recovery.run(&self.executor, &self.settings, &call_dir, file, error)?;
        Ok(Some(suggestion).filter(|s| !s.is_empty()))
    }

    fn file_note(&self, file: &str, answer: &str, links: &[String]) -> Result<Option<FileNote>> {
        let Some(notes) = &self.notes else {
            return Ok(None);
        };
        let call_dir = self.next_call_dir(file, "note")?;
        let note = notes.run(&self.executor, &self.settings, &call_dir, file, answer, links)?;
        Ok(Some(note))
    }
}
