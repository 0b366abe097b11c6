//! Orchestration for one research run: wires the agent, link extractor and
//! engine together and persists the running document and final reports.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, info, instrument, warn};

use crate::agents::OracleSettings;
use crate::agents::research::ResearchAgent;
use crate::core::path::identifier_under;
use crate::engine::{ExplorationEngine, RunSummary, StepOutcome};
use crate::io::config::ResearcherConfig;
use crate::io::content::FsContentProvider;
use crate::io::executor::Executor;
use crate::io::links::ImportLinkExtractor;
use crate::io::output::{RunOutput, RunningDocument};

/// Inputs of a run that do not come from the config file.
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub base_dir: PathBuf,
    /// Entry file, relative to `base_dir`.
    pub entry: String,
    pub question: String,
    /// Overrides `notes_dir` from the config.
    pub notes_dir: Option<PathBuf>,
}

/// Where a finished run left its output.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub run_dir: PathBuf,
    pub running_document: PathBuf,
    pub summary: RunSummary,
    pub problems: usize,
    pub missing: usize,
    /// Final review document, when the review ran and succeeded.
    pub final_review: Option<PathBuf>,
}

/// Research `request.question` starting at `request.entry`.
///
/// Only failing to create the run directory or to persist documents is an
/// error; per-file failures end up in the report.
#[instrument(skip_all, fields(entry = %request.entry))]
pub fn run_research<E: Executor>(
    request: &ResearchRequest,
    cfg: &ResearcherConfig,
    executor: E,
) -> Result<ResearchOutcome> {
    let notes_dir = request.notes_dir.as_deref().unwrap_or(&cfg.notes_dir);
    let output = RunOutput::create(notes_dir, Local::now())?;
    let running = RunningDocument::new(cfg.running_document_in(notes_dir));
    let excluded = excluded_prefixes(&request.base_dir, &[notes_dir, running.path()]);
    if !excluded.is_empty() {
        debug!(excluded = ?excluded, "output paths excluded from exploration");
    }

    let settings = OracleSettings::from_config(cfg, &request.base_dir, &output.oracle_dir());
    let mut agent = ResearchAgent::new(
        executor,
        FsContentProvider::new(&request.base_dir),
        settings,
        cfg.escalation.policy(),
    )
    .with_excluded(excluded.clone());
    if cfg.recovery_suggestions {
        agent = agent.with_recovery();
    }
    if cfg.file_notes {
        agent = agent.with_file_notes();
    }
    let links = ImportLinkExtractor::new(&request.base_dir, cfg.links.probe_suffixes.clone());

    let mut engine = ExplorationEngine::new(&request.base_dir, &request.question, agent, links)
        .with_excluded(excluded);
    engine.seed(&request.entry)?;

    let mut problems_seen = 0;
    let summary = engine.run(|outcome, engine| {
        let mut reasons = Vec::new();
        match outcome {
            StepOutcome::Researched { file, .. } => reasons.push(format!("researched {file}")),
            StepOutcome::Failed { file, phase, .. } => {
                reasons.push(format!("research of {file} failed ({phase})"));
            }
            StepOutcome::Skipped { .. } | StepOutcome::Idle => {}
        }
        let problems = engine.problems().len();
        if problems > problems_seen && !matches!(outcome, StepOutcome::Failed { .. }) {
            for problem in &engine.problems()[problems_seen..] {
                reasons.push(format!("problem in {} ({})", problem.file, problem.phase));
            }
        }
        problems_seen = problems;
        if reasons.is_empty() {
            return Ok(());
        }
        running
            .update(&engine.report().render_review(), &reasons.join("; "))
            .context("update running document")
    })?;

    let report = engine.report();
    output.write_reports(&report)?;
    let review = report.render_review();
    running
        .update(&review, "run complete")
        .context("update running document")?;

    let final_review = if cfg.final_review {
        match engine.oracle().final_review(&request.question, &review) {
            Ok(final_review) => Some(output.write_final_review(&final_review)?),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "final review failed");
                None
            }
        }
    } else {
        None
    };

    info!(
        run_dir = %output.run_dir().display(),
        researched = summary.researched,
        failed = summary.failed,
        "research run complete"
    );
    Ok(ResearchOutcome {
        run_dir: output.run_dir().to_path_buf(),
        running_document: running.path().to_path_buf(),
        summary,
        problems: engine.problems().len(),
        missing: engine.missing_files().len(),
        final_review,
    })
}

/// Base-relative identifiers of output paths that live inside `base_dir`.
fn excluded_prefixes(base_dir: &Path, outputs: &[&Path]) -> Vec<String> {
    let Some(base) = canonical(base_dir) else {
        return Vec::new();
    };
    let mut prefixes = Vec::new();
    for output in outputs {
        if let Some(prefix) = canonical(output).and_then(|path| identifier_under(&base, &path))
            && !prefixes.contains(&prefix)
        {
            prefixes.push(prefix);
        }
    }
    prefixes
}

/// Canonical form of `path`, resolving through its parent when it does not exist yet.
fn canonical(path: &Path) -> Option<PathBuf> {
    if let Ok(path) = fs::canonicalize(path) {
        return Some(path);
    }
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let parent = match parent {
        Some(parent) => fs::canonicalize(parent).ok()?,
        None => std::env::current_dir().ok()?,
    };
    Some(parent.join(path.file_name()?))
}

/// Files directly inside `base_dir`, sorted, for entry-file selection.
pub fn list_entry_candidates(base_dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(base_dir)
        .with_context(|| format!("read directory {}", base_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", base_dir.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        if file_type.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{SAMPLE_TS, ScriptedExecutor, ScriptedResponse, write_file};
    use serde_json::json;

    #[test]
    fn entry_candidates_are_sorted_files_only() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_file(temp.path(), "b.ts", "");
        write_file(temp.path(), "a.ts", "");
        write_file(temp.path(), "nested/c.ts", "");

        let files = list_entry_candidates(temp.path()).expect("list");
        assert_eq!(files, vec!["a.ts", "b.ts"]);
    }

    /// Verifies a run with no oracle responses still produces every report.
    #[test]
    fn failing_oracle_still_produces_reports() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().join("repo");
        write_file(&base, "main.ts", "import x from './x';\n");
        let notes = temp.path().join("notes");
        let request = ResearchRequest {
            base_dir: base.clone(),
            entry: "main.ts".to_string(),
            question: "What does main do?".to_string(),
            notes_dir: Some(notes.clone()),
        };

        let outcome =
            run_research(&request, &ResearcherConfig::default(), ScriptedExecutor::default())
                .expect("run");

        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.problems, 1);
        assert_eq!(outcome.running_document, notes.join("REVIEW.md"));
        let review = fs::read_to_string(outcome.run_dir.join("review.md")).expect("review");
        assert!(review.contains("- **main.ts** (oracle): no scripted response left"));
        let running = fs::read_to_string(&outcome.running_document).expect("running");
        assert!(running.contains("research of main.ts failed (oracle)"));
        assert!(running.contains(": run complete"));
        assert!(outcome.run_dir.join("path-summary.md").is_file());
        assert!(outcome.run_dir.join("files-summary.md").is_file());
    }

    /// Verifies a usage search never sends the run's own artifacts back to the oracle.
    #[test]
    fn notes_inside_base_are_not_researched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().join("repo");
        write_file(&base, "Sample.ts", SAMPLE_TS);
        let request = ResearchRequest {
            base_dir: base.clone(),
            entry: "Sample.ts".to_string(),
            question: "How are users loaded?".to_string(),
            notes_dir: Some(base.join("notes")),
        };
        let cfg = ResearcherConfig {
            file_notes: false,
            ..ResearcherConfig::default()
        };
        let executor = ScriptedExecutor::new(vec![ScriptedResponse::Json(json!({
            "answer": "Defines getUser.",
            "neededFiles": ["notes/REVIEW.md"],
            "error": null,
            "usageQuery": {"pattern": "getUser\\(", "flags": null, "fileTypes": []}
        }))]);

        let outcome = run_research(&request, &cfg, executor).expect("run");

        assert_eq!(outcome.summary.researched, 1);
        assert_eq!(outcome.summary.failed, 0);
        assert_eq!(outcome.problems, 0);
        let files = fs::read_to_string(outcome.run_dir.join("files-summary.md")).expect("files");
        assert!(!files.contains("notes/"));
        // The unresolved ./other import is the only missing file.
        assert_eq!(outcome.missing, 1);
    }

    #[test]
    fn excluded_prefixes_cover_outputs_inside_base() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().join("repo");
        fs::create_dir_all(base.join("out").join("notes")).expect("mkdir");
        let elsewhere = temp.path().join("notes");
        fs::create_dir_all(&elsewhere).expect("mkdir");

        let notes = base.join("out").join("notes");
        let live = base.join("LIVE.md");
        let prefixes = excluded_prefixes(&base, &[&notes, &live, &elsewhere, &notes]);
        assert_eq!(prefixes, vec!["out/notes", "LIVE.md"]);
    }

    /// Verifies the opt-in final review writes all three passes after the reports.
    #[test]
    fn final_review_runs_when_enabled() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().join("repo");
        write_file(&base, "Sample.ts", SAMPLE_TS);
        let request = ResearchRequest {
            base_dir: base.clone(),
            entry: "Sample.ts".to_string(),
            question: "How are users loaded?".to_string(),
            notes_dir: Some(temp.path().join("notes")),
        };
        let cfg = ResearcherConfig {
            file_notes: false,
            final_review: true,
            ..ResearcherConfig::default()
        };
        let executor = ScriptedExecutor::new(vec![
            ScriptedResponse::Json(json!({"answer": "Defines getUser.", "neededFiles": []})),
            ScriptedResponse::Json(json!({"markdown": "gathered"})),
            ScriptedResponse::Json(json!({"markdown": "organized"})),
            ScriptedResponse::Json(json!({"markdown": "# Final"})),
        ]);

        let outcome = run_research(&request, &cfg, executor).expect("run");

        let path = outcome.final_review.expect("final review");
        assert_eq!(fs::read_to_string(path).expect("read"), "# Final");
        assert!(outcome.run_dir.join("review-1.md").is_file());
        assert!(outcome.run_dir.join("review-2.md").is_file());
    }

    #[test]
    fn failed_final_review_keeps_the_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().join("repo");
        write_file(&base, "Sample.ts", SAMPLE_TS);
        let request = ResearchRequest {
            base_dir: base,
            entry: "Sample.ts".to_string(),
            question: "q".to_string(),
            notes_dir: Some(temp.path().join("notes")),
        };
        let cfg = ResearcherConfig {
            file_notes: false,
            final_review: true,
            ..ResearcherConfig::default()
        };
        let executor = ScriptedExecutor::new(vec![ScriptedResponse::Json(
            json!({"answer": "Defines getUser.", "neededFiles": []}),
        )]);

        let outcome = run_research(&request, &cfg, executor).expect("run");
        assert_eq!(outcome.final_review, None);
        assert!(outcome.run_dir.join("review.md").is_file());
    }
}
