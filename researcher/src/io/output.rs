//! Persistence of run output: the per-run notes directory and the running
//! document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::agents::review::FinalReview;
use crate::core::report::{ReportBuilder, render_file_note};

pub const REVIEW_FILE: &str = "review.md";
pub const FILES_SUMMARY_FILE: &str = "files-summary.md";
pub const PATH_SUMMARY_FILE: &str = "path-summary.md";
pub const GATHERED_REVIEW_FILE: &str = "review-1.md";
pub const ORGANIZED_REVIEW_FILE: &str = "review-2.md";
pub const FINAL_REVIEW_FILE: &str = "final-review.md";
pub const FILES_DIR: &str = "files";
pub const ORACLE_DIR: &str = "oracle";

const HISTORY_HEADING: &str = "## History";

/// Directory holding everything one run writes: `<notes dir>/<YYYY-MM-DD-HH>/`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    run_dir: PathBuf,
}

impl RunOutput {
    /// Create (or reuse) the run directory for the hour of `now`.
    pub fn create(notes_dir: &Path, now: DateTime<Local>) -> Result<Self> {
        let run_dir = notes_dir.join(now.format("%Y-%m-%d-%H").to_string());
        fs::create_dir_all(run_dir.join(ORACLE_DIR))
            .with_context(|| format!("create run directory {}", run_dir.display()))?;
        info!(run_dir = %run_dir.display(), "created run directory");
        Ok(Self { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn oracle_dir(&self) -> PathBuf {
        self.run_dir.join(ORACLE_DIR)
    }

    /// Write the review, files summary and path summary documents, plus one
    /// note per researched file under `files/`.
    pub fn write_reports(&self, report: &ReportBuilder<'_>) -> Result<()> {
        write_atomic(&self.run_dir.join(REVIEW_FILE), &report.render_review())?;
        write_atomic(
            &self.run_dir.join(FILES_SUMMARY_FILE),
            &report.render_files_summary(),
        )?;
        write_atomic(
            &self.run_dir.join(PATH_SUMMARY_FILE),
            &report.render_path_summary(),
        )?;
        let files_dir = self.run_dir.join(FILES_DIR);
        for record in report.records() {
            let name = format!("{}.md", record.path.replace('/', "-"));
            write_atomic(&files_dir.join(name), &render_file_note(record))?;
        }
        debug!(run_dir = %self.run_dir.display(), "wrote reports");
        Ok(())
    }

    /// Write the three review passes; returns the path of the final one.
    pub fn write_final_review(&self, review: &FinalReview) -> Result<PathBuf> {
        write_atomic(&self.run_dir.join(GATHERED_REVIEW_FILE), &review.gathered)?;
        write_atomic(&self.run_dir.join(ORGANIZED_REVIEW_FILE), &review.organized)?;
        let path = self.run_dir.join(FINAL_REVIEW_FILE);
        write_atomic(&path, &review.final_review)?;
        info!(path = %path.display(), "wrote final review");
        Ok(path)
    }
}

/// A document rewritten in place as the run progresses.
///
/// The body is replaced on every update; the trailing `## History` section is
/// carried over and only ever appended to.
#[derive(Debug, Clone)]
pub struct RunningDocument {
    path: PathBuf,
}

impl RunningDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn update(&self, content: &str, reason: &str) -> Result<()> {
        self.update_at(content, reason, Local::now())
    }

    pub fn update_at(&self, content: &str, reason: &str, at: DateTime<Local>) -> Result<()> {
        let previous = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read running document {}", self.path.display()));
            }
        };

        let mut history = existing_history(&previous)
            .map(|h| h.trim_end().to_string())
            .unwrap_or_else(|| HISTORY_HEADING.to_string());
        history.push_str(&format!("\n- {}: {}", at.to_rfc3339(), single_line(reason)));

        let mut doc = content.trim_end().to_string();
        doc.push_str("\n\n");
        doc.push_str(&history);
        doc.push('\n');
        write_atomic(&self.path, &doc)
    }
}

/// The trailing history section of `doc`, heading included.
fn existing_history(doc: &str) -> Option<&str> {
    if doc.starts_with(HISTORY_HEADING) {
        return Some(doc);
    }
    let marker = format!("\n{HISTORY_HEADING}\n");
    doc.rfind(&marker).map(|idx| &doc[idx + 1..])
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("md.tmp");
    fs::write(&tmp_path, contents).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::ReportInput;
    use crate::core::types::FileRecord;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 17, hour, 30, 0)
            .single()
            .expect("unambiguous time")
    }

    #[test]
    fn run_directory_is_named_by_hour() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = RunOutput::create(&temp.path().join("notes"), at(9)).expect("create");
        assert!(output.run_dir().ends_with("notes/2024-05-17-09"));
        assert!(output.oracle_dir().is_dir());
    }

    #[test]
    fn unwritable_notes_dir_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("notes");
        fs::write(&blocker, "not a directory").expect("write");
        assert!(RunOutput::create(&blocker, at(9)).is_err());
    }

    #[test]
    fn reports_are_written() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = RunOutput::create(temp.path(), at(10)).expect("create");
        let records = vec![FileRecord {
            path: "src/main.ts".to_string(),
            summary: "Starts the app.".to_string(),
            links: vec!["src/util.ts".to_string()],
            parent: None,
            note: None,
        }];
        let report = ReportBuilder::new(ReportInput {
            question: "q",
            entry: "src/main.ts",
            records: &records,
            missing: &[],
            problems: &[],
        });
        output.write_reports(&report).expect("write");
        for name in [REVIEW_FILE, FILES_SUMMARY_FILE, PATH_SUMMARY_FILE] {
            assert!(output.run_dir().join(name).is_file(), "{name}");
        }
        let note = fs::read_to_string(output.run_dir().join(FILES_DIR).join("src-main.ts.md"))
            .expect("file note");
        assert!(note.starts_with("# src/main.ts\n"));
        assert!(note.contains("**Imports:** src/util.ts"));
    }

    #[test]
    fn final_review_writes_every_pass() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = RunOutput::create(temp.path(), at(11)).expect("create");
        let path = output
            .write_final_review(&FinalReview {
                gathered: "gathered".to_string(),
                organized: "organized".to_string(),
                final_review: "final".to_string(),
            })
            .expect("write");
        assert_eq!(path, output.run_dir().join(FINAL_REVIEW_FILE));
        assert_eq!(fs::read_to_string(&path).expect("read"), "final");
        let organized = output.run_dir().join(ORGANIZED_REVIEW_FILE);
        assert_eq!(fs::read_to_string(organized).expect("read"), "organized");
    }

    /// Verifies the body is replaced while history lines accumulate.
    #[test]
    fn running_document_keeps_history() {
        let temp = tempfile::tempdir().expect("tempdir");
        let doc = RunningDocument::new(temp.path().join("notes").join("REVIEW.md"));

        doc.update_at("# First\n", "researched a.ts", at(9)).expect("first");
        doc.update_at("# Second\n", "problem in\nb.ts", at(10)).expect("second");

        let text = fs::read_to_string(doc.path()).expect("read");
        assert!(text.starts_with("# Second\n\n## History\n"));
        assert!(!text.contains("# First"));
        let lines: Vec<&str> = text.lines().filter(|l| l.starts_with("- ")).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(": researched a.ts"));
        assert!(lines[1].ends_with(": problem in b.ts"));
        assert!(lines[0].starts_with("- 2024-05-17T09:30:00"));
    }
}
