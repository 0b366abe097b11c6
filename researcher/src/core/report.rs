//! Pure rendering of accumulated research into markdown documents.
//!
//! Rendering borrows engine state read-only and never mutates it, so the same
//! inputs always produce byte-identical output. Partial state (mid-run) renders
//! the same way as final state.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use crate::core::types::{FileRecord, MissingFileEntry, ProblemEntry};

const NONE: &str = "none";

/// Borrowed view of everything a report is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub question: &'a str,
    pub entry: &'a str,
    pub records: &'a [FileRecord],
    pub missing: &'a [MissingFileEntry],
    pub problems: &'a [ProblemEntry],
}

/// Reverse-dependency index: for each file, the researched files linking to it.
///
/// Sources are listed in research order, each at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseIndex {
    used_by: HashMap<String, Vec<String>>,
}

impl ReverseIndex {
    pub fn build(records: &[FileRecord]) -> Self {
        let mut used_by: HashMap<String, Vec<String>> = HashMap::new();
        for record in records {
            let mut seen = HashSet::new();
            for link in &record.links {
                if !seen.insert(link.as_str()) {
                    continue;
                }
                used_by
                    .entry(link.clone())
                    .or_default()
                    .push(record.path.clone());
            }
        }
        Self { used_by }
    }

    pub fn used_by(&self, file: &str) -> &[String] {
        self.used_by.get(file).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct ReportBuilder<'a> {
    input: ReportInput<'a>,
    reverse: ReverseIndex,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(input: ReportInput<'a>) -> Self {
        let reverse = ReverseIndex::build(input.records);
        Self { input, reverse }
    }

    pub fn reverse_index(&self) -> &ReverseIndex {
        &self.reverse
    }

    pub fn records(&self) -> &'a [FileRecord] {
        self.input.records
    }

    /// The review document: overview, chain map, per-file summaries, missing
    /// files and problems.
    pub fn render_review(&self) -> String {
        let mut out = String::new();
        self.write_overview(&mut out);
        self.write_chain_map(&mut out);
        self.write_file_summaries(&mut out);
        self.write_missing(&mut out);
        self.write_problems(&mut out);
        out
    }

    /// Every researched file with its note (or its answer when it has none) and
    /// imports, in research order.
    pub fn render_files_summary(&self) -> String {
        let mut out = String::from("# Files Summary\n\n");
        let _ = writeln!(out, "Question: {}\n", self.input.question);
        if self.input.records.is_empty() {
            out.push_str("_No files researched._\n");
            return out;
        }
        for record in self.input.records {
            write_file_entry(&mut out, record, "##");
        }
        out
    }

    /// Traversal order with the file each step was reached from.
    pub fn render_path_summary(&self) -> String {
        let mut out = String::from("# Path Summary\n\n");
        let _ = writeln!(out, "Question: {}", self.input.question);
        let _ = writeln!(out, "Entry file: **{}**\n", self.input.entry);
        if self.input.records.is_empty() {
            out.push_str("_No files researched._\n");
            return out;
        }
        for (idx, record) in self.input.records.iter().enumerate() {
            let _ = writeln!(out, "## {}. {}\n", idx + 1, record.path);
            match &record.parent {
                Some(parent) => {
                    let _ = writeln!(out, "Reached from: {parent}\n");
                }
                None => out.push_str("Reached from: (entry)\n\n"),
            }
            let _ = writeln!(out, "{}\n", record.summary.trim_end());
        }
        out
    }

    fn write_overview(&self, out: &mut String) {
        out.push_str("# General Overview\n\n");
        let _ = writeln!(out, "Question: {}\n", self.input.question);
        for record in self.input.records {
            let _ = writeln!(
                out,
                "- **{}** imports/links to: {} | used by: {}",
                record.path,
                join_or_none(&record.links),
                join_or_none(self.reverse.used_by(&record.path)),
            );
        }
        if !self.input.records.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "Entry file: **{}**.\n", self.input.entry);
    }

    fn write_chain_map(&self, out: &mut String) {
        out.push_str("# Code Chain Map\n\n");
        if self.input.records.is_empty() {
            out.push_str("_No files researched._\n\n");
            return;
        }
        for record in self.input.records {
            let _ = writeln!(out, "- **{}**", record.path);
            for link in &record.links {
                let _ = writeln!(out, "  - links to: {link}");
            }
            let used_by = self.reverse.used_by(&record.path);
            if !used_by.is_empty() {
                let _ = writeln!(out, "  - used by: {}", used_by.join(", "));
            }
        }
        out.push('\n');
    }

    fn write_file_summaries(&self, out: &mut String) {
        out.push_str("# File Summaries\n\n");
        if self.input.records.is_empty() {
            out.push_str("_No files researched._\n\n");
            return;
        }
        for record in self.input.records {
            let _ = writeln!(out, "## {}\n", record.path);
            let _ = writeln!(out, "**Links to:** {}", join_or_none(&record.links));
            let _ = writeln!(
                out,
                "**Used by:** {}\n",
                join_or_none(self.reverse.used_by(&record.path))
            );
            let _ = writeln!(out, "**Summary:**\n\n{}\n", record.summary.trim_end());
        }
    }

    fn write_missing(&self, out: &mut String) {
        out.push_str("# Missing Files\n\n");
        if self.input.missing.is_empty() {
            out.push_str("_None._\n\n");
            return;
        }
        for entry in self.input.missing {
            let _ = writeln!(out, "- **{}**", entry.file);
            let _ = writeln!(out, "  - Source: {}", entry.source);
            let _ = writeln!(out, "  - Reason wanted for review: {}", entry.reason);
        }
        out.push('\n');
    }

    fn write_problems(&self, out: &mut String) {
        out.push_str("# Problems Encountered\n\n");
        if self.input.problems.is_empty() {
            out.push_str("_None._\n");
            return;
        }
        for problem in self.input.problems {
            let _ = writeln!(
                out,
                "- **{}** ({}): {}",
                problem.file,
                problem.phase,
                single_line(&problem.message)
            );
            if let Some(suggestion) = &problem.suggestion {
                let _ = writeln!(out, "  - Suggestion: {}", single_line(suggestion));
            }
        }
    }
}

/// Standalone note document for one researched file.
pub fn render_file_note(record: &FileRecord) -> String {
    let mut out = String::new();
    write_file_entry(&mut out, record, "#");
    out
}

fn write_file_entry(out: &mut String, record: &FileRecord, heading: &str) {
    let Some(note) = &record.note else {
        let _ = writeln!(out, "{heading} {}\n", record.path);
        let _ = writeln!(out, "**Imports:** {}\n", join_or_none(&record.links));
        let _ = writeln!(out, "**Summary:**\n\n{}\n", record.summary.trim_end());
        return;
    };
    let _ = writeln!(out, "{heading} {} ({})\n", note.title, record.path);
    let _ = writeln!(out, "**Explanation:** {}\n", note.explanation);
    let _ = writeln!(out, "**Use Case:** {}\n", note.use_case);
    let _ = writeln!(out, "**Abstraction/Responsibility:** {}\n", note.responsibility);
    write_list(out, "Functions/Abstractions Used", &note.functions_used);
    write_list(out, "Imports", &record.links);
}

fn write_list(out: &mut String, label: &str, items: &[String]) {
    let _ = writeln!(out, "**{label}:**\n");
    if items.is_empty() {
        out.push_str("- (none)\n\n");
        return;
    }
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    out.push('\n');
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        NONE.to_string()
    } else {
        items.join(", ")
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FileNote, Phase};

    fn record(path: &str, links: &[&str], parent: Option<&str>) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            summary: format!("{path} answer"),
            links: links.iter().map(|l| l.to_string()).collect(),
            parent: parent.map(str::to_string),
            note: None,
        }
    }

    fn sample_records() -> Vec<FileRecord> {
        vec![
            record("Sample.ts", &["other.ts", "other.ts"], None),
            record("other.ts", &["Sample.ts"], Some("Sample.ts")),
        ]
    }

    /// Verifies reverse links keep research order and ignore duplicate links.
    #[test]
    fn reverse_index_dedups_sources() {
        let records = vec![
            record("a.ts", &["c.ts", "c.ts"], None),
            record("b.ts", &["c.ts"], Some("a.ts")),
        ];
        let index = ReverseIndex::build(&records);
        assert_eq!(index.used_by("c.ts"), ["a.ts", "b.ts"]);
        assert!(index.used_by("a.ts").is_empty());
    }

    /// Verifies rendering twice from the same state yields identical output.
    #[test]
    fn rendering_is_idempotent() {
        let records = sample_records();
        let missing = vec![MissingFileEntry {
            file: "gone.ts".to_string(),
            source: "Sample.ts".to_string(),
            reason: "imported".to_string(),
        }];
        let problems = vec![ProblemEntry {
            file: "other.ts".to_string(),
            phase: Phase::LinkExtraction,
            message: "permission\ndenied".to_string(),
            suggestion: Some("check file mode".to_string()),
        }];
        let input = ReportInput {
            question: "How are users loaded?",
            entry: "Sample.ts",
            records: &records,
            missing: &missing,
            problems: &problems,
        };

        let first = ReportBuilder::new(input).render_review();
        let second = ReportBuilder::new(input).render_review();
        assert_eq!(first, second);

        assert!(first.contains(
            "- **Sample.ts** imports/links to: other.ts, other.ts | used by: other.ts"
        ));
        assert!(first.contains("Entry file: **Sample.ts**."));
        assert!(first.contains("- **other.ts**\n  - links to: Sample.ts\n  - used by: Sample.ts"));
        assert!(first.contains("## other.ts\n\n**Links to:** Sample.ts"));
        assert!(first.contains("  - Reason wanted for review: imported"));
        assert!(first.contains("- **other.ts** (link-extraction): permission denied"));
        assert!(first.contains("  - Suggestion: check file mode"));
    }

    /// Verifies an empty run still renders every section.
    #[test]
    fn empty_state_renders_all_sections() {
        let input = ReportInput {
            question: "q",
            entry: "main.ts",
            records: &[],
            missing: &[],
            problems: &[],
        };
        let builder = ReportBuilder::new(input);
        let review = builder.render_review();
        for heading in [
            "# General Overview",
            "# Code Chain Map",
            "# File Summaries",
            "# Missing Files",
            "# Problems Encountered",
        ] {
            assert!(review.contains(heading), "missing {heading}");
        }
        assert!(builder.render_path_summary().contains("_No files researched._"));
        assert!(builder.render_files_summary().contains("_No files researched._"));
    }

    #[test]
    fn path_summary_lists_parents_in_order() {
        let records = sample_records();
        let input = ReportInput {
            question: "q",
            entry: "Sample.ts",
            records: &records,
            missing: &[],
            problems: &[],
        };
        let path = ReportBuilder::new(input).render_path_summary();
        let first = path.find("## 1. Sample.ts").expect("first step");
        let second = path.find("## 2. other.ts").expect("second step");
        assert!(first < second);
        assert!(path.contains("Reached from: (entry)"));
        assert!(path.contains("Reached from: Sample.ts"));
    }

    /// Verifies noted files show their note fields and others fall back to the answer.
    #[test]
    fn files_summary_uses_notes_and_imports() {
        let mut noted = record("Sample.ts", &["other.ts"], None);
        noted.note = Some(FileNote {
            title: "User lookup".to_string(),
            explanation: "Looks users up.".to_string(),
            use_case: "API handlers.".to_string(),
            responsibility: "User access.".to_string(),
            functions_used: vec!["Something".to_string()],
        });
        let records = vec![noted, record("other.ts", &[], Some("Sample.ts"))];
        let input = ReportInput {
            question: "q",
            entry: "Sample.ts",
            records: &records,
            missing: &[],
            problems: &[],
        };
        let summary = ReportBuilder::new(input).render_files_summary();

        assert!(summary.contains("## User lookup (Sample.ts)\n\n**Explanation:** Looks users up."));
        assert!(summary.contains("**Abstraction/Responsibility:** User access."));
        assert!(summary.contains("**Functions/Abstractions Used:**\n\n- Something\n"));
        assert!(summary.contains("**Imports:**\n\n- other.ts\n"));
        assert!(summary.contains("## other.ts\n\n**Imports:** none\n\n**Summary:**\n\nother.ts"));

        let note = render_file_note(&records[0]);
        assert!(note.starts_with("# User lookup (Sample.ts)\n"));
        assert!(note.contains("**Use Case:** API handlers."));
    }
}
