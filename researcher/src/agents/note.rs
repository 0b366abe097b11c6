//! Note agent: writes a reader-facing note for each researched file.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::core::types::FileNote;
use crate::io::executor::Executor;
use crate::io::prompt::PromptBuilder;

use super::{OracleSettings, call_oracle};

pub(crate) const FILE_NOTE_OUTPUT_SCHEMA: &str =
    include_str!("../../schemas/file_note_output.schema.json");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileNoteOutput {
    title: String,
    explanation: String,
    use_case: String,
    responsibility: String,
    functions_used: Vec<String>,
}

impl From<FileNoteOutput> for FileNote {
    fn from(output: FileNoteOutput) -> Self {
        Self {
            title: one_line(&output.title),
            explanation: output.explanation.trim().to_string(),
            use_case: output.use_case.trim().to_string(),
            responsibility: output.responsibility.trim().to_string(),
            functions_used: output
                .functions_used
                .iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NoteAgent {
    schema_path: PathBuf,
}

impl NoteAgent {
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_path: schema_dir.join("file_note_output.schema.json"),
        }
    }

    pub fn run<E: Executor + ?Sized>(
        &self,
        executor: &E,
        settings: &OracleSettings,
        call_dir: &Path,
        file: &str,
        answer: &str,
        links: &[String],
    ) -> Result<FileNote> {
        let prompt = PromptBuilder::new(settings.prompt_budget_bytes)
            .build_note(file, answer, links)?
            .render();
        let output: FileNoteOutput = call_oracle(
            executor,
            settings,
            call_dir,
            &self.schema_path,
            FILE_NOTE_OUTPUT_SCHEMA,
            prompt,
        )?;
        Ok(output.into())
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
