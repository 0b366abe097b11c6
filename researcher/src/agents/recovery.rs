//! Recovery agent: asks the oracle what to try after a research failure.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::io::executor::Executor;
use crate::io::prompt::PromptBuilder;

use super::{OracleSettings, call_oracle};

pub(crate) const RECOVERY_OUTPUT_SCHEMA: &str =
    include_str!("../../schemas/recovery_output.schema.json");

#[derive(Debug, Clone, Deserialize)]
struct RecoveryOutput {
    suggestion: String,
}

#[derive(Debug, Clone)]
pub struct RecoveryAgent {
    schema_path: PathBuf,
}

impl RecoveryAgent {
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_path: schema_dir.join("recovery_output.schema.json"),
        }
    }

    /// Returns the trimmed suggestion; empty when the oracle had nothing to say.
    pub fn run<E: Executor + ?Sized>(
        &self,
        executor: &E,
        settings: &OracleSettings,
        call_dir: &Path,
        file: &str,
        error: &str,
    ) -> Result<String> {
        let prompt = PromptBuilder::new(settings.prompt_budget_bytes)
            .build_recovery(file, error)?
            .render();
        let output: RecoveryOutput = call_oracle(
            executor,
            settings,
            call_dir,
            &self.schema_path,
            RECOVERY_OUTPUT_SCHEMA,
            prompt,
        )?;
        Ok(output.suggestion.trim().to_string())
    }
}
