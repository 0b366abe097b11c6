//! Final review: three oracle passes that turn the raw review into a
//! publishable document.
//!
//! The gather pass extracts facts and file linkages from `review.md`, the
//! organize pass structures them, and the final pass reads both to produce the
//! navigable review.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::info;

use crate::io::executor::Executor;
use crate::io::prompt::{PromptBuilder, ReviewPromptInput};

use super::{OracleSettings, call_oracle};

pub(crate) const REVIEW_OUTPUT_SCHEMA: &str =
    include_str!("../../schemas/review_output.schema.json");

const GATHER_INSTRUCTION: &str = "Extract the key information, facts and especially the linkages between files that are relevant to the question from the research notes below. For each part of the topic, state explicitly which files and which functions (by name) are responsible for it. Map responsibilities and key function names to their files. Do not organize for consumption; gather explicit insights, references and relationships.";

const ORGANIZE_INSTRUCTION: &str = "Organize the gathered information and linkages below into a clear, well-structured markdown document. Group related points, clarify ambiguous statements, and make the key findings and their relationships easy to follow.";

const FINAL_INSTRUCTION: &str = "Review the two documents below to build and clarify the logical flow of the codebase. Make it easy for a developer to find responsibilities, relationships and navigation paths within the code. Focus on clarity, logical structure and discoverability. Produce a final, publishable markdown review that is accurate and consistent.";

#[derive(Debug, Clone, Deserialize)]
struct ReviewOutput {
    markdown: String,
}

/// Documents produced by the three review passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReview {
    pub gathered: String,
    pub organized: String,
    pub final_review: String,
}

#[derive(Debug, Clone)]
pub struct ReviewAgent {
    schema_path: PathBuf,
}

impl ReviewAgent {
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_path: schema_dir.join("review_output.schema.json"),
        }
    }

    /// Run the three passes over `review`.
    ///
    /// `call_dir` is asked for a fresh artifact directory per pass.
    pub fn run<E, F>(
        &self,
        executor: &E,
        settings: &OracleSettings,
        mut call_dir: F,
        question: &str,
        review: &str,
    ) -> Result<FinalReview>
    where
        E: Executor + ?Sized,
        F: FnMut(&str) -> Result<PathBuf>,
    {
        let gathered = self.pass(
            executor,
            settings,
            &call_dir("gather")?,
            GATHER_INSTRUCTION,
            question,
            &[("review", review)],
        )?;
        info!(bytes = gathered.len(), "review gather pass done");
        let organized = self.pass(
            executor,
            settings,
            &call_dir("organize")?,
            ORGANIZE_INSTRUCTION,
            question,
            &[("gathered", gathered.as_str())],
        )?;
        info!(bytes = organized.len(), "review organize pass done");
        let final_review = self.pass(
            executor,
            settings,
            &call_dir("final")?,
            FINAL_INSTRUCTION,
            question,
            &[("gathered", gathered.as_str()), ("organized", organized.as_str())],
        )?;
        Ok(FinalReview {
            gathered,
            organized,
            final_review,
        })
    }

    fn pass<E: Executor + ?Sized>(
        &self,
        executor: &E,
        settings: &OracleSettings,
        call_dir: &Path,
        instruction: &str,
        question: &str,
        documents: &[(&str, &str)],
    ) -> Result<String> {
        let prompt = PromptBuilder::new(settings.prompt_budget_bytes)
            .build_review(&ReviewPromptInput {
                instruction,
                question,
                documents,
            })?
            .render();
        let output: ReviewOutput = call_oracle(
            executor,
            settings,
            call_dir,
            &self.schema_path,
            REVIEW_OUTPUT_SCHEMA,
            prompt,
        )?;
        Ok(output.markdown.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedExecutor, ScriptedResponse};
    use serde_json::json;
    use std::time::Duration;

    fn settings(dir: &Path) -> OracleSettings {
        OracleSettings {
            workdir: dir.to_path_buf(),
            artifacts_dir: dir.join("oracle"),
            timeout: Duration::from_secs(5),
            output_limit_bytes: 10_000,
            prompt_budget_bytes: 20_000,
        }
    }

    fn markdown(text: &str) -> ScriptedResponse {
        ScriptedResponse::Json(json!({ "markdown": text }))
    }

    /// Verifies each pass feeds the next and the last one sees both earlier outputs.
    #[test]
    fn passes_chain_their_outputs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings = settings(temp.path());
        let executor = ScriptedExecutor::new(vec![
            markdown("GATHERED facts"),
            markdown("ORGANIZED doc\n"),
            markdown("FINAL review"),
        ]);
        let mut seq = 0;
        let review = ReviewAgent::new(&settings.schema_dir())
            .run(
                &executor,
                &settings,
                |kind| {
                    seq += 1;
                    settings.call_dir(seq, "review", kind)
                },
                "How are users loaded?",
                "# General Overview\nRAW notes",
            )
            .expect("run");

        assert_eq!(review.organized, "ORGANIZED doc");
        assert_eq!(review.final_review, "FINAL review");
        let prompts: Vec<String> = executor.requests().into_iter().map(|r| r.prompt).collect();
        assert!(prompts[0].contains("RAW notes"));
        assert!(prompts[1].contains("GATHERED facts"));
        assert!(!prompts[1].contains("RAW notes"));
        assert!(prompts[2].contains("GATHERED facts") && prompts[2].contains("ORGANIZED doc"));
        assert!(settings.artifacts_dir.join("003-review-final").is_dir());
    }

    #[test]
    fn failed_pass_stops_the_review() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings = settings(temp.path());
        let executor = ScriptedExecutor::new(vec![
            markdown("GATHERED"),
            ScriptedResponse::Fail("oracle down".to_string()),
        ]);
        let mut seq = 0;
        let err = ReviewAgent::new(&settings.schema_dir())
            .run(
                &executor,
                &settings,
                |kind| {
                    seq += 1;
                    settings.call_dir(seq, "review", kind)
                },
                "q",
                "notes",
            )
            .unwrap_err();
        assert!(format!("{err:#}").contains("oracle down"));
        assert_eq!(executor.remaining(), 0);
    }
}
