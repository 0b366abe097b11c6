//! Oracle-backed agents: per-file research, error recovery, file notes and the
//! final review.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::Draft;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::types::{FileNote, ResearchContext, ResearchVerdict};
use crate::io::config::ResearcherConfig;
use crate::io::executor::{ExecRequest, Executor, execute_and_load_json};

pub mod note;
pub mod recovery;
pub mod research;
pub mod review;

/// The reasoning capability consulted once per work item.
pub trait ResearchOracle {
    /// Research `file` in the light of `question` and previously gathered context.
    ///
    /// Oracle failures come back as a verdict with `error` set. `Err` is reserved
    /// for faults outside the oracle call itself (e.g. artifacts cannot be written).
    fn research(
        &self,
        file: &str,
        question: &str,
        context: &ResearchContext,
    ) -> Result<ResearchVerdict>;

    /// Optional advice on what to try after `error` occurred on `file`.
    fn recovery_suggestion(&self, _file: &str, _error: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// Optional reader-facing note on a file that was researched successfully.
    fn file_note(
        &self,
        _file: &str,
        _answer: &str,
        _links: &[String],
    ) -> Result<Option<FileNote>> {
        Ok(None)
    }
}

/// Process and artifact settings shared by every oracle call of a run.
#[derive(Debug, Clone)]
pub struct OracleSettings {
    /// Working directory of the oracle process (the researched tree).
    pub workdir: PathBuf,
    /// Directory receiving one sub-directory of artifacts per call.
    pub artifacts_dir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    pub prompt_budget_bytes: usize,
}

impl OracleSettings {
    pub fn from_config(cfg: &ResearcherConfig, workdir: &Path, artifacts_dir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            artifacts_dir: artifacts_dir.to_path_buf(),
            timeout: Duration::from_secs(cfg.oracle.timeout_secs),
            output_limit_bytes: cfg.oracle.output_limit_bytes,
            prompt_budget_bytes: cfg.prompt_budget_bytes,
        }
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.artifacts_dir.join("schemas")
    }

    /// Highest call number already present in the artifacts directory.
    ///
    /// A run reusing its hour's directory continues numbering after it.
    pub fn last_call_seq(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.artifacts_dir) else {
            return 0;
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let (seq, _) = name.to_str()?.split_once('-')?;
                seq.parse::<usize>().ok()
            })
            .max()
            .unwrap_or(0)
    }

    /// Create the artifact directory for call number `seq`.
    pub fn call_dir(&self, seq: usize, file: &str, kind: &str) -> Result<PathBuf> {
        let dir = self
            .artifacts_dir
            .join(format!("{seq:03}-{}-{kind}", slug(file)));
        fs::create_dir_all(&dir)
            .with_context(|| format!("create oracle call dir {}", dir.display()))?;
        Ok(dir)
    }
}

pub(crate) fn write_output_schema(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create schema dir {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write schema {}", path.display()))
}

/// One schema-constrained oracle round trip: write the schema and the prompt
/// into `call_dir`, run the executor, then validate and decode its output.
pub(crate) fn call_oracle<E, T>(
    executor: &E,
    settings: &OracleSettings,
    call_dir: &Path,
    schema_path: &Path,
    schema: &str,
    prompt: String,
) -> Result<T>
where
    E: Executor + ?Sized,
    T: DeserializeOwned,
{
    write_output_schema(schema_path, schema)?;
    let prompt_path = call_dir.join("prompt.md");
    fs::write(&prompt_path, &prompt)
        .with_context(|| format!("write prompt {}", prompt_path.display()))?;

    let request = ExecRequest {
        workdir: settings.workdir.clone(),
        prompt,
        output_schema_path: schema_path.to_path_buf(),
        output_path: call_dir.join("output.json"),
        executor_log_path: call_dir.join("executor.log"),
        timeout: settings.timeout,
        output_limit_bytes: settings.output_limit_bytes,
    };
    let value: Value = execute_and_load_json(executor, &request)?;
    validate_output(&value, schema)?;
    serde_json::from_value(value).context("decode oracle output")
}

/// Validate oracle output against a JSON Schema (Draft 2020-12).
pub(crate) fn validate_output(instance: &Value, schema: &str) -> Result<()> {
    let schema: Value = serde_json::from_str(schema).context("parse output schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| anyhow!("invalid schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("oracle output failed schema validation:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

/// Filesystem-safe rendering of an identifier.
fn slug(file: &str) -> String {
    let mut out = String::with_capacity(file.len());
    for ch in file.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    let mut slug: String = trimmed.chars().take(60).collect();
    if slug.is_empty() {
        slug.push_str("file");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slug_is_filesystem_safe() {
        assert_eq!(slug("src/Main.ts"), "src-main-ts");
        assert_eq!(slug("../x//y.js"), "x-y-js");
        assert_eq!(slug("///"), "file");
    }

    #[test]
    fn call_numbering_continues_after_existing_dirs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings = OracleSettings {
            workdir: temp.path().to_path_buf(),
            artifacts_dir: temp.path().join("oracle"),
            timeout: Duration::from_secs(5),
            output_limit_bytes: 1_000,
            prompt_budget_bytes: 1_000,
        };
        assert_eq!(settings.last_call_seq(), 0);

        settings.call_dir(2, "a.ts", "shallow").expect("call dir");
        settings.call_dir(11, "b.ts", "note").expect("call dir");
        fs::create_dir_all(settings.schema_dir()).expect("schemas");
        assert_eq!(settings.last_call_seq(), 11);
    }

    #[test]
    fn research_schema_accepts_minimal_and_rejects_malformed() {
        let schema = research::RESEARCH_OUTPUT_SCHEMA;
        validate_output(&json!({"answer": "a", "neededFiles": []}), schema).expect("minimal");
        validate_output(
            &json!({
                "answer": "a",
                "neededFiles": ["b.ts"],
                "error": null,
                "usageQuery": {"pattern": "getUser", "flags": "i", "fileTypes": ["ts"]}
            }),
            schema,
        )
        .expect("full");

        let err = validate_output(&json!({"answer": 3, "neededFiles": []}), schema).unwrap_err();
        assert!(err.to_string().contains("schema validation"));
        assert!(validate_output(&json!({"answer": "a"}), schema).is_err());
    }
}
