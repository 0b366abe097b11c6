//! Researcher configuration stored in a TOML file (default `researcher.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::escalation::{
    DEFAULT_INCONCLUSIVE_PHRASES, DEFAULT_MIN_CONTENT_CHARS, EscalationPolicy,
};

pub const DEFAULT_CONFIG_FILE: &str = "researcher.toml";
pub const DEFAULT_RUNNING_DOCUMENT: &str = "REVIEW.md";

/// Researcher configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to the
/// values the binary ships with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResearcherConfig {
    /// Directory that holds one sub-directory per run.
    pub notes_dir: PathBuf,

    /// Running document rewritten after every processed file.
    ///
    /// Defaults to `REVIEW.md` inside `notes_dir`. Relative paths resolve
    /// against the current directory.
    pub running_document: Option<PathBuf>,

    /// Ask the oracle for a recovery suggestion whenever a file fails.
    pub recovery_suggestions: bool,

    /// Ask the oracle for a reader-facing note on every researched file.
    pub file_notes: bool,

    /// Run the three-pass final review over `review.md` after exploration.
    pub final_review: bool,

    /// Prompts larger than this drop their droppable sections first.
    pub prompt_budget_bytes: usize,

    pub oracle: OracleConfig,
    pub escalation: EscalationConfig,
    pub links: LinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    /// Oracle backend binary (e.g. `codex`).
    pub binary: String,

    /// Arguments placed before the schema/output flags.
    pub args: Vec<String>,

    /// Wall-clock budget per oracle call in seconds.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            binary: "codex".to_string(),
            args: vec!["exec".to_string(), "--full-auto".to_string()],
            timeout_secs: 10 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EscalationConfig {
    /// Case-insensitive phrases marking an answer as inconclusive.
    pub inconclusive_phrases: Vec<String>,

    /// Shallow content shorter than this (in characters) always escalates.
    pub min_content_chars: usize,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            inconclusive_phrases: DEFAULT_INCONCLUSIVE_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
        }
    }
}

impl EscalationConfig {
    pub fn policy(&self) -> EscalationPolicy {
        EscalationPolicy::new(
            self.inconclusive_phrases.iter().cloned(),
            self.min_content_chars,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkConfig {
    /// Suffixes probed, in order, for import targets written without one.
    pub probe_suffixes: Vec<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            probe_suffixes: vec![".ts".to_string(), ".js".to_string()],
        }
    }
}

impl Default for ResearcherConfig {
    fn default() -> Self {
        Self {
            notes_dir: PathBuf::from("notes"),
            running_document: None,
            recovery_suggestions: true,
            file_notes: true,
            final_review: false,
            prompt_budget_bytes: 40_000,
            oracle: OracleConfig::default(),
            escalation: EscalationConfig::default(),
            links: LinkConfig::default(),
        }
    }
}

impl ResearcherConfig {
    /// Running document location for a run writing into `notes_dir`.
    pub fn running_document_in(&self, notes_dir: &Path) -> PathBuf {
        self.running_document
            .clone()
            .unwrap_or_else(|| notes_dir.join(DEFAULT_RUNNING_DOCUMENT))
    }

    pub fn validate(&self) -> Result<()> {
        if self.notes_dir.as_os_str().is_empty() {
            return Err(anyhow!("notes_dir must not be empty"));
        }
        if self
            .running_document
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(anyhow!("running_document must not be empty"));
        }
        if self.prompt_budget_bytes == 0 {
            return Err(anyhow!("prompt_budget_bytes must be > 0"));
        }
        if self.oracle.binary.trim().is_empty() {
            return Err(anyhow!("oracle.binary must not be empty"));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(anyhow!("oracle.timeout_secs must be > 0"));
        }
        if self.oracle.output_limit_bytes == 0 {
            return Err(anyhow!("oracle.output_limit_bytes must be > 0"));
        }
        if self
            .escalation
            .inconclusive_phrases
            .iter()
            .any(|phrase| phrase.trim().is_empty())
        {
            return Err(anyhow!("escalation.inconclusive_phrases must not contain blanks"));
        }
        for suffix in &self.links.probe_suffixes {
            if !suffix.starts_with('.') || suffix.len() < 2 {
                return Err(anyhow!(
                    "links.probe_suffixes entries must look like \".ext\", got {suffix:?}"
                ));
            }
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ResearcherConfig::default()`.
pub fn load_config(path: &Path) -> Result<ResearcherConfig> {
    if !path.exists() {
        let cfg = ResearcherConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ResearcherConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ResearcherConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ResearcherConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("researcher.toml");
        let mut cfg = ResearcherConfig::default();
        cfg.oracle.timeout_secs = 42;
        cfg.final_review = true;
        cfg.links.probe_suffixes.push(".tsx".to_string());
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("researcher.toml");
        fs::write(&path, "[escalation]\nmin_content_chars = 5\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.escalation.min_content_chars, 5);
        assert_eq!(cfg.oracle, OracleConfig::default());
        assert_eq!(cfg.escalation.inconclusive_phrases.len(), 5);
    }

    #[test]
    fn running_document_defaults_into_notes_dir() {
        let mut cfg = ResearcherConfig::default();
        assert_eq!(
            cfg.running_document_in(Path::new("out")),
            PathBuf::from("out/REVIEW.md")
        );
        cfg.running_document = Some(PathBuf::from("docs/LIVE.md"));
        assert_eq!(
            cfg.running_document_in(Path::new("out")),
            PathBuf::from("docs/LIVE.md")
        );
    }

    #[test]
    fn invalid_suffix_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("researcher.toml");
        fs::write(&path, "[links]\nprobe_suffixes = [\"ts\"]\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("probe_suffixes"));
    }
}
