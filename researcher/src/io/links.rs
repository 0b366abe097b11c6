//! Static dependency links between files of the researched tree.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::imports::{import_targets, is_relative};
use crate::core::path::resolve_relative;

/// Best-effort discovery of the files a file depends on.
pub trait LinkExtractor {
    /// Ordered identifiers of linked files; duplicates preserved.
    fn links(&self, file: &str) -> Result<Vec<String>>;
}

/// Scans `import`/`export … from`/`require` syntax of the verbatim file.
///
/// Only relative targets are kept. Targets without a recognized suffix probe
/// the configured suffixes in order and keep the first that exists on disk;
/// unresolved targets are kept as written (normalized).
#[derive(Debug, Clone)]
pub struct ImportLinkExtractor {
    base_dir: PathBuf,
    probe_suffixes: Vec<String>,
}

impl ImportLinkExtractor {
    pub fn new(base_dir: impl Into<PathBuf>, probe_suffixes: Vec<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            probe_suffixes,
        }
    }

    fn resolve(&self, from_file: &str, target: &str) -> String {
        let joined = resolve_relative(from_file, target);
        if self.has_known_suffix(&joined) {
            return joined;
        }
        self.probe_suffixes
            .iter()
            .map(|suffix| format!("{joined}{suffix}"))
            .find(|candidate| self.base_dir.join(candidate).is_file())
            .unwrap_or(joined)
    }

    fn has_known_suffix(&self, identifier: &str) -> bool {
        self.probe_suffixes
            .iter()
            .any(|suffix| identifier.ends_with(suffix.as_str()))
    }
}

impl LinkExtractor for ImportLinkExtractor {
    fn links(&self, file: &str) -> Result<Vec<String>> {
        let path = self.base_dir.join(file);
        let source =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let links: Vec<String> = import_targets(&source)
            .into_iter()
            .filter(|target| is_relative(target))
            .map(|target| self.resolve(file, &target))
            .collect();
        debug!(file, count = links.len(), "extracted links");
        Ok(links)
    }
}
