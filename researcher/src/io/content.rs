//! File content for research prompts, either structurally reduced or verbatim.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::summarize::summarize;

/// How much of a file the oracle sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Structural outline (imports, declarations, signatures).
    Shallow,
    /// The verbatim file.
    Full,
}

/// Source of file text keyed by identifier.
///
/// Failures are embedded in the returned text as `Error: <message>` so the
/// oracle still receives a prompt and can report on it.
pub trait ContentProvider {
    fn get(&self, file: &str, depth: Depth) -> String;
}

/// Reads files from disk relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsContentProvider {
    base_dir: PathBuf,
}

impl FsContentProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ContentProvider for FsContentProvider {
    fn get(&self, file: &str, depth: Depth) -> String {
        let path = self.base_dir.join(file);
        match fs::read_to_string(&path) {
            Ok(text) => match depth {
                Depth::Full => text,
                Depth::Shallow => summarize(file, &text),
            },
            Err(err) => {
                debug!(file, err = %err, "content unavailable");
                format!("Error: read {}: {err}", path.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shallow_reduces_and_full_is_verbatim() {
        let temp = tempfile::tempdir().expect("tempdir");
        let body = "import a from './a';\nfunction hidden() { return 1; }\n";
        fs::write(temp.path().join("x.ts"), body).expect("write");
        let provider = FsContentProvider::new(temp.path());

        assert_eq!(provider.get("x.ts", Depth::Full), body);
        let shallow = provider.get("x.ts", Depth::Shallow);
        assert!(shallow.contains("import a from './a';"));
        assert!(!shallow.contains("hidden"));
    }

    #[test]
    fn unreadable_file_is_embedded_as_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let provider = FsContentProvider::new(temp.path());
        assert!(provider.get("nope.ts", Depth::Shallow).starts_with("Error: "));
    }
}
