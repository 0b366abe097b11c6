//! Recursive regex search across the researched tree.

use std::fs;
use std::path::Path;

use anyhow::{Result, bail};
use regex::{Regex, RegexBuilder};
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::core::path::{identifier_under, is_within};
use crate::core::types::UsageQuery;

/// Compile `pattern` with JavaScript-style flags.
///
/// `i`, `m`, `s` and `x` map onto regex options; `g`, `u` and `y` have no
/// meaning for a per-file "does it match" search and are accepted as no-ops.
pub fn compile_pattern(pattern: &str, flags: Option<&str>) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.unwrap_or_default().chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'g' | 'u' | 'y' => {}
            other => bail!("unsupported regex flag {other:?}"),
        }
    }
    Ok(builder.build()?)
}

/// Identifiers of files under `base_dir` whose content matches the query.
///
/// `file_types` filters by extension (with or without a leading dot); an
/// empty set searches every file. Hidden entries and anything under an
/// `excluded` identifier (the researcher's own output) are pruned. Results are
/// sorted. Unreadable and non-UTF-8 files are skipped.
#[instrument(skip_all, fields(pattern = %query.pattern))]
pub fn search_usages(
    base_dir: &Path,
    query: &UsageQuery,
    excluded: &[String],
) -> Result<Vec<String>> {
    let regex = compile_pattern(&query.pattern, query.flags.as_deref())?;
    let extensions: Vec<String> = query
        .file_types
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();

    let mut hits = Vec::new();
    let walker = WalkDir::new(base_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(is_hidden(entry.file_name()) || is_excluded(base_dir, entry.path(), excluded))
        });
    for entry in walker.filter_map(|entry| entry.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !extensions.is_empty() && !has_extension(path, &extensions) {
            continue;
        }
        let Ok(text) = fs::read_to_string(path) else {
            continue;
        };
        if regex.is_match(&text)
            && let Some(id) = identifier_under(base_dir, path)
        {
            hits.push(id);
        }
    }
    debug!(hits = hits.len(), "usage search finished");
    Ok(hits)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn is_excluded(base_dir: &Path, path: &Path, excluded: &[String]) -> bool {
    identifier_under(base_dir, path)
        .is_some_and(|id| excluded.iter().any(|prefix| is_within(&id, prefix)))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| extensions.contains(&ext))
}
