//! Helpers for rendering deterministic file identifiers.
//!
//! An identifier is a base-directory-relative path using `/` separators, with
//! no leading `./` and with `.`/`..` segments collapsed lexically.

use std::path::{Component, Path};

/// Normalize a raw path (from the oracle, an import, or a search hit).
pub fn normalize_identifier(raw: &str) -> String {
    let unified = raw.trim().replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Whether `id` climbs out of the base directory (`..` or `../...`).
pub fn escapes_base(id: &str) -> bool {
    id == ".." || id.starts_with("../")
}

/// Whether `id` is `prefix` itself or lies beneath it.
pub fn is_within(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Resolve `target` (as written in `from_file`) against the directory of `from_file`.
pub fn resolve_relative(from_file: &str, target: &str) -> String {
    let from = normalize_identifier(from_file);
    match from.rsplit_once('/') {
        Some((dir, _)) => normalize_identifier(&format!("{dir}/{target}")),
        None => normalize_identifier(target),
    }
}

/// Express `path` relative to `base` as an identifier.
///
/// Returns `None` when `path` is not inside `base`.
pub fn identifier_under(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
