//! Heuristic scanning of import syntax in source text.

use std::sync::LazyLock;

use regex::Regex;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?m)^[ \t]*import\b[^'";]*?['"]([^'"\n]+)['"]"#,
        r#"|^[ \t]*export\b[^'";]*?\bfrom[ \t]*['"]([^'"\n]+)['"]"#,
        r#"|\brequire\(\s*['"]([^'"\n]+)['"]\s*\)"#,
    ))
    .unwrap()
});

/// Import targets in order of first appearance, duplicates preserved.
pub fn import_targets(source: &str) -> Vec<String> {
    IMPORT_RE
        .captures_iter(source)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

/// Same-project targets start with `.`; bare specifiers name registry packages.
pub fn is_relative(target: &str) -> bool {
    target.starts_with('.')
}
