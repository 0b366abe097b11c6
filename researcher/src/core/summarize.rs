//! Structural reduction of source files for shallow research passes.
//!
//! Extraction is best-effort and line-oriented: imports, type declarations and
//! exported signatures are kept, bodies are dropped. Unknown file types are
//! returned verbatim.

use std::sync::LazyLock;

use regex::Regex;

static IMPORT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^import\s.+$").unwrap());
static REQUIRE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:const|let|var)\s+[\w{}\s,]+=\s*require\(.+\);?[ \t]*$").unwrap()
});
static TS_TYPE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:export\s+)?(?:type|interface)\s+\w+").unwrap());
static TS_EXPORT_FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^export\s+(?:default\s+)?(?:async\s+)?function\s*\*?\s*\w*\s*(?:<[^>]*>)?\s*\([^)]*\)[^{\n]*")
        .unwrap()
});
static EXPORT_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^export\s+(?:default\s+)?(?:abstract\s+)?class\s+\w+[^{\n]*").unwrap()
});
static EXPORT_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^export\s+(?:const|let|var)\s+\w+[^=\n]*").unwrap());
static JS_EXPORT_FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^export\s+(?:default\s+)?(?:async\s+)?function\s+(\w+)\s*\(([^)]*)\)").unwrap()
});
static MODULE_EXPORTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)^module\.exports\s*=\s*\{(.*?)\};?").unwrap());
static EXPORTS_ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:module\.)?exports\.(\w+)\s*=").unwrap());
static JAVA_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|protected|private|abstract|final|static|sealed)\s+)*(?:class|interface|enum|record)\s+\w+",
    )
    .unwrap()
});
static JAVA_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|protected|private|static|final|abstract|synchronized|default)\s+)+(?:<[^>]+>\s+)?[\w<>\[\],.? ]*?\w+\s*\([^)]*\)?",
    )
    .unwrap()
});

/// Source languages with a dedicated extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    TypeScript,
    JavaScript,
    Java,
    Other,
}

impl SourceKind {
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "ts" | "tsx" | "mts" | "cts" => SourceKind::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => SourceKind::JavaScript,
            "java" => SourceKind::Java,
            _ => SourceKind::Other,
        }
    }
}

/// Reduce `content` of the file at `path` to its structural outline.
pub fn summarize(path: &str, content: &str) -> String {
    match SourceKind::from_path(path) {
        SourceKind::TypeScript => summarize_typescript(content),
        SourceKind::JavaScript => summarize_javascript(content),
        SourceKind::Java => summarize_java(content),
        SourceKind::Other => content.to_string(),
    }
}

fn summarize_typescript(content: &str) -> String {
    let mut blocks = Vec::new();
    push_joined(&mut blocks, matches(&IMPORT_LINE_RE, content), "\n");

    let mut decls: Vec<String> = TS_TYPE_START_RE
        .find_iter(content)
        .map(|m| declaration_block(content, m.start()).trim().to_string())
        .collect();
    decls.extend(matches(&TS_EXPORT_FN_RE, content));
    decls.extend(matches(&EXPORT_CLASS_RE, content));
    decls.extend(matches(&EXPORT_VAR_RE, content));
    push_joined(&mut blocks, decls, "\n\n");

    blocks.join("\n\n")
}

fn summarize_javascript(content: &str) -> String {
    let mut blocks = Vec::new();
    push_joined(&mut blocks, matches(&IMPORT_LINE_RE, content), "\n");
    push_joined(&mut blocks, matches(&REQUIRE_LINE_RE, content), "\n");

    let mut exports: Vec<String> = JS_EXPORT_FN_RE
        .captures_iter(content)
        .map(|caps| format!("export function {}({});", &caps[1], caps[2].trim()))
        .collect();
    exports.extend(matches(&EXPORT_CLASS_RE, content));
    exports.extend(matches(&EXPORT_VAR_RE, content));
    for caps in MODULE_EXPORTS_RE.captures_iter(content) {
        for prop in caps[1].split(',') {
            let name = prop.split(':').next().unwrap_or_default().trim();
            if !name.is_empty() {
                exports.push(format!("export {name};"));
            }
        }
    }
    for caps in EXPORTS_ASSIGN_RE.captures_iter(content) {
        exports.push(format!("export {};", &caps[1]));
    }
    push_joined(&mut blocks, exports, "\n");

    blocks.join("\n\n")
}

fn summarize_java(content: &str) -> String {
    let mut blocks = Vec::new();
    push_joined(&mut blocks, matches(&IMPORT_LINE_RE, content), "\n");

    let lines: Vec<&str> = content.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let is_type = JAVA_TYPE_RE.is_match(line);
        let is_method = !is_type && JAVA_METHOD_RE.is_match(line) && line.contains('(');
        if !is_type && !is_method {
            continue;
        }
        let mut block: Vec<String> = annotations_before(&lines, idx)
            .into_iter()
            .map(str::to_string)
            .collect();
        let head = line.split('{').next().unwrap_or(line).trim_end();
        if is_type {
            block.push(format!("{} {{ ... }}", head.trim()));
        } else {
            block.push(format!("{};", head.trim_end_matches(';').trim()));
        }
        blocks.push(block.join("\n"));
    }

    blocks.join("\n\n")
}

fn matches(re: &Regex, content: &str) -> Vec<String> {
    re.find_iter(content)
        .map(|m| m.as_str().trim_end().to_string())
        .collect()
}

fn push_joined(blocks: &mut Vec<String>, items: Vec<String>, sep: &str) {
    if !items.is_empty() {
        blocks.push(items.join(sep));
    }
}

fn annotations_before<'a>(lines: &[&'a str], idx: usize) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut i = idx;
    while i > 0 && lines[i - 1].trim_start().starts_with('@') {
        i -= 1;
        out.push(lines[i].trim());
    }
    out.reverse();
    out
}

/// Slice a type/interface declaration starting at `start`.
///
/// Ends at the brace that closes the first opened block, or at a `;`/newline at
/// depth zero when the declaration has no body.
fn declaration_block(content: &str, start: usize) -> &str {
    let mut depth = 0usize;
    let mut last_significant = ' ';
    for (offset, ch) in content[start..].char_indices() {
        let end = start + offset + ch.len_utf8();
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &content[start..end];
                }
            }
            ';' if depth == 0 => return &content[start..end],
            '\n' if depth == 0 && !matches!(last_significant, '=' | '|' | '&' | ',' | '<') => {
                return &content[start..start + offset];
            }
            _ => {}
        }
        if !ch.is_whitespace() {
            last_significant = ch;
        }
    }
    &content[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TS: &str = r#"import { Something } from "./other";
import fs from "fs";

interface User {
  id: number;
  name: string;
}

type UserId = number | string;

type UserMap = {
  [id: string]: User;
};

export function getUser(id: UserId): User | null {
  // ...implementation
  return null;
}

function privateHelper() {
  // not exported
}
"#;

    #[test]
    fn typescript_keeps_imports_types_and_exported_signatures() {
        let summary = summarize("Sample.ts", SAMPLE_TS);
        assert!(summary.contains("import { Something } from \"./other\";"));
        assert!(summary.contains("interface User {\n  id: number;\n  name: string;\n}"));
        assert!(summary.contains("type UserId = number | string;"));
        assert!(summary.contains("type UserMap = {\n  [id: string]: User;\n}"));
        assert!(summary.contains("export function getUser(id: UserId): User | null"));
        assert!(!summary.contains("privateHelper"));
        assert!(!summary.contains("return null"));
    }

    #[test]
    fn javascript_renders_export_surface() {
        let source = r#"const path = require("path");

export function load(file, opts) {
  return path.join(file);
}

module.exports = {
  alpha,
  beta: betaImpl,
};
exports.gamma = 3;
"#;
        let summary = summarize("lib.js", source);
        assert!(summary.contains("const path = require(\"path\");"));
        assert!(summary.contains("export function load(file, opts);"));
        assert!(summary.contains("export alpha;"));
        assert!(summary.contains("export beta;"));
        assert!(summary.contains("export gamma;"));
        assert!(!summary.contains("path.join"));
    }

    #[test]
    fn java_keeps_type_headers_and_method_signatures() {
        let source = r#"import java.util.List;

@Service
public class UserService {
    @Override
    public List<User> findAll(int limit) {
        return repo.all();
    }
}
"#;
        let summary = summarize("UserService.java", source);
        assert!(summary.contains("import java.util.List;"));
        assert!(summary.contains("@Service\npublic class UserService { ... }"));
        assert!(summary.contains("@Override\npublic List<User> findAll(int limit);"));
        assert!(!summary.contains("repo.all"));
    }

    #[test]
    fn unknown_types_pass_through() {
        assert_eq!(summarize("notes.md", "# Title\nbody"), "# Title\nbody");
    }
}
