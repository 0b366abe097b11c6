//! Escalation policy: when is a shallow answer not good enough?
//!
//! A verdict is escalated to a full-content pass when its answer contains one of
//! the inconclusive phrases (case-insensitive substring match) or when the
//! shallow content it was based on is shorter than the minimum length.

/// First-line marker on answers produced from the verbatim file.
pub const FULL_FILE_MARKER: &str = "[Full file used for context]";
/// First-line marker on answers whose needed files were extended by a usage search.
pub const USAGE_SEARCH_MARKER: &str = "[Usage search used]";

const KNOWN_MARKERS: [&str; 2] = [FULL_FILE_MARKER, USAGE_SEARCH_MARKER];

pub const DEFAULT_INCONCLUSIVE_PHRASES: [&str; 5] = [
    "not relevant",
    "insufficient context",
    "not enough information",
    "cannot answer",
    "need more context",
];

pub const DEFAULT_MIN_CONTENT_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationPolicy {
    phrases: Vec<String>,
    min_content_chars: usize,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_INCONCLUSIVE_PHRASES.iter().map(|p| p.to_string()),
            DEFAULT_MIN_CONTENT_CHARS,
        )
    }
}

impl EscalationPolicy {
    pub fn new(phrases: impl IntoIterator<Item = String>, min_content_chars: usize) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            min_content_chars,
        }
    }

    /// Answer signals non-relevance or missing context.
    pub fn is_inconclusive(&self, answer: &str) -> bool {
        let lowered = answer.to_lowercase();
        self.phrases.iter().any(|phrase| lowered.contains(phrase))
    }

    /// Content is too small to have been meaningfully summarized.
    pub fn is_too_short(&self, content: &str) -> bool {
        content.chars().count() < self.min_content_chars
    }

    pub fn should_escalate(&self, answer: &str, shallow_content: &str) -> bool {
        self.is_inconclusive(answer) || self.is_too_short(shallow_content)
    }
}

/// Prefix `answer` with `marker` on its own line.
pub fn with_marker(marker: &str, answer: &str) -> String {
    format!("{marker}\n{answer}")
}

/// `answer` without its leading block of marker lines.
///
/// Markers are only ever added by the adapter, so any the oracle wrote itself
/// are removed before the adapter adds its own.
pub fn strip_markers(answer: &str) -> &str {
    let mut rest = answer;
    loop {
        let trimmed = rest.trim_start();
        let (line, tail) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
        if !KNOWN_MARKERS.contains(&line.trim()) {
            return trimmed;
        }
        rest = tail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inconclusive_phrases_match_any_case() {
        let policy = EscalationPolicy::default();
        assert!(policy.is_inconclusive("Not Relevant."));
        assert!(policy.is_inconclusive("I NEED MORE CONTEXT to say"));
        assert!(!policy.is_inconclusive("Handles user lookup"));
    }

    #[test]
    fn short_content_escalates_even_with_conclusive_answer() {
        let policy = EscalationPolicy::new(vec!["nope".to_string()], 10);
        assert!(policy.should_escalate("fine answer", "short"));
        assert!(!policy.should_escalate("fine answer", "long enough content"));
        assert!(policy.should_escalate("nope", "long enough content"));
    }

    #[test]
    fn strip_removes_only_the_leading_marker_block() {
        let answer = with_marker(USAGE_SEARCH_MARKER, &with_marker(FULL_FILE_MARKER, "body"));
        assert_eq!(strip_markers(&answer), "body");
        assert_eq!(strip_markers(FULL_FILE_MARKER), "");

        let quoted = format!("body mentions\n{FULL_FILE_MARKER}");
        assert_eq!(strip_markers(&quoted), quoted);
    }
}
