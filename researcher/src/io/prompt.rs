//! Prompt builder for deterministic oracle input.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use regex::Regex;
use tracing::debug;

use crate::core::types::ContextEntry;
use crate::io::content::Depth;

const RESEARCH_TEMPLATE: &str = include_str!("prompts/research.md");
const RECOVERY_TEMPLATE: &str = include_str!("prompts/recovery.md");
const NOTE_TEMPLATE: &str = include_str!("prompts/note.md");
const REVIEW_TEMPLATE: &str = include_str!("prompts/review.md");

/// Droppable sections, least important first.
const DROP_ORDER: [&str; 2] = ["chain", "parent"];

const TRUNCATED_SUFFIX: &str = "\n[truncated]";

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->").unwrap()
});

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.add_template("research", RESEARCH_TEMPLATE)
            .context("load research template")?;
        env.add_template("recovery", RECOVERY_TEMPLATE)
            .context("load recovery template")?;
        env.add_template("note", NOTE_TEMPLATE)
            .context("load note template")?;
        env.add_template("review", REVIEW_TEMPLATE)
            .context("load review template")?;
        Ok(Self { env })
    }

    fn render_research(&self, input: &ResearchPromptInput<'_>) -> Result<String> {
        let template = self.env.get_template("research")?;
        let view = match input.depth {
            Depth::Shallow => "structural outline (imports, declarations, signatures)",
            Depth::Full => "full file",
        };
        let rendered = template.render(context! {
            question => input.question.trim(),
            file => input.file,
            view => view,
            parent => input.parent_file,
            chain => input.chain,
            content => input.content.trim_end(),
        })?;
        Ok(rendered)
    }

    fn render_recovery(&self, file: &str, error: &str) -> Result<String> {
        let template = self.env.get_template("recovery")?;
        let rendered = template.render(context! {
            file => file,
            error => error.trim(),
        })?;
        Ok(rendered)
    }

    fn render_note(&self, file: &str, answer: &str, links: &[String]) -> Result<String> {
        let template = self.env.get_template("note")?;
        let rendered = template.render(context! {
            file => file,
            links => links,
            answer => answer.trim(),
        })?;
        Ok(rendered)
    }

    fn render_review(&self, input: &ReviewPromptInput<'_>) -> Result<String> {
        let template = self.env.get_template("review")?;
        let documents: Vec<_> = input
            .documents
            .iter()
            .map(|(name, body)| context! { name => name, body => body.trim() })
            .collect();
        let rendered = template.render(context! {
            instruction => input.instruction,
            question => input.question.trim(),
            documents => documents,
        })?;
        Ok(rendered)
    }
}

/// Everything a review-phase prompt is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct ReviewPromptInput<'a> {
    pub instruction: &'a str,
    pub question: &'a str,
    /// `(name, body)` pairs, in the order they are shown.
    pub documents: &'a [(&'a str, &'a str)],
}

/// Everything a research prompt is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct ResearchPromptInput<'a> {
    pub file: &'a str,
    pub question: &'a str,
    pub content: &'a str,
    pub depth: Depth,
    pub parent_file: Option<&'a str>,
    pub chain: &'a [ContextEntry],
}

/// A parsed section from rendered template output.
#[derive(Debug, Clone)]
struct ParsedSection {
    key: String,
    required: bool,
    content: String,
}

/// Parse sections from rendered template output using HTML comment markers.
///
/// Markers follow format: `<!-- section:KEY required|droppable -->`
fn parse_sections(rendered: &str) -> Vec<ParsedSection> {
    let markers: Vec<_> = SECTION_RE.captures_iter(rendered).collect();
    let mut sections = Vec::new();

    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(key), Some(kind)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let required = kind.as_str() == "required";
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(rendered.len(), |m| m.start());

        let content = rendered[whole.end()..end].trim().to_string();
        if !content.is_empty() || required {
            sections.push(ParsedSection {
                key: key.as_str().to_string(),
                required,
                content,
            });
        }
    }

    sections
}

/// Apply budget to parsed sections, dropping droppable sections as needed.
///
/// If required sections alone exceed the budget, the last section is truncated.
fn apply_budget_to_sections(sections: &mut Vec<ParsedSection>, budget: usize) {
    let total_len =
        |secs: &[ParsedSection]| -> usize { secs.iter().map(|s| s.content.len()).sum() };

    if total_len(sections) <= budget {
        return;
    }

    for key in DROP_ORDER {
        if total_len(sections) <= budget {
            break;
        }
        if let Some(idx) = sections.iter().position(|s| s.key == key && !s.required) {
            debug!(
                section = key,
                bytes_dropped = sections[idx].content.len(),
                "dropped section for budget"
            );
            sections.remove(idx);
        }
    }

    if total_len(sections) <= budget {
        return;
    }
    let other_len: usize = sections
        .iter()
        .take(sections.len().saturating_sub(1))
        .map(|s| s.content.len())
        .sum();
    let allowed = budget.saturating_sub(other_len);
    if let Some(last) = sections.last_mut() {
        let before_len = last.content.len();
        if allowed > TRUNCATED_SUFFIX.len() {
            truncate_at_char_boundary(&mut last.content, allowed - TRUNCATED_SUFFIX.len());
            last.content.push_str(TRUNCATED_SUFFIX);
        } else {
            truncate_at_char_boundary(&mut last.content, allowed);
        }
        debug!(
            section = last.key,
            before_len,
            after_len = last.content.len(),
            "truncated section for budget"
        );
    }
}

fn truncate_at_char_boundary(text: &mut String, max: usize) {
    let mut idx = max.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    text.truncate(idx);
}

fn render_sections(sections: &[ParsedSection]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds prompts within a byte budget, dropping less critical sections first.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    pub fn build_research(&self, input: &ResearchPromptInput<'_>) -> Result<PromptPack> {
        let rendered = PromptEngine::new()?
            .render_research(input)
            .context("render research prompt")?;
        Ok(self.pack(&rendered))
    }

    pub fn build_recovery(&self, file: &str, error: &str) -> Result<PromptPack> {
        let rendered = PromptEngine::new()?
            .render_recovery(file, error)
            .context("render recovery prompt")?;
        Ok(self.pack(&rendered))
    }

    pub fn build_note(&self, file: &str, answer: &str, links: &[String]) -> Result<PromptPack> {
        let rendered = PromptEngine::new()?
            .render_note(file, answer, links)
            .context("render note prompt")?;
        Ok(self.pack(&rendered))
    }

    pub fn build_review(&self, input: &ReviewPromptInput<'_>) -> Result<PromptPack> {
        let rendered = PromptEngine::new()?
            .render_review(input)
            .context("render review prompt")?;
        Ok(self.pack(&rendered))
    }

    fn pack(&self, rendered: &str) -> PromptPack {
        let mut sections = parse_sections(rendered);
        apply_budget_to_sections(&mut sections, self.budget_bytes);
        PromptPack {
            content: render_sections(&sections),
        }
    }
}

/// A rendered prompt ready to send to the executor.
#[derive(Debug, Clone)]
pub struct PromptPack {
    content: String,
}

impl PromptPack {
    pub fn render(&self) -> String {
        self.content.clone()
    }
}
