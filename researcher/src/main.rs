//! Code researcher.
//!
//! Answers a question that spans several files by researching the file graph
//! reachable from an entry file, one oracle call per file, and writing a
//! navigable report under the notes directory.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use researcher::exit_codes;
use researcher::io::config::{DEFAULT_CONFIG_FILE, ResearcherConfig, load_config, write_config};
use researcher::io::executor::CodexExecutor;
use researcher::io::output::REVIEW_FILE;
use researcher::io::terminal::{prompt_base_dir, prompt_entry, prompt_question};
use researcher::research::{ResearchRequest, list_entry_candidates, run_research};

#[derive(Parser, Debug)]
#[command(
    name = "researcher",
    version,
    about = "Research a question across a codebase, starting from one file"
)]
struct Cli {
    /// Directory to research (prompted when omitted; defaults to the current directory).
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Entry file relative to the base directory (prompted when omitted).
    #[arg(long)]
    entry: Option<String>,

    /// Research question (prompted when omitted).
    #[arg(long)]
    question: Option<String>,

    /// Config file; missing means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Overrides `notes_dir` from the config.
    #[arg(long)]
    notes_dir: Option<PathBuf>,

    /// Write the default config to `--config` and exit.
    #[arg(long)]
    init_config: bool,
}

fn main() {
    researcher::logging::init();
    let code = match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    if cli.init_config {
        write_config(&cli.config, &ResearcherConfig::default())?;
        println!("wrote {}", cli.config.display());
        return Ok(exit_codes::OK);
    }
    let cfg = load_config(&cli.config)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => {
            let cwd = std::env::current_dir().context("resolve current directory")?;
            prompt_base_dir(&mut input, &mut out, &cwd)?
        }
    };
    let candidates = match list_entry_candidates(&base_dir) {
        Ok(files) => files,
        Err(err) => {
            eprintln!("cannot read base directory: {err:#}");
            return Ok(exit_codes::INVALID);
        }
    };

    let entry = match cli.entry {
        Some(entry) => {
            if !base_dir.join(&entry).is_file() {
                eprintln!("entry file {entry} not found in {}", base_dir.display());
                return Ok(exit_codes::INVALID);
            }
            entry
        }
        None => {
            if candidates.is_empty() {
                eprintln!("no files in {}", base_dir.display());
                return Ok(exit_codes::NO_FILES);
            }
            prompt_entry(&mut input, &mut out, &candidates)?
        }
    };
    let question = match cli.question {
        Some(question) if !question.trim().is_empty() => question,
        _ => prompt_question(&mut input, &mut out)?,
    };
    drop(input);

    let request = ResearchRequest {
        base_dir,
        entry,
        question,
        notes_dir: cli.notes_dir,
    };
    let outcome = run_research(&request, &cfg, CodexExecutor::from_config(&cfg.oracle))?;

    println!(
        "Researched {} file(s), {} problem(s), {} missing file(s).",
        outcome.summary.researched, outcome.problems, outcome.missing
    );
    println!("Report: {}", outcome.run_dir.join(REVIEW_FILE).display());
    println!("Running document: {}", outcome.running_document.display());
    if let Some(final_review) = &outcome.final_review {
        println!("Final review: {}", final_review.display());
    }
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_flags() {
        let cli = Cli::parse_from([
            "researcher",
            "--base-dir",
            "repo",
            "--entry",
            "src/main.ts",
            "--question",
            "How?",
            "--notes-dir",
            "out",
        ]);
        assert_eq!(cli.base_dir, Some(PathBuf::from("repo")));
        assert_eq!(cli.entry.as_deref(), Some("src/main.ts"));
        assert_eq!(cli.question.as_deref(), Some("How?"));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(cli.notes_dir, Some(PathBuf::from("out")));
        assert!(!cli.init_config);
    }

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["researcher"]);
        assert!(cli.base_dir.is_none());
        assert!(cli.entry.is_none());
        assert!(cli.question.is_none());
    }
}
