//! Interactive prompts for run inputs not given on the command line.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Read one trimmed line after printing `label`. EOF is an error.
fn prompt_line<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<String> {
    write!(out, "{label}").context("write prompt")?;
    out.flush().context("flush prompt")?;
    let mut line = String::new();
    let read = input.read_line(&mut line).context("read answer")?;
    if read == 0 {
        bail!("input closed while waiting for: {}", label.trim_end());
    }
    Ok(line.trim().to_string())
}

/// Ask for the base directory; an empty answer keeps `default`.
pub fn prompt_base_dir<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    default: &Path,
) -> Result<PathBuf> {
    let answer = prompt_line(
        input,
        out,
        &format!("Base directory [{}]: ", default.display()),
    )?;
    if answer.is_empty() {
        Ok(default.to_path_buf())
    } else {
        Ok(PathBuf::from(answer))
    }
}

/// Ask for the entry file among `candidates`, by number or by name.
pub fn prompt_entry<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    candidates: &[String],
) -> Result<String> {
    writeln!(out, "Files:").context("write prompt")?;
    for (idx, name) in candidates.iter().enumerate() {
        writeln!(out, "  {}. {name}", idx + 1).context("write prompt")?;
    }
    loop {
        let answer = prompt_line(input, out, "Entry file (number or name): ")?;
        if let Ok(number) = answer.parse::<usize>()
            && let Some(name) = number.checked_sub(1).and_then(|idx| candidates.get(idx))
        {
            return Ok(name.clone());
        }
        if let Some(name) = candidates.iter().find(|name| **name == answer) {
            return Ok(name.clone());
        }
        writeln!(out, "Not one of the listed files: {answer:?}").context("write prompt")?;
    }
}

/// Ask for a non-empty research question.
pub fn prompt_question<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<String> {
    loop {
        let answer = prompt_line(input, out, "Research question: ")?;
        if !answer.is_empty() {
            return Ok(answer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_base_dir_answer_keeps_default() {
        let mut out = Vec::new();
        let dir = prompt_base_dir(&mut Cursor::new("\n"), &mut out, Path::new("/work"))
            .expect("prompt");
        assert_eq!(dir, PathBuf::from("/work"));
        assert!(String::from_utf8_lossy(&out).contains("[/work]"));
    }

    #[test]
    fn entry_accepts_number_or_name_and_reprompts() {
        let candidates = vec!["Sample.ts".to_string(), "other.ts".to_string()];
        let mut out = Vec::new();
        let entry = prompt_entry(&mut Cursor::new("9\nnope\n2\n"), &mut out, &candidates)
            .expect("prompt");
        assert_eq!(entry, "other.ts");
        assert_eq!(
            String::from_utf8_lossy(&out)
                .matches("Not one of the listed files")
                .count(),
            2
        );

        let entry = prompt_entry(&mut Cursor::new("Sample.ts\n"), &mut Vec::new(), &candidates)
            .expect("prompt");
        assert_eq!(entry, "Sample.ts");
    }

    #[test]
    fn question_skips_blank_lines_and_fails_on_eof() {
        let question =
            prompt_question(&mut Cursor::new("\n  \nHow?\n"), &mut Vec::new()).expect("prompt");
        assert_eq!(question, "How?");
        assert!(prompt_question(&mut Cursor::new(""), &mut Vec::new()).is_err());
    }
}
