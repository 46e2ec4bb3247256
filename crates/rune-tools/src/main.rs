//! `fmtheader`: pads separator lines out to a fixed column width.
//!
//! A separator line contains a run of three-or-more `=` or `-` characters.
//! The last such run on the line is stretched (or shrunk, never below three
//! characters) so the whole line is exactly [`TARGET_COLUMNS`] columns, with
//! everything before and after the run preserved. Runs of other characters
//! (`.`, `*`, ...) are left alone.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

/// Width every separator line is normalized to.
const TARGET_COLUMNS: usize = 120;

/// Minimum run length, both for recognition and after shrinking.
const MIN_RUN: usize = 3;

#[derive(Debug, Error)]
enum ToolError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pads separator lines in one or more files to 120 columns.
#[derive(Debug, Parser)]
#[command(name = "fmtheader")]
#[command(about = "Extend =/- separator lines to a fixed width")]
struct Cli {
    /// Files to rewrite in place.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

/// The last run of `MIN_RUN`-or-more `=` or `-` characters, as a
/// `(start, len)` pair in char positions.
fn last_separator_run(chars: &[char]) -> Option<(usize, usize)> {
    let mut found = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut j = i + 1;
        while j < chars.len() && chars[j] == c {
            j += 1;
        }
        if (c == '=' || c == '-') && j - i >= MIN_RUN {
            found = Some((i, j - i));
        }
        i = j;
    }
    found
}

/// Reformats one line, without its terminator. `None` when the line is left
/// unchanged.
fn reformat_line(line: &str) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    let (start, len) = last_separator_run(&chars)?;
    let fixed = chars.len() - len;
    let want = TARGET_COLUMNS.checked_sub(fixed)?;
    if want < MIN_RUN || want == len {
        return None;
    }
    let mut out = String::with_capacity(TARGET_COLUMNS);
    out.extend(&chars[..start]);
    out.extend(std::iter::repeat_n(chars[start], want));
    out.extend(&chars[start + len..]);
    Some(out)
}

fn process_file(path: &PathBuf) -> Result<bool, ToolError> {
    let text = fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.clone(),
        source,
    })?;
    let mut changed = false;
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, terminator) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        let (body, terminator) = match body.strip_suffix('\r') {
            Some(stripped) => (stripped, if terminator.is_empty() { "\r" } else { "\r\n" }),
            None => (body, terminator),
        };
        match reformat_line(body) {
            Some(new_body) => {
                changed = true;
                out.push_str(&new_body);
            }
            None => out.push_str(body),
        }
        out.push_str(terminator);
    }
    if changed {
        fs::write(path, out).map_err(|source| ToolError::Io {
            path: path.clone(),
            source,
        })?;
    }
    Ok(changed)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut failed = false;
    for path in &cli.files {
        if let Err(err) = process_file(path) {
            eprintln!("fmtheader: {err}");
            failed = true;
        }
    }
    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
