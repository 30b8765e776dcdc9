//! Interactive task picker shown before a run on a terminal.
use std::collections::{BTreeSet, HashSet};
use std::io::{self, BufRead, Write};

use taskmill_core::config::RunConfig;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("'{0}' is not a number or range")]
    InvalidToken(String),
    #[error("{index} is out of range (1-{max})")]
    OutOfRange { index: usize, max: usize },
    #[error("range {start}-{end} is reversed")]
    ReversedRange { start: usize, end: usize },
}

pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout)
}

/// Parses `2-4`, `1,3,5` or a mix into sorted, deduplicated zero-based
/// indices. Blank input or `all` selects everything.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, SelectionError> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("all") {
        return Ok((0..count).collect());
    }

    let mut picked = BTreeSet::new();
    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => (number(a, token)?, number(b, token)?),
            None => {
                let n = number(token, token)?;
                (n, n)
            }
        };
        if start > end {
            return Err(SelectionError::ReversedRange { start, end });
        }
        for index in [start, end] {
            if index == 0 || index > count {
                return Err(SelectionError::OutOfRange { index, max: count });
            }
        }
        picked.extend((start..=end).map(|i| i - 1));
    }
    Ok(picked.into_iter().collect())
}

fn number(raw: &str, token: &str) -> Result<usize, SelectionError> {
    raw.trim()
        .parse()
        .map_err(|_| SelectionError::InvalidToken(token.to_string()))
}

/// Lists enabled tasks and reads a selection, re-prompting until it parses.
/// End of input selects every task.
pub fn prompt_selection<R: BufRead, W: Write>(
    config: &RunConfig,
    reader: &mut R,
    writer: &mut W,
) -> io::Result<HashSet<String>> {
    let tasks: Vec<_> = config.enabled_tasks().collect();

    writeln!(writer, "Tasks:")?;
    for (i, def) in tasks.iter().enumerate() {
        if def.display_name() == def.id {
            writeln!(writer, "  {:>2}. {}", i + 1, def.id)?;
        } else {
            writeln!(writer, "  {:>2}. {} ({})", i + 1, def.id, def.display_name())?;
        }
    }

    loop {
        write!(writer, "Select tasks (e.g. 2-4 or 1,3,5; Enter for all): ")?;
        writer.flush()?;

        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            writeln!(writer)?;
            return Ok(tasks.iter().map(|t| t.id.clone()).collect());
        }

        match parse_selection(&line, tasks.len()) {
            Ok(indices) => return Ok(indices.into_iter().map(|i| tasks[i].id.clone()).collect()),
            Err(e) => writeln!(writer, "Invalid selection: {e}")?,
        }
    }
}
