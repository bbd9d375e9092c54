// src/prompt.rs

//! Yes/no confirmation before acting on another branch's failures.

use std::io::{self, BufRead, Write};

use anyhow::Context;
use tracing::{info, warn};

use crate::errors::Result;

pub trait Confirm: Send + Sync {
    /// Ask `question`; `true` means go ahead.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Asks on stderr and reads answers from stdin until one is valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        ask(question, &mut input, &mut output)
    }
}

/// Answers yes to everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, question: &str) -> Result<bool> {
        info!(question, "assuming yes");
        Ok(true)
    }
}

/// One prompt loop. End of input counts as "no".
pub fn ask<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> Result<bool> {
    loop {
        write!(output, "{question} (yes/no) ").context("writing prompt")?;
        output.flush().context("flushing prompt")?;

        let mut line = String::new();
        if input.read_line(&mut line).context("reading answer")? == 0 {
            return Ok(false);
        }
        match parse_answer(&line) {
            Some(answer) => return Ok(answer),
            None => {
                warn!(answer = %line.trim(), "invalid input");
                writeln!(output, "Invalid input, answer y/yes, n/no").context("writing prompt")?;
            }
        }
    }
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn answer(input: &str) -> (bool, String) {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        let result = ask("Continue?", &mut input, &mut output).unwrap();
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn accepts_short_and_long_forms() {
        assert!(answer("y\n").0);
        assert!(answer("yes\n").0);
        assert!(!answer("n\n").0);
        assert!(!answer("no\n").0);
    }

    #[test]
    fn reprompts_until_valid() {
        let (result, printed) = answer("maybe\nYES\nyes\n");
        assert!(result);
        assert_eq!(printed.matches("Continue?").count(), 3);
        assert_eq!(printed.matches("Invalid input").count(), 2);
    }

    #[test]
    fn end_of_input_is_no() {
        assert!(!answer("").0);
    }

    #[test]
    fn assume_yes() {
        assert!(AssumeYes.confirm("anything?").unwrap());
    }
}
