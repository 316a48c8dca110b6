//! Typed prompts on top of a `Console`
//!
//! Every prompt loops until it gets acceptable input: blank input is
//! re-asked when an answer is required, and text that does not parse into
//! the requested type (or fails validation) is reported and re-asked.

use std::str::FromStr;

use anyhow::Result;

use crate::console::Console;
use crate::output::INPUT_PREFIX;

/// Ask for an optional value of type `T`. Blank input gives `None`.
pub fn ask<T: FromStr>(console: &mut dyn Console, question: &str) -> Result<Option<T>> {
    ask_with(console, question, false, |_: &T| Ok(()))
}

/// Ask for a value of type `T`, re-asking on blank input
pub fn ask_required<T: FromStr>(console: &mut dyn Console, question: &str) -> Result<T> {
    let value = ask_with(console, question, true, |_: &T| Ok(()))?;
    value.ok_or_else(|| anyhow::anyhow!("Required input missing"))
}

/// Ask for a value of type `T`, falling back to `default` on blank input
pub fn ask_or<T: FromStr>(console: &mut dyn Console, question: &str, default: T) -> Result<T> {
    Ok(ask(console, question)?.unwrap_or(default))
}

/// Ask for a value that must also pass `validate`. The validator's error
/// text is shown as a warning before re-asking.
pub fn ask_with<T, F>(
    console: &mut dyn Console,
    question: &str,
    required: bool,
    validate: F,
) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&T) -> std::result::Result<(), String>,
{
    if !question.is_empty() {
        console.write_line(question);
    }
    loop {
        let input = console.read_line(INPUT_PREFIX)?;
        let input = input.trim();

        if input.is_empty() {
            if required {
                console.warning("Input required.");
                continue;
            }
            return Ok(None);
        }

        let value = match input.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                console.warning("Invalid input.");
                continue;
            }
        };

        match validate(&value) {
            Ok(()) => return Ok(Some(value)),
            Err(msg) => console.warning(&msg),
        }
    }
}

/// Ask a yes/no question.
///
/// With `default` set, blank input returns it; with `None` an explicit
/// answer is required.
pub fn confirm(console: &mut dyn Console, question: &str, default: Option<bool>) -> Result<bool> {
    let hint = match default {
        None => " [y/n] ",
        Some(true) => " [Y/n] ",
        Some(false) => " [y/N] ",
    };
    let prompt = format!("{}{}", question, hint);

    loop {
        let choice = console.read_line(&prompt)?.trim().to_lowercase();
        match (choice.as_str(), default) {
            ("", Some(default)) => return Ok(default),
            ("yes" | "y" | "ye", _) => return Ok(true),
            ("no" | "n", _) => return Ok(false),
            _ => console.write_line("Please respond with 'yes' or 'no' (or 'y' or 'n')."),
        }
    }
}

/// Ask for a secret without echo. Blank input is re-asked.
pub fn password(console: &mut dyn Console, prompt: &str) -> Result<String> {
    loop {
        let secret = console.read_password(prompt)?;
        if !secret.is_empty() {
            return Ok(secret);
        }
        console.warning("Input required.");
    }
}

/// Ask for an index into a list of `len` items. Blank input gives `None`.
pub fn choose_index(console: &mut dyn Console, question: &str, len: usize) -> Result<Option<usize>> {
    let choice = ask_with(console, question, false, |n: &usize| {
        if (1..=len).contains(n) {
            Ok(())
        } else {
            Err(format!("Choose a number between 1 and {}.", len))
        }
    })?;
    Ok(choice.map(|n| n - 1))
}
