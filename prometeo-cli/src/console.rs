//! Console I/O
//!
//! Everything the menu and the plugins read or print goes through the
//! `Console` trait, so whole sessions can be scripted in tests.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use dialoguer::{Input, Password};

use crate::output::{format_line, Level};

pub trait Console {
    /// Read one line of input (without the trailing newline).
    /// End of input is an `io::ErrorKind::UnexpectedEof` error.
    fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// Read a line without echoing it
    fn read_password(&mut self, prompt: &str) -> Result<String>;

    fn write_line(&mut self, line: &str);

    /// Print a status line with its level prefix
    fn print(&mut self, level: Level, msg: &str) {
        self.write_line(&format_line(level, msg));
    }

    fn info(&mut self, msg: &str) {
        self.print(Level::Info, msg);
    }

    fn success(&mut self, msg: &str) {
        self.print(Level::Success, msg);
    }

    fn warning(&mut self, msg: &str) {
        self.print(Level::Warning, msg);
    }

    fn error(&mut self, msg: &str) {
        self.print(Level::Error, msg);
    }
}

/// Whether an error means the input stream is closed
pub fn is_end_of_input(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::UnexpectedEof)
    })
}

fn end_of_input() -> anyhow::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "end of input").into()
}

/// Console on the process terminal
///
/// Uses dialoguer when stdin is a terminal, and plain line reads when input
/// is piped.
pub struct TerminalConsole {
    interactive: bool,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            interactive: atty::is(atty::Stream::Stdin),
        }
    }

    fn read_piped(&mut self, prompt: &str) -> Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(end_of_input());
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        if !self.interactive {
            return self.read_piped(prompt);
        }
        let line: String = Input::new()
            .with_prompt(prompt.trim_end())
            .allow_empty(true)
            .interact_text()?;
        Ok(line)
    }

    fn read_password(&mut self, prompt: &str) -> Result<String> {
        if !self.interactive {
            return self.read_piped(prompt);
        }
        let password = Password::new()
            .with_prompt(prompt.trim_end())
            .allow_empty_password(true)
            .interact()?;
        Ok(password)
    }

    fn write_line(&mut self, line: &str) {
        println!("{}", line);
    }

    fn print(&mut self, level: Level, msg: &str) {
        let line = format_line(level, msg);
        if level == Level::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// Console fed from a fixed list of input lines, recording every output
/// line uncolored
#[cfg(test)]
pub struct ScriptedConsole {
    inputs: std::collections::VecDeque<String>,
    pub output: Vec<String>,
    pub prompts: Vec<String>,
}

#[cfg(test)]
impl ScriptedConsole {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// Inputs not consumed yet
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }

    pub fn printed(&self, needle: &str) -> bool {
        self.output.iter().any(|line| line.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.output.iter().filter(|line| line.contains(needle)).count()
    }
}

#[cfg(test)]
impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        self.inputs.pop_front().ok_or_else(end_of_input)
    }

    fn read_password(&mut self, prompt: &str) -> Result<String> {
        self.read_line(prompt)
    }

    fn write_line(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn print(&mut self, level: Level, msg: &str) {
        self.output.push(format!("{}{}", level.prefix(), msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_console_reads_in_order() {
        let mut console = ScriptedConsole::new(&["one", "two"]);
        assert_eq!(console.read_line("> ").unwrap(), "one");
        assert_eq!(console.read_password("pw: ").unwrap(), "two");
        assert_eq!(console.prompts, vec!["> ", "pw: "]);

        let err = console.read_line("> ").unwrap_err();
        assert!(is_end_of_input(&err));
    }

    #[test]
    fn test_levels_are_prefixed() {
        let mut console = ScriptedConsole::new(&[]);
        console.info("a");
        console.success("b");
        console.warning("c");
        console.error("d");
        assert_eq!(console.output, vec!["INFO::a", "OK::b", "WARNING::c", "ERROR::d"]);
    }

    #[test]
    fn test_other_errors_are_not_end_of_input() {
        let err = anyhow::anyhow!("something else");
        assert!(!is_end_of_input(&err));
    }
}
