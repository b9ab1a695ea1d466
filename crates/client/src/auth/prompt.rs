//! User-facing prompts used by the stock authentication hooks.

use std::io::{self, BufRead, Write};

/// Interactive surface for the authentication exchange.
///
/// Calls block until the user answers. `None` means no input was obtained
/// (closed stdin, cancelled prompt); callers treat it as an empty answer.
pub trait Prompter: Send {
    /// Show text to the user.
    fn display(&mut self, text: &str);

    /// Ask a question whose answer is echoed while typed.
    fn prompt(&mut self, text: &str) -> Option<String>;

    /// Ask a question without echoing the answer.
    fn prompt_secret(&mut self, text: &str) -> Option<String>;
}

/// Prompter backed by the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn display(&mut self, text: &str) {
        println!("{}", text);
    }

    fn prompt(&mut self, text: &str) -> Option<String> {
        print!("{}", text);
        if let Err(e) = io::stdout().flush() {
            tracing::warn!(error = %e, "Failed to flush prompt");
        }

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read answer");
                None
            }
        }
    }

    fn prompt_secret(&mut self, text: &str) -> Option<String> {
        match rpassword::prompt_password(text) {
            Ok(answer) => Some(answer),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read masked answer");
                None
            }
        }
    }
}

/// Prompter that replays canned answers and records what it was asked.
///
/// Embedders use it for non-interactive sessions; the test suites use it to
/// observe which prompt style each question received.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    /// Every prompt issued, tagged with whether it was masked.
    pub asked: Vec<(String, bool)>,
    /// Everything passed to [`Prompter::display`].
    pub displayed: Vec<String>,
}

impl ScriptedPrompter {
    /// Create a prompter that answers with `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
            displayed: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn display(&mut self, text: &str) {
        self.displayed.push(text.to_string());
    }

    fn prompt(&mut self, text: &str) -> Option<String> {
        self.asked.push((text.to_string(), false));
        self.answers.pop_front()
    }

    fn prompt_secret(&mut self, text: &str) -> Option<String> {
        self.asked.push((text.to_string(), true));
        self.answers.pop_front()
    }
}
