//! # Prompter
//!
//! Every question atlasman asks a human goes through the [`Prompter`] trait: config
//! reset confirmations, project-type selection and the field-repair loop. The terminal
//! implementation wraps `dialoguer`; when nobody is attending the terminal the
//! [`NonInteractivePrompter`] refuses every question so scripted runs fail fast
//! instead of hanging on stdin.

use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("User Interface Error: {0}")]
    Terminal(#[from] dialoguer::Error),
    #[error("Input is required for '{prompt}', but the terminal is not interactive.")]
    NonInteractive { prompt: String },
    #[error("Operation cancelled by user.")]
    Cancelled,
}

pub type PromptResult<T> = Result<T, PromptError>;

impl PromptError {
    /// Whether the user backed out of the prompt (Esc, or Ctrl+C while reading input).
    pub fn is_interruption(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Terminal(dialoguer::Error::IO(e)) => e.kind() == std::io::ErrorKind::Interrupted,
            Self::NonInteractive { .. } => false,
        }
    }
}

/// A capability that maps a typed question to a typed answer.
pub trait Prompter {
    /// Asks for a line of text. An empty answer is allowed only when a default exists.
    fn text(&mut self, prompt: &str, default: Option<&str>) -> PromptResult<String>;
    /// Asks for a whole number.
    fn integer(&mut self, prompt: &str) -> PromptResult<i64>;
    /// Asks for a decimal number.
    fn float(&mut self, prompt: &str) -> PromptResult<f64>;
    /// Asks a yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> PromptResult<bool>;
    /// Asks the user to pick one of `items`, returning its index.
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> PromptResult<usize>;
}

/// Prompts on the attached terminal using `dialoguer`.
#[derive(Default)]
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl std::fmt::Debug for TerminalPrompter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalPrompter").finish_non_exhaustive()
    }
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for TerminalPrompter {
    fn text(&mut self, prompt: &str, default: Option<&str>) -> PromptResult<String> {
        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(prompt);
        if let Some(value) = default {
            input = input.default(value.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn integer(&mut self, prompt: &str) -> PromptResult<i64> {
        Ok(Input::<i64>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()?)
    }

    fn float(&mut self, prompt: &str) -> PromptResult<f64> {
        Ok(Input::<f64>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()?)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> PromptResult<bool> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> PromptResult<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact_opt()?
            .ok_or(PromptError::Cancelled)
    }
}

/// Refuses every question. Used when stdin/stdout are not a terminal.
#[derive(Debug, Default)]
pub struct NonInteractivePrompter;

impl NonInteractivePrompter {
    fn refuse<T>(prompt: &str) -> PromptResult<T> {
        Err(PromptError::NonInteractive {
            prompt: prompt.to_string(),
        })
    }
}

impl Prompter for NonInteractivePrompter {
    fn text(&mut self, prompt: &str, _default: Option<&str>) -> PromptResult<String> {
        Self::refuse(prompt)
    }

    fn integer(&mut self, prompt: &str) -> PromptResult<i64> {
        Self::refuse(prompt)
    }

    fn float(&mut self, prompt: &str) -> PromptResult<f64> {
        Self::refuse(prompt)
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> PromptResult<bool> {
        Self::refuse(prompt)
    }

    fn select(&mut self, prompt: &str, _items: &[String], _default: usize) -> PromptResult<usize> {
        Self::refuse(prompt)
    }
}

/// Picks the terminal prompter when a human is attending, the refusing one otherwise.
pub fn for_current_terminal() -> Box<dyn Prompter> {
    if dialoguer::console::user_attended() {
        Box::new(TerminalPrompter::new())
    } else {
        log::debug!("Terminal not attended; prompts are disabled.");
        Box::new(NonInteractivePrompter)
    }
}

#[cfg(test)]
pub(crate) use scripted::{Answer, ScriptedPrompter};
