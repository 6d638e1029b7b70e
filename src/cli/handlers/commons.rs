// src/cli/handlers/commons.rs

// Shared state and helpers used by every handler.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use dialoguer::console::measure_text_width;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::{
    constants::DEFAULT_TIMEOUT_SECS,
    core::{
        config_store::{ConfigDocument, ConfigStore},
        prompter::{self, Prompter},
    },
    models::RemoteEntity,
};

/// Everything a handler needs for one run: the config store, the (lazily loaded)
/// configuration document and the prompter.
pub struct Session {
    store: ConfigStore,
    config: Option<ConfigDocument>,
    prompter: Box<dyn Prompter>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("loaded", &self.config.is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: ConfigStore, prompter: Box<dyn Prompter>) -> Self {
        Self {
            store,
            config: None,
            prompter,
        }
    }

    /// A session on the per-user config file, prompting on the terminal when attended.
    pub fn from_environment() -> Result<Self> {
        let store = ConfigStore::from_default_location()
            .context("Could not locate the atlasman configuration directory")?;
        Ok(Self::new(store, prompter::for_current_terminal()))
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// The configuration document, loaded (and reconciled) on first use.
    pub fn config(&mut self) -> Result<&ConfigDocument> {
        self.ensure_loaded()?;
        self.config
            .as_ref()
            .ok_or_else(|| anyhow!("configuration was not loaded"))
    }

    pub fn prompter(&mut self) -> &mut dyn Prompter {
        self.prompter.as_mut()
    }

    /// Forgets the loaded document so the next access reads the file again.
    pub fn invalidate(&mut self) {
        self.config = None;
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.config.is_none() {
            let document = self.store.load(self.prompter.as_mut())?;
            if document.get_bool("cli", "verbose") && log::max_level() < log::LevelFilter::Debug {
                log::set_max_level(log::LevelFilter::Debug);
                log::debug!("Verbose logging enabled by the configuration file.");
            }
            self.config = Some(document);
        }
        Ok(())
    }

    /// Asks before a destructive operation. `assume_yes` skips the question.
    pub fn confirm(&mut self, prompt: &str, assume_yes: bool) -> Result<bool> {
        if assume_yes {
            return Ok(true);
        }
        let confirmed = self.prompter.confirm(prompt, false)?;
        if !confirmed {
            println!("{}", t!("common.info.cancelled").yellow());
        }
        Ok(confirmed)
    }
}

/// The remote request timeout from `cli.request_timeout_secs`.
pub fn request_timeout(config: &ConfigDocument) -> Duration {
    let secs = config
        .get_u64("cli", "request_timeout_secs")
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// The explicit token, else the configured default at `section.key`.
pub fn token_or_default(
    explicit: Option<String>,
    config: &ConfigDocument,
    section: &str,
    key: &str,
) -> Option<String> {
    explicit.or_else(|| config.get_str(section, key).map(str::to_string))
}

/// Parses a command-line value as JSON when possible, otherwise keeps it as a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

// --- Output ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_config(config: &ConfigDocument) -> Self {
        match config.get_str("cli", "output_format") {
            Some(format) if format.eq_ignore_ascii_case("text") => Self::Text,
            _ => Self::Json,
        }
    }
}

/// Prints any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints a listing of remote entities, as JSON or as aligned `id  name` lines.
pub fn print_entities(format: OutputFormat, header: &str, entities: &[RemoteEntity]) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(entities);
    }

    println!("{}", header.bold());
    if entities.is_empty() {
        println!("  {}", t!("common.info.none").dimmed());
        return Ok(());
    }

    let width = entities
        .iter()
        .map(|e| measure_text_width(&e.id))
        .max()
        .unwrap_or(0);
    for entity in entities {
        let id = format!("{:<width$}", entity.id, width = width);
        match &entity.status {
            Some(status) => println!("  {}  {} {}", id.cyan(), entity.name, format!("[{}]", status).dimmed()),
            None => println!("  {}  {}", id.cyan(), entity.name),
        }
    }
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", t!("common.success").green().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_store::canonical_document;
    use serde_json::json;

    #[test]
    fn test_parse_value_prefers_json() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value(r#"{"board_id":"B1"}"#), json!({ "board_id": "B1" }));
        assert_eq!(parse_value("hello world"), json!("hello world"));
        assert_eq!(parse_value(""), json!(""));
    }

    #[test]
    fn test_output_format_from_config() {
        let mut config = canonical_document();
        assert_eq!(OutputFormat::from_config(&config), OutputFormat::Json);
        config.set("cli", "output_format", json!("Text"));
        assert_eq!(OutputFormat::from_config(&config), OutputFormat::Text);
        config.set("cli", "output_format", json!("yaml"));
        assert_eq!(OutputFormat::from_config(&config), OutputFormat::Json);
    }

    #[test]
    fn test_request_timeout_falls_back_to_default() {
        let mut config = canonical_document();
        assert_eq!(request_timeout(&config), Duration::from_secs(30));
        config.set("cli", "request_timeout_secs", json!(5));
        assert_eq!(request_timeout(&config), Duration::from_secs(5));
        config.set("cli", "request_timeout_secs", json!(0));
        assert_eq!(request_timeout(&config), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_token_or_default() {
        let mut config = canonical_document();
        assert_eq!(token_or_default(None, &config, "jira", "default_project_key"), None);
        config.set("jira", "default_project_key", json!("OPS"));
        assert_eq!(
            token_or_default(None, &config, "jira", "default_project_key").as_deref(),
            Some("OPS")
        );
        assert_eq!(
            token_or_default(Some("WEB".into()), &config, "jira", "default_project_key").as_deref(),
            Some("WEB")
        );
    }
}
