//! # Config Store
//!
//! Loads and persists the atlasman configuration document (`config.json`). Every load
//! returns a document with the canonical shape: missing sections and keys are filled in
//! from [`canonical_document`] while everything the user wrote, including keys and
//! sections atlasman does not know about, is kept.
//!
//! Reconciliation is a shallow, per-section merge. Keys are filled one by one inside a
//! canonical section; nested values such as `trello.alias_ids` are never merged
//! recursively. A canonical section holding something other than an object is replaced
//! with its default, so a bad value never reaches the alias table or the credentials.
//! Whenever reconciliation changes the document it is written back immediately.

use crate::core::{
    paths::{self, PathError},
    prompter::{PromptError, Prompter},
};
use crate::models::Service;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("Could not access the configuration file at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "The configuration file at '{}' is malformed ({message}). Please correct its format or reset it to defaults.",
        .path.display()
    )]
    Malformed { path: PathBuf, message: String },
    #[error("Failed to serialize the configuration: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Missing '{key}' in the '{section}' section of the configuration file.")]
    MissingCredential { section: String, key: String },
    #[error("{0}")]
    Prompt(#[from] PromptError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// The canonical default document. Every loaded document contains at least these
/// sections and keys.
pub fn canonical_document() -> ConfigDocument {
    let value = json!({
        "trello": {
            "api_key": "",
            "api_token": "",
            "default_board": "",
            "alias_ids": {
                "shopping": { "board_id": "", "list_id": "" },
                "todo": { "board_id": "", "list_id": "" }
            }
        },
        "jira": {
            "api_token": "",
            "base_url": "https://yourdomain.atlassian.net",
            "username": "",
            "default_project_key": "",
            "default_issue_type": "Task",
            "show_done_issues": false,
            "custom_status_order": {
                "To Do": 1,
                "In Progress": 2,
                "Testing": 3,
                "Done": 4
            },
            "alias_ids": {}
        },
        "confluence": {
            "default_space_key": "",
            "alias_ids": {}
        },
        "cli": {
            "verbose": false,
            "default_tool": "trello",
            "output_format": "json",
            "editor": "",
            "request_timeout_secs": 30,
            "strict_name_matching": false
        }
    });

    match value {
        Value::Object(map) => ConfigDocument(map),
        _ => ConfigDocument::default(),
    }
}

/// The configuration document: a JSON object of sections, each a JSON object of settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct ConfigDocument(Map<String, Value>);

impl ConfigDocument {
    /// Returns a section if it exists and is an object.
    pub fn section(&self, section: &str) -> Option<&Map<String, Value>> {
        self.0.get(section).and_then(Value::as_object)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.section(section).and_then(|s| s.get(key))
    }

    /// Returns a string setting, treating an empty string as absent.
    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn get_bool(&self, section: &str, key: &str) -> bool {
        self.get(section, key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn get_u64(&self, section: &str, key: &str) -> Option<u64> {
        self.get(section, key).and_then(Value::as_u64)
    }

    /// Like [`Self::get_str`], but a missing value is a configuration error.
    pub fn require_str(&self, section: &str, key: &str) -> ConfigResult<&str> {
        self.get_str(section, key)
            .ok_or_else(|| ConfigError::MissingCredential {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    /// Sets a value, creating the section (or replacing a non-object one) as needed.
    pub fn set(&mut self, section: &str, key: &str, value: Value) {
        let entry = self
            .0
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
    }

    /// The alias records of one service (`<service>.alias_ids`), if present.
    pub fn aliases(&self, service: Service) -> Option<&Map<String, Value>> {
        self.get(service.section(), crate::constants::ALIAS_SECTION_KEY)
            .and_then(Value::as_object)
    }
}

impl From<Map<String, Value>> for ConfigDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Something reconciliation had to fix in a loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileWarning {
    MissingSection(String),
    SectionNotAnObject(String),
}

impl fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSection(section) => {
                write!(f, "Missing configuration section '{}', adding default.", section)
            }
            Self::SectionNotAnObject(section) => write!(
                f,
                "Expected '{}' to be an object, resetting it to default.",
                section
            ),
        }
    }
}

/// The result of reconciling a document against the canonical defaults.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub document: ConfigDocument,
    pub warnings: Vec<ReconcileWarning>,
    pub changed: bool,
}

/// Fills in every canonical section and key missing from `loaded`.
///
/// User values and unknown keys/sections are kept. A canonical section that is not an
/// object is replaced wholesale by its default.
pub fn reconcile(loaded: &ConfigDocument) -> Reconciliation {
    let canonical = canonical_document();
    let mut merged = loaded.0.clone();
    let mut warnings = Vec::new();

    for (section, defaults) in canonical.0 {
        match merged.get_mut(&section) {
            Some(Value::Object(existing)) => {
                if let Value::Object(default_keys) = defaults {
                    for (key, default_value) in default_keys {
                        existing.entry(key).or_insert(default_value);
                    }
                }
            }
            Some(other) => {
                warnings.push(ReconcileWarning::SectionNotAnObject(section.clone()));
                *other = defaults;
            }
            None => {
                warnings.push(ReconcileWarning::MissingSection(section.clone()));
                merged.insert(section, defaults);
            }
        }
    }

    let document = ConfigDocument(merged);
    let changed = document != *loaded;
    Reconciliation {
        document,
        warnings,
        changed,
    }
}

/// Reads and writes the configuration document at one path.
///
/// There is no in-memory caching: every `load`, `get` and `set` goes to disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// A store for the document at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A store for the per-user document (`~/.config/atlas-man/config.json`).
    pub fn from_default_location() -> ConfigResult<Self> {
        Ok(Self::at(paths::get_config_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document, creating it from the defaults on first run.
    ///
    /// A document that cannot be parsed triggers a reset prompt; declining (or having no
    /// terminal to ask on) returns [`ConfigError::Malformed`] naming the file.
    pub fn load(&self, prompter: &mut dyn Prompter) -> ConfigResult<ConfigDocument> {
        if !self.path.exists() {
            log::info!(
                "Configuration file not found. Creating a new one at {}.",
                self.path.display()
            );
            let defaults = canonical_document();
            self.save(&defaults)?;
            return Ok(defaults);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        match parse_document(&content) {
            Ok(loaded) => {
                let reconciliation = reconcile(&loaded);
                for warning in &reconciliation.warnings {
                    log::warn!("{}", warning);
                }
                if reconciliation.changed {
                    log::debug!("Configuration differs from its defaulted form; writing it back.");
                    self.save(&reconciliation.document)?;
                }
                Ok(reconciliation.document)
            }
            Err(message) => {
                log::error!("The configuration file is malformed: {}", message);
                let prompt = format!(
                    "The configuration file at '{}' is malformed. Reset it to defaults?",
                    self.path.display()
                );
                let reset = match prompter.confirm(&prompt, false) {
                    Ok(answer) => answer,
                    Err(PromptError::NonInteractive { .. }) => false,
                    Err(e) => return Err(e.into()),
                };
                if reset {
                    self.reset()
                } else {
                    Err(ConfigError::Malformed {
                        path: self.path.clone(),
                        message,
                    })
                }
            }
        }
    }

    /// Writes the document as pretty JSON, creating the directory if needed.
    ///
    /// The content goes to a temporary file in the same directory which is then renamed
    /// over the destination. Returns the destination path.
    pub fn save(&self, document: &ConfigDocument) -> ConfigResult<PathBuf> {
        let io_error = |source: std::io::Error| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(io_error)?;

        let mut content = serde_json::to_string_pretty(document)?;
        content.push('\n');

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
        temp.write_all(content.as_bytes()).map_err(io_error)?;
        temp.persist(&self.path).map_err(|e| io_error(e.error))?;

        log::info!("Configuration saved to {}.", self.path.display());
        Ok(self.path.clone())
    }

    /// Overwrites the document with the canonical defaults.
    pub fn reset(&self) -> ConfigResult<ConfigDocument> {
        let defaults = canonical_document();
        self.save(&defaults)?;
        Ok(defaults)
    }

    /// Loads the document and returns one value.
    pub fn get(
        &self,
        section: &str,
        key: &str,
        prompter: &mut dyn Prompter,
    ) -> ConfigResult<Option<Value>> {
        let document = self.load(prompter)?;
        Ok(document.get(section, key).cloned())
    }

    /// Loads the document, sets one value and saves it.
    pub fn set(
        &self,
        section: &str,
        key: &str,
        value: Value,
        prompter: &mut dyn Prompter,
    ) -> ConfigResult<PathBuf> {
        let mut document = self.load(prompter)?;
        document.set(section, key, value);
        self.save(&document)
    }
}

/// Parses a document, requiring a top-level JSON object.
fn parse_document(content: &str) -> Result<ConfigDocument, String> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(ConfigDocument(map)),
        Ok(_) => Err("the top level must be a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
