//! # Handler for the `config` command
//!
//! Inspects and edits the configuration document. `path` and `edit` never load the
//! document, so they keep working when the file is malformed.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use std::{env, fs, path::Path};

use crate::{
    cli::handlers::commons::{self, Session},
    core::config_store::canonical_document,
    system::editor,
};

// --- Command Argument Parsing ---

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Inspect and edit the atlasman configuration.")]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Prints the path of the configuration file.
    Path,
    /// Prints the whole configuration document.
    Show,
    /// Opens the configuration file in your editor.
    Edit,
    /// Prints one value.
    Get { section: String, key: String },
    /// Sets one value. The value is read as JSON when it parses, as a string otherwise.
    Set {
        section: String,
        key: String,
        value: String,
    },
}

// --- Main Handler ---

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let config_args = ConfigArgs::try_parse_from(&args)?;

    match config_args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Path => {
            println!("{}", session.store().path().display());
            Ok(())
        }
        ConfigCommand::Show => {
            let document = session.config()?;
            commons::print_json(document)
        }
        ConfigCommand::Edit => edit(session),
        ConfigCommand::Get { section, key } => {
            let store = session.store().clone();
            match store.get(&section, &key, session.prompter())? {
                Some(Value::String(text)) => println!("{}", text),
                Some(value) => commons::print_json(&value)?,
                None => {
                    return Err(anyhow!(
                        t!("config.error.key_not_found"),
                        section = section,
                        key = key
                    ));
                }
            }
            Ok(())
        }
        ConfigCommand::Set {
            section,
            key,
            value,
        } => {
            let store = session.store().clone();
            let path = store.set(&section, &key, commons::parse_value(&value), session.prompter())?;
            session.invalidate();
            commons::print_success(&format!(
                t!("config.success.value_set"),
                section = section,
                key = key,
                path = path.display()
            ));
            Ok(())
        }
    }
}

// --- Subcommand Logic ---

fn edit(session: &mut Session) -> Result<()> {
    let store = session.store().clone();
    if !store.path().exists() {
        store.save(&canonical_document())?;
    }

    let configured = configured_editor(store.path());
    let editor_cmd = editor::resolve_editor(configured.as_deref(), |key| env::var(key).ok());
    editor::edit_file(&editor_cmd, store.path())?;

    // Reload so a broken edit is reported (and can be reset) right away.
    session.invalidate();
    session.config()?;
    println!(
        "{}",
        format!(t!("config.success.edited"), path = store.path().display()).green()
    );
    Ok(())
}

/// `cli.editor` read straight from the file, tolerating a malformed document.
fn configured_editor(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let document: Value = serde_json::from_str(&content).ok()?;
    document
        .pointer("/cli/editor")
        .and_then(Value::as_str)
        .map(str::to_string)
}
