//! # Handler for the `confluence` command
//!
//! Pages of a space. Confluence shares the Jira credentials; the space defaults to
//! `confluence.default_space_key`.

use anyhow::{Context, Result, anyhow};
use clap::{ArgGroup, Parser, Subcommand};
use colored::*;
use serde_json::json;
use std::{env, fs, path::PathBuf};

use crate::{
    cli::handlers::commons::{self, OutputFormat, Session},
    core::{
        config_store::ConfigDocument, entity_resolver::EntityResolver,
        repair_executor::RepairExecutor,
    },
    models::{EntityKind, EntityRef},
    system::{
        confluence::{self, ConfluenceClient},
        editor,
        jira::AtlassianCredentials,
    },
};

// --- Command Argument Parsing ---

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Manage Confluence pages.")]
struct ConfluenceArgs {
    #[command(subcommand)]
    command: Option<ConfluenceCommand>,
}

#[derive(Subcommand, Debug)]
enum ConfluenceCommand {
    /// Lists the pages of a space.
    Pages {
        /// Space alias, key or name (defaults to `confluence.default_space_key`).
        space: Option<String>,
    },
    /// Shows a page.
    Page {
        page: String,
        #[arg(short, long)]
        space: Option<String>,
    },
    /// Opens a page in your editor and saves the result as a new version.
    EditPage {
        page: String,
        #[arg(short, long)]
        space: Option<String>,
    },
    /// Creates a page from inline content or a file (storage format).
    #[command(group(ArgGroup::new("source").args(["content", "file"])))]
    AddPage {
        title: String,
        #[arg(short, long)]
        space: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Deletes a page.
    DeletePage {
        page: String,
        #[arg(short, long)]
        space: Option<String>,
        #[arg(short, long)]
        yes: bool,
    },
}

// --- Main Handler ---

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let confluence_args = ConfluenceArgs::try_parse_from(&args)?;
    let command = confluence_args
        .command
        .unwrap_or(ConfluenceCommand::Pages { space: None });

    let config = session.config()?.clone();
    let format = OutputFormat::from_config(&config);
    let credentials = AtlassianCredentials::from_config(&config)?;
    let client = ConfluenceClient::new(&credentials, commons::request_timeout(&config))?;
    let resolver = EntityResolver::new(&config, &client);

    match command {
        ConfluenceCommand::Pages { space } => {
            let space = space_scope(&resolver, &config, space)?;
            let pages = resolver.list_children(EntityKind::Page, Some(&space))?;
            let header = format!(t!("confluence.header.pages"), space = space.id);
            commons::print_entities(format, &header, &pages)
        }
        ConfluenceCommand::Page { page, space } => {
            let page = resolve_page(&resolver, &config, &page, space)?;
            let content = client.page_content(&page.id)?;
            if format == OutputFormat::Json {
                return commons::print_json(&json!({
                    "id": content.id,
                    "title": content.title,
                    "version": content.version,
                    "body": content.body,
                }));
            }
            println!("{} {}", content.title.bold(), format!("(v{})", content.version).dimmed());
            println!("{}", content.body);
            Ok(())
        }
        ConfluenceCommand::EditPage { page, space } => {
            let page = resolve_page(&resolver, &config, &page, space)?;
            let content = client.page_content(&page.id)?;
            let editor_cmd = editor::resolve_editor(config.get_str("cli", "editor"), |key| env::var(key).ok());

            let edited = editor::edit_text(&editor_cmd, &content.body, ".html")?;
            if edited == content.body {
                println!("{}", t!("confluence.info.unchanged").yellow());
                return Ok(());
            }
            client.update_page(&content, &edited)?;
            commons::print_success(&format!(
                t!("confluence.success.page_updated"),
                title = content.title,
                version = content.version + 1
            ));
            Ok(())
        }
        ConfluenceCommand::AddPage {
            title,
            space,
            content,
            file,
        } => {
            let space = space_scope(&resolver, &config, space)?;
            let body = match (content, file) {
                (Some(content), _) => content,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!(t!("confluence.error.read_file"), path = path.display()))?,
                (None, None) => String::new(),
            };

            let fields = confluence::page_payload(&space.id, &title, &body);
            let created = RepairExecutor::new(session.prompter())
                .create_with_repair(fields, |payload| client.create_page(payload))?;
            commons::print_success(&format!(
                t!("confluence.success.page_created"),
                title = title,
                id = created.id
            ));
            Ok(())
        }
        ConfluenceCommand::DeletePage { page, space, yes } => {
            let page = resolve_page(&resolver, &config, &page, space)?;
            let prompt = format!(t!("confluence.prompt.delete_page"), page = page.label());
            if session.confirm(&prompt, yes)? {
                client.delete_page(&page.id)?;
                commons::print_success(&format!(t!("confluence.success.page_deleted"), page = page.label()));
            }
            Ok(())
        }
    }
}

// --- Subcommand Logic ---

fn space_scope(
    resolver: &EntityResolver<'_>,
    config: &ConfigDocument,
    explicit: Option<String>,
) -> Result<EntityRef> {
    let token = commons::token_or_default(explicit, config, "confluence", "default_space_key")
        .ok_or_else(|| anyhow!(t!("confluence.error.space_required")))?;
    Ok(resolver.resolve(EntityKind::Space, &token)?)
}

fn resolve_page(
    resolver: &EntityResolver<'_>,
    config: &ConfigDocument,
    token: &str,
    space: Option<String>,
) -> Result<EntityRef> {
    resolver.resolve_with(EntityKind::Page, token, || space_scope(resolver, config, space))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_page_sources_are_exclusive() {
        let err = ConfluenceArgs::try_parse_from(["add-page", "Runbook", "--content", "x", "--file", "a.html"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_defaults_to_listing_pages() {
        let args = ConfluenceArgs::try_parse_from(Vec::<String>::new()).unwrap();
        assert!(args.command.is_none());
    }
}
