//! # Handler for the `trello` command
//!
//! Boards, lists and cards. Every token the user types (`--board todo`, `cards Backlog`)
//! goes through the entity resolver, so aliases, raw ids and exact names all work.
//! Board scope defaults to `trello.default_board` when `--board` is omitted.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::{Value, json};

use crate::{
    cli::handlers::commons::{self, OutputFormat, Session},
    core::{
        alias_table::AliasTable,
        config_store::ConfigDocument,
        entity_resolver::EntityResolver,
        repair_executor::RepairExecutor,
    },
    models::{EntityKind, EntityRef, FieldMap, Service},
    system::trello::{TrelloClient, TrelloCredentials},
};

// --- Command Argument Parsing ---

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Manage Trello boards, lists and cards.")]
struct TrelloArgs {
    #[command(subcommand)]
    command: Option<TrelloCommand>,
}

#[derive(Subcommand, Debug)]
enum TrelloCommand {
    /// Lists your open boards.
    Boards,
    /// Lists the open lists of a board.
    Lists {
        /// Board alias, id or name (defaults to `trello.default_board`).
        #[arg(short, long)]
        board: Option<String>,
    },
    /// Lists the cards of a list.
    Cards {
        /// List alias, id or name.
        list: String,
        #[arg(short, long)]
        board: Option<String>,
    },
    /// Shows the Trello aliases from the configuration file.
    Aliases,
    /// Creates a board.
    AddBoard { name: String },
    /// Creates a list at the bottom of a board.
    AddList {
        name: String,
        #[arg(short, long)]
        board: Option<String>,
    },
    /// Creates a card in a list.
    AddCard {
        list: String,
        name: String,
        /// Card description.
        #[arg(short, long)]
        desc: Option<String>,
        #[arg(short, long)]
        board: Option<String>,
    },
    /// Permanently deletes a board.
    DeleteBoard {
        board: String,
        /// Skip the confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Archives a list.
    CloseList {
        list: String,
        #[arg(short, long)]
        board: Option<String>,
        #[arg(short, long)]
        yes: bool,
    },
    /// Permanently deletes a card.
    DeleteCard {
        card: String,
        /// The list holding the card, needed when `card` is a name.
        #[arg(short, long)]
        list: Option<String>,
        #[arg(short, long)]
        board: Option<String>,
        #[arg(short, long)]
        yes: bool,
    },
}

// --- Main Handler ---

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let trello_args = TrelloArgs::try_parse_from(&args)?;
    let command = trello_args.command.unwrap_or(TrelloCommand::Boards);

    let config = session.config()?.clone();
    let format = OutputFormat::from_config(&config);

    if let TrelloCommand::Aliases = command {
        return list_aliases(&config, format);
    }

    let client = TrelloClient::new(
        TrelloCredentials::from_config(&config)?,
        commons::request_timeout(&config),
    )?;
    let resolver = EntityResolver::new(&config, &client);
    let scope = Scope {
        config: &config,
        resolver: &resolver,
    };

    match command {
        TrelloCommand::Boards => {
            let boards = resolver.list_children(EntityKind::Board, None)?;
            commons::print_entities(format, t!("trello.header.boards"), &boards)
        }
        TrelloCommand::Lists { board } => {
            let board = scope.board(board)?;
            let lists = resolver.list_children(EntityKind::List, Some(&board))?;
            let header = format!(t!("trello.header.lists"), board = board.label());
            commons::print_entities(format, &header, &lists)
        }
        TrelloCommand::Cards { list, board } => {
            let list = scope.list(&list, board)?;
            let cards = resolver.list_children(EntityKind::Card, Some(&list))?;
            let header = format!(t!("trello.header.cards"), list = list.label());
            commons::print_entities(format, &header, &cards)
        }
        TrelloCommand::AddBoard { name } => {
            let created = client.create_board(&name)?;
            commons::print_success(&format!(t!("trello.success.board_created"), name = name, id = created.id));
            Ok(())
        }
        TrelloCommand::AddList { name, board } => {
            let board = scope.board(board)?;
            let created = client.create_list(&board.id, &name)?;
            commons::print_success(&format!(
                t!("trello.success.list_created"),
                name = name,
                board = board.label(),
                id = created.id
            ));
            Ok(())
        }
        TrelloCommand::AddCard {
            list,
            name,
            desc,
            board,
        } => {
            let list = scope.list(&list, board)?;
            let mut fields = FieldMap::new();
            fields.insert("idList".into(), json!(list.id));
            fields.insert("name".into(), json!(name));
            if let Some(desc) = desc {
                fields.insert("desc".into(), json!(desc));
            }
            let created = RepairExecutor::new(session.prompter())
                .create_with_repair(fields, |payload| client.create_card(payload))?;
            commons::print_success(&format!(
                t!("trello.success.card_created"),
                name = name,
                list = list.label(),
                id = created.id
            ));
            Ok(())
        }
        TrelloCommand::DeleteBoard { board, yes } => {
            let board = resolver.resolve(EntityKind::Board, &board)?;
            let prompt = format!(t!("trello.prompt.delete_board"), board = board.label());
            if session.confirm(&prompt, yes)? {
                client.delete_board(&board.id)?;
                commons::print_success(&format!(t!("trello.success.board_deleted"), board = board.label()));
            }
            Ok(())
        }
        TrelloCommand::CloseList { list, board, yes } => {
            let list = scope.list(&list, board)?;
            let prompt = format!(t!("trello.prompt.close_list"), list = list.label());
            if session.confirm(&prompt, yes)? {
                client.close_list(&list.id)?;
                commons::print_success(&format!(t!("trello.success.list_closed"), list = list.label()));
            }
            Ok(())
        }
        TrelloCommand::DeleteCard {
            card,
            list,
            board,
            yes,
        } => {
            let card = resolver.resolve_with(EntityKind::Card, &card, || {
                let list = list.ok_or_else(|| anyhow!(t!("trello.error.list_required")))?;
                scope.list(&list, board)
            })?;
            let prompt = format!(t!("trello.prompt.delete_card"), card = card.label());
            if session.confirm(&prompt, yes)? {
                client.delete_card(&card.id)?;
                commons::print_success(&format!(t!("trello.success.card_deleted"), card = card.label()));
            }
            Ok(())
        }
        TrelloCommand::Aliases => Ok(()),
    }
}

/// Resolves the board and list scopes Trello tokens live in.
struct Scope<'a> {
    config: &'a ConfigDocument,
    resolver: &'a EntityResolver<'a>,
}

impl Scope<'_> {
    fn board(&self, explicit: Option<String>) -> Result<EntityRef> {
        let token = commons::token_or_default(explicit, self.config, "trello", "default_board")
            .ok_or_else(|| anyhow!(t!("trello.error.board_required")))?;
        Ok(self.resolver.resolve(EntityKind::Board, &token)?)
    }

    fn list(&self, token: &str, board: Option<String>) -> Result<EntityRef> {
        self.resolver
            .resolve_with(EntityKind::List, token, || self.board(board))
    }
}

// --- Subcommand Logic ---

fn list_aliases(config: &ConfigDocument, format: OutputFormat) -> Result<()> {
    let table = AliasTable::for_service(config, Service::Trello);

    if format == OutputFormat::Json {
        let records: serde_json::Map<String, Value> = table
            .records()
            .iter()
            .map(|record| {
                let coordinates: serde_json::Map<String, Value> = record
                    .coordinates()
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), json!(value)))
                    .collect();
                (record.name().to_string(), Value::Object(coordinates))
            })
            .collect();
        return commons::print_json(&records);
    }

    println!("{}", t!("trello.header.aliases").bold());
    if table.is_empty() {
        println!("  {}", t!("common.info.none").dimmed());
        return Ok(());
    }
    for record in table.records() {
        let coordinates: Vec<String> = record
            .coordinates()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        let detail = if coordinates.is_empty() {
            t!("trello.info.alias_incomplete").red().to_string()
        } else {
            coordinates.join(", ").dimmed().to_string()
        };
        println!("  {}  {}", record.name().cyan(), detail);
    }
    Ok(())
}
