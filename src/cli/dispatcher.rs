use anyhow::{Result, anyhow};

use crate::cli::handlers::{self, commons::Session};

/// A top-level command, its aliases and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &mut Session) -> Result<()>,
}

/// The single source of truth for all top-level commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "trello",
        aliases: &["t"],
        handler: handlers::trello::handle,
    },
    CommandDefinition {
        name: "jira",
        aliases: &["j"],
        handler: handlers::jira::handle,
    },
    CommandDefinition {
        name: "confluence",
        aliases: &["c"],
        handler: handlers::confluence::handle,
    },
    CommandDefinition {
        name: "config",
        aliases: &["cfg"],
        handler: handlers::config::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Routes `atlasman <command> [args...]` to its handler.
///
/// With no command at all, `cli.default_tool` picks the service whose default listing runs.
pub fn dispatch(all_args: Vec<String>, session: &mut Session) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);

    let Some((first, rest)) = all_args.split_first() else {
        let tool = session
            .config()?
            .get_str("cli", "default_tool")
            .unwrap_or("trello")
            .to_string();
        let command = find_command(&tool)
            .filter(|cmd| cmd.name != "config")
            .ok_or_else(|| anyhow!(t!("cli.error.unknown_default_tool"), tool = tool))?;
        return (command.handler)(Vec::new(), session);
    };

    let command =
        find_command(first).ok_or_else(|| anyhow!(t!("cli.error.unknown_command"), name = first))?;
    (command.handler)(rest.to_vec(), session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_found_by_name_and_alias() {
        assert_eq!(find_command("trello").map(|c| c.name), Some("trello"));
        assert_eq!(find_command("j").map(|c| c.name), Some("jira"));
        assert_eq!(find_command("c").map(|c| c.name), Some("confluence"));
        assert_eq!(find_command("cfg").map(|c| c.name), Some("config"));
        assert!(find_command("slack").is_none());
    }

    #[test]
    fn test_registry_names_are_unique() {
        let mut names: Vec<&str> = COMMAND_REGISTRY
            .iter()
            .flat_map(|c| std::iter::once(c.name).chain(c.aliases.iter().copied()))
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
