use clap::Parser;

pub mod dispatcher;
pub mod handlers;

/// Markup tags of the help template and the SGR codes they stand for.
const HELP_STYLES: &[(&str, &str)] = &[
    ("title", "1;33"),
    ("group", "1;32"),
    ("hl", "1;36"),
    ("cmd", "36"),
    ("err", "91"),
    ("dim", "2"),
];

/// Renders the markup of `template` as ANSI styles, or strips it when `colors` is off.
fn render_help(template: &str, colors: bool) -> String {
    HELP_STYLES
        .iter()
        .fold(template.to_string(), |text, (tag, code)| {
            let (open, close) = if colors {
                (format!("\x1b[{}m", code), "\x1b[0m")
            } else {
                (String::new(), "")
            };
            text.replace(&format!("<{}>", tag), &open)
                .replace(&format!("</{}>", tag), close)
        })
}

fn build_help_string() -> &'static str {
    let colors = colored::control::SHOULD_COLORIZE.should_colorize();
    Box::leak(render_help(t!("cli.help.template"), colors).into_boxed_str())
}

/// The message printed for a failed command: each context layer, then its cause.
pub fn render_error(error: &anyhow::Error) -> String {
    format!("{:#}", error)
}

/// atlasman: Trello, Jira and Confluence from the command line.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    help_template = { build_help_string() },
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// Enables debug logging for this run.
    #[arg(short, long)]
    pub verbose: bool,

    /// The command and its arguments, parsed by the command's own handler.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_after_the_command_are_passed_through() {
        let cli = Cli::parse_from(["atlasman", "-v", "trello", "add-card", "todo", "Milk", "--desc", "2L"]);
        assert!(cli.verbose);
        assert_eq!(cli.args, vec!["trello", "add-card", "todo", "Milk", "--desc", "2L"]);
    }

    #[test]
    fn test_help_markup_is_stripped_without_colors() {
        let rendered = render_help("<title>atlasman</title> <cmd><command></cmd>", false);
        assert_eq!(rendered, "atlasman <command>");

        let colored = render_help("<err>delete</err>", true);
        assert_eq!(colored, "\x1b[91mdelete\x1b[0m");
    }

    #[test]
    fn test_rendered_error_keeps_the_remote_cause() {
        use anyhow::Context;

        let failure: Result<(), _> = Err(crate::system::http::translate(
            401,
            r#"{"errorMessages":["Client must be authenticated to access this resource."]}"#,
        ));
        let error = failure.context(t!("jira.error.lead_lookup")).unwrap_err();

        let message = render_error(&error);
        assert!(message.starts_with(t!("jira.error.lead_lookup")));
        assert!(message.contains("Authentication failed (HTTP 401)"));
        assert!(message.contains("Client must be authenticated"));
    }

    #[test]
    fn test_no_command() {
        let cli = Cli::parse_from(["atlasman"]);
        assert!(!cli.verbose);
        assert!(cli.args.is_empty());
    }
}
