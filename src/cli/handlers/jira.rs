//! # Handler for the `jira` command
//!
//! Projects and issues. Issue and project creation run through the repair executor, so a
//! project that requires extra fields gets them asked for instead of failing outright.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use crate::{
    cli::handlers::commons::{self, OutputFormat, Session},
    constants::JIRA_PROJECT_TYPES,
    core::{
        config_store::ConfigDocument,
        entity_resolver::EntityResolver,
        prompter::Prompter,
        repair_executor::RepairExecutor,
    },
    models::{CreateContext, EntityKind, EntityRef, FieldMap, RemoteEntity},
    system::jira::{AtlassianCredentials, JiraClient},
};

// --- Command Argument Parsing ---

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Manage Jira projects and issues.")]
struct JiraArgs {
    #[command(subcommand)]
    command: Option<JiraCommand>,
}

#[derive(Subcommand, Debug)]
enum JiraCommand {
    /// Lists the projects you can see.
    Projects,
    /// Lists the issues of a project.
    Issues {
        /// Project alias, key or name (defaults to `jira.default_project_key`).
        project: Option<String>,
    },
    /// Creates an issue. Missing required fields are asked for.
    AddIssue {
        project: String,
        summary: String,
        /// Issue type (defaults to `jira.default_issue_type`).
        #[arg(short = 't', long = "type")]
        issue_type: Option<String>,
        /// Extra field as `name=value`; the value is read as JSON when it parses.
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Changes the summary of an issue.
    UpdateIssue {
        issue: String,
        summary: String,
        /// Project to search when `issue` is a summary instead of a key.
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Deletes an issue.
    DeleteIssue {
        issue: String,
        #[arg(short, long)]
        project: Option<String>,
        #[arg(short, long)]
        yes: bool,
    },
    /// Creates a project (needs Jira administrator rights).
    AddProject {
        name: String,
        key: String,
        /// Project type key: software, business or service_desk.
        #[arg(short = 't', long = "type")]
        project_type: Option<String>,
        /// Account id of the project lead (defaults to you).
        #[arg(short, long)]
        lead: Option<String>,
    },
    /// Deletes a project (needs Jira administrator rights).
    DeleteProject {
        project: String,
        #[arg(short, long)]
        yes: bool,
    },
}

fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    Ok((name.to_string(), commons::parse_value(value)))
}

// --- Main Handler ---

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let jira_args = JiraArgs::try_parse_from(&args)?;
    let command = jira_args.command.unwrap_or(JiraCommand::Projects);

    let config = session.config()?.clone();
    let format = OutputFormat::from_config(&config);
    let credentials = AtlassianCredentials::from_config(&config)?;
    let client = JiraClient::new(&credentials, commons::request_timeout(&config))?;
    let resolver = EntityResolver::new(&config, &client);

    match command {
        JiraCommand::Projects => {
            let projects = resolver.list_children(EntityKind::Project, None)?;
            commons::print_entities(format, t!("jira.header.projects"), &projects)
        }
        JiraCommand::Issues { project } => {
            let project = project_scope(&resolver, &config, project)?;
            let issues = resolver.list_children(EntityKind::Issue, Some(&project))?;
            let issues = arrange_issues(issues, &config);
            let header = format!(t!("jira.header.issues"), project = project.id);
            commons::print_entities(format, &header, &issues)
        }
        JiraCommand::AddIssue {
            project,
            summary,
            issue_type,
            fields: extra,
        } => {
            let project = resolver.resolve(EntityKind::Project, &project)?;
            let issue_type = issue_type
                .or_else(|| config.get_str("jira", "default_issue_type").map(str::to_string))
                .unwrap_or_else(|| "Task".to_string());

            let mut fields = FieldMap::new();
            fields.insert("project".into(), json!({ "key": project.id }));
            fields.insert("summary".into(), json!(summary));
            fields.insert("issuetype".into(), json!({ "name": issue_type }));
            fields.extend(extra);

            let context = CreateContext {
                project_key: Some(project.id.clone()),
                issue_type: Some(issue_type),
            };
            let created = RepairExecutor::new(session.prompter())
                .with_options(&client, context)
                .create_with_repair(fields, |payload| client.create_issue(payload))?;
            commons::print_success(&format!(
                t!("jira.success.issue_created"),
                key = created.label(),
                project = project.id
            ));
            Ok(())
        }
        JiraCommand::UpdateIssue {
            issue,
            summary,
            project,
        } => {
            let issue = resolve_issue(&resolver, &config, &issue, project)?;
            let mut fields = FieldMap::new();
            fields.insert("summary".into(), json!(summary));
            client.update_issue(&issue.id, &fields)?;
            commons::print_success(&format!(t!("jira.success.issue_updated"), key = issue.id));
            Ok(())
        }
        JiraCommand::DeleteIssue {
            issue,
            project,
            yes,
        } => {
            let issue = resolve_issue(&resolver, &config, &issue, project)?;
            let prompt = format!(t!("jira.prompt.delete_issue"), key = issue.id);
            if session.confirm(&prompt, yes)? {
                client.delete_issue(&issue.id)?;
                commons::print_success(&format!(t!("jira.success.issue_deleted"), key = issue.id));
            }
            Ok(())
        }
        JiraCommand::AddProject {
            name,
            key,
            project_type,
            lead,
        } => {
            let project_type = match project_type {
                Some(project_type) => project_type,
                None => choose_project_type(session.prompter())?,
            };
            let lead = match lead {
                Some(lead) => lead,
                None => client
                    .myself()
                    .context(t!("jira.error.lead_lookup"))?,
            };

            let mut fields = FieldMap::new();
            fields.insert("key".into(), json!(key));
            fields.insert("name".into(), json!(name));
            fields.insert("projectTypeKey".into(), json!(project_type));
            fields.insert("leadAccountId".into(), json!(lead));

            let created = RepairExecutor::new(session.prompter())
                .create_with_repair(fields, |payload| client.create_project(payload))?;
            commons::print_success(&format!(
                t!("jira.success.project_created"),
                name = name,
                key = created.label()
            ));
            Ok(())
        }
        JiraCommand::DeleteProject { project, yes } => {
            let project = resolver.resolve(EntityKind::Project, &project)?;
            let prompt = format!(t!("jira.prompt.delete_project"), project = project.label());
            if session.confirm(&prompt, yes)? {
                client.delete_project(&project.id)?;
                commons::print_success(&format!(t!("jira.success.project_deleted"), key = project.id));
            }
            Ok(())
        }
    }
}

// --- Subcommand Logic ---

fn project_scope(
    resolver: &EntityResolver<'_>,
    config: &ConfigDocument,
    explicit: Option<String>,
) -> Result<EntityRef> {
    let token = commons::token_or_default(explicit, config, "jira", "default_project_key")
        .ok_or_else(|| anyhow!(t!("jira.error.project_required")))?;
    Ok(resolver.resolve(EntityKind::Project, &token)?)
}

fn resolve_issue(
    resolver: &EntityResolver<'_>,
    config: &ConfigDocument,
    token: &str,
    project: Option<String>,
) -> Result<EntityRef> {
    resolver.resolve_with(EntityKind::Issue, token, || project_scope(resolver, config, project))
}

fn choose_project_type(prompter: &mut dyn Prompter) -> Result<String> {
    let items: Vec<String> = JIRA_PROJECT_TYPES.iter().map(|t| t.to_string()).collect();
    let index = prompter.select(t!("jira.prompt.project_type"), &items, 0)?;
    items
        .into_iter()
        .nth(index)
        .ok_or_else(|| anyhow!(t!("common.info.cancelled")))
}

/// Hides done issues unless `jira.show_done_issues`, then orders by `jira.custom_status_order`.
/// Statuses missing from the order go last; ties keep the remote order.
fn arrange_issues(mut issues: Vec<RemoteEntity>, config: &ConfigDocument) -> Vec<RemoteEntity> {
    if !config.get_bool("jira", "show_done_issues") {
        issues.retain(|issue| {
            !issue
                .status
                .as_deref()
                .is_some_and(|status| status.eq_ignore_ascii_case("done"))
        });
    }

    let order = config
        .get("jira", "custom_status_order")
        .and_then(Value::as_object);
    let rank = |issue: &RemoteEntity| {
        issue
            .status
            .as_deref()
            .and_then(|status| order?.get(status)?.as_u64())
            .unwrap_or(u64::MAX)
    };
    issues.sort_by_key(rank);
    issues
}
