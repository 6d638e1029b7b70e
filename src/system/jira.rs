// src/system/jira.rs

use crate::constants::JIRA_API_PATH;
use crate::core::config_store::{ConfigDocument, ConfigResult};
use crate::core::entity_resolver::EntityDirectory;
use crate::core::repair_executor::FieldOptionSource;
use crate::models::{
    CreateContext, CreatedEntity, EntityKind, EntityRef, FieldMap, FieldOption, RemoteEntity,
};
use crate::system::http::{
    Auth, HttpClient, RemoteResult, expect_array, require_str_field, str_field,
};
use serde_json::{Value, json};
use std::time::Duration;

const ISSUE_FIELDS: &str = "summary,status,project";
const SEARCH_PAGE_SIZE: &str = "100";

/// Atlassian Cloud credentials, shared by the Jira and Confluence clients.
#[derive(Clone)]
pub struct AtlassianCredentials {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
}

impl std::fmt::Debug for AtlassianCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlassianCredentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AtlassianCredentials {
    /// Reads `base_url`, `username` and `api_token` from the `jira` section.
    pub fn from_config(config: &ConfigDocument) -> ConfigResult<Self> {
        Ok(Self {
            base_url: config.require_str("jira", "base_url")?.trim_end_matches('/').to_string(),
            username: config.require_str("jira", "username")?.to_string(),
            api_token: config.require_str("jira", "api_token")?.to_string(),
        })
    }

    pub(crate) fn auth(&self) -> Auth {
        Auth::Basic {
            username: self.username.clone(),
            token: self.api_token.clone(),
        }
    }
}

/// Blocking client for the Jira Cloud REST API (v2).
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: HttpClient,
}

impl JiraClient {
    pub fn new(credentials: &AtlassianCredentials, timeout: Duration) -> RemoteResult<Self> {
        let base = format!("{}/{}", credentials.base_url, JIRA_API_PATH);
        Ok(Self {
            http: HttpClient::new(&base, credentials.auth(), timeout)?,
        })
    }

    pub fn projects(&self) -> RemoteResult<Vec<RemoteEntity>> {
        expect_array(self.http.get("project", &[])?, "projects")?
            .iter()
            .map(project_entity)
            .collect()
    }

    pub fn project(&self, key: &str) -> RemoteResult<RemoteEntity> {
        project_entity(&self.http.get(&format!("project/{}", key), &[])?)
    }

    /// Creates a project from a field map (`key`, `name`, `projectTypeKey`, `leadAccountId`, ...).
    pub fn create_project(&self, fields: &FieldMap) -> RemoteResult<CreatedEntity> {
        let response = self
            .http
            .post("project", &[], Some(&Value::Object(fields.clone())))?;
        created(&response)
    }

    pub fn delete_project(&self, key: &str) -> RemoteResult<()> {
        self.http.delete(&format!("project/{}", key))?;
        Ok(())
    }

    /// Issues of a project, in the order Jira returns them (first page only).
    pub fn search_issues(&self, project_key: &str) -> RemoteResult<Vec<RemoteEntity>> {
        let jql = format!("project=\"{}\"", project_key);
        let response = self.http.get(
            "search",
            &[
                ("jql", jql.as_str()),
                ("fields", ISSUE_FIELDS),
                ("maxResults", SEARCH_PAGE_SIZE),
            ],
        )?;
        let issues = response.get("issues").cloned().unwrap_or(Value::Null);
        expect_array(issues, "issues")?.iter().map(issue_entity).collect()
    }

    pub fn issue(&self, key: &str) -> RemoteResult<RemoteEntity> {
        issue_entity(
            &self
                .http
                .get(&format!("issue/{}", key), &[("fields", ISSUE_FIELDS)])?,
        )
    }

    /// Creates an issue from its `fields` object.
    pub fn create_issue(&self, fields: &FieldMap) -> RemoteResult<CreatedEntity> {
        let body = json!({ "fields": fields });
        created(&self.http.post("issue", &[], Some(&body))?)
    }

    pub fn update_issue(&self, key: &str, fields: &FieldMap) -> RemoteResult<()> {
        let body = json!({ "fields": fields });
        self.http.put(&format!("issue/{}", key), &[], Some(&body))?;
        Ok(())
    }

    pub fn delete_issue(&self, key: &str) -> RemoteResult<()> {
        self.http.delete(&format!("issue/{}", key))?;
        Ok(())
    }

    /// The account id of the authenticated user.
    pub fn myself(&self) -> RemoteResult<String> {
        require_str_field(&self.http.get("myself", &[])?, "accountId")
    }
}

impl EntityDirectory for JiraClient {
    fn fetch(&self, kind: EntityKind, id: &str) -> RemoteResult<Option<RemoteEntity>> {
        match kind {
            EntityKind::Project => self.project(id).map(Some),
            EntityKind::Issue => self.issue(id).map(Some),
            _ => Ok(None),
        }
    }

    fn enumerate(&self, kind: EntityKind, scope: Option<&EntityRef>) -> RemoteResult<Vec<RemoteEntity>> {
        match (kind, scope) {
            (EntityKind::Project, _) => self.projects(),
            (EntityKind::Issue, Some(project)) => self.search_issues(&project.id),
            _ => Ok(Vec::new()),
        }
    }
}

impl FieldOptionSource for JiraClient {
    fn allowed_values(&self, field: &str, context: &CreateContext) -> RemoteResult<Vec<FieldOption>> {
        let mut query = vec![("expand", "projects.issuetypes.fields")];
        if let Some(project) = context.project_key.as_deref() {
            query.push(("projectKeys", project));
        }
        if let Some(issue_type) = context.issue_type.as_deref() {
            query.push(("issuetypeNames", issue_type));
        }
        let meta = self.http.get("issue/createmeta", &query)?;
        Ok(parse_allowed_values(&meta, field, context.issue_type.as_deref()))
    }
}

/// Pulls `{id, value}` pairs for `field` out of a `createmeta` response, preferring the
/// issue type named in the context.
fn parse_allowed_values(meta: &Value, field: &str, issue_type: Option<&str>) -> Vec<FieldOption> {
    let issue_types: Vec<&Value> = meta
        .get("projects")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|project| project.get("issuetypes").and_then(Value::as_array))
        .flatten()
        .collect();

    let chosen = issue_type
        .and_then(|name| {
            issue_types.iter().find(|it| {
                it.get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
        })
        .or_else(|| issue_types.first());

    chosen
        .and_then(|it| it.get("fields"))
        .and_then(|fields| fields.get(field))
        .and_then(|f| f.get("allowedValues"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|option| {
            let id = str_field(option, "id")?;
            let value = str_field(option, "value")
                .or_else(|| str_field(option, "name"))
                .unwrap_or_else(|| id.clone());
            Some(FieldOption { id, value })
        })
        .collect()
}

fn project_entity(value: &Value) -> RemoteResult<RemoteEntity> {
    Ok(RemoteEntity {
        id: require_str_field(value, "key")?,
        name: str_field(value, "name").unwrap_or_default(),
        closed: value.get("archived").and_then(Value::as_bool).unwrap_or(false),
        parent: None,
        status: None,
    })
}

fn issue_entity(value: &Value) -> RemoteResult<RemoteEntity> {
    let fields = value.get("fields").unwrap_or(&Value::Null);
    Ok(RemoteEntity {
        id: require_str_field(value, "key")?,
        name: str_field(fields, "summary").unwrap_or_default(),
        closed: false,
        parent: fields.get("project").and_then(|p| str_field(p, "key")),
        status: fields.get("status").and_then(|s| str_field(s, "name")),
    })
}

fn created(value: &Value) -> RemoteResult<CreatedEntity> {
    Ok(CreatedEntity {
        id: require_str_field(value, "id")?,
        key: str_field(value, "key"),
    })
}
