// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A JSON object of remote field values, keyed by the remote field name.
pub type FieldMap = Map<String, Value>;

/// The remote services atlasman talks to. Each one owns a section in the config document.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Trello,
    Jira,
    Confluence,
}

impl Service {
    /// The name of the config section (and of the CLI command) for this service.
    pub fn section(self) -> &'static str {
        match self {
            Self::Trello => "trello",
            Self::Jira => "jira",
            Self::Confluence => "confluence",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// The kinds of remote entities a user token can resolve to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Board,
    List,
    Card,
    Project,
    Issue,
    Space,
    Page,
}

impl EntityKind {
    /// The service that owns entities of this kind.
    pub fn service(self) -> Service {
        match self {
            Self::Board | Self::List | Self::Card => Service::Trello,
            Self::Project | Self::Issue => Service::Jira,
            Self::Space | Self::Page => Service::Confluence,
        }
    }

    /// The key inside an alias record that holds the identifier for this kind.
    pub fn alias_coordinate(self) -> &'static str {
        match self {
            Self::Board => "board_id",
            Self::List => "list_id",
            Self::Card => "card_id",
            Self::Project => "project_key",
            Self::Issue => "issue_key",
            Self::Space => "space_key",
            Self::Page => "page_id",
        }
    }

    /// The kind of collection a name scan for this kind walks, if it is not top-level.
    pub fn enclosing(self) -> Option<Self> {
        match self {
            Self::List => Some(Self::Board),
            Self::Card => Some(Self::List),
            Self::Issue => Some(Self::Project),
            Self::Page => Some(Self::Space),
            Self::Board | Self::Project | Self::Space => None,
        }
    }

    /// Whether a raw token is tried as a remote identifier before the name scan.
    /// Lists are only ever resolved inside their board.
    pub fn supports_direct_fetch(self) -> bool {
        !matches!(self, Self::List)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::List => "list",
            Self::Card => "card",
            Self::Project => "project",
            Self::Issue => "issue",
            Self::Space => "space",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote entity as reported by a vendor client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RemoteEntity {
    pub id: String,
    pub name: String,
    /// Archived (Trello `closed`) entities are never surfaced by enumerations.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub closed: bool,
    /// The identifier of the enclosing collection, when the remote reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Workflow status (Jira issues).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// How an `EntityRef` was produced.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedBy {
    Alias,
    Id,
    Name,
}

/// The output of the entity resolver: a handle for follow-up remote operations.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
    /// Display name. Absent for alias hits, which never touch the network.
    pub name: Option<String>,
    /// Enclosing collection id (e.g. the board of a list), when known.
    pub parent: Option<String>,
    pub resolved_by: ResolvedBy,
}

impl EntityRef {
    /// Builds a reference for an identifier the caller already knows (e.g. a default space key).
    pub fn known(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: None,
            parent: None,
            resolved_by: ResolvedBy::Id,
        }
    }

    pub(crate) fn from_entity(kind: EntityKind, entity: RemoteEntity, resolved_by: ResolvedBy) -> Self {
        Self {
            kind,
            id: entity.id,
            name: Some(entity.name),
            parent: entity.parent,
            resolved_by,
        }
    }

    /// The name if known, otherwise the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A field the remote service reported as missing or invalid on a create call.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    pub name: String,
    pub reason: String,
}

/// One legal value of an enumerated remote field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldOption {
    pub id: String,
    pub value: String,
}

/// The identifier of an entity created on the remote service.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedEntity {
    pub id: String,
    /// Human-facing key when the service has one (Jira issue/project keys).
    pub key: Option<String>,
}

impl CreatedEntity {
    pub fn label(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.id)
    }
}

/// Context for enumerating allowed values of a field during repair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateContext {
    pub project_key: Option<String>,
    pub issue_type: Option<String>,
}

/// Body and version of a Confluence page, as needed to edit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub id: String,
    pub title: String,
    pub body: String,
    pub version: u64,
}
