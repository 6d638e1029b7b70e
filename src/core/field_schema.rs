// src/core/field_schema.rs

//! Static registry of remote field shapes.
//!
//! The registry only decides *how to ask* for a missing value. It never talks to the
//! network and never validates an answer against the remote schema.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// The expected value shape of a remote field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShape {
    Text,
    Integer,
    Float,
    TextList,
    Object,
}

use FieldShape::{Float, Integer, Object, Text, TextList};

const FIELD_SHAPES: &[(&str, FieldShape)] = &[
    // Standard issue fields
    ("summary", Text),
    ("description", Text),
    ("issuetype", Object),
    ("project", Object),
    ("priority", Object),
    ("status", Object),
    ("resolution", Object),
    ("assignee", Object),
    ("reporter", Object),
    ("created", Text),
    ("updated", Text),
    ("resolutiondate", Text),
    ("duedate", Text),
    ("components", TextList),
    ("labels", TextList),
    ("fixVersions", TextList),
    ("versions", TextList),
    ("watches", Object),
    ("worklog", Object),
    ("timeestimate", Integer),
    ("timeoriginalestimate", Integer),
    ("timespent", Integer),
    ("aggregatetimespent", Integer),
    ("aggregatetimeestimate", Integer),
    ("aggregateprogress", Object),
    ("progress", Object),
    ("environment", Text),
    ("security", Object),
    // Frequently seen custom fields
    ("customfield_10007", Object),
    ("customfield_10008", Object),
    ("customfield_10009", TextList),
    ("customfield_10010", Object),
    ("customfield_10011", Object),
    ("customfield_10013", Text),
    ("customfield_10014", TextList),
    ("customfield_10015", Text),
    ("customfield_10016", Integer),
    ("customfield_10018", Object),
    ("customfield_10019", Float),
    ("customfield_10020", TextList),
    ("customfield_10021", Text),
    ("customfield_10022", Object),
    ("customfield_10023", TextList),
    ("customfield_10024", Object),
    ("customfield_10025", Text),
    ("customfield_10026", Object),
    ("customfield_10027", TextList),
    ("customfield_10028", Object),
    ("customfield_10029", Text),
    ("customfield_10030", Object),
    ("customfield_10031", TextList),
    ("customfield_10032", Object),
    ("customfield_10033", Object),
    // Nested structures
    ("comment", Object),
    ("changelog", Object),
    // Subtasks and links
    ("subtasks", TextList),
    ("parent", Object),
    ("issuelinks", TextList),
    // Project creation
    ("projectTypeKey", Text),
    ("leadAccountId", Text),
    ("assigneeType", Text),
];

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, FieldShape> = FIELD_SHAPES.iter().copied().collect();
    static ref CUSTOM_FIELD_RE: Regex = Regex::new(r"^customfield_\d+$").unwrap();
}

/// The shape of `field`. Unregistered fields are treated as plain text.
pub fn shape_of(field: &str) -> FieldShape {
    REGISTRY.get(field).copied().unwrap_or(Text)
}

/// Whether `field` is a vendor extension field (`customfield_<digits>`).
pub fn is_custom_field(field: &str) -> bool {
    CUSTOM_FIELD_RE.is_match(field)
}
