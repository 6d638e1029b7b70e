// src/core/alias_table.rs

//! A read-only view of `<service>.alias_ids` in the configuration document.
//!
//! Each alias maps a user-chosen name to a record of remote coordinates, e.g.
//! `"todo": { "board_id": "...", "list_id": "..." }`. Lookups are exact: no case
//! folding, no fuzzy matching. The table never creates or edits aliases.

use crate::core::config_store::ConfigDocument;
use crate::models::Service;
use serde_json::{Map, Value};

/// Alias records of one service, borrowed from a loaded configuration document.
#[derive(Debug, Clone, Copy)]
pub struct AliasTable<'a> {
    entries: Option<&'a Map<String, Value>>,
}

/// One alias record. A record that is not a JSON object has no coordinates at all.
#[derive(Debug, Clone, Copy)]
pub struct AliasRecord<'a> {
    name: &'a str,
    fields: Option<&'a Map<String, Value>>,
}

impl<'a> AliasTable<'a> {
    pub fn for_service(document: &'a ConfigDocument, service: Service) -> Self {
        Self {
            entries: document.aliases(service),
        }
    }

    /// Looks up an alias by its exact name.
    pub fn lookup(&self, name: &str) -> Option<AliasRecord<'a>> {
        self.entries
            .and_then(|entries| entries.iter().find(|(key, _)| key.as_str() == name))
            .map(|(name, value)| AliasRecord {
                name: name.as_str(),
                fields: value.as_object(),
            })
    }

    /// All aliases, sorted by name.
    pub fn records(&self) -> Vec<AliasRecord<'a>> {
        let mut records: Vec<_> = self
            .entries
            .into_iter()
            .flatten()
            .map(|(name, value)| AliasRecord {
                name: name.as_str(),
                fields: value.as_object(),
            })
            .collect();
        records.sort_by_key(|record| record.name);
        records
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_none_or(Map::is_empty)
    }
}

impl<'a> AliasRecord<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// A populated coordinate. Empty strings count as absent.
    pub fn coordinate(&self, key: &str) -> Option<&'a str> {
        self.fields
            .and_then(|fields| fields.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Every populated coordinate as `(key, value)`, in document order.
    pub fn coordinates(&self) -> Vec<(&'a str, &'a str)> {
        self.fields
            .into_iter()
            .flatten()
            .filter_map(|(key, value)| {
                value
                    .as_str()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (key.as_str(), v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> ConfigDocument {
        match value {
            Value::Object(map) => ConfigDocument::from(map),
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn test_lookup_is_exact() {
        let doc = document(json!({
            "trello": { "alias_ids": { "todo": { "board_id": "B1", "list_id": "L1" } } }
        }));
        let table = AliasTable::for_service(&doc, Service::Trello);

        let record = table.lookup("todo").unwrap();
        assert_eq!(record.coordinate("list_id"), Some("L1"));
        assert_eq!(record.coordinate("board_id"), Some("B1"));
        assert!(table.lookup("Todo").is_none());
        assert!(table.lookup("tod").is_none());
    }

    #[test]
    fn test_empty_and_missing_coordinates() {
        let doc = document(json!({
            "trello": { "alias_ids": {
                "blank": { "board_id": "", "list_id": "  " },
                "weird": "not a record"
            } }
        }));
        let table = AliasTable::for_service(&doc, Service::Trello);

        assert_eq!(table.lookup("blank").unwrap().coordinate("list_id"), None);
        assert_eq!(table.lookup("weird").unwrap().coordinate("list_id"), None);
        assert!(table.lookup("weird").unwrap().coordinates().is_empty());
    }

    #[test]
    fn test_tables_are_per_service() {
        let doc = document(json!({
            "trello": { "alias_ids": { "x": { "board_id": "B" } } },
            "jira": { "alias_ids": { "y": { "project_key": "OPS" } } }
        }));

        let jira = AliasTable::for_service(&doc, Service::Jira);
        assert!(jira.lookup("x").is_none());
        assert_eq!(jira.lookup("y").unwrap().coordinate("project_key"), Some("OPS"));
        assert!(AliasTable::for_service(&doc, Service::Confluence).is_empty());
    }

    #[test]
    fn test_records_sorted_by_name() {
        let doc = document(json!({
            "trello": { "alias_ids": { "zeta": {}, "alpha": {}, "mid": {} } }
        }));
        let table = AliasTable::for_service(&doc, Service::Trello);
        let names: Vec<_> = table.records().iter().map(AliasRecord::name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
