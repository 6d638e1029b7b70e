// src/core/entity_resolver.rs

//! Turns a user-typed token into a concrete remote entity reference.
//!
//! Precedence, for every kind:
//! 1. alias name in `<service>.alias_ids` (no network),
//! 2. remote identifier, fetched directly,
//! 3. exact display name, scanned inside the enclosing collection.
//!
//! An alias that exists but lacks the needed coordinate fails immediately; it never
//! falls through to the remote lookups.

use crate::core::alias_table::AliasTable;
use crate::core::config_store::ConfigDocument;
use crate::models::{EntityKind, EntityRef, RemoteEntity, ResolvedBy};
use crate::system::http::{RemoteError, RemoteResult};
use thiserror::Error;

/// Remote lookups the resolver needs from a vendor client.
pub trait EntityDirectory {
    /// Fetches one entity by its remote identifier. `Ok(None)` means this directory
    /// cannot fetch that kind directly.
    fn fetch(&self, kind: EntityKind, id: &str) -> RemoteResult<Option<RemoteEntity>>;

    /// Lists the entities of `kind`, inside `scope` when the kind is not top-level.
    fn enumerate(&self, kind: EntityKind, scope: Option<&EntityRef>) -> RemoteResult<Vec<RemoteEntity>>;
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Alias '{alias}' has no '{coordinate}' set in the configuration file.")]
    AliasIncomplete {
        alias: String,
        coordinate: &'static str,
    },
    #[error("No {kind} found matching '{token}'.")]
    NotFound { kind: EntityKind, token: String },
    #[error("'{token}' matches {count} {kind}s by name. Use its id or an alias instead.")]
    Ambiguous {
        kind: EntityKind,
        token: String,
        count: usize,
    },
    #[error("Cannot look up a {kind} by name without knowing its {scope}.")]
    ScopeRequired { kind: EntityKind, scope: EntityKind },
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// What to do when several entities share the scanned name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// Take the first match in remote listing order.
    #[default]
    FirstMatch,
    /// Refuse with [`ResolveError::Ambiguous`].
    Strict,
}

impl NamePolicy {
    pub fn from_config(config: &ConfigDocument) -> Self {
        if config.get_bool("cli", "strict_name_matching") {
            Self::Strict
        } else {
            Self::FirstMatch
        }
    }
}

/// Resolves tokens against one configuration document and one vendor directory.
pub struct EntityResolver<'a> {
    config: &'a ConfigDocument,
    directory: &'a dyn EntityDirectory,
    policy: NamePolicy,
}

impl std::fmt::Debug for EntityResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<'a> EntityResolver<'a> {
    pub fn new(config: &'a ConfigDocument, directory: &'a dyn EntityDirectory) -> Self {
        Self {
            config,
            directory,
            policy: NamePolicy::from_config(config),
        }
    }

    pub fn with_policy(mut self, policy: NamePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolves a top-level entity (board, project, space) or one whose token is an alias or id.
    pub fn resolve(&self, kind: EntityKind, token: &str) -> ResolveResult<EntityRef> {
        self.resolve_in(kind, token, None)
    }

    /// Resolves `token` as a `kind`, scanning inside `scope` if it comes to a name lookup.
    pub fn resolve_in(
        &self,
        kind: EntityKind,
        token: &str,
        scope: Option<&EntityRef>,
    ) -> ResolveResult<EntityRef> {
        match self.resolve_direct(kind, token)? {
            Some(reference) => Ok(reference),
            None => self.scan(kind, token, scope),
        }
    }

    /// Like [`Self::resolve_in`], but the enclosing collection is produced by `scope` and
    /// only when the token turns out to be a name of a scoped kind. The alias and id
    /// stages run once either way.
    pub fn resolve_with<E>(
        &self,
        kind: EntityKind,
        token: &str,
        scope: impl FnOnce() -> Result<EntityRef, E>,
    ) -> Result<EntityRef, E>
    where
        E: From<ResolveError>,
    {
        if let Some(reference) = self.resolve_direct(kind, token)? {
            return Ok(reference);
        }
        if kind.enclosing().is_none() {
            return Ok(self.scan(kind, token, None)?);
        }

        let enclosing = scope()?;
        log::debug!("Scanning {} '{}' for {} '{}'.", enclosing.kind, enclosing.label(), kind, token);
        Ok(self.scan(kind, token, Some(&enclosing))?)
    }

    /// The alias and fetch-by-id stages. `None` means the token has to be scanned by name.
    fn resolve_direct(&self, kind: EntityKind, token: &str) -> ResolveResult<Option<EntityRef>> {
        if let Some(reference) = self.resolve_alias(kind, token)? {
            log::debug!("Resolved {} '{}' through its alias to '{}'.", kind, token, reference.id);
            return Ok(Some(reference));
        }
        if !kind.supports_direct_fetch() {
            return Ok(None);
        }

        match self.directory.fetch(kind, token) {
            Ok(Some(entity)) => {
                log::debug!("Resolved {} '{}' by id.", kind, token);
                Ok(Some(EntityRef::from_entity(kind, entity, ResolvedBy::Id)))
            }
            Ok(None) => Ok(None),
            Err(e) if e.is_lookup_miss() => {
                log::debug!("'{}' is not a {} id ({}); scanning by name.", token, kind, e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lists the open entities of `kind` inside `scope`. Closed entities are dropped.
    pub fn list_children(
        &self,
        kind: EntityKind,
        scope: Option<&EntityRef>,
    ) -> ResolveResult<Vec<RemoteEntity>> {
        if let (Some(enclosing), None) = (kind.enclosing(), scope) {
            return Err(ResolveError::ScopeRequired {
                kind,
                scope: enclosing,
            });
        }
        let mut entities = self.directory.enumerate(kind, scope)?;
        entities.retain(|entity| !entity.closed);
        Ok(entities)
    }

    fn resolve_alias(&self, kind: EntityKind, token: &str) -> ResolveResult<Option<EntityRef>> {
        let table = AliasTable::for_service(self.config, kind.service());
        let Some(record) = table.lookup(token) else {
            return Ok(None);
        };

        let coordinate = kind.alias_coordinate();
        let id = record
            .coordinate(coordinate)
            .ok_or_else(|| ResolveError::AliasIncomplete {
                alias: token.to_string(),
                coordinate,
            })?;
        let parent = kind
            .enclosing()
            .and_then(|enclosing| record.coordinate(enclosing.alias_coordinate()))
            .map(str::to_string);

        Ok(Some(EntityRef {
            kind,
            id: id.to_string(),
            name: None,
            parent,
            resolved_by: ResolvedBy::Alias,
        }))
    }

    fn scan(&self, kind: EntityKind, token: &str, scope: Option<&EntityRef>) -> ResolveResult<EntityRef> {
        let candidates = self.list_children(kind, scope)?;

        // Kinds without a direct fetch still accept their id, matched inside the scope.
        if !kind.supports_direct_fetch() {
            if let Some(entity) = candidates.iter().find(|entity| entity.id == token) {
                return Ok(EntityRef::from_entity(kind, entity.clone(), ResolvedBy::Id));
            }
        }

        let mut matches = candidates.into_iter().filter(|entity| entity.name == token);
        let Some(first) = matches.next() else {
            return Err(ResolveError::NotFound {
                kind,
                token: token.to_string(),
            });
        };

        let others = matches.count();
        if others > 0 {
            match self.policy {
                NamePolicy::Strict => {
                    return Err(ResolveError::Ambiguous {
                        kind,
                        token: token.to_string(),
                        count: others + 1,
                    });
                }
                NamePolicy::FirstMatch => log::warn!(
                    "{} {}s are named '{}'; using the first one ({}).",
                    others + 1,
                    kind,
                    token,
                    first.id
                ),
            }
        }

        let mut reference = EntityRef::from_entity(kind, first, ResolvedBy::Name);
        if reference.parent.is_none() {
            reference.parent = scope.map(|s| s.id.clone());
        }
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeDirectory {
        by_id: HashMap<String, RemoteEntity>,
        children: HashMap<(EntityKind, Option<String>), Vec<RemoteEntity>>,
        fail_fetch: Option<u16>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeDirectory {
        fn with_entity(mut self, entity: RemoteEntity) -> Self {
            self.by_id.insert(entity.id.clone(), entity);
            self
        }

        fn with_children(mut self, kind: EntityKind, scope: Option<&str>, items: Vec<RemoteEntity>) -> Self {
            self.children.insert((kind, scope.map(str::to_string)), items);
            self
        }
    }

    impl EntityDirectory for FakeDirectory {
        fn fetch(&self, kind: EntityKind, id: &str) -> RemoteResult<Option<RemoteEntity>> {
            self.calls.borrow_mut().push(format!("fetch {kind} {id}"));
            if let Some(status) = self.fail_fetch {
                return Err(crate::system::http::translate(status, ""));
            }
            self.by_id
                .get(id)
                .cloned()
                .map(Some)
                .ok_or_else(|| crate::system::http::translate(404, ""))
        }

        fn enumerate(&self, kind: EntityKind, scope: Option<&EntityRef>) -> RemoteResult<Vec<RemoteEntity>> {
            self.calls.borrow_mut().push(format!("enumerate {kind}"));
            Ok(self
                .children
                .get(&(kind, scope.map(|s| s.id.clone())))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn entity(id: &str, name: &str, closed: bool) -> RemoteEntity {
        RemoteEntity {
            id: id.into(),
            name: name.into(),
            closed,
            ..Default::default()
        }
    }

    fn config(value: Value) -> ConfigDocument {
        match value {
            Value::Object(map) => ConfigDocument::from(map),
            other => panic!("expected an object, got {other}"),
        }
    }

    fn board() -> EntityRef {
        EntityRef::known(EntityKind::Board, "B1")
    }

    #[test]
    fn test_alias_wins_over_a_list_with_the_same_name() {
        let doc = config(json!({
            "trello": { "alias_ids": { "todo": { "board_id": "B1", "list_id": "L1" } } }
        }));
        let directory = FakeDirectory::default().with_children(
            EntityKind::List,
            Some("B1"),
            vec![entity("L2", "todo", false)],
        );
        let resolver = EntityResolver::new(&doc, &directory);

        let list = resolver.resolve_in(EntityKind::List, "todo", Some(&board())).unwrap();

        assert_eq!(list.id, "L1");
        assert_eq!(list.parent.as_deref(), Some("B1"));
        assert_eq!(list.resolved_by, ResolvedBy::Alias);
        assert!(directory.calls.borrow().is_empty());
    }

    #[test]
    fn test_incomplete_alias_fails_closed() {
        let doc = config(json!({ "trello": { "alias_ids": { "todo": {} } } }));
        let directory = FakeDirectory::default().with_children(
            EntityKind::List,
            Some("B1"),
            vec![entity("L2", "todo", false)],
        );
        let resolver = EntityResolver::new(&doc, &directory);

        let err = resolver
            .resolve_in(EntityKind::List, "todo", Some(&board()))
            .unwrap_err();

        assert!(matches!(
            err,
            ResolveError::AliasIncomplete { ref alias, coordinate: "list_id" } if alias == "todo"
        ));
        assert!(directory.calls.borrow().is_empty());
    }

    #[test]
    fn test_closed_lists_are_never_returned() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default().with_children(
            EntityKind::List,
            Some("B1"),
            vec![entity("LA", "A", false), entity("LB", "B", true)],
        );
        let resolver = EntityResolver::new(&doc, &directory);

        let names: Vec<_> = resolver
            .list_children(EntityKind::List, Some(&board()))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["A"]);

        let err = resolver
            .resolve_in(EntityKind::List, "B", Some(&board()))
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { kind: EntityKind::List, .. }));
    }

    #[test]
    fn test_lists_match_id_before_name_without_direct_fetch() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default().with_children(
            EntityKind::List,
            Some("B1"),
            vec![entity("L9", "L1", false), entity("L1", "Backlog", false)],
        );
        let resolver = EntityResolver::new(&doc, &directory);

        let list = resolver.resolve_in(EntityKind::List, "L1", Some(&board())).unwrap();

        assert_eq!(list.id, "L1");
        assert_eq!(list.resolved_by, ResolvedBy::Id);
        assert!(directory.calls.borrow().iter().all(|c| !c.starts_with("fetch")));
    }

    #[test]
    fn test_direct_fetch_before_name_scan() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default()
            .with_entity(entity("B7", "Roadmap", false))
            .with_children(EntityKind::Board, None, vec![entity("B8", "B7", false)]);
        let resolver = EntityResolver::new(&doc, &directory);

        let found = resolver.resolve(EntityKind::Board, "B7").unwrap();

        assert_eq!(found.id, "B7");
        assert_eq!(found.name.as_deref(), Some("Roadmap"));
        assert_eq!(found.resolved_by, ResolvedBy::Id);
    }

    #[test]
    fn test_name_scan_after_fetch_miss() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default().with_children(
            EntityKind::Board,
            None,
            vec![entity("B1", "Groceries", false)],
        );
        let resolver = EntityResolver::new(&doc, &directory);

        let found = resolver.resolve(EntityKind::Board, "Groceries").unwrap();

        assert_eq!(found.id, "B1");
        assert_eq!(found.resolved_by, ResolvedBy::Name);
    }

    #[test]
    fn test_not_found_names_token_and_kind() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default();
        let resolver = EntityResolver::new(&doc, &directory);

        let err = resolver.resolve(EntityKind::Project, "NOPE").unwrap_err();

        assert_eq!(err.to_string(), "No project found matching 'NOPE'.");
    }

    #[test]
    fn test_duplicate_names_first_match_or_strict() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default().with_children(
            EntityKind::Board,
            None,
            vec![entity("B1", "Ops", false), entity("B2", "Ops", false)],
        );

        let first = EntityResolver::new(&doc, &directory)
            .resolve(EntityKind::Board, "Ops")
            .unwrap();
        assert_eq!(first.id, "B1");

        let err = EntityResolver::new(&doc, &directory)
            .with_policy(NamePolicy::Strict)
            .resolve(EntityKind::Board, "Ops")
            .unwrap_err();
        assert!(matches!(err, ResolveError::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn test_strict_policy_read_from_config() {
        let doc = config(json!({ "cli": { "strict_name_matching": true } }));
        assert_eq!(NamePolicy::from_config(&doc), NamePolicy::Strict);
        assert_eq!(NamePolicy::from_config(&config(json!({}))), NamePolicy::FirstMatch);
    }

    #[test]
    fn test_name_scan_needs_scope() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default();
        let resolver = EntityResolver::new(&doc, &directory);

        let err = resolver.resolve(EntityKind::Card, "Buy milk").unwrap_err();

        assert!(matches!(
            err,
            ResolveError::ScopeRequired {
                kind: EntityKind::Card,
                scope: EntityKind::List
            }
        ));
    }

    #[test]
    fn test_authorization_failure_is_not_swallowed() {
        let doc = config(json!({}));
        let directory = FakeDirectory {
            fail_fetch: Some(403),
            ..Default::default()
        }
        .with_children(EntityKind::Board, None, vec![entity("B1", "Ops", false)]);
        let resolver = EntityResolver::new(&doc, &directory);

        let err = resolver.resolve(EntityKind::Board, "Ops").unwrap_err();

        assert!(matches!(err, ResolveError::Remote(RemoteError::Authorization { .. })));
    }

    #[test]
    fn test_scanned_entity_inherits_scope_as_parent() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default().with_children(
            EntityKind::Issue,
            Some("OPS"),
            vec![entity("OPS-1", "Fix login", false)],
        );
        let resolver = EntityResolver::new(&doc, &directory);
        let project = EntityRef::known(EntityKind::Project, "OPS");

        let issue = resolver
            .resolve_in(EntityKind::Issue, "Fix login", Some(&project))
            .unwrap();

        assert_eq!(issue.id, "OPS-1");
        assert_eq!(issue.parent.as_deref(), Some("OPS"));
    }

    #[test]
    fn test_lazy_scope_fetches_the_token_once() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default().with_children(
            EntityKind::Issue,
            Some("OPS"),
            vec![entity("OPS-1", "Fix login", false)],
        );
        let resolver = EntityResolver::new(&doc, &directory);

        let issue = resolver
            .resolve_with(EntityKind::Issue, "Fix login", || {
                Ok::<_, ResolveError>(EntityRef::known(EntityKind::Project, "OPS"))
            })
            .unwrap();

        assert_eq!(issue.id, "OPS-1");
        assert_eq!(
            *directory.calls.borrow(),
            vec!["fetch issue Fix login".to_string(), "enumerate issue".to_string()]
        );
    }

    #[test]
    fn test_lazy_scope_not_built_for_ids() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default().with_entity(entity("OPS-7", "Rotate keys", false));
        let resolver = EntityResolver::new(&doc, &directory);

        let issue = resolver
            .resolve_with(EntityKind::Issue, "OPS-7", || -> ResolveResult<EntityRef> {
                panic!("scope must not be needed for an id")
            })
            .unwrap();

        assert_eq!(issue.id, "OPS-7");
        assert_eq!(issue.resolved_by, ResolvedBy::Id);
        assert_eq!(directory.calls.borrow().len(), 1);
    }

    #[test]
    fn test_lazy_scope_errors_propagate() {
        let doc = config(json!({}));
        let directory = FakeDirectory::default();
        let resolver = EntityResolver::new(&doc, &directory);

        let err = resolver
            .resolve_with(EntityKind::Card, "Buy milk", || {
                Err(ResolveError::NotFound {
                    kind: EntityKind::List,
                    token: "Backlog".into(),
                })
            })
            .unwrap_err();

        assert_eq!(err.to_string(), "No list found matching 'Backlog'.");
        assert_eq!(*directory.calls.borrow(), vec!["fetch card Buy milk".to_string()]);
    }
}
