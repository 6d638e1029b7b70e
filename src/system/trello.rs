// src/system/trello.rs

use crate::constants::TRELLO_API_URL;
use crate::core::config_store::{ConfigDocument, ConfigResult};
use crate::core::entity_resolver::EntityDirectory;
use crate::models::{CreatedEntity, EntityKind, EntityRef, FieldMap, RemoteEntity};
use crate::system::http::{
    Auth, HttpClient, RemoteResult, expect_array, require_str_field, str_field,
};
use serde_json::{Value, json};
use std::time::Duration;

const ENTITY_FIELDS: &str = "name,closed,idBoard,idList";

/// Trello API credentials, read from the `trello` config section.
#[derive(Clone)]
pub struct TrelloCredentials {
    pub api_key: String,
    pub api_token: String,
}

impl std::fmt::Debug for TrelloCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloCredentials").finish_non_exhaustive()
    }
}

impl TrelloCredentials {
    pub fn from_config(config: &ConfigDocument) -> ConfigResult<Self> {
        Ok(Self {
            api_key: config.require_str("trello", "api_key")?.to_string(),
            api_token: config.require_str("trello", "api_token")?.to_string(),
        })
    }
}

/// Blocking client for the Trello REST API.
#[derive(Debug, Clone)]
pub struct TrelloClient {
    http: HttpClient,
}

impl TrelloClient {
    pub fn new(credentials: TrelloCredentials, timeout: Duration) -> RemoteResult<Self> {
        let auth = Auth::Query(vec![
            ("key".to_string(), credentials.api_key),
            ("token".to_string(), credentials.api_token),
        ]);
        Ok(Self {
            http: HttpClient::new(TRELLO_API_URL, auth, timeout)?,
        })
    }

    pub fn boards(&self) -> RemoteResult<Vec<RemoteEntity>> {
        let response = self
            .http
            .get("members/me/boards", &[("fields", ENTITY_FIELDS)])?;
        entities(response, None, "boards")
    }

    pub fn board(&self, board_id: &str) -> RemoteResult<RemoteEntity> {
        let response = self
            .http
            .get(&format!("boards/{}", board_id), &[("fields", ENTITY_FIELDS)])?;
        entity(&response, None)
    }

    pub fn lists(&self, board_id: &str) -> RemoteResult<Vec<RemoteEntity>> {
        let response = self.http.get(
            &format!("boards/{}/lists", board_id),
            &[("fields", ENTITY_FIELDS), ("filter", "all")],
        )?;
        entities(response, Some("idBoard"), "lists")
    }

    pub fn cards(&self, list_id: &str) -> RemoteResult<Vec<RemoteEntity>> {
        let response = self
            .http
            .get(&format!("lists/{}/cards", list_id), &[("fields", ENTITY_FIELDS)])?;
        entities(response, Some("idList"), "cards")
    }

    pub fn card(&self, card_id: &str) -> RemoteResult<RemoteEntity> {
        let response = self
            .http
            .get(&format!("cards/{}", card_id), &[("fields", ENTITY_FIELDS)])?;
        entity(&response, Some("idList"))
    }

    pub fn create_board(&self, name: &str) -> RemoteResult<CreatedEntity> {
        let response = self.http.post("boards", &[], Some(&json!({ "name": name })))?;
        created(&response)
    }

    pub fn create_list(&self, board_id: &str, name: &str) -> RemoteResult<CreatedEntity> {
        let body = json!({ "name": name, "idBoard": board_id, "pos": "bottom" });
        let response = self.http.post("lists", &[], Some(&body))?;
        created(&response)
    }

    /// Creates a card from a field map (`idList`, `name`, optional `desc`).
    pub fn create_card(&self, fields: &FieldMap) -> RemoteResult<CreatedEntity> {
        let response = self
            .http
            .post("cards", &[], Some(&Value::Object(fields.clone())))?;
        created(&response)
    }

    pub fn delete_board(&self, board_id: &str) -> RemoteResult<()> {
        self.http.delete(&format!("boards/{}", board_id))?;
        Ok(())
    }

    /// Lists cannot be deleted in Trello, only archived.
    pub fn close_list(&self, list_id: &str) -> RemoteResult<()> {
        self.http.put(
            &format!("lists/{}/closed", list_id),
            &[("value", "true")],
            None,
        )?;
        Ok(())
    }

    pub fn delete_card(&self, card_id: &str) -> RemoteResult<()> {
        self.http.delete(&format!("cards/{}", card_id))?;
        Ok(())
    }
}

impl EntityDirectory for TrelloClient {
    fn fetch(&self, kind: EntityKind, id: &str) -> RemoteResult<Option<RemoteEntity>> {
        match kind {
            EntityKind::Board => self.board(id).map(Some),
            EntityKind::Card => self.card(id).map(Some),
            _ => Ok(None),
        }
    }

    fn enumerate(&self, kind: EntityKind, scope: Option<&EntityRef>) -> RemoteResult<Vec<RemoteEntity>> {
        match (kind, scope) {
            (EntityKind::Board, _) => self.boards(),
            (EntityKind::List, Some(board)) => self.lists(&board.id),
            (EntityKind::Card, Some(list)) => self.cards(&list.id),
            _ => Ok(Vec::new()),
        }
    }
}

fn entity(value: &Value, parent_key: Option<&str>) -> RemoteResult<RemoteEntity> {
    Ok(RemoteEntity {
        id: require_str_field(value, "id")?,
        name: str_field(value, "name").unwrap_or_default(),
        closed: value.get("closed").and_then(Value::as_bool).unwrap_or(false),
        parent: parent_key.and_then(|key| str_field(value, key)),
        status: None,
    })
}

fn entities(value: Value, parent_key: Option<&str>, what: &str) -> RemoteResult<Vec<RemoteEntity>> {
    expect_array(value, what)?
        .iter()
        .map(|item| entity(item, parent_key))
        .collect()
}

fn created(value: &Value) -> RemoteResult<CreatedEntity> {
    Ok(CreatedEntity {
        id: require_str_field(value, "id")?,
        key: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_store::{ConfigError, canonical_document};

    #[test]
    fn test_entities_parse_closed_and_parent() {
        let response = json!([
            { "id": "L1", "name": "A", "closed": false, "idBoard": "B1" },
            { "id": "L2", "name": "B", "closed": true, "idBoard": "B1" }
        ]);

        let lists = entities(response, Some("idBoard"), "lists").unwrap();

        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].parent.as_deref(), Some("B1"));
        assert!(!lists[0].closed);
        assert!(lists[1].closed);
    }

    #[test]
    fn test_entities_reject_non_array() {
        assert!(entities(json!({ "id": "x" }), None, "boards").is_err());
    }

    #[test]
    fn test_credentials_require_key_and_token() {
        let mut config = canonical_document();
        let err = TrelloCredentials::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { ref key, .. } if key == "api_key"));

        config.set("trello", "api_key", json!("k"));
        config.set("trello", "api_token", json!("t"));
        let credentials = TrelloCredentials::from_config(&config).unwrap();
        assert_eq!(credentials.api_key, "k");
        assert_eq!(credentials.api_token, "t");
    }
}
