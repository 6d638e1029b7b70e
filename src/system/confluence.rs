// src/system/confluence.rs

use crate::constants::CONFLUENCE_API_PATH;
use crate::core::entity_resolver::EntityDirectory;
use crate::models::{CreatedEntity, EntityKind, EntityRef, FieldMap, PageContent, RemoteEntity};
use crate::system::http::{
    HttpClient, RemoteError, RemoteResult, expect_array, require_str_field, str_field,
};
use crate::system::jira::AtlassianCredentials;
use serde_json::{Value, json};
use std::time::Duration;

const PAGE_LIMIT: &str = "100";

/// Blocking client for the Confluence Cloud REST API. Uses the Jira credentials.
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    http: HttpClient,
}

impl ConfluenceClient {
    pub fn new(credentials: &AtlassianCredentials, timeout: Duration) -> RemoteResult<Self> {
        let base = format!("{}/{}", credentials.base_url, CONFLUENCE_API_PATH);
        Ok(Self {
            http: HttpClient::new(&base, credentials.auth(), timeout)?,
        })
    }

    pub fn spaces(&self) -> RemoteResult<Vec<RemoteEntity>> {
        let response = self.http.get("space", &[("limit", PAGE_LIMIT)])?;
        results(response, "spaces")?
            .iter()
            .map(space_entity)
            .collect()
    }

    pub fn space(&self, key: &str) -> RemoteResult<RemoteEntity> {
        space_entity(&self.http.get(&format!("space/{}", key), &[])?)
    }

    /// Current pages of a space (first page of results).
    pub fn pages(&self, space_key: &str) -> RemoteResult<Vec<RemoteEntity>> {
        let response = self.http.get(
            "content",
            &[
                ("spaceKey", space_key),
                ("type", "page"),
                ("expand", "space"),
                ("limit", PAGE_LIMIT),
            ],
        )?;
        results(response, "pages")?.iter().map(page_entity).collect()
    }

    pub fn page(&self, page_id: &str) -> RemoteResult<RemoteEntity> {
        page_entity(
            &self
                .http
                .get(&format!("content/{}", page_id), &[("expand", "space")])?,
        )
    }

    /// Fetches a page with its storage-format body and version number.
    pub fn page_content(&self, page_id: &str) -> RemoteResult<PageContent> {
        let response = self.http.get(
            &format!("content/{}", page_id),
            &[("expand", "body.storage,version")],
        )?;
        let version = response
            .pointer("/version/number")
            .and_then(Value::as_u64)
            .ok_or_else(|| RemoteError::Decode("page has no version number".to_string()))?;
        Ok(PageContent {
            id: require_str_field(&response, "id")?,
            title: str_field(&response, "title").unwrap_or_default(),
            body: response
                .pointer("/body/storage/value")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            version,
        })
    }

    /// Creates a page from a full content payload (`title`, `type`, `space`, `body`).
    pub fn create_page(&self, fields: &FieldMap) -> RemoteResult<CreatedEntity> {
        let response = self
            .http
            .post("content", &[], Some(&Value::Object(fields.clone())))?;
        Ok(CreatedEntity {
            id: require_str_field(&response, "id")?,
            key: None,
        })
    }

    /// Replaces the body of `page`, bumping its version by one.
    pub fn update_page(&self, page: &PageContent, new_body: &str) -> RemoteResult<()> {
        let body = json!({
            "version": { "number": page.version + 1 },
            "title": page.title,
            "type": "page",
            "body": { "storage": { "value": new_body, "representation": "storage" } }
        });
        self.http
            .put(&format!("content/{}", page.id), &[], Some(&body))?;
        Ok(())
    }

    pub fn delete_page(&self, page_id: &str) -> RemoteResult<()> {
        self.http.delete(&format!("content/{}", page_id))?;
        Ok(())
    }
}

/// The payload `create_page` expects for a storage-format page.
pub fn page_payload(space_key: &str, title: &str, content: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("title".into(), json!(title));
    fields.insert("type".into(), json!("page"));
    fields.insert("space".into(), json!({ "key": space_key }));
    fields.insert(
        "body".into(),
        json!({ "storage": { "value": content, "representation": "storage" } }),
    );
    fields
}

impl EntityDirectory for ConfluenceClient {
    fn fetch(&self, kind: EntityKind, id: &str) -> RemoteResult<Option<RemoteEntity>> {
        match kind {
            EntityKind::Space => self.space(id).map(Some),
            EntityKind::Page => self.page(id).map(Some),
            _ => Ok(None),
        }
    }

    fn enumerate(&self, kind: EntityKind, scope: Option<&EntityRef>) -> RemoteResult<Vec<RemoteEntity>> {
        match (kind, scope) {
            (EntityKind::Space, _) => self.spaces(),
            (EntityKind::Page, Some(space)) => self.pages(&space.id),
            _ => Ok(Vec::new()),
        }
    }
}

fn results(response: Value, what: &str) -> RemoteResult<Vec<Value>> {
    let items = response.get("results").cloned().unwrap_or(Value::Null);
    expect_array(items, what)
}

fn space_entity(value: &Value) -> RemoteResult<RemoteEntity> {
    Ok(RemoteEntity {
        id: require_str_field(value, "key")?,
        name: str_field(value, "name").unwrap_or_default(),
        closed: str_field(value, "status").is_some_and(|s| s == "archived"),
        parent: None,
        status: None,
    })
}

fn page_entity(value: &Value) -> RemoteResult<RemoteEntity> {
    Ok(RemoteEntity {
        id: require_str_field(value, "id")?,
        name: str_field(value, "title").unwrap_or_default(),
        closed: str_field(value, "status").is_some_and(|s| s != "current"),
        parent: value.get("space").and_then(|s| str_field(s, "key")),
        status: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_entity_treats_non_current_as_closed() {
        let current = page_entity(&json!({
            "id": "123", "title": "Runbook", "status": "current", "space": { "key": "OPS" }
        }))
        .unwrap();
        assert!(!current.closed);
        assert_eq!(current.parent.as_deref(), Some("OPS"));

        let trashed = page_entity(&json!({ "id": "124", "title": "Old", "status": "trashed" })).unwrap();
        assert!(trashed.closed);
    }

    #[test]
    fn test_results_requires_array() {
        let items = results(json!({ "results": [ { "id": "1" } ] }), "pages").unwrap();
        assert_eq!(items.len(), 1);
        assert!(results(json!({ "size": 0 }), "pages").is_err());
    }

    #[test]
    fn test_page_payload_shape() {
        let payload = page_payload("OPS", "Runbook", "<p>hi</p>");
        assert_eq!(payload["space"], json!({ "key": "OPS" }));
        assert_eq!(payload["body"]["storage"]["representation"], json!("storage"));
        assert_eq!(payload["type"], json!("page"));
    }
}
