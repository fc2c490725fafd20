use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::VesError;
use crate::item::VaultItem;
use crate::uri::VesUri;

/// Header carrying the scoped verify token on delegated fetches.
pub const AUTH_HEADER: &str = "X-VES-Authorization";

/// Resource kind under which vault items are addressed by the API and by
/// verify tokens.
const ITEM_RESOURCE: &str = "vaultItems";

/// Caller intent when resolving a `ves://` URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveIntent {
    /// Resolve only if the item already exists remotely; absence is an
    /// error, never an implicit create.
    Get,
    /// Resolve if it exists, otherwise stage a new uncommitted entity bound
    /// to the identifier.
    GetOrCreate,
    /// Always stage a new entity; fails if one already exists.
    CreateOnly,
}

/// A connection to one vault service API.
///
/// All network operations are synchronous, blocking calls with no implicit
/// retries; a failed commit leaves an item's staged share delta untouched so
/// the caller may retry the same delta. Two resolutions of the same
/// identifier yield two independent, unsynchronized item instances.
#[derive(Debug, Clone)]
pub struct VesSession {
    api_url: String,
    session_token: Option<String>,
    http: Client,
}

impl VesSession {
    /// Creates a session against the given API base URL.
    ///
    /// # Errors
    /// Returns [`VesError::Http`] when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(api_url: impl Into<String>) -> Result<Self, VesError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(format!("veskit-core/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            session_token: None,
            http,
        })
    }

    /// Attaches the session token sent on API requests.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    fn api_req(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http.request(method, format!("{}/{path}", self.api_url));
        if let Some(token) = &self.session_token {
            req = req.bearer_auth(token);
        }
        req
    }

    fn check_status(url: &str, response: Response) -> Result<Response, VesError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            warn!(status = status.as_u16(), url, "vault API request failed");
            Err(VesError::Transport {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }

    /// Resolves a `ves://` URI to an item according to the caller's intent.
    ///
    /// # Errors
    /// [`VesError::NotFound`] for a [`ResolveIntent::Get`] miss,
    /// [`VesError::AlreadyExists`] for a [`ResolveIntent::CreateOnly`]
    /// collision, and transport or decode errors from the fetch itself.
    pub fn resolve(&self, uri: &VesUri, intent: ResolveIntent) -> Result<VaultItem, VesError> {
        match self.fetch_item(uri) {
            Ok(item) => match intent {
                ResolveIntent::Get | ResolveIntent::GetOrCreate => Ok(item),
                ResolveIntent::CreateOnly => Err(VesError::AlreadyExists {
                    what: uri.to_string(),
                }),
            },
            Err(VesError::NotFound { .. })
                if matches!(
                    intent,
                    ResolveIntent::GetOrCreate | ResolveIntent::CreateOnly
                ) =>
            {
                debug!(%uri, "staging new item for unresolved URI");
                Ok(VaultItem::from_uri_stub(uri))
            }
            Err(err) => Err(err),
        }
    }

    /// Fetches and decodes one item by URI.
    ///
    /// # Errors
    /// [`VesError::NotFound`] on a 404, [`VesError::Transport`] on any other
    /// non-2xx status, decode errors when the record is malformed.
    pub fn fetch_item(&self, uri: &VesUri) -> Result<VaultItem, VesError> {
        let path = match uri {
            VesUri::Internal { id } => format!("{ITEM_RESOURCE}/{id}"),
            VesUri::External {
                domain,
                external_id,
            } => format!("{ITEM_RESOURCE}/external/{domain}/{external_id}"),
        };
        let url = format!("{}/{path}", self.api_url);
        let response = self.api_req(Method::GET, &path).send()?;
        if response.status().as_u16() == 404 {
            return Err(VesError::NotFound {
                what: uri.to_string(),
            });
        }
        let response = Self::check_status(&url, response)?;
        let record: Value = response.json()?;
        VaultItem::from_record(&record)
    }

    /// Commits the item (upsert): posts the wire record with any staged
    /// share entries, adopts the server-assigned id, and clears the pending
    /// overlay. On failure the staged delta is left untouched for retry.
    ///
    /// # Errors
    /// [`VesError::InvalidState`] on a deleted item, transport and decode
    /// errors from the exchange.
    pub fn post_item(&self, item: &mut VaultItem) -> Result<(), VesError> {
        if item.is_deleted() {
            return Err(VesError::InvalidState {
                operation: "post_item",
            });
        }
        let url = format!("{}/{ITEM_RESOURCE}", self.api_url);
        let record = item.to_record();
        debug!(item_id = item.id(), staged = item.share_entries().len(), "posting vault item");
        let response = self.api_req(Method::POST, ITEM_RESOURCE).json(&record).send()?;
        let response = Self::check_status(&url, response)?;

        let body: Value = response.json()?;
        let id = body
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| VesError::decode("id", "commit response without item id"))?;
        item.mark_committed(id);
        Ok(())
    }

    /// Tombstones the item remotely and locally. A no-op on the network for
    /// an item that was never committed; the local `DELETE` flag is set
    /// either way and is terminal.
    ///
    /// # Errors
    /// Transport errors from the remote delete; already-deleted items
    /// return [`VesError::InvalidState`].
    pub fn delete_item(&self, item: &mut VaultItem) -> Result<(), VesError> {
        if item.is_deleted() {
            return Err(VesError::InvalidState {
                operation: "delete_item",
            });
        }
        if !item.is_new() {
            let path = format!("{ITEM_RESOURCE}/{}", item.id());
            let url = format!("{}/{path}", self.api_url);
            let response = self.api_req(Method::DELETE, &path).send()?;
            // A 404 means the tombstone is already effective remotely.
            if response.status().as_u16() != 404 {
                Self::check_status(&url, response)?;
            }
        }
        item.flags.insert(crate::flags::StateFlags::DELETE);
        Ok(())
    }

    /// Fetches a verify token scoped to exactly one resource.
    ///
    /// The token authorizes read access to that single resource and nothing
    /// else; it must not be treated as a session credential.
    ///
    /// # Errors
    /// Transport errors, or a decode error when the response carries no
    /// token.
    pub fn fetch_verify_token(&self, resource: &str, id: u64) -> Result<String, VesError> {
        let path = format!("{resource}/{id}?fields=verifyToken");
        let url = format!("{}/{path}", self.api_url);
        let response = self.api_req(Method::GET, &path).send()?;
        let response = Self::check_status(&url, response)?;
        let body: Value = response.json()?;
        body.get("verifyToken")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| VesError::decode("verifyToken", "missing from token response"))
    }

    /// Lists all vault items currently shared with the given vault key.
    ///
    /// # Errors
    /// Transport errors, or a decode error when the response carries no
    /// item list or a malformed record.
    pub fn list_items_shared_with(&self, vault_key_id: u64) -> Result<Vec<VaultItem>, VesError> {
        let path = format!("vaultKeys/{vault_key_id}?fields=vaultItems");
        let url = format!("{}/{path}", self.api_url);
        let response = self.api_req(Method::GET, &path).send()?;
        let response = Self::check_status(&url, response)?;
        let body: Value = response.json()?;
        let records = body
            .get("vaultItems")
            .and_then(Value::as_array)
            .ok_or_else(|| VesError::decode("vaultItems", "missing from key response"))?;
        records.iter().map(VaultItem::from_record).collect()
    }

    /// Sends a GET request to a third-party URL authorized by a verify
    /// token scoped to `item`, as `X-VES-Authorization:
    /// vaultItem.{id}.{token}`.
    ///
    /// Returns the JSON response body together with the HTTP status code.
    ///
    /// # Errors
    /// [`VesError::Transport`] with the status preserved on any non-2xx
    /// response; a decode error when the body is not JSON.
    pub fn ves_auth_get(&self, item: &VaultItem, url: &str) -> Result<(Value, u16), VesError> {
        let token = self.fetch_verify_token(ITEM_RESOURCE, item.id())?;
        let response = self
            .http
            .get(url)
            .header(AUTH_HEADER, format!("vaultItem.{}.{token}", item.id()))
            .send()?;
        let status = response.status().as_u16();
        let response = Self::check_status(url, response)?;
        let body: Value = response
            .json()
            .map_err(|e| VesError::decode("body", format!("response is not JSON: {e}")))?;
        Ok((body, status))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::flags::StateFlags;
    use crate::item_type::ItemType;
    use crate::object::VaultKey;
    use crate::share::ShareTarget;

    use super::*;

    fn session(server: &mockito::Server) -> VesSession {
        VesSession::new(server.url())
            .unwrap()
            .with_session_token("session-token")
    }

    #[test]
    fn get_or_create_on_missing_item_stages_a_new_entity() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/vaultItems/external/example.com/item1")
            .with_status(404)
            .create();

        let uri = VesUri::parse("ves://example.com/item1").unwrap();
        let item = session(&server)
            .resolve(&uri, ResolveIntent::GetOrCreate)
            .unwrap();

        assert_eq!(item.id(), 0);
        assert_eq!(item.flags(), StateFlags::SET);
        assert!(item.share_targets().is_empty());
        assert_eq!(item.to_uri(), Some(uri.clone()));

        // Same miss under get-only intent is an error, not a create.
        let err = session(&server).resolve(&uri, ResolveIntent::Get).unwrap_err();
        assert!(matches!(err, VesError::NotFound { .. }));
    }

    #[test]
    fn create_only_collides_with_existing_item() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/vaultItems/7")
            .with_status(200)
            .with_body(r#"{"id": 7, "type": "string", "value": ""}"#)
            .create();

        let uri = VesUri::internal(7);
        let err = session(&server)
            .resolve(&uri, ResolveIntent::CreateOnly)
            .unwrap_err();
        assert!(matches!(err, VesError::AlreadyExists { .. }));
    }

    #[test]
    fn post_assigns_id_and_clears_pending_state() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/vaultItems")
            .with_status(200)
            .with_body(r#"{"id": 4321}"#)
            .create();

        let mut item = VaultItem::new();
        item.set_value(b"hello".to_vec(), ItemType::String).unwrap();
        item.stage_entries(&[ShareTarget::new(VaultKey::stub(5))], StateFlags::empty())
            .unwrap();

        session(&server).post_item(&mut item).unwrap();

        assert_eq!(item.id(), 4321);
        assert_eq!(item.flags(), StateFlags::CLEAN);
        assert!(item.share_entries().is_empty());
        assert!(!item.is_new());
    }

    #[test]
    fn failed_post_leaves_staged_entries_for_retry() {
        let mut server = mockito::Server::new();
        server.mock("POST", "/vaultItems").with_status(502).create();

        let mut item = VaultItem::new();
        item.stage_entries(&[ShareTarget::new(VaultKey::stub(5))], StateFlags::empty())
            .unwrap();
        let staged = item.share_entries().to_vec();

        let err = session(&server).post_item(&mut item).unwrap_err();
        assert!(matches!(err, VesError::Transport { status: 502, .. }));
        assert_eq!(item.share_entries(), staged.as_slice());
        assert!(item.is_new());
    }

    #[test]
    fn delete_is_local_only_for_uncommitted_items() {
        // No mock registered: a network call would fail the test.
        let server = mockito::Server::new();

        let mut item = VaultItem::new();
        session(&server).delete_item(&mut item).unwrap();
        assert!(item.is_deleted());
        assert!(matches!(
            item.set_value(b"x".to_vec(), ItemType::String),
            Err(VesError::InvalidState { .. })
        ));
    }

    #[test]
    fn lists_items_shared_with_a_key() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/vaultKeys/5?fields=vaultItems")
            .with_status(200)
            .with_body(
                json!({
                    "vaultItems": [
                        {"id": 1, "type": "string", "value": ""},
                        {"id": 2, "type": "password", "value": ""},
                    ],
                })
                .to_string(),
            )
            .create();

        let items = session(&server).list_items_shared_with(5).unwrap();
        let ids: Vec<_> = items.iter().map(VaultItem::id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(items[1].item_type(), ItemType::Password);
    }

    #[test]
    fn auth_get_sends_scoped_header_and_preserves_status() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/vaultItems/99?fields=verifyToken")
            .with_status(200)
            .with_body(r#"{"verifyToken": "tok123"}"#)
            .create();
        server
            .mock("GET", "/external/resource")
            .match_header(AUTH_HEADER, "vaultItem.99.tok123")
            .with_status(200)
            .with_body(r#"{"payload": "ok"}"#)
            .create();

        let mut item = VaultItem::new();
        item.id = 99;

        let ses = session(&server);
        let (body, status) = ses
            .ves_auth_get(&item, &format!("{}/external/resource", server.url()))
            .unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, json!({"payload": "ok"}));
    }

    #[test]
    fn auth_get_surfaces_remote_status() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/vaultItems/99?fields=verifyToken")
            .with_status(200)
            .with_body(r#"{"verifyToken": "tok123"}"#)
            .create();
        server
            .mock("GET", "/external/resource")
            .with_status(403)
            .create();

        let mut item = VaultItem::new();
        item.id = 99;

        let err = session(&server)
            .ves_auth_get(&item, &format!("{}/external/resource", server.url()))
            .unwrap_err();
        assert!(matches!(err, VesError::Transport { status: 403, .. }));
    }
}
