//! Client metadata and the client registry seam.
//!
//! The store persists only the client id of each request. Full client
//! metadata is owned by an external registry and re-resolved on every read
//! through the [`ClientResolver`] trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// OAuth 2.0 client metadata as resolved by the client registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Unique client identifier used in OAuth flows.
    pub id: String,

    /// Allowed redirect URIs for authorization code flow.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// OAuth 2.0 grant types this client is allowed to use.
    #[serde(default)]
    pub grant_types: Vec<String>,

    /// OAuth 2.0 response types this client is allowed to request.
    #[serde(default)]
    pub response_types: Vec<String>,

    /// OAuth scopes this client is allowed to request.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Audiences this client may request tokens for.
    #[serde(default)]
    pub audience: Vec<String>,

    /// Whether this is a public client (no client secret).
    #[serde(default)]
    pub public: bool,
}

impl ClientInfo {
    /// Create client metadata with only the id set.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Client registry seam.
///
/// Implementations resolve a persisted client id back to full client
/// metadata. Reads fail when the id no longer resolves, so a deregistered
/// client invalidates all of its stored requests.
#[async_trait]
pub trait ClientResolver: Send + Sync {
    /// Resolve a client id to full client metadata.
    ///
    /// Returns `Ok(None)` when no client is registered under the id.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lookup itself fails.
    async fn resolve(&self, client_id: &str) -> StoreResult<Option<ClientInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_id() {
        let client = ClientInfo::with_id("my-app");
        assert_eq!(client.id, "my-app");
        assert!(client.redirect_uris.is_empty());
        assert!(!client.public);
    }

    #[test]
    fn test_serde_round_trip() {
        let client = ClientInfo {
            id: "my-app".into(),
            redirect_uris: vec!["https://example.com/cb".into()],
            grant_types: vec!["authorization_code".into()],
            response_types: vec!["code".into()],
            scopes: vec!["openid".into()],
            audience: vec!["https://api.example.com".into()],
            public: true,
        };

        let json = serde_json::to_string(&client).unwrap();
        let back: ClientInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, client);
    }

    #[test]
    fn test_deserialize_defaults() {
        let client: ClientInfo = serde_json::from_str(r#"{"id": "bare"}"#).unwrap();
        assert_eq!(client.id, "bare");
        assert!(client.grant_types.is_empty());
    }
}
