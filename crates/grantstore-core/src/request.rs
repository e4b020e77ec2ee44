//! The persisted request model.
//!
//! A [`RequestRecord`] is one issued grant artifact: the OAuth2 request
//! context plus the storage-specific fields (grant kind, signature, active
//! flag). Records are created active, flip to inactive exactly once via
//! invalidation, or are removed outright; nothing else mutates them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::client::ClientInfo;
use crate::error::{StoreError, StoreResult};
use crate::form::FormData;

// =============================================================================
// Grant Kind
// =============================================================================

/// Token categories the store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Access token issued at the token endpoint.
    AccessToken,
    /// Authorization code issued at the authorization endpoint.
    AuthorizationCode,
    /// Refresh token issued alongside an access token.
    RefreshToken,
}

impl GrantKind {
    /// Returns the stable string form stored in the `type` column.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GrantKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access_token" => Ok(Self::AccessToken),
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(StoreError::malformed(
                "type",
                format!("unknown grant kind '{other}'"),
            )),
        }
    }
}

// =============================================================================
// Grant Request
// =============================================================================

/// The base OAuth2 request context attached to an issued artifact.
///
/// The session payload is opaque to the store: it is persisted as structured
/// JSON and callers deserialize it back into their concrete session type via
/// [`GrantRequest::session_as`].
#[derive(Debug, Clone, PartialEq)]
pub struct GrantRequest {
    /// Server-assigned request identifier.
    pub id: String,
    /// When the request was made.
    pub requested_at: OffsetDateTime,
    /// Resolved client metadata. Only the id is persisted.
    pub client: ClientInfo,
    /// Scopes the client asked for.
    pub requested_scope: Vec<String>,
    /// Scopes the server granted.
    pub granted_scope: Vec<String>,
    /// Audiences the client asked for.
    pub requested_audience: Vec<String>,
    /// Audiences the server granted.
    pub granted_audience: Vec<String>,
    /// Original form body, absent if the request carried none.
    pub form: Option<FormData>,
    /// Opaque session payload.
    pub session: serde_json::Value,
}

impl GrantRequest {
    /// Create a request with the given id and client, requested now, with
    /// empty scopes, audiences, form and session.
    #[must_use]
    pub fn new(id: impl Into<String>, client: ClientInfo) -> Self {
        Self {
            id: id.into(),
            requested_at: OffsetDateTime::now_utc(),
            client,
            requested_scope: Vec::new(),
            granted_scope: Vec::new(),
            requested_audience: Vec::new(),
            granted_audience: Vec::new(),
            form: None,
            session: serde_json::Value::Null,
        }
    }

    /// Replace the session payload with a serialized value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the session cannot be serialized.
    pub fn set_session<T: Serialize>(&mut self, session: &T) -> StoreResult<()> {
        self.session = serde_json::to_value(session)
            .map_err(|e| StoreError::malformed("session", e.to_string()))?;
        Ok(())
    }

    /// Deserialize the session payload into the caller's session type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the payload does not match `T`.
    pub fn session_as<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(self.session.clone())
            .map_err(|e| StoreError::malformed("session", e.to_string()))
    }
}

// =============================================================================
// Persist Boundary
// =============================================================================

/// Capability trait accepted at the persist boundary.
///
/// Create operations take anything that can describe itself as an OAuth2
/// request; the store copies what it needs into its own [`RequestRecord`]
/// and returns that concrete type from every read.
pub trait PersistableRequest {
    /// Server-assigned request identifier.
    fn id(&self) -> &str;
    /// When the request was made.
    fn requested_at(&self) -> OffsetDateTime;
    /// The resolved client making the request.
    fn client(&self) -> &ClientInfo;
    /// Scopes the client asked for.
    fn requested_scope(&self) -> &[String];
    /// Scopes the server granted.
    fn granted_scope(&self) -> &[String];
    /// Audiences the client asked for.
    fn requested_audience(&self) -> &[String];
    /// Audiences the server granted.
    fn granted_audience(&self) -> &[String];
    /// Original form body, if any.
    fn form(&self) -> Option<&FormData>;
    /// The session payload as structured JSON.
    fn session_value(&self) -> serde_json::Value;
}

impl PersistableRequest for GrantRequest {
    fn id(&self) -> &str {
        &self.id
    }

    fn requested_at(&self) -> OffsetDateTime {
        self.requested_at
    }

    fn client(&self) -> &ClientInfo {
        &self.client
    }

    fn requested_scope(&self) -> &[String] {
        &self.requested_scope
    }

    fn granted_scope(&self) -> &[String] {
        &self.granted_scope
    }

    fn requested_audience(&self) -> &[String] {
        &self.requested_audience
    }

    fn granted_audience(&self) -> &[String] {
        &self.granted_audience
    }

    fn form(&self) -> Option<&FormData> {
        self.form.as_ref()
    }

    fn session_value(&self) -> serde_json::Value {
        self.session.clone()
    }
}

// =============================================================================
// Request Record
// =============================================================================

/// One issued grant artifact as the store persists and returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    /// The OAuth2 request context.
    pub request: GrantRequest,
    /// Token category the artifact belongs to.
    pub kind: GrantKind,
    /// Lookup key. For access tokens this is the hashed signature; other
    /// categories store the raw signature.
    pub signature: String,
    /// Whether the artifact is still usable. Starts `true`; invalidation
    /// flips it to `false` exactly once, never back.
    pub active: bool,
}

impl RequestRecord {
    /// Build a record from a caller-supplied request, active by default.
    #[must_use]
    pub fn from_request(
        kind: GrantKind,
        signature: impl Into<String>,
        request: &impl PersistableRequest,
    ) -> Self {
        Self {
            request: GrantRequest {
                id: request.id().to_owned(),
                requested_at: request.requested_at(),
                client: request.client().clone(),
                requested_scope: request.requested_scope().to_vec(),
                granted_scope: request.granted_scope().to_vec(),
                requested_audience: request.requested_audience().to_vec(),
                granted_audience: request.granted_audience().to_vec(),
                form: request.form().cloned(),
                session: request.session_value(),
            },
            kind,
            signature: signature.into(),
            active: true,
        }
    }
}

impl PersistableRequest for RequestRecord {
    fn id(&self) -> &str {
        self.request.id()
    }

    fn requested_at(&self) -> OffsetDateTime {
        self.request.requested_at()
    }

    fn client(&self) -> &ClientInfo {
        self.request.client()
    }

    fn requested_scope(&self) -> &[String] {
        self.request.requested_scope()
    }

    fn granted_scope(&self) -> &[String] {
        self.request.granted_scope()
    }

    fn requested_audience(&self) -> &[String] {
        self.request.requested_audience()
    }

    fn granted_audience(&self) -> &[String] {
        self.request.granted_audience()
    }

    fn form(&self) -> Option<&FormData> {
        self.request.form()
    }

    fn session_value(&self) -> serde_json::Value {
        self.request.session_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestSession {
        subject: String,
        expires_at: i64,
    }

    fn sample_request() -> GrantRequest {
        let mut form = FormData::new();
        form.append("grant_type", "authorization_code");

        let mut request = GrantRequest::new("req-42", ClientInfo::with_id("client-1"));
        request.requested_scope = vec!["openid".into(), "offline".into()];
        request.granted_scope = vec!["openid".into()];
        request.requested_audience = vec!["https://api.example.com".into()];
        request.granted_audience = vec!["https://api.example.com".into()];
        request.form = Some(form);
        request
            .set_session(&TestSession {
                subject: "user-1".into(),
                expires_at: 1_700_000_000,
            })
            .unwrap();
        request
    }

    #[test]
    fn test_grant_kind_string_round_trip() {
        for kind in [
            GrantKind::AccessToken,
            GrantKind::AuthorizationCode,
            GrantKind::RefreshToken,
        ] {
            assert_eq!(kind.as_str().parse::<GrantKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_grant_kind_unknown_is_malformed() {
        let err = "id_token".parse::<GrantKind>().unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_from_request_starts_active() {
        let request = sample_request();
        let record = RequestRecord::from_request(GrantKind::AuthorizationCode, "sig-1", &request);

        assert!(record.active);
        assert_eq!(record.signature, "sig-1");
        assert_eq!(record.kind, GrantKind::AuthorizationCode);
        assert_eq!(record.request, request);
    }

    #[test]
    fn test_record_is_itself_persistable() {
        let record =
            RequestRecord::from_request(GrantKind::RefreshToken, "sig-2", &sample_request());
        let copy = RequestRecord::from_request(GrantKind::RefreshToken, "sig-2", &record);
        assert_eq!(copy, record);
    }

    #[test]
    fn test_session_round_trip() {
        let request = sample_request();
        let session: TestSession = request.session_as().unwrap();
        assert_eq!(session.subject, "user-1");
        assert_eq!(session.expires_at, 1_700_000_000);
    }

    #[test]
    fn test_session_shape_mismatch_is_malformed() {
        #[derive(Debug, Deserialize)]
        struct OtherSession {
            #[allow(dead_code)]
            nonce: String,
        }

        let err = sample_request().session_as::<OtherSession>().unwrap_err();
        assert!(err.is_malformed());
    }
}
