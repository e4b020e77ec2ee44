//! Row codec between [`RequestRecord`] and the flat request table layout.
//!
//! Encoding flattens the record into bind-ready column values: the form
//! becomes a URL query string (NULL when absent), the session passes through
//! as JSONB, and only the client id of the resolved client is kept. Decoding
//! reverses each step and re-resolves the client through the registry, so a
//! decoded record carries freshly resolved client metadata.

use time::OffsetDateTime;

use grantstore_core::{
    ClientResolver, FormData, GrantKind, GrantRequest, RequestRecord, StoreError, StoreResult,
};

/// Tuple shape of one request row, in column order.
pub(crate) type RequestTuple = (
    String,              // id
    String,              // type
    String,              // signature
    String,              // client_id
    OffsetDateTime,      // requested_at
    Vec<String>,         // requested_scope
    Vec<String>,         // granted_scope
    Vec<String>,         // requested_audience
    Vec<String>,         // granted_audience
    Option<String>,      // form
    serde_json::Value,   // session
    bool,                // active
);

/// One request row as stored in `{prefix}request`.
#[derive(Debug, Clone)]
pub struct RequestRow {
    /// Server-assigned request identifier.
    pub id: String,
    /// Grant kind in its stable string form.
    pub kind: String,
    /// Signature lookup key (hashed for access tokens).
    pub signature: String,
    /// Persisted client id; resolved back to full metadata on decode.
    pub client_id: String,
    /// When the request was made.
    pub requested_at: OffsetDateTime,
    /// Scopes the client asked for.
    pub requested_scope: Vec<String>,
    /// Scopes the server granted.
    pub granted_scope: Vec<String>,
    /// Audiences the client asked for.
    pub requested_audience: Vec<String>,
    /// Audiences the server granted.
    pub granted_audience: Vec<String>,
    /// URL-encoded form body, NULL when the request carried none.
    pub form: Option<String>,
    /// Opaque session payload as JSONB.
    pub session: serde_json::Value,
    /// Activity flag.
    pub active: bool,
}

impl RequestRow {
    /// Create from database tuple.
    pub(crate) fn from_tuple(row: RequestTuple) -> Self {
        Self {
            id: row.0,
            kind: row.1,
            signature: row.2,
            client_id: row.3,
            requested_at: row.4,
            requested_scope: row.5,
            granted_scope: row.6,
            requested_audience: row.7,
            granted_audience: row.8,
            form: row.9,
            session: row.10,
            active: row.11,
        }
    }

    /// Flatten a record into column values.
    #[must_use]
    pub fn from_record(record: &RequestRecord) -> Self {
        Self {
            id: record.request.id.clone(),
            kind: record.kind.as_str().to_owned(),
            signature: record.signature.clone(),
            client_id: record.request.client.id.clone(),
            requested_at: record.request.requested_at,
            requested_scope: record.request.requested_scope.clone(),
            granted_scope: record.request.granted_scope.clone(),
            requested_audience: record.request.requested_audience.clone(),
            granted_audience: record.request.granted_audience.clone(),
            form: record.request.form.as_ref().map(FormData::encode),
            session: record.request.session.clone(),
            active: record.active,
        }
    }

    /// Rebuild the record, resolving the persisted client id.
    ///
    /// A NULL form column decodes to an absent form, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the kind or form column is
    /// undecodable, [`StoreError::ClientResolution`] if the client id no
    /// longer resolves, or the resolver's own error unmodified.
    pub async fn into_record(self, clients: &dyn ClientResolver) -> StoreResult<RequestRecord> {
        let kind: GrantKind = self.kind.parse()?;

        let form = match self.form {
            Some(encoded) => Some(FormData::parse(&encoded)?),
            None => None,
        };

        let client = clients.resolve(&self.client_id).await?.ok_or_else(|| {
            StoreError::client_resolution(format!("unknown client '{}'", self.client_id))
        })?;

        Ok(RequestRecord {
            request: GrantRequest {
                id: self.id,
                requested_at: self.requested_at,
                client,
                requested_scope: self.requested_scope,
                granted_scope: self.granted_scope,
                requested_audience: self.requested_audience,
                granted_audience: self.granted_audience,
                form,
                session: self.session,
            },
            kind,
            signature: self.signature,
            active: self.active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use grantstore_core::ClientInfo;
    use serde_json::json;

    /// Resolver that knows a single client.
    struct SingleClientResolver(ClientInfo);

    #[async_trait]
    impl ClientResolver for SingleClientResolver {
        async fn resolve(&self, client_id: &str) -> StoreResult<Option<ClientInfo>> {
            Ok((client_id == self.0.id).then(|| self.0.clone()))
        }
    }

    fn resolver() -> SingleClientResolver {
        SingleClientResolver(ClientInfo {
            id: "client-1".into(),
            scopes: vec!["openid".into()],
            ..ClientInfo::default()
        })
    }

    fn sample_record() -> RequestRecord {
        let mut form = FormData::new();
        form.append("a", "1");
        form.append("a", "2");
        form.append("b", "x");

        let mut request = GrantRequest::new("req-1", resolver().0);
        request.requested_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        request.requested_scope = vec!["openid".into(), "offline".into()];
        request.granted_scope = vec!["openid".into()];
        request.requested_audience = vec!["aud-1".into(), "aud-2".into()];
        request.granted_audience = vec!["aud-1".into()];
        request.form = Some(form);
        request.session = json!({"subject": "user-1", "extra": {"nested": [1, 2, 3]}});

        RequestRecord::from_request(GrantKind::AuthorizationCode, "sig-1", &request)
    }

    #[tokio::test]
    async fn test_round_trip() {
        let record = sample_record();
        let row = RequestRow::from_record(&record);
        assert_eq!(row.form.as_deref(), Some("a=1&a=2&b=x"));
        assert_eq!(row.kind, "authorization_code");
        assert_eq!(row.client_id, "client-1");

        let decoded = row.into_record(&resolver()).await.unwrap();
        assert_eq!(decoded, record);
    }

    #[tokio::test]
    async fn test_null_form_decodes_to_absent_form() {
        let mut record = sample_record();
        record.request.form = None;

        let row = RequestRow::from_record(&record);
        assert!(row.form.is_none());

        let decoded = row.into_record(&resolver()).await.unwrap();
        assert!(decoded.request.form.is_none());
    }

    #[tokio::test]
    async fn test_malformed_form_fails_decode() {
        let mut row = RequestRow::from_record(&sample_record());
        row.form = Some("a=%zz".into());

        let err = row.into_record(&resolver()).await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn test_unknown_kind_fails_decode() {
        let mut row = RequestRow::from_record(&sample_record());
        row.kind = "id_token".into();

        let err = row.into_record(&resolver()).await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn test_unresolvable_client_fails_decode() {
        let mut row = RequestRow::from_record(&sample_record());
        row.client_id = "deregistered".into();

        let err = row.into_record(&resolver()).await.unwrap_err();
        assert!(err.is_client_resolution());
    }
}
