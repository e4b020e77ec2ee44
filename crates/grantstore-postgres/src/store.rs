//! The PostgreSQL token store.
//!
//! One operation triplet per token category, all backed by the same
//! `{prefix}request` table. Each operation issues a single parameterized
//! statement; there are no internal multi-statement transactions, so callers
//! needing cross-call atomicity must scope it themselves. Concurrent creates
//! with the same signature race at the unique index and the loser receives
//! the conflict; the store never pre-checks existence.
//!
//! Access token signatures are hashed before storage and before every
//! lookup, so the raw bearer signature never appears in the table. Codes and
//! refresh tokens store their raw signatures.

use std::sync::Arc;

use sqlx_core::pool::PoolOptions;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::Postgres;
use tracing::error;

use grantstore_core::{
    ClientResolver, GrantKind, PersistableRequest, RequestRecord, StoreError, StoreResult,
    hash_access_token_signature,
};

use crate::PgPool;
use crate::config::StoreConfig;
use crate::migrations;
use crate::schema::{RequestRow, RequestTuple};

/// Column list of the request table, in bind order.
const REQUEST_COLUMNS: &str = r#"id, "type", signature, client_id, requested_at, requested_scope, granted_scope, requested_audience, granted_audience, form, session, active"#;

/// PostgreSQL-backed store for OAuth2 grant artifacts.
///
/// Holds a connection pool and a client resolver; all record state lives in
/// the database, so the store is `Clone` + `Send` + `Sync` and safe to share
/// across request workers.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
    clients: Arc<dyn ClientResolver>,
    config: StoreConfig,
}

impl PgTokenStore {
    /// Create a store with the default configuration.
    #[must_use]
    pub fn new(pool: PgPool, clients: Arc<dyn ClientResolver>) -> Self {
        Self::with_config(pool, clients, StoreConfig::default())
    }

    /// Create a store with an explicit configuration.
    #[must_use]
    pub fn with_config(pool: PgPool, clients: Arc<dyn ClientResolver>, config: StoreConfig) -> Self {
        Self {
            pool,
            clients,
            config,
        }
    }

    /// Create a store by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, clients: Arc<dyn ClientResolver>) -> StoreResult<Self> {
        let pool = PoolOptions::<Postgres>::new()
            .connect(database_url)
            .await
            .map_err(StoreError::backend)?;
        Ok(Self::new(pool, clients))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a reference to the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Apply any pending schema migrations.
    ///
    /// Idempotent; call on every process start before first use.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails to apply. Treat as fatal.
    pub async fn migrate_up(&self) -> StoreResult<()> {
        migrations::run(&self.pool, &self.config).await
    }

    // -------------------------------------------------------------------------
    // Authorization Codes
    // -------------------------------------------------------------------------

    /// Store the request context for an issued authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if a request with the signature
    /// already exists.
    pub async fn create_authorize_code_session(
        &self,
        signature: &str,
        request: &impl PersistableRequest,
    ) -> StoreResult<()> {
        let record = RequestRecord::from_request(GrantKind::AuthorizationCode, signature, request);
        self.insert_request(&record).await
    }

    /// Load the request stored for an authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no request matches, or
    /// [`StoreError::Inactive`] carrying the stored record if the code has
    /// been invalidated.
    pub async fn authorize_code_session(&self, signature: &str) -> StoreResult<RequestRecord> {
        self.active_request(signature).await
    }

    /// Mark an authorization code as used.
    ///
    /// Idempotent: invalidating an already-inactive or nonexistent code is
    /// not an error, and no existence check is performed.
    ///
    /// # Errors
    ///
    /// Returns an error if the update cannot be executed.
    pub async fn invalidate_authorize_code_session(&self, signature: &str) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {} SET active = false WHERE signature = $1",
            self.config.request_table()
        );
        query(&sql)
            .bind(signature)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Access Tokens
    // -------------------------------------------------------------------------

    /// Store the request context for an issued access token.
    ///
    /// The signature is hashed before storage to bound the indexed key size.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if a request with the signature
    /// already exists.
    pub async fn create_access_token_session(
        &self,
        signature: &str,
        request: &impl PersistableRequest,
    ) -> StoreResult<()> {
        let record = RequestRecord::from_request(
            GrantKind::AccessToken,
            hash_access_token_signature(signature),
            request,
        );
        self.insert_request(&record).await
    }

    /// Load the request stored for an access token, looked up by the hash of
    /// the given raw signature.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no request matches, or
    /// [`StoreError::Inactive`] carrying the stored record if the token has
    /// been deactivated.
    pub async fn access_token_session(&self, signature: &str) -> StoreResult<RequestRecord> {
        self.active_request(&hash_access_token_signature(signature))
            .await
    }

    /// Delete an access token. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete cannot be executed.
    pub async fn delete_access_token_session(&self, signature: &str) -> StoreResult<()> {
        self.delete_by_signature(&hash_access_token_signature(signature))
            .await
    }

    // -------------------------------------------------------------------------
    // Refresh Tokens
    // -------------------------------------------------------------------------

    /// Store the request context for an issued refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if a request with the signature
    /// already exists.
    pub async fn create_refresh_token_session(
        &self,
        signature: &str,
        request: &impl PersistableRequest,
    ) -> StoreResult<()> {
        let record = RequestRecord::from_request(GrantKind::RefreshToken, signature, request);
        self.insert_request(&record).await
    }

    /// Load the request stored for a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no request matches, or
    /// [`StoreError::Inactive`] carrying the stored record if the token has
    /// been deactivated.
    pub async fn refresh_token_session(&self, signature: &str) -> StoreResult<RequestRecord> {
        self.active_request(signature).await
    }

    /// Delete a refresh token. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete cannot be executed.
    pub async fn delete_refresh_token_session(&self, signature: &str) -> StoreResult<()> {
        self.delete_by_signature(signature).await
    }

    // -------------------------------------------------------------------------
    // Shared plumbing
    // -------------------------------------------------------------------------

    async fn insert_request(&self, record: &RequestRecord) -> StoreResult<()> {
        let row = RequestRow::from_record(record);
        let sql = format!(
            "INSERT INTO {} ({REQUEST_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            self.config.request_table()
        );
        query(&sql)
            .bind(row.id)
            .bind(row.kind)
            .bind(row.signature)
            .bind(row.client_id)
            .bind(row.requested_at)
            .bind(row.requested_scope)
            .bind(row.granted_scope)
            .bind(row.requested_audience)
            .bind(row.granted_audience)
            .bind(row.form)
            .bind(row.session)
            .bind(row.active)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx_core::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return StoreError::conflict("request with this signature already exists");
                }
                StoreError::backend(e)
            })?;
        Ok(())
    }

    /// Look up by (already category-adjusted) signature and enforce the
    /// activity rule: inactive records are returned inside the error so
    /// callers keep the stale request context.
    async fn active_request(&self, signature: &str) -> StoreResult<RequestRecord> {
        let record = self.find_by_signature(signature).await?;
        if !record.active {
            return Err(StoreError::inactive(record));
        }
        Ok(record)
    }

    async fn find_by_signature(&self, signature: &str) -> StoreResult<RequestRecord> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM {} WHERE signature = $1",
            self.config.request_table()
        );
        let row: Option<RequestTuple> = query_as(&sql)
            .bind(signature)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "request lookup failed");
                StoreError::backend(e)
            })?;

        let row = row.ok_or_else(|| StoreError::not_found("no request for signature"))?;
        RequestRow::from_tuple(row)
            .into_record(self.clients.as_ref())
            .await
    }

    async fn delete_by_signature(&self, signature: &str) -> StoreResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE signature = $1",
            self.config.request_table()
        );
        query(&sql)
            .bind(signature)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }
}

impl std::fmt::Debug for PgTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTokenStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
