//! PostgreSQL storage backend for grantstore.
//!
//! Persists OAuth2 grant artifacts (authorization codes, access tokens,
//! refresh tokens) in a single `{prefix}request` table, keyed by token
//! signature. The store owns no in-process state beyond its connection pool
//! and client resolver, so it is safe to share across request workers.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use grantstore_postgres::{PgTokenStore, StoreConfig};
//!
//! let store = PgTokenStore::connect("postgres://localhost/auth", resolver).await?;
//! store.migrate_up().await?;
//!
//! store.create_authorize_code_session("code-sig", &request).await?;
//! let record = store.authorize_code_session("code-sig").await?;
//! ```

pub mod config;
pub mod migrations;
pub mod schema;
pub mod store;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use config::StoreConfig;
pub use store::PgTokenStore;
