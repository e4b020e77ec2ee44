//! Domain types and collaborator traits for the grantstore OAuth2 grant store.
//!
//! This crate defines the storage-agnostic half of the grant store:
//!
//! - [`RequestRecord`] / [`GrantRequest`] - the persisted request model
//! - [`FormData`] - an order-preserving form multimap with strict
//!   query-string round-tripping
//! - [`ClientResolver`] - the client registry seam; only the client id is
//!   persisted and full metadata is re-resolved on every read
//! - [`StoreError`] - the unified error taxonomy shared by all backends
//! - [`hash_access_token_signature`] - the category-specific signature
//!   hashing policy for access tokens
//!
//! Storage backends live in separate crates:
//!
//! - `grantstore-postgres` - PostgreSQL storage backend

pub mod client;
pub mod error;
pub mod form;
pub mod request;
pub mod signature;

pub use client::{ClientInfo, ClientResolver};
pub use error::{BoxError, StoreError, StoreResult};
pub use form::FormData;
pub use request::{GrantKind, GrantRequest, PersistableRequest, RequestRecord};
pub use signature::hash_access_token_signature;
