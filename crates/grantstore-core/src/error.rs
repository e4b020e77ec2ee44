//! Error types for grant store operations.
//!
//! The taxonomy distinguishes caller-facing conditions (`NotFound`,
//! `Inactive`, `Conflict`, `Malformed`, `ClientResolution`) from transport
//! failures (`Backend`), which carry the backend's original error unmodified
//! in the source chain.

use crate::request::RequestRecord;

/// Boxed error type used to carry backend errors without modification.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during grant store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No stored request matches the given signature.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was found but has been invalidated.
    ///
    /// Carries the full stored record: callers need the stale request
    /// context even when rejecting the token, e.g. to revoke a whole token
    /// family when an authorization code replay is detected.
    #[error("token is inactive")]
    Inactive {
        /// The previously stored request, decoded as on a successful read.
        record: Box<RequestRecord>,
    },

    /// A request with the same signature already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored column could not be decoded back into the request model.
    #[error("malformed {field}: {message}")]
    Malformed {
        /// Which field failed to decode.
        field: &'static str,
        /// Description of the decode failure.
        message: String,
    },

    /// The stored client id has no resolvable client.
    #[error("client resolution failed: {0}")]
    ClientResolution(String),

    /// Database or transport failure (connectivity, cancellation, timeout).
    #[error("storage backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an `Inactive` error carrying the stored record.
    #[must_use]
    pub fn inactive(record: RequestRecord) -> Self {
        Self::Inactive {
            record: Box::new(record),
        }
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a `Malformed` error for a specific field.
    #[must_use]
    pub fn malformed(field: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            message: message.into(),
        }
    }

    /// Create a `ClientResolution` error.
    #[must_use]
    pub fn client_resolution(message: impl Into<String>) -> Self {
        Self::ClientResolution(message.into())
    }

    /// Create a `Backend` error wrapping the unmodified source.
    #[must_use]
    pub fn backend(source: impl Into<BoxError>) -> Self {
        Self::Backend(source.into())
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is an `Inactive` error.
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        matches!(self, Self::Inactive { .. })
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a `Malformed` error.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Returns `true` if this is a `ClientResolution` error.
    #[must_use]
    pub fn is_client_resolution(&self) -> bool {
        matches!(self, Self::ClientResolution(_))
    }

    /// Returns `true` if this is a `Backend` error.
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Consume the error and recover the stored record from an `Inactive`
    /// result, if any.
    #[must_use]
    pub fn into_record(self) -> Option<RequestRecord> {
        match self {
            Self::Inactive { record } => Some(*record),
            _ => None,
        }
    }
}

/// Result type for grant store operations.
pub type StoreResult<T> = Result<T, StoreError>;
