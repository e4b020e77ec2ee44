//! Configuration for the PostgreSQL storage backend.

use serde::{Deserialize, Serialize};

/// Configuration for [`PgTokenStore`](crate::PgTokenStore).
///
/// Both values are fixed at construction time and are the only text ever
/// interpolated into SQL; everything else is bound as a parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Prefix for all tables owned by the store.
    pub tables_prefix: String,

    /// Name of the table tracking applied migrations.
    /// A schema-qualified name is highly recommended.
    pub migration_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tables_prefix: "auth_fosite_".into(),
            migration_table: "public.auth_fosite_migrations".into(),
        }
    }
}

impl StoreConfig {
    /// Sets the table prefix.
    #[must_use]
    pub fn with_tables_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tables_prefix = prefix.into();
        self
    }

    /// Sets the migration tracking table name.
    #[must_use]
    pub fn with_migration_table(mut self, name: impl Into<String>) -> Self {
        self.migration_table = name.into();
        self
    }

    /// Name of the request table under the configured prefix.
    #[must_use]
    pub fn request_table(&self) -> String {
        format!("{}request", self.tables_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.tables_prefix, "auth_fosite_");
        assert_eq!(config.migration_table, "public.auth_fosite_migrations");
        assert_eq!(config.request_table(), "auth_fosite_request");
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::default()
            .with_tables_prefix("auth_test_fosite_")
            .with_migration_table("auth_test_fosite_migrations");

        assert_eq!(config.tables_prefix, "auth_test_fosite_");
        assert_eq!(config.migration_table, "auth_test_fosite_migrations");
        assert_eq!(config.request_table(), "auth_test_fosite_request");
    }

    #[test]
    fn test_config_serialization() {
        let config = StoreConfig::default();
        let json = serde_json::to_string(&config).expect("serialization failed");
        let deserialized: StoreConfig =
            serde_json::from_str(&json).expect("deserialization failed");

        assert_eq!(config.tables_prefix, deserialized.tables_prefix);
        assert_eq!(config.migration_table, deserialized.migration_table);
    }
}
