//! Database configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection and pool configuration for the Postgres store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::Args))]
pub struct PgConfig {
    /// Database host.
    #[cfg_attr(feature = "config", arg(long = "db-host", env = "INK_DB_HOST", default_value = "localhost"))]
    pub host: String,

    /// Database port.
    #[cfg_attr(feature = "config", arg(long = "db-port", env = "INK_DB_PORT", default_value_t = 5432))]
    pub port: u16,

    /// Database name.
    #[cfg_attr(feature = "config", arg(long = "db-name", env = "INK_DB_NAME", default_value = "ink"))]
    pub database: String,

    /// Database user.
    #[cfg_attr(feature = "config", arg(long = "db-user", env = "INK_DB_USER", default_value = "ink"))]
    pub user: String,

    /// Database password.
    #[cfg_attr(feature = "config", arg(long = "db-password", env = "INK_DB_PASSWORD", default_value = ""))]
    pub password: String,

    /// SSL mode (`disable`, `prefer`, `require`).
    #[cfg_attr(feature = "config", arg(long = "db-sslmode", env = "INK_DB_SSLMODE", default_value = "prefer"))]
    pub sslmode: String,

    /// Maximum number of pooled connections.
    #[cfg_attr(feature = "config", arg(long = "db-max-conns", env = "INK_DB_MAX_CONNS", default_value_t = 16))]
    pub max_connections: u32,

    /// Minimum number of idle connections the pool keeps warm.
    #[cfg_attr(feature = "config", arg(long = "db-min-conns", env = "INK_DB_MIN_CONNS", default_value_t = 1))]
    pub min_connections: u32,

    /// Seconds to wait for a connection before timing out.
    #[cfg_attr(feature = "config", arg(long = "db-conn-timeout", env = "INK_DB_CONN_TIMEOUT", default_value_t = 10))]
    pub connection_timeout_secs: u64,

    /// Seconds a connection may sit idle before recycling.
    #[cfg_attr(feature = "config", arg(long = "db-idle-timeout", env = "INK_DB_IDLE_TIMEOUT", default_value_t = 300))]
    pub idle_timeout_secs: u64,

    /// Seconds a connection may live before replacement.
    #[cfg_attr(feature = "config", arg(long = "db-max-lifetime", env = "INK_DB_MAX_LIFETIME", default_value_t = 1800))]
    pub max_lifetime_secs: u64,

    /// Embedding dimension enforced on every vector write.
    #[cfg_attr(feature = "config", arg(long = "db-vector-dimensions", env = "INK_VECTOR_DIMENSIONS", default_value_t = 512))]
    pub vector_dimensions: usize,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 5432,
            database: "ink".to_owned(),
            user: "ink".to_owned(),
            password: String::new(),
            sslmode: "prefer".to_owned(),
            max_connections: 16,
            min_connections: 1,
            connection_timeout_secs: 10,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
            vector_dimensions: 512,
        }
    }
}

impl PgConfig {
    /// Renders the connection URL.
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.database, self.sslmode
        )
    }

    /// Renders the connection URL with the password masked for logging.
    pub fn database_url_masked(&self) -> String {
        format!(
            "postgres://{}:***@{}:{}/{}?sslmode={}",
            self.user, self.host, self.port, self.database, self.sslmode
        )
    }

    /// Returns the connection acquisition timeout.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the idle recycling timeout.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_url_hides_password() {
        let config = PgConfig {
            password: "hunter2".to_owned(),
            ..Default::default()
        };

        assert!(config.postgres_url().contains("hunter2"));
        assert!(!config.database_url_masked().contains("hunter2"));
    }
}
