//! Database client, configuration and connection pooling.

mod pg_client;
mod pg_config;

pub use pg_client::{PgClient, PgConn, PgPoolStatus};
pub use pg_config::PgConfig;

/// Asynchronous connection pool over diesel-async managed connections.
pub type ConnectionPool = diesel_async::pooled_connection::deadpool::Pool<crate::PgConnection>;

/// A connection checked out of the pool.
pub type PooledConnection = diesel_async::pooled_connection::deadpool::Object<crate::PgConnection>;
