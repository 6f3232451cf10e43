//! Request extractors for the HTTP facade.

mod pg_connection;
mod validated_json;

pub use pg_connection::PgPool;
pub use validated_json::ValidateJson;

pub use axum::extract::{Json, Path, Query, State};
