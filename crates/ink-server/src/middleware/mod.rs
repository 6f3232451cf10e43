//! HTTP middleware layers.

mod authentication;

pub use authentication::{BearerToken, require_bearer_auth};
