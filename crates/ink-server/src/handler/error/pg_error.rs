//! Database error to HTTP error conversion.

use ink_postgres::PgError;

use crate::handler::{Error, ErrorKind};

/// Tracing target for database error mapping.
const TRACING_TARGET: &str = "ink_server::handler::pg_error";

impl From<PgError> for Error<'static> {
    fn from(error: PgError) -> Self {
        match error {
            PgError::Validation(message) => {
                ErrorKind::Validation.with_message(message.into_owned()).into_static()
            }
            PgError::Query(diesel::result::Error::NotFound) => ErrorKind::NotFound.into_error(),
            error if error.is_constraint_violation() => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    constraint = ?error.constraint(),
                    "constraint violation"
                );
                ErrorKind::Validation
                    .with_message("The request violates a data constraint")
                    .into_static()
            }
            error if error.is_transient() => {
                tracing::error!(target: TRACING_TARGET, error = %error, "transient database failure");
                ErrorKind::ServiceUnavailable.into_error()
            }
            error => {
                tracing::error!(target: TRACING_TARGET, error = %error, "database error");
                ErrorKind::InternalServerError.into_error()
            }
        }
    }
}
