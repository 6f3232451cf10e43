//! Port error to HTTP error conversion.
//!
//! These conversions cover handlers that call a port directly (image
//! analysis, ad-hoc embeds) instead of going through a domain service.

use crate::handler::{Error, ErrorKind};

impl From<ink_core::emb::Error> for Error<'static> {
    fn from(error: ink_core::emb::Error) -> Self {
        crate::service::ServiceError::from(error).into()
    }
}

impl From<ink_core::vision::Error> for Error<'static> {
    fn from(error: ink_core::vision::Error) -> Self {
        crate::service::ServiceError::from(error).into()
    }
}

impl From<ink_opendal::Error> for Error<'static> {
    fn from(error: ink_opendal::Error) -> Self {
        crate::service::ServiceError::from(error).into()
    }
}
