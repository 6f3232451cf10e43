#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod emb;
pub mod mock;
pub mod vision;

mod error;
mod health;
mod retry;

pub use error::BoxedError;
pub use health::{ServiceHealth, ServiceStatus};
pub use retry::{Retryable, RetryConfig};
