//! KonataBlog core types and utilities

pub mod config;
pub mod error;

#[cfg(feature = "tracing")]
pub mod tracing;

pub use config::{ApiSettings, AuthSettings, AuthVariant, ClientSettings, OfflineSettings};
pub use error::{CoreError, CoreResult, ErrorContext};
