//! KonataBlog HTTP module
//!
//! Wire types shared with the blog backend, plus (behind the `client`
//! feature) the authenticated client every caller goes through.

#[cfg(feature = "client")]
#[macro_use]
extern crate tracing;

pub mod types;

#[cfg(feature = "client")]
pub mod client;

pub use types::{ApiError, ApiResponse};

#[cfg(feature = "client")]
pub use client::{BlogClient, ClientError};
