//! Shared tracing setup for the client and the CLI

pub mod config;
pub mod init;

pub use config::InstrumentationConfig;
pub use init::init_tracing;
