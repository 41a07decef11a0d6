//! Command-line front end for `hlsign-core`.
//!
//! Loads a TOML configuration and a private key, signs an action read from
//! JSON and prints the request body for `/exchange`.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

pub use config::CliConfig;
pub use error::{CliError, CliResult};
pub use logging::{init_logging, LogFormat};
