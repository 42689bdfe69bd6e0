//! The sessionstore-cli crate implements the `sessions` CLI for inspecting and maintaining the sessions table, as well as functionality for displaying information in a console UI.

/// Tracing subscriber setup for the CLI.
pub mod tracing;
/// Utilities for CLIs
pub mod util;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] sessionstore_config::Error),
    #[error("Session store error: {0}")]
    Store(#[from] sessionstore_db::Error),
    #[error("Io error")]
    Io(#[from] std::io::Error),
    #[error("Other error")]
    Other(#[from] color_eyre::Report),
}
