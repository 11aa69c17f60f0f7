//! CLI, configuration and exam input for examsync
//!
//! This crate provides the `examsync` command-line interface.

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
