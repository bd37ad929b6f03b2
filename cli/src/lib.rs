//! tachibana-cli: command-line front end for the tachibana client.
//!
//! Reads account and endpoint settings from a TOML file, logs in for each
//! command, and logs out when the command ends.

pub mod commands;
pub mod config;
pub mod error;
