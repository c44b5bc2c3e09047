//! extbuild - builds third-party dependencies into a shared prefix
//!
//! Reads a list of source packages, then downloads, unpacks, patches, builds
//! and installs each one in order into `<root>/<prefix>`.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Package lists, workspace layout and the build pipeline
//! - [`infra`] - Infrastructure layer (network, filesystem, archives, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
