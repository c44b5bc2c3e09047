//! Core business logic module
//!
//! Everything that decides what happens to a package. Side effects go
//! through [`crate::infra`].
//!
//! # Submodules
//!
//! - [`package`] - Package list parsing and normalization
//! - [`workspace`] - Workspace layout
//! - [`fetch`] - Archive download with skip-if-present
//! - [`extract`] - Archive type detection and unpacking
//! - [`patch`] - Patch application
//! - [`method`] - Build method table
//! - [`builder`] - Build execution
//! - [`pipeline`] - Per-package stage orchestration

pub mod builder;
pub mod extract;
pub mod fetch;
pub mod method;
pub mod package;
pub mod patch;
pub mod pipeline;
pub mod workspace;
