//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test workspace context
///
/// A temporary directory used as the workspace root, plus a separate
/// directory for package lists so they never land in the scratch area.
pub struct TestProject {
    /// Workspace root
    pub dir: TempDir,
    /// Holds package list files
    pub inputs: TempDir,
}

impl TestProject {
    /// Create a new test workspace in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
            inputs: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the workspace root
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file under the workspace root
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Write a package list and return its path
    pub fn write_input(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inputs.path().join(name);
        std::fs::write(&path, content).expect("Failed to write package list");
        path
    }

    /// Check if a file exists under the workspace root
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file under the workspace root
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run the binary with this workspace as its root
    pub fn run(&self, args: &[&str]) -> Output {
        run_extbuild(Some(self.dir.path()), args)
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the binary, with `root` exported as the workspace variable if given
pub fn run_extbuild(root: Option<&Path>, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_extbuild"));
    cmd.env_remove("ROS_WORKSPACE_ROOT").env_remove("RUST_LOG");
    if let Some(root) = root {
        cmd.env("ROS_WORKSPACE_ROOT", root);
    }
    cmd.args(args);
    cmd.output().expect("Failed to execute extbuild")
}

/// A `.tar.gz` whose entries live under `wrapper/`
pub fn tar_gz(wrapper: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, format!("{wrapper}/{name}"), content.as_bytes())
            .expect("Failed to append tar entry");
    }

    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .expect("Failed to finish archive")
}

/// Package list with a single package
pub fn single_package_yaml(uri: &str, name: &str, method: &str, extra: &str) -> String {
    format!("- package:\n    uri: {uri}\n    name: {name}\n    method: {method}\n{extra}")
}
