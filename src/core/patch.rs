//! Patch application
//!
//! Patches live in `<root>/patches/` and are applied from the scratch area
//! with `patch -N -s -p0`, so paths inside a patch start with the package's
//! directory name.
//!
//! A patch tool failure is not fatal. Re-applying a patch that is already in
//! the tree fails with the same exit status as a malformed patch, and both
//! are reported as [`PatchOutcome::AlreadyApplied`].

use std::collections::BTreeMap;

use crate::core::workspace::Workspace;
use crate::error::{PatchError, ProcessError};
use crate::infra::process::{CommandRunner, CommandSpec};

/// What applying a patch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The patch tool succeeded
    Applied,
    /// The patch tool reported failure, taken to mean already applied
    AlreadyApplied {
        /// Patch tool diagnostics
        detail: String,
    },
}

/// Applies patch files from the workspace's patch directory
#[derive(Debug)]
pub struct Patcher<R> {
    runner: R,
}

impl<R: CommandRunner> Patcher<R> {
    /// Create a patcher
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// The `patch` invocation for a patch file
    pub fn command(
        workspace: &Workspace,
        patch_file: &str,
        env: &BTreeMap<String, String>,
    ) -> CommandSpec {
        CommandSpec::new("patch", workspace.scratch_dir())
            .envs(env)
            .args(["-N", "-s", "-p0", "-i"])
            .arg(workspace.patches_dir().join(patch_file).display().to_string())
    }

    /// Apply `patch_file` against the scratch area
    pub fn apply(
        &self,
        workspace: &Workspace,
        patch_file: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<PatchOutcome, PatchError> {
        tracing::info!("Applying patch: {patch_file}");

        let path = workspace.patches_dir().join(patch_file);
        if !path.is_file() {
            return Err(PatchError::MissingPatch {
                name: patch_file.to_string(),
                path,
            });
        }

        match self.runner.run(&Self::command(workspace, patch_file, env)) {
            Ok(()) => Ok(PatchOutcome::Applied),
            Err(ProcessError::NonZeroExit { stderr, .. }) => {
                tracing::warn!("Already patched. Skipping... ({patch_file})");
                tracing::debug!("patch output: {stderr}");
                Ok(PatchOutcome::AlreadyApplied { detail: stderr })
            }
            Err(e) => Err(PatchError::Tool(e)),
        }
    }
}
