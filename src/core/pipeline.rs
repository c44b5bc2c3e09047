//! Package build pipeline
//!
//! Runs every package through fetch, unpack, patch, prepare, build and
//! teardown, one package at a time and in list order. The first failure
//! aborts the whole run; there is no per-package recovery.
//!
//! Stages never rely on the process working directory. Each one receives the
//! paths it works on, and every subprocess gets an explicit directory.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::core::builder::{BuildRequest, BuildSettings, Builder};
use crate::core::extract;
use crate::core::fetch::{FetchOutcome, Fetcher};
use crate::core::method::BuildStep;
use crate::core::package::PackageSpec;
use crate::core::patch::{PatchOutcome, Patcher};
use crate::core::workspace::Workspace;
use crate::error::{
    BuildError, ConfigurationError, ExtractError, FetchError, FilesystemError, PatchError,
    ProcessError,
};
use crate::infra::download::ProgressCallback;
use crate::infra::process::{CommandRunner, CommandSpec};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Download the archive
    Fetch,
    /// Extract into the source directory
    Unpack,
    /// Apply the package's patch
    Patch,
    /// Run the prepare hook
    Prepare,
    /// Configure step of the build
    Configure,
    /// Build step of the build
    Build,
    /// Install step of the build
    Install,
    /// Run the teardown hook
    Teardown,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Unpack => "unpack",
            Self::Patch => "patch",
            Self::Prepare => "prepare",
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Install => "install",
            Self::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

impl From<BuildStep> for Stage {
    fn from(step: BuildStep) -> Self {
        match step {
            BuildStep::Configure => Self::Configure,
            BuildStep::Build => Self::Build,
            BuildStep::Install => Self::Install,
        }
    }
}

/// Cause of a stage failure
#[derive(Error, Debug)]
pub enum StageError {
    /// Package entry cannot be processed
    #[error(transparent)]
    Package(#[from] ConfigurationError),

    /// Fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Unpack failed
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Patch could not be applied
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Build failed
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Prepare or teardown hook failed
    #[error("{0}")]
    Hook(ProcessError),
}

/// A run-aborting failure with its package and stage
#[derive(Error, Debug)]
#[error("Package '{package}' failed at {stage}: {error}")]
pub struct PipelineError {
    /// Package being processed
    pub package: String,
    /// Stage that failed
    pub stage: Stage,
    /// What went wrong
    pub error: StageError,
}

impl PipelineError {
    fn new(package: &str, stage: Stage, error: impl Into<StageError>) -> Self {
        Self {
            package: package.to_string(),
            stage,
            error: error.into(),
        }
    }
}

/// Progress notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent<'a> {
    /// A package is about to be processed
    PackageStarted {
        /// Package name
        package: &'a str,
        /// Zero-based position in the list
        index: usize,
        /// Number of packages in the list
        total: usize,
    },
    /// A stage is about to run
    StageStarted {
        /// Package name
        package: &'a str,
        /// Stage
        stage: Stage,
    },
    /// Download progress
    Downloading {
        /// Package name
        package: &'a str,
        /// Bytes so far
        downloaded: u64,
        /// Expected bytes, 0 when unknown
        total: u64,
    },
}

/// Receives [`PipelineEvent`]s
pub type EventCallback = Arc<dyn Fn(&PipelineEvent<'_>) + Send + Sync>;

/// Counters for a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Packages built and installed
    pub packages: usize,
    /// Archives downloaded
    pub fetched: usize,
    /// Archives found already present
    pub already_fetched: usize,
    /// Patches applied
    pub patches_applied: usize,
    /// Patches reported as already applied
    pub patches_already_applied: usize,
}

/// Drives packages through the stages
pub struct Pipeline<R> {
    workspace: Workspace,
    fetcher: Fetcher,
    runner: R,
    settings: BuildSettings,
    on_event: Option<EventCallback>,
}

impl<R: CommandRunner> Pipeline<R> {
    /// Create a pipeline with default fetcher and build settings
    pub fn new(workspace: Workspace, runner: R) -> Self {
        Self {
            workspace,
            fetcher: Fetcher::default(),
            runner,
            settings: BuildSettings::default(),
            on_event: None,
        }
    }

    /// Use a specific fetcher
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Use specific build settings
    #[must_use]
    pub fn with_settings(mut self, settings: BuildSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Receive progress events
    #[must_use]
    pub fn on_event(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    /// The workspace this pipeline builds in
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Prepare the scratch area, optionally wiping it first
    pub fn prepare(&self, clean: bool) -> Result<(), FilesystemError> {
        if clean {
            self.workspace.reset()?;
        }
        self.workspace.ensure()
    }

    fn emit(&self, event: &PipelineEvent<'_>) {
        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }

    fn stage(&self, package: &str, stage: Stage) {
        self.emit(&PipelineEvent::StageStarted { package, stage });
    }

    fn download_progress(&self, package: &str) -> Option<ProgressCallback> {
        let cb = self.on_event.clone()?;
        let package = package.to_string();
        Some(Box::new(move |downloaded, total| {
            cb(&PipelineEvent::Downloading {
                package: &package,
                downloaded,
                total,
            });
        }))
    }

    /// Run every package in order
    ///
    /// Expects [`Pipeline::prepare`] to have created the scratch area. Every
    /// package name is checked before the first package starts.
    pub async fn run(&self, packages: &[PackageSpec]) -> Result<RunSummary, PipelineError> {
        for spec in packages {
            spec.validate().map_err(|e| PipelineError::new(&spec.name, Stage::Fetch, e))?;
        }

        let env = self.settings.environment(&self.workspace.install_prefix());
        let mut summary = RunSummary::default();

        for (index, spec) in packages.iter().enumerate() {
            self.emit(&PipelineEvent::PackageStarted {
                package: &spec.name,
                index,
                total: packages.len(),
            });
            self.run_package(spec, &env, &mut summary).await?;
            summary.packages += 1;
        }

        tracing::info!(
            "Built {} package(s): {} fetched, {} already present",
            summary.packages,
            summary.fetched,
            summary.already_fetched
        );
        Ok(summary)
    }

    async fn run_package(
        &self,
        spec: &PackageSpec,
        env: &BTreeMap<String, String>,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let name = spec.name.as_str();
        tracing::info!("Package {name}");

        let archive_name = spec.archive_name();

        self.stage(name, Stage::Fetch);
        let fetched = self
            .fetcher
            .fetch(
                &self.workspace,
                &spec.uri,
                &archive_name,
                self.download_progress(name),
            )
            .await
            .map_err(|e| PipelineError::new(name, Stage::Fetch, e))?;
        match fetched {
            FetchOutcome::Downloaded { .. } => summary.fetched += 1,
            FetchOutcome::AlreadyPresent => summary.already_fetched += 1,
        }

        self.stage(name, Stage::Unpack);
        extract::unpack(
            &self.workspace.archive_path(&archive_name),
            &self.workspace.source_dir(name),
        )
        .map_err(|e| PipelineError::new(name, Stage::Unpack, e))?;

        if let Some(patch_file) = &spec.patch_file {
            self.stage(name, Stage::Patch);
            let outcome = Patcher::new(&self.runner)
                .apply(&self.workspace, patch_file, env)
                .map_err(|e| PipelineError::new(name, Stage::Patch, e))?;
            match outcome {
                PatchOutcome::Applied => summary.patches_applied += 1,
                PatchOutcome::AlreadyApplied { .. } => summary.patches_already_applied += 1,
            }
        }

        if let Some(command) = &spec.prepare_command {
            self.stage(name, Stage::Prepare);
            self.run_hook(command, env)
                .map_err(|e| PipelineError::new(name, Stage::Prepare, StageError::Hook(e)))?;
        }

        let source_dir = self.workspace.source_dir(name);
        let install_prefix = self.workspace.install_prefix();
        let request = BuildRequest {
            package: name,
            method: &spec.method,
            flags: &spec.flags,
            make_flags: &spec.make_flags,
            source_dir: &source_dir,
            install_prefix: &install_prefix,
        };
        Builder::new(&self.runner, self.settings.clone())
            .build(&request, env, &|step| self.stage(name, step.into()))
            .map_err(|e| {
                let stage = e.step().map_or(Stage::Build, Stage::from);
                PipelineError::new(name, stage, e)
            })?;

        if let Some(command) = &spec.teardown_command {
            self.stage(name, Stage::Teardown);
            self.run_hook(command, env)
                .map_err(|e| PipelineError::new(name, Stage::Teardown, StageError::Hook(e)))?;
        }

        Ok(())
    }

    /// Hooks run from the workspace root
    fn run_hook(&self, command: &str, env: &BTreeMap<String, String>) -> Result<(), ProcessError> {
        let command = CommandSpec::from_command_line(command, self.workspace.root(), env)?;
        tracing::info!("Running hook: {command}");
        self.runner.run(&command)
    }
}
