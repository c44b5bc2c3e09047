//! Package builder
//!
//! Turns a package's method tag into a [`BuildPlan`] and runs it against the
//! unpacked source tree. The first failing step stops the build.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::core::method::{BuildContext, BuildMethod, BuildPlan, BuildStep};
use crate::error::BuildError;
use crate::infra::filesystem;
use crate::infra::process::{prepend_path, CommandRunner};

/// Settings shared by every package build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Interpreter for the python method
    pub python: String,
    /// Python version selecting the site-packages directory
    pub python_version: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            python: defaults::DEFAULT_PYTHON.to_string(),
            python_version: defaults::DEFAULT_PYTHON_VERSION.to_string(),
        }
    }
}

impl BuildSettings {
    /// Python package directory inside the prefix
    pub fn site_packages(&self, install_prefix: &Path) -> PathBuf {
        install_prefix
            .join("lib")
            .join(format!("python{}", self.python_version))
            .join("site-packages")
    }

    /// Environment added to every subprocess
    ///
    /// Puts the prefix's site-packages first on `PYTHONPATH` so packages
    /// installed earlier in the run are importable.
    pub fn environment(&self, install_prefix: &Path) -> BTreeMap<String, String> {
        let existing = std::env::var("PYTHONPATH").ok();
        let mut env = BTreeMap::new();
        env.insert(
            "PYTHONPATH".to_string(),
            prepend_path(&self.site_packages(install_prefix), existing.as_deref()),
        );
        env
    }
}

/// What to build
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// Package name
    pub package: &'a str,
    /// Method tag
    pub method: &'a str,
    /// Configure flags
    pub flags: &'a str,
    /// Make flags
    pub make_flags: &'a str,
    /// Unpacked source tree
    pub source_dir: &'a Path,
    /// Install prefix
    pub install_prefix: &'a Path,
}

/// Runs build plans
#[derive(Debug)]
pub struct Builder<R> {
    runner: R,
    settings: BuildSettings,
}

impl<R: CommandRunner> Builder<R> {
    /// Create a builder
    pub fn new(runner: R, settings: BuildSettings) -> Self {
        Self { runner, settings }
    }

    /// Build settings
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Resolve the plan for a request without running anything
    pub fn plan(
        &self,
        request: &BuildRequest<'_>,
        env: &BTreeMap<String, String>,
    ) -> Result<(BuildMethod, BuildPlan), BuildError> {
        let method: BuildMethod = request.method.parse()?;
        let site_packages = self.settings.site_packages(request.install_prefix);

        let ctx = BuildContext {
            source_dir: request.source_dir,
            install_prefix: request.install_prefix,
            site_packages: &site_packages,
            python: &self.settings.python,
            flags: request.flags,
            make_flags: request.make_flags,
            env,
        };

        Ok((method, method.plan(&ctx)?))
    }

    /// Build and install one package
    ///
    /// `on_step` is called before each step starts. An unknown method fails
    /// before any directory is created or process spawned.
    pub fn build(
        &self,
        request: &BuildRequest<'_>,
        env: &BTreeMap<String, String>,
        on_step: &dyn Fn(BuildStep),
    ) -> Result<BuildMethod, BuildError> {
        tracing::info!("Building {}", request.package);

        let (method, plan) = self.plan(request, env)?;

        for dir in &plan.dirs {
            filesystem::create_dir_all(dir)?;
        }

        for planned in &plan.steps {
            match planned.step {
                BuildStep::Configure => tracing::info!("Configuring..."),
                BuildStep::Build => tracing::info!("Making..."),
                BuildStep::Install => tracing::info!("Installing..."),
            }
            on_step(planned.step);

            self.runner
                .run(&planned.command)
                .map_err(|error| BuildError::StepFailed {
                    step: planned.step,
                    error,
                })?;
        }

        Ok(method)
    }
}
