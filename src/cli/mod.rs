//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::defaults;
use crate::core::builder::BuildSettings;
use crate::core::package::load_package_list;
use crate::core::pipeline::Pipeline;
use crate::core::workspace::Workspace;
use crate::error::ConfigurationError;
use crate::infra::process::SystemRunner;
use output::{status, BuildProgress};

/// extbuild - build third-party dependencies into a shared prefix
///
/// Downloads, unpacks, patches, builds and installs every package in the
/// list, in order, stopping at the first failure.
#[derive(Parser, Debug)]
#[command(name = "extbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Package list (YAML, or TOML when the file ends in .toml)
    pub input: Option<PathBuf>,

    /// Workspace root where dependencies are built
    #[arg(long, env = "ROS_WORKSPACE_ROOT")]
    pub root: Option<PathBuf>,

    /// Install prefix directory name under the root
    #[arg(long, default_value = defaults::INSTALL_PREFIX_DIR)]
    pub prefix_name: String,

    /// Parallel make jobs for packages without their own -j
    #[arg(short, long, default_value_t = defaults::DEFAULT_BUILD_JOBS)]
    pub jobs: usize,

    /// Python interpreter for the python method
    #[arg(long, default_value = defaults::DEFAULT_PYTHON)]
    pub python: String,

    /// Python version selecting the site-packages directory
    #[arg(long, default_value = defaults::DEFAULT_PYTHON_VERSION)]
    pub python_version: String,

    /// Remove the scratch area before building
    #[arg(long)]
    pub clean: bool,

    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Log level implied by the verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }

    /// Build settings from the command line
    pub fn build_settings(&self) -> BuildSettings {
        BuildSettings {
            python: self.python.clone(),
            python_version: self.python_version.clone(),
        }
    }

    /// Execute the run
    pub async fn run(self) -> Result<()> {
        let workspace = Workspace::resolve(self.root.clone())?.with_prefix_name(&self.prefix_name);
        let input = self.input.as_deref().ok_or(ConfigurationError::MissingInput)?;

        let packages = load_package_list(input, self.jobs)?;
        tracing::info!("Loaded {} package(s) from {}", packages.len(), input.display());

        let pipeline = Pipeline::new(workspace, SystemRunner).with_settings(self.build_settings());
        pipeline.prepare(self.clean).map_err(ConfigurationError::from)?;

        let progress = (!self.quiet).then(BuildProgress::new);
        let pipeline = match &progress {
            Some(progress) => pipeline.on_event(progress.callback()),
            None => pipeline,
        };

        let summary = match pipeline.run(&packages).await {
            Ok(summary) => summary,
            Err(e) => {
                if let Some(progress) = &progress {
                    progress.abandon();
                }
                return Err(e.into());
            }
        };

        if let Some(progress) = &progress {
            progress.finish(&format!(
                "{} Installed {} package(s) into {}",
                status::SUCCESS,
                summary.packages,
                pipeline.workspace().install_prefix().display()
            ));
        }

        Ok(())
    }
}
