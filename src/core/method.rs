//! Build methods
//!
//! Every method is a row in one table: which of the configure, build and
//! install steps run, with which command, from which directory. Adding a
//! method means adding a row to [`BuildMethod::plan`].
//!
//! | Method      | Configure                     | Build            | Install                      |
//! |-------------|-------------------------------|------------------|------------------------------|
//! | `python`    | -                             | -                | `python setup.py install`    |
//! | `configure` | `./configure --prefix=P ...`  | `make <mf>`      | `make install`               |
//! | `cmake`     | `cmake ... ..` in build dir   | `make <mf>`      | `make install`               |
//! | `custom`    | -                             | `<flags>`        | -                            |
//! | `make`      | -                             | `make <mf>`      | `make prefix=P install`      |

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::defaults;
use crate::error::BuildError;
use crate::infra::process::CommandSpec;

/// Build strategy for a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildMethod {
    /// `python setup.py install` into the prefix
    PythonInstall,
    /// autotools `./configure && make && make install`
    Configure,
    /// out-of-tree cmake build
    CMake,
    /// arbitrary command that does everything
    Custom,
    /// plain `make` against the existing tree
    Make,
}

impl BuildMethod {
    /// All methods, in table order
    pub const ALL: [Self; 5] = [
        Self::PythonInstall,
        Self::Configure,
        Self::CMake,
        Self::Custom,
        Self::Make,
    ];

    /// Tag used in package lists
    pub fn tag(self) -> &'static str {
        match self {
            Self::PythonInstall => "python",
            Self::Configure => "configure",
            Self::CMake => "cmake",
            Self::Custom => "custom",
            Self::Make => "make",
        }
    }

    /// Resolve the method's steps for one package
    pub fn plan(self, ctx: &BuildContext<'_>) -> Result<BuildPlan, BuildError> {
        let src = ctx.source_dir;
        let prefix = ctx.install_prefix.display();
        let make = |dir: &Path| CommandSpec::new("make", dir).envs(ctx.env);

        let plan = match self {
            Self::PythonInstall => BuildPlan::default()
                .create_dir(ctx.site_packages.to_path_buf())
                .step(
                    BuildStep::Install,
                    CommandSpec::new(ctx.python, src)
                        .envs(ctx.env)
                        .args(["setup.py", "install"])
                        .arg(format!("--prefix={prefix}")),
                ),
            Self::Configure => BuildPlan::default()
                .step(
                    BuildStep::Configure,
                    CommandSpec::new("./configure", src)
                        .envs(ctx.env)
                        .arg(format!("--prefix={prefix}"))
                        .split_args(ctx.flags),
                )
                .step(BuildStep::Build, make(src).split_args(ctx.make_flags))
                .step(BuildStep::Install, make(src).arg("install")),
            Self::CMake => {
                let build_dir = src.join(defaults::CMAKE_BUILD_DIR);
                BuildPlan::default()
                    .create_dir(build_dir.clone())
                    .step(
                        BuildStep::Configure,
                        CommandSpec::new("cmake", &build_dir)
                            .envs(ctx.env)
                            .arg("-DCMAKE_BUILD_TYPE=Release")
                            .arg(format!("-DCMAKE_INSTALL_PREFIX={prefix}"))
                            .arg("-DCMAKE_INSTALL_LIBDIR=lib")
                            .split_args(ctx.flags)
                            .arg(".."),
                    )
                    .step(BuildStep::Build, make(build_dir.as_path()).split_args(ctx.make_flags))
                    .step(BuildStep::Install, make(build_dir.as_path()).arg("install"))
            }
            Self::Custom => {
                let command = CommandSpec::from_command_line(ctx.flags, src, ctx.env).map_err(
                    |error| BuildError::StepFailed {
                        step: BuildStep::Build,
                        error,
                    },
                )?;
                BuildPlan::default().step(BuildStep::Build, command)
            }
            Self::Make => BuildPlan::default()
                .step(BuildStep::Build, make(src).split_args(ctx.make_flags))
                .step(
                    BuildStep::Install,
                    make(src).arg(format!("prefix={prefix}")).arg("install"),
                ),
        };

        Ok(plan)
    }
}

impl FromStr for BuildMethod {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.tag() == s)
            .ok_or_else(|| BuildError::UnknownMethod {
                method: s.to_string(),
            })
    }
}

impl fmt::Display for BuildMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Sub-steps of a build, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStep {
    /// Generate the build system
    Configure,
    /// Compile
    Build,
    /// Install into the prefix
    Install,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure => write!(f, "configure"),
            Self::Build => write!(f, "build"),
            Self::Install => write!(f, "install"),
        }
    }
}

/// Inputs a method needs to produce its commands
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// Unpacked source tree
    pub source_dir: &'a Path,
    /// Shared install prefix
    pub install_prefix: &'a Path,
    /// Python package directory inside the prefix
    pub site_packages: &'a Path,
    /// Python interpreter
    pub python: &'a str,
    /// Configure flags, or the custom command
    pub flags: &'a str,
    /// Make flags
    pub make_flags: &'a str,
    /// Extra environment for every command
    pub env: &'a BTreeMap<String, String>,
}

/// A step with its command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// Which step this is
    pub step: BuildStep,
    /// What runs
    pub command: CommandSpec,
}

/// Directories to create and steps to run for one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    /// Created before any step runs
    pub dirs: Vec<PathBuf>,
    /// Run in order
    pub steps: Vec<PlannedStep>,
}

impl BuildPlan {
    #[must_use]
    fn create_dir(mut self, dir: PathBuf) -> Self {
        self.dirs.push(dir);
        self
    }

    #[must_use]
    fn step(mut self, step: BuildStep, command: CommandSpec) -> Self {
        self.steps.push(PlannedStep { step, command });
        self
    }

    /// Steps in execution order
    pub fn step_kinds(&self) -> Vec<BuildStep> {
        self.steps.iter().map(|s| s.step).collect()
    }
}
