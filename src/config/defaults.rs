//! Default configuration values

/// Environment variable naming the workspace root
pub const ROOT_ENV_VAR: &str = "ROS_WORKSPACE_ROOT";

/// Scratch area directory under the workspace root
pub const SCRATCH_DIR: &str = "external";

/// Install prefix directory under the workspace root
pub const INSTALL_PREFIX_DIR: &str = "ros_toolchain_install";

/// Patch directory under the workspace root
pub const PATCHES_DIR: &str = "patches";

/// Out-of-tree build directory used by the cmake method
pub const CMAKE_BUILD_DIR: &str = "build_directory";

/// Retries after the initial download attempt
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Delay between download attempts (in milliseconds)
pub const RETRY_DELAY_MS: u64 = 0;

/// Default number of parallel build jobs
pub const DEFAULT_BUILD_JOBS: usize = 4;

/// Interpreter used by the python install method
pub const DEFAULT_PYTHON: &str = "python";

/// Python version selecting `lib/python<ver>/site-packages`
pub const DEFAULT_PYTHON_VERSION: &str = "2.7";
