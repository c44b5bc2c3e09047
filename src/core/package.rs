//! Package specifications
//!
//! A package list is an ordered sequence of [`PackageSpec`]s. Lists are
//! written in YAML (a sequence of `package:` mappings) or, for files ending
//! in `.toml`, as `[[package]]` tables.

use serde::Deserialize;
use std::path::{Component, Path};

use crate::error::ConfigurationError;

/// One package entry as written in the list
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RawPackage {
    /// Source archive location
    pub uri: String,

    /// Logical name, also the unpack directory name
    pub name: String,

    /// Build method tag
    pub method: String,

    /// Configure flags (or the whole command for the custom method)
    #[serde(default)]
    pub flags: Option<String>,

    /// Flags passed to `make`
    #[serde(default)]
    pub make_flags: Option<String>,

    /// Patch file name under `patches/`
    #[serde(default)]
    pub patch: Option<String>,

    /// Command run before the build
    #[serde(default)]
    pub prepare: Option<String>,

    /// Command run after the install
    #[serde(default)]
    pub teardown: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YamlItem {
    package: RawPackage,
}

#[derive(Debug, Default, Deserialize)]
struct TomlList {
    #[serde(default)]
    package: Vec<RawPackage>,
}

/// Immutable description of one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Source archive location
    pub uri: String,
    /// Logical name, also the unpack directory name
    pub name: String,
    /// Build method tag, parsed when the package is built
    pub method: String,
    /// Configure flags
    pub flags: String,
    /// Make flags, always carrying a `-j` parallelism flag
    pub make_flags: String,
    /// Optional patch file name
    pub patch_file: Option<String>,
    /// Optional prepare hook
    pub prepare_command: Option<String>,
    /// Optional teardown hook
    pub teardown_command: Option<String>,
}

impl PackageSpec {
    /// Normalize a raw entry
    pub fn from_raw(raw: RawPackage, default_jobs: usize) -> Self {
        Self {
            make_flags: normalize_make_flags(raw.make_flags.as_deref(), default_jobs),
            flags: raw.flags.unwrap_or_default(),
            uri: raw.uri,
            name: raw.name,
            method: raw.method,
            patch_file: non_empty(raw.patch),
            prepare_command: non_empty(raw.prepare),
            teardown_command: non_empty(raw.teardown),
        }
    }

    /// Check that the name is exactly one plain path component
    ///
    /// The name becomes `external/<name>`, which unpacking may remove, so
    /// empty names and names such as `.` or `../patches` are refused.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut components = Path::new(&self.name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(ConfigurationError::InvalidPackageName {
                name: self.name.clone(),
            }),
        }
    }

    /// Local archive name: package name plus the URI's extension
    pub fn archive_name(&self) -> String {
        format!("{}{}", self.name, uri_extension(&self.uri))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Make sure make flags request parallelism
///
/// Missing flags become `-j<jobs>`; flags without any `-j` get it appended.
pub fn normalize_make_flags(raw: Option<&str>, default_jobs: usize) -> String {
    let default = format!("-j{default_jobs}");
    match raw.map(str::trim) {
        None | Some("") => default,
        Some(flags) if flags.contains("-j") => flags.to_string(),
        Some(flags) => format!("{flags} {default}"),
    }
}

/// Last extension of the URI's final path segment, dot included
///
/// Query strings and fragments are ignored. `.../zlib-1.2.11.tar.gz` yields
/// `.gz`.
pub fn uri_extension(uri: &str) -> &str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let segment = path.rsplit('/').next().unwrap_or(path);

    match segment.rfind('.') {
        Some(idx) if segment[..idx].chars().any(|c| c != '.') => &segment[idx..],
        _ => "",
    }
}

/// Parse a YAML package list
pub fn parse_yaml(content: &str, default_jobs: usize) -> Result<Vec<PackageSpec>, String> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let items: Option<Vec<YamlItem>> = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    Ok(items
        .unwrap_or_default()
        .into_iter()
        .map(|item| PackageSpec::from_raw(item.package, default_jobs))
        .collect())
}

/// Parse a TOML package list
pub fn parse_toml(content: &str, default_jobs: usize) -> Result<Vec<PackageSpec>, String> {
    let list: TomlList = toml::from_str(content).map_err(|e| e.to_string())?;
    Ok(list
        .package
        .into_iter()
        .map(|raw| PackageSpec::from_raw(raw, default_jobs))
        .collect())
}

/// Load a package list from disk, choosing the format by extension
pub fn load_package_list(
    path: &Path,
    default_jobs: usize,
) -> Result<Vec<PackageSpec>, ConfigurationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigurationError::InputUnreadable {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
        parse_toml(&content, default_jobs)
    } else {
        parse_yaml(&content, default_jobs)
    };

    let packages = parsed.map_err(|error| ConfigurationError::InputParse {
        path: path.to_path_buf(),
        error,
    })?;

    for package in &packages {
        package.validate()?;
    }
    Ok(packages)
}
