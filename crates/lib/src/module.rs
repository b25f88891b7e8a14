//! Raw per-module configuration.
//!
//! A [`ModuleConfig`] is what a module definition file declares: source
//! lists, classpaths, and flag lists. It is mapped into [`BuildFlags`]
//! without validation; invalid combinations surface when a stage renders
//! them.
//!
//! # Example
//!
//! ```toml
//! name = "okhttp"
//! srcs = ["src/okhttp/Call.java", "src/okhttp/Request.java"]
//! libs = ["out/okio/classes.jar"]
//! boot_classpath = ["out/core-oj/classes.jar"]
//! javacflags = ["-Xlint:unchecked"]
//! installable = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classpath::Classpath;
use crate::consts::DEFAULT_JAVA_VERSION;
use crate::flags::BuildFlags;

/// Errors loading a module definition file.
#[derive(Debug, Error)]
pub enum ModuleError {
  #[error("failed to read module file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse module file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("module file {0} does not set a name")]
  MissingName(PathBuf),
}

/// A module definition as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleConfig {
  pub name: String,
  pub srcs: Vec<PathBuf>,
  pub src_jars: Vec<PathBuf>,
  /// Compile-time dependencies, placed on the classpath.
  pub libs: Vec<PathBuf>,
  /// Archives merged into this module's output.
  pub static_libs: Vec<PathBuf>,
  pub boot_classpath: Vec<PathBuf>,
  pub system_modules: Vec<PathBuf>,
  pub processor_path: Vec<PathBuf>,
  pub javacflags: Vec<String>,
  pub dxflags: Vec<String>,
  pub desugar_flags: Vec<String>,
  pub java_version: Option<String>,
  pub java_resource_dirs: Vec<PathBuf>,
  pub java_resources: Vec<PathBuf>,
  pub manifest: Option<PathBuf>,
  pub jarjar_rules: Option<PathBuf>,
  pub errorprone: bool,
  pub installable: bool,
  /// Device modules suppress javac's default boot classpath and get dexed.
  pub device: bool,
}

impl Default for ModuleConfig {
  fn default() -> Self {
    Self {
      name: String::new(),
      srcs: Vec::new(),
      src_jars: Vec::new(),
      libs: Vec::new(),
      static_libs: Vec::new(),
      boot_classpath: Vec::new(),
      system_modules: Vec::new(),
      processor_path: Vec::new(),
      javacflags: Vec::new(),
      dxflags: Vec::new(),
      desugar_flags: Vec::new(),
      java_version: None,
      java_resource_dirs: Vec::new(),
      java_resources: Vec::new(),
      manifest: None,
      jarjar_rules: None,
      errorprone: false,
      installable: false,
      device: true,
    }
  }
}

impl ModuleConfig {
  /// Load a module definition from a TOML file.
  pub fn load(path: &Path) -> Result<Self, ModuleError> {
    let content = std::fs::read_to_string(path).map_err(|source| ModuleError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: ModuleConfig = toml::from_str(&content).map_err(|source| ModuleError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    if config.name.is_empty() {
      return Err(ModuleError::MissingName(path.to_path_buf()));
    }
    Ok(config)
  }

  pub fn java_version(&self) -> &str {
    self.java_version.as_deref().unwrap_or(DEFAULT_JAVA_VERSION)
  }

  /// Source archives, as a sourcepath.
  pub fn src_jars(&self) -> Classpath {
    self.src_jars.iter().collect()
  }

  /// Archiver arguments packing this module's Java resources.
  pub fn resource_jar_args(&self) -> Vec<String> {
    let mut args = Vec::new();
    for dir in &self.java_resource_dirs {
      args.push(format!("-C {} -D {}", dir.display(), dir.display()));
    }
    for file in &self.java_resources {
      args.push(format!("-f {}", file.display()));
    }
    args
  }
}

impl From<&ModuleConfig> for BuildFlags {
  fn from(config: &ModuleConfig) -> Self {
    BuildFlags {
      javac_flags: config.javacflags.join(" "),
      dx_flags: config.dxflags.join(" "),
      boot_classpath: config.boot_classpath.iter().collect(),
      classpath: config.libs.iter().chain(&config.static_libs).collect(),
      system_modules: config.system_modules.iter().collect(),
      processor_path: config.processor_path.iter().collect(),
      desugar_flags: config.desugar_flags.join(" "),
      java_version: config.java_version().to_string(),
    }
  }
}
