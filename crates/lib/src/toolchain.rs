//! Toolchain configuration.
//!
//! Names every external binary the rule templates invoke, plus the flag
//! strings baked into the compile commands. Loaded from TOML; every field has
//! a default so a partial file only overrides what it sets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::TOOLCHAIN_ENV;

/// Errors loading a toolchain file.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read toolchain file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse toolchain file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

/// A value a command template can pull from the toolchain with `$${config:NAME}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigVar {
  Javac,
  JavacWrapper,
  JavacHeapFlags,
  CommonJdkFlags,
  Java,
  ErrorProneJavacJar,
  ErrorProneJar,
  SoongZip,
  MergeZips,
  DesugarJar,
  Dx,
  Jarjar,
}

impl ConfigVar {
  pub const ALL: [ConfigVar; 12] = [
    ConfigVar::Javac,
    ConfigVar::JavacWrapper,
    ConfigVar::JavacHeapFlags,
    ConfigVar::CommonJdkFlags,
    ConfigVar::Java,
    ConfigVar::ErrorProneJavacJar,
    ConfigVar::ErrorProneJar,
    ConfigVar::SoongZip,
    ConfigVar::MergeZips,
    ConfigVar::DesugarJar,
    ConfigVar::Dx,
    ConfigVar::Jarjar,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      ConfigVar::Javac => "javac",
      ConfigVar::JavacWrapper => "javacWrapper",
      ConfigVar::JavacHeapFlags => "javacHeapFlags",
      ConfigVar::CommonJdkFlags => "commonJdkFlags",
      ConfigVar::Java => "java",
      ConfigVar::ErrorProneJavacJar => "errorProneJavacJar",
      ConfigVar::ErrorProneJar => "errorProneJar",
      ConfigVar::SoongZip => "soongZip",
      ConfigVar::MergeZips => "mergeZips",
      ConfigVar::DesugarJar => "desugarJar",
      ConfigVar::Dx => "dx",
      ConfigVar::Jarjar => "jarjar",
    }
  }

  pub fn parse(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|v| v.as_str() == name)
  }
}

impl std::fmt::Display for ConfigVar {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Paths and flags of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Toolchain {
  pub javac: PathBuf,
  /// Prefix prepended to the javac command, e.g. a compiler cache launcher.
  pub javac_wrapper: String,
  pub javac_heap_flags: String,
  pub common_jdk_flags: String,
  pub java: PathBuf,
  pub error_prone_javac_jar: Option<PathBuf>,
  pub error_prone_jar: Option<PathBuf>,
  pub soong_zip: PathBuf,
  pub merge_zips: PathBuf,
  pub desugar_jar: PathBuf,
  pub dx: PathBuf,
  pub jarjar: PathBuf,
  /// Host JDK is 9 or later; desugar then needs explicit module access.
  pub use_openjdk9: bool,
}

impl Default for Toolchain {
  fn default() -> Self {
    Self {
      javac: PathBuf::from("prebuilts/jdk/jdk8/linux-x86/bin/javac"),
      javac_wrapper: String::new(),
      javac_heap_flags: "-J-Xmx2048M".to_string(),
      common_jdk_flags: "-Xmaxerrs 9999999 -encoding UTF-8 -g".to_string(),
      java: PathBuf::from("prebuilts/jdk/jdk8/linux-x86/bin/java"),
      error_prone_javac_jar: None,
      error_prone_jar: None,
      soong_zip: PathBuf::from("out/host/linux-x86/bin/soong_zip"),
      merge_zips: PathBuf::from("out/host/linux-x86/bin/merge_zips"),
      desugar_jar: PathBuf::from("out/host/linux-x86/framework/desugar.jar"),
      dx: PathBuf::from("prebuilts/build-tools/linux-x86/bin/dx"),
      jarjar: PathBuf::from("out/host/linux-x86/framework/jarjar.jar"),
      use_openjdk9: false,
    }
  }
}

impl Toolchain {
  /// Load a toolchain from a TOML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load the toolchain named explicitly, or by `DEXRULE_TOOLCHAIN`, or fall back to defaults.
  pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let path = explicit
      .map(Path::to_path_buf)
      .or_else(|| std::env::var_os(TOOLCHAIN_ENV).map(PathBuf::from));

    match path {
      Some(path) => Self::load(&path),
      None => Ok(Self::default()),
    }
  }

  /// Whether the optional error prone artifacts are configured.
  pub fn has_error_prone(&self) -> bool {
    self.error_prone_javac_jar.is_some() && self.error_prone_jar.is_some()
  }

  /// Resolve a template config value. `None` means the value is not configured.
  pub fn value(&self, var: ConfigVar) -> Option<String> {
    let path = |p: &Path| Some(p.display().to_string());
    match var {
      ConfigVar::Javac => path(&self.javac),
      ConfigVar::JavacWrapper => Some(self.javac_wrapper.clone()),
      ConfigVar::JavacHeapFlags => Some(self.javac_heap_flags.clone()),
      ConfigVar::CommonJdkFlags => Some(self.common_jdk_flags.clone()),
      ConfigVar::Java => path(&self.java),
      ConfigVar::ErrorProneJavacJar => self.error_prone_javac_jar.as_deref().and_then(path),
      ConfigVar::ErrorProneJar => self.error_prone_jar.as_deref().and_then(path),
      ConfigVar::SoongZip => path(&self.soong_zip),
      ConfigVar::MergeZips => path(&self.merge_zips),
      ConfigVar::DesugarJar => path(&self.desugar_jar),
      ConfigVar::Dx => path(&self.dx),
      ConfigVar::Jarjar => path(&self.jarjar),
    }
  }

  /// Resolve a config value that names a binary or jar on disk.
  pub fn tool_path(&self, var: ConfigVar) -> Option<PathBuf> {
    match var {
      ConfigVar::JavacWrapper | ConfigVar::JavacHeapFlags | ConfigVar::CommonJdkFlags => None,
      _ => self.value(var).map(PathBuf::from),
    }
  }
}
