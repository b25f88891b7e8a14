//! Types shared by the pipeline stages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classpath::ClasspathError;
use crate::module::ModuleConfig;
use crate::rule::RuleError;

/// Errors that stop a module's declarations.
///
/// All of these are configuration errors raised before the offending step
/// reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Classpath(#[from] ClasspathError),

  #[error(transparent)]
  Rule(#[from] RuleError),

  #[error(
    "missing external analysis component: cannot build with error prone, \
     set error_prone_javac_jar and error_prone_jar in the toolchain"
  )]
  MissingErrorProne,

  #[error("failed to list resource directory {path}: {message}")]
  ResourceDir { path: PathBuf, message: String },
}

/// The module a pipeline declares steps for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleContext {
  pub name: String,
  /// Module output root; every intermediate lives below it.
  pub out_dir: PathBuf,
  /// Device modules suppress javac's default platform libraries.
  pub device: bool,
}

impl ModuleContext {
  pub fn new(name: impl Into<String>, out_dir: impl Into<PathBuf>, device: bool) -> Self {
    Self {
      name: name.into(),
      out_dir: out_dir.into(),
      device,
    }
  }

  /// Context for `module`, rooted at `<out_root>/<name>`.
  pub fn for_module(module: &ModuleConfig, out_root: &Path) -> Self {
    Self::new(&module.name, out_root.join(&module.name), module.device)
  }

  /// A path below the module output root.
  pub fn path_for_module_out(&self, rel: impl AsRef<Path>) -> PathBuf {
    self.out_dir.join(rel)
  }
}

/// Paths a module's declarations produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOutputs {
  /// Class archive dependents compile against.
  pub classes_jar: PathBuf,
  /// Dexed archive, for installable device modules.
  pub dex_jar: Option<PathBuf>,
}

impl ModuleOutputs {
  /// The archive that gets installed.
  pub fn install_jar(&self) -> &Path {
    self.dex_jar.as_deref().unwrap_or(&self.classes_jar)
  }
}
