//! Per-module compilation options.
//!
//! [`BuildFlags`] is assembled once per module (see [`crate::module`]) and
//! handed unchanged to every pipeline stage.

use serde::{Deserialize, Serialize};

use crate::classpath::{Classpath, ClasspathError};
use crate::consts::SYSTEM_MODULES_JAVA_VERSION;

/// Immutable bundle of options shared by every stage of a module's pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFlags {
  pub javac_flags: String,
  pub dx_flags: String,
  pub boot_classpath: Classpath,
  pub classpath: Classpath,
  pub system_modules: Classpath,
  pub processor_path: Classpath,
  pub desugar_flags: String,
  pub java_version: String,
}

/// The platform libraries a compile resolves against.
///
/// Exactly one of the boot classpath or the system module image is used for a
/// given compile; the language version decides which.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformLibraries<'a> {
  BootClasspath(&'a Classpath),
  SystemModules(&'a Classpath),
}

impl<'a> PlatformLibraries<'a> {
  /// Render the javac argument for these libraries.
  ///
  /// # Errors
  ///
  /// Fails if a system module set holds more than one image.
  pub fn javac_arg(&self, force_empty: bool) -> Result<String, ClasspathError> {
    match self {
      PlatformLibraries::BootClasspath(cp) => Ok(cp.javac_bootclasspath(force_empty)),
      PlatformLibraries::SystemModules(cp) => cp.javac_system_modules(force_empty),
    }
  }

  /// The entries a compile must list as implicit dependencies.
  pub fn entries(&self) -> &'a Classpath {
    match self {
      PlatformLibraries::BootClasspath(cp) | PlatformLibraries::SystemModules(cp) => cp,
    }
  }
}

impl BuildFlags {
  /// Whether the language version selects system modules over the boot classpath.
  pub fn uses_system_modules(&self) -> bool {
    self.java_version == SYSTEM_MODULES_JAVA_VERSION
  }

  /// The platform libraries authoritative for this module's compiles.
  pub fn platform_libraries(&self) -> PlatformLibraries<'_> {
    if self.uses_system_modules() {
      PlatformLibraries::SystemModules(&self.system_modules)
    } else {
      PlatformLibraries::BootClasspath(&self.boot_classpath)
    }
  }
}
