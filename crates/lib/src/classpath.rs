//! Ordered classpath entries and their tool-specific renderings.
//!
//! A [`Classpath`] is an ordered list of artifacts (jars, class directories,
//! module images). Order is significant: it decides symbol resolution
//! precedence, so every renderer emits entries exactly in insertion order.
//!
//! # Renderings
//!
//! | Form                | Empty                               | Non-empty                      |
//! |---------------------|-------------------------------------|--------------------------------|
//! | sourcepath          | `-sourcepath ""`                    | `-sourcepath a:b`              |
//! | classpath           | omitted                             | `-classpath a:b`               |
//! | processorpath       | omitted                             | `-processorpath a:b`           |
//! | bootclasspath       | `-bootclasspath ""` if forced       | `-bootclasspath a:b`           |
//! | system modules      | `--system=none` if forced           | `--system=<root>` (1 entry)    |
//! | desugar (per entry) | no flags                            | `--classpath_entry a` ...      |
//!
//! The explicit empty forms keep javac from silently falling back to a
//! default boot classpath, system image, or source search path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{CLASSPATH_SEPARATOR, SYSTEM_MODULES_SUFFIX};

/// Errors raised while rendering a classpath.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClasspathError {
  /// A system module image set may hold at most one entry.
  #[error("more than one system module: got {count} entries ({entries})")]
  MultipleSystemModules { count: usize, entries: String },
}

/// A single classpath artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClasspathEntry(PathBuf);

impl ClasspathEntry {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self(path.into())
  }

  pub fn path(&self) -> &Path {
    &self.0
  }
}

impl std::fmt::Display for ClasspathEntry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.display())
  }
}

/// An ordered sequence of classpath entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Classpath(Vec<ClasspathEntry>);

impl Classpath {
  pub fn new() -> Self {
    Self(Vec::new())
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, ClasspathEntry> {
    self.0.iter()
  }

  /// Append paths to the end of the classpath, keeping their order.
  pub fn add_paths<I, P>(&mut self, paths: I)
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.0.extend(paths.into_iter().map(ClasspathEntry::new));
  }

  /// The entries as plain paths, in order.
  pub fn paths(&self) -> Vec<PathBuf> {
    self.0.iter().map(|e| e.0.clone()).collect()
  }

  /// The entries as display strings, in order.
  pub fn strings(&self) -> Vec<String> {
    self.0.iter().map(ToString::to_string).collect()
  }

  fn joined(&self) -> String {
    self.strings().join(CLASSPATH_SEPARATOR)
  }

  /// Returns a `-sourcepath` argument in the form javac expects.
  ///
  /// An empty list still yields `-sourcepath ""` so javac never searches the
  /// classpath for sources.
  pub fn javac_sourcepath(&self) -> String {
    if self.is_empty() {
      r#"-sourcepath """#.to_string()
    } else {
      format!("-sourcepath {}", self.joined())
    }
  }

  /// Returns a `-classpath` argument, or an empty string if there are no entries.
  pub fn javac_classpath(&self) -> String {
    if self.is_empty() {
      String::new()
    } else {
      format!("-classpath {}", self.joined())
    }
  }

  /// Returns a `-processorpath` argument, or an empty string if there are no entries.
  pub fn javac_processorpath(&self) -> String {
    if self.is_empty() {
      String::new()
    } else {
      format!("-processorpath {}", self.joined())
    }
  }

  /// Returns a `-bootclasspath` argument.
  ///
  /// With no entries this is `-bootclasspath ""` when `force_empty` is set and
  /// an empty string otherwise.
  pub fn javac_bootclasspath(&self, force_empty: bool) -> String {
    if !self.is_empty() {
      format!("-bootclasspath {}", self.joined())
    } else if force_empty {
      r#"-bootclasspath """#.to_string()
    } else {
      String::new()
    }
  }

  /// Returns a `--system` argument for javac with `-source 1.9`.
  ///
  /// A single entry is a module image; its trailing `lib/modules` is stripped
  /// to get the module root. With no entries this is `--system=none` when
  /// `force_empty` is set and an empty string otherwise.
  ///
  /// # Errors
  ///
  /// Returns [`ClasspathError::MultipleSystemModules`] if there is more than one entry.
  pub fn javac_system_modules(&self, force_empty: bool) -> Result<String, ClasspathError> {
    match self.0.as_slice() {
      [] if force_empty => Ok("--system=none".to_string()),
      [] => Ok(String::new()),
      [entry] => {
        let image = entry.to_string();
        let root = image.strip_suffix(SYSTEM_MODULES_SUFFIX).unwrap_or(&image);
        Ok(format!("--system={root}"))
      }
      entries => Err(ClasspathError::MultipleSystemModules {
        count: entries.len(),
        entries: self.joined(),
      }),
    }
  }

  /// One `--bootclasspath_entry` flag per entry, for desugar.
  pub fn desugar_bootclasspath(&self) -> Vec<String> {
    self.per_entry("--bootclasspath_entry")
  }

  /// One `--classpath_entry` flag per entry, for desugar.
  pub fn desugar_classpath(&self) -> Vec<String> {
    self.per_entry("--classpath_entry")
  }

  fn per_entry(&self, flag: &str) -> Vec<String> {
    self.0.iter().map(|e| format!("{flag} {e}")).collect()
  }
}

impl<P: Into<PathBuf>> FromIterator<P> for Classpath {
  fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
    let mut classpath = Classpath::new();
    classpath.add_paths(iter);
    classpath
  }
}

impl<'a> IntoIterator for &'a Classpath {
  type Item = &'a ClasspathEntry;
  type IntoIter = std::slice::Iter<'a, ClasspathEntry>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}
