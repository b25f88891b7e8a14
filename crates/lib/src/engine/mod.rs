//! Build engine collaborators.
//!
//! The pipeline never runs anything itself. It hands each step to a
//! [`BuildEngine`] as a rule plus an [`Invocation`] and moves on. What the
//! engine does with the declaration is its own business:
//!
//! - [`Recorder`] keeps declarations in memory
//! - [`NinjaWriter`] renders them as a Ninja build file
//! - [`LocalRunner`] executes them in dependency order

mod local;
mod ninja;
mod record;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::placeholder::{self, PlaceholderError, Resolver};
use crate::rule::{Param, RuleDef, Stage};
use crate::toolchain::ConfigVar;
use crate::util::hash::Hashable;

pub use local::{LocalRunner, RunConfig, RunError, RunResult};
pub use ninja::{NinjaError, NinjaWriter};
pub use record::Recorder;

/// Receives rule declarations. Declaring returns no result.
pub trait BuildEngine {
  fn declare(&mut self, rule: &RuleDef, invocation: Invocation);
}

/// One declared step: a rule applied to concrete paths and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
  pub stage: Stage,
  pub description: String,
  pub output: PathBuf,
  pub inputs: Vec<PathBuf>,
  /// Files the step reads that are not on its command line as inputs.
  pub implicits: Vec<PathBuf>,
  pub args: BTreeMap<Param, String>,
}

impl Hashable for Invocation {}

impl Invocation {
  /// Where the response file of a response-file rule lives.
  pub fn rspfile(&self) -> PathBuf {
    let mut path = self.output.clone().into_os_string();
    path.push(".rsp");
    PathBuf::from(path)
  }

  /// The inputs as they appear on a command line or in a response file,
  /// each shell-quoted.
  pub fn inputs_joined(&self) -> String {
    self.inputs.iter().map(|p| shell_quote(p)).collect::<Vec<_>>().join(" ")
  }

  /// Render `rule`'s command for this invocation.
  pub fn command(&self, rule: &RuleDef) -> Result<String, PlaceholderError> {
    placeholder::substitute_segments(&rule.command, self)
  }
}

/// Quote a path for `sh`, leaving plain paths untouched the way Ninja does.
fn shell_quote(path: &Path) -> String {
  let s = path.display().to_string();
  let plain = !s.is_empty()
    && s
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '+' | '=' | ',' | '@' | ':' | '%'));
  if plain {
    s
  } else {
    format!("'{}'", s.replace('\'', "'\\''"))
  }
}

impl Resolver for Invocation {
  fn resolve_in(&self) -> Result<String, PlaceholderError> {
    Ok(self.inputs_joined())
  }

  fn resolve_out(&self) -> Result<String, PlaceholderError> {
    Ok(shell_quote(&self.output))
  }

  fn resolve_rspfile(&self) -> Result<String, PlaceholderError> {
    Ok(shell_quote(&self.rspfile()))
  }

  fn resolve_param(&self, param: Param) -> Result<String, PlaceholderError> {
    self.args.get(&param).cloned().ok_or(PlaceholderError::UnresolvedParam(param))
  }

  fn resolve_config(&self, var: ConfigVar) -> Result<String, PlaceholderError> {
    // Toolchain values are bound when the rule is registered
    Err(PlaceholderError::UnresolvedConfig(var))
  }
}
