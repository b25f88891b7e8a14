use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::placeholder::{self, PlaceholderError, Segment};
use crate::toolchain::ConfigVar;

/// A pipeline stage, one per registered rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
  /// Standard compile.
  Javac,
  /// Compile with error prone static analysis.
  #[serde(rename = "errorprone")]
  ErrorProne,
  /// Archive resources into a jar.
  Jar,
  /// Merge archives.
  CombineJar,
  /// Rewrite newer language constructs for older bytecode targets.
  Desugar,
  /// Compile to device bytecode and merge with the source archive's resources.
  Dx,
  /// Rule-based symbol rename.
  #[serde(rename = "jarjar")]
  JarJar,
}

impl Stage {
  pub const ALL: [Stage; 7] = [
    Stage::Javac,
    Stage::ErrorProne,
    Stage::Jar,
    Stage::CombineJar,
    Stage::Desugar,
    Stage::Dx,
    Stage::JarJar,
  ];

  /// The rule name declared to the engine.
  pub fn as_str(self) -> &'static str {
    match self {
      Stage::Javac => "javac",
      Stage::ErrorProne => "errorprone",
      Stage::Jar => "jar",
      Stage::CombineJar => "combineJar",
      Stage::Desugar => "desugar",
      Stage::Dx => "dx",
      Stage::JarJar => "jarjar",
    }
  }

  /// Human-readable description printed while the step runs.
  pub fn description(self) -> &'static str {
    match self {
      Stage::CombineJar => "combine jars",
      other => other.as_str(),
    }
  }
}

impl std::fmt::Display for Stage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A named per-invocation argument a rule template can reference with `$${param:NAME}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Param {
  JavacFlags,
  Sourcepath,
  BootClasspath,
  Classpath,
  Processorpath,
  OutDir,
  AnnoDir,
  JavaVersion,
  JarArgs,
  JavaFlags,
  ClasspathFlags,
  DesugarFlags,
  DumpDir,
  DxFlags,
  RulesFile,
}

impl Param {
  pub const ALL: [Param; 15] = [
    Param::JavacFlags,
    Param::Sourcepath,
    Param::BootClasspath,
    Param::Classpath,
    Param::Processorpath,
    Param::OutDir,
    Param::AnnoDir,
    Param::JavaVersion,
    Param::JarArgs,
    Param::JavaFlags,
    Param::ClasspathFlags,
    Param::DesugarFlags,
    Param::DumpDir,
    Param::DxFlags,
    Param::RulesFile,
  ];

  /// The variable name used in templates and in generated build files.
  pub fn as_str(self) -> &'static str {
    match self {
      Param::JavacFlags => "javacFlags",
      Param::Sourcepath => "sourcepath",
      Param::BootClasspath => "bootClasspath",
      Param::Classpath => "classpath",
      Param::Processorpath => "processorpath",
      Param::OutDir => "outDir",
      Param::AnnoDir => "annoDir",
      Param::JavaVersion => "javaVersion",
      Param::JarArgs => "jarArgs",
      Param::JavaFlags => "javaFlags",
      Param::ClasspathFlags => "classpathFlags",
      Param::DesugarFlags => "desugarFlags",
      Param::DumpDir => "dumpDir",
      Param::DxFlags => "dxFlags",
      Param::RulesFile => "rulesFile",
    }
  }

  pub fn parse(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|p| p.as_str() == name)
  }
}

impl std::fmt::Display for Param {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Errors building the registry or matching an invocation to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
  #[error("rule {0} is already registered")]
  DuplicateRule(Stage),

  #[error("rule {0} is not registered")]
  NotRegistered(Stage),

  #[error("rule {stage} has an invalid command template: {source}")]
  Template {
    stage: Stage,
    #[source]
    source: PlaceholderError,
  },

  #[error("rule {stage} references parameter '{param}' it does not declare")]
  UndeclaredParam { stage: Stage, param: Param },

  #[error("rule {stage} needs toolchain value '{var}', which is not configured")]
  MissingTool { stage: Stage, var: ConfigVar },

  #[error("rule {stage} arguments do not match its parameters (missing: {missing:?}, unexpected: {unexpected:?})")]
  ParamMismatch {
    stage: Stage,
    missing: Vec<Param>,
    unexpected: Vec<Param>,
  },
}

/// A registered build rule.
///
/// Toolchain values are already bound into `command`; only `$${in}`,
/// `$${out}`, `$${rspfile}` and `$${param:..}` placeholders remain for the
/// engine to fill per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
  pub stage: Stage,
  pub command: Vec<Segment>,
  /// Binaries and jars the command runs; changing one invalidates every step using the rule.
  pub command_deps: Vec<PathBuf>,
  pub params: BTreeSet<Param>,
  /// Inputs are passed through a response file at `<out>.rsp` instead of the command line.
  pub rspfile: bool,
}

impl RuleDef {
  pub fn name(&self) -> &'static str {
    self.stage.as_str()
  }

  pub fn description(&self) -> &'static str {
    self.stage.description()
  }

  /// The command with its remaining placeholders written back in template syntax.
  pub fn command_template(&self) -> String {
    placeholder::render_template(&self.command)
  }

  /// Check that an argument map supplies exactly this rule's parameters.
  pub fn check_params(&self, args: &BTreeMap<Param, String>) -> Result<(), RuleError> {
    let missing: Vec<Param> = self.params.iter().filter(|p| !args.contains_key(*p)).copied().collect();
    let unexpected: Vec<Param> = args.keys().filter(|p| !self.params.contains(*p)).copied().collect();

    if missing.is_empty() && unexpected.is_empty() {
      Ok(())
    } else {
      Err(RuleError::ParamMismatch {
        stage: self.stage,
        missing,
        unexpected,
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn jarjar_rule() -> RuleDef {
    RuleDef {
      stage: Stage::JarJar,
      command: placeholder::parse("java -jar jarjar.jar process $${param:rulesFile} $${in} $${out}").unwrap(),
      command_deps: vec![PathBuf::from("jarjar.jar")],
      params: BTreeSet::from([Param::RulesFile]),
      rspfile: false,
    }
  }

  #[test]
  fn param_names_round_trip() {
    for param in Param::ALL {
      assert_eq!(Param::parse(param.as_str()), Some(param));
    }
    assert_eq!(Param::parse("outdir"), None);
  }

  #[test]
  fn combine_jar_description_differs_from_name() {
    assert_eq!(Stage::CombineJar.as_str(), "combineJar");
    assert_eq!(Stage::CombineJar.description(), "combine jars");
    assert_eq!(Stage::Dx.description(), "dx");
  }

  #[test]
  fn check_params_accepts_exact_set() {
    let args = BTreeMap::from([(Param::RulesFile, "rules.txt".to_string())]);
    assert_eq!(jarjar_rule().check_params(&args), Ok(()));
  }

  #[test]
  fn check_params_reports_missing_and_unexpected() {
    let args = BTreeMap::from([(Param::DxFlags, "--multi-dex".to_string())]);

    assert_eq!(
      jarjar_rule().check_params(&args),
      Err(RuleError::ParamMismatch {
        stage: Stage::JarJar,
        missing: vec![Param::RulesFile],
        unexpected: vec![Param::DxFlags],
      })
    );
  }

  #[test]
  fn command_template_round_trips() {
    assert_eq!(
      jarjar_rule().command_template(),
      "java -jar jarjar.jar process $${param:rulesFile} $${in} $${out}"
    );
  }
}
