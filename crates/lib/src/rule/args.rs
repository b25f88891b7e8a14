//! Typed per-stage rule arguments.
//!
//! Each stage takes its own argument struct; [`RuleArgs::into_params`]
//! flattens it into the parameter map the engine sees, with exactly the
//! stage's parameter set as keys.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::types::{Param, Stage};

/// Arguments of the `javac` and `errorprone` rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavacArgs {
  pub javac_flags: String,
  pub sourcepath: String,
  pub boot_classpath: String,
  pub classpath: String,
  pub processorpath: String,
  pub out_dir: PathBuf,
  pub anno_dir: PathBuf,
  pub java_version: String,
}

/// Arguments of the `jar` and `combineJar` rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JarArgs {
  pub jar_args: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesugarArgs {
  pub dump_dir: PathBuf,
  pub java_flags: String,
  pub classpath_flags: String,
  pub desugar_flags: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DxArgs {
  pub out_dir: PathBuf,
  pub dx_flags: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JarjarArgs {
  pub rules_file: PathBuf,
}

/// Arguments for one rule invocation, tagged by stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum RuleArgs {
  Javac(JavacArgs),
  #[serde(rename = "errorprone")]
  ErrorProne(JavacArgs),
  Jar(JarArgs),
  CombineJar(JarArgs),
  Desugar(DesugarArgs),
  Dx(DxArgs),
  #[serde(rename = "jarjar")]
  JarJar(JarjarArgs),
}

impl RuleArgs {
  pub fn stage(&self) -> Stage {
    match self {
      RuleArgs::Javac(_) => Stage::Javac,
      RuleArgs::ErrorProne(_) => Stage::ErrorProne,
      RuleArgs::Jar(_) => Stage::Jar,
      RuleArgs::CombineJar(_) => Stage::CombineJar,
      RuleArgs::Desugar(_) => Stage::Desugar,
      RuleArgs::Dx(_) => Stage::Dx,
      RuleArgs::JarJar(_) => Stage::JarJar,
    }
  }

  /// Flatten into the rule's parameter map.
  pub fn into_params(self) -> BTreeMap<Param, String> {
    let path = |p: PathBuf| p.display().to_string();

    match self {
      RuleArgs::Javac(a) | RuleArgs::ErrorProne(a) => BTreeMap::from([
        (Param::JavacFlags, a.javac_flags),
        (Param::Sourcepath, a.sourcepath),
        (Param::BootClasspath, a.boot_classpath),
        (Param::Classpath, a.classpath),
        (Param::Processorpath, a.processorpath),
        (Param::OutDir, path(a.out_dir)),
        (Param::AnnoDir, path(a.anno_dir)),
        (Param::JavaVersion, a.java_version),
      ]),
      RuleArgs::Jar(a) | RuleArgs::CombineJar(a) => BTreeMap::from([(Param::JarArgs, a.jar_args)]),
      RuleArgs::Desugar(a) => BTreeMap::from([
        (Param::DumpDir, path(a.dump_dir)),
        (Param::JavaFlags, a.java_flags),
        (Param::ClasspathFlags, a.classpath_flags),
        (Param::DesugarFlags, a.desugar_flags),
      ]),
      RuleArgs::Dx(a) => BTreeMap::from([(Param::OutDir, path(a.out_dir)), (Param::DxFlags, a.dx_flags)]),
      RuleArgs::JarJar(a) => BTreeMap::from([(Param::RulesFile, path(a.rules_file))]),
    }
  }
}
