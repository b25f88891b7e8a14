//! The process-wide table of registered rules.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{debug, info};

use super::templates::{RuleTemplate, TEMPLATES};
use super::types::{Param, RuleDef, RuleError, Stage};
use crate::placeholder::{self, Placeholder, PlaceholderError};
use crate::toolchain::Toolchain;

/// Immutable table of rules, built once from a [`Toolchain`].
#[derive(Debug, Clone)]
pub struct RuleRegistry {
  rules: BTreeMap<Stage, RuleDef>,
  toolchain: Toolchain,
}

impl RuleRegistry {
  /// Register every canonical template against `toolchain`.
  ///
  /// Optional rules whose toolchain values are unset are left out.
  pub fn new(toolchain: &Toolchain) -> Result<Self, RuleError> {
    let mut builder = Self::builder(toolchain.clone());
    for template in &TEMPLATES {
      builder.register(template)?;
    }
    let registry = builder.build();

    info!(rules = registry.len(), "rule registry built");
    Ok(registry)
  }

  /// Start an empty registry.
  pub fn builder(toolchain: Toolchain) -> RegistryBuilder {
    RegistryBuilder {
      rules: BTreeMap::new(),
      toolchain,
    }
  }

  pub fn get(&self, stage: Stage) -> Option<&RuleDef> {
    self.rules.get(&stage)
  }

  /// Like [`get`](Self::get), but an unregistered stage is an error.
  pub fn require(&self, stage: Stage) -> Result<&RuleDef, RuleError> {
    self.get(stage).ok_or(RuleError::NotRegistered(stage))
  }

  pub fn contains(&self, stage: Stage) -> bool {
    self.rules.contains_key(&stage)
  }

  pub fn toolchain(&self) -> &Toolchain {
    &self.toolchain
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Registered rules in stage order.
  pub fn iter(&self) -> impl Iterator<Item = &RuleDef> {
    self.rules.values()
  }
}

/// Collects rules before the registry is frozen.
#[derive(Debug)]
pub struct RegistryBuilder {
  rules: BTreeMap<Stage, RuleDef>,
  toolchain: Toolchain,
}

impl RegistryBuilder {
  /// Validate `template`, bind its toolchain values, and add it.
  ///
  /// Returns `Ok(false)` when an optional template was skipped because a
  /// value it needs is not configured.
  ///
  /// # Errors
  ///
  /// Fails on a stage registered twice, an unparsable command, a parameter
  /// the template does not declare, or a missing required toolchain value.
  pub fn register(&mut self, template: &RuleTemplate) -> Result<bool, RuleError> {
    let stage = template.stage;
    if self.rules.contains_key(&stage) {
      return Err(RuleError::DuplicateRule(stage));
    }

    match compile_template(template, &self.toolchain) {
      Ok(rule) => {
        debug!(rule = %stage, deps = rule.command_deps.len(), "registered rule");
        self.rules.insert(stage, rule);
        Ok(true)
      }
      Err(RuleError::MissingTool { var, .. }) if template.optional => {
        debug!(rule = %stage, missing = %var, "skipping optional rule");
        Ok(false)
      }
      Err(e) => Err(e),
    }
  }

  pub fn build(self) -> RuleRegistry {
    RuleRegistry {
      rules: self.rules,
      toolchain: self.toolchain,
    }
  }
}

/// Turn a template into a rule with its `$${config:..}` values bound.
fn compile_template(template: &RuleTemplate, toolchain: &Toolchain) -> Result<RuleDef, RuleError> {
  let stage = template.stage;
  let segments = placeholder::parse(template.command).map_err(|source| RuleError::Template { stage, source })?;
  let params: BTreeSet<Param> = template.params.iter().copied().collect();

  for p in placeholder::placeholders(&segments) {
    match p {
      Placeholder::Param(param) if !params.contains(param) => {
        return Err(RuleError::UndeclaredParam { stage, param: *param });
      }
      Placeholder::Config(var) if toolchain.value(*var).is_none() => {
        return Err(RuleError::MissingTool { stage, var: *var });
      }
      _ => {}
    }
  }

  // Every tool the command references, in first-use order
  let mut command_deps: Vec<PathBuf> = Vec::new();
  for p in placeholder::placeholders(&segments) {
    if let Placeholder::Config(var) = p
      && let Some(path) = toolchain.tool_path(*var)
      && !command_deps.contains(&path)
    {
      command_deps.push(path);
    }
  }

  let command = placeholder::bind_segments(&segments, |p| match p {
    Placeholder::Config(var) => toolchain
      .value(*var)
      .map(Some)
      .ok_or(PlaceholderError::UnresolvedConfig(*var)),
    _ => Ok(None),
  })
  .map_err(|source| RuleError::Template { stage, source })?;

  Ok(RuleDef {
    stage,
    command,
    command_deps,
    params,
    rspfile: template.rspfile,
  })
}

#[cfg(test)]
mod tests {
  use tracing_test::traced_test;

  use super::*;
  use crate::rule::templates::{DX, ERROR_PRONE, JARJAR};
  use crate::toolchain::ConfigVar;

  fn error_prone_toolchain() -> Toolchain {
    Toolchain {
      error_prone_javac_jar: Some(PathBuf::from("/ep/javac.jar")),
      error_prone_jar: Some(PathBuf::from("/ep/error_prone.jar")),
      ..Default::default()
    }
  }

  #[test]
  fn default_toolchain_registers_all_but_error_prone() {
    let registry = RuleRegistry::new(&Toolchain::default()).unwrap();

    assert_eq!(registry.len(), 6);
    assert!(!registry.contains(Stage::ErrorProne));
    assert_eq!(
      registry.require(Stage::ErrorProne),
      Err(RuleError::NotRegistered(Stage::ErrorProne))
    );
  }

  #[test]
  fn error_prone_registered_when_configured() {
    let registry = RuleRegistry::new(&error_prone_toolchain()).unwrap();
    let rule = registry.require(Stage::ErrorProne).unwrap();

    assert_eq!(
      rule.command_deps,
      vec![
        Toolchain::default().java,
        PathBuf::from("/ep/javac.jar"),
        PathBuf::from("/ep/error_prone.jar"),
        Toolchain::default().soong_zip,
      ]
    );
    assert!(rule.command_template().contains("com.google.errorprone.ErrorProneCompiler"));
  }

  #[test]
  fn toolchain_values_bound_into_command() {
    let toolchain = Toolchain {
      javac: PathBuf::from("/jdk/bin/javac"),
      javac_wrapper: "ccache ".to_string(),
      ..Default::default()
    };
    let registry = RuleRegistry::new(&toolchain).unwrap();
    let cmd = registry.require(Stage::Javac).unwrap().command_template();

    assert!(cmd.contains("ccache /jdk/bin/javac -J-Xmx2048M -Xmaxerrs 9999999"));
    assert!(!cmd.contains("$${config:"));
    assert!(cmd.contains("@$${rspfile}"));
  }

  #[test]
  fn command_deps_follow_first_use() {
    let registry = RuleRegistry::new(&Toolchain::default()).unwrap();
    let defaults = Toolchain::default();

    let deps = |stage| registry.require(stage).unwrap().command_deps.clone();
    assert_eq!(deps(Stage::Javac), vec![defaults.javac.clone(), defaults.soong_zip.clone()]);
    assert_eq!(deps(Stage::Jar), vec![defaults.soong_zip.clone()]);
    assert_eq!(deps(Stage::CombineJar), vec![defaults.merge_zips.clone()]);
    assert_eq!(deps(Stage::Desugar), vec![defaults.java.clone(), defaults.desugar_jar.clone()]);
    assert_eq!(
      deps(Stage::Dx),
      vec![defaults.dx.clone(), defaults.soong_zip.clone(), defaults.merge_zips.clone()]
    );
    assert_eq!(deps(Stage::JarJar), vec![defaults.java.clone(), defaults.jarjar.clone()]);
  }

  #[test]
  fn duplicate_registration_rejected() {
    let mut builder = RuleRegistry::builder(Toolchain::default());
    assert_eq!(builder.register(&DX), Ok(true));
    assert_eq!(builder.register(&DX), Err(RuleError::DuplicateRule(Stage::Dx)));
  }

  #[test]
  fn undeclared_param_rejected() {
    let template = RuleTemplate {
      params: &[],
      ..JARJAR
    };
    let mut builder = RuleRegistry::builder(Toolchain::default());

    assert_eq!(
      builder.register(&template),
      Err(RuleError::UndeclaredParam {
        stage: Stage::JarJar,
        param: Param::RulesFile,
      })
    );
  }

  #[test]
  fn bad_template_rejected() {
    let template = RuleTemplate {
      command: "$${config:java} -jar $${param:rulesFile",
      ..JARJAR
    };
    let mut builder = RuleRegistry::builder(Toolchain::default());

    assert!(matches!(
      builder.register(&template),
      Err(RuleError::Template {
        stage: Stage::JarJar,
        source: PlaceholderError::Unclosed(_),
      })
    ));
  }

  #[test]
  fn missing_required_tool_rejected() {
    let template = RuleTemplate {
      optional: false,
      ..ERROR_PRONE
    };
    let mut builder = RuleRegistry::builder(Toolchain::default());

    assert_eq!(
      builder.register(&template),
      Err(RuleError::MissingTool {
        stage: Stage::ErrorProne,
        var: ConfigVar::ErrorProneJavacJar,
      })
    );
  }

  #[test]
  #[traced_test]
  fn skipped_optional_rule_is_logged() {
    let mut builder = RuleRegistry::builder(Toolchain::default());
    assert_eq!(builder.register(&ERROR_PRONE), Ok(false));
    assert!(builder.build().is_empty());
    assert!(logs_contain("skipping optional rule"));
  }

  #[test]
  fn iter_in_stage_order() {
    let registry = RuleRegistry::new(&error_prone_toolchain()).unwrap();
    let names: Vec<&str> = registry.iter().map(RuleDef::name).collect();

    assert_eq!(names, vec!["javac", "errorprone", "jar", "combineJar", "desugar", "dx", "jarjar"]);
  }

  #[test]
  fn registry_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RuleRegistry>();
  }
}
