mod gen_ninja;
mod plan;
mod rules;
mod run;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use dexrule_lib::engine::BuildEngine;
use dexrule_lib::module::ModuleConfig;
use dexrule_lib::pipeline::{ModuleContext, ModuleOutputs, Pipeline};
use dexrule_lib::rule::RuleRegistry;
use dexrule_lib::toolchain::Toolchain;

pub use gen_ninja::cmd_gen;
pub use plan::cmd_plan;
pub use rules::cmd_rules;
pub use run::cmd_run;

/// State shared by every command: the rule registry and the output root.
pub struct Session {
  pub registry: RuleRegistry,
  pub out_dir: PathBuf,
}

impl Session {
  pub fn new(toolchain: Option<&Path>, out_dir: PathBuf) -> Result<Self> {
    let toolchain = Toolchain::discover(toolchain).context("Failed to load toolchain")?;
    let registry = RuleRegistry::new(&toolchain).context("Failed to build rule registry")?;
    Ok(Self { registry, out_dir })
  }

  /// Load module files, rejecting two modules with one name.
  pub fn load_modules(&self, paths: &[PathBuf]) -> Result<Vec<ModuleConfig>> {
    let mut seen: BTreeMap<String, &Path> = BTreeMap::new();
    let mut modules = Vec::with_capacity(paths.len());

    for path in paths {
      let module = ModuleConfig::load(path).with_context(|| format!("Failed to load module: {}", path.display()))?;
      if let Some(first) = seen.insert(module.name.clone(), path) {
        bail!(
          "module {} is defined by both {} and {}",
          module.name,
          first.display(),
          path.display()
        );
      }
      modules.push(module);
    }

    Ok(modules)
  }

  /// Declare every module's steps to `engine`, in the order given.
  pub fn declare<E: BuildEngine>(
    &self,
    engine: &mut E,
    modules: &[ModuleConfig],
  ) -> Result<Vec<(String, ModuleOutputs)>> {
    let mut outputs = Vec::with_capacity(modules.len());
    for module in modules {
      let ctx = ModuleContext::for_module(module, &self.out_dir);
      let out = Pipeline::new(&self.registry, engine, ctx)
        .build_module(module)
        .with_context(|| format!("Failed to declare module {}", module.name))?;
      outputs.push((module.name.clone(), out));
    }
    Ok(outputs)
  }
}
