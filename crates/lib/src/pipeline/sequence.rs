//! Whole-module sequencing.

use std::path::PathBuf;

use tracing::info;
use walkdir::WalkDir;

use super::{ModuleOutputs, Pipeline, PipelineError};
use crate::engine::BuildEngine;
use crate::flags::BuildFlags;
use crate::module::ModuleConfig;
use crate::rule::Stage;

impl<E: BuildEngine> Pipeline<'_, E> {
  /// Declare every step `module` needs, in pipeline order.
  ///
  /// All configuration checks run first, so a failing module declares
  /// nothing.
  pub fn build_module(&mut self, module: &ModuleConfig) -> Result<ModuleOutputs, PipelineError> {
    let flags = BuildFlags::from(module);
    let src_jars = module.src_jars();
    let dexed = module.installable && self.ctx.device;
    self.preflight(module, &flags, dexed)?;
    let resource_files = resource_files(module)?;

    let mut compile_deps = Vec::new();
    if module.errorprone {
      let checked = self.ctx.path_for_module_out("classes-errorprone.jar");
      self.compile_with_error_prone(&checked, &module.srcs, &src_jars, &flags)?;
      compile_deps.push(checked);
    }

    let compiled = self.ctx.path_for_module_out("classes-compiled.jar");
    self.compile(&compiled, &module.srcs, &src_jars, &flags, &compile_deps)?;

    let mut jars = vec![compiled];
    let resource_args = module.resource_jar_args();
    if !resource_args.is_empty() {
      let res = self.ctx.path_for_module_out("res.jar");
      self.jar_resources(&res, &resource_args, &resource_files)?;
      jars.push(res);
    }
    jars.extend(module.static_libs.iter().cloned());

    let mut classes: PathBuf = if jars.len() == 1 && module.manifest.is_none() {
      jars.remove(0)
    } else {
      let combined = self.ctx.path_for_module_out("classes.jar");
      self.combine_jars(&combined, &jars, module.manifest.as_deref(), false)?;
      combined
    };

    if let Some(rules_file) = &module.jarjar_rules {
      let renamed = self.ctx.path_for_module_out("jarjar/classes.jar");
      self.jarjar(&renamed, &classes, rules_file)?;
      classes = renamed;
    }

    let dex_jar = if dexed {
      let desugared = self.ctx.path_for_module_out("desugar/classes.jar");
      self.desugar(&desugared, &classes, &flags)?;

      let dex_jar = self.ctx.path_for_module_out(format!("dex/{}.jar", module.name));
      self.dex(&dex_jar, &desugared, &flags)?;
      Some(dex_jar)
    } else {
      None
    };

    info!(module = %module.name, classes = %classes.display(), dexed, "module declared");

    Ok(ModuleOutputs {
      classes_jar: classes,
      dex_jar,
    })
  }

  fn preflight(&self, module: &ModuleConfig, flags: &BuildFlags, dexed: bool) -> Result<(), PipelineError> {
    flags.platform_libraries().javac_arg(self.ctx.device)?;

    if module.errorprone && !self.rules.contains(Stage::ErrorProne) {
      return Err(PipelineError::MissingErrorProne);
    }

    let mut needed = vec![Stage::Javac, Stage::CombineJar];
    if !module.resource_jar_args().is_empty() {
      needed.push(Stage::Jar);
    }
    if module.jarjar_rules.is_some() {
      needed.push(Stage::JarJar);
    }
    if dexed {
      needed.extend([Stage::Desugar, Stage::Dx]);
    }
    for stage in needed {
      self.rules.require(stage)?;
    }
    Ok(())
  }
}

/// Every file the resource archive packs: the files below each resource
/// directory in name order, then the listed resource files.
fn resource_files(module: &ModuleConfig) -> Result<Vec<PathBuf>, PipelineError> {
  let mut files = Vec::new();
  for dir in &module.java_resource_dirs {
    for entry in WalkDir::new(dir).sort_by_file_name() {
      let entry = entry.map_err(|e| PipelineError::ResourceDir {
        path: dir.clone(),
        message: e.to_string(),
      })?;
      if entry.file_type().is_file() {
        files.push(entry.into_path());
      }
    }
  }
  files.extend(module.java_resources.iter().cloned());
  Ok(files)
}
