//! Pipeline stages.
//!
//! Each stage declares exactly one step to the [`BuildEngine`] and returns;
//! nothing runs here. A stage computes:
//!
//! 1. The step's output, inputs, and implicit dependencies
//! 2. The rendered flag strings, from [`BuildFlags`] via the classpath renderers
//! 3. The typed rule arguments, checked against the rule's parameter set
//!
//! A module chains the stages, feeding each step's output into the next
//! (see [`Pipeline::build_module`]):
//!
//! ```text
//! compile -> combine jars -> jarjar -> desugar -> dx
//! ```

mod sequence;
mod types;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::classpath::Classpath;
use crate::consts::{ANNO_DIR, CLASSES_DIR, DESUGAR_DUMP_DIR, DEX_DIR, ERROR_PRONE_SUFFIX, OPENJDK9_DESUGAR_FLAGS};
use crate::engine::{BuildEngine, Invocation};
use crate::flags::BuildFlags;
use crate::rule::{DesugarArgs, DxArgs, JarArgs, JarjarArgs, JavacArgs, RuleArgs, RuleRegistry, Stage};

pub use types::{ModuleContext, ModuleOutputs, PipelineError};

/// Declares one module's steps against a registry and an engine.
pub struct Pipeline<'a, E: BuildEngine> {
  rules: &'a RuleRegistry,
  engine: &'a mut E,
  ctx: ModuleContext,
}

impl<'a, E: BuildEngine> Pipeline<'a, E> {
  pub fn new(rules: &'a RuleRegistry, engine: &'a mut E, ctx: ModuleContext) -> Self {
    Self { rules, engine, ctx }
  }

  pub fn context(&self) -> &ModuleContext {
    &self.ctx
  }

  /// Compile `srcs` into a class archive at `output`.
  ///
  /// `deps` are extra implicit dependencies, such as the output of an
  /// error prone compile that must finish first.
  pub fn compile(
    &mut self,
    output: &Path,
    srcs: &[PathBuf],
    src_jars: &Classpath,
    flags: &BuildFlags,
    deps: &[PathBuf],
  ) -> Result<(), PipelineError> {
    self.transform_java(RuleArgs::Javac, output, srcs, src_jars, flags, deps.to_vec(), "")
  }

  /// Compile `srcs` with error prone checks.
  ///
  /// Intermediates get a `-errorprone` suffix so this can run next to
  /// [`compile`](Self::compile) in the same module.
  ///
  /// # Errors
  ///
  /// [`PipelineError::MissingErrorProne`] if the toolchain has no error prone
  /// artifacts; nothing is declared.
  pub fn compile_with_error_prone(
    &mut self,
    output: &Path,
    srcs: &[PathBuf],
    src_jars: &Classpath,
    flags: &BuildFlags,
  ) -> Result<(), PipelineError> {
    if !self.rules.contains(Stage::ErrorProne) {
      return Err(PipelineError::MissingErrorProne);
    }
    self.transform_java(
      RuleArgs::ErrorProne,
      output,
      srcs,
      src_jars,
      flags,
      Vec::new(),
      ERROR_PRONE_SUFFIX,
    )
  }

  #[allow(clippy::too_many_arguments)]
  fn transform_java(
    &mut self,
    wrap: fn(JavacArgs) -> RuleArgs,
    output: &Path,
    srcs: &[PathBuf],
    src_jars: &Classpath,
    flags: &BuildFlags,
    mut deps: Vec<PathBuf>,
    suffix: &str,
  ) -> Result<(), PipelineError> {
    let platform = flags.platform_libraries();
    let boot_classpath = platform.javac_arg(self.ctx.device)?;

    deps.extend(src_jars.paths());
    deps.extend(platform.entries().paths());
    deps.extend(flags.classpath.paths());
    deps.extend(flags.processor_path.paths());

    let args = wrap(JavacArgs {
      javac_flags: flags.javac_flags.clone(),
      sourcepath: src_jars.javac_sourcepath(),
      boot_classpath,
      classpath: flags.classpath.javac_classpath(),
      processorpath: flags.processor_path.javac_processorpath(),
      out_dir: self.ctx.path_for_module_out(format!("{CLASSES_DIR}{suffix}")),
      anno_dir: self.ctx.path_for_module_out(format!("{ANNO_DIR}{suffix}")),
      java_version: flags.java_version.clone(),
    });

    self.declare(args, output, srcs.to_vec(), deps)
  }

  /// Archive resources into `output`. `jar_args` are pre-rendered archiver arguments.
  pub fn jar_resources(&mut self, output: &Path, jar_args: &[String], deps: &[PathBuf]) -> Result<(), PipelineError> {
    let args = RuleArgs::Jar(JarArgs {
      jar_args: jar_args.join(" "),
    });
    self.declare(args, output, Vec::new(), deps.to_vec())
  }

  /// Merge `jars`, in order, into `output`.
  ///
  /// A manifest becomes both a `-m` argument and an implicit dependency.
  /// `strip_dirs` drops directory entries from the result.
  pub fn combine_jars(
    &mut self,
    output: &Path,
    jars: &[PathBuf],
    manifest: Option<&Path>,
    strip_dirs: bool,
  ) -> Result<(), PipelineError> {
    let mut jar_args = Vec::new();
    let mut deps = Vec::new();

    if let Some(manifest) = manifest {
      jar_args.push(format!("-m {}", manifest.display()));
      deps.push(manifest.to_path_buf());
    }
    if strip_dirs {
      jar_args.push("-D".to_string());
    }

    let args = RuleArgs::CombineJar(JarArgs {
      jar_args: jar_args.join(" "),
    });
    self.declare(args, output, jars.to_vec(), deps)
  }

  /// Rewrite newer language constructs in `classes_jar` for older runtimes.
  pub fn desugar(&mut self, output: &Path, classes_jar: &Path, flags: &BuildFlags) -> Result<(), PipelineError> {
    let java_flags = if self.rules.toolchain().use_openjdk9 {
      OPENJDK9_DESUGAR_FLAGS.to_string()
    } else {
      String::new()
    };

    let mut classpath_flags = flags.boot_classpath.desugar_bootclasspath();
    classpath_flags.extend(flags.classpath.desugar_classpath());

    let mut deps = flags.boot_classpath.paths();
    deps.extend(flags.classpath.paths());

    let args = RuleArgs::Desugar(DesugarArgs {
      dump_dir: self.ctx.path_for_module_out(DESUGAR_DUMP_DIR),
      java_flags,
      classpath_flags: classpath_flags.join(" "),
      desugar_flags: flags.desugar_flags.clone(),
    });
    self.declare(args, output, vec![classes_jar.to_path_buf()], deps)
  }

  /// Dex `classes_jar` and merge the result with its non-class entries.
  ///
  /// The `dex` directory under the module root is wiped by the command
  /// before every run.
  pub fn dex(&mut self, output: &Path, classes_jar: &Path, flags: &BuildFlags) -> Result<(), PipelineError> {
    let args = RuleArgs::Dx(DxArgs {
      out_dir: self.ctx.path_for_module_out(DEX_DIR),
      dx_flags: flags.dx_flags.clone(),
    });
    self.declare(args, output, vec![classes_jar.to_path_buf()], Vec::new())
  }

  /// Rename packages in `classes_jar` according to `rules_file`.
  pub fn jarjar(&mut self, output: &Path, classes_jar: &Path, rules_file: &Path) -> Result<(), PipelineError> {
    let args = RuleArgs::JarJar(JarjarArgs {
      rules_file: rules_file.to_path_buf(),
    });
    self.declare(
      args,
      output,
      vec![classes_jar.to_path_buf()],
      vec![rules_file.to_path_buf()],
    )
  }

  fn declare(
    &mut self,
    args: RuleArgs,
    output: &Path,
    inputs: Vec<PathBuf>,
    implicits: Vec<PathBuf>,
  ) -> Result<(), PipelineError> {
    let stage = args.stage();
    let rules = self.rules;
    let rule = rules.require(stage)?;
    let args = args.into_params();
    rule.check_params(&args)?;

    debug!(
      module = %self.ctx.name,
      rule = %stage,
      output = %output.display(),
      inputs = inputs.len(),
      implicits = implicits.len(),
      "declaring step"
    );

    self.engine.declare(
      rule,
      Invocation {
        stage,
        description: stage.description().to_string(),
        output: output.to_path_buf(),
        inputs,
        implicits,
        args,
      },
    );
    Ok(())
  }
}
