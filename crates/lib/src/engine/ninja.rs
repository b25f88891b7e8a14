//! Ninja build file output.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::{BuildEngine, Invocation, Recorder};
use crate::placeholder::{Placeholder, PlaceholderError, Segment};
use crate::rule::{RuleDef, Stage};

#[derive(Debug, Error)]
pub enum NinjaError {
  #[error("rule {stage} cannot be written as a ninja rule: {source}")]
  Command {
    stage: Stage,
    #[source]
    source: PlaceholderError,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Collects declarations and writes them as a Ninja file.
#[derive(Debug, Default)]
pub struct NinjaWriter {
  recorder: Recorder,
}

impl NinjaWriter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn recorder(&self) -> &Recorder {
    &self.recorder
  }

  /// Render the file: one `rule` block per used rule, then one `build` per declaration.
  pub fn render(&self) -> Result<String, NinjaError> {
    let mut out = String::from("# Generated by dexrule. Do not edit.\n\nninja_required_version = 1.7\n");

    for rule in self.recorder.rules() {
      let command = ninja_command(&rule.command).map_err(|source| NinjaError::Command {
        stage: rule.stage,
        source,
      })?;

      let _ = writeln!(out, "\nrule {}", rule.name());
      let _ = writeln!(out, "  command = {command}");
      let _ = writeln!(out, "  description = {} $out", rule.description());
      if rule.rspfile {
        let _ = writeln!(out, "  rspfile = $out.rsp");
        let _ = writeln!(out, "  rspfile_content = $in");
      }
    }

    for invocation in self.recorder.invocations() {
      // Declared rules are always recorded alongside their invocations
      let command_deps = self
        .recorder
        .rule(invocation.stage)
        .map(|r| r.command_deps.as_slice())
        .unwrap_or_default();
      render_build(&mut out, invocation, command_deps);
    }

    Ok(out)
  }

  /// Render and write to `path`.
  pub fn write(&self, path: &Path) -> Result<(), NinjaError> {
    let content = self.render()?;
    std::fs::write(path, content).map_err(|source| NinjaError::Write {
      path: path.to_path_buf(),
      source,
    })?;
    info!(path = %path.display(), builds = self.recorder.len(), "wrote ninja file");
    Ok(())
  }
}

impl BuildEngine for NinjaWriter {
  fn declare(&mut self, rule: &RuleDef, invocation: Invocation) {
    self.recorder.declare(rule, invocation);
  }
}

fn render_build(out: &mut String, invocation: &Invocation, command_deps: &[PathBuf]) {
  let _ = write!(
    out,
    "\nbuild {}: {}",
    escape_path(&invocation.output),
    invocation.stage.as_str()
  );
  for input in &invocation.inputs {
    let _ = write!(out, " {}", escape_path(input));
  }

  let mut seen = BTreeSet::new();
  let implicits: Vec<&PathBuf> = invocation
    .implicits
    .iter()
    .chain(command_deps)
    .filter(|p| seen.insert(*p))
    .collect();
  if !implicits.is_empty() {
    out.push_str(" |");
    for dep in implicits {
      let _ = write!(out, " {}", escape_path(dep));
    }
  }
  out.push('\n');

  let _ = writeln!(out, "  description = {} $out", escape_value(&invocation.description));
  for (param, value) in &invocation.args {
    let _ = writeln!(out, "  {param} = {}", escape_value(value));
  }
}

/// Translate a bound command into Ninja variable syntax.
fn ninja_command(segments: &[Segment]) -> Result<String, PlaceholderError> {
  let mut out = String::new();
  for segment in segments {
    match segment {
      Segment::Literal(s) => out.push_str(&escape_value(s)),
      Segment::Placeholder(Placeholder::In) => out.push_str("$in"),
      Segment::Placeholder(Placeholder::Out) => out.push_str("$out"),
      Segment::Placeholder(Placeholder::RspFile) => out.push_str("$out.rsp"),
      Segment::Placeholder(Placeholder::Param(p)) => {
        let _ = write!(out, "${{{p}}}");
      }
      Segment::Placeholder(Placeholder::Config(var)) => return Err(PlaceholderError::UnresolvedConfig(*var)),
    }
  }
  Ok(out)
}

/// Escape a variable value. Newlines would end the binding, so they become spaces.
fn escape_value(s: &str) -> String {
  s.replace('$', "$$").replace('\n', " ")
}

/// Escape a path in a `build` line.
fn escape_path(path: &Path) -> String {
  let s = path.display().to_string();
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '$' | ' ' | ':' => {
        out.push('$');
        out.push(c);
      }
      '\n' => out.push(' '),
      _ => out.push(c),
    }
  }
  out
}
