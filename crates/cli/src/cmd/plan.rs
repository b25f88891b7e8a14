//! Implementation of the `dexrule plan` command.
//!
//! Declares modules into a [`Recorder`] and prints each step with its
//! content hash and fully rendered command. Nothing is written or run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use dexrule_lib::engine::{Invocation, Recorder};
use dexrule_lib::pipeline::ModuleOutputs;
use dexrule_lib::util::hash::{Hashable, ObjectHash};

use super::Session;
use crate::output::{print_json, print_stat, print_success, symbols, truncate_hash};

#[derive(Serialize)]
struct PlannedStep<'a> {
  hash: ObjectHash,
  #[serde(flatten)]
  invocation: &'a Invocation,
  command: String,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
  modules: Vec<PlannedModule<'a>>,
  steps: Vec<PlannedStep<'a>>,
}

#[derive(Serialize)]
struct PlannedModule<'a> {
  name: &'a str,
  #[serde(flatten)]
  outputs: &'a ModuleOutputs,
}

pub fn cmd_plan(session: &Session, paths: &[PathBuf], json: bool, verbose: bool) -> Result<()> {
  let modules = session.load_modules(paths)?;
  let mut recorder = Recorder::new();
  let outputs = session.declare(&mut recorder, &modules)?;

  let mut steps = Vec::with_capacity(recorder.len());
  for invocation in recorder.invocations() {
    let hash = invocation
      .compute_hash()
      .with_context(|| format!("Failed to hash step for {}", invocation.output.display()))?;
    let command = match recorder.rule(invocation.stage) {
      Some(rule) => invocation
        .command(rule)
        .with_context(|| format!("Failed to render command for {}", invocation.output.display()))?,
      None => String::new(),
    };
    steps.push(PlannedStep {
      hash,
      invocation,
      command,
    });
  }

  if json {
    let modules = outputs
      .iter()
      .map(|(name, outputs)| PlannedModule { name, outputs })
      .collect();
    return print_json(&PlanOutput { modules, steps });
  }

  for step in &steps {
    println!(
      "{} {} {} {}",
      symbols::ADD.if_supports_color(Stream::Stdout, |s| s.green()),
      truncate_hash(&step.hash.0).if_supports_color(Stream::Stdout, |s| s.dimmed()),
      step.invocation.stage.if_supports_color(Stream::Stdout, |s| s.bold()),
      step.invocation.output.display()
    );
    if verbose {
      for input in &step.invocation.inputs {
        print_stat("in", &input.display().to_string());
      }
      for dep in &step.invocation.implicits {
        print_stat("dep", &dep.display().to_string());
      }
    }
    print_stat("command", &step.command);
  }

  println!();
  for (name, out) in &outputs {
    print_stat(name, &out.install_jar().display().to_string());
  }
  print_success(&format!("{} step(s) across {} module(s)", steps.len(), outputs.len()));

  Ok(())
}
