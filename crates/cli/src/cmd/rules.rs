//! Implementation of the `dexrule rules` command.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use dexrule_lib::rule::{Param, RuleDef, Stage};

use super::Session;
use crate::output::{print_info, print_json, print_stat};

#[derive(Serialize)]
struct RuleSummary<'a> {
  stage: Stage,
  description: &'static str,
  command: String,
  command_deps: &'a [PathBuf],
  params: &'a BTreeSet<Param>,
  rspfile: bool,
}

impl<'a> From<&'a RuleDef> for RuleSummary<'a> {
  fn from(rule: &'a RuleDef) -> Self {
    Self {
      stage: rule.stage,
      description: rule.description(),
      command: rule.command_template(),
      command_deps: &rule.command_deps,
      params: &rule.params,
      rspfile: rule.rspfile,
    }
  }
}

/// Print every registered rule with its tool dependencies and parameters.
pub fn cmd_rules(session: &Session, json: bool) -> Result<()> {
  let rules: Vec<RuleSummary> = session.registry.iter().map(RuleSummary::from).collect();

  if json {
    return print_json(&rules);
  }

  for rule in &rules {
    println!(
      "{} {}",
      rule.stage.if_supports_color(Stream::Stdout, |s| s.bold()),
      rule.description.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    print_stat("command", &rule.command);
    let deps: Vec<String> = rule.command_deps.iter().map(|p| p.display().to_string()).collect();
    print_stat("tools", &deps.join(" "));
    let params: Vec<&str> = rule.params.iter().map(|p| p.as_str()).collect();
    print_stat("params", &params.join(" "));
    if rule.rspfile {
      print_stat("rspfile", "$out.rsp");
    }
    println!();
  }

  if !session.registry.toolchain().has_error_prone() {
    print_info("errorprone is not registered; set error_prone_javac_jar and error_prone_jar to enable it");
  }

  Ok(())
}
