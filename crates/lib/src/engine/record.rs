use std::collections::BTreeMap;

use tracing::debug;

use super::{BuildEngine, Invocation};
use crate::rule::{RuleDef, Stage};

/// Keeps every declaration in memory, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
  rules: BTreeMap<Stage, RuleDef>,
  invocations: Vec<Invocation>,
}

impl Recorder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn invocations(&self) -> &[Invocation] {
    &self.invocations
  }

  /// The rule an invocation of `stage` was declared with.
  pub fn rule(&self, stage: Stage) -> Option<&RuleDef> {
    self.rules.get(&stage)
  }

  /// Rules referenced by at least one declaration, in stage order.
  pub fn rules(&self) -> impl Iterator<Item = &RuleDef> {
    self.rules.values()
  }

  /// Declarations of one stage.
  pub fn of_stage(&self, stage: Stage) -> impl Iterator<Item = &Invocation> {
    self.invocations.iter().filter(move |i| i.stage == stage)
  }

  pub fn len(&self) -> usize {
    self.invocations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.invocations.is_empty()
  }
}

impl BuildEngine for Recorder {
  fn declare(&mut self, rule: &RuleDef, invocation: Invocation) {
    debug!(rule = %rule.stage, output = %invocation.output.display(), "declared");
    self.rules.entry(rule.stage).or_insert_with(|| rule.clone());
    self.invocations.push(invocation);
  }
}
