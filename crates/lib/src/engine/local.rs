//! Local execution of declared steps.
//!
//! Steps run through `sh -c` in dependency order. A step depends on another
//! when one of its inputs or implicit dependencies is the other's output.
//! Independent steps form waves that run concurrently, bounded by a
//! semaphore. There is no caching: every step runs on every call.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use super::{BuildEngine, Invocation, Recorder};
use crate::placeholder::PlaceholderError;
use crate::rule::RuleDef;
use crate::util::hash::Hashable;

/// Errors from planning or running steps.
#[derive(Debug, Error)]
pub enum RunError {
  #[error("cannot render command for {output}: {source}")]
  Command {
    output: PathBuf,
    #[source]
    source: PlaceholderError,
  },

  #[error("{output} is produced by more than one step")]
  DuplicateOutput { output: PathBuf },

  #[error("dependency cycle detected")]
  CycleDetected,

  #[error("command for {output} failed with exit code {code:?}")]
  CmdFailed {
    output: PathBuf,
    code: Option<i32>,
    stderr: String,
  },

  #[error("io error for {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("step for {0} was cancelled")]
  Cancelled(PathBuf),

  #[error("step for {0} panicked")]
  Panicked(PathBuf),
}

/// Outcome of a run, keyed by step output.
#[derive(Debug, Default)]
pub struct RunResult {
  pub succeeded: Vec<PathBuf>,
  pub failed: Vec<(PathBuf, RunError)>,
  /// Steps not run, each with the failed output it depended on.
  pub skipped: Vec<(PathBuf, PathBuf)>,
}

impl RunResult {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  pub fn total(&self) -> usize {
    self.succeeded.len() + self.failed.len() + self.skipped.len()
  }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
  /// Maximum number of steps running at once.
  pub parallelism: usize,
  /// Working directory of every command; relative paths resolve against it.
  pub cwd: PathBuf,
}

impl Default for RunConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      cwd: PathBuf::from("."),
    }
  }
}

fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Collects declarations, then executes them with [`run`](Self::run).
#[derive(Debug, Default)]
pub struct LocalRunner {
  recorder: Recorder,
  config: RunConfig,
}

/// A step ready to spawn.
struct Step {
  output: PathBuf,
  command: String,
  rspfile: Option<(PathBuf, String)>,
}

/// Outcomes collected while a run progresses.
struct RunState<'a> {
  steps: &'a [Step],
  result: RunResult,
  /// Steps that failed or were skipped; their dependents never run.
  failed: HashSet<NodeIndex>,
}

impl<'a> RunState<'a> {
  fn new(steps: &'a [Step]) -> Self {
    Self {
      steps,
      result: RunResult::default(),
      failed: HashSet::new(),
    }
  }

  fn output(&self, idx: NodeIndex) -> PathBuf {
    self.steps[idx.index()].output.clone()
  }

  fn skip(&mut self, idx: NodeIndex, dep: NodeIndex) {
    let output = self.output(idx);
    let dep_output = self.output(dep);
    warn!(
      output = %output.display(),
      failed_dep = %dep_output.display(),
      "skipping step due to failed dependency"
    );
    self.failed.insert(idx);
    self.result.skipped.push((output, dep_output));
  }

  /// Record a finished task. A task that panicked counts as a failed step.
  fn settle(
    &mut self,
    joined: Result<(NodeIndex, Result<(), RunError>), JoinError>,
    tasks: &HashMap<task::Id, NodeIndex>,
  ) {
    let (idx, outcome) = match joined {
      Ok(done) => done,
      Err(e) => match tasks.get(&e.id()) {
        Some(&idx) => (idx, Err(RunError::Panicked(self.output(idx)))),
        None => {
          error!(error = %e, "unknown step task failed");
          return;
        }
      },
    };

    let output = self.output(idx);
    match outcome {
      Ok(()) => {
        info!(output = %output.display(), "step succeeded");
        self.result.succeeded.push(output);
      }
      Err(e) => {
        error!(output = %output.display(), error = %e, "step failed");
        self.failed.insert(idx);
        self.result.failed.push((output, e));
      }
    }
  }
}

impl LocalRunner {
  pub fn new(config: RunConfig) -> Self {
    Self {
      recorder: Recorder::new(),
      config,
    }
  }

  pub fn recorder(&self) -> &Recorder {
    &self.recorder
  }

  /// Execute every declared step.
  ///
  /// # Errors
  ///
  /// Planning errors (an unrenderable command, two steps with one output,
  /// a cycle) abort before anything runs. Step failures do not; they land
  /// in [`RunResult::failed`] and their dependents in [`RunResult::skipped`].
  pub async fn run(&self) -> Result<RunResult, RunError> {
    let invocations = self.recorder.invocations();
    info!(steps = invocations.len(), "starting local run");

    let steps = invocations
      .iter()
      .map(|inv| self.prepare(inv))
      .collect::<Result<Vec<_>, _>>()?;
    let (graph, waves) = plan(invocations)?;

    info!(wave_count = waves.len(), "computed execution waves");

    let mut state = RunState::new(&steps);
    let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));

    for (wave_idx, wave) in waves.iter().enumerate() {
      debug!(wave = wave_idx, steps = wave.len(), "executing wave");

      let mut ready = Vec::new();
      for &idx in wave {
        let failed_dep = graph
          .neighbors_directed(idx, Direction::Incoming)
          .find(|dep| state.failed.contains(dep));

        match failed_dep {
          Some(dep) => state.skip(idx, dep),
          None => ready.push(idx),
        }
      }

      let mut join_set = JoinSet::new();
      let mut tasks: HashMap<task::Id, NodeIndex> = HashMap::new();
      for idx in ready {
        let step = &steps[idx.index()];
        let output = step.output.clone();
        let command = step.command.clone();
        let rspfile = step.rspfile.clone();
        let cwd = self.config.cwd.clone();
        let semaphore = semaphore.clone();

        let handle = join_set.spawn(async move {
          let outcome = match semaphore.acquire().await {
            Ok(_permit) => execute_step(&output, &command, rspfile.as_ref(), &cwd).await,
            Err(_) => Err(RunError::Cancelled(output.clone())),
          };
          (idx, outcome)
        });
        tasks.insert(handle.id(), idx);
      }

      while let Some(joined) = join_set.join_next().await {
        state.settle(joined, &tasks);
      }
    }

    let result = state.result;
    info!(
      succeeded = result.succeeded.len(),
      failed = result.failed.len(),
      skipped = result.skipped.len(),
      "local run complete"
    );

    Ok(result)
  }

  fn prepare(&self, invocation: &Invocation) -> Result<Step, RunError> {
    let output = invocation.output.clone();
    let rule = self
      .recorder
      .rule(invocation.stage)
      .ok_or_else(|| RunError::Command {
        output: output.clone(),
        source: PlaceholderError::Unresolved(invocation.stage.to_string()),
      })?;
    let command = invocation.command(rule).map_err(|source| RunError::Command {
      output: output.clone(),
      source,
    })?;

    if let Ok(hash) = invocation.compute_hash() {
      debug!(output = %output.display(), hash = %hash, "prepared step");
    }

    let rspfile = rule
      .rspfile
      .then(|| (invocation.rspfile(), invocation.inputs_joined()));

    Ok(Step {
      output,
      command,
      rspfile,
    })
  }
}

impl BuildEngine for LocalRunner {
  fn declare(&mut self, rule: &RuleDef, invocation: Invocation) {
    self.recorder.declare(rule, invocation);
  }
}

/// Build the dependency graph (node index == invocation index) and its waves.
fn plan(invocations: &[Invocation]) -> Result<(DiGraph<(), ()>, Vec<Vec<NodeIndex>>), RunError> {
  let mut graph: DiGraph<(), ()> = DiGraph::new();
  let mut producers: HashMap<&Path, NodeIndex> = HashMap::new();

  for invocation in invocations {
    let idx = graph.add_node(());
    if producers.insert(&invocation.output, idx).is_some() {
      return Err(RunError::DuplicateOutput {
        output: invocation.output.clone(),
      });
    }
  }

  for (i, invocation) in invocations.iter().enumerate() {
    let consumer = NodeIndex::new(i);
    let mut deps: HashSet<NodeIndex> = HashSet::new();
    for path in invocation.inputs.iter().chain(&invocation.implicits) {
      // Paths nobody produces are sources
      if let Some(&producer) = producers.get(path.as_path())
        && producer != consumer
        && deps.insert(producer)
      {
        graph.add_edge(producer, consumer, ());
      }
    }
  }

  toposort(&graph, None).map_err(|_| RunError::CycleDetected)?;

  // Kahn's algorithm, one level per wave
  let mut in_degree: HashMap<NodeIndex, usize> = graph
    .node_indices()
    .map(|idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
    .collect();
  let mut remaining: Vec<NodeIndex> = graph.node_indices().collect();
  let mut waves = Vec::new();

  while !remaining.is_empty() {
    let (ready, rest): (Vec<NodeIndex>, Vec<NodeIndex>) = remaining.into_iter().partition(|idx| in_degree[idx] == 0);
    if ready.is_empty() {
      return Err(RunError::CycleDetected);
    }
    for &idx in &ready {
      for next in graph.neighbors_directed(idx, Direction::Outgoing) {
        if let Some(deg) = in_degree.get_mut(&next) {
          *deg = deg.saturating_sub(1);
        }
      }
    }
    waves.push(ready);
    remaining = rest;
  }

  Ok((graph, waves))
}

async fn execute_step(
  output: &Path,
  command: &str,
  rspfile: Option<&(PathBuf, String)>,
  cwd: &Path,
) -> Result<(), RunError> {
  let io_err = |path: &Path| {
    let path = path.to_path_buf();
    move |source: std::io::Error| RunError::Io { path, source }
  };

  let abs_output = cwd.join(output);
  if let Some(parent) = abs_output.parent() {
    tokio::fs::create_dir_all(parent).await.map_err(io_err(parent))?;
  }
  if let Some((path, content)) = rspfile {
    let abs = cwd.join(path);
    tokio::fs::write(&abs, content).await.map_err(io_err(abs.as_path()))?;
  }

  debug!(cmd = %command, "spawning process");
  let out = Command::new("/bin/sh")
    .arg("-c")
    .arg(command)
    .current_dir(cwd)
    .output()
    .await
    .map_err(io_err(cwd))?;

  if !out.status.success() {
    let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    return Err(RunError::CmdFailed {
      output: output.to_path_buf(),
      code: out.status.code(),
      stderr,
    });
  }

  Ok(())
}

#[cfg(all(test, unix))]
mod tests {
  use std::collections::{BTreeMap, BTreeSet};

  use tempfile::TempDir;

  use super::*;
  use crate::placeholder;
  use crate::rule::{Param, Stage};

  fn rule(stage: Stage, command: &str, rspfile: bool) -> RuleDef {
    let command = placeholder::parse(command).unwrap();
    let params = placeholder::placeholders(&command)
      .filter_map(|p| match p {
        placeholder::Placeholder::Param(param) => Some(*param),
        _ => None,
      })
      .collect::<BTreeSet<_>>();
    RuleDef {
      stage,
      command,
      command_deps: Vec::new(),
      params,
      rspfile,
    }
  }

  fn invocation(stage: Stage, output: &str, inputs: &[&str]) -> Invocation {
    Invocation {
      stage,
      description: stage.description().to_string(),
      output: PathBuf::from(output),
      inputs: inputs.iter().map(PathBuf::from).collect(),
      implicits: Vec::new(),
      args: BTreeMap::new(),
    }
  }

  fn runner(dir: &TempDir) -> LocalRunner {
    LocalRunner::new(RunConfig {
      parallelism: 2,
      cwd: dir.path().to_path_buf(),
    })
  }

  #[test]
  fn waves_follow_dependencies() {
    let invocations = vec![
      invocation(Stage::Jar, "b.jar", &["a.jar"]),
      invocation(Stage::Javac, "a.jar", &["A.java"]),
      invocation(Stage::Jar, "c.jar", &["C.java"]),
    ];

    let (_, waves) = plan(&invocations).unwrap();

    assert_eq!(waves.len(), 2);
    let first: HashSet<usize> = waves[0].iter().map(|i| i.index()).collect();
    assert_eq!(first, HashSet::from([1, 2]));
    assert_eq!(waves[1], vec![NodeIndex::new(0)]);
  }

  #[test]
  fn implicit_deps_create_edges() {
    let mut consumer = invocation(Stage::Javac, "classes.jar", &["A.java"]);
    consumer.implicits.push(PathBuf::from("ep.jar"));
    let invocations = vec![consumer, invocation(Stage::ErrorProne, "ep.jar", &["A.java"])];

    let (graph, waves) = plan(&invocations).unwrap();

    assert_eq!(waves.len(), 2);
    assert!(graph.contains_edge(NodeIndex::new(1), NodeIndex::new(0)));
  }

  #[test]
  fn duplicate_output_rejected() {
    let invocations = vec![
      invocation(Stage::Jar, "x.jar", &[]),
      invocation(Stage::CombineJar, "x.jar", &[]),
    ];
    assert!(matches!(plan(&invocations), Err(RunError::DuplicateOutput { .. })));
  }

  #[test]
  fn cycle_rejected() {
    let invocations = vec![
      invocation(Stage::Jar, "a.jar", &["b.jar"]),
      invocation(Stage::Jar, "b.jar", &["a.jar"]),
    ];
    assert!(matches!(plan(&invocations), Err(RunError::CycleDetected)));
  }

  #[tokio::test]
  async fn runs_chain_and_writes_response_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("A.java"), "class A {}").unwrap();

    let mut runner = runner(&dir);
    runner.declare(
      &rule(Stage::Javac, "cp $(cat $${rspfile}) $${out}", true),
      invocation(Stage::Javac, "out/a.jar", &["A.java"]),
    );
    runner.declare(
      &rule(Stage::Jar, "cat $${in} > $${out}", false),
      invocation(Stage::Jar, "out/b.jar", &["out/a.jar"]),
    );

    let result = runner.run().await.unwrap();

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.succeeded.len(), 2);
    assert_eq!(std::fs::read_to_string(dir.path().join("out/a.jar.rsp")).unwrap(), "A.java");
    assert_eq!(std::fs::read_to_string(dir.path().join("out/b.jar")).unwrap(), "class A {}");
  }

  #[tokio::test]
  async fn input_paths_with_spaces() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("my res")).unwrap();
    std::fs::write(dir.path().join("my res/strings.txt"), "hello").unwrap();

    let mut runner = runner(&dir);
    runner.declare(
      &rule(Stage::Jar, "cat $${in} > $${out}", false),
      invocation(Stage::Jar, "out/my app/res.jar", &["my res/strings.txt"]),
    );

    let result = runner.run().await.unwrap();

    assert!(result.is_success(), "{result:?}");
    assert_eq!(std::fs::read_to_string(dir.path().join("out/my app/res.jar")).unwrap(), "hello");
  }

  #[tokio::test]
  async fn failure_skips_dependents_only() {
    let dir = TempDir::new().unwrap();

    let mut runner = runner(&dir);
    runner.declare(
      &rule(Stage::Javac, "echo broken >&2; exit 3", false),
      invocation(Stage::Javac, "a.jar", &[]),
    );
    runner.declare(
      &rule(Stage::Jar, "touch $${out}", false),
      invocation(Stage::Jar, "b.jar", &["a.jar"]),
    );
    runner.declare(
      &rule(Stage::Jar, "touch $${out}", false),
      invocation(Stage::Jar, "c.jar", &[]),
    );

    let result = runner.run().await.unwrap();

    assert_eq!(result.succeeded, vec![PathBuf::from("c.jar")]);
    assert_eq!(result.failed.len(), 1);
    let (output, err) = &result.failed[0];
    assert_eq!(output, &PathBuf::from("a.jar"));
    assert!(matches!(err, RunError::CmdFailed { code: Some(3), stderr, .. } if stderr == "broken"));
    assert_eq!(result.skipped, vec![(PathBuf::from("b.jar"), PathBuf::from("a.jar"))]);
    assert_eq!(result.total(), 3);
  }

  fn crash() -> (NodeIndex, Result<(), RunError>) {
    panic!("step task died")
  }

  #[tokio::test]
  async fn panicked_step_counts_as_failed() {
    let steps = vec![Step {
      output: PathBuf::from("a.jar"),
      command: "true".to_string(),
      rspfile: None,
    }];
    let idx = NodeIndex::new(0);

    let mut join_set: JoinSet<(NodeIndex, Result<(), RunError>)> = JoinSet::new();
    let handle = join_set.spawn(async { crash() });
    let tasks = HashMap::from([(handle.id(), idx)]);
    let joined = join_set.join_next().await.unwrap();
    assert!(joined.is_err());

    let mut state = RunState::new(&steps);
    state.settle(joined, &tasks);

    assert!(state.failed.contains(&idx));
    assert!(matches!(&state.result.failed[..], [(output, RunError::Panicked(_))] if output == &PathBuf::from("a.jar")));
    assert!(!state.result.is_success());
  }

  #[tokio::test]
  async fn missing_param_fails_before_running() {
    let dir = TempDir::new().unwrap();

    let mut runner = runner(&dir);
    runner.declare(
      &rule(Stage::JarJar, "touch $${param:rulesFile} $${out}", false),
      invocation(Stage::JarJar, "x.jar", &[]),
    );

    let err = runner.run().await.unwrap_err();
    assert!(matches!(
      err,
      RunError::Command {
        source: PlaceholderError::UnresolvedParam(Param::RulesFile),
        ..
      }
    ));
    assert!(!dir.path().join("x.jar").exists());
  }
}
