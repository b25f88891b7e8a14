//! Implementation of the `dexrule run` command.
//!
//! Declares modules into a [`LocalRunner`] and executes every step in the
//! current directory. There is no caching: each run executes every step.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::info;

use dexrule_lib::engine::{LocalRunner, RunConfig, RunError};

use super::Session;
use crate::output::{format_duration, print_error, print_stat, print_success, print_warning};

pub fn cmd_run(session: &Session, paths: &[PathBuf], jobs: Option<usize>) -> Result<()> {
  let modules = session.load_modules(paths)?;

  let mut config = RunConfig {
    cwd: std::env::current_dir().context("Failed to read current directory")?,
    ..Default::default()
  };
  if let Some(jobs) = jobs {
    config.parallelism = jobs.max(1);
  }

  let mut runner = LocalRunner::new(config);
  let outputs = session.declare(&mut runner, &modules)?;

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(runner.run()).context("Run failed")?;
  let elapsed = started.elapsed();
  info!(steps = result.total(), elapsed = ?elapsed, "run finished");

  for (output, err) in &result.failed {
    print_error(&format!("{}: {}", output.display(), err));
    if let RunError::CmdFailed { stderr, .. } = err {
      for line in stderr.lines() {
        eprintln!("    {line}");
      }
    }
  }
  for (output, cause) in &result.skipped {
    print_warning(&format!("{} skipped: {} failed", output.display(), cause.display()));
  }

  if !result.is_success() {
    bail!(
      "{} step(s) failed, {} skipped",
      result.failed.len(),
      result.skipped.len()
    );
  }

  print_success(&format!(
    "Built {} step(s) in {}",
    result.succeeded.len(),
    format_duration(elapsed)
  ));
  for (name, out) in &outputs {
    print_stat(name, &out.install_jar().display().to_string());
  }

  Ok(())
}
