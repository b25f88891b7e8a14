//! Implementation of the `dexrule gen` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use dexrule_lib::engine::NinjaWriter;

use super::Session;
use crate::output::{print_stat, print_success};

/// Write the steps of every module to a Ninja file at `output`.
pub fn cmd_gen(session: &Session, paths: &[PathBuf], output: &Path) -> Result<()> {
  let modules = session.load_modules(paths)?;
  let mut writer = NinjaWriter::new();
  let outputs = session.declare(&mut writer, &modules)?;

  writer
    .write(output)
    .with_context(|| format!("Failed to write ninja file: {}", output.display()))?;

  print_success(&format!(
    "Wrote {} build statement(s) to {}",
    writer.recorder().len(),
    output.display()
  ));
  for (name, out) in &outputs {
    print_stat(name, &out.install_jar().display().to_string());
  }

  Ok(())
}
