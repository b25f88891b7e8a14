//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Every command runs inside its own temporary directory, so relative module
/// paths and the default `out` directory land there.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Root of the environment, canonicalized.
  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap_or_else(|_| self.temp.path().to_path_buf())
  }

  /// Write a file relative to the temp directory and return its path.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.root().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Copy a fixture into the environment as `relative_path`.
  pub fn fixture(&self, name: &str, relative_path: &str) -> PathBuf {
    self.write_file(relative_path, &fixture_content(name))
  }

  /// Install an executable shell script under `bin/`.
  #[cfg(unix)]
  pub fn install_tool(&self, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = self.write_file(&format!("bin/{name}"), script);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  /// Write a toolchain file from `(key, path)` pairs.
  pub fn toolchain(&self, tools: &[(&str, &Path)]) -> PathBuf {
    let content: String = tools
      .iter()
      .map(|(key, path)| format!("{key} = {:?}\n", path.display().to_string()))
      .collect();
    self.write_file("toolchain.toml", &content)
  }

  /// A `dexrule` command running in this environment.
  pub fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("dexrule");
    cmd.current_dir(self.root()).env_remove("DEXRULE_TOOLCHAIN");
    cmd
  }
}
