//! Gen command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn gen_writes_ninja_file() {
  let env = TestEnv::new();
  let module = env.fixture("app.toml", "launcher.toml");
  env.write_file("res/strings.txt", "hello");

  env
    .cmd()
    .arg("gen")
    .arg(&module)
    .assert()
    .success()
    .stdout(predicate::str::contains("Wrote 6 build statement(s) to build.ninja"));

  let ninja = std::fs::read_to_string(env.root().join("build.ninja")).unwrap();
  assert!(ninja.starts_with("# Generated by dexrule"));
  for rule in ["javac", "jar", "combineJar", "jarjar", "desugar", "dx"] {
    assert!(ninja.contains(&format!("\nrule {rule}\n")), "missing rule {rule}");
  }
  assert!(ninja.contains("\nbuild out/launcher/dex/launcher.jar: dx out/launcher/desugar/classes.jar"));
  assert!(ninja.contains("  rspfile = $out.rsp\n"));
  assert!(ninja.contains("\nbuild out/launcher/res.jar: jar | res/strings.txt "));
  assert!(!ninja.contains("errorprone"));
}

#[test]
fn gen_custom_output_path() {
  let env = TestEnv::new();
  let module = env.fixture("library.toml", "okio.toml");

  env
    .cmd()
    .arg("gen")
    .arg(&module)
    .args(["-o", "ninja/okio.ninja"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to write ninja file"));

  std::fs::create_dir_all(env.root().join("ninja")).unwrap();
  env
    .cmd()
    .arg("gen")
    .arg(&module)
    .args(["-o", "ninja/okio.ninja"])
    .assert()
    .success();

  let ninja = std::fs::read_to_string(env.root().join("ninja/okio.ninja")).unwrap();
  assert!(ninja.contains("\nbuild out/okio/classes-compiled.jar: javac src/okio/Buffer.java src/okio/Source.java"));
}
