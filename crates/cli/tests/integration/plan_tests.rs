//! Plan command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn plan_library_compiles_once() {
  let env = TestEnv::new();
  let module = env.fixture("library.toml", "okio.toml");

  env
    .cmd()
    .arg("plan")
    .arg(&module)
    .assert()
    .success()
    .stdout(predicate::str::contains("javac out/okio/classes-compiled.jar"))
    .stdout(predicate::str::contains("-classpath prebuilts/junit.jar"))
    .stdout(predicate::str::contains(" dx out/").not())
    .stdout(predicate::str::contains("1 step(s) across 1 module(s)"));
}

#[test]
fn plan_json_lists_app_steps_in_order() {
  let env = TestEnv::new();
  let module = env.fixture("app.toml", "launcher.toml");
  env.write_file("res/strings.txt", "hello");

  let output = env.cmd().arg("plan").arg("--json").arg(&module).output().unwrap();
  assert!(output.status.success());

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let stages: Vec<&str> = plan["steps"]
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["stage"].as_str().unwrap())
    .collect();
  assert_eq!(stages, vec!["javac", "jar", "combineJar", "jarjar", "desugar", "dx"]);

  let dx = &plan["steps"][5];
  assert_eq!(dx["output"], "out/launcher/dex/launcher.jar");
  assert_eq!(dx["inputs"][0], "out/launcher/desugar/classes.jar");
  assert!(dx["command"].as_str().unwrap().contains("--multi-dex"));
  assert_eq!(dx["hash"].as_str().unwrap().len(), 20);

  let jar = &plan["steps"][1];
  assert_eq!(jar["implicits"], serde_json::json!(["res/strings.txt"]));

  assert_eq!(plan["modules"][0]["name"], "launcher");
  assert_eq!(plan["modules"][0]["dex_jar"], "out/launcher/dex/launcher.jar");
}

#[test]
fn plan_hashes_are_stable() {
  let env = TestEnv::new();
  let module = env.fixture("app.toml", "launcher.toml");
  env.write_file("res/strings.txt", "hello");

  let run = || {
    let output = env.cmd().arg("plan").arg("--json").arg(&module).output().unwrap();
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    plan["steps"]
      .as_array()
      .unwrap()
      .iter()
      .map(|s| s["hash"].as_str().unwrap().to_string())
      .collect::<Vec<_>>()
  };

  assert_eq!(run(), run());
}

#[test]
fn plan_respects_out_dir() {
  let env = TestEnv::new();
  let module = env.fixture("library.toml", "okio.toml");

  env
    .cmd()
    .args(["plan", "--out-dir", "build"])
    .arg(&module)
    .assert()
    .success()
    .stdout(predicate::str::contains("build/okio/classes-compiled.jar"));
}

#[test]
fn plan_rejects_two_system_module_images() {
  let env = TestEnv::new();
  let module = env.fixture("java9_two_images.toml", "broken.toml");

  env
    .cmd()
    .arg("plan")
    .arg(&module)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to declare module broken"))
    .stderr(predicate::str::contains("more than one system module"));
}

#[test]
fn plan_errorprone_without_jars_fails() {
  let env = TestEnv::new();
  let module = env.fixture("errorprone.toml", "checked.toml");

  env
    .cmd()
    .arg("plan")
    .arg(&module)
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing external analysis component"));
}

#[test]
fn plan_errorprone_with_jars_checks_before_compile() {
  let env = TestEnv::new();
  let module = env.fixture("errorprone.toml", "checked.toml");
  let javac_jar = env.write_file("prebuilts/errorprone/javac.jar", "");
  let ep_jar = env.write_file("prebuilts/errorprone/error_prone.jar", "");
  let toolchain = env.toolchain(&[
    ("error_prone_javac_jar", javac_jar.as_path()),
    ("error_prone_jar", ep_jar.as_path()),
  ]);

  let output = env
    .cmd()
    .arg("--toolchain")
    .arg(&toolchain)
    .args(["plan", "--json"])
    .arg(&module)
    .output()
    .unwrap();
  assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(plan["steps"][0]["stage"], "errorprone");
  assert_eq!(plan["steps"][1]["stage"], "javac");
  let implicits = plan["steps"][1]["implicits"].as_array().unwrap();
  assert!(implicits.iter().any(|p| p == "out/checked/classes-errorprone.jar"));
}

#[test]
fn plan_missing_resource_dir_fails() {
  let env = TestEnv::new();
  let module = env.fixture("app.toml", "launcher.toml");

  env
    .cmd()
    .arg("plan")
    .arg(&module)
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to list resource directory res"));
}

#[test]
fn plan_rejects_duplicate_module_names() {
  let env = TestEnv::new();
  let first = env.fixture("library.toml", "okio.toml");
  let second = env.fixture("library.toml", "okio-copy.toml");

  env
    .cmd()
    .arg("plan")
    .arg(&first)
    .arg(&second)
    .assert()
    .failure()
    .stderr(predicate::str::contains("module okio is defined by both"));
}

#[test]
fn plan_rejects_unknown_module_keys() {
  let env = TestEnv::new();
  let module = env.fixture("unknown_key.toml", "typo.toml");

  env
    .cmd()
    .arg("plan")
    .arg(&module)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load module"));
}
