//! Run command integration tests, with shell scripts standing in for the tools.
#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

// Writes one empty .class per source listed in the response file.
const FAKE_JAVAC: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -d) out="$2"; shift 2;;
    @*) rsp="${1#@}"; shift;;
    *) shift;;
  esac
done
for src in $(cat "$rsp"); do
  touch "$out/$(basename "$src" .java).class"
done
"#;

// An "archive" is a text file listing its entries.
const FAKE_SOONG_ZIP: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2;;
    -C) base="$2"; shift 2;;
    *) shift;;
  esac
done
(cd "$base" && find . -type f | sed 's|^\./||' | sort) > "$out"
"#;

const FAILING_JAVAC: &str = r#"#!/bin/sh
echo "error: cannot find symbol" >&2
exit 3
"#;

#[test]
fn run_builds_library() {
  let env = TestEnv::new();
  let module = env.fixture("library.toml", "okio.toml");
  let javac = env.install_tool("javac", FAKE_JAVAC);
  let soong_zip = env.install_tool("soong_zip", FAKE_SOONG_ZIP);
  let toolchain = env.toolchain(&[("javac", javac.as_path()), ("soong_zip", soong_zip.as_path())]);

  env
    .cmd()
    .arg("--toolchain")
    .arg(&toolchain)
    .arg("run")
    .arg(&module)
    .assert()
    .success()
    .stdout(predicate::str::contains("Built 1 step(s)"));

  let jar = std::fs::read_to_string(env.root().join("out/okio/classes-compiled.jar")).unwrap();
  assert_eq!(jar.lines().collect::<Vec<_>>(), vec!["Buffer.class", "Source.class"]);
  let rsp = std::fs::read_to_string(env.root().join("out/okio/classes-compiled.jar.rsp")).unwrap();
  assert_eq!(rsp.trim(), "src/okio/Buffer.java src/okio/Source.java");
}

#[test]
fn run_reports_failed_step() {
  let env = TestEnv::new();
  let module = env.fixture("library.toml", "okio.toml");
  let javac = env.install_tool("javac", FAILING_JAVAC);
  let toolchain = env.toolchain(&[("javac", javac.as_path())]);

  env
    .cmd()
    .arg("--toolchain")
    .arg(&toolchain)
    .args(["run", "-j", "1"])
    .arg(&module)
    .assert()
    .failure()
    .stderr(predicate::str::contains("cannot find symbol"))
    .stderr(predicate::str::contains("1 step(s) failed, 0 skipped"));
}

#[test]
fn run_reads_toolchain_from_env() {
  let env = TestEnv::new();
  let module = env.fixture("library.toml", "okio.toml");
  let javac = env.install_tool("javac", FAILING_JAVAC);
  let toolchain = env.toolchain(&[("javac", javac.as_path())]);

  env
    .cmd()
    .env("DEXRULE_TOOLCHAIN", &toolchain)
    .arg("run")
    .arg(&module)
    .assert()
    .failure()
    .stderr(predicate::str::contains("cannot find symbol"));
}
