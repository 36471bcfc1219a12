use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn prints_version() {
    let exe = env!("CARGO_BIN_EXE_dark-kokan");
    let output = Command::new(exe)
        .arg("--version")
        .output()
        .expect("run dark-kokan --version");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "stdout was: {}",
        stdout.trim()
    );
}

#[test]
fn prints_help() {
    Command::new(env!("CARGO_BIN_EXE_dark-kokan"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dark Kokan"))
        .stdout(predicate::str::contains("--version"));
}
