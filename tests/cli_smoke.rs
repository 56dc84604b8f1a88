//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn help_lists_every_subcommand() {
    let mut cmd = cargo_bin_cmd!("caravan");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("seed"))
        .stdout(predicate::str::contains("populate"))
        .stdout(predicate::str::contains("cleanup"));
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    let mut cmd = cargo_bin_cmd!("caravan");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn unknown_subcommands_are_rejected() {
    let mut cmd = cargo_bin_cmd!("caravan");
    cmd.arg("teleport");
    cmd.assert().failure();
}
