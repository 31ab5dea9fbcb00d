// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Smoke tests for the `car-overlay-store` binary's argument handling.

use assert_cmd::Command;
use predicates::str::contains;

const EXAMPLE_CID: &str = "bafy2bzacea5z7ywqogtuxykqcis76lrhl4fl27bg63firldlry5ml6bbahoy6";

fn cli() -> Command {
    Command::cargo_bin("car-overlay-store").unwrap()
}

#[test]
fn missing_car_argument_fails_with_usage() {
    cli().arg("--cts").arg(EXAMPLE_CID).assert().failure();
}

#[test]
fn missing_cts_fails_with_usage() {
    cli().arg("chain.car").assert().failure();
}

#[test]
fn nonexistent_car_file_fails_with_a_readable_error() {
    cli()
        .arg("--cts")
        .arg(EXAMPLE_CID)
        .arg("/nonexistent/path/does-not-exist.car")
        .assert()
        .failure()
        .stderr(contains("does-not-exist.car"));
}

#[test]
fn malformed_cts_fails_with_a_readable_error() {
    cli()
        .arg("--cts")
        .arg("not-a-cid")
        .arg("/nonexistent/path/does-not-exist.car")
        .assert()
        .failure()
        .stderr(contains("invalid CTS"));
}
