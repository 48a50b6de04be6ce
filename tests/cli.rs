//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn runs_list_on_empty_store_prints_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let tmpdir = tempfile::tempdir()?;
    common::setup_cwd(tmpdir.path())?;

    Command::cargo_bin("wavebenchd")?
        .current_dir(tmpdir.path())
        .arg("runs")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    Ok(())
}

#[test]
fn runs_show_on_unknown_run_id_fails() -> Result<(), Box<dyn std::error::Error>> {
    let tmpdir = tempfile::tempdir()?;
    common::setup_cwd(tmpdir.path())?;

    Command::cargo_bin("wavebenchd")?
        .current_dir(tmpdir.path())
        .args(["runs", "show", "20260101-120000-00001"])
        .assert()
        .failure();

    Ok(())
}

#[test]
fn runs_show_rejects_malformed_run_id() -> Result<(), Box<dyn std::error::Error>> {
    let tmpdir = tempfile::tempdir()?;
    common::setup_cwd(tmpdir.path())?;

    Command::cargo_bin("wavebenchd")?
        .current_dir(tmpdir.path())
        .args(["runs", "show", "not-a-run-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed run id"));

    Ok(())
}

#[test]
fn missing_config_file_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let tmpdir = tempfile::tempdir()?;

    Command::cargo_bin("wavebenchd")?
        .current_dir(tmpdir.path())
        .args(["runs", "list"])
        .assert()
        .failure();

    Ok(())
}

#[test]
fn help_lists_top_level_subcommands() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("wavebenchd")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("runs"));

    Ok(())
}
