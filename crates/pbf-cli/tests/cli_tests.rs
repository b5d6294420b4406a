// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use assert_cmd::Command;
use pbf_core::SimConfig;
use predicates::prelude::*;

fn pbf_sim() -> Command {
    Command::cargo_bin("pbf-sim").unwrap()
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn run_reports_json_summary() {
    let doc = json_stdout(pbf_sim().args(["run", "--frames", "6", "--particles", "30", "--format", "json"]));
    assert_eq!(doc["particles"], 30);
    assert_eq!(doc["frames"], 6);
    assert_eq!(doc["backend"], "tree");
    assert!(doc["query_hits"].is_null());
}

#[test]
fn discrete_grid_run_counts_bounces() {
    let doc = json_stdout(pbf_sim().args([
        "run",
        "--frames",
        "72",
        "--particles",
        "20",
        "--backend",
        "grid",
        "--mode",
        "discrete",
        "--validate-every",
        "8",
        "--format",
        "json",
    ]));
    assert_eq!(doc["mode"], "discrete");
    assert!(doc["wall_bounces"].as_u64().unwrap() > 0);
}

#[test]
fn table_output_names_the_backend() {
    pbf_sim()
        .args(["run", "--frames", "2", "--particles", "10", "--backend", "grid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("grid").and(predicate::str::contains("particles")));
}

#[test]
fn config_prints_loadable_defaults() {
    let output = pbf_sim().arg("config").assert().success().get_output().stdout.clone();
    let config: SimConfig = serde_json::from_slice(&output).unwrap();
    assert_eq!(config, SimConfig::default());
}

#[test]
fn partial_config_file_is_accepted() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "solver_iterations": 3 }}"#).unwrap();
    pbf_sim()
        .args(["run", "--frames", "2", "--particles", "8", "--config"])
        .arg(file.path())
        .assert()
        .success();
}

#[test]
fn invalid_config_names_the_field() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "particle_radius": -1.0 }}"#).unwrap();
    pbf_sim()
        .args(["run", "--frames", "1", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("particle_radius"));
}

#[test]
fn non_positive_fps_is_rejected() {
    pbf_sim()
        .args(["run", "--fps", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--fps"));
}

#[test]
fn query_lists_the_seeded_row() {
    let doc = json_stdout(pbf_sim().args([
        "query",
        "--frames",
        "0",
        "--particles",
        "15",
        "--backend",
        "grid",
        "--rect",
        "0",
        "9",
        "30",
        "11",
        "--format",
        "json",
    ]));
    let hits = doc["query_hits"].as_array().unwrap();
    assert_eq!(hits.len(), 15);
}

#[test]
fn query_accepts_negative_corners() {
    let doc = json_stdout(pbf_sim().args([
        "query",
        "--frames",
        "0",
        "--particles",
        "15",
        "--rect",
        "-5",
        "-5",
        "-1",
        "-1",
        "--format",
        "json",
    ]));
    assert_eq!(doc["query_hits"].as_array().unwrap().len(), 0);
}
