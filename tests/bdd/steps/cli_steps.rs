#![allow(deprecated)]
use cucumber::{then, when};
use predicates::prelude::*;

use crate::HrWorld;

/// Run `hrd` with the given args against the world's database.
/// Stores stdout, stderr, and exit code on the world.
fn run_hrd(world: &mut HrWorld, args: &[&str]) {
    let db_path = world
        .db_path
        .as_ref()
        .expect("db_path not set, did you forget 'Given an hrdesk database is initialized'?");

    let output = assert_cmd::Command::cargo_bin("hrd")
        .expect("hrd binary not found")
        .env("HRDESK_DB", db_path)
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .expect("failed to run hrd");

    world.last_stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    world.last_stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    world.last_exit_code = output.status.code().unwrap_or(-1);
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

/// Run `hrd` with whitespace-separated arguments.
#[when(expr = "I run {string}")]
async fn i_run(world: &mut HrWorld, args: String) {
    let args: Vec<&str> = args.split_whitespace().collect();
    run_hrd(world, &args);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the command succeeds")]
async fn the_command_succeeds(world: &mut HrWorld) {
    assert_eq!(
        world.last_exit_code, 0,
        "expected success, got exit {}.\nstdout: {}\nstderr: {}",
        world.last_exit_code, world.last_stdout, world.last_stderr
    );
}

#[then("the command fails")]
async fn the_command_fails(world: &mut HrWorld) {
    assert_ne!(
        world.last_exit_code, 0,
        "expected failure but command succeeded.\nstdout: {}",
        world.last_stdout
    );
}

#[then(expr = "the output contains {string}")]
async fn the_output_contains(world: &mut HrWorld, expected: String) {
    assert!(
        predicate::str::contains(expected.as_str()).eval(world.last_stdout.as_str()),
        "expected stdout to contain {expected:?}, got:\n{}",
        world.last_stdout
    );
}

#[then(expr = "the error output contains {string}")]
async fn the_error_output_contains(world: &mut HrWorld, expected: String) {
    assert!(
        predicate::str::contains(expected.as_str()).eval(world.last_stderr.as_str()),
        "expected stderr to contain {expected:?}, got:\n{}",
        world.last_stderr
    );
}

/// Parse stdout as JSON and check a dotted field path.
#[then(expr = "the JSON output field {string} is {string}")]
async fn the_json_output_field_is(world: &mut HrWorld, path: String, expected: String) {
    let json: serde_json::Value = serde_json::from_str(&world.last_stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON: {e}\n{}", world.last_stdout));
    let actual = crate::steps::http_steps::lookup(&json, &path);
    crate::steps::http_steps::assert_value_matches(&actual, &expected, &path);
}
