#![allow(deprecated)]
use cucumber::given;

use crate::HrWorld;

/// Create a fresh database in a temp dir with `hrd init`.
#[given("an hrdesk database is initialized")]
async fn an_hrdesk_database_is_initialized(world: &mut HrWorld) {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("hrdesk.db");

    let output = assert_cmd::Command::cargo_bin("hrd")
        .expect("hrd binary not found")
        .env("HRDESK_DB", &db_path)
        .arg("init")
        .output()
        .expect("failed to run hrd init");

    assert!(
        output.status.success(),
        "hrd init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    world.upload_dir = Some(dir.path().join("upload"));
    world.db_path = Some(db_path);
    // Keep the TempDir alive for the lifetime of the scenario.
    world.db_dir = Some(dir);
}
