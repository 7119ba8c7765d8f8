use std::path::Path;

use super::open_db;

pub fn run(db_path: &Path) -> anyhow::Result<()> {
    let db = open_db(db_path)?;
    db.set_config("version", env!("CARGO_PKG_VERSION"))?;

    println!("Initialized hrdesk database at {}", db_path.display());
    Ok(())
}
