use std::path::Path;

use super::{open_db, print_json, truncate};

pub fn run(db_path: &Path, json: bool) -> anyhow::Result<()> {
    let db = open_db(db_path)?;
    let users = db.list_users()?;

    if json {
        return print_json(&users);
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("{:<36} {:<24} {:<30} DESIGNATION", "ID", "NAME", "EMAIL");
    println!("{}", "-".repeat(104));
    for u in &users {
        println!(
            "{:<36} {:<24} {:<30} {}",
            u.id,
            truncate(&u.full_name(), 24),
            truncate(&u.email, 30),
            u.designation,
        );
    }
    Ok(())
}
