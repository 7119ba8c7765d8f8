use std::path::Path;

use hrdesk::db::counts_to_map;

use super::{format_priority, format_status, open_db, print_json};

pub fn run(db_path: &Path, json: bool) -> anyhow::Result<()> {
    let db = open_db(db_path)?;

    let users = db.user_count()?;
    let tasks_by_status = db.task_count_by_status()?;
    let tasks_by_priority = db.task_count_by_priority()?;
    let meetings_by_status = db.meeting_count_by_status()?;

    if json {
        let out = serde_json::json!({
            "users": users,
            "tasks_by_status": counts_to_map(&tasks_by_status),
            "tasks_by_priority": counts_to_map(&tasks_by_priority),
            "meetings_by_status": counts_to_map(&meetings_by_status),
        });
        return print_json(&out);
    }

    println!("Users: {users}");

    section("Tasks by Status", &tasks_by_status, format_status);
    section("Tasks by Priority", &tasks_by_priority, format_priority);
    section("Meetings by Status", &meetings_by_status, format_status);
    Ok(())
}

fn section(title: &str, rows: &[(String, i64)], fmt: fn(&str) -> String) {
    println!();
    println!("{title}");
    println!("{}", "-".repeat(28));
    if rows.is_empty() {
        println!("  (none)");
        return;
    }
    for (key, count) in rows {
        // Pad outside the color codes so they don't skew the column.
        let pad = " ".repeat(16usize.saturating_sub(key.chars().count()));
        println!("  {}{pad} {count}", fmt(key));
    }
}
