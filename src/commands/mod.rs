pub mod calendar;
pub mod init;
pub mod serve;
pub mod stats;
pub mod users;

use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use hrdesk::db::Database;

/// Open the database and bring its schema up to date.
pub fn open_db(db_path: &Path) -> anyhow::Result<Database> {
    let db = Database::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    db.migrate().context("failed to migrate database")?;
    Ok(db)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a task or meeting status as a colored string.
pub fn format_status(s: &str) -> String {
    match s {
        "pending" | "scheduled" => s.yellow().to_string(),
        "in-progress" | "ongoing" => s.cyan().to_string(),
        "completed" => s.green().to_string(),
        "cancelled" => s.bright_black().to_string(),
        _ => s.to_string(),
    }
}

/// Format a task priority as a colored string.
pub fn format_priority(p: &str) -> String {
    match p {
        "urgent" => p.red().bold().to_string(),
        "high" => p.yellow().bold().to_string(),
        "medium" => p.white().to_string(),
        "low" => p.bright_black().to_string(),
        _ => p.to_string(),
    }
}

/// Paint text with a calendar colour token.
pub fn paint(color: &str, text: &str) -> String {
    match color {
        "blue" => text.blue().to_string(),
        "green" => text.green().to_string(),
        "purple" => text.magenta().to_string(),
        _ => text.to_string(),
    }
}

/// Cut `s` to at most `width` characters, marking the cut with `...`.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}
