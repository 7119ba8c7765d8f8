use std::path::Path;

use anyhow::{Context, bail};
use chrono::Utc;
use colored::Colorize;

use hrdesk::calendar::{self, WeekLayout};
use hrdesk::models::{normalize_email, parse_day};

use super::{format_status, open_db, paint, print_json};

pub fn run(db_path: &Path, email: &str, date: Option<&str>, json: bool) -> anyhow::Result<()> {
    let db = open_db(db_path)?;
    let email = normalize_email(email);
    let Some(user) = db.get_user_by_email(&email)? else {
        bail!("no user with email {email}");
    };

    let today = Utc::now().date_naive();
    let anchor = match date {
        Some(raw) => parse_day(raw).with_context(|| format!("invalid date {raw:?}, expected YYYY-MM-DD"))?,
        None => today,
    };

    let week = calendar::week_for_user(&db, &user.id, anchor, today)?;
    if json {
        return print_json(&week);
    }
    print_week(&week, &user.full_name());
    Ok(())
}

fn print_week(week: &WeekLayout, who: &str) {
    println!(
        "{} {} ({})",
        week.title.bold(),
        format!("week of {}", calendar::day_label(week.week_start)).bright_black(),
        who
    );

    for day in &week.days {
        println!();
        let header = if day.is_today {
            format!("{} (today)", day.label).bold().to_string()
        } else {
            day.label.bold().to_string()
        };
        println!("{header}");
        if day.events.is_empty() {
            println!("  {}", "no meetings".bright_black());
            continue;
        }
        for e in &day.events {
            println!(
                "  {:>8} - {:<8}  {}  {} [{}]  {}",
                e.start_label,
                e.end_label,
                paint(e.color, &e.title),
                e.kind,
                e.platform,
                format_status(e.status.as_str()),
            );
        }
    }

    if !week.skipped.is_empty() {
        println!();
        println!(
            "{} {} meeting(s) with unreadable times: {}",
            "warning:".yellow(),
            week.skipped.len(),
            week.skipped.join(", ")
        );
    }
}
