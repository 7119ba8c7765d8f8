//! Week-grid layout for meetings.
//!
//! The grid starts at 06:00 and shows 17 hourly rows of 80 px each. An event
//! is placed by converting its `HH:MM` start and end into a vertical offset
//! and a height.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::db::{Database, DbResult, ListFilter, day_bounds};
use crate::models::{ConversationType, Meeting, MeetingStatus, Platform, UserSummary};

/// First hour shown on the grid.
pub const DAY_START_HOUR: u32 = 6;
/// Number of hourly rows (06:00 through 22:00).
pub const SLOT_COUNT: u32 = 17;
/// Height of one hour row in pixels.
pub const HOUR_HEIGHT_PX: f64 = 80.0;
/// Events shorter than this are stretched so they stay clickable.
pub const MIN_EVENT_HEIGHT_PX: f64 = 20.0;

/// A wall-clock time parsed from `H:MM` or `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParseError(pub String);

impl fmt::Display for TimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time {:?}, expected HH:MM", self.0)
    }
}

impl std::error::Error for TimeParseError {}

impl TimeOfDay {
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let err = || TimeParseError(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
        let digits = |p: &str, max_len: usize| {
            !p.is_empty() && p.len() <= max_len && p.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(h, 2) || m.len() != 2 || !digits(m, 2) {
            return Err(err());
        }
        let hour: u32 = h.parse().map_err(|_| err())?;
        let minute: u32 = m.parse().map_err(|_| err())?;
        if hour > 23 || minute > 59 {
            return Err(err());
        }
        Ok(TimeOfDay { hour, minute })
    }

    pub fn minutes(&self) -> i64 {
        i64::from(self.hour) * 60 + i64::from(self.minute)
    }

    /// Zero-padded `HH:MM`, the stored form. Sorts correctly as text.
    pub fn hhmm(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    /// 12-hour display form, e.g. `9:05 AM`, `12:00 PM`.
    pub fn display(&self) -> String {
        let period = if self.hour >= 12 { "PM" } else { "AM" };
        let hours = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{hours}:{:02} {period}", self.minute)
    }
}

/// Vertical placement of an event inside a day column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventPosition {
    pub top: f64,
    pub height: f64,
}

/// Place an event that runs from `start` to `end`.
///
/// Offsets are measured from [`DAY_START_HOUR`], so events before it get a
/// negative `top`. The height never drops below [`MIN_EVENT_HEIGHT_PX`], which
/// also covers zero-length and inverted ranges.
pub fn position(start: TimeOfDay, end: TimeOfDay) -> EventPosition {
    let px_per_minute = HOUR_HEIGHT_PX / 60.0;
    let from_origin = start.minutes() - i64::from(DAY_START_HOUR) * 60;
    let duration = end.minutes() - start.minutes();
    EventPosition {
        top: from_origin as f64 * px_per_minute,
        height: (duration as f64 * px_per_minute).max(MIN_EVENT_HEIGHT_PX),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub value: String,
    pub label: String,
}

/// Hourly row labels from 06:00 to 22:00.
pub fn time_slots() -> Vec<TimeSlot> {
    (0..SLOT_COUNT)
        .map(|i| {
            let t = TimeOfDay {
                hour: DAY_START_HOUR + i,
                minute: 0,
            };
            TimeSlot {
                value: t.hhmm(),
                label: t.display(),
            }
        })
        .collect()
}

/// The Sunday on or before `anchor`.
pub fn week_start(anchor: NaiveDate) -> NaiveDate {
    anchor - Duration::days(i64::from(anchor.weekday().num_days_from_sunday()))
}

/// Seven consecutive days starting at the Sunday of `anchor`'s week.
pub fn week_days(anchor: NaiveDate) -> Vec<NaiveDate> {
    let start = week_start(anchor);
    (0..7).map(|i| start + Duration::days(i)).collect()
}

/// Move the anchor by whole weeks; negative goes back.
pub fn shift_week(anchor: NaiveDate, weeks: i64) -> NaiveDate {
    anchor + Duration::days(7 * weeks)
}

/// Day header label, e.g. `Sun, Jan 5`.
pub fn day_label(day: NaiveDate) -> String {
    day.format("%a, %b %-d").to_string()
}

/// Colour token the front end maps onto its palette.
pub fn event_color(kind: ConversationType) -> &'static str {
    match kind {
        ConversationType::Video => "blue",
        ConversationType::Audio => "green",
        ConversationType::Message => "purple",
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedEvent {
    pub id: String,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub start_label: String,
    pub end_label: String,
    #[serde(rename = "type")]
    pub kind: ConversationType,
    pub color: &'static str,
    pub platform: Platform,
    pub status: MeetingStatus,
    pub meeting_link: String,
    pub organizer: Option<UserSummary>,
    pub participants: Vec<String>,
    #[serde(flatten)]
    pub position: EventPosition,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayColumn {
    pub date: NaiveDate,
    pub label: String,
    pub is_today: bool,
    pub events: Vec<PlacedEvent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekLayout {
    pub week_start: NaiveDate,
    pub previous_week: NaiveDate,
    pub next_week: NaiveDate,
    /// Month heading for the week, e.g. `January 2025`.
    pub title: String,
    pub time_slots: Vec<TimeSlot>,
    pub days: Vec<DayColumn>,
    /// Meetings in range whose times could not be parsed.
    pub skipped: Vec<String>,
}

/// A meeting paired with its populated organizer, ready for layout.
pub type LayoutInput = (Meeting, Option<UserSummary>);

/// Lay out `meetings` on the week containing `anchor`. Meetings outside the
/// week are ignored; meetings with unparseable times are listed in `skipped`.
pub fn layout_week(anchor: NaiveDate, today: NaiveDate, meetings: &[LayoutInput]) -> WeekLayout {
    let days = week_days(anchor);
    let mut skipped = Vec::new();

    let columns = days
        .iter()
        .map(|&day| {
            let mut events: Vec<PlacedEvent> = Vec::new();
            for (meeting, organizer) in meetings {
                if meeting.due_date.date_naive() != day {
                    continue;
                }
                match place(meeting, organizer.clone()) {
                    Ok(event) => events.push(event),
                    Err(_) => skipped.push(meeting.id.clone()),
                }
            }
            events.sort_by(|a, b| a.position.top.total_cmp(&b.position.top));
            DayColumn {
                date: day,
                label: day_label(day),
                is_today: day == today,
                events,
            }
        })
        .collect();

    let start = days[0];
    WeekLayout {
        week_start: start,
        previous_week: shift_week(start, -1),
        next_week: shift_week(start, 1),
        title: start.format("%B %Y").to_string(),
        time_slots: time_slots(),
        days: columns,
        skipped,
    }
}

/// Load the meetings `user_id` organizes or attends in the week containing
/// `anchor` and lay them out.
pub fn week_for_user(
    db: &Database,
    user_id: &str,
    anchor: NaiveDate,
    today: NaiveDate,
) -> DbResult<WeekLayout> {
    let (from, _) = day_bounds(week_start(anchor));
    let filter = ListFilter::<MeetingStatus> {
        status: None,
        from: Some(from),
        until: Some(from + Duration::days(7)),
    };
    let mut inputs = Vec::new();
    for meeting in db.list_meetings_for_user(user_id, &filter)? {
        let organizer = db
            .user_summaries(std::slice::from_ref(&meeting.organizer))?
            .pop();
        inputs.push((meeting, organizer));
    }
    Ok(layout_week(anchor, today, &inputs))
}

fn place(meeting: &Meeting, organizer: Option<UserSummary>) -> Result<PlacedEvent, TimeParseError> {
    let start = TimeOfDay::parse(&meeting.start_time)?;
    let end = TimeOfDay::parse(&meeting.end_time)?;
    Ok(PlacedEvent {
        id: meeting.id.clone(),
        title: meeting.title.clone(),
        start_time: meeting.start_time.clone(),
        end_time: meeting.end_time.clone(),
        start_label: start.display(),
        end_label: end.display(),
        kind: meeting.conversation_type,
        color: event_color(meeting.conversation_type),
        platform: meeting.platform,
        status: meeting.status,
        meeting_link: meeting.meeting_link.clone(),
        organizer,
        participants: meeting.members.clone(),
        position: position(start, end),
    })
}
