use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a user's bio, in characters.
pub const MAX_BIO_CHARS: usize = 500;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_CHARS: usize = 6;

fn invalid_value(kind: &str, value: &str, valid: &[&str]) -> String {
    format!("invalid {kind}: {value}. valid values: {}", valid.join(", "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const VALID: &'static [&'static str] = &["low", "medium", "high", "urgent"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(invalid_value("priority", s, Self::VALID)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const VALID: &'static [&'static str] = &["pending", "in-progress", "completed", "cancelled"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" | "in_progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            _ => Err(invalid_value("task status", s, Self::VALID)),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a meeting is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    Message,
    Audio,
    #[default]
    Video,
}

impl ConversationType {
    pub const VALID: &'static [&'static str] = &["message", "audio", "video"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Message => "message",
            ConversationType::Audio => "audio",
            ConversationType::Video => "video",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "message" => Ok(ConversationType::Message),
            "audio" => Ok(ConversationType::Audio),
            "video" => Ok(ConversationType::Video),
            _ => Err(invalid_value("conversation type", s, Self::VALID)),
        }
    }
}

impl fmt::Display for ConversationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Zoom,
    Slack,
    Meet,
    Won,
    Teams,
    Other,
}

impl Platform {
    pub const VALID: &'static [&'static str] = &["zoom", "slack", "meet", "won", "teams", "other"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Zoom => "zoom",
            Platform::Slack => "slack",
            Platform::Meet => "meet",
            Platform::Won => "won",
            Platform::Teams => "teams",
            Platform::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "zoom" => Ok(Platform::Zoom),
            "slack" => Ok(Platform::Slack),
            "meet" => Ok(Platform::Meet),
            "won" => Ok(Platform::Won),
            "teams" => Ok(Platform::Teams),
            "other" => Ok(Platform::Other),
            _ => Err(invalid_value("platform", s, Self::VALID)),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Ongoing,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub const VALID: &'static [&'static str] = &["scheduled", "ongoing", "completed", "cancelled"];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Ongoing => "ongoing",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(MeetingStatus::Scheduled),
            "ongoing" => Ok(MeetingStatus::Ongoing),
            "completed" => Ok(MeetingStatus::Completed),
            "cancelled" | "canceled" => Ok(MeetingStatus::Cancelled),
            _ => Err(invalid_value("meeting status", s, Self::VALID)),
        }
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_no: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub profile_image_url: String,
    pub profile_file_id: String,
    pub location: String,
    pub designation: String,
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            profile_image_url: self.profile_image_url.clone(),
        }
    }
}

/// The subset of a user embedded wherever another record references them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub profile_image_url: String,
}

/// A file attached to a task and held by the media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_name: String,
    pub file_url: String,
    pub file_id: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A task with its references left as user ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub members: Vec<String>,
    pub labels: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub due_time: String,
    pub group: String,
    pub priority: Priority,
    pub uploaded_files: Vec<UploadedFile>,
    pub created_by: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.created_by == user_id || self.members.iter().any(|m| m == user_id)
    }
}

/// A task with `members` and `createdBy` replaced by user summaries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub members: Vec<UserSummary>,
    pub labels: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub due_time: String,
    pub group: String,
    pub priority: Priority,
    pub uploaded_files: Vec<UploadedFile>,
    pub created_by: Option<UserSummary>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub organizer: String,
    pub members: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub start_time: String,
    pub end_time: String,
    pub conversation_type: ConversationType,
    pub platform: Platform,
    pub meeting_link: String,
    pub description: String,
    pub status: MeetingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A meeting with `organizer` and `members` replaced by user summaries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub organizer: Option<UserSummary>,
    pub members: Vec<UserSummary>,
    pub due_date: DateTime<Utc>,
    pub start_time: String,
    pub end_time: String,
    pub conversation_type: ConversationType,
    pub platform: Platform,
    pub meeting_link: String,
    pub description: String,
    pub status: MeetingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parse a due date as sent by browsers: RFC 3339, a `datetime-local`
/// value, or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_due_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// Parse a `YYYY-MM-DD` day filter.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_due_date(s).map(|dt| dt.date_naive()))
}

/// Normalize an email the way it is stored: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Split, trim and drop empty entries from a list of labels.
pub fn clean_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .map(|l| l.as_ref().trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}
