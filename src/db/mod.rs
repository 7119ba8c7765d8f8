use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::ToSql;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::models::{
    ConversationType, Meeting, MeetingStatus, MeetingView, Platform, Priority, Task, TaskStatus,
    TaskView, UploadedFile, User, UserSummary,
};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),
}

pub type DbResult<T> = Result<T, DbError>;

pub struct Database {
    conn: Connection,
}

/// Fields a user may change on their own profile. `None` leaves a column untouched.
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_no: Option<String>,
    pub location: Option<String>,
    pub designation: Option<String>,
    pub bio: Option<String>,
    /// New `(url, file_id)` pair from the media store.
    pub profile_image: Option<(String, String)>,
}

#[derive(Debug, Default, Clone)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub members: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub group: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    /// Appended after the files already on the task.
    pub new_files: Vec<UploadedFile>,
}

#[derive(Debug, Default, Clone)]
pub struct MeetingChanges {
    pub title: Option<String>,
    pub members: Option<Vec<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub conversation_type: Option<ConversationType>,
    pub platform: Option<Platform>,
    pub meeting_link: Option<String>,
    pub description: Option<String>,
    pub status: Option<MeetingStatus>,
}

/// Optional narrowing of a listing: status and a half-open due-date window.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListFilter<S> {
    pub status: Option<S>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl<S> ListFilter<S> {
    /// Restrict the listing to a single UTC calendar day.
    pub fn on_day(mut self, day: NaiveDate) -> Self {
        let (from, until) = day_bounds(day);
        self.from = Some(from);
        self.until = Some(until);
        self
    }
}

/// `[00:00 of day, 00:00 of the next day)` in UTC.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone_no, password_hash, profile_image_url,
     profile_file_id, location, designation, bio, created_at, updated_at";

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.labels, t.due_date, t.due_time, t.task_group,
     t.priority, t.created_by, t.status, t.created_at, t.updated_at";

const MEETING_COLUMNS: &str = "m.id, m.title, m.organizer, m.due_date, m.start_time, m.end_time,
     m.conversation_type, m.platform, m.meeting_link, m.description, m.status, m.created_at, m.updated_at";

impl Database {
    /// Open (or create) the database at the given path, creating parent directories.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Database { conn })
    }

    /// Create the schema tables if they don't exist, then run any pending version-gated migrations.
    pub fn migrate(&self) -> DbResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id                TEXT PRIMARY KEY,
                first_name        TEXT NOT NULL,
                last_name         TEXT NOT NULL,
                email             TEXT NOT NULL UNIQUE,
                phone_no          TEXT NOT NULL DEFAULT '',
                password_hash     TEXT NOT NULL,
                profile_image_url TEXT NOT NULL DEFAULT '',
                profile_file_id   TEXT NOT NULL DEFAULT '',
                location          TEXT NOT NULL DEFAULT '',
                designation       TEXT NOT NULL DEFAULT '',
                bio               TEXT NOT NULL DEFAULT '',
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                labels      TEXT NOT NULL DEFAULT '[]',
                due_date    TEXT NOT NULL,
                due_time    TEXT NOT NULL DEFAULT '',
                task_group  TEXT NOT NULL DEFAULT '',
                priority    TEXT NOT NULL DEFAULT 'medium',
                created_by  TEXT NOT NULL REFERENCES users(id),
                status      TEXT NOT NULL DEFAULT 'pending',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS task_members (
                task_id  TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                user_id  TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (task_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS task_files (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id     TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                file_name   TEXT NOT NULL,
                file_url    TEXT NOT NULL,
                file_id     TEXT NOT NULL,
                uploaded_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meetings (
                id                TEXT PRIMARY KEY,
                title             TEXT NOT NULL,
                organizer         TEXT NOT NULL REFERENCES users(id),
                due_date          TEXT NOT NULL,
                start_time        TEXT NOT NULL,
                end_time          TEXT NOT NULL,
                conversation_type TEXT NOT NULL DEFAULT 'video',
                platform          TEXT NOT NULL,
                meeting_link      TEXT NOT NULL DEFAULT '',
                description       TEXT NOT NULL DEFAULT '',
                status            TEXT NOT NULL DEFAULT 'scheduled',
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meeting_members (
                meeting_id TEXT NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
                user_id    TEXT NOT NULL,
                position   INTEGER NOT NULL,
                PRIMARY KEY (meeting_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_created_by ON tasks(created_by);
            CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(due_date);
            CREATE INDEX IF NOT EXISTS idx_task_members_user ON task_members(user_id);
            CREATE INDEX IF NOT EXISTS idx_task_files_task ON task_files(task_id);
            CREATE INDEX IF NOT EXISTS idx_meetings_organizer ON meetings(organizer);
            CREATE INDEX IF NOT EXISTS idx_meetings_due ON meetings(due_date);
            CREATE INDEX IF NOT EXISTS idx_meeting_members_user ON meeting_members(user_id);
            ",
        )?;

        // Fresh databases start at schema version 0.
        self.conn.execute(
            "INSERT OR IGNORE INTO config (key, value) VALUES ('schema_version', '0')",
            [],
        )?;

        run_migrations(&self.conn)
    }

    // -- Config --

    pub fn set_config(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    // -- Users --

    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        let result = self.conn.execute(
            "INSERT INTO users (id, first_name, last_name, email, phone_no, password_hash, profile_image_url,
                                profile_file_id, location, designation, bio, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                user.id,
                user.first_name,
                user.last_name,
                user.email,
                user.phone_no,
                user.password_hash,
                user.profile_image_url,
                user.profile_file_id,
                user.location,
                user.designation,
                user.bio,
                ts(&user.created_at),
                ts(&user.updated_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(DbError::DuplicateEmail(user.email.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .optional()?)
    }

    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .optional()?)
    }

    /// Every user, ordered by first name.
    pub fn list_users(&self) -> DbResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY first_name ASC, last_name ASC"
        ))?;
        let rows = stmt.query_map([], row_to_user)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Summaries for the given ids, in the given order. Unknown ids are skipped.
    pub fn user_summaries(&self, ids: &[String]) -> DbResult<Vec<UserSummary>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, first_name, last_name, email, profile_image_url FROM users WHERE id = ?1",
        )?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let summary = stmt
                .query_row(params![id], |row| {
                    Ok(UserSummary {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        email: row.get(3)?,
                        profile_image_url: row.get(4)?,
                    })
                })
                .optional()?;
            out.extend(summary);
        }
        Ok(out)
    }

    /// The subset of `ids` with no matching user.
    pub fn missing_users(&self, ids: &[String]) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM users WHERE id = ?1")?;
        let mut missing = Vec::new();
        for id in ids {
            let n: i64 = stmt.query_row(params![id], |row| row.get(0))?;
            if n == 0 {
                missing.push(id.clone());
            }
        }
        Ok(missing)
    }

    /// Apply profile changes. Returns `false` if the user does not exist.
    pub fn update_user_profile(&self, id: &str, changes: &ProfileChanges) -> DbResult<bool> {
        let mut set = Assignments::default();
        if let Some(v) = &changes.first_name {
            set.push("first_name", v.clone());
        }
        if let Some(v) = &changes.last_name {
            set.push("last_name", v.clone());
        }
        if let Some(v) = &changes.phone_no {
            set.push("phone_no", v.clone());
        }
        if let Some(v) = &changes.location {
            set.push("location", v.clone());
        }
        if let Some(v) = &changes.designation {
            set.push("designation", v.clone());
        }
        if let Some(v) = &changes.bio {
            set.push("bio", v.clone());
        }
        if let Some((url, file_id)) = &changes.profile_image {
            set.push("profile_image_url", url.clone());
            set.push("profile_file_id", file_id.clone());
        }

        if set.is_empty() {
            return Ok(self.exists("users", id)?);
        }
        Ok(set.apply(&self.conn, "users", id)? > 0)
    }

    pub fn user_count(&self) -> DbResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    // -- Tasks --

    pub fn insert_task(&self, task: &Task) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO tasks (id, title, description, labels, due_date, due_time, task_group, priority,
                                created_by, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                task.id,
                task.title,
                task.description,
                encode_labels(&task.labels),
                ts(&task.due_date),
                task.due_time,
                task.group,
                task.priority.as_str(),
                task.created_by,
                task.status.as_str(),
                ts(&task.created_at),
                ts(&task.updated_at),
            ],
        )?;
        replace_members(&tx, "task_members", "task_id", &task.id, &task.members)?;
        insert_files(&tx, &task.id, &task.uploaded_files)?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> DbResult<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?;
        match task {
            Some(task) => Ok(Some(self.hydrate_task(task)?)),
            None => Ok(None),
        }
    }

    /// Tasks created by or assigned to `user_id`, soonest due first, newest first within a due date.
    pub fn list_tasks_for_user(
        &self,
        user_id: &str,
        filter: &ListFilter<TaskStatus>,
    ) -> DbResult<Vec<Task>> {
        let mut sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t
             WHERE (t.created_by = ?1
                    OR EXISTS (SELECT 1 FROM task_members tm WHERE tm.task_id = t.id AND tm.user_id = ?1))"
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        push_filter(&mut sql, &mut values, "t", filter.status.map(|s| s.as_str()), filter);
        sql.push_str(" ORDER BY t.due_date ASC, t.created_at DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let rows = stmt.query_map(refs.as_slice(), row_to_task)?;
        let tasks = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        tasks.into_iter().map(|t| self.hydrate_task(t)).collect()
    }

    /// Apply changes to a task. Returns `false` if the task does not exist.
    pub fn update_task(&self, id: &str, changes: &TaskChanges) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let mut set = Assignments::default();
        if let Some(v) = &changes.title {
            set.push("title", v.clone());
        }
        if let Some(v) = &changes.description {
            set.push("description", v.clone());
        }
        if let Some(v) = &changes.labels {
            set.push("labels", encode_labels(v));
        }
        if let Some(v) = &changes.due_date {
            set.push("due_date", ts(v));
        }
        if let Some(v) = &changes.due_time {
            set.push("due_time", v.clone());
        }
        if let Some(v) = &changes.group {
            set.push("task_group", v.clone());
        }
        if let Some(v) = changes.priority {
            set.push("priority", v.as_str());
        }
        if let Some(v) = changes.status {
            set.push("status", v.as_str());
        }
        let touches_children = changes.members.is_some() || !changes.new_files.is_empty();
        if touches_children {
            // Bumps updated_at even when no scalar column changed.
            set.touch();
        }

        let found = if set.is_empty() {
            self.exists("tasks", id)?
        } else {
            set.apply(&tx, "tasks", id)? > 0
        };
        if !found {
            return Ok(false);
        }

        if let Some(members) = &changes.members {
            replace_members(&tx, "task_members", "task_id", id, members)?;
        }
        insert_files(&tx, id, &changes.new_files)?;
        tx.commit()?;
        Ok(true)
    }

    /// Delete a task and its member/file rows. Returns `false` if nothing was deleted.
    pub fn delete_task(&self, id: &str) -> DbResult<bool> {
        Ok(self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?
            > 0)
    }

    /// Replace member ids and the creator id with user summaries.
    pub fn populate_task(&self, task: Task) -> DbResult<TaskView> {
        let members = self.user_summaries(&task.members)?;
        let created_by = self
            .user_summaries(std::slice::from_ref(&task.created_by))?
            .pop();
        Ok(TaskView {
            id: task.id,
            title: task.title,
            description: task.description,
            members,
            labels: task.labels,
            due_date: task.due_date,
            due_time: task.due_time,
            group: task.group,
            priority: task.priority,
            uploaded_files: task.uploaded_files,
            created_by,
            status: task.status,
            created_at: task.created_at,
            updated_at: task.updated_at,
        })
    }

    fn hydrate_task(&self, mut task: Task) -> DbResult<Task> {
        task.members = member_ids(&self.conn, "task_members", "task_id", &task.id)?;
        let mut stmt = self.conn.prepare_cached(
            "SELECT file_name, file_url, file_id, uploaded_at FROM task_files WHERE task_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![task.id], |row| {
            let uploaded: String = row.get(3)?;
            Ok(UploadedFile {
                file_name: row.get(0)?,
                file_url: row.get(1)?,
                file_id: row.get(2)?,
                uploaded_at: parse_ts(&uploaded),
            })
        })?;
        task.uploaded_files = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(task)
    }

    /// Count tasks grouped by status.
    pub fn task_count_by_status(&self) -> DbResult<Vec<(String, i64)>> {
        self.count_grouped("SELECT status, COUNT(*) FROM tasks GROUP BY status ORDER BY status")
    }

    /// Count tasks grouped by priority.
    pub fn task_count_by_priority(&self) -> DbResult<Vec<(String, i64)>> {
        self.count_grouped("SELECT priority, COUNT(*) FROM tasks GROUP BY priority ORDER BY priority")
    }

    // -- Meetings --

    pub fn insert_meeting(&self, meeting: &Meeting) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO meetings (id, title, organizer, due_date, start_time, end_time, conversation_type,
                                   platform, meeting_link, description, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                meeting.id,
                meeting.title,
                meeting.organizer,
                ts(&meeting.due_date),
                meeting.start_time,
                meeting.end_time,
                meeting.conversation_type.as_str(),
                meeting.platform.as_str(),
                meeting.meeting_link,
                meeting.description,
                meeting.status.as_str(),
                ts(&meeting.created_at),
                ts(&meeting.updated_at),
            ],
        )?;
        replace_members(&tx, "meeting_members", "meeting_id", &meeting.id, &meeting.members)?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_meeting(&self, id: &str) -> DbResult<Option<Meeting>> {
        let meeting = self
            .conn
            .query_row(
                &format!("SELECT {MEETING_COLUMNS} FROM meetings m WHERE m.id = ?1"),
                params![id],
                row_to_meeting,
            )
            .optional()?;
        match meeting {
            Some(mut m) => {
                m.members = member_ids(&self.conn, "meeting_members", "meeting_id", &m.id)?;
                Ok(Some(m))
            }
            None => Ok(None),
        }
    }

    /// Meetings organized by or including `user_id`, ordered by date then start time.
    pub fn list_meetings_for_user(
        &self,
        user_id: &str,
        filter: &ListFilter<MeetingStatus>,
    ) -> DbResult<Vec<Meeting>> {
        let mut sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings m
             WHERE (m.organizer = ?1
                    OR EXISTS (SELECT 1 FROM meeting_members mm WHERE mm.meeting_id = m.id AND mm.user_id = ?1))"
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        push_filter(&mut sql, &mut values, "m", filter.status.map(|s| s.as_str()), filter);
        sql.push_str(" ORDER BY m.due_date ASC, m.start_time ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let rows = stmt.query_map(refs.as_slice(), row_to_meeting)?;
        let mut meetings = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        for m in &mut meetings {
            m.members = member_ids(&self.conn, "meeting_members", "meeting_id", &m.id)?;
        }
        Ok(meetings)
    }

    /// Apply changes to a meeting. Returns `false` if the meeting does not exist.
    pub fn update_meeting(&self, id: &str, changes: &MeetingChanges) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let mut set = Assignments::default();
        if let Some(v) = &changes.title {
            set.push("title", v.clone());
        }
        if let Some(v) = &changes.due_date {
            set.push("due_date", ts(v));
        }
        if let Some(v) = &changes.start_time {
            set.push("start_time", v.clone());
        }
        if let Some(v) = &changes.end_time {
            set.push("end_time", v.clone());
        }
        if let Some(v) = changes.conversation_type {
            set.push("conversation_type", v.as_str());
        }
        if let Some(v) = changes.platform {
            set.push("platform", v.as_str());
        }
        if let Some(v) = &changes.meeting_link {
            set.push("meeting_link", v.clone());
        }
        if let Some(v) = &changes.description {
            set.push("description", v.clone());
        }
        if let Some(v) = changes.status {
            set.push("status", v.as_str());
        }
        if changes.members.is_some() {
            set.touch();
        }

        let found = if set.is_empty() {
            self.exists("meetings", id)?
        } else {
            set.apply(&tx, "meetings", id)? > 0
        };
        if !found {
            return Ok(false);
        }

        if let Some(members) = &changes.members {
            replace_members(&tx, "meeting_members", "meeting_id", id, members)?;
        }
        tx.commit()?;
        Ok(true)
    }

    pub fn delete_meeting(&self, id: &str) -> DbResult<bool> {
        Ok(self
            .conn
            .execute("DELETE FROM meetings WHERE id = ?1", params![id])?
            > 0)
    }

    /// Replace the organizer and member ids with user summaries.
    pub fn populate_meeting(&self, meeting: Meeting) -> DbResult<MeetingView> {
        let organizer = self
            .user_summaries(std::slice::from_ref(&meeting.organizer))?
            .pop();
        let members = self.user_summaries(&meeting.members)?;
        Ok(MeetingView {
            id: meeting.id,
            title: meeting.title,
            organizer,
            members,
            due_date: meeting.due_date,
            start_time: meeting.start_time,
            end_time: meeting.end_time,
            conversation_type: meeting.conversation_type,
            platform: meeting.platform,
            meeting_link: meeting.meeting_link,
            description: meeting.description,
            status: meeting.status,
            created_at: meeting.created_at,
            updated_at: meeting.updated_at,
        })
    }

    /// Count meetings grouped by status.
    pub fn meeting_count_by_status(&self) -> DbResult<Vec<(String, i64)>> {
        self.count_grouped("SELECT status, COUNT(*) FROM meetings GROUP BY status ORDER BY status")
    }

    // -- Helpers --

    fn exists(&self, table: &str, id: &str) -> rusqlite::Result<bool> {
        self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"),
            params![id],
            |row| row.get::<_, i64>(0).map(|n| n > 0),
        )
    }

    fn count_grouped(&self, sql: &str) -> DbResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// Accumulates `column = ?N` assignments for a dynamic UPDATE.
#[derive(Default)]
struct Assignments {
    sets: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
    touched: bool,
}

impl Assignments {
    fn push(&mut self, column: &str, value: impl ToSql + 'static) {
        self.values.push(Box::new(value));
        self.sets.push(format!("{column} = ?{}", self.values.len()));
    }

    /// Force an `updated_at` bump even without column changes.
    fn touch(&mut self) {
        self.touched = true;
    }

    fn is_empty(&self) -> bool {
        self.sets.is_empty() && !self.touched
    }

    fn apply(mut self, conn: &Connection, table: &str, id: &str) -> rusqlite::Result<usize> {
        self.push("updated_at", ts(&Utc::now()));
        self.values.push(Box::new(id.to_string()));
        let sql = format!(
            "UPDATE {table} SET {} WHERE id = ?{}",
            self.sets.join(", "),
            self.values.len()
        );
        let refs: Vec<&dyn ToSql> = self.values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())
    }
}

/// Append status and due-date window conditions to a listing query.
fn push_filter<S>(
    sql: &mut String,
    values: &mut Vec<Box<dyn ToSql>>,
    alias: &str,
    status: Option<&'static str>,
    filter: &ListFilter<S>,
) {
    if let Some(status) = status {
        values.push(Box::new(status));
        sql.push_str(&format!(" AND {alias}.status = ?{}", values.len()));
    }
    if let Some(from) = filter.from {
        values.push(Box::new(ts(&from)));
        sql.push_str(&format!(" AND {alias}.due_date >= ?{}", values.len()));
    }
    if let Some(until) = filter.until {
        values.push(Box::new(ts(&until)));
        sql.push_str(&format!(" AND {alias}.due_date < ?{}", values.len()));
    }
}

fn replace_members(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: &str,
    members: &[String],
) -> rusqlite::Result<()> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE {owner_column} = ?1"),
        params![owner_id],
    )?;
    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {table} ({owner_column}, user_id, position) VALUES (?1, ?2, ?3)"
    ))?;
    for (position, user_id) in members.iter().enumerate() {
        stmt.execute(params![owner_id, user_id, position as i64])?;
    }
    Ok(())
}

fn member_ids(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: &str,
) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT user_id FROM {table} WHERE {owner_column} = ?1 ORDER BY position ASC"
    ))?;
    let rows = stmt.query_map(params![owner_id], |row| row.get::<_, String>(0))?;
    rows.collect()
}

fn insert_files(conn: &Connection, task_id: &str, files: &[UploadedFile]) -> rusqlite::Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    let mut stmt = conn.prepare(
        "INSERT INTO task_files (task_id, file_name, file_url, file_id, uploaded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for f in files {
        stmt.execute(params![task_id, f.file_name, f.file_url, f.file_id, ts(&f.uploaded_at)])?;
    }
    Ok(())
}

/// Read the current schema version from the config table.
fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let value = conn
        .query_row(
            "SELECT value FROM config WHERE key = 'schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse::<i32>().ok()).unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES ('schema_version', ?1)",
        params![version.to_string()],
    )?;
    Ok(())
}

/// Run all pending schema migrations in order.
///
/// Version 0 is the baseline created by `migrate()`. Each later version is an
/// `if version < N` block wrapped in its own transaction.
fn run_migrations(conn: &Connection) -> DbResult<()> {
    let version = get_schema_version(conn)?;

    if version < 1 {
        // v1: the member picker lists users by first name.
        conn.execute_batch(
            "BEGIN;
             CREATE INDEX IF NOT EXISTS idx_users_first_name ON users(first_name);
             COMMIT;",
        )?;
        set_schema_version(conn, 1)?;
    }

    Ok(())
}

/// Timestamps are stored as fixed-width RFC 3339 so they sort as text.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn encode_labels(labels: &[String]) -> String {
    serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string())
}

fn decode_labels(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let created: String = row.get(11)?;
    let updated: String = row.get(12)?;
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone_no: row.get(4)?,
        password_hash: row.get(5)?,
        profile_image_url: row.get(6)?,
        profile_file_id: row.get(7)?,
        location: row.get(8)?,
        designation: row.get(9)?,
        bio: row.get(10)?,
        created_at: parse_ts(&created),
        updated_at: parse_ts(&updated),
    })
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let labels: String = row.get(3)?;
    let due: String = row.get(4)?;
    let priority: String = row.get(7)?;
    let status: String = row.get(9)?;
    let created: String = row.get(10)?;
    let updated: String = row.get(11)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        members: Vec::new(),
        labels: decode_labels(&labels),
        due_date: parse_ts(&due),
        due_time: row.get(5)?,
        group: row.get(6)?,
        priority: Priority::from_str(&priority).unwrap_or_default(),
        uploaded_files: Vec::new(),
        created_by: row.get(8)?,
        status: TaskStatus::from_str(&status).unwrap_or_default(),
        created_at: parse_ts(&created),
        updated_at: parse_ts(&updated),
    })
}

fn row_to_meeting(row: &rusqlite::Row) -> rusqlite::Result<Meeting> {
    let due: String = row.get(3)?;
    let conversation: String = row.get(6)?;
    let platform: String = row.get(7)?;
    let status: String = row.get(10)?;
    let created: String = row.get(11)?;
    let updated: String = row.get(12)?;
    Ok(Meeting {
        id: row.get(0)?,
        title: row.get(1)?,
        organizer: row.get(2)?,
        members: Vec::new(),
        due_date: parse_ts(&due),
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        conversation_type: ConversationType::from_str(&conversation).unwrap_or_default(),
        platform: Platform::from_str(&platform).unwrap_or(Platform::Other),
        meeting_link: row.get(8)?,
        description: row.get(9)?,
        status: MeetingStatus::from_str(&status).unwrap_or_default(),
        created_at: parse_ts(&created),
        updated_at: parse_ts(&updated),
    })
}

/// Fold `(key, count)` rows into a map, for JSON output.
pub fn counts_to_map(rows: &[(String, i64)]) -> HashMap<&str, i64> {
    rows.iter().map(|(k, c)| (k.as_str(), *c)).collect()
}
