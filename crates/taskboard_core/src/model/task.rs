use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Elapsed time recorded for a task that has not been completed.
pub const ZERO_ELAPSED: &str = "00:00:00";

fn zero_elapsed() -> String {
    ZERO_ELAPSED.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub starred: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub reminder: Option<OffsetDateTime>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default = "zero_elapsed")]
    pub time_used: String,
}

impl Task {
    /// Derived status at `now`. Never stored.
    pub fn status(&self, now: OffsetDateTime) -> TaskStatus {
        if self.completed {
            return TaskStatus::Completed;
        }
        if self.started_at.is_some() {
            return TaskStatus::InProgress;
        }
        match self.start_time {
            Some(start) if start > now => TaskStatus::NotStarted,
            Some(_) => TaskStatus::Due,
            None => TaskStatus::InProgress,
        }
    }

    pub fn is_not_started(&self, now: OffsetDateTime) -> bool {
        self.status(now) == TaskStatus::NotStarted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    /// Start time has passed but the task was never started.
    Due,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Due => "due",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }
}

/// Fields supplied when a task is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub text: String,
    pub start_time: Option<OffsetDateTime>,
    pub deadline: Option<OffsetDateTime>,
    pub reminder: Option<OffsetDateTime>,
    pub location: Option<String>,
    pub starred: bool,
}

impl NewTask {
    pub fn new<T: Into<String>>(text: T) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Full replacement of the editable fields of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub text: String,
    pub start_time: Option<OffsetDateTime>,
    pub deadline: Option<OffsetDateTime>,
    pub reminder: Option<OffsetDateTime>,
    pub location: Option<String>,
    pub starred: bool,
}

impl TaskEdit {
    /// Edit that leaves every field as it currently is.
    pub fn from_task(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            start_time: task.start_time,
            deadline: task.deadline,
            reminder: task.reminder,
            location: task.location.clone(),
            starred: task.starred,
        }
    }
}
