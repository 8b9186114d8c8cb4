//! Reminder and deadline alerts.
//!
//! A task produces at most one reminder alert (keyed by its id) and one
//! deadline alert (keyed `deadline-{id}`). Keys of delivered alerts are kept
//! in a [`FiredSet`] that is never pruned.

use crate::error::AppError;
use crate::model::Task;
use serde::{Deserialize, Deserializer, Serialize};
use time::{Duration, OffsetDateTime};

mod clock;

pub use clock::{Clock, ReminderLoop, SCAN_INTERVAL, SystemClock};

pub const REMINDER_WINDOW: Duration = Duration::minutes(5);
pub const DEADLINE_WINDOW: Duration = Duration::minutes(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Reminder,
    Deadline,
}

impl AlertKind {
    pub fn key(self, task_id: i64) -> String {
        match self {
            Self::Reminder => task_id.to_string(),
            Self::Deadline => format!("deadline-{task_id}"),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Reminder => "Reminder",
            Self::Deadline => "Deadline approaching",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub task_id: i64,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub kind: AlertKind,
}

impl Alert {
    pub fn key(&self) -> String {
        self.kind.key(self.task_id)
    }
}

/// How far ahead of a reminder or deadline an alert may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindows {
    pub reminder: Duration,
    pub deadline: Duration,
}

impl Default for ScanWindows {
    fn default() -> Self {
        Self {
            reminder: REMINDER_WINDOW,
            deadline: DEADLINE_WINDOW,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredKey {
    Text(String),
    Number(i64),
}

/// Keys of alerts that were already delivered, in firing order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FiredSet {
    keys: Vec<String>,
}

impl<'de> Deserialize<'de> for FiredSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<StoredKey>::deserialize(deserializer)?;
        let mut fired = FiredSet::default();
        for key in raw {
            match key {
                StoredKey::Text(value) => fired.insert(value),
                StoredKey::Number(value) => fired.insert(value.to_string()),
            };
        }
        Ok(fired)
    }
}

impl FiredSet {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|existing| existing == key)
    }

    /// Returns false when the key was already present.
    pub fn insert(&mut self, key: String) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

fn within_window(target: OffsetDateTime, now: OffsetDateTime, window: Duration) -> bool {
    let remaining = target - now;
    remaining > Duration::ZERO && remaining <= window
}

/// Alerts that should fire at `now` and have not fired before.
pub fn due_alerts(
    tasks: &[Task],
    fired: &FiredSet,
    windows: ScanWindows,
    now: OffsetDateTime,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for task in tasks.iter().filter(|task| !task.completed) {
        let checks = [
            (AlertKind::Reminder, task.reminder, windows.reminder),
            (AlertKind::Deadline, task.deadline, windows.deadline),
        ];

        for (kind, target, window) in checks {
            let Some(at) = target else {
                continue;
            };
            if within_window(at, now, window) && !fired.contains(&kind.key(task.id)) {
                alerts.push(Alert {
                    task_id: task.id,
                    text: task.text.clone(),
                    at,
                    kind,
                });
            }
        }
    }

    alerts
}

#[derive(Debug)]
pub struct AlertFailure {
    pub alert: Alert,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub fired: Vec<Alert>,
    pub failures: Vec<AlertFailure>,
}
