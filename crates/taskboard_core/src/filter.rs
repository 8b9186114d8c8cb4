use crate::error::AppError;
use crate::model::Task;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
    Starred,
    NotStarted,
}

impl Filter {
    pub const ALL: [Filter; 5] = [
        Filter::All,
        Filter::Active,
        Filter::Completed,
        Filter::Starred,
        Filter::NotStarted,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Starred => "starred",
            Self::NotStarted => "not-started",
        }
    }

    pub fn matches(self, task: &Task, now: OffsetDateTime) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
            Self::Starred => task.starred,
            Self::NotStarted => task.is_not_started(now),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let cleaned = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|filter| filter.name() == cleaned)
            .ok_or_else(|| AppError::invalid_input(format!("unknown filter '{}'", raw.trim())))
    }
}

/// Tasks visible under `filter`, in store order.
pub fn project(tasks: &[Task], filter: Filter, now: OffsetDateTime) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task, now))
        .collect()
}
