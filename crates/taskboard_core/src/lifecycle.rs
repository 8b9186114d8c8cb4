//! State transitions of a single task.
//!
//! Every function takes the current instant explicitly; nothing in here reads
//! the wall clock.

use crate::error::AppError;
use crate::model::{NewTask, Task, TaskEdit, ZERO_ELAPSED};
use time::{Duration, OffsetDateTime};

pub const MAX_TEXT_CHARS: usize = 100;

/// What a toggle did to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started,
    Completed,
    Reactivated,
}

pub fn validate_text(text: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("text is required"));
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::invalid_input(format!(
            "text must be at most {MAX_TEXT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_location(location: Option<String>) -> Option<String> {
    location
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Builds a fresh task. A start time in the future leaves it not started.
pub fn create(id: i64, new_task: NewTask, now: OffsetDateTime) -> Result<Task, AppError> {
    let text = validate_text(&new_task.text)?;
    let not_started = new_task.start_time.is_some_and(|start| start > now);

    Ok(Task {
        id,
        text,
        completed: false,
        starred: new_task.starred,
        created_at: now,
        start_time: new_task.start_time,
        started_at: if not_started { None } else { Some(now) },
        deadline: new_task.deadline,
        reminder: new_task.reminder,
        location: normalize_location(new_task.location),
        completed_at: None,
        time_used: ZERO_ELAPSED.to_string(),
    })
}

pub fn start(task: &mut Task, now: OffsetDateTime) -> Result<(), AppError> {
    if task.completed {
        return Err(AppError::invalid_state("task already completed"));
    }
    if task.started_at.is_some() {
        return Err(AppError::invalid_state("task already started"));
    }
    if task.start_time.is_none() {
        return Err(AppError::invalid_state("task has no start time"));
    }

    task.started_at = Some(now);
    Ok(())
}

pub fn complete(task: &mut Task, now: OffsetDateTime) -> Result<(), AppError> {
    if task.completed {
        return Err(AppError::invalid_state("task already completed"));
    }

    let began = task.started_at.unwrap_or(task.created_at);
    task.completed = true;
    task.completed_at = Some(now);
    task.time_used = format_elapsed(now - began);
    Ok(())
}

/// Reopens a completed task. Elapsed time restarts from `now`; the previous
/// `time_used` is discarded rather than accumulated.
pub fn reactivate(task: &mut Task, now: OffsetDateTime) -> Result<(), AppError> {
    if !task.completed {
        return Err(AppError::invalid_state("task is not completed"));
    }

    task.completed = false;
    task.completed_at = None;
    task.started_at = Some(now);
    task.time_used = ZERO_ELAPSED.to_string();
    Ok(())
}

pub fn toggle(task: &mut Task, now: OffsetDateTime) -> Result<ToggleOutcome, AppError> {
    let start_due = task.start_time.is_some_and(|start| start <= now);
    if !task.completed && task.started_at.is_none() && start_due {
        start(task, now)?;
        return Ok(ToggleOutcome::Started);
    }

    if task.completed {
        reactivate(task, now)?;
        Ok(ToggleOutcome::Reactivated)
    } else {
        complete(task, now)?;
        Ok(ToggleOutcome::Completed)
    }
}

/// Replaces the editable fields. Invalid text leaves the task untouched.
pub fn apply_edit(task: &mut Task, edit: TaskEdit, now: OffsetDateTime) -> Result<(), AppError> {
    let text = validate_text(&edit.text)?;

    task.text = text;
    task.start_time = edit.start_time;
    task.deadline = edit.deadline;
    task.reminder = edit.reminder;
    task.location = normalize_location(edit.location);
    task.starred = edit.starred;

    if task.started_at.is_none() && task.start_time.is_some_and(|start| start <= now) {
        task.started_at = Some(now);
    }

    Ok(())
}

/// Formats as zero-padded `HH:MM:SS`. Negative spans clamp to zero and hours
/// are not wrapped at 24.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.whole_seconds().max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
