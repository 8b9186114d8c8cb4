use crate::display::format_relative_local;
use crate::error::AppError;
use crate::reminder::{Alert, AlertKind};
use time::OffsetDateTime;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

pub const DISABLE_ENV_VAR: &str = "TASKBOARD_DISABLE_NOTIFICATIONS";

/// Seconds a desktop notification stays visible before it is dismissed.
pub const DISPLAY_SECONDS: u32 = 10;

pub trait Notifier {
    fn notify(&self, alert: &Alert) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _alert: &Alert) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::InvalidData(_) => Ok(Box::new(NoopNotifier)),
            other => Err(other),
        },
    }
}

const ACTION_PREFIX: &str = "show:";

pub fn activation_argument(task_id: i64) -> String {
    format!("{ACTION_PREFIX}{task_id}")
}

pub fn parse_activation_argument(argument: &str) -> Option<i64> {
    argument
        .strip_prefix(ACTION_PREFIX)
        .and_then(|id| id.trim().parse().ok())
}

/// Re-launches the current executable as `show <id>`.
pub fn launch_show(task_id: i64) -> Result<(), AppError> {
    let exe = std::env::current_exe().map_err(|err| AppError::io(err.to_string()))?;
    std::process::Command::new(exe)
        .arg("show")
        .arg(task_id.to_string())
        .spawn()
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(())
}

/// Notification body: the task text followed by when it is due.
pub fn alert_body(alert: &Alert, now: OffsetDateTime) -> String {
    let when = format_relative_local(alert.at, now);
    match alert.kind {
        AlertKind::Reminder => format!("{}\nReminder at {}", alert.text, when),
        AlertKind::Deadline => format!("{}\nDue {}", alert.text, when),
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
