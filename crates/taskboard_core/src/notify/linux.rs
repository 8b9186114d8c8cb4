use crate::error::AppError;
use crate::notify::{DISPLAY_SECONDS, Notifier, activation_argument, alert_body, launch_show};
use crate::reminder::Alert;
use notify_rust::{Notification, Timeout};
use time::OffsetDateTime;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, alert: &Alert) -> Result<(), AppError> {
        let action = activation_argument(alert.task_id);
        let mut notification = Notification::new();
        notification.summary(alert.kind.title());
        notification.body(&alert_body(alert, OffsetDateTime::now_utc()));
        notification.timeout(Timeout::Milliseconds(DISPLAY_SECONDS * 1000));
        notification.action(&action, "Open");

        let handle = notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        let task_id = alert.task_id;
        std::thread::spawn(move || {
            handle.wait_for_action(|selected| {
                if selected == action || selected == "default" {
                    let _ = launch_show(task_id);
                }
            });
        });

        Ok(())
    }
}
