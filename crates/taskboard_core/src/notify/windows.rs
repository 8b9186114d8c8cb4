use crate::error::AppError;
use crate::notify::{
    Notifier, activation_argument, alert_body, launch_show, parse_activation_argument,
};
use crate::reminder::Alert;
use tauri_winrt_notification::{Duration, Toast};
use time::OffsetDateTime;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, alert: &Alert) -> Result<(), AppError> {
        let task_id = alert.task_id;
        let action = activation_argument(task_id);
        let body = alert_body(alert, OffsetDateTime::now_utc());
        let (first_line, second_line) = body.split_once('\n').unwrap_or((body.as_str(), ""));

        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(alert.kind.title())
            .text1(first_line)
            .text2(second_line)
            .duration(Duration::Short)
            .add_button("Open", &action)
            .on_activated(move |args| {
                let target = args
                    .as_deref()
                    .and_then(parse_activation_argument)
                    .unwrap_or(task_id);
                let _ = launch_show(target);
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
