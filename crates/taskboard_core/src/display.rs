//! Human-readable relative dates for the presentation layer.

use time::{OffsetDateTime, UtcOffset};

const DAY_MILLIS: i128 = 24 * 60 * 60 * 1000;

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// `today 09:30`, `tomorrow 09:30`, `yesterday 09:30`, `in 3 days 09:30`,
/// otherwise `2025-12-31 09:30`. Calendar days are taken in `offset`.
pub fn format_relative(at: OffsetDateTime, now: OffsetDateTime, offset: UtcOffset) -> String {
    let at_local = at.to_offset(offset);
    let today = now.to_offset(offset).date();
    let clock = format!("{:02}:{:02}", at_local.hour(), at_local.minute());
    let date = at_local.date();

    if date == today {
        return format!("today {clock}");
    }
    if today.next_day() == Some(date) {
        return format!("tomorrow {clock}");
    }
    if today.previous_day() == Some(date) {
        return format!("yesterday {clock}");
    }

    let millis = (at - now).whole_milliseconds();
    let days = if millis > 0 {
        (millis + DAY_MILLIS - 1) / DAY_MILLIS
    } else {
        millis / DAY_MILLIS
    };
    if (1..=7).contains(&days) {
        return format!("in {days} days {clock}");
    }

    format!(
        "{:04}-{:02}-{:02} {clock}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn format_relative_local(at: OffsetDateTime, now: OffsetDateTime) -> String {
    format_relative(at, now, local_offset())
}
