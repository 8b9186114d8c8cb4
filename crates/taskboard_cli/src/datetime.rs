use taskboard_core::error::AppError;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Parses a datetime argument. RFC 3339 carries its own offset; the local
/// forms (`YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD`) are taken
/// in `offset`, a bare date meaning midnight.
pub fn parse_datetime(raw: &str, offset: UtcOffset) -> Result<OffsetDateTime, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("datetime is required"));
    }

    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(parsed);
    }

    let local_formats = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    ];
    for format in local_formats {
        if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, format) {
            return Ok(parsed.assume_offset(offset));
        }
    }

    if let Ok(date) = Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
        return Ok(date.midnight().assume_offset(offset));
    }

    Err(AppError::invalid_input(
        "datetime must be RFC3339, YYYY-MM-DD HH:MM[:SS] or YYYY-MM-DD",
    ))
}
