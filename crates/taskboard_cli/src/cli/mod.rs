use clap::{Parser, Subcommand, ValueEnum};
use taskboard_core::config::ConfigOverrides;
use taskboard_core::filter::Filter;

#[derive(Parser, Debug)]
#[command(name = "taskboard", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: taskboard add "Buy milk" --star
    /// Example: taskboard add "Standup" --start "2025-12-22 09:30" --reminder "2025-12-22 09:25"
    Add {
        text: Option<String>,
        /// Planned start; the task stays "not started" until then
        #[arg(long, value_name = "DATETIME")]
        start: Option<String>,
        #[arg(long, value_name = "DATETIME")]
        deadline: Option<String>,
        #[arg(long, value_name = "DATETIME")]
        reminder: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        star: bool,
    },
    /// Edit a task; fields not given keep their value
    ///
    /// Example: taskboard edit 1734681600000 --text "Buy oat milk"
    /// Example: taskboard edit 1734681600000 --clear reminder --clear location
    Edit {
        id: i64,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, value_name = "DATETIME")]
        start: Option<String>,
        #[arg(long, value_name = "DATETIME")]
        deadline: Option<String>,
        #[arg(long, value_name = "DATETIME")]
        reminder: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, conflicts_with = "unstar")]
        star: bool,
        #[arg(long)]
        unstar: bool,
        /// Remove a field (applied after the other flags)
        #[arg(long, value_enum, value_name = "FIELD")]
        clear: Vec<ClearField>,
    },
    /// Delete a task
    Delete { id: i64 },
    /// Start, complete or reopen a task
    ///
    /// A task whose start time has arrived is started; otherwise completion
    /// is toggled.
    Toggle { id: i64 },
    /// Star or unstar a task
    Star { id: i64 },
    /// Show details of a task
    Show { id: i64 },
    /// List tasks
    ///
    /// Example: taskboard list --filter not-started
    List {
        /// all, active, completed, starred or not-started
        #[arg(long, short, default_value = "all")]
        filter: Filter,
    },
    /// Remove every completed task
    ClearCompleted,
    /// Count tasks by state
    Stats,
    /// Run one reminder pass
    Check,
    /// Run reminder passes every scan interval
    Watch {
        /// Stop after this many passes
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearField {
    Start,
    Deadline,
    Reminder,
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    ReminderWindowMinutes,
    DeadlineWindowMinutes,
    ScanIntervalSeconds,
    SeedDemoTasks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "reminder_window" | "reminder_window_minutes" => {
            ConfigOverrideTarget::ReminderWindowMinutes
        }
        "deadline_window" | "deadline_window_minutes" => {
            ConfigOverrideTarget::DeadlineWindowMinutes
        }
        "scan_interval" | "scan_interval_seconds" => ConfigOverrideTarget::ScanIntervalSeconds,
        "seed_demo" | "seed_demo_tasks" => ConfigOverrideTarget::SeedDemoTasks,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds parsed overrides into a [`ConfigOverrides`], converting values.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();

    for entry in raw {
        let parsed = parse_config_override(entry)?;
        let value = parsed.value.as_str();
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value.clone()),
            ConfigOverrideTarget::ReminderWindowMinutes => {
                overrides.reminder_window_minutes = Some(parse_number(value)?)
            }
            ConfigOverrideTarget::DeadlineWindowMinutes => {
                overrides.deadline_window_minutes = Some(parse_number(value)?)
            }
            ConfigOverrideTarget::ScanIntervalSeconds => {
                overrides.scan_interval_seconds = Some(parse_number(value)?)
            }
            ConfigOverrideTarget::SeedDemoTasks => {
                overrides.seed_demo_tasks = Some(parse_flag(value)?)
            }
        }
    }

    Ok(overrides)
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("'{value}' is not a valid number"))
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("'{value}' is not a valid boolean")),
    }
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Cli, Command, ConfigOverrideTarget, collect_config_overrides, parse_config_override,
    };
    use clap::Parser;
    use taskboard_core::filter::Filter;

    #[test]
    fn parse_config_override_canonicalizes_field_names() {
        let parsed = parse_config_override(" THEME = Midnight ").unwrap();

        assert_eq!(parsed.target, ConfigOverrideTarget::Theme);
        assert_eq!(parsed.value, "Midnight");
    }

    #[test]
    fn parse_config_override_accepts_short_aliases() {
        let parsed = parse_config_override("Reminder-Window=10").unwrap();
        assert_eq!(parsed.target, ConfigOverrideTarget::ReminderWindowMinutes);
        assert_eq!(parsed.value, "10");
    }

    #[test]
    fn parse_config_override_rejects_unknown_fields() {
        let err = parse_config_override("unknown.field=value").unwrap_err();
        assert!(err.contains("unknown config field"));
    }

    #[test]
    fn parse_config_override_rejects_missing_equals() {
        let err = parse_config_override("theme").unwrap_err();
        assert!(err.contains("KEY=VALUE"));
    }

    #[test]
    fn collect_config_overrides_converts_values() {
        let raw = vec![
            "seed_demo=false".to_string(),
            "scan_interval=5".to_string(),
            "theme=noir".to_string(),
        ];
        let overrides = collect_config_overrides(&raw).unwrap();

        assert_eq!(overrides.seed_demo_tasks, Some(false));
        assert_eq!(overrides.scan_interval_seconds, Some(5));
        assert_eq!(overrides.theme.as_deref(), Some("noir"));
        assert_eq!(overrides.reminder_window_minutes, None);
    }

    #[test]
    fn collect_config_overrides_rejects_bad_values() {
        let err = collect_config_overrides(&["deadline_window=soon".to_string()]).unwrap_err();
        assert!(err.contains("not a valid number"));

        let err = collect_config_overrides(&["seed_demo=maybe".to_string()]).unwrap_err();
        assert!(err.contains("not a valid boolean"));
    }

    #[test]
    fn list_filter_parses_from_flag() {
        let cli = Cli::try_parse_from(["taskboard", "list", "--filter", "not-started"]).unwrap();
        match cli.command {
            Command::List { filter } => assert_eq!(filter, Filter::NotStarted),
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["taskboard", "list", "--filter", "soon"]).is_err());
    }

    #[test]
    fn edit_rejects_star_and_unstar_together() {
        let result = Cli::try_parse_from(["taskboard", "edit", "1", "--star", "--unstar"]);
        assert!(result.is_err());
    }
}
