use clap::{CommandFactory, Parser};
use serde::Serialize;
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskboard_cli::cli::{ClearField, Cli, Command, collect_config_overrides};
use taskboard_cli::datetime::parse_datetime;
use taskboard_core::TaskBoard;
use taskboard_core::config::{
    Config, Palette, load_config_with_fallback, merge_overrides, palette_for_theme,
};
use taskboard_core::display::{format_relative, local_offset};
use taskboard_core::error::AppError;
use taskboard_core::lifecycle::ToggleOutcome;
use taskboard_core::model::{NewTask, Task, TaskEdit, TaskStatus};
use taskboard_core::notify::{Notifier, notifier_from_env};
use taskboard_core::reminder::{Alert, ReminderLoop, ScanOutcome, SystemClock};
use taskboard_core::storage::json_store::JsonFileStore;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// What the printers need: colours and the offset dates are shown in.
struct View {
    palette: Palette,
    offset: UtcOffset,
}

impl View {
    fn relative(&self, at: OffsetDateTime, now: OffsetDateTime) -> String {
        format_relative(at, now, self.offset)
    }
}

struct App {
    board: TaskBoard<JsonFileStore>,
    config: Config,
    notifier: Box<dyn Notifier>,
    view: View,
}

impl App {
    fn open(raw_overrides: &[String], offset: UtcOffset) -> Result<Self, AppError> {
        let load = load_config_with_fallback();
        if let Some(err) = load.error {
            eprintln!("WARNING: using default config: {}", err);
        }
        let overrides = collect_config_overrides(raw_overrides).map_err(AppError::invalid_input)?;
        let config = merge_overrides(&load.config, &overrides)?;
        debug!(?config, "config loaded");

        let store = JsonFileStore::open_default()?;
        let board = TaskBoard::open(store, config.board_settings(), OffsetDateTime::now_utc())?;
        debug!(
            store = %board.store().path().display(),
            tasks = board.tasks().len(),
            "board ready"
        );

        Ok(Self {
            board,
            view: View {
                palette: palette_for_theme(config.theme.as_deref()),
                offset,
            },
            config,
            notifier: notifier_from_env()?,
        })
    }

    fn parse_when(&self, raw: Option<&str>) -> Result<Option<OffsetDateTime>, AppError> {
        raw.map(|value| parse_datetime(value, self.view.offset)).transpose()
    }
}

#[derive(Serialize)]
struct TaskView<'a> {
    #[serde(flatten)]
    task: &'a Task,
    status: TaskStatus,
}

impl<'a> TaskView<'a> {
    fn new(task: &'a Task, now: OffsetDateTime) -> Self {
        Self {
            task,
            status: task.status(now),
        }
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "★")]
    star: &'static str,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
    #[tabled(rename = "Reminder")]
    reminder: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Time used")]
    time_used: String,
}

fn task_row(view: &View, task: &Task, now: OffsetDateTime) -> TaskRow {
    let when = |at: Option<OffsetDateTime>| {
        at.map(|value| view.relative(value, now))
            .unwrap_or_else(|| "-".to_string())
    };
    TaskRow {
        id: task.id,
        star: if task.starred { "★" } else { "" },
        text: task.text.clone(),
        status: task.status(now).label(),
        start: when(task.start_time.or(task.started_at)),
        deadline: when(task.deadline),
        reminder: when(task.reminder),
        location: task.location.clone().unwrap_or_else(|| "-".to_string()),
        time_used: if task.completed {
            task.time_used.clone()
        } else {
            "-".to_string()
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn print_task_json(task: &Task, now: OffsetDateTime) -> Result<(), AppError> {
    print_json(&TaskView::new(task, now))
}

fn print_tasks_plain(view: &View, tasks: &[&Task], now: OffsetDateTime) {
    if tasks.is_empty() {
        println!("{}", view.palette.mutedize("No tasks."));
        return;
    }

    let rows: Vec<TaskRow> = tasks.iter().map(|task| task_row(view, task, now)).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}");
}

fn print_task_details(view: &View, task: &Task, now: OffsetDateTime) {
    let label = |name: &str| view.palette.mutedize(&format!("{name:<11}"));
    println!("{} ({})", view.palette.accentize(&task.text), task.id);
    println!("  {}{}", label("status"), task.status(now).label());
    if task.starred {
        println!("  {}yes", label("starred"));
    }
    println!("  {}{}", label("created"), view.relative(task.created_at, now));

    let timestamps = [
        ("start", task.start_time),
        ("started", task.started_at),
        ("deadline", task.deadline),
        ("reminder", task.reminder),
        ("completed", task.completed_at),
    ];
    for (name, value) in timestamps {
        if let Some(at) = value {
            println!("  {}{}", label(name), view.relative(at, now));
        }
    }
    if let Some(location) = task.location.as_deref() {
        println!("  {}{}", label("location"), location);
    }
    if task.completed {
        println!("  {}{}", label("time used"), task.time_used);
    }
}

fn alert_line(view: &View, alert: &Alert, now: OffsetDateTime) -> String {
    format!(
        "{}: {} ({}) {}",
        view.palette.accentize(alert.kind.title()),
        alert.text,
        alert.task_id,
        view.relative(alert.at, now)
    )
}

fn print_scan_outcome(view: &View, outcome: &ScanOutcome, json: bool, now: OffsetDateTime) {
    if json {
        let failures: Vec<_> = outcome
            .failures
            .iter()
            .map(|failure| {
                serde_json::json!({
                    "task_id": failure.alert.task_id,
                    "kind": failure.alert.kind,
                    "error": failure.error.to_string(),
                })
            })
            .collect();
        let payload = serde_json::json!({
            "fired": outcome.fired,
            "failures": failures,
        });
        println!("{payload}");
        return;
    }

    for alert in &outcome.fired {
        println!("{}", alert_line(view, alert, now));
    }
    for failure in &outcome.failures {
        eprintln!(
            "ERROR: could not notify task {}: {}",
            failure.alert.task_id, failure.error
        );
    }
}

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("task {id} not found"))
}

fn toggle_label(outcome: ToggleOutcome) -> &'static str {
    match outcome {
        ToggleOutcome::Started => "started",
        ToggleOutcome::Completed => "completed",
        ToggleOutcome::Reactivated => "reactivated",
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(app: &mut App, command: Command, json: bool) -> Result<(), AppError> {
    let now = OffsetDateTime::now_utc();

    match command {
        Command::Add {
            text,
            start,
            deadline,
            reminder,
            location,
            star,
        } => {
            let text = match text {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("text is required")),
            };
            let new_task = NewTask {
                text,
                start_time: app.parse_when(start.as_deref())?,
                deadline: app.parse_when(deadline.as_deref())?,
                reminder: app.parse_when(reminder.as_deref())?,
                location,
                starred: star,
            };

            let task = app.board.add(new_task, now)?;
            if json {
                print_task_json(&task, now)?;
            } else {
                println!("Added task: {} ({})", task.text, task.id);
            }
        }
        Command::Edit {
            id,
            text,
            start,
            deadline,
            reminder,
            location,
            star,
            unstar,
            clear,
        } => {
            let current = app.board.get(id).ok_or_else(|| not_found(id))?;
            let mut edit = TaskEdit::from_task(current);
            if let Some(text) = text {
                edit.text = text;
            }
            if let Some(at) = app.parse_when(start.as_deref())? {
                edit.start_time = Some(at);
            }
            if let Some(at) = app.parse_when(deadline.as_deref())? {
                edit.deadline = Some(at);
            }
            if let Some(at) = app.parse_when(reminder.as_deref())? {
                edit.reminder = Some(at);
            }
            if location.is_some() {
                edit.location = location;
            }
            if star {
                edit.starred = true;
            }
            if unstar {
                edit.starred = false;
            }
            for field in clear {
                match field {
                    ClearField::Start => edit.start_time = None,
                    ClearField::Deadline => edit.deadline = None,
                    ClearField::Reminder => edit.reminder = None,
                    ClearField::Location => edit.location = None,
                }
            }

            let task = app.board.edit(id, edit, now)?.ok_or_else(|| not_found(id))?;
            if json {
                print_task_json(&task, now)?;
            } else {
                println!("Updated task: {} ({})", task.text, task.id);
            }
        }
        Command::Delete { id } => {
            let task = app.board.delete(id)?.ok_or_else(|| not_found(id))?;
            if json {
                print_task_json(&task, now)?;
            } else {
                println!("Deleted task: {} ({})", task.text, task.id);
            }
        }
        Command::Toggle { id } => {
            let (task, outcome) = app.board.toggle(id, now)?.ok_or_else(|| not_found(id))?;
            if json {
                print_json(&serde_json::json!({
                    "outcome": toggle_label(outcome),
                    "task": TaskView::new(&task, now),
                }))?;
            } else {
                match outcome {
                    ToggleOutcome::Started => {
                        println!("Started task: {} ({})", task.text, task.id)
                    }
                    ToggleOutcome::Completed => println!(
                        "Completed task: {} ({}) in {}",
                        task.text, task.id, task.time_used
                    ),
                    ToggleOutcome::Reactivated => {
                        println!("Reactivated task: {} ({})", task.text, task.id)
                    }
                }
            }
        }
        Command::Star { id } => {
            let task = app.board.toggle_star(id)?.ok_or_else(|| not_found(id))?;
            if json {
                print_task_json(&task, now)?;
            } else if task.starred {
                println!("Starred task: {} ({})", task.text, task.id);
            } else {
                println!("Unstarred task: {} ({})", task.text, task.id);
            }
        }
        Command::Show { id } => {
            let task = app.board.get(id).ok_or_else(|| not_found(id))?;
            if json {
                print_task_json(task, now)?;
            } else {
                print_task_details(&app.view, task, now);
            }
        }
        Command::List { filter } => {
            app.board.set_filter(filter);
            let tasks = app.board.visible(now);
            if json {
                let views: Vec<TaskView> =
                    tasks.iter().map(|task| TaskView::new(task, now)).collect();
                print_json(&views)?;
            } else {
                print_tasks_plain(&app.view, &tasks, now);
            }
        }
        Command::ClearCompleted => {
            let cleared = app.board.clear_completed()?;
            if json {
                print_json(&serde_json::json!({ "cleared": cleared }))?;
            } else {
                println!("Cleared {cleared} completed task(s)");
            }
        }
        Command::Stats => {
            let stats = app.board.stats();
            if json {
                print_json(&stats)?;
            } else {
                println!(
                    "{} tasks: {} active, {} completed",
                    stats.total, stats.active, stats.completed
                );
            }
        }
        Command::Check => {
            let outcome = app.board.scan_reminders(app.notifier.as_ref(), now);
            print_scan_outcome(&app.view, &outcome, json, now);
        }
        Command::Watch { ticks } => {
            let mut reminder_loop = ReminderLoop::new(app.config.scan_interval());
            if let Some(ticks) = ticks {
                if ticks == 0 {
                    return Err(AppError::invalid_input("ticks must be positive"));
                }
                reminder_loop = reminder_loop.with_max_passes(ticks);
            }

            let view = &app.view;
            reminder_loop.run(
                &mut app.board,
                app.notifier.as_ref(),
                &SystemClock,
                |outcome| print_scan_outcome(view, outcome, json, OffsetDateTime::now_utc()),
            );
        }
    }

    Ok(())
}

/// Runs a reminder pass if one is owed and reports what fired.
fn scan_if_due(
    app: &mut App,
    reminder_loop: &ReminderLoop,
    last_scan: &mut Option<OffsetDateTime>,
) {
    let now = OffsetDateTime::now_utc();
    if !reminder_loop.pass_due(*last_scan, now) {
        return;
    }
    let outcome = app.board.scan_reminders(app.notifier.as_ref(), now);
    *last_scan = Some(now);
    print_scan_outcome(&app.view, &outcome, false, now);
}

fn run_interactive(offset: UtcOffset) -> Result<(), AppError> {
    let mut app = App::open(&[], offset)?;
    let reminder_loop = ReminderLoop::new(app.config.scan_interval());
    let mut last_scan = None;
    scan_if_due(&mut app, &reminder_loop, &mut last_scan);

    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskboard".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            warn!("config overrides are ignored inside an interactive session");
            eprintln!("WARNING: config overrides only apply when passed on the command line");
        }

        if let Err(err) = app.board.reload() {
            warn!(error = %err, "could not reload tasks before command");
        }
        scan_if_due(&mut app, &reminder_loop, &mut last_scan);
        if let Err(err) = run_command(&mut app, cli.command, cli.json) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn init_tracing() {
    // Tracing is opt-in via RUST_LOG and goes to stderr.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() {
    // Resolve the local offset before anything can spawn a thread.
    let offset = local_offset();
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive(offset) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let result = App::open(&cli.config_override, offset)
        .and_then(|mut app| run_command(&mut app, cli.command, cli.json));
    if let Err(err) = result {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
