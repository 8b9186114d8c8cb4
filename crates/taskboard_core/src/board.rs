//! The task store: the single owner of the task list and the fired-alert set.
//!
//! Tasks are kept newest first. Every mutation writes the task list back to
//! the key-value store before returning.

use crate::error::AppError;
use crate::filter::{self, Filter};
use crate::lifecycle::{self, ToggleOutcome};
use crate::model::{NewTask, Task, TaskEdit, ZERO_ELAPSED};
use crate::notify::Notifier;
use crate::reminder::{self, AlertFailure, FiredSet, ScanOutcome, ScanWindows};
use crate::storage::KeyValueStore;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub const TASKS_KEY: &str = "todos";
pub const FIRED_KEY: &str = "remindedTasks";
pub const DEMO_FLAG_KEY: &str = "hasSeenDemo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSettings {
    pub windows: ScanWindows,
    pub seed_demo_tasks: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            windows: ScanWindows::default(),
            seed_demo_tasks: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

pub struct TaskBoard<S: KeyValueStore> {
    store: S,
    settings: BoardSettings,
    tasks: Vec<Task>,
    fired: FiredSet,
    filter: Filter,
}

impl<S: KeyValueStore> TaskBoard<S> {
    /// Loads tasks and fired alerts from `store`, seeding the demo tasks the
    /// first time a store is opened empty.
    pub fn open(store: S, settings: BoardSettings, now: OffsetDateTime) -> Result<Self, AppError> {
        let tasks = load_tasks(&store)?;
        let fired = load_fired(&store)?;

        let mut board = Self {
            store,
            settings,
            tasks,
            fired,
            filter: Filter::default(),
        };
        board.seed_demo_once(now)?;
        debug!(tasks = board.tasks.len(), fired = board.fired.len(), "board opened");
        Ok(board)
    }

    fn seed_demo_once(&mut self, now: OffsetDateTime) -> Result<(), AppError> {
        if self.store.get(DEMO_FLAG_KEY)?.is_some() {
            return Ok(());
        }

        if self.settings.seed_demo_tasks && self.tasks.is_empty() {
            self.tasks = demo_tasks(now);
            self.persist_tasks()?;
            info!(count = self.tasks.len(), "seeded demo tasks");
        }
        self.store.set(DEMO_FLAG_KEY, "true")
    }

    /// Re-reads tasks and fired alerts written by other processes sharing
    /// the store. Fired keys already held in memory are kept.
    pub fn reload(&mut self) -> Result<(), AppError> {
        let tasks = load_tasks(&self.store)?;
        let stored = load_fired(&self.store)?;
        self.tasks = tasks;
        for key in stored.keys() {
            self.fired.insert(key.clone());
        }
        debug!(tasks = self.tasks.len(), fired = self.fired.len(), "board reloaded");
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn fired(&self) -> &FiredSet {
        &self.fired
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Tasks under the current filter, newest first.
    pub fn visible(&self, now: OffsetDateTime) -> Vec<&Task> {
        filter::project(&self.tasks, self.filter, now)
    }

    pub fn stats(&self) -> Stats {
        let completed = self.tasks.iter().filter(|task| task.completed).count();
        Stats {
            total: self.tasks.len(),
            active: self.tasks.len() - completed,
            completed,
        }
    }

    pub fn add(&mut self, new_task: NewTask, now: OffsetDateTime) -> Result<Task, AppError> {
        let id = self.next_id(now);
        let task = lifecycle::create(id, new_task, now)?;
        self.tasks.insert(0, task.clone());
        self.persist_tasks()?;
        debug!(id, "task added");
        Ok(task)
    }

    /// Creation timestamp in milliseconds, bumped past any id already taken.
    fn next_id(&self, now: OffsetDateTime) -> i64 {
        let candidate = (now.unix_timestamp_nanos() / 1_000_000) as i64;
        if self.get(candidate).is_none() {
            return candidate;
        }
        self.tasks
            .iter()
            .map(|task| task.id)
            .max()
            .map_or(candidate, |max| max + 1)
    }

    pub fn edit(
        &mut self,
        id: i64,
        edit: TaskEdit,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, AppError> {
        self.mutate(id, |task| lifecycle::apply_edit(task, edit, now))
            .map(|updated| updated.map(|(task, ())| task))
    }

    pub fn toggle(
        &mut self,
        id: i64,
        now: OffsetDateTime,
    ) -> Result<Option<(Task, ToggleOutcome)>, AppError> {
        self.mutate(id, |task| lifecycle::toggle(task, now))
    }

    pub fn toggle_star(&mut self, id: i64) -> Result<Option<Task>, AppError> {
        self.mutate(id, |task| {
            task.starred = !task.starred;
            Ok(())
        })
        .map(|updated| updated.map(|(task, ())| task))
    }

    pub fn delete(&mut self, id: i64) -> Result<Option<Task>, AppError> {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            debug!(id, "delete skipped: no such task");
            return Ok(None);
        };

        let removed = self.tasks.remove(index);
        self.persist_tasks()?;
        Ok(Some(removed))
    }

    /// Removes every completed task and returns how many were dropped.
    pub fn clear_completed(&mut self) -> Result<usize, AppError> {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.completed);
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.persist_tasks()?;
        }
        Ok(removed)
    }

    /// Runs `change` on the task with `id` and persists on success. A missing
    /// id is a no-op; a failed change leaves the task as it was.
    fn mutate<T, F>(&mut self, id: i64, change: F) -> Result<Option<(Task, T)>, AppError>
    where
        F: FnOnce(&mut Task) -> Result<T, AppError>,
    {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!(id, "no such task");
            return Ok(None);
        };

        let mut draft = task.clone();
        let result = change(&mut draft)?;
        *task = draft.clone();
        self.persist_tasks()?;
        Ok(Some((draft, result)))
    }

    /// One reminder pass: notifies every alert that is due and records the
    /// delivered ones so they never fire again.
    pub fn scan_reminders(&mut self, notifier: &dyn Notifier, now: OffsetDateTime) -> ScanOutcome {
        let alerts = reminder::due_alerts(&self.tasks, &self.fired, self.settings.windows, now);
        let mut outcome = ScanOutcome::default();

        for alert in alerts {
            match notifier.notify(&alert) {
                Ok(()) => {
                    info!(task_id = alert.task_id, kind = ?alert.kind, "alert fired");
                    self.fired.insert(alert.key());
                    outcome.fired.push(alert);
                }
                Err(error) => {
                    warn!(task_id = alert.task_id, %error, "alert delivery failed");
                    outcome.failures.push(AlertFailure { alert, error });
                }
            }
        }

        if !outcome.fired.is_empty()
            && let Err(error) = self.persist_fired()
        {
            warn!(%error, "could not persist fired alerts");
        }

        outcome
    }

    fn persist_tasks(&mut self) -> Result<(), AppError> {
        let raw = serde_json::to_string(&self.tasks)?;
        self.store.set(TASKS_KEY, &raw)
    }

    fn persist_fired(&mut self) -> Result<(), AppError> {
        let raw = serde_json::to_string(&self.fired)?;
        self.store.set(FIRED_KEY, &raw)
    }
}

fn load_tasks<S: KeyValueStore>(store: &S) -> Result<Vec<Task>, AppError> {
    match store.get(TASKS_KEY)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|err| AppError::invalid_data(format!("stored tasks: {err}"))),
        None => Ok(Vec::new()),
    }
}

fn load_fired<S: KeyValueStore>(store: &S) -> Result<FiredSet, AppError> {
    match store.get(FIRED_KEY)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|err| AppError::invalid_data(format!("stored alerts: {err}"))),
        None => Ok(FiredSet::default()),
    }
}

fn demo_tasks(now: OffsetDateTime) -> Vec<Task> {
    let texts = [
        ("Welcome to your task list!", false),
        ("Toggle a task to mark it completed", false),
        ("Use filters to view tasks by status", true),
    ];

    texts
        .into_iter()
        .zip(1..)
        .map(|((text, completed), id)| Task {
            id,
            text: text.to_string(),
            completed,
            starred: false,
            created_at: now,
            start_time: None,
            started_at: Some(now),
            deadline: None,
            reminder: None,
            location: None,
            completed_at: completed.then_some(now),
            time_used: ZERO_ELAPSED.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{BoardSettings, DEMO_FLAG_KEY, FIRED_KEY, TASKS_KEY, TaskBoard};
    use crate::error::AppError;
    use crate::filter::Filter;
    use crate::lifecycle::ToggleOutcome;
    use crate::model::{NewTask, Task, TaskEdit, TaskStatus};
    use crate::notify::Notifier;
    use crate::reminder::{Alert, AlertKind};
    use crate::storage::{KeyValueStore, MemoryStore, SharedStore};
    use std::cell::RefCell;
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    #[derive(Default)]
    struct RecordingNotifier {
        alerts: RefCell<Vec<Alert>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, alert: &Alert) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::io("notification daemon unavailable"));
            }
            self.alerts.borrow_mut().push(alert.clone());
            Ok(())
        }
    }

    /// Store whose writes always fail.
    #[derive(Default)]
    struct BrokenStore {
        inner: MemoryStore,
        broken: bool,
    }

    impl KeyValueStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<String>, AppError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
            if self.broken {
                return Err(AppError::io("disk full"));
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), AppError> {
            self.inner.remove(key)
        }
    }

    fn now() -> OffsetDateTime {
        datetime!(2025-12-20 10:00 UTC)
    }

    fn empty_board() -> TaskBoard<MemoryStore> {
        let store = MemoryStore::new().with_entry(DEMO_FLAG_KEY, "true");
        TaskBoard::open(store, BoardSettings::default(), now()).unwrap()
    }

    fn stored_tasks(board: &TaskBoard<MemoryStore>) -> Vec<Task> {
        let raw = board.store().get(TASKS_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn first_open_seeds_demo_tasks_once() {
        let board = TaskBoard::open(MemoryStore::new(), BoardSettings::default(), now()).unwrap();
        assert_eq!(board.tasks().len(), 3);
        assert_eq!(board.stats().completed, 1);
        assert_eq!(
            board.store().get(DEMO_FLAG_KEY).unwrap().as_deref(),
            Some("true")
        );

        let mut store = board.store().clone();
        store.set(TASKS_KEY, "[]").unwrap();
        let reopened = TaskBoard::open(store, BoardSettings::default(), now()).unwrap();
        assert!(reopened.tasks().is_empty());
    }

    #[test]
    fn seeding_can_be_disabled_but_flag_is_still_set() {
        let settings = BoardSettings {
            seed_demo_tasks: false,
            ..BoardSettings::default()
        };
        let board = TaskBoard::open(MemoryStore::new(), settings, now()).unwrap();

        assert!(board.tasks().is_empty());
        assert!(board.store().get(DEMO_FLAG_KEY).unwrap().is_some());
    }

    #[test]
    fn existing_tasks_are_never_replaced_by_demo() {
        let mut board = empty_board();
        board.add(NewTask::new("mine"), now()).unwrap();
        let mut store = board.store().clone();
        store.remove(DEMO_FLAG_KEY).unwrap();

        let reopened = TaskBoard::open(store, BoardSettings::default(), now()).unwrap();
        assert_eq!(reopened.tasks().len(), 1);
        assert_eq!(reopened.tasks()[0].text, "mine");
    }

    #[test]
    fn add_prepends_and_persists() {
        let mut board = empty_board();
        let first = board.add(NewTask::new("Buy milk"), now()).unwrap();
        let second = board
            .add(NewTask::new("Call mom"), now() + Duration::seconds(1))
            .unwrap();

        assert!(!first.completed);
        assert!(!first.starred);
        assert_eq!(board.tasks()[0].id, second.id);
        assert_eq!(board.tasks()[1].id, first.id);
        assert_eq!(stored_tasks(&board).len(), 2);
    }

    #[test]
    fn add_rejects_invalid_text_without_touching_store() {
        let mut board = empty_board();
        let too_long = "x".repeat(101);
        for text in ["", " ", too_long.as_str()] {
            let err = board.add(NewTask::new(text), now()).unwrap_err();
            assert_eq!(err.code(), "invalid_input");
        }
        assert!(board.tasks().is_empty());
        assert_eq!(board.store().get(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn ids_stay_unique_within_the_same_millisecond() {
        let mut board = empty_board();
        let first = board.add(NewTask::new("one"), now()).unwrap();
        let second = board.add(NewTask::new("two"), now()).unwrap();

        assert_eq!(first.id, now().unix_timestamp() * 1000);
        assert_eq!(second.id, first.id + 1);
    }

    #[test]
    fn toggle_round_trip_resets_time_used() {
        let mut board = empty_board();
        let task = board.add(NewTask::new("Buy milk"), now()).unwrap();

        let (done, outcome) = board
            .toggle(task.id, now() + Duration::seconds(90))
            .unwrap()
            .unwrap();
        assert_eq!(outcome, ToggleOutcome::Completed);
        assert!(done.completed);
        assert_eq!(done.time_used, "00:01:30");

        let (reopened, outcome) = board
            .toggle(task.id, now() + Duration::minutes(5))
            .unwrap()
            .unwrap();
        assert_eq!(outcome, ToggleOutcome::Reactivated);
        assert!(!reopened.completed);
        assert_eq!(reopened.time_used, "00:00:00");
        assert_eq!(reopened.completed_at, None);
        assert_eq!(stored_tasks(&board)[0], reopened);
    }

    #[test]
    fn not_started_task_moves_to_in_progress_on_toggle() {
        let mut board = empty_board();
        let mut new_task = NewTask::new("standup");
        new_task.start_time = Some(now() + Duration::hours(1));
        let task = board.add(new_task, now()).unwrap();

        assert_eq!(board.filter(), Filter::All);
        board.set_filter(Filter::NotStarted);
        assert_eq!(board.filter(), Filter::NotStarted);
        assert_eq!(board.visible(now()).len(), 1);

        let later = now() + Duration::hours(2);
        assert!(board.visible(later).is_empty());
        let (started, outcome) = board.toggle(task.id, later).unwrap().unwrap();

        assert_eq!(outcome, ToggleOutcome::Started);
        assert_eq!(started.started_at, Some(later));
        assert_eq!(started.status(later), TaskStatus::InProgress);
        assert!(!started.completed);
    }

    #[test]
    fn unknown_ids_are_silent_no_ops() {
        let mut board = empty_board();
        board.add(NewTask::new("keep"), now()).unwrap();
        let before = board.tasks().to_vec();

        assert!(board.toggle(42, now()).unwrap().is_none());
        assert!(board.toggle_star(42).unwrap().is_none());
        assert!(board.delete(42).unwrap().is_none());
        assert!(
            board
                .edit(42, TaskEdit::default(), now())
                .unwrap()
                .is_none()
        );
        assert_eq!(board.tasks(), before.as_slice());
    }

    #[test]
    fn edit_replaces_fields_and_keeps_identity() {
        let mut board = empty_board();
        let task = board.add(NewTask::new("draft"), now()).unwrap();

        let mut edit = TaskEdit::from_task(&task);
        edit.text = "final".to_string();
        edit.location = Some(" office ".to_string());
        edit.deadline = Some(now() + Duration::days(1));
        let updated = board
            .edit(task.id, edit, now() + Duration::minutes(1))
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, task.id);
        assert_eq!(updated.created_at, task.created_at);
        assert_eq!(updated.text, "final");
        assert_eq!(updated.location.as_deref(), Some("office"));
        assert_eq!(stored_tasks(&board)[0], updated);
    }

    #[test]
    fn invalid_edit_leaves_task_unchanged() {
        let mut board = empty_board();
        let task = board.add(NewTask::new("draft"), now()).unwrap();

        let mut edit = TaskEdit::from_task(&task);
        edit.text = "   ".to_string();
        edit.starred = true;
        let err = board.edit(task.id, edit, now()).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(board.get(task.id), Some(&task));
    }

    #[test]
    fn toggle_star_and_starred_filter() {
        let mut board = empty_board();
        let task = board.add(NewTask::new("important"), now()).unwrap();
        board.add(NewTask::new("other"), now()).unwrap();

        let starred = board.toggle_star(task.id).unwrap().unwrap();
        assert!(starred.starred);
        board.toggle(task.id, now()).unwrap();

        board.set_filter(Filter::Starred);
        let visible = board.visible(now());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, task.id);
        assert!(visible[0].completed);
    }

    #[test]
    fn delete_and_clear_completed() {
        let mut board = empty_board();
        let a = board.add(NewTask::new("a"), now()).unwrap();
        let b = board.add(NewTask::new("b"), now()).unwrap();
        let c = board.add(NewTask::new("c"), now()).unwrap();

        assert_eq!(board.delete(a.id).unwrap().unwrap().id, a.id);
        board.toggle(b.id, now()).unwrap();

        assert_eq!(board.clear_completed().unwrap(), 1);
        assert_eq!(board.clear_completed().unwrap(), 0);
        let ids: Vec<i64> = stored_tasks(&board).iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![c.id]);
        assert_eq!(
            board.stats(),
            super::Stats {
                total: 1,
                active: 1,
                completed: 0
            }
        );
    }

    #[test]
    fn reminder_fires_once_across_passes() {
        let mut board = empty_board();
        let mut new_task = NewTask::new("call back");
        new_task.reminder = Some(now() + Duration::minutes(3));
        let task = board.add(new_task, now()).unwrap();
        let notifier = RecordingNotifier::default();

        let first = board.scan_reminders(&notifier, now());
        let second = board.scan_reminders(&notifier, now() + Duration::minutes(1));

        assert_eq!(first.fired.len(), 1);
        assert!(second.fired.is_empty());
        assert_eq!(notifier.alerts.borrow().len(), 1);
        assert_eq!(notifier.alerts.borrow()[0].kind, AlertKind::Reminder);

        let raw = board.store().get(FIRED_KEY).unwrap().unwrap();
        assert_eq!(raw, format!("[\"{}\"]", task.id));
    }

    #[test]
    fn reminder_and_deadline_are_tracked_separately() {
        let mut board = empty_board();
        let mut new_task = NewTask::new("report");
        new_task.reminder = Some(now() + Duration::minutes(2));
        new_task.deadline = Some(now() + Duration::minutes(30));
        let task = board.add(new_task, now()).unwrap();

        let outcome = board.scan_reminders(&RecordingNotifier::default(), now());
        assert_eq!(outcome.fired.len(), 2);
        assert!(board.fired().contains(&task.id.to_string()));
        assert!(board.fired().contains(&format!("deadline-{}", task.id)));
    }

    #[test]
    fn failed_delivery_is_retried_on_next_pass() {
        let mut board = empty_board();
        let mut new_task = NewTask::new("retry");
        new_task.reminder = Some(now() + Duration::minutes(4));
        board.add(new_task, now()).unwrap();

        let failing = RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        };
        let outcome = board.scan_reminders(&failing, now());
        assert!(outcome.fired.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert!(board.fired().is_empty());

        let outcome =
            board.scan_reminders(&RecordingNotifier::default(), now() + Duration::minutes(1));
        assert_eq!(outcome.fired.len(), 1);
    }

    #[test]
    fn fired_keys_survive_deletion_and_reopen() {
        let mut board = empty_board();
        let mut new_task = NewTask::new("gone");
        new_task.reminder = Some(now() + Duration::minutes(1));
        let task = board.add(new_task, now()).unwrap();
        board.scan_reminders(&RecordingNotifier::default(), now());
        board.delete(task.id).unwrap();

        let store = board.store().clone();
        let reopened = TaskBoard::open(store, BoardSettings::default(), now()).unwrap();
        assert!(reopened.fired().contains(&task.id.to_string()));
    }

    #[test]
    fn reload_picks_up_tasks_added_through_another_board() {
        let store = SharedStore::default();
        store.clone().set(DEMO_FLAG_KEY, "true").unwrap();
        let mut watcher = TaskBoard::open(store.clone(), BoardSettings::default(), now()).unwrap();
        let mut writer = TaskBoard::open(store.clone(), BoardSettings::default(), now()).unwrap();

        let mut new_task = NewTask::new("written elsewhere");
        new_task.reminder = Some(now() + Duration::minutes(2));
        let task = writer.add(new_task, now()).unwrap();
        assert!(watcher.tasks().is_empty());

        watcher.reload().unwrap();
        assert_eq!(watcher.tasks().len(), 1);
        let outcome = watcher.scan_reminders(&RecordingNotifier::default(), now());
        assert_eq!(outcome.fired.len(), 1);

        writer.reload().unwrap();
        writer.add(NewTask::new("second"), now()).unwrap();
        watcher.reload().unwrap();
        assert_eq!(watcher.tasks().len(), 2);
        assert!(writer.fired().contains(&task.id.to_string()));

        store.clone().remove(FIRED_KEY).unwrap();
        watcher.reload().unwrap();
        assert!(watcher.fired().contains(&task.id.to_string()));
    }

    #[test]
    fn storage_failure_is_reported_but_mutation_stands() {
        let store = BrokenStore {
            inner: MemoryStore::new().with_entry(DEMO_FLAG_KEY, "true"),
            broken: false,
        };
        let mut board = TaskBoard::open(store, BoardSettings::default(), now()).unwrap();
        board.store.broken = true;

        let err = board.add(NewTask::new("unsaved"), now()).unwrap_err();
        assert_eq!(err.code(), "io_error");
        assert_eq!(board.tasks().len(), 1);
    }

    #[test]
    fn fired_set_persistence_failure_is_not_fatal() {
        let store = BrokenStore {
            inner: MemoryStore::new().with_entry(DEMO_FLAG_KEY, "true"),
            broken: false,
        };
        let mut board = TaskBoard::open(store, BoardSettings::default(), now()).unwrap();
        let mut new_task = NewTask::new("ping");
        new_task.reminder = Some(now() + Duration::minutes(1));
        board.add(new_task, now()).unwrap();
        board.store.broken = true;

        let outcome = board.scan_reminders(&RecordingNotifier::default(), now());
        assert_eq!(outcome.fired.len(), 1);
        assert_eq!(board.fired().len(), 1);
    }

    #[test]
    fn corrupt_task_entry_is_invalid_data() {
        let store = MemoryStore::new().with_entry(TASKS_KEY, "{not json");
        let err = match TaskBoard::open(store, BoardSettings::default(), now()) {
            Ok(_) => panic!("corrupt tasks should not load"),
            Err(err) => err,
        };
        assert_eq!(err.code(), "invalid_data");
    }
}
