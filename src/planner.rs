//! One planner session: the entity store, the viewed week and the
//! collaborators that mirror and export it.
//!
//! Each public method corresponds to a single user action. Mutations that
//! succeed are mirrored to storage in the background; rejected input and
//! failed exports are reported through the [`Notifier`].

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::calendar::{ViewContext, WeekOption};
use crate::config::AppConfig;
use crate::error::StoreError;
use crate::export::Exporter;
use crate::model::{ClassPatch, DEFAULT_CLASS_COLOR, Exam, ExamPatch, NotePatch, ReminderPolicy};
use crate::persistence::{Persister, Slot, SlotStorage, load_snapshot};
use crate::resolver::{DayAgenda, agenda_for, exams_chronological, week_agenda};
use crate::store::EntityStore;
use crate::traits::{Clock, Notifier, Sharer};

/// Side-effecting collaborators of a session.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn SlotStorage>,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
    pub sharer: Arc<dyn Sharer>,
}

/// Settings a session takes from configuration.
#[derive(Debug, Clone)]
pub struct PlannerOptions {
    pub class_color: String,
    pub reminder: ReminderPolicy,
    pub export_dir: PathBuf,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            class_color: DEFAULT_CLASS_COLOR.to_string(),
            reminder: ReminderPolicy::Off,
            export_dir: PathBuf::from("."),
        }
    }
}

impl From<&AppConfig> for PlannerOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            class_color: config.defaults.class_color.clone(),
            reminder: config.defaults.reminder,
            export_dir: config.export.output_dir.clone(),
        }
    }
}

pub struct Planner {
    store: EntityStore,
    view: ViewContext,
    persister: Persister,
    exporter: Exporter,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    default_reminder: ReminderPolicy,
}

impl Planner {
    /// Load the stored collections and start viewing today.
    pub fn open(deps: Collaborators, options: PlannerOptions, handle: Handle) -> Self {
        let snapshot = load_snapshot(deps.storage.as_ref());
        let store = EntityStore::from_snapshot(snapshot, Arc::clone(&deps.clock))
            .with_default_color(options.class_color);
        let view = ViewContext::for_date(deps.clock.today());
        tracing::debug!(week = %view.week_start(), "planner session opened");

        Self {
            store,
            view,
            persister: Persister::new(deps.storage, handle),
            exporter: Exporter::new(options.export_dir, deps.sharer),
            notifier: deps.notifier,
            clock: deps.clock,
            default_reminder: options.reminder,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn view(&self) -> &ViewContext {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewContext {
        &mut self.view
    }

    // ==================== Reads ====================

    /// Agenda for the reference date.
    pub fn day(&self) -> DayAgenda<'_> {
        agenda_for(&self.store, self.view.reference_date())
    }

    pub fn week(&self) -> Vec<DayAgenda<'_>> {
        week_agenda(&self.store, self.view.week_start())
    }

    pub fn week_options(&self, before: u32, after: u32) -> Vec<WeekOption> {
        self.view.week_options(before, after)
    }

    pub fn exam_list(&self) -> Vec<&Exam> {
        exams_chronological(self.store.exams())
    }

    // ==================== Classes ====================

    /// Create (no `id`) or edit a class. New classes land on the selected
    /// weekday unless the patch names one.
    pub fn save_class(&mut self, id: Option<&str>, mut patch: ClassPatch) -> Result<String, StoreError> {
        let result = match id {
            Some(id) => self.store.update_class(id, patch).map(|()| id.to_string()),
            None => {
                patch.weekday.get_or_insert(self.view.selected_day());
                patch.reminder.get_or_insert(self.default_reminder);
                self.store.create_class(patch)
            }
        };
        self.settle(result, Slot::Schedule)
    }

    pub fn delete_class(&mut self, id: &str) -> bool {
        let removed = self.store.delete_class(id);
        if removed {
            self.persister.persist(&self.store, Slot::Schedule);
        }
        removed
    }

    // ==================== Exams ====================

    pub fn save_exam(&mut self, id: Option<&str>, mut patch: ExamPatch) -> Result<String, StoreError> {
        let result = match id {
            Some(id) => self.store.update_exam(id, patch).map(|()| id.to_string()),
            None => {
                patch.reminder.get_or_insert(self.default_reminder);
                self.store.create_exam(patch)
            }
        };
        self.settle(result, Slot::Exams)
    }

    pub fn delete_exam(&mut self, id: &str) -> bool {
        let removed = self.store.delete_exam(id);
        if removed {
            self.persister.persist(&self.store, Slot::Exams);
        }
        removed
    }

    // ==================== Notes ====================

    pub fn save_note(&mut self, id: Option<&str>, mut patch: NotePatch) -> Result<String, StoreError> {
        let result = match id {
            Some(id) => self.store.update_note(id, patch).map(|()| id.to_string()),
            None => {
                patch.reminder.get_or_insert(self.default_reminder);
                self.store.create_note(patch)
            }
        };
        self.settle(result, Slot::Notes)
    }

    pub fn delete_note(&mut self, id: &str) -> bool {
        let removed = self.store.delete_note(id);
        if removed {
            self.persister.persist(&self.store, Slot::Notes);
        }
        removed
    }

    /// Persist on success, report on failure.
    fn settle(&self, result: Result<String, StoreError>, slot: Slot) -> Result<String, StoreError> {
        match &result {
            Ok(_) => self.persister.persist(&self.store, slot),
            Err(e) => self.report("Invalid input", &e.to_string()),
        }
        result
    }

    fn report(&self, title: &str, body: &str) {
        if let Err(e) = self.notifier.notify(title, body) {
            tracing::warn!("failed to deliver notice: {:#}", e);
        }
    }

    // ==================== Export ====================

    /// Export the viewed week. Failures become a single notice.
    pub async fn export_week(&self) -> Option<PathBuf> {
        match self.exporter.export_week(&self.store, self.view.week_start()).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!("timetable export failed: {}", e);
                self.report("Export failed", "Could not export the timetable");
                None
            }
        }
    }

    /// Export the full exam list. Failures become a single notice.
    pub async fn export_exams(&self) -> Option<PathBuf> {
        match self.exporter.export_exams(&self.store, self.clock.today()).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!("exam export failed: {}", e);
                self.report("Export failed", "Could not export the exam list");
                None
            }
        }
    }

    /// Wait for background writes to land.
    pub async fn flush(&self) {
        self.persister.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::calendar::Weekday;
    use crate::persistence::MemoryStorage;
    use crate::traits::{MockClock, MockNotifier, MockSharer};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    struct Fixture {
        planner: Planner,
        storage: MemoryStorage,
        notifier: MockNotifier,
    }

    fn fixture(storage: MemoryStorage, options: PlannerOptions) -> Fixture {
        let notifier = MockNotifier::new();
        let clock = MockClock::new(Utc.with_ymd_and_hms(2025, 12, 10, 9, 0, 0).unwrap())
            .with_today(date(2025, 12, 10));
        let deps = Collaborators {
            storage: Arc::new(storage.clone()),
            clock: Arc::new(clock),
            notifier: Arc::new(notifier.clone()),
            sharer: Arc::new(MockSharer::new()),
        };
        Fixture {
            planner: Planner::open(deps, options, Handle::current()),
            storage,
            notifier,
        }
    }

    fn algebra() -> ClassPatch {
        ClassPatch {
            name: Some("Algebra".to_string()),
            teacher: Some("Tran".to_string()),
            room: Some("A101".to_string()),
            start_time: Some("07:00".to_string()),
            end_time: Some("09:00".to_string()),
            ..Default::default()
        }
    }

    // ==================== Session Tests ====================

    #[tokio::test]
    async fn test_opens_on_todays_week() {
        let f = fixture(MemoryStorage::new(), PlannerOptions::default());
        assert_eq!(f.planner.view().week_start(), date(2025, 12, 8));
        assert_eq!(f.planner.view().selected_day(), Weekday::Wednesday);
        assert!(f.planner.day().is_empty());
    }

    #[tokio::test]
    async fn test_new_class_lands_on_selected_day_and_persists() {
        let mut f = fixture(MemoryStorage::new(), PlannerOptions::default());
        let id = f.planner.save_class(None, algebra()).unwrap();
        f.planner.flush().await;

        assert_eq!(f.planner.store().class(&id).unwrap().weekday, Weekday::Wednesday);
        assert_eq!(f.planner.day().classes.len(), 1);
        let blob = f.storage.get(Slot::Schedule).unwrap();
        assert!(blob.contains("Algebra"));
        assert!(f.storage.get(Slot::Exams).is_none());
    }

    #[tokio::test]
    async fn test_defaults_apply_to_new_entries() {
        let options = PlannerOptions {
            class_color: "#000000".to_string(),
            reminder: ReminderPolicy::OneDay,
            ..Default::default()
        };
        let mut f = fixture(MemoryStorage::new(), options);
        let id = f.planner.save_class(None, algebra()).unwrap();

        let class = f.planner.store().class(&id).unwrap();
        assert_eq!(class.color, "#000000");
        assert_eq!(class.reminder, ReminderPolicy::OneDay);
    }

    #[tokio::test]
    async fn test_rejected_input_is_reported() {
        let mut f = fixture(MemoryStorage::new(), PlannerOptions::default());
        let patch = ClassPatch {
            end_time: Some("06:00".to_string()),
            ..algebra()
        };
        assert!(f.planner.save_class(None, patch).is_err());
        f.planner.flush().await;

        assert_eq!(f.notifier.notification_count(), 1);
        assert_eq!(f.notifier.get_notifications()[0].0, "Invalid input");
        assert!(f.storage.get(Slot::Schedule).is_none());

        // Accepted input stays silent.
        f.notifier.clear();
        f.planner.save_class(None, algebra()).unwrap();
        f.planner.flush().await;
        assert!(!f.notifier.was_called());
        assert!(f.storage.get(Slot::Schedule).is_some());
    }

    #[tokio::test]
    async fn test_edit_and_delete_persist() {
        let mut f = fixture(MemoryStorage::new(), PlannerOptions::default());
        let id = f
            .planner
            .save_note(
                None,
                NotePatch {
                    title: Some("Swim".to_string()),
                    weekdays: Some(vec![Weekday::Friday]),
                    ..Default::default()
                },
            )
            .unwrap();
        f.planner
            .save_note(
                Some(&id),
                NotePatch {
                    title: Some("Swim practice".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        f.planner.flush().await;
        assert!(f.storage.get(Slot::Notes).unwrap().contains("Swim practice"));

        assert!(f.planner.delete_note(&id));
        assert!(!f.planner.delete_note(&id));
        f.planner.flush().await;
        assert_eq!(f.storage.get(Slot::Notes).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_memory_state() {
        let mut f = fixture(MemoryStorage::failing(), PlannerOptions::default());
        let id = f
            .planner
            .save_exam(
                None,
                ExamPatch {
                    subject: Some("Physics".to_string()),
                    date: Some("12/12/2025".to_string()),
                    time: Some("08:00".to_string()),
                    room: Some("Hall".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        f.planner.flush().await;

        assert!(f.planner.store().exam(&id).is_some());
        assert!(!f.notifier.was_called());
    }

    #[tokio::test]
    async fn test_loads_existing_slots() {
        let storage = MemoryStorage::new();
        storage.put(
            Slot::Exams,
            r#"[{"id":"5","subject":"Chem","date":"10/12/2025","time":"13:00","room":"B2"}]"#,
        );
        let f = fixture(storage, PlannerOptions::default());

        assert_eq!(f.planner.exam_list().len(), 1);
        assert_eq!(f.planner.day().exams[0].subject, "Chem");
    }

    // ==================== Export Tests ====================

    #[tokio::test]
    async fn test_export_failure_sends_single_notice() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the output directory should be makes the write fail.
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "").unwrap();

        let f = fixture(
            MemoryStorage::new(),
            PlannerOptions {
                export_dir: blocker,
                ..Default::default()
            },
        );
        assert!(f.planner.export_exams().await.is_none());
        assert_eq!(f.notifier.notification_count(), 1);
        assert_eq!(f.notifier.get_notifications()[0].0, "Export failed");
    }

    #[tokio::test]
    async fn test_export_week_names_file_after_monday() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fixture(
            MemoryStorage::new(),
            PlannerOptions {
                export_dir: dir.path().to_path_buf(),
                ..Default::default()
            },
        );
        assert!(f.planner.view_mut().shift_weeks(1));

        let path = f.planner.export_week().await.unwrap();
        assert!(path.ends_with("timetable_15-12-2025.csv"));
        assert!(path.exists());
    }
}
