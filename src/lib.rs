//! Week Planner Library
//!
//! This module exposes the core components of the week planner: calendar
//! arithmetic, field validation, the temporal resolver, the entity store
//! and the storage and export gateways around it.

pub mod calendar;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod persistence;
pub mod planner;
pub mod resolver;
pub mod store;
pub mod traits;
pub mod validate;

// Re-export commonly used types
pub use calendar::{ViewContext, WeekOption, Weekday, format_date, week_dates, week_start};
pub use config::AppConfig;
pub use error::{ExportError, PersistenceError, StoreError, ValidationError};
pub use export::{Exporter, Sheet, exams_sheet, week_sheet};
pub use model::{
    ActiveRange, Class, ClassPatch, Exam, ExamPatch, Note, NotePatch, Recurrence, ReminderPolicy,
};
pub use persistence::{FileStorage, MemoryStorage, Persister, Slot, SlotStorage, load_snapshot};
pub use planner::{Collaborators, Planner, PlannerOptions};
pub use resolver::{
    DayAgenda, agenda_for, classes_on, exams_chronological, exams_on, notes_on, week_agenda,
};
pub use store::{EntityStore, Snapshot, WeeklySchedule};
pub use traits::{
    Clock, ConsoleNotifier, LocalSharer, MockClock, MockNotifier, MockSharer, Notifier, Sharer,
    SystemClock,
};
pub use validate::{compare_time, is_valid_date, is_valid_time, normalize_date, parse_date, parse_time};
