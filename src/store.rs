//! In-memory owner of classes, exams and notes.
//!
//! Every create and update validates the fully merged record before touching
//! the collections, so a rejected edit leaves the store unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::calendar::Weekday;
use crate::error::{StoreError, ValidationError};
use crate::model::{
    Class, ClassPatch, DEFAULT_CLASS_COLOR, Exam, ExamPatch, Note, NotePatch,
};
use crate::traits::{Clock, SystemClock};
use crate::validate::{compare_time, is_valid_time, normalize_date, parse_date};

// ==================== Weekly Schedule ====================

/// Classes grouped by weekday. All seven groups always exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeeklySchedule {
    days: BTreeMap<Weekday, Vec<Class>>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self {
            days: Weekday::ALL.into_iter().map(|day| (day, Vec::new())).collect(),
        }
    }

    /// Group classes by their own weekday, keeping encounter order.
    pub fn from_classes(classes: impl IntoIterator<Item = Class>) -> Self {
        let mut schedule = Self::new();
        for class in classes {
            schedule.group_mut(class.weekday).push(class);
        }
        schedule
    }

    /// Build from stored groups. The group key wins over a disagreeing
    /// `weekday` field on the record.
    fn from_groups(groups: BTreeMap<Weekday, Vec<Class>>) -> Self {
        let mut schedule = Self::new();
        for (day, classes) in groups {
            for mut class in classes {
                if class.weekday != day {
                    tracing::debug!(class = %class.id, "realigning weekday {} -> {}", class.weekday, day);
                    class.weekday = day;
                }
                schedule.group_mut(day).push(class);
            }
        }
        schedule
    }

    pub fn day(&self, day: Weekday) -> &[Class] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or_default()
    }

    fn group_mut(&mut self, day: Weekday) -> &mut Vec<Class> {
        self.days.entry(day).or_default()
    }

    /// Every class, Monday group first.
    pub fn iter(&self) -> impl Iterator<Item = &Class> {
        self.days.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn position(&self, id: &str) -> Option<(Weekday, usize)> {
        self.days.iter().find_map(|(day, classes)| {
            classes
                .iter()
                .position(|class| class.id == id)
                .map(|index| (*day, index))
        })
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl<'de> Deserialize<'de> for WeeklySchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<Weekday, Vec<Class>>::deserialize(deserializer).map(Self::from_groups)
    }
}

/// The three collections together, as loaded from or written to storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub schedule: WeeklySchedule,
    pub exams: Vec<Exam>,
    pub notes: Vec<Note>,
}

// ==================== Id Generation ====================

/// Millisecond timestamp of 31/12/9999 23:59:59.999 UTC. Larger numeric ids
/// were not produced by the generator and are not used for seeding.
const MAX_TIMESTAMP_ID: i64 = 253_402_300_799_999;

/// Millisecond timestamps, bumped when two creations land in the same tick.
struct IdGenerator {
    clock: Arc<dyn Clock>,
    last: i64,
}

impl IdGenerator {
    fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, last: 0 }
    }

    /// Make sure fresh ids never collide with numeric ids already in use.
    fn seed<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            match id.parse::<i64>() {
                Ok(value) if value <= MAX_TIMESTAMP_ID => self.last = self.last.max(value),
                _ => {}
            }
        }
    }

    fn next(&mut self) -> String {
        let now = self.clock.now_utc().timestamp_millis();
        self.last = now.max(self.last.saturating_add(1));
        self.last.to_string()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

// ==================== Entity Store ====================

#[derive(Debug)]
pub struct EntityStore {
    schedule: WeeklySchedule,
    exams: Vec<Exam>,
    notes: Vec<Note>,
    ids: IdGenerator,
    default_color: String,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl EntityStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::from_snapshot(Snapshot::default(), clock)
    }

    pub fn from_snapshot(snapshot: Snapshot, clock: Arc<dyn Clock>) -> Self {
        let mut ids = IdGenerator::new(clock);
        ids.seed(
            snapshot
                .schedule
                .iter()
                .map(|c| c.id.as_str())
                .chain(snapshot.exams.iter().map(|e| e.id.as_str()))
                .chain(snapshot.notes.iter().map(|n| n.id.as_str())),
        );
        Self {
            schedule: snapshot.schedule,
            exams: snapshot.exams,
            notes: snapshot.notes,
            ids,
            default_color: DEFAULT_CLASS_COLOR.to_string(),
        }
    }

    /// Color given to new classes that do not choose one.
    pub fn with_default_color(mut self, color: impl Into<String>) -> Self {
        self.default_color = color.into();
        self
    }

    pub fn schedule(&self) -> &WeeklySchedule {
        &self.schedule
    }

    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            schedule: self.schedule.clone(),
            exams: self.exams.clone(),
            notes: self.notes.clone(),
        }
    }

    pub fn class(&self, id: &str) -> Option<&Class> {
        self.schedule.iter().find(|class| class.id == id)
    }

    pub fn exam(&self, id: &str) -> Option<&Exam> {
        self.exams.iter().find(|exam| exam.id == id)
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    // ---------- classes ----------

    /// Validate and append a new class to its weekday. Returns the new id.
    pub fn create_class(&mut self, patch: ClassPatch) -> Result<String, StoreError> {
        let class = build_class(String::new(), patch, &self.default_color)?;
        let class = Class {
            id: self.ids.next(),
            ..class
        };
        let id = class.id.clone();
        tracing::debug!(class = %id, weekday = %class.weekday, "class created");
        self.schedule.group_mut(class.weekday).push(class);
        Ok(id)
    }

    /// Merge `patch` over the stored class and replace it. A weekday change
    /// moves the class to the end of its new group.
    pub fn update_class(&mut self, id: &str, patch: ClassPatch) -> Result<(), StoreError> {
        let (day, index) = self.schedule.position(id).ok_or_else(|| StoreError::UnknownId {
            kind: "class",
            id: id.to_string(),
        })?;
        let current = &self.schedule.day(day)[index];
        let updated = build_class(current.id.clone(), patch.over(current), &self.default_color)?;

        if updated.weekday == day {
            self.schedule.group_mut(day)[index] = updated;
        } else {
            tracing::debug!(class = %id, "moving class {} -> {}", day, updated.weekday);
            self.schedule.group_mut(day).remove(index);
            self.schedule.group_mut(updated.weekday).push(updated);
        }
        Ok(())
    }

    /// Remove a class. Unknown ids are ignored; returns whether anything was removed.
    pub fn delete_class(&mut self, id: &str) -> bool {
        match self.schedule.position(id) {
            Some((day, index)) => {
                self.schedule.group_mut(day).remove(index);
                true
            }
            None => false,
        }
    }

    // ---------- exams ----------

    pub fn create_exam(&mut self, patch: ExamPatch) -> Result<String, StoreError> {
        let exam = build_exam(self.ids.next(), patch)?;
        let id = exam.id.clone();
        self.exams.push(exam);
        Ok(id)
    }

    pub fn update_exam(&mut self, id: &str, patch: ExamPatch) -> Result<(), StoreError> {
        let index = self
            .exams
            .iter()
            .position(|exam| exam.id == id)
            .ok_or_else(|| StoreError::UnknownId {
                kind: "exam",
                id: id.to_string(),
            })?;
        let current = &self.exams[index];
        self.exams[index] = build_exam(current.id.clone(), patch.over(current))?;
        Ok(())
    }

    pub fn delete_exam(&mut self, id: &str) -> bool {
        let before = self.exams.len();
        self.exams.retain(|exam| exam.id != id);
        self.exams.len() != before
    }

    // ---------- notes ----------

    pub fn create_note(&mut self, patch: NotePatch) -> Result<String, StoreError> {
        let note = build_note(self.ids.next(), patch)?;
        let id = note.id.clone();
        self.notes.push(note);
        Ok(id)
    }

    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> Result<(), StoreError> {
        let index = self
            .notes
            .iter()
            .position(|note| note.id == id)
            .ok_or_else(|| StoreError::UnknownId {
                kind: "note",
                id: id.to_string(),
            })?;
        let current = &self.notes[index];
        self.notes[index] = build_note(current.id.clone(), patch.over(current))?;
        Ok(())
    }

    pub fn delete_note(&mut self, id: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|note| note.id != id);
        self.notes.len() != before
    }
}

// ==================== Validation ====================

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Blank strings count as absent.
fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn valid_time(value: String, field: &'static str) -> Result<String, ValidationError> {
    if is_valid_time(&value) {
        Ok(value)
    } else {
        Err(ValidationError::InvalidTime { field, value })
    }
}

fn valid_date(value: String, field: &'static str) -> Result<String, ValidationError> {
    normalize_date(value.trim()).ok_or(ValidationError::InvalidDate { field, value })
}

fn build_class(id: String, draft: ClassPatch, default_color: &str) -> Result<Class, ValidationError> {
    let name = required(draft.name, "name")?;
    let teacher = required(draft.teacher, "teacher")?;
    let room = required(draft.room, "room")?;
    let start_time = required(draft.start_time, "startTime")?;
    let end_time = required(draft.end_time, "endTime")?;
    let weekday = draft.weekday.ok_or(ValidationError::MissingField("day"))?;

    let start_time = valid_time(start_time, "startTime")?;
    let end_time = valid_time(end_time, "endTime")?;
    if compare_time(&start_time, &end_time) != Some(std::cmp::Ordering::Less) {
        return Err(ValidationError::TimeOrder {
            start: start_time,
            end: end_time,
        });
    }

    let start_date = optional(draft.start_date)
        .map(|d| valid_date(d, "startDate"))
        .transpose()?;
    let end_date = optional(draft.end_date)
        .map(|d| valid_date(d, "endDate"))
        .transpose()?;
    if let (Some(start), Some(end)) = (&start_date, &end_date) {
        let ordered = matches!(
            (parse_date(start), parse_date(end)),
            (Some(s), Some(e)) if s < e
        );
        if !ordered {
            return Err(ValidationError::DateOrder {
                start: start.clone(),
                end: end.clone(),
            });
        }
    }

    Ok(Class {
        id,
        name,
        teacher,
        room,
        start_time,
        end_time,
        weekday,
        color: optional(draft.color).unwrap_or_else(|| default_color.to_string()),
        notes: optional(draft.notes),
        start_date,
        end_date,
        reminder: draft.reminder.unwrap_or_default(),
    })
}

fn build_exam(id: String, draft: ExamPatch) -> Result<Exam, ValidationError> {
    let subject = required(draft.subject, "subject")?;
    let date = required(draft.date, "date")?;
    let time = required(draft.time, "time")?;
    let room = required(draft.room, "room")?;

    Ok(Exam {
        id,
        subject,
        date: valid_date(date, "date")?,
        time: valid_time(time, "time")?,
        room,
        reminder: draft.reminder.unwrap_or_default(),
    })
}

fn build_note(id: String, draft: NotePatch) -> Result<Note, ValidationError> {
    let title = required(draft.title, "title")?;
    let date = optional(draft.date)
        .map(|d| valid_date(d, "date"))
        .transpose()?;
    let mut weekdays: Vec<Weekday> = Vec::new();
    for day in draft.weekdays.unwrap_or_default() {
        if !weekdays.contains(&day) {
            weekdays.push(day);
        }
    }

    Ok(Note {
        id,
        title,
        content: optional(draft.content),
        weekdays,
        date,
        reminder: draft.reminder.unwrap_or_default(),
    })
}
