//! Planner entities and their recurrence descriptors.
//!
//! Records serialize with camelCase field names; the class weekday is stored
//! as `day` and note weekdays as `days`.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{Weekday, format_date};
use crate::validate::{parse_date, parse_time};

pub const DEFAULT_CLASS_COLOR: &str = "#FF6B6B";

// ==================== Reminder Policy ====================

/// How long before an event the user wants to be reminded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReminderPolicy {
    #[default]
    Off,
    OneWeek,
    ThreeDays,
    OneDay,
    OneHour,
    ThirtyMinutes,
}

impl ReminderPolicy {
    pub const ALL: [ReminderPolicy; 6] = [
        ReminderPolicy::Off,
        ReminderPolicy::OneWeek,
        ReminderPolicy::ThreeDays,
        ReminderPolicy::OneDay,
        ReminderPolicy::OneHour,
        ReminderPolicy::ThirtyMinutes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::OneWeek => "1w",
            Self::ThreeDays => "3d",
            Self::OneDay => "1d",
            Self::OneHour => "1h",
            Self::ThirtyMinutes => "30m",
        }
    }

    /// Lead time before the event, `None` when reminders are off.
    pub fn lead_time(self) -> Option<Duration> {
        match self {
            Self::Off => None,
            Self::OneWeek => Some(Duration::weeks(1)),
            Self::ThreeDays => Some(Duration::days(3)),
            Self::OneDay => Some(Duration::days(1)),
            Self::OneHour => Some(Duration::hours(1)),
            Self::ThirtyMinutes => Some(Duration::minutes(30)),
        }
    }

    /// When a reminder for an event starting at `event` would fire.
    pub fn trigger_for(self, event: NaiveDateTime) -> Option<NaiveDateTime> {
        self.lead_time().map(|lead| event - lead)
    }

    /// Parse a stored policy; unknown values fall back to `Off`.
    pub fn parse_lenient(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_str() == s.trim())
            .unwrap_or_default()
    }
}

impl From<String> for ReminderPolicy {
    fn from(s: String) -> Self {
        Self::parse_lenient(&s)
    }
}

impl From<ReminderPolicy> for String {
    fn from(policy: ReminderPolicy) -> Self {
        policy.as_str().to_string()
    }
}

impl fmt::Display for ReminderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Recurrence ====================

/// Optional inclusive window limiting when a weekly entry applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveRange<'a> {
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
}

impl ActiveRange<'_> {
    /// Inclusive containment check. A bound that fails to parse does not
    /// exclude the date.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let after_start = match self.start.and_then(parse_date) {
            Some(start) => date >= start,
            None => true,
        };
        let before_end = match self.end.and_then(parse_date) {
            Some(end) => date <= end,
            None => true,
        };
        after_start && before_end
    }
}

/// When an entity applies, as an explicit tag instead of field presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence<'a> {
    /// Every matching weekday, optionally bounded.
    Weekly {
        weekdays: &'a [Weekday],
        range: ActiveRange<'a>,
    },
    /// A single `DD/MM/YYYY` date, matched by string equality.
    Exact { date: &'a str },
    /// Matching weekdays or the exact date.
    Both {
        weekdays: &'a [Weekday],
        date: &'a str,
    },
    /// Neither weekdays nor a date; never shown.
    Never,
}

impl Recurrence<'_> {
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        match *self {
            Recurrence::Weekly { weekdays, range } => {
                weekdays.contains(&Weekday::of(date)) && range.contains(date)
            }
            Recurrence::Exact { date: exact } => exact == format_date(date),
            Recurrence::Both {
                weekdays,
                date: exact,
            } => weekdays.contains(&Weekday::of(date)) || exact == format_date(date),
            Recurrence::Never => false,
        }
    }
}

// ==================== Class ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(rename = "day", alias = "weekday")]
    pub weekday: Weekday,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub reminder: ReminderPolicy,
}

impl Class {
    pub fn recurrence(&self) -> Recurrence<'_> {
        Recurrence::Weekly {
            weekdays: std::slice::from_ref(&self.weekday),
            range: ActiveRange {
                start: self.start_date.as_deref(),
                end: self.end_date.as_deref(),
            },
        }
    }

    /// `HH:MM - HH:MM`
    pub fn time_span(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }

    /// Start of the session on `date`, if the start time is well-formed.
    pub fn starts_on(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        let (hour, minute) = parse_time(&self.start_time)?;
        Some(date.and_time(NaiveTime::from_hms_opt(hour, minute, 0)?))
    }
}

/// Partial class used both for creation and for edits.
///
/// `Some("")` on an optional field clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPatch {
    pub name: Option<String>,
    pub teacher: Option<String>,
    pub room: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub weekday: Option<Weekday>,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub reminder: Option<ReminderPolicy>,
}

impl ClassPatch {
    /// Fill every unset field from `base`, leaving `base` untouched.
    pub fn over(self, base: &Class) -> ClassPatch {
        ClassPatch {
            name: self.name.or_else(|| Some(base.name.clone())),
            teacher: self.teacher.or_else(|| Some(base.teacher.clone())),
            room: self.room.or_else(|| Some(base.room.clone())),
            start_time: self.start_time.or_else(|| Some(base.start_time.clone())),
            end_time: self.end_time.or_else(|| Some(base.end_time.clone())),
            weekday: self.weekday.or(Some(base.weekday)),
            color: self.color.or_else(|| Some(base.color.clone())),
            notes: self.notes.or_else(|| base.notes.clone()),
            start_date: self.start_date.or_else(|| base.start_date.clone()),
            end_date: self.end_date.or_else(|| base.end_date.clone()),
            reminder: self.reminder.or(Some(base.reminder)),
        }
    }
}

// ==================== Exam ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub reminder: ReminderPolicy,
}

impl Exam {
    pub fn recurrence(&self) -> Recurrence<'_> {
        Recurrence::Exact { date: &self.date }
    }

    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        let date = parse_date(&self.date)?;
        let (hour, minute) = parse_time(&self.time)?;
        Some(date.and_time(NaiveTime::from_hms_opt(hour, minute, 0)?))
    }

    /// When the configured reminder would fire.
    pub fn reminder_at(&self) -> Option<NaiveDateTime> {
        self.reminder.trigger_for(self.starts_at()?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamPatch {
    pub subject: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub room: Option<String>,
    pub reminder: Option<ReminderPolicy>,
}

impl ExamPatch {
    pub fn over(self, base: &Exam) -> ExamPatch {
        ExamPatch {
            subject: self.subject.or_else(|| Some(base.subject.clone())),
            date: self.date.or_else(|| Some(base.date.clone())),
            time: self.time.or_else(|| Some(base.time.clone())),
            room: self.room.or_else(|| Some(base.room.clone())),
            reminder: self.reminder.or(Some(base.reminder)),
        }
    }
}

// ==================== Note ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "NoteRecord")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "days")]
    pub weekdays: Vec<Weekday>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub reminder: ReminderPolicy,
}

impl Note {
    pub fn recurrence(&self) -> Recurrence<'_> {
        match (self.weekdays.is_empty(), self.date.as_deref()) {
            (false, Some(date)) => Recurrence::Both {
                weekdays: &self.weekdays,
                date,
            },
            (false, None) => Recurrence::Weekly {
                weekdays: &self.weekdays,
                range: ActiveRange::default(),
            },
            (true, Some(date)) => Recurrence::Exact { date },
            (true, None) => Recurrence::Never,
        }
    }
}

/// Stored shape of a note, including the legacy single `day` field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteRecord {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    days: Option<Vec<String>>,
    #[serde(default)]
    weekdays: Option<Vec<String>>,
    #[serde(default)]
    day: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    reminder: ReminderPolicy,
}

impl From<NoteRecord> for Note {
    fn from(record: NoteRecord) -> Self {
        let names = record
            .days
            .or(record.weekdays)
            .or_else(|| record.day.map(|day| vec![day]))
            .unwrap_or_default();
        let mut weekdays = Vec::with_capacity(names.len());
        for name in names {
            match name.parse::<Weekday>() {
                Ok(day) if !weekdays.contains(&day) => weekdays.push(day),
                Ok(_) => {}
                Err(err) => tracing::warn!(note = %record.id, "dropping {}", err),
            }
        }
        Note {
            id: record.id,
            title: record.title,
            content: record.content,
            weekdays,
            date: record.date.filter(|d| !d.trim().is_empty()),
            reminder: record.reminder,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub weekdays: Option<Vec<Weekday>>,
    pub date: Option<String>,
    pub reminder: Option<ReminderPolicy>,
}

impl NotePatch {
    pub fn over(self, base: &Note) -> NotePatch {
        NotePatch {
            title: self.title.or_else(|| Some(base.title.clone())),
            content: self.content.or_else(|| base.content.clone()),
            weekdays: self.weekdays.or_else(|| Some(base.weekdays.clone())),
            date: self.date.or_else(|| base.date.clone()),
            reminder: self.reminder.or(Some(base.reminder)),
        }
    }
}
