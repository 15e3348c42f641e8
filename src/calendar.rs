use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Day of the week used as the recurrence key for classes and notes.
///
/// Declared Monday first so that ordered maps iterate in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Weekday for a day index (0=Monday).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Day index (0=Monday, 6=Sunday).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    pub fn name(self) -> &'static str {
        const DAY_NAMES: [&str; 7] = [
            "Monday",
            "Tuesday",
            "Wednesday",
            "Thursday",
            "Friday",
            "Saturday",
            "Sunday",
        ];
        DAY_NAMES[self.index()]
    }

    pub fn short(self) -> &'static str {
        const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        DAY_NAMES[self.index()]
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Self::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWeekday(pub String);

impl fmt::Display for UnknownWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown weekday: {}", self.0)
    }
}

impl std::error::Error for UnknownWeekday {}

impl FromStr for Weekday {
    type Err = UnknownWeekday;

    /// Accepts full and three-letter names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|day| {
                day.name().to_ascii_lowercase() == needle
                    || day.short().to_ascii_lowercase() == needle
            })
            .ok_or_else(|| UnknownWeekday(s.to_string()))
    }
}

/// Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The seven dates of the week starting at `monday`, in order.
pub fn week_dates(monday: NaiveDate) -> [NaiveDate; 7] {
    std::array::from_fn(|offset| monday + Duration::days(offset as i64))
}

/// Zero-padded `DD/MM/YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// One entry of the week picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekOption {
    /// Weeks relative to the current anchor.
    pub offset: i64,
    pub monday: NaiveDate,
    /// `DD/MM/YYYY - DD/MM/YYYY` covering Monday to Sunday.
    pub label: String,
}

/// Currently viewed week and day.
///
/// Passed explicitly to whatever needs the reference date instead of living
/// in process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewContext {
    week_start: NaiveDate,
    selected: Weekday,
}

impl ViewContext {
    /// Context anchored on the week containing `date`, with `date` selected.
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            week_start: week_start(date),
            selected: Weekday::of(date),
        }
    }

    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    pub fn selected_day(&self) -> Weekday {
        self.selected
    }

    pub fn selected_index(&self) -> usize {
        self.selected.index()
    }

    pub fn week_dates(&self) -> [NaiveDate; 7] {
        week_dates(self.week_start)
    }

    /// The single calendar date being viewed.
    pub fn reference_date(&self) -> NaiveDate {
        self.week_start + Duration::days(self.selected.index() as i64)
    }

    pub fn select_day(&mut self, day: Weekday) {
        self.selected = day;
    }

    /// Select by index (0=Monday). Returns false and leaves the selection
    /// untouched when the index is out of range.
    pub fn select_index(&mut self, index: usize) -> bool {
        match Weekday::from_index(index) {
            Some(day) => {
                self.selected = day;
                true
            }
            None => false,
        }
    }

    /// Move the anchor to the week containing `date`; the selected weekday is kept.
    pub fn jump_to(&mut self, date: NaiveDate) {
        self.week_start = week_start(date);
    }

    /// Move the anchor by whole weeks. Returns false and leaves the anchor
    /// untouched when the target week is not representable.
    pub fn shift_weeks(&mut self, weeks: i64) -> bool {
        match Duration::try_weeks(weeks).and_then(|d| self.week_start.checked_add_signed(d)) {
            Some(monday) => {
                self.week_start = monday;
                true
            }
            None => false,
        }
    }

    /// Week picker entries for offsets `-before..=after`.
    pub fn week_options(&self, before: u32, after: u32) -> Vec<WeekOption> {
        (-i64::from(before)..=i64::from(after))
            .map(|offset| {
                let monday = self.week_start + Duration::weeks(offset);
                let sunday = monday + Duration::days(6);
                WeekOption {
                    offset,
                    monday,
                    label: format!("{} - {}", format_date(monday), format_date(sunday)),
                }
            })
            .collect()
    }
}
