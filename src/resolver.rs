//! Decides which classes, exams and notes apply to a calendar date.
//!
//! Everything here is a pure read over borrowed collections and is recomputed
//! on every query.

use chrono::NaiveDate;

use crate::calendar::{Weekday, week_dates};
use crate::model::{Class, Exam, Note};
use crate::store::{EntityStore, WeeklySchedule};
use crate::validate::{parse_date, parse_time};

/// Classes scheduled on `date`, ordered by start time.
///
/// Classes whose start time is not a valid `HH:MM` keep their position in
/// the list; only the well-formed ones are reordered among themselves.
pub fn classes_on(schedule: &WeeklySchedule, date: NaiveDate) -> Vec<&Class> {
    let mut classes: Vec<&Class> = schedule
        .day(Weekday::of(date))
        .iter()
        .filter(|class| class.recurrence().occurs_on(date))
        .collect();
    sort_by_start_time(&mut classes);
    classes
}

fn sort_by_start_time(classes: &mut [&Class]) {
    let slots: Vec<usize> = classes
        .iter()
        .enumerate()
        .filter(|(_, class)| parse_time(&class.start_time).is_some())
        .map(|(index, _)| index)
        .collect();

    let mut timed: Vec<&Class> = slots.iter().map(|&index| classes[index]).collect();
    // Stable, so equal start times keep insertion order.
    timed.sort_by_key(|class| parse_time(&class.start_time));

    for (slot, class) in slots.into_iter().zip(timed) {
        classes[slot] = class;
    }
}

/// Exams whose stored date string equals the formatted `date`.
pub fn exams_on(exams: &[Exam], date: NaiveDate) -> Vec<&Exam> {
    exams
        .iter()
        .filter(|exam| exam.recurrence().occurs_on(date))
        .collect()
}

/// Notes pinned to `date` or recurring on its weekday, each at most once.
pub fn notes_on(notes: &[Note], date: NaiveDate) -> Vec<&Note> {
    notes
        .iter()
        .filter(|note| note.recurrence().occurs_on(date))
        .collect()
}

/// All exams ordered by date then time.
///
/// Unparsable dates sort as 01/01/1970 and invalid times as 00:00.
pub fn exams_chronological(exams: &[Exam]) -> Vec<&Exam> {
    let mut sorted: Vec<&Exam> = exams.iter().collect();
    sorted.sort_by_key(|exam| {
        (
            parse_date(&exam.date).unwrap_or_default(),
            parse_time(&exam.time).unwrap_or((0, 0)),
        )
    });
    sorted
}

/// Everything shown for one day.
#[derive(Debug, Clone)]
pub struct DayAgenda<'a> {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub classes: Vec<&'a Class>,
    pub exams: Vec<&'a Exam>,
    pub notes: Vec<&'a Note>,
}

impl DayAgenda<'_> {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.exams.is_empty() && self.notes.is_empty()
    }
}

pub fn agenda_for(store: &EntityStore, date: NaiveDate) -> DayAgenda<'_> {
    DayAgenda {
        date,
        weekday: Weekday::of(date),
        classes: classes_on(store.schedule(), date),
        exams: exams_on(store.exams(), date),
        notes: notes_on(store.notes(), date),
    }
}

/// Agendas for the seven days starting at `monday`.
pub fn week_agenda(store: &EntityStore, monday: NaiveDate) -> Vec<DayAgenda<'_>> {
    week_dates(monday)
        .into_iter()
        .map(|date| agenda_for(store, date))
        .collect()
}
