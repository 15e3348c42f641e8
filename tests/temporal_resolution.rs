//! Integration tests for date resolution through the public API.
//!
//! Entities are created through the store (or loaded from raw slot blobs
//! when a test needs data the store would reject) and then queried the way
//! the day and week views query them.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use week_planner::{
    ClassPatch, EntityStore, ExamPatch, MemoryStorage, MockClock, NotePatch, Slot, StoreError,
    ValidationError, Weekday, agenda_for, classes_on, exams_chronological, exams_on, load_snapshot,
    notes_on, week_agenda,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn store() -> EntityStore {
    let clock = MockClock::new(Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap());
    EntityStore::new(Arc::new(clock))
}

fn class(name: &str, day: Weekday, start: &str, end: &str) -> ClassPatch {
    ClassPatch {
        name: Some(name.to_string()),
        teacher: Some("Nguyen".to_string()),
        room: Some("B12".to_string()),
        start_time: Some(start.to_string()),
        end_time: Some(end.to_string()),
        weekday: Some(day),
        ..Default::default()
    }
}

// ==================== Class Range Tests ====================

/// A December Monday class is active only on Mondays inside its range.
#[test]
fn test_class_active_range_and_weekday() {
    let mut store = store();
    store
        .create_class(ClassPatch {
            start_date: Some("01/12/2025".to_string()),
            end_date: Some("31/12/2025".to_string()),
            ..class("Literature", Weekday::Monday, "08:00", "09:30")
        })
        .unwrap();

    assert_eq!(classes_on(store.schedule(), date(2025, 12, 8)).len(), 1);
    assert!(classes_on(store.schedule(), date(2026, 1, 5)).is_empty());
    assert!(classes_on(store.schedule(), date(2025, 12, 9)).is_empty());
}

/// Range bounds are inclusive on both ends.
#[test]
fn test_class_range_bounds_inclusive() {
    let mut store = store();
    store
        .create_class(ClassPatch {
            start_date: Some("1/12/2025".to_string()),
            end_date: Some("29/12/2025".to_string()),
            ..class("Chemistry", Weekday::Monday, "10:00", "11:00")
        })
        .unwrap();

    assert_eq!(classes_on(store.schedule(), date(2025, 12, 1)).len(), 1);
    assert_eq!(classes_on(store.schedule(), date(2025, 12, 29)).len(), 1);
    assert!(classes_on(store.schedule(), date(2025, 11, 24)).is_empty());
}

/// Stored data with a corrupted start date still shows the class.
#[test]
fn test_unparsable_range_bound_does_not_exclude() {
    let storage = MemoryStorage::new();
    storage.put(
        Slot::Schedule,
        r#"{"Monday":[{"id":"1","name":"Art","teacher":"Le","room":"C1",
            "startTime":"13:00","endTime":"14:00","day":"Monday",
            "startDate":"not a date"}]}"#,
    );
    let snapshot = load_snapshot(&storage);
    let store = EntityStore::from_snapshot(snapshot, Arc::new(week_planner::SystemClock));

    let found = classes_on(store.schedule(), date(2025, 12, 8));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Art");
}

#[test]
fn test_classes_sorted_by_start_time() {
    let mut store = store();
    store.create_class(class("Late", Weekday::Friday, "15:00", "16:00")).unwrap();
    store.create_class(class("Early", Weekday::Friday, "07:00", "08:00")).unwrap();
    store.create_class(class("Noon", Weekday::Friday, "12:00", "13:00")).unwrap();

    let names: Vec<&str> = classes_on(store.schedule(), date(2025, 12, 12))
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["Early", "Noon", "Late"]);
}

// ==================== Validation Tests ====================

#[test]
fn test_equal_start_and_end_rejected() {
    let mut store = store();
    let err = store
        .create_class(class("Math", Weekday::Tuesday, "09:00", "09:00"))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::TimeOrder { .. })
    ));
    assert!(store.schedule().is_empty());

    store
        .create_class(class("Math", Weekday::Tuesday, "09:00", "09:01"))
        .unwrap();
    assert_eq!(store.schedule().len(), 1);
}

#[test]
fn test_failed_edit_leaves_class_untouched() {
    let mut store = store();
    let id = store
        .create_class(class("Math", Weekday::Tuesday, "09:00", "10:00"))
        .unwrap();
    let before = store.class(&id).cloned();

    let result = store.update_class(
        &id,
        ClassPatch {
            end_time: Some("25:00".to_string()),
            ..Default::default()
        },
    );
    assert!(result.is_err());
    assert_eq!(store.class(&id).cloned(), before);
}

// ==================== Note Tests ====================

#[test]
fn test_weekly_note_every_monday_and_dated_note_once() {
    let mut store = store();
    store
        .create_note(NotePatch {
            title: Some("Gym".to_string()),
            weekdays: Some(vec![Weekday::Monday]),
            ..Default::default()
        })
        .unwrap();
    store
        .create_note(NotePatch {
            title: Some("Christmas".to_string()),
            date: Some("25/12/2025".to_string()),
            ..Default::default()
        })
        .unwrap();

    for monday in [date(2025, 12, 1), date(2026, 3, 2), date(2024, 1, 1)] {
        let titles: Vec<&str> = notes_on(store.notes(), monday)
            .iter()
            .map(|n| n.title.as_str())
            .collect();
        assert_eq!(titles, ["Gym"]);
    }
    assert_eq!(notes_on(store.notes(), date(2025, 12, 25)).len(), 1);
    assert!(notes_on(store.notes(), date(2026, 12, 25)).is_empty());
}

#[test]
fn test_note_matching_both_ways_appears_once() {
    let mut store = store();
    store
        .create_note(NotePatch {
            title: Some("Review".to_string()),
            weekdays: Some(vec![Weekday::Thursday]),
            date: Some("11/12/2025".to_string()),
            ..Default::default()
        })
        .unwrap();

    // 11/12/2025 is a Thursday.
    assert_eq!(notes_on(store.notes(), date(2025, 12, 11)).len(), 1);
    // Saturday that matches neither.
    assert!(notes_on(store.notes(), date(2025, 12, 13)).is_empty());
}

// ==================== Exam Tests ====================

#[test]
fn test_exam_dates_normalized_and_matched() {
    let mut store = store();
    store
        .create_exam(ExamPatch {
            subject: Some("Biology".to_string()),
            date: Some("3/2/2026".to_string()),
            time: Some("09:00".to_string()),
            room: Some("Gym".to_string()),
            reminder: None,
        })
        .unwrap();

    assert_eq!(store.exams()[0].date, "03/02/2026");
    assert_eq!(exams_on(store.exams(), date(2026, 2, 3)).len(), 1);
    assert!(exams_on(store.exams(), date(2026, 2, 4)).is_empty());
}

#[test]
fn test_unnormalized_stored_exam_never_matches() {
    let storage = MemoryStorage::new();
    storage.put(
        Slot::Exams,
        r#"[{"id":"1","subject":"History","date":"3/2/2026","time":"09:00","room":"A"}]"#,
    );
    let store = EntityStore::from_snapshot(load_snapshot(&storage), Arc::new(week_planner::SystemClock));
    assert!(exams_on(store.exams(), date(2026, 2, 3)).is_empty());
}

#[test]
fn test_exam_order_by_date_then_time() {
    let mut store = store();
    for (subject, day, time) in [
        ("A", "10/01/2026", "09:00"),
        ("B", "09/01/2026", "15:00"),
        ("C", "09/01/2026", "08:00"),
    ] {
        store
            .create_exam(ExamPatch {
                subject: Some(subject.to_string()),
                date: Some(day.to_string()),
                time: Some(time.to_string()),
                room: Some("Hall".to_string()),
                reminder: None,
            })
            .unwrap();
    }

    let order: Vec<&str> = exams_chronological(store.exams())
        .iter()
        .map(|e| e.subject.as_str())
        .collect();
    assert_eq!(order, ["C", "B", "A"]);
    // Storage order is untouched.
    assert_eq!(store.exams()[0].subject, "A");
}

#[test]
fn test_deleting_unknown_exam_is_noop() {
    let mut store = store();
    store
        .create_exam(ExamPatch {
            subject: Some("Art".to_string()),
            date: Some("10/01/2026".to_string()),
            time: Some("09:00".to_string()),
            room: Some("Hall".to_string()),
            reminder: None,
        })
        .unwrap();
    let before = store.exams().to_vec();

    assert!(!store.delete_exam("does-not-exist"));
    assert_eq!(store.exams(), before.as_slice());
}

// ==================== Agenda Tests ====================

#[test]
fn test_week_agenda_covers_monday_to_sunday() {
    let mut store = store();
    store.create_class(class("PE", Weekday::Sunday, "08:00", "09:00")).unwrap();

    let week = week_agenda(&store, date(2025, 12, 8));
    assert_eq!(week.len(), 7);
    assert_eq!(week[0].weekday, Weekday::Monday);
    assert_eq!(week[6].date, date(2025, 12, 14));
    assert_eq!(week[6].classes.len(), 1);
    assert!(week[..6].iter().all(|day| day.is_empty()));

    let sunday = agenda_for(&store, date(2025, 12, 14));
    assert_eq!(sunday.classes[0].name, "PE");
}
