//! Tabular exports of the displayed week and of the exam list.
//!
//! Sheets are built synchronously from a read of the store, then written to
//! CSV on a blocking task and handed to a [`Sharer`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::calendar::{Weekday, format_date, week_dates};
use crate::error::ExportError;
use crate::model::Exam;
use crate::resolver::{exams_chronological, notes_on};
use crate::store::EntityStore;
use crate::traits::Sharer;

/// Rows of cells; rows may differ in width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
        }
    }

    fn push<S: AsRef<str>>(&mut self, cells: &[S]) {
        self.rows
            .push(cells.iter().map(|c| c.as_ref().to_string()).collect());
    }

    fn blank(&mut self) {
        self.rows.push(vec![String::new(), String::new()]);
    }
}

/// Timetable for the week starting at `monday`: every class of each weekday
/// in stored order, plus the notes matching that day.
pub fn week_sheet(store: &EntityStore, monday: NaiveDate) -> Sheet {
    let mut sheet = Sheet::new("Timetable");
    sheet.push(&["Timetable".to_string(), format!("Week of {}", format_date(monday))]);
    sheet.blank();

    for (day, date) in Weekday::ALL.into_iter().zip(week_dates(monday)) {
        sheet.push(&[day.name().to_string(), format_date(date)]);

        sheet.push(&["Subject", "Teacher", "Room", "Time", "Notes"]);
        let classes = store.schedule().day(day);
        if classes.is_empty() {
            sheet.push(&["No classes", "", "", "", ""]);
        }
        for class in classes {
            sheet.push(&[
                class.name.as_str(),
                class.teacher.as_str(),
                class.room.as_str(),
                class.time_span().as_str(),
                class.notes.as_deref().unwrap_or_default(),
            ]);
        }
        sheet.blank();

        sheet.push(&["Note", "Content", "Date"]);
        let notes = notes_on(store.notes(), date);
        if notes.is_empty() {
            sheet.push(&["No notes", "", ""]);
        }
        for note in notes {
            sheet.push(&[
                note.title.as_str(),
                note.content.as_deref().unwrap_or_default(),
                note.date.as_deref().unwrap_or_default(),
            ]);
        }
        sheet.blank();
    }
    sheet
}

/// All exams sorted by date then time.
pub fn exams_sheet(exams: &[Exam]) -> Sheet {
    let mut sheet = Sheet::new("Exams");
    sheet.push(&["Exams"]);
    sheet.blank();
    sheet.push(&["Subject", "Date", "Time", "Room"]);

    let sorted = exams_chronological(exams);
    if sorted.is_empty() {
        sheet.push(&["No exams scheduled", "", "", ""]);
    }
    for exam in sorted {
        sheet.push(&[&exam.subject, &exam.date, &exam.time, &exam.room]);
    }
    sheet
}

/// Write `sheet` to `path` as CSV, one record per row. Exports are always
/// CSV files; no spreadsheet workbook format is produced.
pub fn write_csv(sheet: &Sheet, path: &Path) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for row in &sheet.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes sheets into an output directory and shares the result.
#[derive(Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    sharer: Arc<dyn Sharer>,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>, sharer: Arc<dyn Sharer>) -> Self {
        Self {
            output_dir: output_dir.into(),
            sharer,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export the week starting at `monday` to `timetable_DD-MM-YYYY.csv`.
    pub async fn export_week(
        &self,
        store: &EntityStore,
        monday: NaiveDate,
    ) -> Result<PathBuf, ExportError> {
        let sheet = week_sheet(store, monday);
        let filename = format!("timetable_{}.csv", file_date(monday));
        self.publish(sheet, filename).await
    }

    /// Export every exam to `exams_DD-MM-YYYY.csv`, dated `today`.
    pub async fn export_exams(
        &self,
        store: &EntityStore,
        today: NaiveDate,
    ) -> Result<PathBuf, ExportError> {
        let sheet = exams_sheet(store.exams());
        let filename = format!("exams_{}.csv", file_date(today));
        self.publish(sheet, filename).await
    }

    async fn publish(&self, sheet: Sheet, filename: String) -> Result<PathBuf, ExportError> {
        let path = self.output_dir.join(filename);
        let dir = self.output_dir.clone();
        let target = path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), ExportError> {
            std::fs::create_dir_all(&dir)?;
            write_csv(&sheet, &target)
        })
        .await
        .map_err(|e| ExportError::Io(std::io::Error::other(e)))??;

        self.sharer
            .share(&path)
            .map_err(|e| ExportError::Share(format!("{:#}", e)))?;
        tracing::info!(path = %path.display(), "export written");
        Ok(path)
    }
}

fn file_date(date: NaiveDate) -> String {
    format_date(date).replace('/', "-")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{ClassPatch, ExamPatch, NotePatch};
    use crate::traits::MockSharer;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn exam(subject: &str, day: &str, time: &str) -> ExamPatch {
        ExamPatch {
            subject: Some(subject.to_string()),
            date: Some(day.to_string()),
            time: Some(time.to_string()),
            room: Some("Hall".to_string()),
            reminder: None,
        }
    }

    // ==================== Exam Sheet Tests ====================

    #[test]
    fn test_exam_sheet_sorted_by_date_then_time() {
        let mut store = EntityStore::default();
        store.create_exam(exam("A", "10/01/2026", "09:00")).unwrap();
        store.create_exam(exam("B", "09/01/2026", "15:00")).unwrap();
        store.create_exam(exam("C", "09/01/2026", "08:00")).unwrap();

        let sheet = exams_sheet(store.exams());
        let subjects: Vec<&str> = sheet.rows[3..].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(subjects, ["C", "B", "A"]);
        assert_eq!(sheet.rows[2], ["Subject", "Date", "Time", "Room"]);
    }

    #[test]
    fn test_empty_exam_sheet_has_placeholder() {
        let sheet = exams_sheet(&[]);
        assert_eq!(sheet.rows.last().unwrap()[0], "No exams scheduled");
    }

    // ==================== Week Sheet Tests ====================

    #[test]
    fn test_week_sheet_layout() {
        let mut store = EntityStore::default();
        store
            .create_class(ClassPatch {
                name: Some("Algebra".to_string()),
                teacher: Some("Tran".to_string()),
                room: Some("A101".to_string()),
                start_time: Some("07:00".to_string()),
                end_time: Some("09:00".to_string()),
                weekday: Some(Weekday::Monday),
                ..Default::default()
            })
            .unwrap();
        store
            .create_note(NotePatch {
                title: Some("Quiz".to_string()),
                date: Some("09/12/2025".to_string()),
                ..Default::default()
            })
            .unwrap();

        let sheet = week_sheet(&store, date(2025, 12, 8));
        assert_eq!(sheet.rows[0], ["Timetable", "Week of 08/12/2025"]);
        assert_eq!(sheet.rows[2], ["Monday", "08/12/2025"]);
        assert_eq!(sheet.rows[4], ["Algebra", "Tran", "A101", "07:00 - 09:00", ""]);
        assert_eq!(sheet.rows[7], ["No notes", "", ""]);

        // Tuesday block follows Monday's: header, class table, blank, note table.
        assert_eq!(sheet.rows[9], ["Tuesday", "09/12/2025"]);
        assert_eq!(sheet.rows[11], ["No classes", "", "", "", ""]);
        assert_eq!(sheet.rows[14], ["Quiz", "", "09/12/2025"]);

        let headers = sheet
            .rows
            .iter()
            .filter(|r| Weekday::ALL.iter().any(|d| r[0] == d.name()))
            .count();
        assert_eq!(headers, 7);
    }

    // ==================== Exporter Tests ====================

    #[tokio::test]
    async fn test_export_writes_csv_and_shares() {
        let dir = tempfile::tempdir().unwrap();
        let sharer = MockSharer::new();
        let exporter = Exporter::new(dir.path().join("out"), Arc::new(sharer.clone()));

        let mut store = EntityStore::default();
        store.create_exam(exam("Physics", "9/1/2026", "08:00")).unwrap();

        let path = exporter
            .export_exams(&store, date(2025, 12, 8))
            .await
            .unwrap();
        assert!(path.ends_with("exams_08-12-2025.csv"));
        assert_eq!(sharer.shared_paths(), vec![path.clone()]);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(&rows[0][0], "Exams");
        assert_eq!(&rows[3][1], "09/01/2026");
    }

    #[tokio::test]
    async fn test_share_failure_is_an_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path(), Arc::new(MockSharer::failing()));
        let store = EntityStore::default();

        let err = exporter
            .export_week(&store, date(2025, 12, 8))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Share(_)));
    }
}
