//! Abstractions for time and side effects to enable testing.
//!
//! This module provides traits for:
//! - `Clock`: Abstracting time access for id generation and "today"
//! - `Notifier`: Surfacing user-facing notices
//! - `Sharer`: Handing a finished export to whatever shares it

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};

// ==================== Clock Trait ====================

/// Trait for abstracting time access.
///
/// This allows injecting mock clocks during testing to create
/// deterministic, reproducible tests for time-dependent logic.
pub trait Clock: Send + Sync {
    /// Get the current time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Get the current time in the local timezone.
    fn now_local(&self) -> DateTime<Local>;

    /// Local wall-clock date.
    fn today(&self) -> NaiveDate {
        self.now_local().date_naive()
    }
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Mock clock for testing with controllable time.
#[derive(Debug, Clone)]
pub struct MockClock {
    utc_time: Arc<Mutex<DateTime<Utc>>>,
    today: Arc<Mutex<Option<NaiveDate>>>,
}

impl MockClock {
    /// Create a new mock clock set to the given UTC time.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            utc_time: Arc::new(Mutex::new(time)),
            today: Arc::new(Mutex::new(None)),
        }
    }

    /// Pin `today()` to a date regardless of the host timezone.
    pub fn with_today(self, date: NaiveDate) -> Self {
        *self.today.lock().unwrap() = Some(date);
        self
    }

    /// Set the mock clock to a new time.
    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.utc_time.lock().unwrap() = time;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut time = self.utc_time.lock().unwrap();
        *time += duration;
    }
}

impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.utc_time.lock().unwrap()
    }

    fn now_local(&self) -> DateTime<Local> {
        self.now_utc().with_timezone(&Local)
    }

    fn today(&self) -> NaiveDate {
        match *self.today.lock().unwrap() {
            Some(date) => date,
            None => self.now_local().date_naive(),
        }
    }
}

// ==================== Notifier Trait ====================

/// Trait for surfacing a notice to the user.
pub trait Notifier: Send + Sync {
    /// Send a notification with the given title and body.
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Notifier for terminal sessions: notices go to the log and stderr.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        tracing::warn!(title, "{}", body);
        eprintln!("{}: {}", title, body);
        Ok(())
    }
}

/// Mock notifier for testing that records all notifications.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    notifications: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNotifier {
    /// Create a new mock notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all notifications that have been sent.
    pub fn get_notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    /// Get the count of notifications sent.
    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    /// Clear all recorded notifications.
    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }

    /// Check if any notification was sent.
    pub fn was_called(&self) -> bool {
        !self.notifications.lock().unwrap().is_empty()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

// ==================== Sharer Trait ====================

/// Hands a generated file to a sharing facility.
pub trait Sharer: Send + Sync {
    fn share(&self, path: &Path) -> Result<()>;
}

/// Leaves the file where it is and reports its location.
#[derive(Debug, Clone, Default)]
pub struct LocalSharer;

impl Sharer for LocalSharer {
    fn share(&self, path: &Path) -> Result<()> {
        anyhow::ensure!(path.exists(), "export file {} is missing", path.display());
        tracing::info!(path = %path.display(), "export ready");
        Ok(())
    }
}

/// Mock sharer that records shared paths and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct MockSharer {
    shared: Arc<Mutex<Vec<PathBuf>>>,
    fail: bool,
}

impl MockSharer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sharer whose every attempt fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn shared_paths(&self) -> Vec<PathBuf> {
        self.shared.lock().unwrap().clone()
    }
}

impl Sharer for MockSharer {
    fn share(&self, path: &Path) -> Result<()> {
        if self.fail {
            anyhow::bail!("share sheet dismissed");
        }
        self.shared.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
