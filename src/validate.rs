//! Predicates and normalizers for `HH:MM` times and `D/M/YYYY` dates.

use std::cmp::Ordering;

use chrono::NaiveDate;

/// Parse a strict `HH:MM` time into `(hour, minute)`.
pub fn parse_time(s: &str) -> Option<(u32, u32)> {
    let (hh, mm) = s.split_once(':')?;
    if hh.len() != 2 || mm.len() != 2 {
        return None;
    }
    if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hh.parse().ok()?;
    let minute: u32 = mm.parse().ok()?;
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

pub fn is_valid_time(s: &str) -> bool {
    parse_time(s).is_some()
}

/// Compare two times by hour then minute.
///
/// Returns `None` when either side is not a valid time.
pub fn compare_time(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_time(a)?.cmp(&parse_time(b)?))
}

/// Latest accepted year. Weeks around any accepted date stay well inside
/// the range `NaiveDate` can represent.
pub const MAX_YEAR: i32 = 9999;

/// Parse a `D/M/YYYY` date. Day and month take one or two digits, the year
/// must be between 1000 and [`MAX_YEAR`] and the day must exist in that month.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.split('/');
    let (d, m, y) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let day = small_number(d)?;
    let month = small_number(m)?;
    if y.is_empty() || !y.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = y.parse().ok()?;
    if !(1000..=MAX_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn small_number(part: &str) -> Option<u32> {
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

pub fn is_valid_date(s: &str) -> bool {
    parse_date(s).is_some()
}

/// Re-render a valid date as zero-padded `DD/MM/YYYY`; `None` if invalid.
pub fn normalize_date(s: &str) -> Option<String> {
    parse_date(s).map(crate::calendar::format_date)
}
