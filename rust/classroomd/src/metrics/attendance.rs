use crate::model::{AttendanceRecord, AttendanceStatus, Id, Student};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

pub const DEFAULT_STATUS_COLOR: &str = "text-gray-400";
pub const DEFAULT_STATUS_BADGE: &str = "status-badge bg-gray-100 text-gray-400";

fn percent_of(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

/// Share of records marked present, as a whole percentage.
pub fn attendance_percentage<'a, I>(records: I) -> u32
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut total = 0_usize;
    let mut present = 0_usize;
    for r in records {
        total += 1;
        if r.status == Some(AttendanceStatus::Present) {
            present += 1;
        }
    }
    percent_of(present, total)
}

/// Unrounded present rate, `None` when the student has no records.
pub fn present_rate<'a, I>(records: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut total = 0_usize;
    let mut present = 0_usize;
    for r in records {
        total += 1;
        if r.status == Some(AttendanceStatus::Present) {
            present += 1;
        }
    }
    if total == 0 {
        None
    } else {
        Some(100.0 * present as f64 / total as f64)
    }
}

pub fn status_color_token(status: Option<AttendanceStatus>) -> &'static str {
    match status {
        Some(AttendanceStatus::Present) => "text-green-600",
        Some(AttendanceStatus::Absent) => "text-red-600",
        Some(AttendanceStatus::Late) => "text-yellow-600",
        _ => DEFAULT_STATUS_COLOR,
    }
}

pub fn status_badge_token(status: Option<AttendanceStatus>) -> &'static str {
    match status {
        Some(AttendanceStatus::Present) => "status-present",
        Some(AttendanceStatus::Absent) => "status-absent",
        Some(AttendanceStatus::Late) => "status-late",
        _ => DEFAULT_STATUS_BADGE,
    }
}

/// Monday through Friday of the week (starting Monday) that contains
/// `reference`. `None` when that week runs off chrono's calendar.
pub fn weekdays_of(reference: NaiveDate) -> Option<[NaiveDate; 5]> {
    let monday =
        reference.checked_sub_days(Days::new(u64::from(reference.weekday().num_days_from_monday())))?;
    // Friday in range means every day before it is too.
    monday.checked_add_days(Days::new(4))?;
    Some([0, 1, 2, 3, 4].map(|offset| monday + Days::new(offset)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodaySnapshot {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub total: usize,
    pub percentage: u32,
}

/// Counts `today`'s marks against the whole roster: `total` is the number
/// of students, not the number of records.
pub fn today_snapshot(students: &[Student], records: &[AttendanceRecord], today: NaiveDate) -> TodaySnapshot {
    let mut present = 0;
    let mut absent = 0;
    let mut late = 0;
    for r in records.iter().filter(|r| r.date == today) {
        match r.status {
            Some(AttendanceStatus::Present) => present += 1,
            Some(AttendanceStatus::Absent) => absent += 1,
            Some(AttendanceStatus::Late) => late += 1,
            _ => {}
        }
    }
    let total = students.len();
    TodaySnapshot {
        present,
        absent,
        late,
        total,
        percentage: percent_of(present, total),
    }
}

/// Mark for one student on one day, as the week grid shows it.
pub fn status_on(records: &[AttendanceRecord], student_id: Id, date: NaiveDate) -> Option<AttendanceStatus> {
    records
        .iter()
        .find(|r| r.student_id == student_id && r.date == date)
        .and_then(|r| r.status)
}

/// Non-present records, newest day first.
pub fn recent_absences(records: &[AttendanceRecord], limit: usize) -> Vec<AttendanceRecord> {
    let mut out: Vec<AttendanceRecord> = records
        .iter()
        .filter(|r| r.status != Some(AttendanceStatus::Present))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out.truncate(limit);
    out
}
