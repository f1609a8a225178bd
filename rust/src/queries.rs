//! Read-only timetable projections and workload statistics.
//!
//! All functions look only at active entries of the requested semester and
//! are deterministic for a given set of entries, whatever order they come in.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::models::{DayOfWeek, ScheduleEntry, Workload};

/// Weekly order: day (Monday first), start time, then id to break ties.
pub fn timetable_order(a: &ScheduleEntry, b: &ScheduleEntry) -> Ordering {
    a.day_of_week
        .cmp(&b.day_of_week)
        .then(a.start_time.cmp(&b.start_time))
        .then_with(|| a.id.cmp(&b.id))
}

fn sorted_active<'a>(
    entries: &'a [ScheduleEntry],
    semester: &str,
    keep: impl Fn(&ScheduleEntry) -> bool,
) -> Vec<&'a ScheduleEntry> {
    let mut selected: Vec<&ScheduleEntry> = entries
        .iter()
        .filter(|e| e.is_active && e.semester == semester && keep(*e))
        .collect();
    selected.sort_by(|a, b| timetable_order(a, b));
    selected
}

/// All lessons of a class for the week, in timetable order.
pub fn class_timetable<'a>(
    entries: &'a [ScheduleEntry],
    class_id: &str,
    semester: &str,
) -> Vec<&'a ScheduleEntry> {
    sorted_active(entries, semester, |e| e.class_id == class_id)
}

/// All lessons a teacher gives across classes and schools, in timetable order.
pub fn teacher_timetable<'a>(
    entries: &'a [ScheduleEntry],
    teacher_id: &str,
    semester: &str,
) -> Vec<&'a ScheduleEntry> {
    sorted_active(entries, semester, |e| e.teacher_id == teacher_id)
}

/// Entries of an already-built timetable that fall on the weekday of `date`.
///
/// Sundays have no lessons.
pub fn lessons_on<'a>(timetable: &[&'a ScheduleEntry], date: NaiveDate) -> Vec<&'a ScheduleEntry> {
    match DayOfWeek::from_date(date) {
        Some(day) => timetable
            .iter()
            .copied()
            .filter(|e| e.day_of_week == day)
            .collect(),
        None => Vec::new(),
    }
}

/// Total teaching time and lesson count of a teacher in a semester.
pub fn teacher_workload(entries: &[ScheduleEntry], teacher_id: &str, semester: &str) -> Workload {
    let (total_minutes, course_count) = entries
        .iter()
        .filter(|e| e.is_active && e.semester == semester && e.teacher_id == teacher_id)
        .fold((0u32, 0u32), |(minutes, count), e| {
            (minutes.saturating_add(e.duration), count.saturating_add(1))
        });

    let total_hours = (f64::from(total_minutes) / 60.0 * 100.0).round() / 100.0;
    let average_course_length = if course_count > 0 {
        (f64::from(total_minutes) / f64::from(course_count)).round() as u32
    } else {
        0
    };

    Workload {
        teacher_id: teacher_id.to_string(),
        semester: semester.to_string(),
        total_minutes,
        total_hours,
        course_count,
        average_course_length,
    }
}
