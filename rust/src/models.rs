//! Core data types for the timetable engine.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::time::{TimeOfDay, TimeRange};

/// School day of the week. Sunday is not a teaching day.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday = 0,
    Tuesday = 1,
    Wednesday = 2,
    Thursday = 3,
    Friday = 4,
    Saturday = 5,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 6] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    /// Position in the school week, Monday=0 through Saturday=5.
    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
        }
    }

    /// School day for a calendar date, or `None` on Sundays.
    pub fn from_date(date: NaiveDate) -> Option<Self> {
        Self::try_from(date.weekday()).ok()
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown day of week: {}", s))
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
        }
    }
}

impl TryFrom<Weekday> for DayOfWeek {
    type Error = Weekday;

    fn try_from(day: Weekday) -> Result<Self, Self::Error> {
        match day {
            Weekday::Mon => Ok(Self::Monday),
            Weekday::Tue => Ok(Self::Tuesday),
            Weekday::Wed => Ok(Self::Wednesday),
            Weekday::Thu => Ok(Self::Thursday),
            Weekday::Fri => Ok(Self::Friday),
            Weekday::Sat => Ok(Self::Saturday),
            Weekday::Sun => Err(day),
        }
    }
}

#[pymethods]
impl DayOfWeek {
    #[staticmethod]
    #[pyo3(name = "parse")]
    fn py_parse(name: &str) -> PyResult<Self> {
        name.parse()
            .map_err(pyo3::exceptions::PyValueError::new_err)
    }

    fn __str__(&self) -> &'static str {
        self.name()
    }
}

/// A candidate lesson as submitted by the caller, before validation.
///
/// Times are still raw `HH:MM` strings here. `id` is set only when an existing
/// entry is being re-validated, so conflict checks can skip the entry itself.
#[pyclass]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    #[pyo3(get, set)]
    pub id: Option<String>,
    #[pyo3(get, set)]
    pub school_id: String,
    #[pyo3(get, set)]
    pub class_id: String,
    #[pyo3(get, set)]
    pub subject_id: String,
    #[pyo3(get, set)]
    pub teacher_id: String,
    #[pyo3(get, set)]
    pub day_of_week: Option<DayOfWeek>,
    #[pyo3(get, set)]
    pub start_time: String,
    #[pyo3(get, set)]
    pub end_time: String,
    #[pyo3(get, set)]
    #[serde(default)]
    pub room: String,
    #[pyo3(get, set)]
    pub semester: Option<String>,
    #[pyo3(get, set)]
    #[serde(default = "default_recurring")]
    pub is_recurring: bool,
    #[pyo3(get, set)]
    pub notes: Option<String>,
}

fn default_recurring() -> bool {
    true
}

impl EntryDraft {
    /// A recurring lesson draft in the default semester with no room.
    pub fn new(
        school_id: impl Into<String>,
        class_id: impl Into<String>,
        subject_id: impl Into<String>,
        teacher_id: impl Into<String>,
        day_of_week: DayOfWeek,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            school_id: school_id.into(),
            class_id: class_id.into(),
            subject_id: subject_id.into(),
            teacher_id: teacher_id.into(),
            day_of_week: Some(day_of_week),
            start_time: start_time.into(),
            end_time: end_time.into(),
            room: String::new(),
            semester: None,
            is_recurring: true,
            notes: None,
        }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    pub fn with_semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = Some(semester.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_recurring(mut self, is_recurring: bool) -> Self {
        self.is_recurring = is_recurring;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Apply an update's mutable fields on top of this draft.
    pub fn apply(mut self, changes: &EntryChanges) -> Self {
        if let Some(day) = changes.day_of_week {
            self.day_of_week = Some(day);
        }
        if let Some(start) = &changes.start_time {
            self.start_time = start.clone();
        }
        if let Some(end) = &changes.end_time {
            self.end_time = end.clone();
        }
        if let Some(room) = &changes.room {
            self.room = room.clone();
        }
        if let Some(teacher) = &changes.teacher_id {
            self.teacher_id = teacher.clone();
        }
        if let Some(notes) = &changes.notes {
            self.notes = Some(notes.clone()).filter(|n| !n.is_empty());
        }
        if let Some(recurring) = changes.is_recurring {
            self.is_recurring = recurring;
        }
        self
    }
}

#[pymethods]
impl EntryDraft {
    #[new]
    #[pyo3(signature = (
        school_id,
        class_id,
        subject_id,
        teacher_id,
        day_of_week,
        start_time,
        end_time,
        room=None,
        semester=None,
        is_recurring=true,
        notes=None,
        id=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        school_id: String,
        class_id: String,
        subject_id: String,
        teacher_id: String,
        day_of_week: Option<DayOfWeek>,
        start_time: String,
        end_time: String,
        room: Option<String>,
        semester: Option<String>,
        is_recurring: bool,
        notes: Option<String>,
        id: Option<String>,
    ) -> Self {
        Self {
            id,
            school_id,
            class_id,
            subject_id,
            teacher_id,
            day_of_week,
            start_time,
            end_time,
            room: room.unwrap_or_default(),
            semester,
            is_recurring,
            notes,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "EntryDraft(class_id={:?}, teacher_id={:?}, day={:?}, {}-{}, room={:?})",
            self.class_id,
            self.teacher_id,
            self.day_of_week,
            self.start_time,
            self.end_time,
            self.room
        )
    }
}

/// Mutable fields of an existing entry. `None` leaves a field untouched.
///
/// School, class, subject and semester are fixed once an entry exists.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryChanges {
    pub day_of_week: Option<DayOfWeek>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub room: Option<String>,
    pub teacher_id: Option<String>,
    /// `Some("")` clears the notes.
    pub notes: Option<String>,
    pub is_recurring: Option<bool>,
}

/// A validated weekly lesson slot.
///
/// Deserializing re-checks the time range and recomputes `duration`, so an
/// entry loaded from a stored document holds the same guarantees as one built
/// by [`crate::validation::validate`].
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredEntry")]
pub struct ScheduleEntry {
    #[pyo3(get)]
    pub id: String,
    #[pyo3(get)]
    pub school_id: String,
    #[pyo3(get)]
    pub class_id: String,
    #[pyo3(get)]
    pub subject_id: String,
    #[pyo3(get)]
    pub teacher_id: String,
    #[pyo3(get)]
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    /// Derived from the time range, never supplied by callers
    #[pyo3(get)]
    pub duration: u32,
    #[pyo3(get)]
    pub room: String,
    #[pyo3(get)]
    pub semester: String,
    #[pyo3(get)]
    pub is_active: bool,
    #[pyo3(get)]
    pub is_recurring: bool,
    #[pyo3(get)]
    pub notes: Option<String>,
    #[pyo3(get)]
    pub created_at: DateTime<Utc>,
    #[pyo3(get)]
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every write; 0 until first stored
    #[pyo3(get)]
    pub revision: u64,
}

/// Errors raised when a stored document does not describe a valid entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryDocumentError {
    #[error("schedule entry id is blank")]
    BlankId,
    #[error("entry {id}: end time {end} must be after start time {start}")]
    EndNotAfterStart {
        id: String,
        start: TimeOfDay,
        end: TimeOfDay,
    },
}

/// Wire shape of a stored entry. `duration` is not read; it is always derived.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    id: String,
    school_id: String,
    class_id: String,
    subject_id: String,
    teacher_id: String,
    day_of_week: DayOfWeek,
    start_time: TimeOfDay,
    end_time: TimeOfDay,
    #[serde(default)]
    room: String,
    semester: String,
    is_active: bool,
    is_recurring: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    revision: u64,
}

impl TryFrom<StoredEntry> for ScheduleEntry {
    type Error = EntryDocumentError;

    fn try_from(raw: StoredEntry) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err(EntryDocumentError::BlankId);
        }
        let range = TimeRange::new(raw.start_time, raw.end_time).ok_or_else(|| {
            EntryDocumentError::EndNotAfterStart {
                id: raw.id.clone(),
                start: raw.start_time,
                end: raw.end_time,
            }
        })?;

        Ok(Self {
            id: raw.id,
            school_id: raw.school_id,
            class_id: raw.class_id,
            subject_id: raw.subject_id,
            teacher_id: raw.teacher_id,
            day_of_week: raw.day_of_week,
            start_time: range.start,
            end_time: range.end,
            duration: range.duration_minutes(),
            room: raw.room,
            semester: raw.semester,
            is_active: raw.is_active,
            is_recurring: raw.is_recurring,
            notes: raw.notes,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            revision: raw.revision,
        })
    }
}

impl ScheduleEntry {
    #[inline]
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Turn a stored entry back into a draft that keeps its id.
    pub fn to_draft(&self) -> EntryDraft {
        EntryDraft {
            id: Some(self.id.clone()),
            school_id: self.school_id.clone(),
            class_id: self.class_id.clone(),
            subject_id: self.subject_id.clone(),
            teacher_id: self.teacher_id.clone(),
            day_of_week: Some(self.day_of_week),
            start_time: self.start_time.to_string(),
            end_time: self.end_time.to_string(),
            room: self.room.clone(),
            semester: Some(self.semester.clone()),
            is_recurring: self.is_recurring,
            notes: self.notes.clone(),
        }
    }
}

#[pymethods]
impl ScheduleEntry {
    #[getter(start_time)]
    fn py_start_time(&self) -> String {
        self.start_time.to_string()
    }

    #[getter(end_time)]
    fn py_end_time(&self) -> String {
        self.end_time.to_string()
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleEntry(id={:?}, class_id={:?}, teacher_id={:?}, {} {}, room={:?})",
            self.id,
            self.class_id,
            self.teacher_id,
            self.day_of_week,
            self.time_range(),
            self.room
        )
    }
}

/// Which constrained resource is double-booked.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Teacher,
    Room,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Teacher => f.write_str("teacher"),
            Self::Room => f.write_str("room"),
        }
    }
}

/// A detected overlap with an existing active entry.
///
/// The payload describes the entry already holding the resource.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    #[pyo3(get)]
    pub kind: ConflictKind,
    #[pyo3(get)]
    pub message: String,
    #[pyo3(get)]
    pub conflicting_entry_id: String,
    #[pyo3(get)]
    pub class_id: String,
    #[pyo3(get)]
    pub subject_id: String,
    #[pyo3(get)]
    pub teacher_id: String,
    #[pyo3(get)]
    pub room: String,
    #[pyo3(get)]
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} conflict: {}", self.kind, self.message)
    }
}

#[pymethods]
impl Conflict {
    #[getter(start_time)]
    fn py_start_time(&self) -> String {
        self.start_time.to_string()
    }

    #[getter(end_time)]
    fn py_end_time(&self) -> String {
        self.end_time.to_string()
    }

    fn __repr__(&self) -> String {
        format!(
            "Conflict(kind={}, entry={:?}, {} {}-{})",
            self.kind, self.conflicting_entry_id, self.day_of_week, self.start_time, self.end_time
        )
    }
}

/// Teaching load of one teacher within a semester.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    #[pyo3(get)]
    pub teacher_id: String,
    #[pyo3(get)]
    pub semester: String,
    #[pyo3(get)]
    pub total_minutes: u32,
    /// `total_minutes / 60` rounded to two decimals
    #[pyo3(get)]
    pub total_hours: f64,
    #[pyo3(get)]
    pub course_count: u32,
    /// Mean lesson length in whole minutes, 0 with no lessons
    #[pyo3(get)]
    pub average_course_length: u32,
}

#[pymethods]
impl Workload {
    fn __repr__(&self) -> String {
        format!(
            "Workload(teacher_id={:?}, total_hours={}, course_count={})",
            self.teacher_id, self.total_hours, self.course_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_ordering_follows_school_week() {
        let mut days = vec![DayOfWeek::Saturday, DayOfWeek::Monday, DayOfWeek::Wednesday];
        days.sort();
        assert_eq!(
            days,
            vec![DayOfWeek::Monday, DayOfWeek::Wednesday, DayOfWeek::Saturday]
        );
        assert_eq!(DayOfWeek::Monday.index(), 0);
        assert_eq!(DayOfWeek::Saturday.index(), 5);
    }

    #[test]
    fn test_day_parse() {
        assert_eq!("monday".parse::<DayOfWeek>(), Ok(DayOfWeek::Monday));
        assert_eq!(" Friday ".parse::<DayOfWeek>(), Ok(DayOfWeek::Friday));
        assert!("Sunday".parse::<DayOfWeek>().is_err());
    }

    #[test]
    fn test_day_from_date() {
        // 2025-09-01 is a Monday
        let monday = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(DayOfWeek::from_date(monday), Some(DayOfWeek::Monday));
        let saturday = NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
        assert_eq!(DayOfWeek::from_date(saturday), Some(DayOfWeek::Saturday));
        let sunday = NaiveDate::from_ymd_opt(2025, 9, 7).unwrap();
        assert_eq!(DayOfWeek::from_date(sunday), None);
        assert_eq!(Weekday::from(DayOfWeek::Thursday), Weekday::Thu);
    }

    #[test]
    fn test_draft_apply_changes() {
        let draft = EntryDraft::new("s1", "c1", "math", "t1", DayOfWeek::Monday, "08:00", "09:00")
            .with_room("Salle 1")
            .with_notes("bring calculators");
        let changes = EntryChanges {
            start_time: Some("10:00".to_string()),
            end_time: Some("11:00".to_string()),
            teacher_id: Some("t2".to_string()),
            notes: Some(String::new()),
            ..Default::default()
        };

        let updated = draft.apply(&changes);
        assert_eq!(updated.start_time, "10:00");
        assert_eq!(updated.end_time, "11:00");
        assert_eq!(updated.teacher_id, "t2");
        assert_eq!(updated.room, "Salle 1");
        assert_eq!(updated.day_of_week, Some(DayOfWeek::Monday));
        assert_eq!(updated.notes, None);
    }

    #[test]
    fn test_draft_deserializes_document_fields() {
        let draft: EntryDraft = serde_json::from_str(
            r#"{
                "schoolId": "s1",
                "classId": "c1",
                "subjectId": "math",
                "teacherId": "t1",
                "dayOfWeek": "Tuesday",
                "startTime": "08:00",
                "endTime": "09:30",
                "room": "Salle Informatique"
            }"#,
        )
        .unwrap();
        assert_eq!(draft.day_of_week, Some(DayOfWeek::Tuesday));
        assert!(draft.is_recurring);
        assert_eq!(draft.semester, None);
        assert_eq!(draft.id, None);
    }

    fn stored_document(start: &str, end: &str, duration: u64) -> String {
        format!(
            r#"{{
                "id": "e1",
                "schoolId": "s1",
                "classId": "c1",
                "subjectId": "math",
                "teacherId": "t1",
                "dayOfWeek": "Monday",
                "startTime": "{start}",
                "endTime": "{end}",
                "duration": {duration},
                "room": "Salle 1",
                "semester": "current",
                "isActive": true,
                "isRecurring": true,
                "notes": null,
                "createdAt": "2025-09-01T08:00:00Z",
                "updatedAt": "2025-09-01T08:00:00Z",
                "revision": 3
            }}"#
        )
    }

    #[test]
    fn test_stored_entry_duration_is_recomputed() {
        let entry: ScheduleEntry =
            serde_json::from_str(&stored_document("08:00", "09:30", 4294967295)).unwrap();
        assert_eq!(entry.duration, 90);
        assert_eq!(entry.revision, 3);
        assert_eq!(entry.time_range().to_string(), "08:00-09:30");
    }

    #[test]
    fn test_stored_entry_with_reversed_times_is_rejected() {
        let err = serde_json::from_str::<ScheduleEntry>(&stored_document("10:00", "09:00", 60))
            .unwrap_err();
        assert!(err.to_string().contains("end time 09:00 must be after start time 10:00"));

        assert!(serde_json::from_str::<ScheduleEntry>(&stored_document("09:00", "09:00", 0)).is_err());
    }

    #[test]
    fn test_stored_entry_with_blank_id_is_rejected() {
        let document = stored_document("08:00", "09:00", 60).replace(r#""id": "e1""#, r#""id": " ""#);
        assert!(serde_json::from_str::<ScheduleEntry>(&document).is_err());
    }

    #[test]
    fn test_entry_round_trips_through_document() {
        let entry: ScheduleEntry =
            serde_json::from_str(&stored_document("13:10", "14:55", 105)).unwrap();
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""duration":105"#));
        let back: ScheduleEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
