//! Temporal validation of candidate entries.
//!
//! Turns an [`EntryDraft`] into a normalized [`ScheduleEntry`] or reports every
//! problem found. Checks never stop at the first failure, so a form can show
//! all of them at once:
//! 1. Reference fields and day are present
//! 2. Start/end times are non-empty and in strict `HH:MM` format
//! 3. End is strictly after start (only when both times parsed)
//! 4. Duration is within the configured bounds (only when ordering passed)
//!
//! Nothing here looks at other entries; overlap detection lives in
//! [`crate::conflicts`].

use chrono::Utc;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::models::{EntryDraft, ScheduleEntry};
use crate::time::{TimeOfDay, TimeRange};
use crate::log_checks;

/// Draft field a validation error is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SchoolId,
    ClassId,
    SubjectId,
    TeacherId,
    DayOfWeek,
    StartTime,
    EndTime,
    Duration,
}

impl Field {
    /// Document field name, as the calling form knows it.
    pub fn name(self) -> &'static str {
        match self {
            Self::SchoolId => "schoolId",
            Self::ClassId => "classId",
            Self::SubjectId => "subjectId",
            Self::TeacherId => "teacherId",
            Self::DayOfWeek => "dayOfWeek",
            Self::StartTime => "startTime",
            Self::EndTime => "endTime",
            Self::Duration => "duration",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A mandatory field is empty or missing.
    Required,
    /// A time is not a valid `HH:MM` value.
    InvalidFormat,
    /// The end time is equal to or before the start time.
    EndNotAfterStart,
    /// The lesson is shorter or longer than allowed.
    DurationOutOfRange,
}

/// A field-scoped validation failure, surfaced verbatim to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    fn new(field: Field, kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

pub type ValidationResult = Result<ScheduleEntry, Vec<ValidationError>>;

/// Validate a draft and build the normalized entry, with `duration` derived.
///
/// A draft without an id receives a fresh one. The returned entry is active,
/// timestamped now, and has revision 0 until a store commits it.
pub fn validate(draft: &EntryDraft, config: &EngineConfig) -> ValidationResult {
    let mut errors = Vec::new();

    let references = [
        (Field::SchoolId, &draft.school_id),
        (Field::ClassId, &draft.class_id),
        (Field::SubjectId, &draft.subject_id),
        (Field::TeacherId, &draft.teacher_id),
    ];
    for (field, value) in references {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(
                field,
                ValidationErrorKind::Required,
                format!("{} is required", field),
            ));
        }
    }

    if draft.day_of_week.is_none() {
        errors.push(ValidationError::new(
            Field::DayOfWeek,
            ValidationErrorKind::Required,
            "dayOfWeek is required",
        ));
    }

    let start = parse_time(Field::StartTime, &draft.start_time, &mut errors);
    let end = parse_time(Field::EndTime, &draft.end_time, &mut errors);

    let mut duration = None;
    if let (Some(start), Some(end)) = (start, end) {
        match TimeRange::new(start, end) {
            None => errors.push(ValidationError::new(
                Field::EndTime,
                ValidationErrorKind::EndNotAfterStart,
                format!("end time {} must be after start time {}", end, start),
            )),
            Some(range) => {
                let minutes = range.duration_minutes();
                if minutes < config.min_duration_minutes || minutes > config.max_duration_minutes {
                    errors.push(ValidationError::new(
                        Field::Duration,
                        ValidationErrorKind::DurationOutOfRange,
                        format!(
                            "duration of {} minutes must be between {} and {} minutes",
                            minutes, config.min_duration_minutes, config.max_duration_minutes
                        ),
                    ));
                } else {
                    duration = Some(minutes);
                }
            }
        }
    }

    // An empty error list implies every value below is Some.
    match (draft.day_of_week, start, end, duration) {
        (Some(day_of_week), Some(start_time), Some(end_time), Some(duration))
            if errors.is_empty() =>
        {
            let now = Utc::now();
            let semester = draft
                .semester
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(config.default_semester.as_str())
                .to_string();

            Ok(ScheduleEntry {
                id: draft
                    .id
                    .as_deref()
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map_or_else(|| Uuid::new_v4().to_string(), str::to_string),
                school_id: draft.school_id.clone(),
                class_id: draft.class_id.clone(),
                subject_id: draft.subject_id.clone(),
                teacher_id: draft.teacher_id.clone(),
                day_of_week,
                start_time,
                end_time,
                duration,
                room: draft.room.trim().to_string(),
                semester,
                is_active: true,
                is_recurring: draft.is_recurring,
                notes: draft.notes.clone().filter(|n| !n.is_empty()),
                created_at: now,
                updated_at: now,
                revision: 0,
            })
        }
        _ => {
            log_checks!(
                config.verbosity,
                "Rejected draft for class {:?}: {} validation error(s)",
                draft.class_id,
                errors.len()
            );
            Err(errors)
        }
    }
}

/// Blank input is `Required`; anything else must be exactly `HH:MM`, with no
/// surrounding whitespace, same as [`TimeOfDay::parse`].
fn parse_time(field: Field, raw: &str, errors: &mut Vec<ValidationError>) -> Option<TimeOfDay> {
    if raw.trim().is_empty() {
        errors.push(ValidationError::new(
            field,
            ValidationErrorKind::Required,
            format!("{} is required", field),
        ));
        return None;
    }

    match TimeOfDay::parse(raw) {
        Ok(t) => Some(t),
        Err(e) => {
            errors.push(ValidationError::new(
                field,
                ValidationErrorKind::InvalidFormat,
                e.to_string(),
            ));
            None
        }
    }
}
