//! Weekly class timetable engine.
//!
//! Validates lesson entries, detects teacher and shared-room double-bookings
//! against the active timetable, and derives class/teacher timetables and
//! teaching workload. The [`Timetable`] service wires these together over an
//! injected [`EntryStore`]; the Python module exposes the pure functions.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

mod config;
pub mod conflicts;
pub mod logging;
mod models;
pub mod queries;
pub mod store;
pub mod time;
pub mod timetable;
pub mod validation;

pub use config::{ConflictPolicy, EngineConfig};
pub use conflicts::{check_conflicts, detect_with_store};
pub use models::{
    Conflict, ConflictKind, DayOfWeek, EntryChanges, EntryDocumentError, EntryDraft,
    ScheduleEntry, Workload,
};
pub use store::{EntryFilter, EntryStore, InMemoryStore, StoreError};
pub use time::{TimeOfDay, TimeParseError, TimeRange};
pub use timetable::{Admission, ScheduleError, Timetable};
pub use validation::{validate, Field, ValidationError, ValidationErrorKind};

/// Validate a draft and return the normalized entry.
///
/// # Raises
/// * ValueError listing every validation problem
#[pyfunction]
#[pyo3(name = "validate_entry", signature = (draft, config=None))]
fn py_validate_entry(draft: EntryDraft, config: Option<EngineConfig>) -> PyResult<ScheduleEntry> {
    let config = config.unwrap_or_default();
    validate(&draft, &config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        pyo3::exceptions::PyValueError::new_err(messages.join("; "))
    })
}

/// Check a validated entry against the active entries of its semester.
///
/// Returns at most one teacher conflict followed by at most one room conflict.
#[pyfunction]
#[pyo3(name = "detect_conflicts", signature = (candidate, active_entries, config=None))]
fn py_detect_conflicts(
    candidate: ScheduleEntry,
    active_entries: Vec<ScheduleEntry>,
    config: Option<EngineConfig>,
) -> Vec<Conflict> {
    check_conflicts(&candidate, &active_entries, &config.unwrap_or_default())
}

#[pyfunction]
#[pyo3(name = "class_timetable")]
fn py_class_timetable(
    entries: Vec<ScheduleEntry>,
    class_id: &str,
    semester: &str,
) -> Vec<ScheduleEntry> {
    queries::class_timetable(&entries, class_id, semester)
        .into_iter()
        .cloned()
        .collect()
}

#[pyfunction]
#[pyo3(name = "teacher_timetable")]
fn py_teacher_timetable(
    entries: Vec<ScheduleEntry>,
    teacher_id: &str,
    semester: &str,
) -> Vec<ScheduleEntry> {
    queries::teacher_timetable(&entries, teacher_id, semester)
        .into_iter()
        .cloned()
        .collect()
}

#[pyfunction]
#[pyo3(name = "teacher_workload")]
fn py_teacher_workload(entries: Vec<ScheduleEntry>, teacher_id: &str, semester: &str) -> Workload {
    queries::teacher_workload(&entries, teacher_id, semester)
}

/// The timetable_engine Python module.
#[pymodule]
fn timetable_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<DayOfWeek>()?;
    m.add_class::<EntryDraft>()?;
    m.add_class::<ScheduleEntry>()?;
    m.add_class::<ConflictKind>()?;
    m.add_class::<Conflict>()?;
    m.add_class::<Workload>()?;

    // Config types
    m.add_class::<EngineConfig>()?;
    m.add_class::<ConflictPolicy>()?;

    // Engine
    m.add_function(wrap_pyfunction!(py_validate_entry, m)?)?;
    m.add_function(wrap_pyfunction!(py_detect_conflicts, m)?)?;
    m.add_function(wrap_pyfunction!(py_class_timetable, m)?)?;
    m.add_function(wrap_pyfunction!(py_teacher_timetable, m)?)?;
    m.add_function(wrap_pyfunction!(py_teacher_workload, m)?)?;

    Ok(())
}
