//! Double-booking detection for teachers and shared rooms.
//!
//! A candidate conflicts with an existing entry when both are active, in the
//! same semester, on the same day, and their half-open time ranges overlap.
//! Two resources are checked, in this order:
//! - **Teacher**: same teacher, any school.
//! - **Room**: only for shared rooms (see [`EngineConfig::is_shared_room`]);
//!   same school and same room label, any teacher.
//!
//! At most one conflict per kind is reported: the first overlapping entry in
//! the order the store returned them. Whether a class is itself booked twice
//! is not checked.

use crate::config::EngineConfig;
use crate::models::{Conflict, ConflictKind, ScheduleEntry};
use crate::store::{EntryFilter, EntryStore, StoreError};
use crate::{log_checks, log_debug};

/// Scan `active_entries` for teacher and room double-bookings of `candidate`.
///
/// Entries sharing the candidate's id are skipped, so re-checking an entry
/// that is already stored never reports it against itself. Inactive entries
/// and other semesters are ignored even if present in the slice.
pub fn check_conflicts(
    candidate: &ScheduleEntry,
    active_entries: &[ScheduleEntry],
    config: &EngineConfig,
) -> Vec<Conflict> {
    let verbosity = config.verbosity;
    let mut conflicts = Vec::with_capacity(2);

    let competing = move || {
        active_entries.iter().filter(move |e| {
            e.is_active
                && e.id != candidate.id
                && e.semester == candidate.semester
                && e.day_of_week == candidate.day_of_week
        })
    };

    if let Some(existing) = competing()
        .filter(|e| e.teacher_id == candidate.teacher_id)
        .find(|e| overlaps(candidate, e, verbosity))
    {
        conflicts.push(teacher_conflict(candidate, existing));
    }

    if config.is_shared_room(&candidate.room) {
        let room = candidate.room.to_lowercase();
        if let Some(existing) = competing()
            .filter(|e| e.school_id == candidate.school_id && e.room.to_lowercase() == room)
            .find(|e| overlaps(candidate, e, verbosity))
        {
            conflicts.push(room_conflict(candidate, existing));
        }
    }

    for conflict in &conflicts {
        log_checks!(verbosity, "Entry {}: {}", candidate.id, conflict);
    }

    conflicts
}

/// Fetch competing entries from `store` and run [`check_conflicts`].
///
/// Fails closed: if the store cannot list entries the error is returned, never
/// an empty conflict list.
pub fn detect_with_store<S: EntryStore + ?Sized>(
    candidate: &ScheduleEntry,
    store: &S,
    config: &EngineConfig,
) -> Result<Vec<Conflict>, StoreError> {
    let mut competing = store.active_entries(
        &EntryFilter::semester(&candidate.semester).teacher(&candidate.teacher_id),
    )?;

    if config.is_shared_room(&candidate.room) {
        competing.extend(
            store.active_entries(
                &EntryFilter::semester(&candidate.semester)
                    .school(&candidate.school_id)
                    .room(&candidate.room),
            )?,
        );
    }

    Ok(check_conflicts(candidate, &competing, config))
}

fn overlaps(candidate: &ScheduleEntry, existing: &ScheduleEntry, verbosity: u8) -> bool {
    let hit = candidate.time_range().overlaps(&existing.time_range());
    log_debug!(
        verbosity,
        "{} {} vs {} {} ({}): {}",
        candidate.id,
        candidate.time_range(),
        existing.id,
        existing.time_range(),
        existing.day_of_week,
        if hit { "overlap" } else { "clear" }
    );
    hit
}

fn conflict_from(kind: ConflictKind, existing: &ScheduleEntry, message: String) -> Conflict {
    Conflict {
        kind,
        message,
        conflicting_entry_id: existing.id.clone(),
        class_id: existing.class_id.clone(),
        subject_id: existing.subject_id.clone(),
        teacher_id: existing.teacher_id.clone(),
        room: existing.room.clone(),
        day_of_week: existing.day_of_week,
        start_time: existing.start_time,
        end_time: existing.end_time,
    }
}

fn teacher_conflict(candidate: &ScheduleEntry, existing: &ScheduleEntry) -> Conflict {
    let message = format!(
        "Teacher {} already teaches subject {} to class {} on {} {}",
        candidate.teacher_id,
        existing.subject_id,
        existing.class_id,
        existing.day_of_week,
        existing.time_range()
    );
    conflict_from(ConflictKind::Teacher, existing, message)
}

fn room_conflict(candidate: &ScheduleEntry, existing: &ScheduleEntry) -> Conflict {
    let message = format!(
        "Room {} is already used by class {} (subject {}, teacher {}) on {} {}",
        candidate.room,
        existing.class_id,
        existing.subject_id,
        existing.teacher_id,
        existing.day_of_week,
        existing.time_range()
    );
    conflict_from(ConflictKind::Room, existing, message)
}
