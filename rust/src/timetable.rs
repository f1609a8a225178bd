//! Store-backed timetable service.
//!
//! [`Timetable`] runs the full write path for schedule entries:
//! validate the draft, check it against the active entries in the store,
//! then commit. Each write happens inside one `&mut self` call, so checks and
//! commits cannot interleave within a process. Across processes the store's
//! revision check catches writers that raced.

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::config::{ConflictPolicy, EngineConfig};
use crate::conflicts::detect_with_store;
use crate::models::{Conflict, EntryChanges, EntryDraft, ScheduleEntry, Workload};
use crate::queries;
use crate::store::{EntryFilter, EntryStore, StoreError};
use crate::validation::{validate, ValidationError};
use crate::{log_changes, log_checks};

/// Errors that can occur while writing to the timetable.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The draft is malformed; every problem found is listed.
    #[error("Invalid schedule entry: {}", join(.0))]
    Validation(Vec<ValidationError>),
    /// The entry would double-book a teacher or shared room.
    #[error("Schedule conflict: {}", join(.0))]
    Conflicts(Vec<Conflict>),
    #[error("Schedule entry not found: {0}")]
    NotFound(String),
    /// The store failed. Nothing was checked or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ScheduleError {
    /// Whether the user can fix this by changing the submission, as opposed
    /// to an operational failure.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// An entry accepted by the store.
///
/// `conflicts` is only non-empty under [`ConflictPolicy::Warn`].
#[derive(Clone, Debug, PartialEq)]
pub struct Admission {
    pub entry: ScheduleEntry,
    pub conflicts: Vec<Conflict>,
}

/// Timetable engine over an injected store.
pub struct Timetable<S: EntryStore> {
    store: S,
    config: EngineConfig,
}

impl<S: EntryStore> Timetable<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Validate and conflict-check a draft without storing anything.
    pub fn check(&self, draft: &EntryDraft) -> Result<Vec<Conflict>, ScheduleError> {
        let candidate = validate(draft, &self.config).map_err(ScheduleError::Validation)?;
        Ok(detect_with_store(&candidate, &self.store, &self.config)?)
    }

    /// Validate, conflict-check and store a new entry.
    pub fn create(&mut self, draft: &EntryDraft) -> Result<Admission, ScheduleError> {
        let candidate = validate(draft, &self.config).map_err(ScheduleError::Validation)?;
        let conflicts = self.screen(&candidate)?;

        let entry = self.store.insert(candidate)?;
        log_changes!(
            self.config.verbosity,
            "Created entry {} (class {}, teacher {}, {} {})",
            entry.id,
            entry.class_id,
            entry.teacher_id,
            entry.day_of_week,
            entry.time_range()
        );
        Ok(Admission { entry, conflicts })
    }

    /// Apply changes to an existing entry and re-run validation and conflict
    /// checks against every other active entry.
    ///
    /// With `expected_revision`, the update is refused if the entry changed
    /// since the caller read it.
    pub fn update(
        &mut self,
        id: &str,
        changes: &EntryChanges,
        expected_revision: Option<u64>,
    ) -> Result<Admission, ScheduleError> {
        let current = self.load(id)?;
        if let Some(expected) = expected_revision {
            if expected != current.revision {
                return Err(StoreError::StaleRevision {
                    id: id.to_string(),
                    expected,
                    found: current.revision,
                }
                .into());
            }
        }

        let draft = current.to_draft().apply(changes);
        let mut candidate = validate(&draft, &self.config).map_err(ScheduleError::Validation)?;
        candidate.created_at = current.created_at;
        candidate.is_active = current.is_active;

        // Inactive entries are checked again when reactivated.
        let conflicts = if candidate.is_active {
            self.screen(&candidate)?
        } else {
            Vec::new()
        };

        let entry = self.store.replace(candidate, current.revision)?;
        log_changes!(
            self.config.verbosity,
            "Updated entry {} to {} {} (revision {})",
            entry.id,
            entry.day_of_week,
            entry.time_range(),
            entry.revision
        );
        Ok(Admission { entry, conflicts })
    }

    /// Soft-delete an entry. Deactivating an inactive entry is a no-op.
    pub fn deactivate(&mut self, id: &str) -> Result<ScheduleEntry, ScheduleError> {
        let mut entry = self.load(id)?;
        if !entry.is_active {
            return Ok(entry);
        }

        let revision = entry.revision;
        entry.is_active = false;
        entry.updated_at = Utc::now();
        let entry = self.store.replace(entry, revision)?;
        log_changes!(self.config.verbosity, "Deactivated entry {}", entry.id);
        Ok(entry)
    }

    /// Bring a deactivated entry back, provided its slot is still free.
    pub fn reactivate(&mut self, id: &str) -> Result<Admission, ScheduleError> {
        let mut entry = self.load(id)?;
        if entry.is_active {
            return Ok(Admission {
                entry,
                conflicts: Vec::new(),
            });
        }

        entry.is_active = true;
        let conflicts = self.screen(&entry)?;

        let revision = entry.revision;
        entry.updated_at = Utc::now();
        let entry = self.store.replace(entry, revision)?;
        log_changes!(self.config.verbosity, "Reactivated entry {}", entry.id);
        Ok(Admission { entry, conflicts })
    }

    /// Weekly timetable of a class.
    pub fn class_timetable(
        &self,
        class_id: &str,
        semester: &str,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let entries = self
            .store
            .active_entries(&EntryFilter::semester(semester).class(class_id))?;
        Ok(queries::class_timetable(&entries, class_id, semester)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Lessons of a class on a calendar date.
    pub fn class_lessons_on(
        &self,
        class_id: &str,
        semester: &str,
        date: NaiveDate,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let entries = self
            .store
            .active_entries(&EntryFilter::semester(semester).class(class_id))?;
        let timetable = queries::class_timetable(&entries, class_id, semester);
        Ok(queries::lessons_on(&timetable, date)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Weekly timetable of a teacher across all classes.
    pub fn teacher_timetable(
        &self,
        teacher_id: &str,
        semester: &str,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let entries = self
            .store
            .active_entries(&EntryFilter::semester(semester).teacher(teacher_id))?;
        Ok(queries::teacher_timetable(&entries, teacher_id, semester)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn teacher_workload(&self, teacher_id: &str, semester: &str) -> Result<Workload, StoreError> {
        let entries = self
            .store
            .active_entries(&EntryFilter::semester(semester).teacher(teacher_id))?;
        Ok(queries::teacher_workload(&entries, teacher_id, semester))
    }

    fn load(&self, id: &str) -> Result<ScheduleEntry, ScheduleError> {
        self.store
            .get(id)?
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))
    }

    /// Detect conflicts and apply the configured policy.
    fn screen(&self, candidate: &ScheduleEntry) -> Result<Vec<Conflict>, ScheduleError> {
        let conflicts = detect_with_store(candidate, &self.store, &self.config)?;
        if conflicts.is_empty() {
            return Ok(conflicts);
        }

        match self.config.conflict_policy {
            ConflictPolicy::Reject => {
                log_checks!(
                    self.config.verbosity,
                    "Rejected entry {}: {} conflict(s)",
                    candidate.id,
                    conflicts.len()
                );
                Err(ScheduleError::Conflicts(conflicts))
            }
            ConflictPolicy::Warn => {
                log_checks!(
                    self.config.verbosity,
                    "Admitting entry {} despite {} conflict(s)",
                    candidate.id,
                    conflicts.len()
                );
                Ok(conflicts)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictKind, DayOfWeek};
    use crate::store::InMemoryStore;
    use crate::validation::ValidationErrorKind;

    fn timetable() -> Timetable<InMemoryStore> {
        Timetable::new(InMemoryStore::new(), EngineConfig::default())
    }

    fn lesson(class: &str, teacher: &str, day: DayOfWeek, start: &str, end: &str) -> EntryDraft {
        EntryDraft::new("s1", class, "math", teacher, day, start, end).with_room("Salle 1")
    }

    #[test]
    fn test_create_stores_validated_entry() {
        let mut tt = timetable();
        let admission = tt
            .create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:30"))
            .unwrap();

        assert!(admission.conflicts.is_empty());
        assert_eq!(admission.entry.duration, 90);
        assert_eq!(admission.entry.revision, 1);
        assert_eq!(tt.store().len(), 1);
    }

    #[test]
    fn test_create_rejects_invalid_draft() {
        let mut tt = timetable();
        let err = tt
            .create(&lesson("c1", "t1", DayOfWeek::Monday, "09:00", "09:10"))
            .unwrap_err();

        match err {
            ScheduleError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].kind, ValidationErrorKind::DurationOutOfRange);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(tt.store().is_empty());
    }

    #[test]
    fn test_create_rejects_teacher_double_booking() {
        let mut tt = timetable();
        let first = tt
            .create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap()
            .entry;

        let err = tt
            .create(&lesson("c2", "t1", DayOfWeek::Monday, "08:30", "09:30"))
            .unwrap_err();
        match &err {
            ScheduleError::Conflicts(conflicts) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].kind, ConflictKind::Teacher);
                assert_eq!(conflicts[0].conflicting_entry_id, first.id);
            }
            other => panic!("expected conflicts, got {other:?}"),
        }
        assert!(err.is_user_facing());
        assert_eq!(tt.store().len(), 1);

        // Back-to-back is fine
        tt.create(&lesson("c2", "t1", DayOfWeek::Monday, "09:00", "10:00"))
            .unwrap();
    }

    #[test]
    fn test_warn_policy_admits_with_conflicts() {
        let config = EngineConfig {
            conflict_policy: ConflictPolicy::Warn,
            ..EngineConfig::default()
        };
        let mut tt = Timetable::new(InMemoryStore::new(), config);
        tt.create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap();

        let admission = tt
            .create(&lesson("c2", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap();
        assert_eq!(admission.conflicts.len(), 1);
        assert_eq!(tt.store().len(), 2);
    }

    #[test]
    fn test_check_does_not_store() {
        let mut tt = timetable();
        tt.create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap();

        let conflicts = tt
            .check(&lesson("c2", "t1", DayOfWeek::Monday, "08:30", "09:30"))
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(tt.store().len(), 1);
    }

    #[test]
    fn test_resaving_unchanged_entry_has_no_conflict() {
        let mut tt = timetable();
        let created = tt
            .create(
                &lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00")
                    .with_room("Salle Informatique"),
            )
            .unwrap()
            .entry;

        let admission = tt
            .update(&created.id, &EntryChanges::default(), Some(created.revision))
            .unwrap();
        assert!(admission.conflicts.is_empty());
        assert_eq!(admission.entry.revision, 2);
        assert_eq!(admission.entry.created_at, created.created_at);
        assert_eq!(admission.entry.id, created.id);
    }

    #[test]
    fn test_update_moves_lesson_and_rechecks() {
        let mut tt = timetable();
        tt.create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap();
        let other = tt
            .create(&lesson("c2", "t1", DayOfWeek::Monday, "10:00", "11:00"))
            .unwrap()
            .entry;

        let clash = EntryChanges {
            start_time: Some("08:30".to_string()),
            end_time: Some("09:30".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            tt.update(&other.id, &clash, None),
            Err(ScheduleError::Conflicts(_))
        ));

        let free = EntryChanges {
            day_of_week: Some(DayOfWeek::Tuesday),
            start_time: Some("08:30".to_string()),
            end_time: Some("09:30".to_string()),
            ..Default::default()
        };
        let moved = tt.update(&other.id, &free, None).unwrap().entry;
        assert_eq!(moved.day_of_week, DayOfWeek::Tuesday);
        assert_eq!(moved.start_time.to_string(), "08:30");
        assert_eq!(moved.duration, 60);
    }

    #[test]
    fn test_update_with_stale_revision() {
        let mut tt = timetable();
        let created = tt
            .create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap()
            .entry;
        let notes = EntryChanges {
            notes: Some("lab safety".to_string()),
            ..Default::default()
        };
        tt.update(&created.id, &notes, Some(1)).unwrap();

        let err = tt.update(&created.id, &notes, Some(1)).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Store(StoreError::StaleRevision {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_update_missing_entry() {
        let mut tt = timetable();
        let err = tt
            .update("nope", &EntryChanges::default(), None)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound(id) if id == "nope"));
    }

    #[test]
    fn test_deactivated_entry_frees_slot() {
        let mut tt = timetable();
        let first = tt
            .create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap()
            .entry;

        let retired = tt.deactivate(&first.id).unwrap();
        assert!(!retired.is_active);
        // Idempotent
        assert_eq!(tt.deactivate(&first.id).unwrap().revision, retired.revision);

        tt.create(&lesson("c2", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap();
        assert!(tt.class_timetable("c1", "current").unwrap().is_empty());

        // The slot is taken now, so bringing the old entry back conflicts
        assert!(matches!(
            tt.reactivate(&first.id),
            Err(ScheduleError::Conflicts(_))
        ));
    }

    #[test]
    fn test_reactivate_free_slot() {
        let mut tt = timetable();
        let first = tt
            .create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap()
            .entry;
        tt.deactivate(&first.id).unwrap();

        let admission = tt.reactivate(&first.id).unwrap();
        assert!(admission.entry.is_active);
        assert_eq!(tt.class_timetable("c1", "current").unwrap().len(), 1);
    }

    #[test]
    fn test_store_backed_queries() {
        let mut tt = timetable();
        tt.create(&lesson("c1", "t1", DayOfWeek::Tuesday, "10:00", "11:30"))
            .unwrap();
        tt.create(&lesson("c1", "t2", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap();
        tt.create(&lesson("c2", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap();
        tt.create(&lesson("c2", "t1", DayOfWeek::Friday, "14:00", "14:45"))
            .unwrap();

        let class = tt.class_timetable("c1", "current").unwrap();
        let days: Vec<_> = class.iter().map(|e| e.day_of_week).collect();
        assert_eq!(days, vec![DayOfWeek::Monday, DayOfWeek::Tuesday]);

        let teacher = tt.teacher_timetable("t1", "current").unwrap();
        assert_eq!(teacher.len(), 3);
        assert_eq!(teacher[0].class_id, "c2");

        let workload = tt.teacher_workload("t1", "current").unwrap();
        assert_eq!(workload.total_minutes, 60 + 90 + 45);
        assert_eq!(workload.course_count, 3);
        assert_eq!(workload.average_course_length, 65);

        // 2025-09-01 is a Monday
        let monday = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let lessons = tt.class_lessons_on("c1", "current", monday).unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].teacher_id, "t2");
    }

    #[test]
    fn test_semesters_are_independent() {
        let mut tt = timetable();
        tt.create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap();
        tt.create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00").with_semester("2026-S1"))
            .unwrap();
        assert_eq!(tt.teacher_timetable("t1", "2026-S1").unwrap().len(), 1);
    }

    struct DownStore;

    impl EntryStore for DownStore {
        fn get(&self, _id: &str) -> Result<Option<ScheduleEntry>, StoreError> {
            Err(StoreError::Unavailable("timeout".to_string()))
        }

        fn active_entries(&self, _filter: &EntryFilter) -> Result<Vec<ScheduleEntry>, StoreError> {
            Err(StoreError::Unavailable("timeout".to_string()))
        }

        fn insert(&mut self, _entry: ScheduleEntry) -> Result<ScheduleEntry, StoreError> {
            panic!("nothing may be written when the store cannot be read")
        }

        fn replace(
            &mut self,
            _entry: ScheduleEntry,
            _expected_revision: u64,
        ) -> Result<ScheduleEntry, StoreError> {
            panic!("nothing may be written when the store cannot be read")
        }
    }

    #[test]
    fn test_unavailable_store_is_not_treated_as_no_conflict() {
        let mut tt = Timetable::new(DownStore, EngineConfig::default());
        let err = tt
            .create(&lesson("c1", "t1", DayOfWeek::Monday, "08:00", "09:00"))
            .unwrap_err();

        assert!(matches!(err, ScheduleError::Store(StoreError::Unavailable(_))));
        assert!(!err.is_user_facing());
        assert!(tt.teacher_workload("t1", "current").is_err());
    }

    #[test]
    fn test_error_messages() {
        let mut tt = timetable();
        let err = tt
            .create(&lesson("c1", "t1", DayOfWeek::Monday, "10:00", "09:00"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid schedule entry: endTime: end time 09:00 must be after start time 10:00"
        );
    }
}
