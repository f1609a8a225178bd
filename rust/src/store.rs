//! Schedule entry persistence.
//!
//! The engine never talks to a database directly. It goes through
//! [`EntryStore`], which the CRUD layer implements over its document
//! collection. [`InMemoryStore`] is the reference implementation and the fake
//! used in tests.
//!
//! Writes carry a revision check: `replace` names the revision it read, and the
//! store refuses the write if another writer got there first.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::models::ScheduleEntry;

/// Errors raised by a store. `Unavailable` means "could not check", which
/// callers must never read as "no conflict".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Schedule store unavailable: {0}")]
    Unavailable(String),
    #[error("Schedule entry not found: {0}")]
    NotFound(String),
    #[error("Schedule entry already exists: {0}")]
    DuplicateId(String),
    #[error("Schedule entry {id} changed concurrently (expected revision {expected}, found {found})")]
    StaleRevision { id: String, expected: u64, found: u64 },
}

/// Selects active entries of one semester, optionally narrowed further.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryFilter {
    pub semester: String,
    pub school_id: Option<String>,
    pub class_id: Option<String>,
    pub teacher_id: Option<String>,
    /// Compared case-insensitively
    pub room: Option<String>,
}

impl EntryFilter {
    pub fn semester(semester: impl Into<String>) -> Self {
        Self {
            semester: semester.into(),
            school_id: None,
            class_id: None,
            teacher_id: None,
            room: None,
        }
    }

    pub fn school(mut self, school_id: impl Into<String>) -> Self {
        self.school_id = Some(school_id.into());
        self
    }

    pub fn class(mut self, class_id: impl Into<String>) -> Self {
        self.class_id = Some(class_id.into());
        self
    }

    pub fn teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Whether an entry is active and satisfies every set criterion.
    pub fn matches(&self, entry: &ScheduleEntry) -> bool {
        entry.is_active
            && entry.semester == self.semester
            && self.school_id.as_ref().map_or(true, |s| *s == entry.school_id)
            && self.class_id.as_ref().map_or(true, |c| *c == entry.class_id)
            && self.teacher_id.as_ref().map_or(true, |t| *t == entry.teacher_id)
            && self
                .room
                .as_ref()
                .map_or(true, |r| r.to_lowercase() == entry.room.to_lowercase())
    }
}

/// Repository of schedule entries.
///
/// Implementations backed by a shared database should run `insert`/`replace`
/// in the same transaction as the `active_entries` reads that preceded them,
/// or rely on the revision check in `replace`.
pub trait EntryStore {
    /// Fetch one entry by id, active or not.
    fn get(&self, id: &str) -> Result<Option<ScheduleEntry>, StoreError>;

    /// All active entries matching the filter.
    fn active_entries(&self, filter: &EntryFilter) -> Result<Vec<ScheduleEntry>, StoreError>;

    /// Store a new entry. Returns it as stored, with revision 1.
    fn insert(&mut self, entry: ScheduleEntry) -> Result<ScheduleEntry, StoreError>;

    /// Overwrite an existing entry if its stored revision is still
    /// `expected_revision`. Returns it as stored, with the revision bumped.
    fn replace(
        &mut self,
        entry: ScheduleEntry,
        expected_revision: u64,
    ) -> Result<ScheduleEntry, StoreError>;
}

/// In-process store with teacher and class indexes.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    entries: FxHashMap<String, ScheduleEntry>,
    /// Insertion order of ids
    order: Vec<String>,
    by_teacher: FxHashMap<String, Vec<String>>,
    by_class: FxHashMap<String, Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            order: Vec::with_capacity(capacity),
            by_teacher: FxHashMap::default(),
            by_class: FxHashMap::default(),
        }
    }

    /// Number of stored entries, including inactive ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every stored entry in insertion order, including inactive ones.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    fn index(map: &mut FxHashMap<String, Vec<String>>, key: &str, id: &str) {
        map.entry(key.to_string()).or_default().push(id.to_string());
    }

    fn unindex(map: &mut FxHashMap<String, Vec<String>>, key: &str, id: &str) {
        if let Some(ids) = map.get_mut(key) {
            ids.retain(|i| i != id);
            if ids.is_empty() {
                map.remove(key);
            }
        }
    }

    /// Ids worth scanning for a filter: the narrowest index available.
    fn candidate_ids(&self, filter: &EntryFilter) -> &[String] {
        if let Some(teacher) = &filter.teacher_id {
            return self.by_teacher.get(teacher).map(Vec::as_slice).unwrap_or(&[]);
        }
        if let Some(class) = &filter.class_id {
            return self.by_class.get(class).map(Vec::as_slice).unwrap_or(&[]);
        }
        &self.order
    }
}

impl EntryStore for InMemoryStore {
    fn get(&self, id: &str) -> Result<Option<ScheduleEntry>, StoreError> {
        Ok(self.entries.get(id).cloned())
    }

    fn active_entries(&self, filter: &EntryFilter) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(self
            .candidate_ids(filter)
            .iter()
            .filter_map(|id| self.entries.get(id))
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn insert(&mut self, mut entry: ScheduleEntry) -> Result<ScheduleEntry, StoreError> {
        if self.entries.contains_key(&entry.id) {
            return Err(StoreError::DuplicateId(entry.id));
        }
        entry.revision = 1;

        Self::index(&mut self.by_teacher, &entry.teacher_id, &entry.id);
        Self::index(&mut self.by_class, &entry.class_id, &entry.id);
        self.order.push(entry.id.clone());
        self.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    fn replace(
        &mut self,
        mut entry: ScheduleEntry,
        expected_revision: u64,
    ) -> Result<ScheduleEntry, StoreError> {
        let Some(current) = self.entries.get(&entry.id) else {
            return Err(StoreError::NotFound(entry.id));
        };
        if current.revision != expected_revision {
            return Err(StoreError::StaleRevision {
                id: entry.id,
                expected: expected_revision,
                found: current.revision,
            });
        }

        let old_teacher = current.teacher_id.clone();
        let old_class = current.class_id.clone();
        if old_teacher != entry.teacher_id {
            Self::unindex(&mut self.by_teacher, &old_teacher, &entry.id);
            Self::index(&mut self.by_teacher, &entry.teacher_id, &entry.id);
        }
        if old_class != entry.class_id {
            Self::unindex(&mut self.by_class, &old_class, &entry.id);
            Self::index(&mut self.by_class, &entry.class_id, &entry.id);
        }

        entry.revision = expected_revision + 1;
        self.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }
}
