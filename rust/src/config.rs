//! Configuration types for the timetable engine.

use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

/// What to do with a candidate entry that produced conflicts.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Refuse to store the entry and return the conflicts as an error.
    #[default]
    Reject,
    /// Store the entry anyway and hand the conflicts back as warnings.
    Warn,
}

/// Engine-wide settings for validation, conflict detection and logging.
#[pyclass]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Shortest accepted lesson in minutes (inclusive)
    #[pyo3(get, set)]
    pub min_duration_minutes: u32,
    /// Longest accepted lesson in minutes (inclusive)
    #[pyo3(get, set)]
    pub max_duration_minutes: u32,
    /// Room labels containing any of these (case-insensitive) are shared
    /// resources and get room-conflict checks. Other rooms are never checked.
    #[pyo3(get, set)]
    pub shared_room_keywords: Vec<String>,
    /// Semester assigned to drafts that do not name one
    #[pyo3(get, set)]
    pub default_semester: String,
    #[pyo3(get, set)]
    pub conflict_policy: ConflictPolicy,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: 30,
            max_duration_minutes: 360,
            shared_room_keywords: vec!["informatique".to_string(), "computer lab".to_string()],
            default_semester: "current".to_string(),
            conflict_policy: ConflictPolicy::Reject,
            verbosity: 0,
        }
    }
}

impl EngineConfig {
    /// Whether a room label names a shared, conflict-checked resource.
    pub fn is_shared_room(&self, room: &str) -> bool {
        let room = room.to_lowercase();
        self.shared_room_keywords
            .iter()
            .filter(|k| !k.is_empty())
            .any(|k| room.contains(&k.to_lowercase()))
    }
}

#[pymethods]
impl EngineConfig {
    #[new]
    #[pyo3(signature = (
        min_duration_minutes=None,
        max_duration_minutes=None,
        shared_room_keywords=None,
        default_semester=None,
        conflict_policy=None,
        verbosity=0
    ))]
    fn py_new(
        min_duration_minutes: Option<u32>,
        max_duration_minutes: Option<u32>,
        shared_room_keywords: Option<Vec<String>>,
        default_semester: Option<String>,
        conflict_policy: Option<ConflictPolicy>,
        verbosity: u8,
    ) -> Self {
        let defaults = Self::default();
        Self {
            min_duration_minutes: min_duration_minutes.unwrap_or(defaults.min_duration_minutes),
            max_duration_minutes: max_duration_minutes.unwrap_or(defaults.max_duration_minutes),
            shared_room_keywords: shared_room_keywords.unwrap_or(defaults.shared_room_keywords),
            default_semester: default_semester.unwrap_or(defaults.default_semester),
            conflict_policy: conflict_policy.unwrap_or(defaults.conflict_policy),
            verbosity,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "EngineConfig(duration={}..={}, shared_rooms={:?}, semester={:?}, policy={:?})",
            self.min_duration_minutes,
            self.max_duration_minutes,
            self.shared_room_keywords,
            self.default_semester,
            self.conflict_policy
        )
    }
}
