//! Course Store
//!
//! Whole-document persistence for the course aggregate, behind a trait seam.
//! Saves are read-modify-write with an optimistic-concurrency token
//! (`doc_version`): a stale save fails instead of silently clobbering.

pub mod persistence;

pub use persistence::SledCourseStore;

use crate::course::{Course, CourseStage, CourseStatus};
use crate::error::StorageError;
use crate::types::{CourseId, UserId};

/// Filters and paging for course listings.
#[derive(Debug, Clone, Default)]
pub struct CourseQuery {
    pub status: Option<CourseStatus>,
    pub stage: Option<CourseStage>,
    /// Case-insensitive match against title or theme
    pub search: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Course Store interface
pub trait CourseStore: Send + Sync {
    fn get(&self, id: &CourseId) -> Result<Option<Course>, StorageError>;

    /// Insert a freshly created course. Fails if the id already exists.
    fn insert(&self, course: &Course) -> Result<(), StorageError>;

    /// Compare-and-swap save: succeeds only when the stored `doc_version`
    /// matches the one the caller loaded, and returns the course with the
    /// bumped version and refreshed `updated_at_ms`.
    fn save(&self, course: Course) -> Result<Course, StorageError>;

    /// Courses the user owns or collaborates on, newest-updated first.
    fn list_for_user(
        &self,
        user: &UserId,
        query: &CourseQuery,
    ) -> Result<Vec<Course>, StorageError>;
}

/// Apply query filters to one course; shared by store implementations.
pub fn matches_query(course: &Course, user: &UserId, query: &CourseQuery) -> bool {
    if !course.has_access(user) {
        return false;
    }
    if let Some(status) = query.status {
        if course.status != status {
            return false;
        }
    }
    if let Some(stage) = query.stage {
        if course.current_stage != stage {
            return false;
        }
    }
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        let in_title = course.title.to_lowercase().contains(&needle);
        let in_theme = course.metadata.theme.to_lowercase().contains(&needle);
        if !in_title && !in_theme {
            return false;
        }
    }
    true
}
