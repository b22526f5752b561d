//! Persistence layer for the Course Store

use crate::course::Course;
use crate::error::StorageError;
use crate::store::{matches_query, CourseQuery, CourseStore};
use crate::types::{now_millis, CourseId, UserId};
use sled::Tree;

/// Sled-based implementation of CourseStore
pub struct SledCourseStore {
    tree: Tree,
}

impl SledCourseStore {
    pub const TREE_NAME: &'static str = "courses";

    pub fn new(db: &sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(Self::TREE_NAME)?;
        Ok(Self { tree })
    }

    fn encode(course: &Course) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(course)
            .map_err(|e| StorageError::Serialization(format!("course encode: {e}")))
    }

    fn decode(value: &[u8]) -> Result<Course, StorageError> {
        bincode::deserialize(value)
            .map_err(|e| StorageError::Serialization(format!("course decode: {e}")))
    }
}

impl CourseStore for SledCourseStore {
    fn get(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        match self.tree.get(id.as_str().as_bytes())? {
            Some(value) => Ok(Some(Self::decode(&value)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, course: &Course) -> Result<(), StorageError> {
        let key = course.id.as_str().as_bytes().to_vec();
        let value = Self::encode(course)?;
        let previous = self
            .tree
            .compare_and_swap(&key, None as Option<&[u8]>, Some(value))?;
        if previous.is_err() {
            return Err(StorageError::Serialization(format!(
                "course {} already exists",
                course.id
            )));
        }
        Ok(())
    }

    fn save(&self, mut course: Course) -> Result<Course, StorageError> {
        let key = course.id.as_str().as_bytes().to_vec();
        let current = self
            .tree
            .get(&key)?
            .ok_or_else(|| StorageError::CourseNotFound(course.id.clone()))?;
        let stored = Self::decode(&current)?;
        if stored.doc_version != course.doc_version {
            return Err(StorageError::VersionConflict {
                course_id: course.id.clone(),
                expected: course.doc_version,
                found: stored.doc_version,
            });
        }

        course.doc_version += 1;
        course.updated_at_ms = now_millis();
        let value = Self::encode(&course)?;
        let swapped = self
            .tree
            .compare_and_swap(&key, Some(current), Some(value))?;
        if swapped.is_err() {
            // Lost the race between the version check and the swap.
            return Err(StorageError::VersionConflict {
                course_id: course.id.clone(),
                expected: course.doc_version - 1,
                found: stored.doc_version,
            });
        }
        Ok(course)
    }

    fn list_for_user(
        &self,
        user: &UserId,
        query: &CourseQuery,
    ) -> Result<Vec<Course>, StorageError> {
        let mut courses = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item?;
            let course = Self::decode(&value)?;
            if matches_query(&course, user, query) {
                courses.push(course);
            }
        }
        courses.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms));
        let limited: Vec<Course> = courses
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(limited)
    }
}
