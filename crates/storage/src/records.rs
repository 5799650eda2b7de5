//! Persisted JSON shape of a course forest.
//!
//! These mirror the domain tree field for field so the stored document keeps
//! the layout existing data already uses (camelCase keys, derived `progress`
//! and topic `completed` written out). Domain types stay free of serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use study_core::Forest;
use study_core::model::{
    Chapter, ChapterId, Course, CourseId, Name, Subject, SubjectId, Subtopic, SubtopicId, Topic,
    TopicId,
};

use crate::repository::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub id: CourseId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub subjects: Vec<SubjectRecord>,
    #[serde(default)]
    pub progress: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: SubjectId,
    pub name: String,
    #[serde(default)]
    pub chapters: Vec<ChapterRecord>,
    #[serde(default)]
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: ChapterId,
    pub name: String,
    #[serde(default)]
    pub topics: Vec<TopicRecord>,
    #[serde(default)]
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: TopicId,
    pub name: String,
    #[serde(default)]
    pub subtopics: Vec<SubtopicRecord>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtopicRecord {
    pub id: SubtopicId,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

impl CourseRecord {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            id: course.id().clone(),
            name: course.name().to_string(),
            description: course.description().to_owned(),
            deadline: course.deadline(),
            subjects: course.subjects().iter().map(SubjectRecord::from_subject).collect(),
            progress: course.progress().value(),
            created_at: course.created_at(),
        }
    }

    /// Convert the record back into a domain `Course`.
    ///
    /// Stored progress values are ignored; every level is re-aggregated from
    /// its children while the tree is rebuilt. Names are taken as stored.
    #[must_use]
    pub fn into_course(self) -> Course {
        Course::from_persisted(
            self.id,
            Name::from_persisted(self.name),
            self.description,
            self.deadline,
            self.created_at,
            self.subjects.into_iter().map(SubjectRecord::into_subject).collect(),
        )
    }
}

impl SubjectRecord {
    #[must_use]
    pub fn from_subject(subject: &Subject) -> Self {
        Self {
            id: subject.id().clone(),
            name: subject.name().to_string(),
            chapters: subject.chapters().iter().map(ChapterRecord::from_chapter).collect(),
            progress: subject.progress().value(),
        }
    }

    fn into_subject(self) -> Subject {
        Subject::from_persisted(
            self.id,
            Name::from_persisted(self.name),
            self.chapters.into_iter().map(ChapterRecord::into_chapter).collect(),
        )
    }
}

impl ChapterRecord {
    #[must_use]
    pub fn from_chapter(chapter: &Chapter) -> Self {
        Self {
            id: chapter.id().clone(),
            name: chapter.name().to_string(),
            topics: chapter.topics().iter().map(TopicRecord::from_topic).collect(),
            progress: chapter.progress().value(),
        }
    }

    fn into_chapter(self) -> Chapter {
        Chapter::from_persisted(
            self.id,
            Name::from_persisted(self.name),
            self.topics.into_iter().map(TopicRecord::into_topic).collect(),
        )
    }
}

impl TopicRecord {
    /// Writes the effective completion, so readers of the raw document see
    /// the same flag the progress figures were computed from.
    #[must_use]
    pub fn from_topic(topic: &Topic) -> Self {
        Self {
            id: topic.id().clone(),
            name: topic.name().to_string(),
            subtopics: topic
                .subtopics()
                .iter()
                .map(|s| SubtopicRecord {
                    id: s.id().clone(),
                    name: s.name().to_string(),
                    completed: s.is_completed(),
                })
                .collect(),
            completed: topic.is_completed(),
        }
    }

    fn into_topic(self) -> Topic {
        let subtopics = self
            .subtopics
            .into_iter()
            .map(|s| Subtopic::from_persisted(s.id, Name::from_persisted(s.name), s.completed))
            .collect();
        Topic::from_persisted(
            self.id,
            Name::from_persisted(self.name),
            self.completed,
            subtopics,
        )
    }
}

/// Serialize a whole forest as the stored JSON array.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_forest(forest: &Forest) -> Result<String, StorageError> {
    let records: Vec<CourseRecord> = forest.iter().map(CourseRecord::from_course).collect();
    serde_json::to_string(&records).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Parse a stored JSON array back into a fully aggregated forest.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON.
pub fn decode_forest(raw: &str) -> Result<Forest, StorageError> {
    let records: Vec<CourseRecord> =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(Forest::from_courses(
        records.into_iter().map(CourseRecord::into_course).collect(),
    ))
}
