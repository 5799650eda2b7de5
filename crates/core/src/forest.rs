//! The in-memory course forest and its mutation engine.
//!
//! Every mutation resolves its target path first and only then writes, so a
//! failed lookup or a rejected name leaves the forest untouched. After a write
//! the nodes along the path are re-aggregated from the deepest level upward:
//! chapter, then subject, then course.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    Chapter, ChapterId, Course, CourseId, CoursePatch, Name, NameError, NamePatch, Subject,
    SubjectId, Subtopic, SubtopicId, Topic, TopicId,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// The node an operation failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Course(CourseId),
    Subject(SubjectId),
    Chapter(ChapterId),
    Topic(TopicId),
    Subtopic(SubtopicId),
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Course(id) => write!(f, "course {id}"),
            NodeRef::Subject(id) => write!(f, "subject {id}"),
            NodeRef::Chapter(id) => write!(f, "chapter {id}"),
            NodeRef::Topic(id) => write!(f, "topic {id}"),
            NodeRef::Subtopic(id) => write!(f, "subtopic {id}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ForestError {
    #[error("{0} not found")]
    NotFound(NodeRef),

    #[error(transparent)]
    InvalidName(#[from] NameError),
}

impl ForestError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForestError::NotFound(_))
    }
}

//
// ─── FOREST ────────────────────────────────────────────────────────────────────
//

/// Ordered collection of one user's courses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    courses: Vec<Course>,
}

impl Forest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps courses that were rehydrated (and therefore already aggregated).
    #[must_use]
    pub fn from_courses(courses: Vec<Course>) -> Self {
        Self { courses }
    }

    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Course> {
        self.courses.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    // Lookups
    #[must_use]
    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.courses.iter().find(|c| c.id() == id)
    }

    #[must_use]
    pub fn subject(&self, course_id: &CourseId, subject_id: &SubjectId) -> Option<&Subject> {
        self.course(course_id)?
            .subjects()
            .iter()
            .find(|s| s.id() == subject_id)
    }

    #[must_use]
    pub fn chapter(
        &self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
    ) -> Option<&Chapter> {
        self.subject(course_id, subject_id)?
            .chapters()
            .iter()
            .find(|c| c.id() == chapter_id)
    }

    #[must_use]
    pub fn topic(
        &self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
    ) -> Option<&Topic> {
        self.chapter(course_id, subject_id, chapter_id)?
            .topics()
            .iter()
            .find(|t| t.id() == topic_id)
    }

    // ─── Courses ───────────────────────────────────────────────────────────────

    /// Appends a new course with no subjects.
    ///
    /// # Errors
    ///
    /// Returns `ForestError::InvalidName` if `name` is blank.
    pub fn create_course(
        &mut self,
        name: &str,
        description: &str,
        deadline: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<CourseId, ForestError> {
        let name = Name::new("course", name)?;
        let id = CourseId::generate();
        self.courses.push(Course::new(
            id.clone(),
            name,
            description,
            deadline,
            created_at,
        ));
        Ok(id)
    }

    /// Merges the supplied fields into a course. Progress is not touched.
    ///
    /// # Errors
    ///
    /// Returns `ForestError::InvalidName` for a blank name, or
    /// `ForestError::NotFound` if the course does not exist.
    pub fn update_course(&mut self, id: &CourseId, patch: CoursePatch) -> Result<(), ForestError> {
        let patch = patch.validate()?;
        let course = self.course_mut(id)?;
        course.apply(patch);
        Ok(())
    }

    /// Removes a course together with its whole subtree.
    ///
    /// # Errors
    ///
    /// Returns `ForestError::NotFound` if the course does not exist.
    pub fn delete_course(&mut self, id: &CourseId) -> Result<Course, ForestError> {
        let index = self
            .courses
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| ForestError::NotFound(NodeRef::Course(id.clone())))?;
        Ok(self.courses.remove(index))
    }

    // ─── Subjects ──────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `ForestError::InvalidName` or `ForestError::NotFound`.
    pub fn create_subject(
        &mut self,
        course_id: &CourseId,
        name: &str,
    ) -> Result<SubjectId, ForestError> {
        let name = Name::new("subject", name)?;
        self.with_course(course_id, |course| {
            let id = SubjectId::generate();
            course.subjects_mut().push(Subject::new(id.clone(), name));
            Ok(id)
        })
    }

    /// # Errors
    ///
    /// Returns `ForestError::InvalidName` or `ForestError::NotFound`.
    pub fn update_subject(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        patch: NamePatch,
    ) -> Result<(), ForestError> {
        let name = patch.name.map(|n| Name::new("subject", n)).transpose()?;
        self.with_subject(course_id, subject_id, |subject| {
            if let Some(name) = name {
                subject.rename(name);
            }
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns `ForestError::NotFound` if any level of the path is missing.
    pub fn delete_subject(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
    ) -> Result<Subject, ForestError> {
        self.with_course(course_id, |course| {
            let subjects = course.subjects_mut();
            let index = subjects
                .iter()
                .position(|s| s.id() == subject_id)
                .ok_or_else(|| ForestError::NotFound(NodeRef::Subject(subject_id.clone())))?;
            Ok(subjects.remove(index))
        })
    }

    // ─── Chapters ──────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `ForestError::InvalidName` or `ForestError::NotFound`.
    pub fn create_chapter(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        name: &str,
    ) -> Result<ChapterId, ForestError> {
        let name = Name::new("chapter", name)?;
        self.with_subject(course_id, subject_id, |subject| {
            let id = ChapterId::generate();
            subject.chapters_mut().push(Chapter::new(id.clone(), name));
            Ok(id)
        })
    }

    /// # Errors
    ///
    /// Returns `ForestError::InvalidName` or `ForestError::NotFound`.
    pub fn update_chapter(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        patch: NamePatch,
    ) -> Result<(), ForestError> {
        let name = patch.name.map(|n| Name::new("chapter", n)).transpose()?;
        self.with_chapter(course_id, subject_id, chapter_id, |chapter| {
            if let Some(name) = name {
                chapter.rename(name);
            }
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns `ForestError::NotFound` if any level of the path is missing.
    pub fn delete_chapter(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
    ) -> Result<Chapter, ForestError> {
        self.with_subject(course_id, subject_id, |subject| {
            let chapters = subject.chapters_mut();
            let index = chapters
                .iter()
                .position(|c| c.id() == chapter_id)
                .ok_or_else(|| ForestError::NotFound(NodeRef::Chapter(chapter_id.clone())))?;
            Ok(chapters.remove(index))
        })
    }

    // ─── Topics ────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `ForestError::InvalidName` or `ForestError::NotFound`.
    pub fn create_topic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        name: &str,
    ) -> Result<TopicId, ForestError> {
        let name = Name::new("topic", name)?;
        self.with_chapter(course_id, subject_id, chapter_id, |chapter| {
            let id = TopicId::generate();
            chapter.topics_mut().push(Topic::new(id.clone(), name));
            Ok(id)
        })
    }

    /// Sets a topic's completion directly, leaving its subtopics as they are.
    ///
    /// # Errors
    ///
    /// Returns `ForestError::NotFound` if any level of the path is missing.
    pub fn set_topic_completed(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
        completed: bool,
    ) -> Result<(), ForestError> {
        self.with_topic(course_id, subject_id, chapter_id, topic_id, |topic| {
            topic.set_completed(completed);
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns `ForestError::NotFound` if any level of the path is missing.
    pub fn delete_topic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
    ) -> Result<Topic, ForestError> {
        self.with_chapter(course_id, subject_id, chapter_id, |chapter| {
            let topics = chapter.topics_mut();
            let index = topics
                .iter()
                .position(|t| t.id() == topic_id)
                .ok_or_else(|| ForestError::NotFound(NodeRef::Topic(topic_id.clone())))?;
            Ok(topics.remove(index))
        })
    }

    // ─── Subtopics ─────────────────────────────────────────────────────────────

    /// Appends an incomplete subtopic, which re-derives the topic's completion.
    ///
    /// # Errors
    ///
    /// Returns `ForestError::InvalidName` or `ForestError::NotFound`.
    pub fn create_subtopic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
        name: &str,
    ) -> Result<SubtopicId, ForestError> {
        let name = Name::new("subtopic", name)?;
        self.with_topic(course_id, subject_id, chapter_id, topic_id, |topic| {
            let id = SubtopicId::generate();
            topic.push_subtopic(Subtopic::new(id.clone(), name));
            Ok(id)
        })
    }

    /// # Errors
    ///
    /// Returns `ForestError::NotFound` if any level of the path is missing.
    pub fn set_subtopic_completed(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
        subtopic_id: &SubtopicId,
        completed: bool,
    ) -> Result<(), ForestError> {
        self.with_topic(course_id, subject_id, chapter_id, topic_id, |topic| {
            let subtopic = topic
                .subtopic_mut(subtopic_id)
                .ok_or_else(|| ForestError::NotFound(NodeRef::Subtopic(subtopic_id.clone())))?;
            subtopic.set_completed(completed);
            topic.rederive();
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns `ForestError::NotFound` if any level of the path is missing.
    pub fn delete_subtopic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
        subtopic_id: &SubtopicId,
    ) -> Result<Subtopic, ForestError> {
        self.with_topic(course_id, subject_id, chapter_id, topic_id, |topic| {
            topic
                .remove_subtopic(subtopic_id)
                .ok_or_else(|| ForestError::NotFound(NodeRef::Subtopic(subtopic_id.clone())))
        })
    }

    // ─── Path resolution + upward re-aggregation ───────────────────────────────

    fn course_mut(&mut self, id: &CourseId) -> Result<&mut Course, ForestError> {
        self.courses
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| ForestError::NotFound(NodeRef::Course(id.clone())))
    }

    fn with_course<T>(
        &mut self,
        course_id: &CourseId,
        f: impl FnOnce(&mut Course) -> Result<T, ForestError>,
    ) -> Result<T, ForestError> {
        let course = self.course_mut(course_id)?;
        let out = f(course)?;
        course.recompute_progress();
        Ok(out)
    }

    fn with_subject<T>(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        f: impl FnOnce(&mut Subject) -> Result<T, ForestError>,
    ) -> Result<T, ForestError> {
        self.with_course(course_id, |course| {
            let subject = course
                .subject_mut(subject_id)
                .ok_or_else(|| ForestError::NotFound(NodeRef::Subject(subject_id.clone())))?;
            let out = f(subject)?;
            subject.recompute_progress();
            Ok(out)
        })
    }

    fn with_chapter<T>(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        f: impl FnOnce(&mut Chapter) -> Result<T, ForestError>,
    ) -> Result<T, ForestError> {
        self.with_subject(course_id, subject_id, |subject| {
            let chapter = subject
                .chapter_mut(chapter_id)
                .ok_or_else(|| ForestError::NotFound(NodeRef::Chapter(chapter_id.clone())))?;
            let out = f(chapter)?;
            chapter.recompute_progress();
            Ok(out)
        })
    }

    fn with_topic<T>(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
        f: impl FnOnce(&mut Topic) -> Result<T, ForestError>,
    ) -> Result<T, ForestError> {
        self.with_chapter(course_id, subject_id, chapter_id, |chapter| {
            let topic = chapter
                .topic_mut(topic_id)
                .ok_or_else(|| ForestError::NotFound(NodeRef::Topic(topic_id.clone())))?;
            f(topic)
        })
    }
}

impl<'a> IntoIterator for &'a Forest {
    type Item = &'a Course;
    type IntoIter = std::slice::Iter<'a, Course>;

    fn into_iter(self) -> Self::IntoIter {
        self.courses.iter()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
