use chrono::{DateTime, Utc};

use crate::model::ids::{CourseId, SubjectId};
use crate::model::name::Name;
use crate::model::progress::Progress;
use crate::model::subject::Subject;

/// Root of one course tree.
///
/// Progress is derived from the subjects and is never written by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    name: Name,
    description: String,
    deadline: DateTime<Utc>,
    created_at: DateTime<Utc>,
    subjects: Vec<Subject>,
    progress: Progress,
}

impl Course {
    /// Creates a course with no subjects.
    #[must_use]
    pub fn new(
        id: CourseId,
        name: Name,
        description: impl Into<String>,
        deadline: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::from_persisted(id, name, description, deadline, created_at, Vec::new())
    }

    #[must_use]
    pub fn from_persisted(
        id: CourseId,
        name: Name,
        description: impl Into<String>,
        deadline: DateTime<Utc>,
        created_at: DateTime<Utc>,
        subjects: Vec<Subject>,
    ) -> Self {
        let mut course = Self {
            id,
            name,
            description: description.into().trim().to_owned(),
            deadline,
            created_at,
            subjects,
            progress: Progress::ZERO,
        };
        course.recompute_progress();
        course
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub(crate) fn apply(&mut self, patch: ValidCoursePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
    }

    pub(crate) fn subjects_mut(&mut self) -> &mut Vec<Subject> {
        &mut self.subjects
    }

    pub(crate) fn subject_mut(&mut self, id: &SubjectId) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|s| s.id() == id)
    }

    pub(crate) fn recompute_progress(&mut self) {
        self.progress = Progress::mean(self.subjects.iter().map(Subject::progress));
    }
}

/// Fields a caller may change on an existing course. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

impl CoursePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.deadline.is_none()
    }

    pub(crate) fn validate(self) -> Result<ValidCoursePatch, crate::model::NameError> {
        let name = self.name.map(|n| Name::new("course", n)).transpose()?;
        Ok(ValidCoursePatch {
            name,
            description: self.description.map(|d| d.trim().to_owned()),
            deadline: self.deadline,
        })
    }
}

pub(crate) struct ValidCoursePatch {
    name: Option<Name>,
    description: Option<String>,
    deadline: Option<DateTime<Utc>>,
}

/// Rename patch for subjects and chapters, whose only editable field is the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamePatch {
    pub name: Option<String>,
}

impl NamePatch {
    #[must_use]
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}
