use std::fmt;

/// Which store operation produced a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CreateCourse,
    UpdateCourse,
    DeleteCourse,
    CreateSubject,
    UpdateSubject,
    DeleteSubject,
    CreateChapter,
    UpdateChapter,
    DeleteChapter,
    CreateTopic,
    UpdateTopic,
    DeleteTopic,
    CreateSubtopic,
    UpdateSubtopic,
    DeleteSubtopic,
}

impl MutationKind {
    /// Short confirmation shown after the mutation lands.
    #[must_use]
    pub fn success_message(self) -> &'static str {
        match self {
            MutationKind::CreateCourse => "Course created successfully!",
            MutationKind::UpdateCourse => "Course updated successfully!",
            MutationKind::DeleteCourse => "Course deleted successfully!",
            MutationKind::CreateSubject => "Subject added successfully!",
            MutationKind::UpdateSubject => "Subject updated successfully!",
            MutationKind::DeleteSubject => "Subject deleted successfully!",
            MutationKind::CreateChapter => "Chapter added successfully!",
            MutationKind::UpdateChapter => "Chapter updated successfully!",
            MutationKind::DeleteChapter => "Chapter deleted successfully!",
            MutationKind::CreateTopic => "Topic added successfully!",
            MutationKind::UpdateTopic => "Topic status updated!",
            MutationKind::DeleteTopic => "Topic deleted successfully!",
            MutationKind::CreateSubtopic => "Subtopic added successfully!",
            MutationKind::UpdateSubtopic => "Subtopic status updated!",
            MutationKind::DeleteSubtopic => "Subtopic deleted successfully!",
        }
    }
}

/// Transient notifications for whoever renders toasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreNotice {
    Applied(MutationKind),
    /// The forest changed in memory but could not be written out.
    PersistenceFailed { kind: MutationKind, message: String },
    /// The stored forest could not be read; the session starts empty.
    LoadFailed { message: String },
}

impl fmt::Display for StoreNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreNotice::Applied(kind) => f.write_str(kind.success_message()),
            StoreNotice::PersistenceFailed { message, .. } => {
                write!(f, "Changes could not be saved: {message}")
            }
            StoreNotice::LoadFailed { message } => {
                write!(f, "Could not load your courses: {message}")
            }
        }
    }
}
