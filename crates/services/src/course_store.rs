use std::sync::Arc;

use chrono::{DateTime, Utc};
use study_core::model::{
    ChapterId, CourseId, CoursePatch, NamePatch, SubjectId, SubtopicId, TopicId, UserId,
};
use study_core::{Forest, ForestError};
use storage::ForestRepository;
use storage::repository::KeyValueStore;
use tokio::sync::{broadcast, watch};

use crate::error::StoreError;
use crate::notice::{MutationKind, StoreNotice};
use crate::Clock;

const NOTICE_CAPACITY: usize = 64;

/// Result of a mutation whose target may no longer exist.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    Applied(T),
    /// Some id on the path did not resolve; nothing changed.
    NotFound,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::NotFound => None,
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound)
    }
}

/// Single source of truth for the active user's course forest.
///
/// Each mutation edits the current snapshot copy-on-write, writes the whole
/// forest back to storage and publishes the new snapshot to subscribers. A
/// failed write is reported as a notice and never rolls the change back.
///
/// While the stored document cannot be read, mutations stay in memory only
/// so the unreadable value is never replaced.
pub struct CourseStore {
    clock: Clock,
    forests: ForestRepository,
    user: Option<UserId>,
    load_failed: bool,
    snapshots: watch::Sender<Arc<Forest>>,
    notices: broadcast::Sender<StoreNotice>,
}

impl CourseStore {
    #[must_use]
    pub fn new(clock: Clock, kv: Arc<dyn KeyValueStore>) -> Self {
        let (snapshots, _rx) = watch::channel(Arc::new(Forest::new()));
        let (notices, _rx) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            clock,
            forests: ForestRepository::new(kv),
            user: None,
            load_failed: false,
            snapshots,
            notices,
        }
    }

    #[must_use]
    pub fn active_user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Whether the active user's stored document could not be read.
    #[must_use]
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// The current forest. Later mutations never change a snapshot already handed out.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Forest> {
        Arc::clone(&*self.snapshots.borrow())
    }

    /// Receiver that is woken with every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Forest>> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<StoreNotice> {
        self.notices.subscribe()
    }

    // ─── Session scoping ───────────────────────────────────────────────────────

    /// Switch to `user`, loading their forest, or clear everything on `None`.
    ///
    /// A missing document is initialized to an empty forest. An unreadable one
    /// is reported through a `LoadFailed` notice and the session starts empty;
    /// nothing is written back until a later load succeeds.
    pub async fn set_active_user(&mut self, user: Option<UserId>) {
        self.load_failed = false;
        let forest = match &user {
            None => {
                tracing::info!("no active user; course forest cleared");
                Forest::new()
            }
            Some(user) => match self.forests.load_or_init(user).await {
                Ok(forest) => {
                    tracing::info!(%user, courses = forest.len(), "loaded course forest");
                    forest
                }
                Err(err) => {
                    tracing::warn!(%user, error = %err, "failed to load course forest");
                    self.notify(StoreNotice::LoadFailed {
                        message: err.to_string(),
                    });
                    self.load_failed = true;
                    Forest::new()
                }
            },
        };
        self.user = user;
        self.snapshots.send_replace(Arc::new(forest));
    }

    /// Follow the identity provider: apply the latest login/logout if it differs
    /// from the active user. Returns whether the active user changed.
    pub async fn sync_identity(&mut self, identity: &mut watch::Receiver<Option<UserId>>) -> bool {
        let wanted = identity.borrow_and_update().clone();
        if wanted == self.user {
            return false;
        }
        self.set_active_user(wanted).await;
        true
    }

    /// Re-read the active user's forest from storage.
    pub async fn reload(&mut self) {
        let user = self.user.clone();
        self.set_active_user(user).await;
    }

    // ─── Courses ───────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StoreError::Validation` for a blank name or
    /// `StoreError::NoActiveUser` when nobody is logged in.
    pub async fn create_course(
        &mut self,
        name: &str,
        description: &str,
        deadline: DateTime<Utc>,
    ) -> Result<Outcome<CourseId>, StoreError> {
        self.mutate(MutationKind::CreateCourse, |forest, now| {
            forest.create_course(name, description, deadline, now)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::Validation` or `StoreError::NoActiveUser`.
    pub async fn update_course(
        &mut self,
        course_id: &CourseId,
        patch: CoursePatch,
    ) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::UpdateCourse, |forest, _| {
            forest.update_course(course_id, patch)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::NoActiveUser` when nobody is logged in.
    pub async fn delete_course(&mut self, course_id: &CourseId) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::DeleteCourse, |forest, _| {
            forest.delete_course(course_id).map(drop)
        })
        .await
    }

    // ─── Subjects ──────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StoreError::Validation` or `StoreError::NoActiveUser`.
    pub async fn create_subject(
        &mut self,
        course_id: &CourseId,
        name: &str,
    ) -> Result<Outcome<SubjectId>, StoreError> {
        self.mutate(MutationKind::CreateSubject, |forest, _| {
            forest.create_subject(course_id, name)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::Validation` or `StoreError::NoActiveUser`.
    pub async fn update_subject(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        patch: NamePatch,
    ) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::UpdateSubject, |forest, _| {
            forest.update_subject(course_id, subject_id, patch)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::NoActiveUser` when nobody is logged in.
    pub async fn delete_subject(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
    ) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::DeleteSubject, |forest, _| {
            forest.delete_subject(course_id, subject_id).map(drop)
        })
        .await
    }

    // ─── Chapters ──────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StoreError::Validation` or `StoreError::NoActiveUser`.
    pub async fn create_chapter(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        name: &str,
    ) -> Result<Outcome<ChapterId>, StoreError> {
        self.mutate(MutationKind::CreateChapter, |forest, _| {
            forest.create_chapter(course_id, subject_id, name)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::Validation` or `StoreError::NoActiveUser`.
    pub async fn update_chapter(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        patch: NamePatch,
    ) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::UpdateChapter, |forest, _| {
            forest.update_chapter(course_id, subject_id, chapter_id, patch)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::NoActiveUser` when nobody is logged in.
    pub async fn delete_chapter(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
    ) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::DeleteChapter, |forest, _| {
            forest
                .delete_chapter(course_id, subject_id, chapter_id)
                .map(drop)
        })
        .await
    }

    // ─── Topics ────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StoreError::Validation` or `StoreError::NoActiveUser`.
    pub async fn create_topic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        name: &str,
    ) -> Result<Outcome<TopicId>, StoreError> {
        self.mutate(MutationKind::CreateTopic, |forest, _| {
            forest.create_topic(course_id, subject_id, chapter_id, name)
        })
        .await
    }

    /// Sets a topic's completion directly; its subtopics are not altered.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoActiveUser` when nobody is logged in.
    pub async fn update_topic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
        completed: bool,
    ) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::UpdateTopic, |forest, _| {
            forest.set_topic_completed(course_id, subject_id, chapter_id, topic_id, completed)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::NoActiveUser` when nobody is logged in.
    pub async fn delete_topic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
    ) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::DeleteTopic, |forest, _| {
            forest
                .delete_topic(course_id, subject_id, chapter_id, topic_id)
                .map(drop)
        })
        .await
    }

    // ─── Subtopics ─────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StoreError::Validation` or `StoreError::NoActiveUser`.
    pub async fn create_subtopic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
        name: &str,
    ) -> Result<Outcome<SubtopicId>, StoreError> {
        self.mutate(MutationKind::CreateSubtopic, |forest, _| {
            forest.create_subtopic(course_id, subject_id, chapter_id, topic_id, name)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::NoActiveUser` when nobody is logged in.
    pub async fn update_subtopic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
        subtopic_id: &SubtopicId,
        completed: bool,
    ) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::UpdateSubtopic, |forest, _| {
            forest.set_subtopic_completed(
                course_id,
                subject_id,
                chapter_id,
                topic_id,
                subtopic_id,
                completed,
            )
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::NoActiveUser` when nobody is logged in.
    pub async fn delete_subtopic(
        &mut self,
        course_id: &CourseId,
        subject_id: &SubjectId,
        chapter_id: &ChapterId,
        topic_id: &TopicId,
        subtopic_id: &SubtopicId,
    ) -> Result<Outcome<()>, StoreError> {
        self.mutate(MutationKind::DeleteSubtopic, |forest, _| {
            forest
                .delete_subtopic(course_id, subject_id, chapter_id, topic_id, subtopic_id)
                .map(drop)
        })
        .await
    }

    // ─── Internals ─────────────────────────────────────────────────────────────

    async fn mutate<T, F>(&mut self, kind: MutationKind, op: F) -> Result<Outcome<T>, StoreError>
    where
        F: FnOnce(&mut Forest, DateTime<Utc>) -> Result<T, ForestError>,
    {
        let Some(user) = self.user.clone() else {
            return Err(StoreError::NoActiveUser);
        };

        // Edits in place unless a consumer still holds the previous snapshot,
        // in which case `make_mut` detaches a copy first.
        let now = self.clock.now();
        let mut result = Ok(Outcome::NotFound);
        self.snapshots
            .send_if_modified(|forest| match op(Arc::make_mut(forest), now) {
                Ok(value) => {
                    result = Ok(Outcome::Applied(value));
                    true
                }
                Err(err) => {
                    result = rejected(kind, err);
                    false
                }
            });
        let value = match result? {
            Outcome::Applied(value) => value,
            Outcome::NotFound => return Ok(Outcome::NotFound),
        };
        tracing::debug!(?kind, %user, "mutation applied");

        if self.load_failed {
            tracing::warn!(
                ?kind,
                %user,
                "stored course forest is unreadable; keeping change in memory only"
            );
            self.notify(StoreNotice::PersistenceFailed {
                kind,
                message: "stored courses could not be read, so they were not overwritten".into(),
            });
            return Ok(Outcome::Applied(value));
        }

        let snapshot = self.snapshot();
        match self.forests.save(&user, &snapshot).await {
            Ok(()) => self.notify(StoreNotice::Applied(kind)),
            Err(err) => {
                tracing::warn!(
                    ?kind,
                    %user,
                    error = %err,
                    "failed to persist course forest; keeping in-memory state"
                );
                self.notify(StoreNotice::PersistenceFailed {
                    kind,
                    message: err.to_string(),
                });
            }
        }

        Ok(Outcome::Applied(value))
    }

    fn notify(&self, notice: StoreNotice) {
        // Nobody listening is fine; notices are transient.
        let _ = self.notices.send(notice);
    }
}

fn rejected<T>(kind: MutationKind, err: ForestError) -> Result<Outcome<T>, StoreError> {
    match err {
        ForestError::NotFound(node) => {
            tracing::debug!(?kind, %node, "mutation target not found; forest unchanged");
            Ok(Outcome::NotFound)
        }
        ForestError::InvalidName(err) => Err(StoreError::Validation(err)),
        err => Err(StoreError::Forest(err)),
    }
}
