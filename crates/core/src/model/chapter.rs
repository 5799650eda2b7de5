use crate::model::ids::{ChapterId, TopicId};
use crate::model::name::Name;
use crate::model::progress::Progress;
use crate::model::topic::Topic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    id: ChapterId,
    name: Name,
    topics: Vec<Topic>,
    progress: Progress,
}

impl Chapter {
    #[must_use]
    pub fn new(id: ChapterId, name: Name) -> Self {
        Self::from_persisted(id, name, Vec::new())
    }

    /// Rehydrates a chapter; progress is recomputed rather than trusted.
    #[must_use]
    pub fn from_persisted(id: ChapterId, name: Name, topics: Vec<Topic>) -> Self {
        let mut chapter = Self {
            id,
            name,
            topics,
            progress: Progress::ZERO,
        };
        chapter.recompute_progress();
        chapter
    }

    #[must_use]
    pub fn id(&self) -> &ChapterId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    #[must_use]
    pub fn completed_topics(&self) -> usize {
        self.topics.iter().filter(|t| t.is_completed()).count()
    }

    pub(crate) fn rename(&mut self, name: Name) {
        self.name = name;
    }

    pub(crate) fn topics_mut(&mut self) -> &mut Vec<Topic> {
        &mut self.topics
    }

    pub(crate) fn topic_mut(&mut self, id: &TopicId) -> Option<&mut Topic> {
        self.topics.iter_mut().find(|t| t.id() == id)
    }

    pub(crate) fn recompute_progress(&mut self) {
        self.progress = Progress::from_ratio(self.completed_topics(), self.topics.len());
    }
}
