use crate::model::chapter::Chapter;
use crate::model::ids::{ChapterId, SubjectId};
use crate::model::name::Name;
use crate::model::progress::Progress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    name: Name,
    chapters: Vec<Chapter>,
    progress: Progress,
}

impl Subject {
    #[must_use]
    pub fn new(id: SubjectId, name: Name) -> Self {
        Self::from_persisted(id, name, Vec::new())
    }

    #[must_use]
    pub fn from_persisted(id: SubjectId, name: Name, chapters: Vec<Chapter>) -> Self {
        let mut subject = Self {
            id,
            name,
            chapters,
            progress: Progress::ZERO,
        };
        subject.recompute_progress();
        subject
    }

    #[must_use]
    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[must_use]
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub(crate) fn rename(&mut self, name: Name) {
        self.name = name;
    }

    pub(crate) fn chapters_mut(&mut self) -> &mut Vec<Chapter> {
        &mut self.chapters
    }

    pub(crate) fn chapter_mut(&mut self, id: &ChapterId) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|c| c.id() == id)
    }

    pub(crate) fn recompute_progress(&mut self) {
        self.progress = Progress::mean(self.chapters.iter().map(Chapter::progress));
    }
}
