use crate::model::ids::{SubtopicId, TopicId};
use crate::model::name::Name;

//
// ─── SUBTOPIC ──────────────────────────────────────────────────────────────────
//

/// Leaf of the course tree; its completion is set directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtopic {
    id: SubtopicId,
    name: Name,
    completed: bool,
}

impl Subtopic {
    /// Creates an incomplete subtopic.
    #[must_use]
    pub fn new(id: SubtopicId, name: Name) -> Self {
        Self::from_persisted(id, name, false)
    }

    #[must_use]
    pub fn from_persisted(id: SubtopicId, name: Name, completed: bool) -> Self {
        Self {
            id,
            name,
            completed,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SubtopicId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// How a topic's completion is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCompletion {
    /// No subtopics: the flag is owned by the topic itself.
    Leaf { completed: bool },
    /// Has subtopics: complete iff all of them are, unless `pinned` holds an
    /// explicit value written since the last subtopic change.
    Derived { pinned: Option<bool> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    name: Name,
    subtopics: Vec<Subtopic>,
    completion: TopicCompletion,
}

impl Topic {
    /// Creates an incomplete topic with no subtopics.
    #[must_use]
    pub fn new(id: TopicId, name: Name) -> Self {
        Self {
            id,
            name,
            subtopics: Vec::new(),
            completion: TopicCompletion::Leaf { completed: false },
        }
    }

    /// Rehydrates a topic from its stored flag and subtopics.
    ///
    /// A stored flag that disagrees with the subtopics is kept as an explicit pin.
    #[must_use]
    pub fn from_persisted(
        id: TopicId,
        name: Name,
        completed: bool,
        subtopics: Vec<Subtopic>,
    ) -> Self {
        let completion = if subtopics.is_empty() {
            TopicCompletion::Leaf { completed }
        } else if subtopics.iter().all(Subtopic::is_completed) == completed {
            TopicCompletion::Derived { pinned: None }
        } else {
            TopicCompletion::Derived {
                pinned: Some(completed),
            }
        };
        Self {
            id,
            name,
            subtopics,
            completion,
        }
    }

    #[must_use]
    pub fn id(&self) -> &TopicId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[must_use]
    pub fn subtopics(&self) -> &[Subtopic] {
        &self.subtopics
    }

    #[must_use]
    pub fn completion(&self) -> TopicCompletion {
        self.completion
    }

    /// Effective completion: the leaf flag, the pin, or all subtopics done.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        match self.completion {
            TopicCompletion::Leaf { completed } => completed,
            TopicCompletion::Derived { pinned } => {
                pinned.unwrap_or_else(|| self.subtopics.iter().all(Subtopic::is_completed))
            }
        }
    }

    /// Writes the flag directly. Subtopics are left untouched.
    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completion = match self.completion {
            TopicCompletion::Leaf { .. } => TopicCompletion::Leaf { completed },
            TopicCompletion::Derived { .. } => TopicCompletion::Derived {
                pinned: Some(completed),
            },
        };
    }

    pub(crate) fn push_subtopic(&mut self, subtopic: Subtopic) {
        self.subtopics.push(subtopic);
        self.rederive();
    }

    pub(crate) fn subtopic_mut(&mut self, id: &SubtopicId) -> Option<&mut Subtopic> {
        self.subtopics.iter_mut().find(|s| s.id() == id)
    }

    pub(crate) fn remove_subtopic(&mut self, id: &SubtopicId) -> Option<Subtopic> {
        let index = self.subtopics.iter().position(|s| s.id() == id)?;
        let removed = self.subtopics.remove(index);
        self.rederive();
        Some(removed)
    }

    /// Drops any pin after the subtopic set changed.
    pub(crate) fn rederive(&mut self) {
        self.completion = if self.subtopics.is_empty() {
            TopicCompletion::Leaf { completed: false }
        } else {
            TopicCompletion::Derived { pinned: None }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> Name {
        Name::new("test", raw).unwrap()
    }

    fn topic_with(flags: &[bool]) -> Topic {
        let subtopics = flags
            .iter()
            .enumerate()
            .map(|(i, done)| {
                Subtopic::from_persisted(SubtopicId::new(format!("s{i}")), name("Sub"), *done)
            })
            .collect();
        Topic::from_persisted(TopicId::new("t"), name("Topic"), flags.iter().all(|f| *f), subtopics)
    }

    #[test]
    fn new_topic_is_incomplete_leaf() {
        let topic = Topic::new(TopicId::new("t"), name("Slope"));
        assert_eq!(topic.completion(), TopicCompletion::Leaf { completed: false });
        assert!(!topic.is_completed());
    }

    #[test]
    fn derived_topic_follows_subtopics() {
        let mut topic = topic_with(&[true, false]);
        assert!(!topic.is_completed());

        topic.subtopic_mut(&SubtopicId::new("s1")).unwrap().set_completed(true);
        topic.rederive();
        assert!(topic.is_completed());
    }

    #[test]
    fn pin_overrides_until_next_subtopic_change() {
        let mut topic = topic_with(&[false]);
        topic.set_completed(true);
        assert!(topic.is_completed());
        assert!(!topic.subtopics()[0].is_completed());

        topic.push_subtopic(Subtopic::new(SubtopicId::new("s9"), name("More")));
        assert!(!topic.is_completed());
    }

    #[test]
    fn adding_subtopic_to_completed_leaf_flips_it_back() {
        let mut topic = Topic::new(TopicId::new("t"), name("Intercept"));
        topic.set_completed(true);
        topic.push_subtopic(Subtopic::new(SubtopicId::new("s"), name("Practice")));
        assert!(!topic.is_completed());
    }

    #[test]
    fn removing_last_subtopic_returns_to_incomplete_leaf() {
        let mut topic = topic_with(&[true]);
        assert!(topic.is_completed());
        topic.remove_subtopic(&SubtopicId::new("s0")).unwrap();
        assert_eq!(topic.completion(), TopicCompletion::Leaf { completed: false });
    }

    #[test]
    fn persisted_disagreement_becomes_pin() {
        let subtopics = vec![Subtopic::from_persisted(
            SubtopicId::new("s"),
            name("Sub"),
            false,
        )];
        let topic = Topic::from_persisted(TopicId::new("t"), name("Forced"), true, subtopics);
        assert_eq!(topic.completion(), TopicCompletion::Derived { pinned: Some(true) });
        assert!(topic.is_completed());
    }
}
