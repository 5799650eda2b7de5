mod chapter;
mod course;
mod ids;
mod name;
mod progress;
mod subject;
mod topic;

pub use chapter::Chapter;
pub use course::{Course, CoursePatch, NamePatch};
pub use ids::{ChapterId, CourseId, ParseIdError, SubjectId, SubtopicId, TopicId, UserId};
pub use name::{Name, NameError};
pub use progress::Progress;
pub use subject::Subject;
pub use topic::{Subtopic, Topic, TopicCompletion};
