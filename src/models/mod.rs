pub mod course;
pub mod mindmap;
pub mod practice;
pub mod question;
pub mod user;

pub use mindmap::{MindmapNode, MindmapResponse};
pub use practice::{AnswerLetter, PracticeKind, PracticeQuestion};
pub use question::{Question, QuestionStatus};
pub use user::{User, UserRole};
