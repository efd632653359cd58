pub mod question_board;
pub mod request_state;

pub use question_board::{QuestionBoard, SubmitFailure};
pub use request_state::{RequestPhase, RequestSlot, RequestState};
