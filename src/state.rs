use crate::quiz::Quiz;
use crate::session::QuizSession;

/// Per-chat dialogue state. A running quiz owns its session here; leaving the
/// dialogue drops it.
#[derive(Debug, Clone, Default)]
pub enum QuizState {
    #[default]
    Start,
    Selection,
    ReadyToRun {
        quiz: Quiz,
    },
    Running {
        session: QuizSession,
    },
}
