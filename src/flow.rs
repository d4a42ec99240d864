use tracing::{info, instrument, warn};

use crate::error::SubmitError;
use crate::feedback::FeedbackDelay;
use crate::session::{Phase, QuizSession, Step, Summary};
use crate::submitter::SubmitResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    Idle,
    NextQuestion(usize),
    Completed(Summary),
    Failed(SubmitError),
}

/// Drives a session through its asynchronous parts: the feedback pause and
/// the one-shot milestone submission.
#[derive(Debug, Clone)]
pub struct QuizFlow<S> {
    submitter: S,
    delay: FeedbackDelay,
}

impl<S: SubmitResult> QuizFlow<S> {
    pub fn new(submitter: S, delay: FeedbackDelay) -> Self {
        Self { submitter, delay }
    }

    /// Waits out the feedback pause for the answer just locked, then moves
    /// the session on. After the last question the result is submitted once.
    #[instrument(level = "debug", skip_all, fields(quiz = %session.quiz().id()))]
    pub async fn finish_feedback(&self, session: &mut QuizSession) -> FlowStep {
        if !matches!(session.phase(), Phase::AnswerLocked) {
            return FlowStep::Idle;
        }

        self.delay.pause().await;

        match session.advance() {
            Step::Idle => FlowStep::Idle,
            Step::NextQuestion(index) => FlowStep::NextQuestion(index),
            Step::Submit(_) => self.submit(session).await,
        }
    }

    /// Resubmits the same tallies after a failure.
    #[instrument(level = "debug", skip_all, fields(quiz = %session.quiz().id()))]
    pub async fn retry(&self, session: &mut QuizSession) -> FlowStep {
        match session.retry() {
            Some(_) => self.submit(session).await,
            None => FlowStep::Idle,
        }
    }

    async fn submit(&self, session: &mut QuizSession) -> FlowStep {
        let submission = session.submission();
        let outcome = self.submitter.submit(&submission).await;

        let phase = session.record_outcome(outcome).clone();

        match phase {
            Phase::Completed(summary) => {
                info!(
                    "Quiz '{}' completed: {}/{} correct, {} points",
                    session.quiz().title(),
                    summary.correct_count,
                    summary.total_questions,
                    summary.cumulative_score
                );
                FlowStep::Completed(summary)
            }
            Phase::Failed(e) => {
                warn!("Submitting quiz '{}' failed: {e}", session.quiz().title());
                FlowStep::Failed(e)
            }
            _ => FlowStep::Idle,
        }
    }
}
