//! In-memory state of a single quiz attempt.
//!
//! A session walks the quiz's questions in order. Each question accepts one
//! answer, after which the session is locked until [`QuizSession::advance`]
//! is called at the end of the feedback pause. Once the last question has been
//! answered the session waits in `Submitting` for the outcome of the milestone
//! submission.

use crate::error::{QuizError, SubmitError};
use crate::evaluator::{evaluate, Evaluation};
use crate::quiz::{Question, Quiz, QuizPayload};
use crate::submitter::{Receipt, Submission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question: String,
    pub selected_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub correct_count: u32,
    pub total_questions: usize,
    pub cumulative_score: u32,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    InProgress,
    AnswerLocked,
    Submitting,
    Completed(Summary),
    Failed(SubmitError),
}

/// What happened when the feedback pause ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing was locked, so there was nothing to advance.
    Idle,
    NextQuestion(usize),
    Submit(Submission),
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Quiz,
    current_index: usize,
    selected_answer_index: Option<usize>,
    cumulative_score: u32,
    correct_count: u32,
    answer_log: Vec<AnswerRecord>,
    phase: Phase,
}

impl QuizSession {
    pub fn new(quiz: Quiz) -> Self {
        Self {
            quiz,
            current_index: 0,
            selected_answer_index: None,
            cumulative_score: 0,
            correct_count: 0,
            answer_log: Vec::new(),
            phase: Phase::InProgress,
        }
    }

    /// Validates a launch payload and opens a session on it. Quizzes without
    /// questions are refused here.
    pub fn start(payload: QuizPayload) -> Result<Self, QuizError> {
        Quiz::from_payload(payload).map(Self::new)
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.quiz.questions()[self.current_index]
    }

    pub fn selected_answer_index(&self) -> Option<usize> {
        self.selected_answer_index
    }

    pub fn cumulative_score(&self) -> u32 {
        self.cumulative_score
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn answer_log(&self) -> &[AnswerRecord] {
        &self.answer_log
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_locked(&self) -> bool {
        !matches!(self.phase, Phase::InProgress)
    }

    /// Records the answer at `index` for the current question and locks the
    /// session. Returns `None` without touching any tally when an answer was
    /// already taken for this question or `index` is not one of its answers.
    pub fn select_answer(&mut self, index: usize) -> Option<Evaluation> {
        if self.phase != Phase::InProgress || self.selected_answer_index.is_some() {
            return None;
        }

        let question = &self.quiz.questions()[self.current_index];
        let chosen = question.answers().get(index)?;
        let evaluation = evaluate(question, chosen);

        if evaluation.is_correct {
            self.correct_count += 1;
            self.cumulative_score += evaluation.score_delta;
        }
        self.answer_log.push(AnswerRecord {
            question: question.text().to_owned(),
            selected_text: chosen.text().to_owned(),
            is_correct: evaluation.is_correct,
        });
        self.selected_answer_index = Some(index);
        self.phase = Phase::AnswerLocked;

        Some(evaluation)
    }

    /// Ends the feedback pause: moves to the next question, or to
    /// `Submitting` after the last one.
    pub fn advance(&mut self) -> Step {
        if self.phase != Phase::AnswerLocked {
            return Step::Idle;
        }

        if self.current_index + 1 < self.quiz.questions().len() {
            self.current_index += 1;
            self.selected_answer_index = None;
            self.phase = Phase::InProgress;
            Step::NextQuestion(self.current_index)
        } else {
            self.phase = Phase::Submitting;
            Step::Submit(self.submission())
        }
    }

    pub fn submission(&self) -> Submission {
        Submission {
            quiz_id: self.quiz.id().clone(),
            scores: self.correct_count,
            milestones: self.cumulative_score,
        }
    }

    pub fn record_outcome(&mut self, outcome: Result<Receipt, SubmitError>) -> &Phase {
        if self.phase != Phase::Submitting {
            return &self.phase;
        }

        self.phase = match outcome {
            Ok(receipt) => Phase::Completed(Summary {
                correct_count: self.correct_count,
                total_questions: self.quiz.questions().len(),
                cumulative_score: self.cumulative_score,
                message: receipt.message,
            }),
            Err(e) => Phase::Failed(e),
        };
        &self.phase
    }

    /// Re-arms a failed submission with the same tallies.
    pub fn retry(&mut self) -> Option<Submission> {
        match self.phase {
            Phase::Failed(_) => {
                self.phase = Phase::Submitting;
                Some(self.submission())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::quiz::{Answer, QuizId};

    fn question(text: &str, mark: u32, correct: usize) -> Question {
        let answers = (0..3)
            .map(|i| Answer::new(format!("{text} option {i}"), i == correct))
            .collect();
        Question::new(text.into(), mark, answers)
    }

    fn three_question_session() -> QuizSession {
        let quiz = Quiz::new(
            QuizId::Number(42),
            "Tasting basics".into(),
            vec![
                question("Q1", 5, 0),
                question("Q2", 2, 1),
                question("Q3", 3, 2),
            ],
        )
        .unwrap();
        QuizSession::new(quiz)
    }

    #[test]
    fn starts_at_first_question() {
        let session = three_question_session();

        assert_eq!(session.current_index(), 0);
        assert_eq!(session.selected_answer_index(), None);
        assert_eq!(session.cumulative_score(), 0);
        assert_eq!(session.correct_count(), 0);
        assert!(session.answer_log().is_empty());
        assert_eq!(session.phase(), &Phase::InProgress);
    }

    #[test]
    fn tallies_mixed_answers() {
        let mut session = three_question_session();

        assert!(session.select_answer(0).unwrap().is_correct);
        assert_eq!(session.advance(), Step::NextQuestion(1));
        assert!(!session.select_answer(0).unwrap().is_correct);
        assert_eq!(session.advance(), Step::NextQuestion(2));
        assert!(session.select_answer(2).unwrap().is_correct);

        assert_eq!(session.correct_count(), 2);
        assert_eq!(session.cumulative_score(), 8);
        assert_eq!(session.answer_log().len(), 3);
        assert_eq!(
            session.answer_log()[1],
            AnswerRecord {
                question: "Q2".into(),
                selected_text: "Q2 option 0".into(),
                is_correct: false,
            }
        );
        assert_eq!(
            session.advance(),
            Step::Submit(Submission {
                quiz_id: QuizId::Number(42),
                scores: 2,
                milestones: 8,
            })
        );
        assert_eq!(session.phase(), &Phase::Submitting);
    }

    #[test]
    fn second_selection_is_ignored_until_advance() {
        let mut session = three_question_session();

        assert!(session.select_answer(1).is_some());
        assert_eq!(session.select_answer(0), None);

        assert_eq!(session.selected_answer_index(), Some(1));
        assert_eq!(session.correct_count(), 0);
        assert_eq!(session.cumulative_score(), 0);
        assert_eq!(session.answer_log().len(), 1);
        assert!(session.is_locked());
    }

    #[test]
    fn log_tracks_current_index_while_in_progress() {
        let mut session = three_question_session();

        for answer in [0, 1] {
            assert_eq!(session.answer_log().len(), session.current_index());
            session.select_answer(answer);
            session.advance();
        }
        assert_eq!(session.answer_log().len(), session.current_index());
    }

    #[test]
    fn score_never_decreases() {
        let mut session = three_question_session();
        let mut last = 0;

        for answer in [0, 0, 0] {
            session.select_answer(answer);
            assert!(session.cumulative_score() >= last);
            last = session.cumulative_score();
            session.advance();
        }
        assert_eq!(last, 5);
    }

    #[test]
    fn correct_count_matches_log() {
        let mut session = three_question_session();

        for answer in [0, 1, 0] {
            session.select_answer(answer);
            session.advance();
        }

        let logged = session.answer_log().iter().filter(|r| r.is_correct).count();
        assert_eq!(session.correct_count() as usize, logged);
    }

    #[test]
    fn out_of_range_answer_is_ignored() {
        let mut session = three_question_session();

        assert_eq!(session.select_answer(9), None);
        assert_eq!(session.phase(), &Phase::InProgress);
        assert!(session.answer_log().is_empty());
    }

    #[test]
    fn advance_without_answer_is_idle() {
        let mut session = three_question_session();
        assert_eq!(session.advance(), Step::Idle);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn completes_with_summary() {
        let mut session = three_question_session();
        for answer in [0, 1, 2] {
            session.select_answer(answer);
            session.advance();
        }

        let phase = session.record_outcome(Ok(Receipt {
            message: Some("Milestone updated".into()),
        }));

        assert_eq!(
            phase,
            &Phase::Completed(Summary {
                correct_count: 3,
                total_questions: 3,
                cumulative_score: 10,
                message: Some("Milestone updated".into()),
            })
        );
        assert_eq!(session.select_answer(0), None);
    }

    #[test]
    fn failed_submission_can_be_retried_with_same_tallies() {
        let mut session = three_question_session();
        for answer in [0, 0, 2] {
            session.select_answer(answer);
            session.advance();
        }

        session.record_outcome(Err(SubmitError::NetworkUnreachable("offline".into())));
        assert!(matches!(session.phase(), Phase::Failed(_)));

        let retry = session.retry().unwrap();
        assert_eq!(retry, session.submission());
        assert_eq!(retry.scores, 2);
        assert_eq!(retry.milestones, 8);
        assert_eq!(session.phase(), &Phase::Submitting);
        assert_eq!(session.retry(), None);
    }

    #[test]
    fn outcome_outside_submitting_is_ignored() {
        let mut session = three_question_session();
        session.record_outcome(Ok(Receipt { message: None }));
        assert_eq!(session.phase(), &Phase::InProgress);
    }

    #[test]
    fn start_rejects_quiz_without_questions() {
        let payload: QuizPayload =
            serde_json::from_str(r#"{"id": 3, "title": "Nothing here", "quizzes": []}"#).unwrap();

        assert!(matches!(
            QuizSession::start(payload),
            Err(QuizError::EmptyQuiz { .. })
        ));
    }
}
