use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QuizError;

/// Backend identifier of a quiz, sent back verbatim on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuizId {
    Number(u64),
    Text(String),
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizId::Number(id) => write!(f, "{id}"),
            QuizId::Text(id) => f.write_str(id),
        }
    }
}

/// Quiz definition as handed over by the screen that launches the quiz.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizPayload {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub quizzes: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionPayload {
    pub question: String,
    #[serde(default)]
    pub mark: u32,
    #[serde(default)]
    pub answers: Vec<AnswerPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerPayload {
    pub text: String,
    #[serde(deserialize_with = "correctness_flag")]
    pub is_right: bool,
}

// The backend sends `is_right` as 0/1, occasionally quoted or as a bool.
fn correctness_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u64),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(flag) => Ok(flag),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Text(text) if text.trim() == "0" => Ok(false),
        Flag::Text(text) if text.trim() == "1" => Ok(true),
        Flag::Int(other) => Err(de::Error::custom(format!(
            "is_right must be 0 or 1, got {other}"
        ))),
        Flag::Text(other) => Err(de::Error::custom(format!(
            "is_right must be 0 or 1, got '{other}'"
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct Quiz {
    id: QuizId,
    title: String,
    questions: Vec<Question>,
}

#[derive(Debug, Clone)]
pub struct Question {
    text: String,
    mark: u32,
    answers: Vec<Answer>,
}

#[derive(Debug, Clone)]
pub struct Answer {
    uuid: Uuid,
    text: String,
    is_correct: bool,
}

impl fmt::Display for Quiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\nQuestions: {}\nPoints available: {}",
            self.title(),
            self.questions().len(),
            self.total_marks()
        )
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} pts) {}", self.mark(), self.text())
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl Quiz {
    /// Builds a quiz from raw parts, enforcing that it has questions and that
    /// every question has exactly one correct answer.
    pub fn new(id: QuizId, title: String, questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyQuiz { title });
        }

        for question in &questions {
            if question.answers.is_empty() {
                return Err(QuizError::NoAnswers {
                    question: question.text.clone(),
                });
            }

            let found = question.answers.iter().filter(|a| a.is_correct).count();
            if found != 1 {
                return Err(QuizError::CorrectAnswerCount {
                    question: question.text.clone(),
                    found,
                });
            }
        }

        Ok(Self {
            id,
            title,
            questions,
        })
    }

    pub fn from_payload(payload: QuizPayload) -> Result<Self, QuizError> {
        let questions = payload
            .quizzes
            .into_iter()
            .map(|question| {
                let answers = question
                    .answers
                    .into_iter()
                    .map(|answer| Answer::new(answer.text, answer.is_right))
                    .collect();
                Question::new(question.question, question.mark, answers)
            })
            .collect();

        Self::new(payload.id, payload.title, questions)
    }

    pub fn from_json(json: &str) -> Result<Self, QuizError> {
        let payload: QuizPayload = serde_json::from_str(json)?;
        Self::from_payload(payload)
    }

    pub fn id(&self) -> &QuizId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn total_marks(&self) -> u32 {
        self.questions.iter().map(Question::mark).sum()
    }
}

impl Question {
    pub fn new(text: String, mark: u32, answers: Vec<Answer>) -> Self {
        Self {
            text,
            mark,
            answers,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mark(&self) -> u32 {
        self.mark
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Position of the answer with `id` among this question's answers.
    pub fn answer_position(&self, id: &Uuid) -> Option<usize> {
        self.answers.iter().position(|answer| answer.uuid() == id)
    }
}

impl Answer {
    pub fn new(text: String, is_correct: bool) -> Answer {
        Self {
            uuid: Uuid::new_v4(),
            text,
            is_correct,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }
}
