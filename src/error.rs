use std::path::PathBuf;

use thiserror::Error;

/// Reasons a quiz payload cannot start a session.
#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Malformed quiz payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Quiz '{title}' has no questions")]
    EmptyQuiz { title: String },

    #[error("Question '{question}' has no answers")]
    NoAnswers { question: String },

    #[error("Question '{question}' must have exactly one correct answer, found {found}")]
    CorrectAnswerCount { question: String, found: usize },
}

/// Failures of the milestone submission step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("You are not signed in. Use /login to attach your account.")]
    AuthMissing,

    #[error("Your stored sign-in token is unusable. Use /login to sign in again.")]
    InvalidToken,

    #[error("Milestone service is unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("Milestone service rejected the result: {0}")]
    ServerRejected(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access auth store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Auth store {path} is corrupted: {source}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read quiz directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
