use state::QuizState;
use teloxide::{dispatching::dialogue::InMemStorage, prelude::Dialogue};

pub mod auth;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod feedback;
pub mod flow;
pub mod keyboard;
pub mod quiz;
pub mod runner;
pub mod schema;
pub mod session;
pub mod state;
pub mod submitter;

type UserDialogue = Dialogue<QuizState, InMemStorage<QuizState>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
