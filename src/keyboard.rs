use std::str::FromStr;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use uuid::Uuid;

use crate::quiz::Question;

pub(crate) const TAKE_QUIZ: &str = "Take a quiz📝";
pub(crate) const YES: &str = "Yes✔️";
pub(crate) const NO: &str = "No❌";

/// Payload carried by inline buttons on quiz messages. Answer buttons carry
/// the answer's id, so a button from an earlier question never matches the
/// question on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Answer { answer: Uuid },
    Retry,
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Answer { answer } => format!("answer:{}", answer.simple()),
            CallbackAction::Retry => "retry".to_owned(),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "retry" {
            return Ok(CallbackAction::Retry);
        }

        match s.split_once(':') {
            Some(("answer", answer)) => {
                let answer = Uuid::try_parse(answer).map_err(|_| format!("bad answer in '{s}'"))?;
                Ok(CallbackAction::Answer { answer })
            }
            _ => Err(format!("unknown callback '{s}'")),
        }
    }
}

pub(crate) fn yes_no_keyboard() -> KeyboardMarkup {
    let keyboard: Vec<Vec<KeyboardButton>> =
        vec![vec![KeyboardButton::new(YES), KeyboardButton::new(NO)]];

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn answers_keyboard(question: &Question) -> InlineKeyboardMarkup {
    let keyboard: Vec<Vec<InlineKeyboardButton>> = question
        .answers()
        .iter()
        .map(|ans| {
            let action = CallbackAction::Answer { answer: *ans.uuid() };
            vec![InlineKeyboardButton::callback(ans.text(), action.encode())]
        })
        .collect();

    InlineKeyboardMarkup::new(keyboard)
}

pub(crate) fn retry_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "Retry🔁",
        CallbackAction::Retry.encode(),
    )]])
}

pub(crate) fn quizes_keyboard(quizes: &[String]) -> KeyboardMarkup {
    let keyboard = quizes.iter().map(|quiz| vec![KeyboardButton::new(quiz)]);

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn action_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(TAKE_QUIZ)]])
}
