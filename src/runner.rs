use std::sync::Arc;

use teloxide::{
    dispatching::dialogue::GetChatId,
    payloads::{AnswerCallbackQuerySetters, SendMessageSetters},
    prelude::Requester,
    types::{CallbackQuery, ChatId, Message, ReplyMarkup},
    Bot,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::FileAuthStore,
    catalog::RetrieveQuiz,
    commands::chat_key,
    evaluator::Evaluation,
    feedback::FeedbackDelay,
    flow::{FlowStep, QuizFlow},
    keyboard::{
        action_keyboard, answers_keyboard, quizes_keyboard, retry_keyboard, yes_no_keyboard,
        CallbackAction, NO, TAKE_QUIZ, YES,
    },
    quiz::Quiz,
    session::{Phase, QuizSession},
    state::QuizState,
    submitter::MilestoneClient,
    HandlerResult, UserDialogue,
};

#[instrument(level = "info", skip(bot, dialogue, msg, catalog), fields(chat = %msg.chat.id))]
pub(crate) async fn choose_what_to_do<Catalog: RetrieveQuiz>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    catalog: Arc<Catalog>,
) -> HandlerResult {
    match msg.text() {
        Some(TAKE_QUIZ) => {
            let quizes = catalog.retrieve_all_quiz_names().await?;
            if quizes.is_empty() {
                bot.send_message(msg.chat.id, "No available quizes.").await?;
            } else {
                info!(
                    "{} chooses to take a quiz.",
                    msg.chat.username().unwrap_or_default()
                );
                bot.send_message(msg.chat.id, "Please, choose available quiz:")
                    .reply_markup(quizes_keyboard(&quizes))
                    .await?;
                dialogue.update(QuizState::Selection).await?;
            }
        }
        other => {
            info!("Invalid message {:?}", other);
            bot.send_message(msg.chat.id, "Invalid input. Please try again.")
                .reply_markup(action_keyboard())
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, msg, catalog), fields(chat = %msg.chat.id))]
pub(crate) async fn selection<Catalog: RetrieveQuiz>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    catalog: Arc<Catalog>,
) -> HandlerResult {
    let Some(quiz_name) = msg.text() else {
        bot.send_message(msg.chat.id, "Failed to retrieve quiz: no input provided")
            .await?;
        return Ok(());
    };

    match catalog.retrieve_quiz(quiz_name).await {
        Ok(Some(quiz)) => {
            info!(
                "{} selected '{}'",
                msg.chat.username().unwrap_or_default(),
                quiz.title()
            );
            bot.send_message(
                msg.chat.id,
                format!("{quiz}\n\nAre you ready to begin? (Yes/No)"),
            )
            .reply_markup(yes_no_keyboard())
            .await?;
            dialogue.update(QuizState::ReadyToRun { quiz }).await?;
        }
        Ok(None) => {
            info!("Quiz '{}' not found", quiz_name);
            bot.send_message(
                msg.chat.id,
                format!("Quiz with name '{}' not found.", quiz_name),
            )
            .await?;
        }
        Err(e) => {
            error!("Catalog error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, msg, quiz), fields(chat = %msg.chat.id, quiz = %quiz.id()))]
pub(crate) async fn running_ready(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    quiz: Quiz,
) -> HandlerResult {
    match msg.text() {
        Some("Yes") | Some(YES) => {
            let session = QuizSession::new(quiz);
            info!(
                "{} starts quiz '{}'",
                msg.chat.username().unwrap_or_default(),
                session.quiz().title()
            );
            bot.send_message(msg.chat.id, "Let's begin!")
                .reply_markup(ReplyMarkup::kb_remove())
                .await?;
            send_question(&bot, msg.chat.id, &session).await?;
            dialogue.update(QuizState::Running { session }).await?;
        }
        Some("No") | Some(NO) => {
            info!("Quitting quiz '{}'", quiz.title());
            bot.send_message(msg.chat.id, "OK. What do you want to do now?")
                .reply_markup(action_keyboard())
                .await?;
            dialogue.update(QuizState::Start).await?;
        }
        _ => {
            bot.send_message(
                msg.chat.id,
                "Please, enter a valid answer <b>Yes</b> or <b>No</b>.",
            )
            .parse_mode(teloxide::types::ParseMode::Html)
            .await?;
        }
    }

    Ok(())
}

/// What an answer tap did to the session it landed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Tap {
    /// The answer belongs to a question that is no longer on screen.
    Stale,
    /// The current question already has an answer.
    Locked,
    Accepted(Evaluation),
}

/// Applies a tap on the answer `answer` to the question currently shown.
pub(crate) fn apply_tap(session: &mut QuizSession, answer: &Uuid) -> Tap {
    let Some(position) = session.current_question().answer_position(answer) else {
        return Tap::Stale;
    };
    match session.select_answer(position) {
        Some(evaluation) => Tap::Accepted(evaluation),
        None => Tap::Locked,
    }
}

/// Dialogue state to store once the flow has moved the session on.
pub(crate) fn state_after(step: &FlowStep, session: QuizSession) -> QuizState {
    match step {
        FlowStep::Completed(_) => QuizState::Start,
        FlowStep::Idle | FlowStep::NextQuestion(_) | FlowStep::Failed(_) => {
            QuizState::Running { session }
        }
    }
}

async fn acknowledge(bot: &Bot, q: &CallbackQuery, text: Option<String>) {
    let request = bot.answer_callback_query(&q.id);
    let result = match text {
        Some(text) => request.text(text).await,
        None => request.await,
    };
    if let Err(e) = result {
        warn!("Failed to answer callback: {e}");
    }
}

/// Handles taps on answer buttons and on the retry button.
#[instrument(level = "info", skip_all, fields(data = ?q.data))]
pub(crate) async fn take_answer(
    bot: Bot,
    dialogue: UserDialogue,
    q: CallbackQuery,
    mut session: QuizSession,
    client: Arc<MilestoneClient>,
    store: Arc<FileAuthStore>,
    delay: FeedbackDelay,
) -> HandlerResult {
    let Some(chat_id) = q.chat_id() else {
        acknowledge(&bot, &q, None).await;
        return Ok(());
    };

    let action = match q.data.as_deref().map(str::parse::<CallbackAction>) {
        Some(Ok(action)) => action,
        Some(Err(e)) => {
            warn!("Ignoring callback: {e}");
            acknowledge(&bot, &q, None).await;
            return Ok(());
        }
        None => {
            acknowledge(&bot, &q, None).await;
            return Ok(());
        }
    };

    let flow = QuizFlow::new(client.with_tokens(store.scoped(chat_key(chat_id))), delay);

    let step = match action {
        CallbackAction::Answer { answer } => {
            let evaluation = match apply_tap(&mut session, &answer) {
                Tap::Accepted(evaluation) => evaluation,
                Tap::Stale => {
                    acknowledge(&bot, &q, Some("That question is already answered.".into())).await;
                    return Ok(());
                }
                Tap::Locked => {
                    acknowledge(&bot, &q, Some("Answer already taken, hold on…".into())).await;
                    return Ok(());
                }
            };
            // Lock the stored state too, so the chat refuses taps during the pause.
            dialogue
                .update(QuizState::Running {
                    session: session.clone(),
                })
                .await?;

            let number = session.current_index() + 1;
            let record = session.answer_log().last().cloned();
            info!(
                "{} answers {:?} to question #{} of '{}'. Correctness: {}",
                q.from.username.clone().unwrap_or_default(),
                record.as_ref().map(|r| r.selected_text.as_str()),
                number,
                session.quiz().title(),
                evaluation.is_correct
            );

            let verdict = if evaluation.is_correct {
                format!("Correct!✅ +{} pts", evaluation.score_delta)
            } else {
                "Incorrect.❌".to_owned()
            };
            acknowledge(&bot, &q, Some(verdict.clone())).await;

            if let Some(message) = &q.message {
                let chosen = record.map(|r| r.selected_text).unwrap_or_default();
                let edited = bot
                    .edit_message_text(
                        chat_id,
                        message.id(),
                        format!(
                            "Question #{}\n{}\n\nYour answer: {}\n{}",
                            number,
                            session.current_question(),
                            chosen,
                            verdict
                        ),
                    )
                    .await;
                if let Err(e) = edited {
                    warn!("Failed to show the verdict: {e}");
                }
            }

            flow.finish_feedback(&mut session).await
        }
        CallbackAction::Retry => {
            if !matches!(session.phase(), Phase::Failed(_)) {
                acknowledge(&bot, &q, None).await;
                return Ok(());
            }
            acknowledge(&bot, &q, Some("Submitting again…".into())).await;
            flow.retry(&mut session).await
        }
    };

    // The stored state must never lag behind the session once the flow moved it.
    dialogue.update(state_after(&step, session.clone())).await?;

    match step {
        FlowStep::Idle => {}
        FlowStep::NextQuestion(_) => {
            send_question(&bot, chat_id, &session).await?;
        }
        FlowStep::Completed(summary) => {
            bot.send_message(chat_id, "Congratulations! You completed the quiz!")
                .await?;
            let mut text = format!(
                "Correct answers: {}/{}\nMilestone points earned: {}",
                summary.correct_count, summary.total_questions, summary.cumulative_score
            );
            if let Some(message) = summary.message {
                text.push_str(&format!("\n{message}"));
            }
            bot.send_message(chat_id, text)
                .reply_markup(action_keyboard())
                .await?;
        }
        FlowStep::Failed(e) => {
            bot.send_message(chat_id, format!("⚠️ {e}"))
                .reply_markup(retry_keyboard())
                .await?;
        }
    }

    Ok(())
}

async fn send_question(bot: &Bot, chat_id: ChatId, session: &QuizSession) -> HandlerResult {
    let index = session.current_index();
    let question = session.current_question();
    info!("Asking question #{}: '{}'", index + 1, question.text());

    bot.send_message(
        chat_id,
        format!(
            "Question #{}/{}\n{}",
            index + 1,
            session.quiz().questions().len(),
            question
        ),
    )
    .reply_markup(answers_keyboard(question))
    .await?;
    Ok(())
}
