use teloxide::{
    dispatching::{
        dialogue::{self, InMemStorage},
        DpHandlerDescription, UpdateFilterExt, UpdateHandler,
    },
    dptree::{self, Handler},
    prelude::{DependencyMap, Requester},
    types::{Message, Update},
    Bot,
};
use tracing::{debug, info, instrument};

use crate::{
    catalog::DirectoryCatalog,
    commands::{cancel, help, login, logout, start, Command},
    runner,
    state::QuizState,
    HandlerResult,
};

type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Full dispatch tree: commands first, then the per-state message handlers,
/// and answer/retry taps arriving as callback queries.
pub fn schema() -> UpdateHandler<HandlerError> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel))
        .branch(case![Command::Login(token)].endpoint(login))
        .branch(case![Command::Logout].endpoint(logout));

    let handler = Update::filter_message()
        .branch(command_handler)
        .branch(case![QuizState::Start].endpoint(runner::choose_what_to_do::<DirectoryCatalog>))
        .branch(running_scheme())
        .endpoint(invalid_state);

    dialogue::enter::<Update, InMemStorage<QuizState>, QuizState, _>()
        .branch(handler)
        .branch(callback_query_scheme())
}

#[instrument(level = "debug")]
fn running_scheme() -> Handler<'static, DependencyMap, Result<(), HandlerError>, DpHandlerDescription>
{
    use dptree::case;
    debug!("Building dispatching tree for runner");
    Update::filter_message()
        .branch(case![QuizState::Selection].endpoint(runner::selection::<DirectoryCatalog>))
        .branch(case![QuizState::ReadyToRun { quiz }].endpoint(runner::running_ready))
}

#[instrument(level = "debug")]
fn callback_query_scheme(
) -> Handler<'static, DependencyMap, Result<(), HandlerError>, DpHandlerDescription> {
    use dptree::case;
    debug!("Building dispatching tree for callback query");
    Update::filter_callback_query()
        .branch(case![QuizState::Running { session }].endpoint(runner::take_answer))
        .endpoint(stale_callback)
}

async fn stale_callback(bot: Bot, q: teloxide::types::CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(&q.id).await?;
    Ok(())
}

#[instrument(level = "info", skip_all, fields(chat = %msg.chat.id))]
async fn invalid_state(bot: Bot, msg: Message) -> HandlerResult {
    info!("Invalid input '{:?}'", msg.text());
    bot.send_message(
        msg.chat.id,
        "Unable to handle the message. Enter /help to see usages.",
    )
    .await?;
    Ok(())
}
