use std::sync::Arc;

use cellar_quiz::auth::FileAuthStore;
use cellar_quiz::catalog::DirectoryCatalog;
use cellar_quiz::config::{self, Config};
use cellar_quiz::schema::schema;
use cellar_quiz::state::QuizState;
use cellar_quiz::submitter::MilestoneClient;
use dotenvy::dotenv;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::error_handlers::IgnoringErrorHandlerSafe;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::{info, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_log::LogTracer::init().expect("Failed to bridge log records.");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config::log_level()))
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to install subscriber.");

    let config = Config::load().expect("Environment misconfigured!");

    let catalog = Arc::new(DirectoryCatalog::load(&config.quiz_dir).expect("Quiz directory misconfigured!"));
    let store = FileAuthStore::open(&config.auth_store_path);
    let client = Arc::new(
        MilestoneClient::new(&config.api_base_url, config.submit_timeout)
            .expect("Failed to build the HTTP client."),
    );
    if catalog.is_empty() {
        warn!("No playable quizzes in {}", config.quiz_dir.display());
    }
    info!(
        "Serving {} quizzes, submitting to {}",
        catalog.len(),
        client.endpoint()
    );

    let bot = Bot::new(&config.teloxide_token);
    info!("Starting bot...");

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![
            InMemStorage::<QuizState>::new(),
            catalog,
            store,
            client,
            config.feedback_delay
        ])
        .enable_ctrlc_handler()
        .build();

    if let Some(webhook) = config.webhook {
        let listener = webhooks::axum(bot, Options::new(webhook.addr, webhook.url))
            .await
            .expect("Failed to build a listener.");
        dispatcher
            .dispatch_with_listener(listener, Arc::new(IgnoringErrorHandlerSafe))
            .await
    } else {
        dispatcher.dispatch().await
    }
}
