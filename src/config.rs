use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use tracing::info;
use url::Url;

use crate::error::ConfigError;
use crate::feedback::{FeedbackDelay, DEFAULT_FEEDBACK_DELAY};

#[derive(Debug, Clone)]
pub struct Webhook {
    pub url: Url,
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub teloxide_token: String,
    pub api_base_url: Url,
    pub quiz_dir: PathBuf,
    pub auth_store_path: PathBuf,
    pub feedback_delay: FeedbackDelay,
    pub submit_timeout: Option<Duration>,
    pub webhook: Option<Webhook>,
}

/// `LOG_LEVEL` filter directive, read on its own so the subscriber can be
/// installed before [`Config::load`] logs anything.
pub fn log_level() -> String {
    log_level_from(|key| env::var(key).ok())
}

pub fn log_level_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("LOG_LEVEL")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "error".to_owned())
}

impl Config {
    /// Reads the process environment (after `.env`, when present).
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let teloxide_token = var("TELOXIDE_TOKEN").ok_or(ConfigError::Missing("TELOXIDE_TOKEN"))?;
        let api_base_url = required(&var, "API_BASE_URL")?;

        let feedback_ms: Option<u64> = optional(&var, "FEEDBACK_DELAY_MS")?;
        let feedback_delay = FeedbackDelay::new(
            feedback_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_FEEDBACK_DELAY),
        );

        let submit_timeout = optional::<u64>(&var, "SUBMIT_TIMEOUT_SECS")?.map(Duration::from_secs);

        let webhook = match (
            optional::<Url>(&var, "WEBHOOK_URL")?,
            optional::<SocketAddr>(&var, "WEBHOOK_ADDR")?,
        ) {
            (Some(url), Some(addr)) => Some(Webhook { url, addr }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("WEBHOOK_ADDR")),
            (None, Some(_)) => return Err(ConfigError::Missing("WEBHOOK_URL")),
        };

        Ok(Self {
            teloxide_token,
            api_base_url,
            quiz_dir: or_default(&var, "QUIZ_DIR", "quizzes").into(),
            auth_store_path: or_default(&var, "AUTH_STORE_PATH", "auth.json").into(),
            feedback_delay,
            submit_timeout,
            webhook,
        })
    }
}

fn or_default(var: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn optional<T: FromStr>(
    var: impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn required<T: FromStr>(
    var: impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    optional(var, key)?.ok_or(ConfigError::Missing(key))
}
