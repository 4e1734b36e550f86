//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use storyloom_adapters::openai::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
use storyloom_adapters::twilio::DEFAULT_API_BASE;

use crate::error::AppError;

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Bearer token.
    pub api_key: String,
    /// API root.
    pub base_url: String,
    /// Chat completion model.
    pub chat_model: String,
    /// Embedding model.
    pub embedding_model: String,
}

/// Twilio account settings.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Account SID.
    pub account_sid: String,
    /// Auth token.
    pub auth_token: String,
    /// Sending number.
    pub phone_number: String,
    /// API root.
    pub api_base: String,
}

/// Everything the server reads at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address.
    pub addr: SocketAddr,
    /// `sqlite:` URL for the durable store; `None` keeps state in memory.
    pub database_url: Option<String>,
    /// File holding the scenario text.
    pub scenario_path: PathBuf,
    /// Time between round closings.
    pub round_interval: Duration,
    /// Upper bound for each model call.
    pub service_timeout: Duration,
    /// Token budget of the model context (0 disables trimming).
    pub context_token_limit: usize,
    /// Model endpoint.
    pub model: ModelConfig,
    /// SMS account.
    pub sms: SmsConfig,
    /// Start the round timer right after seeding.
    pub auto_start: bool,
    /// OTLP collector, when traces should be exported.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for a missing required variable or a value
    /// that does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns a variable's
    /// value or `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for a missing required variable or a value
    /// that does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let host = env.or("HOST", "0.0.0.0");
        let port: u16 = env.parse_or("PORT", 3000)?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        Ok(Self {
            addr,
            database_url: env.optional("DATABASE_URL"),
            scenario_path: PathBuf::from(env.required("SCENARIO_PATH")?),
            round_interval: Duration::from_secs(env.parse_or("ROUND_INTERVAL_SECS", 600)?),
            service_timeout: Duration::from_secs(env.parse_or("SERVICE_TIMEOUT_SECS", 60)?),
            context_token_limit: env.parse_or("CONTEXT_TOKEN_LIMIT", 4096)?,
            model: ModelConfig {
                api_key: env.required("OPENAI_API_KEY")?,
                base_url: env.or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
                chat_model: env.or("OPENAI_CHAT_MODEL", DEFAULT_CHAT_MODEL),
                embedding_model: env.or("OPENAI_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            },
            sms: SmsConfig {
                account_sid: env.required("TWILIO_ACCOUNT_SID")?,
                auth_token: env.required("TWILIO_AUTH_TOKEN")?,
                phone_number: env.required("TWILIO_PHONE_NUMBER")?,
                api_base: env.or("TWILIO_API_BASE", DEFAULT_API_BASE),
            },
            auto_start: env.parse_or("AUTO_START", false)?,
            otlp_endpoint: env.optional("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_owned())
    }

    fn required(&self, key: &str) -> Result<String, AppError> {
        self.optional(key)
            .ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
        }
    }
}
