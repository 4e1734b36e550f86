//! Storyloom API server entry point.

use std::sync::Arc;

use storyloom_adapters::{OpenAiClient, OpenAiConfig, TwilioConfig, TwilioSender};
use storyloom_api::config::AppConfig;
use storyloom_api::error::AppError;
use storyloom_api::state::AppState;
use storyloom_api::{app, telemetry};
use storyloom_core::clock::SystemClock;
use storyloom_narrative::application::session::{Session, SessionPorts, SessionSettings};
use storyloom_narrative::application::timer::RoundTimer;
use storyloom_narrative::domain::context::ContextWindow;
use storyloom_store::{MemorySessionStore, SqliteSessionStore};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Storyloom API server");

    let result = run(config).await;
    if let Err(err) = &result {
        tracing::error!(error = %err, "server exited with error");
    }
    telemetry.shutdown();
    result
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    let scenario = tokio::fs::read_to_string(&config.scenario_path)
        .await
        .map_err(AppError::Scenario)?;

    let session = Arc::new(build_session(&config).await?);

    // A failed seed is fatal.
    let outcome = session.initialize(&scenario).await?;
    tracing::info!(?outcome, "session ready");

    let timer = Arc::new(RoundTimer::new(session.clone(), config.round_interval));
    if config.auto_start {
        timer.start().await?;
    }

    let router = app(AppState::new(session, timer.clone()));

    tracing::info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    timer.stop().await?;
    Ok(())
}

async fn build_session(config: &AppConfig) -> Result<Session, AppError> {
    let mut model = OpenAiConfig::new(config.model.api_key.clone());
    model.base_url.clone_from(&config.model.base_url);
    model.chat_model.clone_from(&config.model.chat_model);
    model.embedding_model.clone_from(&config.model.embedding_model);
    model.timeout = config.service_timeout;
    let model = Arc::new(OpenAiClient::new(model)?);

    let mut sms = TwilioConfig::new(
        config.sms.account_sid.clone(),
        config.sms.auth_token.clone(),
        config.sms.phone_number.clone(),
    );
    sms.api_base.clone_from(&config.sms.api_base);
    let sender = Arc::new(TwilioSender::new(sms)?);

    let clock = Arc::new(SystemClock);
    let ports = if let Some(url) = &config.database_url {
        tracing::info!("using sqlite session store");
        let store = Arc::new(SqliteSessionStore::connect(url).await?);
        SessionPorts {
            history: store.clone(),
            participants: store.clone(),
            proposals: store,
            completion: model.clone(),
            embeddings: model,
            sender,
            clock,
        }
    } else {
        tracing::warn!("DATABASE_URL not set; session state will not survive a restart");
        let store = Arc::new(MemorySessionStore::new());
        SessionPorts {
            history: store.clone(),
            participants: store.clone(),
            proposals: store,
            completion: model.clone(),
            embeddings: model,
            sender,
            clock,
        }
    };

    let settings = SessionSettings {
        service_timeout: config.service_timeout,
        context_window: ContextWindow::new(config.context_token_limit),
        ..SessionSettings::default()
    };
    Ok(Session::new(ports, settings))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
