//! Inbound SMS webhook.
//!
//! Twilio posts each incoming message as a form. The reply texts go back in
//! the response body as TwiML, one `<Message>` per text.

use axum::extract::{Form, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Router, routing::post};
use serde::Deserialize;
use tracing::{info, instrument};

use storyloom_narrative::application::intake;
use storyloom_narrative::domain::commands::ReceiveMessage;

use crate::error::ApiError;
use crate::state::AppState;

/// Form fields of an inbound message.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    /// Sender phone number.
    #[serde(rename = "From")]
    pub from: String,
    /// Message text.
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// Escapes text for an XML element body.
fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Renders reply texts as a TwiML messaging response.
#[must_use]
pub fn twiml(messages: &[String]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
    for message in messages {
        xml.push_str("<Message>");
        xml.push_str(&escape_xml(message));
        xml.push_str("</Message>");
    }
    xml.push_str("</Response>");
    xml
}

/// POST /hook
#[instrument(skip(state, message), fields(from = %message.from))]
async fn receive(
    State(state): State<AppState>,
    Form(message): Form<InboundMessage>,
) -> Result<impl IntoResponse, ApiError> {
    let command = ReceiveMessage::new(message.from, message.body);

    info!(correlation_id = %command.correlation_id, "handling inbound message");

    let reply = intake::handle_receive_message(&command, &state.session).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/xml")],
        twiml(&reply.messages),
    ))
}

/// Returns the webhook router.
pub fn router() -> Router<AppState> {
    Router::new().route("/hook", post(receive))
}
