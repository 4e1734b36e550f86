//! Storyloom — adapters for the external services.
//!
//! Implements the core service ports over HTTP: an OpenAI-compatible chat
//! completion and embedding client, and a Twilio SMS sender.

pub mod error;
pub mod openai;
pub mod twilio;

pub use error::AdapterError;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use twilio::{TwilioConfig, TwilioSender};
