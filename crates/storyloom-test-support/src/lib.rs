//! Shared test doubles and utilities for the Storyloom engine.

mod clock;
mod messaging;
mod models;
mod store;

pub use clock::FixedClock;
pub use messaging::{FailingSender, RecordingSender};
pub use models::{
    FailingCompletion, FailingEmbeddings, GatedCompletion, ScriptedCompletion, TableEmbeddings,
};
pub use store::{FailingHistoryStore, InterruptedCommit};
