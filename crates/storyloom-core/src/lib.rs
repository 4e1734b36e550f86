//! Storyloom Core — shared domain types and ports.
//!
//! This crate defines the types every other crate agrees on (participants,
//! history entries, proposals, chat messages) and the traits the engine
//! depends on for storage and external services. It contains no
//! infrastructure code.

pub mod clock;
pub mod error;
pub mod history;
pub mod participant;
pub mod proposal;
pub mod repository;
pub mod services;
