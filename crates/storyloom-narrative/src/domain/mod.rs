//! Pure domain logic: round lifecycle, medoid selection, context assembly,
//! and participant-facing texts.

pub mod aggregates;
pub mod commands;
pub mod context;
pub mod medoid;
pub mod messages;
