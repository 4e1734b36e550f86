//! Storyloom — turn aggregation engine.
//!
//! Collects proposals from participants during a round, picks one
//! representative proposal by embedding-space medoid when the round timer
//! fires, advances the shared story through the generative model, and
//! broadcasts the result before opening the next round.

pub mod application;
pub mod domain;
