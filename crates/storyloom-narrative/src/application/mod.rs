//! Application services that drive the domain against the store and
//! service ports.

pub mod broadcast;
pub mod intake;
pub mod query_handlers;
pub mod session;
pub mod timer;
pub mod vote_selector;
