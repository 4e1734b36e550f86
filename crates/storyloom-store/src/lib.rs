//! Storage engines for the Storyloom session state.
//!
//! Both engines implement every store port from `storyloom_core::repository`,
//! so one instance can be shared behind all three trait objects.

pub mod memory_store;
pub mod schema;
pub mod sqlite_store;

pub use memory_store::MemorySessionStore;
pub use sqlite_store::SqliteSessionStore;
