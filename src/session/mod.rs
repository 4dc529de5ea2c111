//! Persistence session
//!
//! A small unit-of-work layer driving column bindings end to end: mapped
//! record types, records with shared change state, an in-memory store, and
//! an identity map with flush/commit. It is not a relational engine.
//!
//! Records and sessions are confined to one thread of work at a time.

mod mapper;
mod record;
mod store;
mod unit_of_work;

pub use mapper::Mapper;
pub use record::{Record, RecordState};
pub use store::{MemoryStore, Row};
pub use unit_of_work::{EntryStatus, RecordKey, Session};
