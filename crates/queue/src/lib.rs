//! Crawl queue for the board mirror: the discovery sequences that walk the
//! backend's identifier spaces, the persisted queue row they resume from,
//! and the round-robin scheduler that drives them.

pub mod error;
mod scheduler;
mod sequence;
mod store;

pub use crate::scheduler::{Pacing, Scheduler};
pub use crate::sequence::{Outcome, Sequence, SequenceKind, SequenceState};
pub use crate::store::{PersistedQueue, QueueStore};
