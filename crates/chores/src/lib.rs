//! Background chores: state machine, worker pool, registry, concrete chores
//!
//! A chore is an accepted unit of background work with a pollable status.
//! The registering request returns immediately; the chore runs on the worker
//! pool and publishes its progress through a [`StatusHandle`] snapshot.
//! Terminal chores linger in their registry for one TTL so pollers can read
//! the outcome, then a periodic sweep purges them.

pub mod chore;
pub mod index;
pub mod pool;
pub mod registry;
pub mod search;
pub mod status;

pub use chore::{execute_chore, Chore};
pub use index::IndexChore;
pub use pool::WorkerPool;
pub use registry::{ChoreRegistry, Sweeper};
pub use search::{GlobalResultPage, GlobalSearchChore};
pub use status::{ChoreState, StatusHandle, StatusSummary};
