//! Job dispatch: durable queue plus a fixed-size worker pool.

mod config;
mod queue;
mod sqlite_queue;
mod worker;

pub use config::DispatcherConfig;
pub use queue::{JobQueue, QueueError, QueuedJob};
pub use sqlite_queue::SqliteJobQueue;
pub use worker::{Dispatcher, DispatcherStatus};
