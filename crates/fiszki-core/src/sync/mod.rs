//! Offline/online synchronization layer.
//!
//! [`SyncCoordinator`] fronts a local and a remote
//! [`FlashcardStore`](crate::store::FlashcardStore). Writes land locally first; remote writes
//! that fail for network reasons are kept in a durable [`OperationQueue`]
//! and replayed later. A full resync drains the queue and then mirrors the
//! remote data into the local store.

mod coordinator;
mod mappings;
mod monitor;
mod queue;
mod state;
pub mod storage;

pub use coordinator::{MigrationReport, SkipReason, SyncCoordinator, SyncOutcome, SyncReport};
pub use mappings::IdMappings;
pub use monitor::run_auto_sync;
pub use queue::{DrainReport, Operation, OperationQueue, QueuedOperation};
pub use state::{SyncState, SyncStatus};
pub use storage::{FileStateStorage, MemoryStateStorage, StateStorage};
