pub mod digest;
pub mod engine;
pub mod error;
pub mod fs;
pub mod hasher;
pub mod index;
pub mod model;
pub mod orchestrate;
pub mod paths;
pub mod progress;
pub mod reconcile;
pub mod snapshot;
pub mod store;

pub use digest::{digests_equal, Digest, DIGEST_LEN};
pub use engine::Engine;
pub use error::{Error, Result};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use hasher::{compute_digest, hash_file, HashedContent};
pub use index::ContentIndex;
pub use model::{flatten_paths, DuplicateGroup, IndexedFile, IndexedLocation};
pub use orchestrate::{synchronize, SyncPlan, SyncReport};
pub use paths::PathPolicy;
pub use progress::{NoProgress, ProgressScale, ProgressSink, ScaledProgress};
pub use reconcile::{ReconcileOptions, ReconcileSummary, Reconciler};
pub use snapshot::Snapshot;
pub use store::{MemoryStore, RecordStore};
