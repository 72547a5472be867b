//! Small utilities shared by the server variants.
pub mod env;
pub mod port;
pub mod storage;

pub use env::EnvironmentPublisher;
pub use port::find_free_port;
pub use storage::{allocate_storage_dir, purge_pending_deletions};
