//! Repositories over the status and recovery tables
//!
//! - [`StatusTracker`]: flow, process and step lifecycle rows
//! - [`CheckpointStore`]: atomic checkpoint + recovery record writes
//! - [`RecoveryCoordinator`]: idle record lookup, checkpoint listing, consumption

pub mod checkpoint_repository;
pub mod recover_record_repository;
pub mod status_repository;

pub use checkpoint_repository::CheckpointStore;
pub use recover_record_repository::RecoveryCoordinator;
pub use status_repository::StatusTracker;
