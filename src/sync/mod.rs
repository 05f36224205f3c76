//! The synchronization engine: translation, import, upload and sync-state
//! tracking.

pub mod feed;
pub mod importer;
pub mod service;
pub mod tracker;
pub mod translate;
pub mod upload;

pub use importer::Importer;
pub use service::{SyncService, SyncSummary};
pub use tracker::SyncTracker;
pub use upload::UploadCoordinator;
