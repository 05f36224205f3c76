//! petsync: Petfinder synchronization engine for shelter dog records.
//!
//! Library crate shared by the `petsync` binary and the integration tests
//! in `tests/`.

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod petfinder;
pub mod store;
pub mod sync;
pub mod transport;

/// Shared application state passed to handlers.
pub struct AppState {
    pub sync: sync::SyncService,
}
