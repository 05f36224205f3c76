//! Petfinder API access: OAuth token lifecycle and the animals endpoints.

pub mod auth;
pub mod client;

use std::time::Duration;

pub use auth::{AccessToken, AuthError, Credentials, TokenManager};
pub use client::{AnimalQuery, AnimalSource, PetfinderClient, PetfinderError, SearchCriteria};

/// Shared HTTP client for Petfinder calls. `timeout` bounds each request.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("petsync/", env!("CARGO_PKG_VERSION")))
        .build()
}
