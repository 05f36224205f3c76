//! Authenticated HTTP client for the Petfinder v2 API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::auth::{AccessToken, AuthError, Credentials, TokenManager};
use crate::models::petfinder::{Animal, AnimalEnvelope, AnimalsPage, Listing};

/// Petfinder caps `limit` at 100.
pub const PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum PetfinderError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Petfinder returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Optional filters for a search import. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub location: Option<String>,
    pub breed: Option<String>,
    pub age: Option<String>,
    pub size: Option<String>,
    pub gender: Option<String>,
    /// Miles from `location`. Ignored by Petfinder without a location.
    pub distance: Option<u32>,
}

/// Query for `GET /animals`. Everything except the page number is fixed
/// when the query is built.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimalQuery {
    params: Vec<(&'static str, String)>,
    pub page: u32,
}

impl AnimalQuery {
    fn base() -> Self {
        Self {
            params: vec![
                ("type", "dog".to_string()),
                ("status", "adoptable".to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ],
            page: 1,
        }
    }

    pub fn organization(org_id: &str) -> Self {
        let mut q = Self::base();
        q.params.push(("organization", org_id.to_string()));
        q
    }

    pub fn search(criteria: &SearchCriteria) -> Self {
        let mut q = Self::base();
        let optional = [
            ("location", criteria.location.clone()),
            ("breed", criteria.breed.clone()),
            ("age", criteria.age.clone()),
            ("size", criteria.size.clone()),
            ("gender", criteria.gender.clone()),
            ("distance", criteria.distance.map(|d| d.to_string())),
        ];
        for (key, value) in optional {
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                q.params.push((key, v));
            }
        }
        q
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut all = self.params.clone();
        all.push(("page", self.page.to_string()));
        all
    }
}

/// Where imported animals come from. Implemented by `PetfinderClient`;
/// tests substitute scripted sources.
#[async_trait]
pub trait AnimalSource: Send + Sync {
    async fn fetch_page(&self, query: &AnimalQuery) -> Result<AnimalsPage, PetfinderError>;

    async fn fetch_animal(&self, id: u64) -> Result<Animal, PetfinderError>;
}

pub struct PetfinderClient {
    http: reqwest::Client,
    api_url: String,
    credentials: Credentials,
    tokens: Arc<TokenManager>,
}

impl PetfinderClient {
    pub fn new(http: reqwest::Client, api_url: &str, credentials: Credentials) -> Self {
        let tokens = Arc::new(TokenManager::new(http.clone(), api_url));
        Self::with_tokens(http, api_url, credentials, tokens)
    }

    pub fn with_tokens(
        http: reqwest::Client,
        api_url: &str,
        credentials: Credentials,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
            tokens,
        }
    }

    /// Obtain a valid token; doubles as the connectivity probe for the
    /// API upload method.
    pub async fn authenticate(&self) -> Result<AccessToken, PetfinderError> {
        Ok(self.tokens.get_valid_token(&self.credentials).await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, PetfinderError> {
        let token = self.authenticate().await?;
        let url = format!("{}{}", self.api_url, path);

        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, token.authorization())
            .query(params)
            .send()
            .await?;

        self.decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, PetfinderError> {
        let status = resp.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.invalidate(&self.credentials.client_id).await;
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(PetfinderError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(resp.json().await?)
    }

    /// Submit a listing directly. Returns Petfinder's id for the new
    /// animal when the response carries one.
    pub async fn submit_listing(&self, listing: &Listing) -> Result<Option<String>, PetfinderError> {
        let token = self.authenticate().await?;
        let url = format!("{}/animals", self.api_url);

        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, token.authorization())
            .json(listing)
            .send()
            .await?;

        let body: serde_json::Value = self.decode(resp).await?;
        let id = body
            .get("animal")
            .and_then(|a| a.get("id"))
            .or_else(|| body.get("id"))
            .and_then(|v| match v {
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::String(s) => Some(s.clone()),
                _ => None,
            });
        Ok(id)
    }
}

#[async_trait]
impl AnimalSource for PetfinderClient {
    async fn fetch_page(&self, query: &AnimalQuery) -> Result<AnimalsPage, PetfinderError> {
        tracing::debug!(page = query.page, "Fetching Petfinder animals page");
        self.get_json("/animals", &query.params()).await
    }

    async fn fetch_animal(&self, id: u64) -> Result<Animal, PetfinderError> {
        let envelope: AnimalEnvelope = self.get_json(&format!("/animals/{}", id), &[]).await?;
        Ok(envelope.animal)
    }
}
