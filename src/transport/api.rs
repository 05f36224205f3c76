use async_trait::async_trait;
use std::sync::Arc;

use super::{Batch, Delivery, TransportError, UploadTransport};
use crate::models::results::UploadMethod;
use crate::petfinder::PetfinderClient;
use crate::sync::translate::internal_to_remote;

const METHOD: UploadMethod = UploadMethod::Api;

/// Direct listing submission through the Petfinder API.
pub struct ApiTransport {
    client: Arc<PetfinderClient>,
}

impl ApiTransport {
    pub fn new(client: Arc<PetfinderClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UploadTransport for ApiTransport {
    fn method(&self) -> UploadMethod {
        METHOD
    }

    /// A token exchange proves both reachability and credentials.
    async fn probe(&self) -> Result<(), TransportError> {
        self.client
            .authenticate()
            .await
            .map(|_| ())
            .map_err(|e| TransportError::connect(METHOD, e))
    }

    async fn upload(&self, batch: Batch<'_>) -> Result<Delivery, TransportError> {
        let mut first_id = None;
        for record in batch.records {
            let listing = internal_to_remote(record);
            let remote_id = self
                .client
                .submit_listing(&listing)
                .await
                .map_err(|e| TransportError::transfer(METHOD, e))?;
            tracing::info!(dog_id = %record.id, petfinder_id = ?remote_id, "Submitted listing via API");
            if first_id.is_none() {
                first_id = remote_id;
            }
        }

        Ok(Delivery {
            remote_id: first_id,
            reference: "POST /animals".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::petfinder::Credentials;
    use crate::sync::translate::tests::sample_record;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> ApiTransport {
        let client = PetfinderClient::new(
            reqwest::Client::new(),
            &server.uri(),
            Credentials {
                client_id: "cid".into(),
                client_secret: "secret".into(),
            },
        );
        ApiTransport::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_probe_fails_on_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = transport(&server).probe().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { method: UploadMethod::Api, .. }));
        assert!(err.to_string().contains("401"), "{err}");
    }

    #[tokio::test]
    async fn test_upload_returns_remote_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer", "expires_in": 3600, "access_token": "abc"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/animals"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "animal": { "id": 555 } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let record = sample_record();
        let delivery = transport(&server).upload(Batch::single(&record)).await.unwrap();
        assert_eq!(delivery.remote_id.as_deref(), Some("555"));
    }
}
