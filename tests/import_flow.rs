//! End-to-end import against a mocked Petfinder API.
//!
//! Covers the token exchange, paginated `GET /animals`, translation into
//! stored records and deduplication on re-import.

use std::sync::Arc;
use std::time::Duration;

use petsync::models::dog::{Gender, Size, SyncStatus};
use petsync::petfinder::{Credentials, PetfinderClient, SearchCriteria};
use petsync::store::memory::MemoryStore;
use petsync::store::DogStore;
use petsync::sync::Importer;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dog(id: u64) -> Value {
    json!({
        "id": id,
        "organization_id": "NJ333",
        "name": format!("Dog {}", id),
        "breeds": { "primary": "Boxer", "secondary": null, "mixed": false, "unknown": false },
        "colors": { "primary": "Fawn", "secondary": null, "tertiary": null },
        "age": "Young",
        "gender": "Male",
        "size": "Large",
        "coat": "Short",
        "photos": [{ "small": "https://p/s.jpg", "medium": "https://p/m.jpg", "large": "https://p/l.jpg", "full": "https://p/f.jpg" }],
        "videos": [],
        "attributes": {
            "spayed_neutered": true,
            "house_trained": null,
            "declawed": null,
            "special_needs": false,
            "shots_current": true
        },
        "environment": { "children": true, "dogs": null, "cats": false },
        "tags": ["Playful"],
        "contact": { "email": "adopt@shelter.org", "phone": "555-0100", "address": { "city": "Hoboken" } },
        "published_at": "2024-03-01T12:00:00+0000"
    })
}

fn page(ids: &[u64], current: u32, total: u32) -> Value {
    json!({
        "animals": ids.iter().map(|id| dog(*id)).collect::<Vec<_>>(),
        "pagination": {
            "count_per_page": 100,
            "total_count": 5,
            "current_page": current,
            "total_pages": total
        }
    })
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3600,
            "access_token": "tok-1"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, number: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/animals"))
        .and(query_param("page", number.to_string()))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn importer(server: &MockServer, store: Arc<MemoryStore>) -> Importer {
    let client = PetfinderClient::new(
        reqwest::Client::new(),
        &server.uri(),
        Credentials {
            client_id: "client".into(),
            client_secret: "secret".into(),
        },
    );
    Importer::new(Arc::new(client), store)
        .with_page_delay(Duration::ZERO)
        .with_fetch_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_organization_import_walks_pages_and_dedupes() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_page(&server, 1, page(&[101, 102], 1, 3)).await;
    mount_page(&server, 2, page(&[103, 104], 2, 3)).await;
    mount_page(&server, 3, page(&[105], 3, 3)).await;

    let store = Arc::new(MemoryStore::new());
    let importer = importer(&server, store.clone());

    let first = importer.import_from_organization("NJ333").await;
    assert_eq!(first.imported, 5, "{:?}", first.errors);
    assert_eq!(first.skipped, 0);
    assert!(first.errors.is_empty());

    let second = importer.import_from_organization("NJ333").await;
    assert_eq!(second.imported, 0);
    assert_eq!(second.skipped, 5);
    assert_eq!(store.len(), 5);

    let requests = server.received_requests().await.unwrap();
    let first_page = requests
        .iter()
        .find(|r| r.url.path() == "/animals")
        .expect("animals requested");
    let query = first_page.url.query().unwrap_or_default();
    assert!(query.contains("organization=NJ333"), "{}", query);
    assert!(query.contains("type=dog"), "{}", query);
    assert!(query.contains("limit=100"), "{}", query);
}

#[tokio::test]
async fn test_imported_record_is_translated() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_page(&server, 1, page(&[101], 1, 1)).await;

    let store = Arc::new(MemoryStore::new());
    importer(&server, store.clone()).import_from_organization("NJ333").await;

    let rec = store.find_by_petfinder_id("101").await.unwrap().expect("stored");
    assert_eq!(rec.fields.name, "Dog 101");
    assert_eq!(rec.fields.age_years, 2.0);
    assert_eq!(rec.fields.gender, Gender::Male);
    assert_eq!(rec.fields.size, Size::Large);
    assert_eq!(rec.fields.photos, vec!["https://p/l.jpg"]);
    assert!(rec.fields.spayed_neutered);
    assert!(!rec.fields.house_trained, "null attribute reads as false");
    assert_eq!(rec.fields.good_with_kids, Some(true));
    assert_eq!(rec.fields.good_with_dogs, None);
    assert_eq!(rec.fields.good_with_cats, Some(false));
    assert_eq!(rec.fields.contact_email.as_deref(), Some("adopt@shelter.org"));
    assert!(rec.fields.published_at.is_some());
    assert_eq!(rec.sync.status, SyncStatus::Synced);
}

#[tokio::test]
async fn test_page_error_keeps_partial_result() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_page(&server, 1, page(&[201, 202], 1, 3)).await;
    Mock::given(method("GET"))
        .and(path("/animals"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let criteria = SearchCriteria {
        location: Some("07030".into()),
        distance: Some(25),
        ..SearchCriteria::default()
    };
    let result = importer(&server, store.clone()).import_from_search(&criteria).await;

    assert_eq!(result.imported, 2);
    assert_eq!(result.errors.len(), 1);
    assert!(
        result.errors[0].starts_with("Failed to fetch page 2: Petfinder returned 500"),
        "{}",
        result.errors[0]
    );
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_unauthorized_page_forces_new_token() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/animals"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, page(&[301], 1, 1)).await;

    let store = Arc::new(MemoryStore::new());
    let importer = importer(&server, store.clone());

    let rejected = importer.import_from_organization("NJ333").await;
    assert_eq!(rejected.imported, 0);
    assert!(rejected.errors[0].contains("401"), "{}", rejected.errors[0]);

    let retried = importer.import_from_organization("NJ333").await;
    assert_eq!(retried.imported, 1);
}

#[tokio::test]
async fn test_rejected_credentials_abort_import() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let result = importer(&server, store).import_from_organization("NJ333").await;
    assert_eq!(result.imported, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("authentication failed"), "{}", result.errors[0]);
}

#[tokio::test]
async fn test_single_animal_import() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/animals/401"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "animal": dog(401) })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let result = importer(&server, store.clone()).import_animal(401).await;
    assert_eq!(result.imported, 1);
    assert!(store.find_by_petfinder_id("401").await.unwrap().is_some());
}
