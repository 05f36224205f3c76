//! Petfinder v2 wire types (subset of fields we consume).
//!
//! Every optional block defaults when absent so one sparse listing cannot
//! fail a whole page.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Animal {
    pub id: u64,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub breeds: Breeds,
    #[serde(default)]
    pub colors: Colors,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub coat: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoSet>,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Breeds {
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub mixed: bool,
    #[serde(default)]
    pub unknown: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Colors {
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub tertiary: Option<String>,
}

/// One photo at several resolutions.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PhotoSet {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub full: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Video {
    #[serde(default)]
    pub embed: String,
}

// Petfinder sends `null` for attributes it has no answer for.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Attributes {
    #[serde(default, deserialize_with = "null_as_false")]
    pub spayed_neutered: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub house_trained: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub declawed: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub special_needs: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub shots_current: bool,
}

/// Tri-state: `None` means the shelter never said.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Environment {
    #[serde(default)]
    pub children: Option<bool>,
    #[serde(default)]
    pub dogs: Option<bool>,
    #[serde(default)]
    pub cats: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Contact {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Address,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Address {
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnimalsPage {
    #[serde(default)]
    pub animals: Vec<Animal>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub count_per_page: u32,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

/// `GET /animals/{id}` wraps the record.
#[derive(Debug, Clone, Deserialize)]
pub struct AnimalEnvelope {
    pub animal: Animal,
}

/// Response from `POST /oauth2/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub expires_in: i64,
    pub access_token: String,
}

/// Outbound listing: a dog record in Petfinder's categorical vocabulary.
///
/// Serves both as the JSON body for direct API submission and as the
/// source of each CSV feed row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    /// Shelter-side identifier (internal record id).
    pub id: String,
    pub name: String,
    pub breed_primary: String,
    pub breed_secondary: Option<String>,
    pub mixed: bool,
    pub age: &'static str,
    pub gender: &'static str,
    pub size: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coat: Option<&'static str>,
    pub color_primary: Option<String>,
    pub color_secondary: Option<String>,
    pub description: Option<String>,
    pub spayed_neutered: bool,
    pub house_trained: bool,
    pub declawed: bool,
    pub shots_current: bool,
    pub special_needs: bool,
    pub good_with_children: Option<bool>,
    pub good_with_dogs: Option<bool>,
    pub good_with_cats: Option<bool>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub photos: Vec<String>,
    pub tags: Vec<String>,
    pub status: &'static str,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<bool> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or(false))
}
