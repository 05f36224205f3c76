//! Internal dog record: the shelter's own representation of an animal.
//!
//! Categorical fields are closed enums so every mapping to and from the
//! Petfinder schema is checked for exhaustiveness by the compiler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Enumerations ─────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Unknown];
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum Size {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl Size {
    pub const ALL: [Size; 4] = [Size::Small, Size::Medium, Size::Large, Size::ExtraLarge];
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum Coat {
    Hairless,
    Short,
    Medium,
    Long,
    Wire,
    Curly,
}

impl Coat {
    pub const ALL: [Coat; 6] = [
        Coat::Hairless,
        Coat::Short,
        Coat::Medium,
        Coat::Long,
        Coat::Wire,
        Coat::Curly,
    ];
}

/// Where the dog is in the adoption process.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum AdoptionStatus {
    Available,
    Hold,
    Pending,
    Adopted,
}

impl AdoptionStatus {
    pub const ALL: [AdoptionStatus; 4] = [
        AdoptionStatus::Available,
        AdoptionStatus::Hold,
        AdoptionStatus::Pending,
        AdoptionStatus::Adopted,
    ];
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum Housing {
    Shelter,
    InFoster,
}

/// Relationship of a local record to its Petfinder listing.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    NotSynced,
    Syncing,
    Synced,
    Error,
}

impl SyncStatus {
    pub const ALL: [SyncStatus; 4] = [
        SyncStatus::NotSynced,
        SyncStatus::Syncing,
        SyncStatus::Synced,
        SyncStatus::Error,
    ];

    /// `NOT_SYNCED → SYNCING → {SYNCED, ERROR}`, with `ERROR → SYNCING`
    /// (retry) and `SYNCED → SYNCING` (re-sync).
    pub fn can_transition_to(self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::NotSynced, SyncStatus::Syncing)
                | (SyncStatus::Syncing, SyncStatus::Synced)
                | (SyncStatus::Syncing, SyncStatus::Error)
                | (SyncStatus::Error, SyncStatus::Syncing)
                | (SyncStatus::Synced, SyncStatus::Syncing)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::NotSynced => "NOT_SYNCED",
            SyncStatus::Syncing => "SYNCING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Error => "ERROR",
        }
    }
}

// ── Record ───────────────────────────────────────────────────

/// The translatable part of a dog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DogFields {
    pub name: String,
    pub breed_primary: String,
    pub breed_secondary: Option<String>,
    pub mixed_breed: bool,
    pub color_primary: Option<String>,
    pub color_secondary: Option<String>,
    pub color_tertiary: Option<String>,
    /// Age in years. Fractional values are allowed (0.5 = six months).
    pub age_years: f64,
    pub gender: Gender,
    pub size: Size,
    pub coat: Option<Coat>,
    pub description: Option<String>,
    pub photos: Vec<String>,
    pub videos: Vec<String>,
    pub spayed_neutered: bool,
    pub house_trained: bool,
    pub declawed: bool,
    pub special_needs: bool,
    pub shots_current: bool,
    pub good_with_kids: Option<bool>,
    pub good_with_dogs: Option<bool>,
    pub good_with_cats: Option<bool>,
    pub tags: Vec<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: AdoptionStatus,
    pub housing: Housing,
    pub published_at: Option<DateTime<Utc>>,
}

impl DogFields {
    /// Minimal record with neutral defaults, used by intake and tests.
    pub fn named(name: impl Into<String>, breed: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            breed_primary: breed.into(),
            breed_secondary: None,
            mixed_breed: false,
            color_primary: None,
            color_secondary: None,
            color_tertiary: None,
            age_years: 5.0,
            gender: Gender::Unknown,
            size: Size::Medium,
            coat: None,
            description: None,
            photos: Vec::new(),
            videos: Vec::new(),
            spayed_neutered: false,
            house_trained: false,
            declawed: false,
            special_needs: false,
            shots_current: false,
            good_with_kids: None,
            good_with_dogs: None,
            good_with_cats: None,
            tags: Vec::new(),
            contact_email: None,
            contact_phone: None,
            status: AdoptionStatus::Available,
            housing: Housing::Shelter,
            published_at: None,
        }
    }
}

/// Synchronization bookkeeping stored alongside each record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub status: SyncStatus,
    /// Petfinder's animal id. Unique across records when present.
    pub petfinder_id: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub method: Option<String>,
    /// Append-only history of failed attempts, oldest first.
    pub errors: Vec<String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::NotSynced,
            petfinder_id: None,
            last_synced_at: None,
            method: None,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DogRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: DogFields,
    pub sync: SyncState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to `DogStore::create`.
#[derive(Debug, Clone)]
pub struct NewDog {
    pub fields: DogFields,
    pub sync: SyncState,
}

/// A guarded change to a record's sync state.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncTransition {
    Syncing,
    Synced {
        petfinder_id: Option<String>,
        method: String,
        at: DateTime<Utc>,
    },
    Failed {
        message: String,
    },
}

impl SyncTransition {
    pub fn target(&self) -> SyncStatus {
        match self {
            SyncTransition::Syncing => SyncStatus::Syncing,
            SyncTransition::Synced { .. } => SyncStatus::Synced,
            SyncTransition::Failed { .. } => SyncStatus::Error,
        }
    }

    /// States a record must currently be in for this transition to apply.
    pub fn allowed_from(&self) -> Vec<SyncStatus> {
        let target = self.target();
        SyncStatus::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(target))
            .collect()
    }

    /// Apply to an in-memory state. Callers check `allowed_from` first.
    pub fn apply(&self, state: &mut SyncState) {
        state.status = self.target();
        match self {
            SyncTransition::Syncing => {}
            SyncTransition::Synced {
                petfinder_id,
                method,
                at,
            } => {
                if petfinder_id.is_some() {
                    state.petfinder_id = petfinder_id.clone();
                }
                state.method = Some(method.clone());
                state.last_synced_at = Some(*at);
            }
            SyncTransition::Failed { message } => {
                state.errors.push(message.clone());
            }
        }
    }
}
