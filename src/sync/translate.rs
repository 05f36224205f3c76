//! Mapping between Petfinder's categorical schema and the internal record.
//!
//! Inbound lookups are table-driven with an explicit default per field.
//! Outbound lookups are exhaustive `match`es so adding an enum variant
//! without a Petfinder spelling fails to compile.
//!
//! Age is lossy in both directions: Petfinder only knows four buckets, so
//! a 4-year-old goes out as "Adult" and comes back as 5 years. Round trips
//! preserve the bucket, never the exact value.

use chrono::{DateTime, Utc};

use crate::models::dog::{AdoptionStatus, Coat, DogFields, DogRecord, Gender, Housing, Size};
use crate::models::petfinder::{Animal, Listing, PhotoSet};

// ── Inbound tables ───────────────────────────────────────────

const AGE_YEARS: &[(&str, f64)] = &[("baby", 0.5), ("young", 2.0), ("adult", 5.0), ("senior", 10.0)];
const DEFAULT_AGE_YEARS: f64 = 5.0;

const GENDERS: &[(&str, Gender)] = &[
    ("male", Gender::Male),
    ("female", Gender::Female),
    ("unknown", Gender::Unknown),
];
const DEFAULT_GENDER: Gender = Gender::Unknown;

const SIZES: &[(&str, Size)] = &[
    ("small", Size::Small),
    ("medium", Size::Medium),
    ("large", Size::Large),
    ("extra large", Size::ExtraLarge),
    ("xlarge", Size::ExtraLarge),
];
const DEFAULT_SIZE: Size = Size::Medium;

const COATS: &[(&str, Coat)] = &[
    ("hairless", Coat::Hairless),
    ("short", Coat::Short),
    ("medium", Coat::Medium),
    ("long", Coat::Long),
    ("wire", Coat::Wire),
    ("curly", Coat::Curly),
];

fn lookup<T: Copy>(table: &[(&str, T)], raw: Option<&str>) -> Option<T> {
    let key = raw?.trim().to_ascii_lowercase();
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn age_years_from_category(raw: Option<&str>) -> f64 {
    lookup(AGE_YEARS, raw).unwrap_or(DEFAULT_AGE_YEARS)
}

pub fn gender_from_remote(raw: Option<&str>) -> Gender {
    lookup(GENDERS, raw).unwrap_or(DEFAULT_GENDER)
}

pub fn size_from_remote(raw: Option<&str>) -> Size {
    lookup(SIZES, raw).unwrap_or(DEFAULT_SIZE)
}

/// Unrecognized coats are dropped rather than guessed.
pub fn coat_from_remote(raw: Option<&str>) -> Option<Coat> {
    lookup(COATS, raw)
}

/// Best single URL for a photo: large, then medium, then small.
fn best_photo(set: &PhotoSet) -> Option<String> {
    set.large
        .clone()
        .or_else(|| set.medium.clone())
        .or_else(|| set.small.clone())
}

fn non_empty(s: Option<&String>) -> Option<String> {
    s.map(|v| v.trim()).filter(|v| !v.is_empty()).map(String::from)
}

/// Translate a Petfinder animal into internal fields.
///
/// Only adoptable animals are fetched, so status is always `Available`
/// and housing `InFoster`.
pub fn remote_to_internal(animal: &Animal) -> DogFields {
    DogFields {
        name: animal.name.trim().to_string(),
        breed_primary: non_empty(animal.breeds.primary.as_ref()).unwrap_or_else(|| "Unknown".to_string()),
        breed_secondary: non_empty(animal.breeds.secondary.as_ref()),
        mixed_breed: animal.breeds.mixed,
        color_primary: non_empty(animal.colors.primary.as_ref()),
        color_secondary: non_empty(animal.colors.secondary.as_ref()),
        color_tertiary: non_empty(animal.colors.tertiary.as_ref()),
        age_years: age_years_from_category(animal.age.as_deref()),
        gender: gender_from_remote(animal.gender.as_deref()),
        size: size_from_remote(animal.size.as_deref()),
        coat: coat_from_remote(animal.coat.as_deref()),
        description: non_empty(animal.description.as_ref()),
        photos: animal.photos.iter().filter_map(best_photo).collect(),
        videos: animal
            .videos
            .iter()
            .map(|v| v.embed.clone())
            .filter(|e| !e.is_empty())
            .collect(),
        spayed_neutered: animal.attributes.spayed_neutered,
        house_trained: animal.attributes.house_trained,
        declawed: animal.attributes.declawed,
        special_needs: animal.attributes.special_needs,
        shots_current: animal.attributes.shots_current,
        good_with_kids: animal.environment.children,
        good_with_dogs: animal.environment.dogs,
        good_with_cats: animal.environment.cats,
        tags: animal.tags.clone(),
        contact_email: non_empty(animal.contact.email.as_ref()),
        contact_phone: non_empty(animal.contact.phone.as_ref()),
        status: AdoptionStatus::Available,
        housing: Housing::InFoster,
        published_at: animal.published_at.as_deref().and_then(parse_published),
    }
}

/// Petfinder writes offsets as `+0000`, which strict RFC 3339 rejects.
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

// ── Outbound ─────────────────────────────────────────────────

pub fn age_category(years: f64) -> &'static str {
    if years < 1.0 {
        "Baby"
    } else if years < 3.0 {
        "Young"
    } else if years < 8.0 {
        "Adult"
    } else {
        "Senior"
    }
}

pub fn gender_to_remote(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "Male",
        Gender::Female => "Female",
        Gender::Unknown => "Unknown",
    }
}

pub fn size_to_remote(size: Size) -> &'static str {
    match size {
        Size::Small => "Small",
        Size::Medium => "Medium",
        Size::Large => "Large",
        Size::ExtraLarge => "Extra Large",
    }
}

pub fn coat_to_remote(coat: Coat) -> &'static str {
    match coat {
        Coat::Hairless => "Hairless",
        Coat::Short => "Short",
        Coat::Medium => "Medium",
        Coat::Long => "Long",
        Coat::Wire => "Wire",
        Coat::Curly => "Curly",
    }
}

pub fn status_to_remote(status: AdoptionStatus) -> &'static str {
    match status {
        AdoptionStatus::Available => "adoptable",
        AdoptionStatus::Hold => "hold",
        AdoptionStatus::Pending => "pending",
        AdoptionStatus::Adopted => "adopted",
    }
}

pub fn internal_to_remote(record: &DogRecord) -> Listing {
    let f = &record.fields;
    Listing {
        id: record.id.to_string(),
        name: f.name.clone(),
        breed_primary: f.breed_primary.clone(),
        breed_secondary: f.breed_secondary.clone(),
        mixed: f.mixed_breed,
        age: age_category(f.age_years),
        gender: gender_to_remote(f.gender),
        size: size_to_remote(f.size),
        coat: f.coat.map(coat_to_remote),
        color_primary: f.color_primary.clone(),
        color_secondary: f.color_secondary.clone(),
        description: f.description.clone(),
        spayed_neutered: f.spayed_neutered,
        house_trained: f.house_trained,
        declawed: f.declawed,
        shots_current: f.shots_current,
        special_needs: f.special_needs,
        good_with_children: f.good_with_kids,
        good_with_dogs: f.good_with_dogs,
        good_with_cats: f.good_with_cats,
        email: f.contact_email.clone(),
        phone: f.contact_phone.clone(),
        photos: f.photos.clone(),
        tags: f.tags.clone(),
        status: status_to_remote(f.status),
    }
}
