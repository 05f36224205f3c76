//! CSV feed for file-transfer uploads.
//!
//! Every field is double-quoted with embedded quotes doubled, so the
//! output never depends on whether a value happens to contain a comma.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::dog::DogRecord;
use crate::models::petfinder::Listing;
use crate::sync::translate::internal_to_remote;

pub const COLUMNS: [&str; 24] = [
    "id",
    "name",
    "breed1",
    "breed2",
    "mixed",
    "age",
    "gender",
    "size",
    "color1",
    "color2",
    "description",
    "altered",
    "houseTrained",
    "shots",
    "specialNeeds",
    "goodWithKids",
    "goodWithDogs",
    "goodWithCats",
    "email",
    "phone",
    "photos",
    "tags",
    "status",
    "dateAdded",
];

pub fn escape(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "Yes"
    } else {
        "No"
    }
}

fn tri_state(v: Option<bool>) -> &'static str {
    v.map(yes_no).unwrap_or("")
}

fn opt(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("")
}

fn write_row(out: &mut String, fields: &[&str]) {
    let line: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn listing_row(listing: &Listing, date_added: &str) -> Vec<String> {
    vec![
        listing.id.clone(),
        listing.name.clone(),
        listing.breed_primary.clone(),
        opt(&listing.breed_secondary).to_string(),
        yes_no(listing.mixed).to_string(),
        listing.age.to_string(),
        listing.gender.to_string(),
        listing.size.to_string(),
        opt(&listing.color_primary).to_string(),
        opt(&listing.color_secondary).to_string(),
        opt(&listing.description).to_string(),
        yes_no(listing.spayed_neutered).to_string(),
        yes_no(listing.house_trained).to_string(),
        yes_no(listing.shots_current).to_string(),
        yes_no(listing.special_needs).to_string(),
        tri_state(listing.good_with_children).to_string(),
        tri_state(listing.good_with_dogs).to_string(),
        tri_state(listing.good_with_cats).to_string(),
        opt(&listing.email).to_string(),
        opt(&listing.phone).to_string(),
        listing.photos.join("|"),
        listing.tags.join(","),
        listing.status.to_string(),
        date_added.to_string(),
    ]
}

/// Render records as one CSV document under a single header row.
pub fn render(records: &[DogRecord], now: DateTime<Utc>) -> String {
    let date_added = now.format("%Y-%m-%d").to_string();
    let mut out = String::new();
    write_row(&mut out, &COLUMNS);
    for record in records {
        let row = listing_row(&internal_to_remote(record), &date_added);
        let refs: Vec<&str> = row.iter().map(String::as_str).collect();
        write_row(&mut out, &refs);
    }
    out
}

/// `<prefix>[_<id>]_<timestamp>.csv` where the timestamp is ISO 8601 with
/// `:` and `.` replaced by `-`.
pub fn file_name(prefix: &str, id: Option<&str>, now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    match id {
        Some(id) => format!("{}_{}_{}.csv", prefix, id, stamp),
        None => format!("{}_{}.csv", prefix, stamp),
    }
}
