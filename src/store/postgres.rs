use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{DogFilter, DogStore, StoreError};
use crate::models::dog::{
    AdoptionStatus, Coat, DogFields, DogRecord, Gender, Housing, NewDog, Size, SyncState,
    SyncStatus, SyncTransition,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

const DOG_COLUMNS: &str = "id, name, breed_primary, breed_secondary, mixed_breed, \
    color_primary, color_secondary, color_tertiary, age_years, gender, size, coat, \
    description, photos, videos, spayed_neutered, house_trained, declawed, special_needs, \
    shots_current, good_with_kids, good_with_dogs, good_with_cats, tags, contact_email, \
    contact_phone, status, housing, published_at, sync_status, petfinder_id, last_synced_at, \
    sync_method, sync_errors, created_at, updated_at";

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM dogs WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

fn map_unique_violation(e: sqlx::Error, petfinder_id: Option<&str>) -> StoreError {
    if let (Some(db), Some(remote)) = (e.as_database_error(), petfinder_id) {
        if db.is_unique_violation() {
            return StoreError::DuplicatePetfinderId(remote.to_string());
        }
    }
    StoreError::Database(e)
}

fn status_list(filter: &DogFilter) -> Option<Vec<String>> {
    filter
        .sync_status
        .as_ref()
        .map(|s| s.iter().map(|st| st.as_str().to_string()).collect())
}

#[async_trait]
impl DogStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DogRecord>, StoreError> {
        let row = sqlx::query_as::<_, DogRow>(&format!("SELECT {} FROM dogs WHERE id = $1", DOG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DogRecord::from))
    }

    async fn find_by_petfinder_id(&self, petfinder_id: &str) -> Result<Option<DogRecord>, StoreError> {
        let row = sqlx::query_as::<_, DogRow>(&format!(
            "SELECT {} FROM dogs WHERE petfinder_id = $1",
            DOG_COLUMNS
        ))
        .bind(petfinder_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DogRecord::from))
    }

    async fn create(&self, dog: NewDog) -> Result<DogRecord, StoreError> {
        let f = &dog.fields;
        let s = &dog.sync;
        let row = sqlx::query_as::<_, DogRow>(&format!(
            r#"INSERT INTO dogs (id, name, breed_primary, breed_secondary, mixed_breed,
                   color_primary, color_secondary, color_tertiary, age_years, gender, size, coat,
                   description, photos, videos, spayed_neutered, house_trained, declawed,
                   special_needs, shots_current, good_with_kids, good_with_dogs, good_with_cats,
                   tags, contact_email, contact_phone, status, housing, published_at,
                   sync_status, petfinder_id, last_synced_at, sync_method, sync_errors)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                   $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31,
                   $32, $33, $34)
               RETURNING {}"#,
            DOG_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&f.name)
        .bind(&f.breed_primary)
        .bind(&f.breed_secondary)
        .bind(f.mixed_breed)
        .bind(&f.color_primary)
        .bind(&f.color_secondary)
        .bind(&f.color_tertiary)
        .bind(f.age_years)
        .bind(f.gender)
        .bind(f.size)
        .bind(f.coat)
        .bind(&f.description)
        .bind(&f.photos)
        .bind(&f.videos)
        .bind(f.spayed_neutered)
        .bind(f.house_trained)
        .bind(f.declawed)
        .bind(f.special_needs)
        .bind(f.shots_current)
        .bind(f.good_with_kids)
        .bind(f.good_with_dogs)
        .bind(f.good_with_cats)
        .bind(&f.tags)
        .bind(&f.contact_email)
        .bind(&f.contact_phone)
        .bind(f.status)
        .bind(f.housing)
        .bind(f.published_at)
        .bind(s.status)
        .bind(&s.petfinder_id)
        .bind(s.last_synced_at)
        .bind(&s.method)
        .bind(&s.errors)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, s.petfinder_id.as_deref()))?;

        Ok(row.into())
    }

    async fn update(&self, id: Uuid, fields: DogFields) -> Result<DogRecord, StoreError> {
        let f = &fields;
        let row = sqlx::query_as::<_, DogRow>(&format!(
            r#"UPDATE dogs SET name = $2, breed_primary = $3, breed_secondary = $4,
                   mixed_breed = $5, color_primary = $6, color_secondary = $7,
                   color_tertiary = $8, age_years = $9, gender = $10, size = $11, coat = $12,
                   description = $13, photos = $14, videos = $15, spayed_neutered = $16,
                   house_trained = $17, declawed = $18, special_needs = $19,
                   shots_current = $20, good_with_kids = $21, good_with_dogs = $22,
                   good_with_cats = $23, tags = $24, contact_email = $25, contact_phone = $26,
                   status = $27, housing = $28, published_at = $29, updated_at = NOW()
               WHERE id = $1
               RETURNING {}"#,
            DOG_COLUMNS
        ))
        .bind(id)
        .bind(&f.name)
        .bind(&f.breed_primary)
        .bind(&f.breed_secondary)
        .bind(f.mixed_breed)
        .bind(&f.color_primary)
        .bind(&f.color_secondary)
        .bind(&f.color_tertiary)
        .bind(f.age_years)
        .bind(f.gender)
        .bind(f.size)
        .bind(f.coat)
        .bind(&f.description)
        .bind(&f.photos)
        .bind(&f.videos)
        .bind(f.spayed_neutered)
        .bind(f.house_trained)
        .bind(f.declawed)
        .bind(f.special_needs)
        .bind(f.shots_current)
        .bind(f.good_with_kids)
        .bind(f.good_with_dogs)
        .bind(f.good_with_cats)
        .bind(&f.tags)
        .bind(&f.contact_email)
        .bind(&f.contact_phone)
        .bind(f.status)
        .bind(f.housing)
        .bind(f.published_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DogRecord::from).ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, filter: &DogFilter) -> Result<Vec<DogRecord>, StoreError> {
        let rows = sqlx::query_as::<_, DogRow>(&format!(
            r#"SELECT {} FROM dogs
               WHERE ($1::text[] IS NULL OR sync_status = ANY($1))
                 AND ($2::bool IS NULL OR (petfinder_id IS NOT NULL) = $2)
               ORDER BY created_at ASC"#,
            DOG_COLUMNS
        ))
        .bind(status_list(filter))
        .bind(filter.has_petfinder_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DogRecord::from).collect())
    }

    async fn count(&self, filter: &DogFilter) -> Result<i64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM dogs
               WHERE ($1::text[] IS NULL OR sync_status = ANY($1))
                 AND ($2::bool IS NULL OR (petfinder_id IS NOT NULL) = $2)"#,
        )
        .bind(status_list(filter))
        .bind(filter.has_petfinder_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    async fn apply_sync(&self, id: Uuid, transition: &SyncTransition) -> Result<bool, StoreError> {
        let allowed: Vec<String> = transition
            .allowed_from()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let result = match transition {
            SyncTransition::Syncing => {
                sqlx::query(
                    r#"UPDATE dogs SET sync_status = 'SYNCING', updated_at = NOW()
                       WHERE id = $1 AND sync_status = ANY($2)"#,
                )
                .bind(id)
                .bind(&allowed)
                .execute(&self.pool)
                .await?
            }
            SyncTransition::Synced {
                petfinder_id,
                method,
                at,
            } => {
                sqlx::query(
                    r#"UPDATE dogs SET sync_status = 'SYNCED',
                           petfinder_id = COALESCE($3, petfinder_id),
                           sync_method = $4, last_synced_at = $5, updated_at = NOW()
                       WHERE id = $1 AND sync_status = ANY($2)"#,
                )
                .bind(id)
                .bind(&allowed)
                .bind(petfinder_id)
                .bind(method)
                .bind(at)
                .execute(&self.pool)
                .await
                .map_err(|e| map_unique_violation(e, petfinder_id.as_deref()))?
            }
            SyncTransition::Failed { message } => {
                sqlx::query(
                    r#"UPDATE dogs SET sync_status = 'ERROR',
                           sync_errors = array_append(sync_errors, $3), updated_at = NOW()
                       WHERE id = $1 AND sync_status = ANY($2)"#,
                )
                .bind(id)
                .bind(&allowed)
                .bind(message)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        if !self.exists(id).await? {
            return Err(StoreError::NotFound(id));
        }
        Ok(false)
    }
}

// -- Row Types --

#[derive(Debug, sqlx::FromRow)]
pub struct DogRow {
    pub id: Uuid,
    pub name: String,
    pub breed_primary: String,
    pub breed_secondary: Option<String>,
    pub mixed_breed: bool,
    pub color_primary: Option<String>,
    pub color_secondary: Option<String>,
    pub color_tertiary: Option<String>,
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
    pub sync_status: SyncStatus,
    pub petfinder_id: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_method: Option<String>,
    pub sync_errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DogRow> for DogRecord {
    fn from(r: DogRow) -> Self {
        DogRecord {
            id: r.id,
            fields: DogFields {
                name: r.name,
                breed_primary: r.breed_primary,
                breed_secondary: r.breed_secondary,
                mixed_breed: r.mixed_breed,
                color_primary: r.color_primary,
                color_secondary: r.color_secondary,
                color_tertiary: r.color_tertiary,
                age_years: r.age_years,
                gender: r.gender,
                size: r.size,
                coat: r.coat,
                description: r.description,
                photos: r.photos,
                videos: r.videos,
                spayed_neutered: r.spayed_neutered,
                house_trained: r.house_trained,
                declawed: r.declawed,
                special_needs: r.special_needs,
                shots_current: r.shots_current,
                good_with_kids: r.good_with_kids,
                good_with_dogs: r.good_with_dogs,
                good_with_cats: r.good_with_cats,
                tags: r.tags,
                contact_email: r.contact_email,
                contact_phone: r.contact_phone,
                status: r.status,
                housing: r.housing,
                published_at: r.published_at,
            },
            sync: SyncState {
                status: r.sync_status,
                petfinder_id: r.petfinder_id,
                last_synced_at: r.last_synced_at,
                method: r.sync_method,
                errors: r.sync_errors,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
