use std::time::Duration;

use crate::petfinder::Credentials;
use crate::transport::FtpConfig;

pub const DEFAULT_API_URL: &str = "https://api.petfinder.com/v2";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string. Unset → dogs are kept in memory.
    pub database_url: Option<String>,
    pub petfinder: Option<Credentials>,
    pub api_url: String,
    /// Default organization for imports when none is given.
    pub organization_id: Option<String>,
    pub manual_upload_url: String,
    pub ftp: Option<FtpConfig>,
    /// `file://` or `s3://` target for CSV feeds.
    pub object_store_url: Option<String>,
    /// File name prefix for CSV feeds.
    pub upload_prefix: String,
    pub request_timeout: Duration,
    pub page_delay: Duration,
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    Ok(from_env())
}

/// Read configuration from the process environment without touching `.env`.
pub fn from_env() -> Config {
    let petfinder = match (var("PETFINDER_CLIENT_ID"), var("PETFINDER_CLIENT_SECRET")) {
        (Some(client_id), Some(client_secret)) => Some(Credentials {
            client_id,
            client_secret,
        }),
        (Some(_), None) | (None, Some(_)) => {
            tracing::warn!("Only one of PETFINDER_CLIENT_ID / PETFINDER_CLIENT_SECRET is set; Petfinder API disabled");
            None
        }
        (None, None) => None,
    };

    let ftp = var("PETSYNC_FTP_HOST").map(|host| FtpConfig {
        host,
        port: parsed("PETSYNC_FTP_PORT", 21),
        user: var("PETSYNC_FTP_USER").unwrap_or_else(|| "anonymous".into()),
        password: var("PETSYNC_FTP_PASSWORD").unwrap_or_default(),
        directory: var("PETSYNC_FTP_DIR"),
    });

    Config {
        port: parsed("PETSYNC_PORT", 8080),
        database_url: var("DATABASE_URL"),
        petfinder,
        api_url: var("PETFINDER_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
        organization_id: var("PETFINDER_ORGANIZATION_ID"),
        manual_upload_url: var("PETFINDER_MANUAL_UPLOAD_URL")
            .unwrap_or_else(|| crate::sync::upload::DEFAULT_MANUAL_UPLOAD_URL.into()),
        ftp,
        object_store_url: var("PETSYNC_OBJECT_STORE_URL"),
        upload_prefix: var("PETSYNC_UPLOAD_PREFIX").unwrap_or_else(|| "dogs".into()),
        request_timeout: Duration::from_secs(parsed("PETSYNC_REQUEST_TIMEOUT_SECS", 30)),
        page_delay: Duration::from_millis(parsed("PETSYNC_PAGE_DELAY_MS", 1000)),
    }
}
