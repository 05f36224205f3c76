use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Import ───────────────────────────────────────────────────

/// Outcome of one import invocation (or one page of it).
///
/// Partial success is the normal case: errors are collected as text and
/// returned alongside the counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ImportResult {
    /// Fold another page's outcome into this running total.
    pub fn merge(mut self, other: ImportResult) -> Self {
        self.imported += other.imported;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }
}

// ── Upload ───────────────────────────────────────────────────

/// A delivery channel to Petfinder, listed in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMethod {
    /// CSV feed dropped on Petfinder's FTP import server.
    Ftp,
    /// CSV feed written to an object store (S3, MinIO, local filesystem).
    ObjectStore,
    /// Direct submission to the listing API.
    Api,
}

impl UploadMethod {
    pub const PRIORITY: [UploadMethod; 3] =
        [UploadMethod::Ftp, UploadMethod::ObjectStore, UploadMethod::Api];

    pub fn as_str(self) -> &'static str {
        match self {
            UploadMethod::Ftp => "ftp",
            UploadMethod::ObjectStore => "object_store",
            UploadMethod::Api => "api",
        }
    }

    /// Whether this channel delivers a CSV file rather than an API call.
    pub fn is_file_transfer(self) -> bool {
        match self {
            UploadMethod::Ftp | UploadMethod::ObjectStore => true,
            UploadMethod::Api => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UploadMethod::Ftp => "FTP",
            UploadMethod::ObjectStore => "Object store",
            UploadMethod::Api => "Petfinder API",
        }
    }
}

impl fmt::Display for UploadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller's choice of channel: a fixed method, or probe and pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodPreference {
    #[default]
    Auto,
    Method(UploadMethod),
}

impl FromStr for MethodPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" | "" => Ok(MethodPreference::Auto),
            "ftp" => Ok(MethodPreference::Method(UploadMethod::Ftp)),
            "object_store" | "s3" => Ok(MethodPreference::Method(UploadMethod::ObjectStore)),
            "api" => Ok(MethodPreference::Method(UploadMethod::Api)),
            other => Err(format!("unknown upload method '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for MethodPreference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success: bool,
    /// `None` when no method could be selected.
    pub method: Option<UploadMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub petfinder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_upload_url: Option<String>,
}

impl UploadResult {
    pub fn succeeded(method: UploadMethod, message: impl Into<String>) -> Self {
        Self {
            success: true,
            method: Some(method),
            petfinder_id: None,
            error: None,
            message: message.into(),
            manual_upload_url: None,
        }
    }

    pub fn failed(
        method: Option<UploadMethod>,
        error: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            method,
            petfinder_id: None,
            error: Some(error.into()),
            message: message.into(),
            manual_upload_url: None,
        }
    }

    pub fn with_petfinder_id(mut self, id: Option<String>) -> Self {
        self.petfinder_id = id;
        self
    }

    pub fn with_manual_upload_url(mut self, url: impl Into<String>) -> Self {
        self.manual_upload_url = Some(url.into());
        self
    }
}

/// Per-method probe outcome from `test_connection`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionCheck {
    pub method: UploadMethod,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub checks: Vec<ConnectionCheck>,
    /// First method that probed successfully, in priority order.
    pub preferred: Option<UploadMethod>,
}
