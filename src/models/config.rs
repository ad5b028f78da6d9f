//! Configuration model loaded from external sources.

use serde::de;
use serde::{Deserialize, Deserializer};

use crate::domain::KeyStrategy;

/// Largest object a direct upload may create (100 MiB).
pub const DEFAULT_MAX_OBJECT_SIZE: u64 = 104_857_600;
/// Lifetime of an issued authorization.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 600;

#[derive(Clone, Debug, Deserialize)]
/// Top-level configuration of the authorization service.
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Destination bucket and the credential source used to sign for it.
#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    /// Absence is reported per request, not at startup.
    pub bucket: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    /// S3-compatible endpoint; switches URLs to path style.
    pub endpoint: Option<String>,
    pub identity_pool_id: Option<String>,
    /// Overrides the regional identity endpoint.
    pub identity_endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl StorageConfig {
    /// Configured bucket name, treating a blank value as missing.
    pub fn bucket(&self) -> Option<&str> {
        self.bucket
            .as_deref()
            .map(str::trim)
            .filter(|bucket| !bucket.is_empty())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: default_region(),
            endpoint: None,
            identity_pool_id: None,
            identity_endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Conditions embedded into every issued authorization.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
    /// At least one second.
    #[serde(
        default = "default_expires_in_secs",
        deserialize_with = "deserialize_expires_in_secs"
    )]
    pub expires_in_secs: u64,
    #[serde(default)]
    pub key_strategy: KeyStrategy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            expires_in_secs: DEFAULT_EXPIRES_IN_SECS,
            key_strategy: KeyStrategy::default(),
        }
    }
}

fn default_max_object_size() -> u64 {
    DEFAULT_MAX_OBJECT_SIZE
}

fn default_expires_in_secs() -> u64 {
    DEFAULT_EXPIRES_IN_SECS
}

fn deserialize_expires_in_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    if secs == 0 {
        return Err(de::Error::custom(
            "upload.expires_in_secs must be at least 1",
        ));
    }
    Ok(secs)
}
