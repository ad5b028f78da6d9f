//! Credentials and request signing for direct-to-storage uploads.
use std::sync::Arc;

use crate::models::config::StorageConfig;

pub mod credentials;
pub mod policy;
pub mod sigv4;

pub use credentials::{
    Credentials, CredentialsError, CredentialsProvider, IdentityPoolCredentials, StaticCredentials,
};
pub use policy::PostPolicy;

/// Errors raised while computing a signature.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("invalid signing key")]
    InvalidKey(#[from] hmac::digest::InvalidLength),
}

/// Picks the credential source described by the storage configuration.
///
/// An identity pool takes precedence over static keys. Returns `None` when
/// neither is configured.
pub fn credentials_from_config(
    storage: &StorageConfig,
    client: reqwest::Client,
) -> Option<Arc<dyn CredentialsProvider>> {
    if let Some(pool_id) = storage.identity_pool_id.as_deref().filter(|id| !id.is_empty()) {
        let provider = match storage.identity_endpoint.as_deref() {
            Some(endpoint) => IdentityPoolCredentials::with_endpoint(client, endpoint, pool_id),
            None => IdentityPoolCredentials::new(client, &storage.region, pool_id),
        };
        return Some(Arc::new(provider));
    }

    match (&storage.access_key_id, &storage.secret_access_key) {
        (Some(key), Some(secret)) => {
            let mut credentials = Credentials::new(key.clone(), secret.clone());
            if let Some(token) = storage.session_token.as_deref().filter(|t| !t.is_empty()) {
                credentials = credentials.with_session_token(token);
            }
            Some(Arc::new(StaticCredentials::new(credentials)))
        }
        _ => None,
    }
}

/// URL a direct upload is posted to.
///
/// Virtual-hosted style on AWS, path style on a custom endpoint.
pub fn bucket_url(storage: &StorageConfig, bucket: &str) -> String {
    match storage.endpoint.as_deref() {
        Some(endpoint) => format!("{}/{bucket}", endpoint.trim_end_matches('/')),
        None => format!("https://{bucket}.s3.{}.amazonaws.com/", storage.region),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_url_uses_virtual_host_on_aws() {
        let storage = StorageConfig {
            region: "eu-central-1".to_string(),
            ..StorageConfig::default()
        };
        assert_eq!(
            bucket_url(&storage, "videos"),
            "https://videos.s3.eu-central-1.amazonaws.com/"
        );
    }

    #[test]
    fn bucket_url_uses_path_style_on_custom_endpoint() {
        let storage = StorageConfig {
            endpoint: Some("http://localhost:9000/".to_string()),
            ..StorageConfig::default()
        };
        assert_eq!(bucket_url(&storage, "videos"), "http://localhost:9000/videos");
    }

    #[test]
    fn no_credential_source_without_keys_or_pool() {
        let storage = StorageConfig {
            access_key_id: Some("AKID".to_string()),
            ..StorageConfig::default()
        };
        assert!(credentials_from_config(&storage, reqwest::Client::new()).is_none());
    }

    #[test]
    fn static_keys_build_a_provider() {
        let storage = StorageConfig {
            access_key_id: Some("AKID".to_string()),
            secret_access_key: Some("secret".to_string()),
            ..StorageConfig::default()
        };
        assert!(credentials_from_config(&storage, reqwest::Client::new()).is_some());
    }
}
