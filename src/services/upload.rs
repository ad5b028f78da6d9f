use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use validator::Validate;

use crate::domain::{ObjectKey, UploadAuthorization, UploadRequest};
use crate::dto::UploadAuthorizationDto;
use crate::forms::main::UploadRequestForm;
use crate::models::config::{ServerConfig, StorageConfig, UploadConfig};
use crate::services::{ServiceError, ServiceResult};
use crate::signing::{self, CredentialsProvider, PostPolicy};

/// Longest lifetime storage accepts for a SigV4 signature (seven days).
const MAX_EXPIRES_IN_SECS: u64 = 604_800;

/// Issues short-lived upload authorizations. Holds no per-request state.
#[derive(Clone)]
pub struct UploadService {
    storage: StorageConfig,
    upload: UploadConfig,
    credentials: Option<Arc<dyn CredentialsProvider>>,
}

impl UploadService {
    pub fn new(
        storage: StorageConfig,
        upload: UploadConfig,
        credentials: Option<Arc<dyn CredentialsProvider>>,
    ) -> Self {
        Self {
            storage,
            upload,
            credentials,
        }
    }

    pub fn from_config(config: &ServerConfig, client: reqwest::Client) -> Self {
        let credentials = signing::credentials_from_config(&config.storage, client);
        if credentials.is_none() {
            log::warn!("No credential source configured; upload authorizations will fail");
        }
        Self::new(config.storage.clone(), config.upload.clone(), credentials)
    }

    /// Configured lifetime, kept between one second and the SigV4 maximum.
    fn lifetime(&self) -> Duration {
        Duration::seconds(self.upload.expires_in_secs.clamp(1, MAX_EXPIRES_IN_SECS) as i64)
    }

    /// Authorize a direct upload of `form.filename` with `form.content_type`.
    pub async fn authorize(
        &self,
        form: &UploadRequestForm,
    ) -> ServiceResult<UploadAuthorizationDto> {
        self.authorize_at(form, Utc::now()).await
    }

    /// Same as [`UploadService::authorize`] with an explicit issuance instant.
    pub async fn authorize_at(
        &self,
        form: &UploadRequestForm,
        now: DateTime<Utc>,
    ) -> ServiceResult<UploadAuthorizationDto> {
        form.validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        let request =
            UploadRequest::try_from(form).map_err(|e| ServiceError::Validation(e.to_string()))?;

        let bucket = self
            .storage
            .bucket()
            .ok_or(ServiceError::Configuration("bucket name is not configured"))?;
        let provider = self
            .credentials
            .as_ref()
            .ok_or(ServiceError::Configuration("no credential source configured"))?;

        let lifetime = self.lifetime();
        let credentials = provider
            .credentials(lifetime)
            .await
            .map_err(ServiceError::Upstream)?;

        let key = ObjectKey::derive(request.filename(), now, self.upload.key_strategy);
        let content_type = request.content_type().as_str();
        let fields = PostPolicy::new(now + lifetime)
            .content_length_range(0, self.upload.max_object_size)
            .starts_with("Content-Type", content_type)
            .field("Content-Type", content_type)
            .field("bucket", bucket)
            .field("key", key.as_str())
            .sign(&credentials, &self.storage.region, now)?;

        log::info!("Issued upload authorization for {key} in {bucket}");

        Ok(UploadAuthorization {
            url: signing::bucket_url(&self.storage, bucket),
            fields,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::domain::KeyStrategy;
    use crate::signing::{Credentials, CredentialsError, StaticCredentials};

    struct UnreachableProvider;

    #[async_trait]
    impl CredentialsProvider for UnreachableProvider {
        async fn credentials(&self, _valid_for: Duration) -> Result<Credentials, CredentialsError> {
            Err(CredentialsError::Status(503))
        }
    }

    fn storage(bucket: Option<&str>) -> StorageConfig {
        StorageConfig {
            bucket: bucket.map(str::to_string),
            ..StorageConfig::default()
        }
    }

    fn static_provider() -> Option<Arc<dyn CredentialsProvider>> {
        Some(Arc::new(StaticCredentials::new(Credentials::new(
            "AKIDEXAMPLE",
            "secret",
        ))))
    }

    fn build_service(bucket: Option<&str>, key_strategy: KeyStrategy) -> UploadService {
        let upload = UploadConfig {
            key_strategy,
            ..UploadConfig::default()
        };
        UploadService::new(storage(bucket), upload, static_provider())
    }

    fn instant() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_760_788_800_042).unwrap()
    }

    #[tokio::test]
    async fn authorize_returns_url_and_signed_fields() {
        let service = build_service(Some("videos"), KeyStrategy::Timestamp);
        let form = UploadRequestForm::new("clip.mov", "video/quicktime");

        let authorization = service.authorize_at(&form, instant()).await.unwrap();

        assert_eq!(authorization.url, "https://videos.s3.us-east-1.amazonaws.com/");
        assert_eq!(authorization.fields["key"], "clip.mov1760788800042");
        assert_eq!(authorization.fields["bucket"], "videos");
        assert_eq!(authorization.fields["Content-Type"], "video/quicktime");
        for name in ["Policy", "X-Amz-Signature", "X-Amz-Credential", "X-Amz-Date"] {
            assert!(authorization.fields.contains_key(name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn timestamp_keys_collide_within_one_millisecond() {
        let service = build_service(Some("videos"), KeyStrategy::Timestamp);
        let form = UploadRequestForm::new("clip.mov", "video/quicktime");

        let first = service.authorize_at(&form, instant()).await.unwrap();
        let second = service.authorize_at(&form, instant()).await.unwrap();

        assert_eq!(first.fields["key"], second.fields["key"]);
    }

    #[tokio::test]
    async fn unique_keys_differ_within_one_millisecond() {
        let service = build_service(Some("videos"), KeyStrategy::Unique);
        let form = UploadRequestForm::new("clip.mov", "video/quicktime");

        let first = service.authorize_at(&form, instant()).await.unwrap();
        let second = service.authorize_at(&form, instant()).await.unwrap();

        assert!(first.fields["key"].starts_with("clip.mov1760788800042-"));
        assert_ne!(first.fields["key"], second.fields["key"]);
    }

    #[tokio::test]
    async fn missing_bucket_is_a_configuration_error() {
        let service = build_service(None, KeyStrategy::Unique);
        let form = UploadRequestForm::new("clip.mov", "video/quicktime");

        let err = service.authorize(&form).await.unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[tokio::test]
    async fn missing_credentials_are_a_configuration_error() {
        let service = UploadService::new(storage(Some("videos")), UploadConfig::default(), None);
        let form = UploadRequestForm::new("clip.mov", "video/quicktime");

        let err = service.authorize(&form).await.unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[tokio::test]
    async fn credential_failure_is_an_upstream_error() {
        let service = UploadService::new(
            storage(Some("videos")),
            UploadConfig::default(),
            Some(Arc::new(UnreachableProvider)),
        );
        let form = UploadRequestForm::new("clip.mov", "video/quicktime");

        let err = service.authorize(&form).await.unwrap_err();
        assert!(matches!(err, ServiceError::Upstream(CredentialsError::Status(503))));
    }

    #[tokio::test]
    async fn empty_fields_fail_before_any_signing() {
        let service = UploadService::new(
            storage(Some("videos")),
            UploadConfig::default(),
            Some(Arc::new(UnreachableProvider)),
        );

        let err = service
            .authorize(&UploadRequestForm::new("", "video/mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .authorize(&UploadRequestForm::new("clip.mp4", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn lifetime_stays_within_signable_bounds() {
        let service = |expires_in_secs| {
            let upload = UploadConfig {
                expires_in_secs,
                ..UploadConfig::default()
            };
            UploadService::new(storage(Some("videos")), upload, static_provider())
        };

        assert_eq!(service(0).lifetime(), Duration::seconds(1));
        assert_eq!(service(600).lifetime(), Duration::seconds(600));
        assert_eq!(
            service(u64::MAX).lifetime(),
            Duration::seconds(MAX_EXPIRES_IN_SECS as i64)
        );
    }
}
