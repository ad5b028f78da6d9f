use async_trait::async_trait;
use reqwest::Client;

use crate::client::ClientError;
use crate::domain::UploadAuthorization;
use crate::dto::UploadAuthorizationDto;
use crate::forms::main::UploadRequestForm;

/// Something that hands out upload authorizations.
#[async_trait]
pub trait AuthorizationSource: Send + Sync {
    async fn authorize(
        &self,
        request: &UploadRequestForm,
    ) -> Result<UploadAuthorization, ClientError>;
}

/// Calls `POST {base}/api/upload` on the authorization service.
#[derive(Clone, Debug)]
pub struct HttpAuthorizationClient {
    client: Client,
    endpoint: String,
}

impl HttpAuthorizationClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/upload", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AuthorizationSource for HttpAuthorizationClient {
    async fn authorize(
        &self,
        request: &UploadRequestForm,
    ) -> Result<UploadAuthorization, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::AuthorizationFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::AuthorizationFetch(format!(
                "service responded with status {}",
                status.as_u16()
            )));
        }

        let dto: UploadAuthorizationDto = response
            .json()
            .await
            .map_err(|e| ClientError::AuthorizationFetch(e.to_string()))?;
        Ok(dto.into())
    }
}
