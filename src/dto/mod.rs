use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::UploadAuthorization;

/// Response body of a successful authorization request.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct UploadAuthorizationDto {
    pub url: String,
    pub fields: BTreeMap<String, String>,
}

impl From<UploadAuthorization> for UploadAuthorizationDto {
    fn from(authorization: UploadAuthorization) -> Self {
        Self {
            url: authorization.url,
            fields: authorization.fields,
        }
    }
}

impl From<UploadAuthorizationDto> for UploadAuthorization {
    fn from(dto: UploadAuthorizationDto) -> Self {
        Self {
            url: dto.url,
            fields: dto.fields,
        }
    }
}

/// Body of every non-2xx API response.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ErrorDto {
    pub error: String,
}

impl ErrorDto {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
