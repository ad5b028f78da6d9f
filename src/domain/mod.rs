//! Strongly-typed domain structures for upload authorization.
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Longest file name or content type accepted from a client.
pub const MAX_FIELD_LEN: usize = 255;

/// Sanitized file name (single path component).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FileName(String);

impl FileName {
    pub fn try_new(value: String) -> Result<Self, TypeConstraintError> {
        if value.is_empty() || value.len() > MAX_FIELD_LEN {
            return Err(TypeConstraintError::InvalidFileName);
        }
        let mut components = Path::new(&value).components();
        let single_component = match (components.next(), components.next()) {
            (Some(Component::Normal(component)), None) => component.len() == value.len(),
            _ => false,
        };
        if !single_component {
            return Err(TypeConstraintError::InvalidFileName);
        }
        Ok(Self(value))
    }

    pub fn try_from_str(value: &str) -> Result<Self, TypeConstraintError> {
        Self::try_new(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Declared MIME type of an upload, e.g. `video/quicktime`.
///
/// Storage matches the uploaded `Content-Type` against this value as a
/// prefix, so it is kept verbatim rather than normalized.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ContentType(String);

impl ContentType {
    pub fn try_new(value: String) -> Result<Self, TypeConstraintError> {
        if value.is_empty()
            || value.len() > MAX_FIELD_LEN
            || value.trim().is_empty()
            || value.chars().any(char::is_control)
        {
            return Err(TypeConstraintError::InvalidContentType);
        }
        Ok(Self(value))
    }

    pub fn try_from_str(value: &str) -> Result<Self, TypeConstraintError> {
        Self::try_new(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A validated request for an upload authorization.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadRequest {
    filename: FileName,
    content_type: ContentType,
}

impl UploadRequest {
    pub fn new(filename: FileName, content_type: ContentType) -> Self {
        Self {
            filename,
            content_type,
        }
    }

    pub fn filename(&self) -> &FileName {
        &self.filename
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }
}

/// How object keys are derived from the client's file name.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// `filename + unix millis`. Two requests for the same name within one
    /// millisecond produce the same key.
    Timestamp,
    /// `filename + unix millis + "-" + random token`.
    #[default]
    Unique,
}

/// Destination key of an object inside the bucket.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn derive(filename: &FileName, issued_at: DateTime<Utc>, strategy: KeyStrategy) -> Self {
        let millis = issued_at.timestamp_millis();
        match strategy {
            KeyStrategy::Timestamp => Self(format!("{filename}{millis}")),
            KeyStrategy::Unique => Self(format!("{filename}{millis}-{}", Uuid::new_v4().simple())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Target URL plus the form fields a direct upload must carry verbatim.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct UploadAuthorization {
    pub url: String,
    pub fields: BTreeMap<String, String>,
}


#[derive(Debug, Error)]
pub enum TypeConstraintError {
    #[error("invalid file name")]
    InvalidFileName,
    #[error("invalid content type")]
    InvalidContentType,
}
