use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{ContentType, FileName, TypeConstraintError, UploadRequest};

/// JSON body of `POST /api/upload`.
///
/// Missing keys deserialize to empty strings so they are reported by
/// validation instead of by the extractor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadRequestForm {
    #[validate(length(
        min = 1,
        max = 255,
        message = "filename must be between 1 and 255 characters"
    ))]
    pub filename: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "contentType must be between 1 and 255 characters"
    ))]
    pub content_type: String,
}

impl UploadRequestForm {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }
}

impl TryFrom<&UploadRequestForm> for UploadRequest {
    type Error = TypeConstraintError;

    fn try_from(form: &UploadRequestForm) -> Result<Self, Self::Error> {
        Ok(UploadRequest::new(
            FileName::try_from_str(&form.filename)?,
            ContentType::try_from_str(&form.content_type)?,
        ))
    }
}
