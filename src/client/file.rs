use std::path::Path;

use bytes::Bytes;

use crate::forms::main::UploadRequestForm;

/// A video held in memory, ready to be uploaded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VideoFile {
    name: String,
    content_type: String,
    bytes: Bytes,
}

impl VideoFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::new(name, content_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// A file without a name or without content is never uploaded.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.bytes.is_empty()
    }

    pub fn to_request(&self) -> UploadRequestForm {
        UploadRequestForm::new(self.name.clone(), self.content_type.clone())
    }
}
