//! Direct client-to-storage transfer.
use bytes::Bytes;
use futures::channel::mpsc;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};

use crate::client::file::VideoFile;
use crate::domain::UploadAuthorization;

/// Name of the multipart field carrying the video bytes.
pub const FILE_FIELD: &str = "file";
/// Storage answers a successful POST upload with `204 No Content`.
pub const SUCCESS_STATUS: u16 = 204;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// One authorized upload of one file.
#[derive(Clone, Debug)]
pub struct DirectUpload {
    pub authorization: UploadAuthorization,
    pub file: VideoFile,
}

impl DirectUpload {
    pub fn new(authorization: UploadAuthorization, file: VideoFile) -> Self {
        Self {
            authorization,
            file,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransferEvent {
    Progress { sent: u64, total: u64 },
    /// The storage backend answered; any status but 204 is a failure.
    Completed { status: u16 },
    /// The request never produced a response.
    Failed(String),
}

impl TransferEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferEvent::Progress { .. })
    }
}

/// Performs direct uploads.
///
/// The returned stream yields progress in non-decreasing order and ends
/// right after exactly one terminal event.
pub trait Transport {
    fn send(&self, upload: DirectUpload) -> BoxStream<'static, TransferEvent>;
}

/// Multipart POST over HTTP.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Granularity of progress reporting.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

fn split(bytes: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    (0..bytes.len())
        .step_by(chunk_size)
        .map(|start| bytes.slice(start..(start + chunk_size).min(bytes.len())))
        .collect()
}

fn build_form(
    upload: DirectUpload,
    chunk_size: usize,
    progress: mpsc::UnboundedSender<TransferEvent>,
) -> Result<Form, reqwest::Error> {
    let DirectUpload {
        authorization,
        file,
    } = upload;
    let total = file.len();

    let mut sent = 0u64;
    let body = stream::iter(split(file.bytes(), chunk_size)).map(move |chunk| {
        sent += chunk.len() as u64;
        let _ = progress.unbounded_send(TransferEvent::Progress { sent, total });
        Ok::<Bytes, std::io::Error>(chunk)
    });

    let part = Part::stream_with_length(Body::wrap_stream(body), total)
        .file_name(file.name().to_string())
        .mime_str(file.content_type())?;

    // Storage ignores every field that follows the file.
    let form = authorization
        .fields
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value));
    Ok(form.part(FILE_FIELD, part))
}

impl Transport for HttpTransport {
    fn send(&self, upload: DirectUpload) -> BoxStream<'static, TransferEvent> {
        let (tx, rx) = mpsc::unbounded();
        let client = self.client.clone();
        let chunk_size = self.chunk_size;

        let request = async move {
            let url = upload.authorization.url.clone();
            let terminal = match build_form(upload, chunk_size, tx.clone()) {
                Ok(form) => match client.post(&url).multipart(form).send().await {
                    Ok(response) => TransferEvent::Completed {
                        status: response.status().as_u16(),
                    },
                    Err(err) => TransferEvent::Failed(err.to_string()),
                },
                Err(err) => TransferEvent::Failed(err.to_string()),
            };
            let _ = tx.unbounded_send(terminal);
        };

        let driver = stream::once(request).filter_map(|()| future::ready(None::<TransferEvent>));
        let events = stream::select(rx, driver).boxed();

        // Stop without polling again once the terminal event went out.
        stream::unfold((events, false), |(mut events, finished)| async move {
            if finished {
                return None;
            }
            let event = events.next().await?;
            let finished = event.is_terminal();
            Some((event, (events, finished)))
        })
        .boxed()
    }
}
