//! Camera capture on top of a host-provided media device.
use bytes::{Bytes, BytesMut};

use crate::client::file::VideoFile;

pub const RECORDED_FILE_NAME: &str = "recorded-video.webm";
pub const RECORDED_CONTENT_TYPE: &str = "video/webm";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("{0}")]
    Unavailable(String),
}

/// A single hardware track (camera, microphone).
pub trait MediaTrack {
    /// Release the underlying hardware.
    fn stop(&mut self);
}

/// A live stream, attachable to a preview.
pub trait MediaStream {
    fn tracks(&mut self) -> Vec<&mut dyn MediaTrack>;
}

pub trait CaptureDevice {
    type Stream: MediaStream;

    /// Request a live video stream; fails when access is denied.
    fn open(&mut self) -> Result<Self::Stream, CaptureError>;
}

/// Buffers encoded chunks while a stream is live.
///
/// Tracks are stopped when the recording stops, or when the recorder is
/// dropped mid-recording.
pub struct Recorder<S: MediaStream> {
    stream: Option<S>,
    chunks: Vec<Bytes>,
}

impl<S: MediaStream> Recorder<S> {
    pub fn start<D>(device: &mut D) -> Result<Self, CaptureError>
    where
        D: CaptureDevice<Stream = S>,
    {
        let stream = device.open()?;
        log::debug!("Capture stream opened");
        Ok(Self {
            stream: Some(stream),
            chunks: Vec::new(),
        })
    }

    /// The live stream, for preview.
    pub fn preview(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.stream.is_some()
    }

    /// Buffer an encoded chunk. Empty chunks carry nothing and are skipped.
    pub fn push_chunk(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if self.is_recording() && !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let mut released = 0;
            for track in stream.tracks() {
                track.stop();
                released += 1;
            }
            log::debug!("Released {released} capture track(s)");
        }
    }

    /// Stop capturing and join the buffered chunks into one video.
    pub fn stop(mut self) -> VideoFile {
        self.release();

        let chunks = std::mem::take(&mut self.chunks);
        let mut video = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in &chunks {
            video.extend_from_slice(chunk);
        }

        VideoFile::new(RECORDED_FILE_NAME, RECORDED_CONTENT_TYPE, video.freeze())
    }
}

impl<S: MediaStream> Drop for Recorder<S> {
    fn drop(&mut self) {
        self.release();
    }
}
