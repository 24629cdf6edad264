use crate::error::DeviceError;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// One buffered slice of captured media (opaque container bytes)
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// Encoded media bytes
    pub data: Vec<u8>,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// An open camera+microphone capture.
///
/// Exactly one live handle exists per interview screen; it is owned by the
/// `MediaCaptureGuard` and mutated only through it. Dropping or stopping the
/// handle turns the hardware indicators off.
pub struct DeviceHandle {
    device_id: String,
    mime_type: String,
    chunks: Option<mpsc::Receiver<MediaChunk>>,
    stop_tx: watch::Sender<bool>,
}

impl DeviceHandle {
    pub fn new(
        mime_type: impl Into<String>,
        chunks: mpsc::Receiver<MediaChunk>,
        stop_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            device_id: format!("device-{}", uuid::Uuid::new_v4()),
            mime_type: mime_type.into(),
            chunks: Some(chunks),
            stop_tx,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Take the chunk stream for recording. Yields `None` on the second call;
    /// at most one recorder drains a handle.
    pub fn take_chunks(&mut self) -> Option<mpsc::Receiver<MediaChunk>> {
        self.chunks.take()
    }

    /// Stop all underlying tracks. Safe to call more than once.
    pub fn stop(&self) {
        // Receivers may already be gone; a closed channel means the capture
        // task has stopped on its own.
        let _ = self.stop_tx.send(true);
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Camera/microphone capture backend
///
/// Implementations:
/// - Synthetic: generated silence/black frames (tests, dry runs)
/// - Platform device capture plugs in behind the same trait
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Open an audio+video capture.
    ///
    /// On failure the precise kind is reported so the caller can surface a
    /// matching remedy.
    async fn open(&self) -> Result<DeviceHandle, DeviceError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Generated frames (tests, dry runs)
    Synthetic,
    /// Physical camera + microphone
    Device,
}

pub struct CaptureFactory;

impl CaptureFactory {
    pub fn create(source: CaptureSource) -> Result<Box<dyn CaptureBackend>, DeviceError> {
        match source {
            CaptureSource::Synthetic => Ok(Box::new(SyntheticBackend::default())),
            // Hardware capture is provided by the embedding platform; the
            // orchestrator only ever sees the trait.
            CaptureSource::Device => Err(DeviceError::Unsupported),
        }
    }
}

/// Backend that emits fixed-size silent chunks at a steady rate
pub struct SyntheticBackend {
    chunk_interval_ms: u64,
    chunk_bytes: usize,
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self {
            chunk_interval_ms: 100,
            chunk_bytes: 4096,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for SyntheticBackend {
    async fn open(&self) -> Result<DeviceHandle, DeviceError> {
        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let interval_ms = self.chunk_interval_ms;
        let chunk_bytes = self.chunk_bytes;

        tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_millis(interval_ms));

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let chunk = MediaChunk {
                            data: vec![0u8; chunk_bytes],
                            timestamp_ms,
                        };
                        timestamp_ms += interval_ms;

                        if chunk_tx.send(chunk).await.is_err() {
                            break;
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Synthetic capture stopped");
        });

        Ok(DeviceHandle::new("video/webm", chunk_rx, stop_tx))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
