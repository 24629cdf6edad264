use super::backend::DeviceHandle;
use crate::remote::InterviewApi;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// The finalized local recording, ready for upload
#[derive(Debug, Clone)]
pub struct RecordedArtifact {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl RecordedArtifact {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

struct ActiveRecording {
    buffer: Arc<Mutex<Vec<u8>>>,
    mime_type: String,
    stop_tx: watch::Sender<bool>,
    drain_task: JoinHandle<()>,
}

/// Buffers captured media chunks and finalizes them into one artifact.
///
/// Decoupled from upload: the artifact is produced locally on `stop` and
/// consumed at most once by `upload_to`. Video upload is best-effort and must
/// never block interview completion, so upload failures are reported to the
/// caller but carry no rollback.
pub struct LocalRecorder {
    recording: Option<ActiveRecording>,
    artifact: Option<RecordedArtifact>,
    finalized: bool,
}

impl LocalRecorder {
    pub fn new() -> Self {
        Self {
            recording: None,
            artifact: None,
            finalized: false,
        }
    }

    /// Begin buffering chunks from the given capture handle.
    ///
    /// Returns `false` (not started, no error) when no handle is supplied,
    /// when the handle's chunk stream is already claimed, or when a recording
    /// is already running.
    pub fn start(&mut self, handle: Option<&mut DeviceHandle>) -> bool {
        if self.recording.is_some() || self.finalized {
            warn!("Recorder already started");
            return false;
        }

        let Some(handle) = handle else {
            warn!("No capture handle available, recording skipped");
            return false;
        };

        let Some(mut chunks) = handle.take_chunks() else {
            warn!("Capture handle already drained, recording skipped");
            return false;
        };

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task_buffer = Arc::clone(&buffer);
        let drain_task = tokio::spawn(async move {
            info!("Recording drain task started");

            let push = |chunk: crate::media::MediaChunk| {
                let mut buf = task_buffer
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                buf.extend_from_slice(&chunk.data);
            };

            loop {
                tokio::select! {
                    // Buffered chunks win over the stop signal so nothing
                    // already captured is dropped on the floor.
                    biased;

                    chunk = chunks.recv() => {
                        match chunk {
                            Some(chunk) => push(chunk),
                            None => break, // capture stopped upstream
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            while let Ok(chunk) = chunks.try_recv() {
                                push(chunk);
                            }
                            break;
                        }
                    }
                }
            }

            info!("Recording drain task stopped");
        });

        self.recording = Some(ActiveRecording {
            buffer,
            mime_type: handle.mime_type().to_string(),
            stop_tx,
            drain_task,
        });

        info!("Recording started");
        true
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Finalize the buffer into one immutable artifact.
    ///
    /// Returns `None` if recording never started or produced no data. Calling
    /// `stop` again returns the already-finalized artifact until it is
    /// consumed by upload.
    pub async fn stop(&mut self) -> Option<&RecordedArtifact> {
        if let Some(recording) = self.recording.take() {
            let _ = recording.stop_tx.send(true);
            if let Err(e) = recording.drain_task.await {
                error!("Recording drain task panicked: {}", e);
            }

            let data = {
                let mut buf = recording
                    .buffer
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                std::mem::take(&mut *buf)
            };

            self.finalized = true;

            if data.is_empty() {
                info!("Recording stopped with no data");
            } else {
                info!("Recording stopped, artifact is {} bytes", data.len());
                self.artifact = Some(RecordedArtifact {
                    data,
                    mime_type: recording.mime_type,
                });
            }
        }

        self.artifact.as_ref()
    }

    /// Discard any finalized artifact without uploading it (abort path).
    pub fn discard(&mut self) {
        if self.artifact.take().is_some() {
            info!("Recorded artifact discarded");
        }
    }

    /// Transmit the finalized artifact tagged with the given record id.
    ///
    /// A no-op when there is no artifact or no record id. The artifact is
    /// consumed by the attempt whether or not the upload succeeds.
    pub async fn upload_to(
        &mut self,
        api: &Arc<dyn InterviewApi>,
        record_id: Option<&str>,
    ) -> anyhow::Result<()> {
        let Some(record_id) = record_id else {
            info!("No interview record, skipping artifact upload");
            return Ok(());
        };

        let Some(artifact) = self.artifact.take() else {
            info!("No recorded artifact, skipping upload");
            return Ok(());
        };

        info!(
            record_id,
            bytes = artifact.len(),
            "Uploading recorded artifact"
        );

        api.upload_artifact(record_id, artifact).await
    }
}

impl Default for LocalRecorder {
    fn default() -> Self {
        Self::new()
    }
}
