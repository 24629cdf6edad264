use crate::error::TurnError;
use crate::remote::{InterviewApi, TurnAck, TurnPayload};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Sends single candidate utterances to the active avatar session.
///
/// Validation is local and fails fast: no session or an empty message never
/// reaches the network. Turns are tagged with the interview record id once
/// one exists; earlier turns go untagged, which the server accepts.
#[derive(Clone)]
pub struct TurnExchangeGateway {
    api: Arc<dyn InterviewApi>,
    audio_in_flight: Arc<AtomicBool>,
}

impl TurnExchangeGateway {
    pub fn new(api: Arc<dyn InterviewApi>) -> Self {
        Self {
            api,
            audio_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn send_text(
        &self,
        session_id: Option<&str>,
        text: &str,
        record_id: Option<&str>,
    ) -> Result<TurnAck, TurnError> {
        let session_id = session_id.ok_or(TurnError::MissingSession)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(TurnError::EmptyText);
        }

        info!(session_id, tagged = record_id.is_some(), "Sending text turn");

        let ack = self
            .api
            .send_turn(session_id, TurnPayload::Text(text.to_string()), record_id)
            .await?;

        Ok(ack)
    }

    /// Send one audio utterance. Overlapping sends from the same client are
    /// rejected with `TurnError::Busy` while an upload is in flight.
    pub async fn send_audio(
        &self,
        session_id: Option<&str>,
        data: Vec<u8>,
        mime_type: &str,
        record_id: Option<&str>,
    ) -> Result<TurnAck, TurnError> {
        let session_id = session_id.ok_or(TurnError::MissingSession)?;

        if self.audio_in_flight.swap(true, Ordering::SeqCst) {
            return Err(TurnError::Busy);
        }

        info!(
            session_id,
            bytes = data.len(),
            tagged = record_id.is_some(),
            "Sending audio turn"
        );

        let result = self
            .api
            .send_turn(
                session_id,
                TurnPayload::Audio {
                    data,
                    mime_type: mime_type.to_string(),
                },
                record_id,
            )
            .await;

        self.audio_in_flight.store(false, Ordering::SeqCst);

        Ok(result?)
    }
}
