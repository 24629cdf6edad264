use super::api::{
    AvatarSession, InterviewApi, InterviewContext, InterviewRecord, StreamDescriptor, TurnAck,
    TurnPayload,
};
use crate::config::RemoteConfig;
use crate::media::RecordedArtifact;
use anyhow::{bail, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// HTTP client for the interview/avatar backend
pub struct HttpInterviewApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpInterviewApi {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Deserialize)]
struct StartAvatarResponse {
    ok: bool,
    #[serde(default)]
    message: String,
    session_id: Option<String>,
    stream_url: Option<String>,
    #[serde(default)]
    token: String,
}

#[derive(Debug, Serialize)]
struct TurnRequest<'a> {
    session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<String>, // base64-encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    record_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    kind: &'a str,
}

#[derive(Debug, Serialize)]
struct FinalizeRecordRequest<'a> {
    elapsed_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UploadArtifactRequest<'a> {
    mime_type: &'a str,
    data: String, // base64-encoded
}

#[derive(Debug, Serialize)]
struct StopAvatarRequest<'a> {
    session_id: &'a str,
}

#[async_trait::async_trait]
impl InterviewApi for HttpInterviewApi {
    async fn interview_context(&self, kind: &str) -> Result<InterviewContext> {
        let context: InterviewContext = self
            .client
            .get(self.url("/interview/context"))
            .query(&[("kind", kind)])
            .send()
            .await
            .context("Failed to fetch interview context")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse interview context")?;

        Ok(context)
    }

    async fn start_avatar(&self) -> Result<AvatarSession> {
        let resp: StartAvatarResponse = self
            .client
            .post(self.url("/avatar/start"))
            .send()
            .await
            .context("Failed to start avatar session")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse avatar start response")?;

        if !resp.ok {
            bail!("Avatar start rejected: {}", resp.message);
        }

        let (Some(session_id), Some(stream_url)) = (resp.session_id, resp.stream_url) else {
            bail!("Avatar start response missing session id or stream url");
        };

        info!(session_id, "Avatar session started");

        Ok(AvatarSession {
            session_id,
            descriptor: StreamDescriptor {
                stream_url,
                token: resp.token,
            },
        })
    }

    async fn stop_avatar(&self, session_id: &str) -> Result<()> {
        self.client
            .post(self.url("/avatar/stop"))
            .json(&StopAvatarRequest { session_id })
            .send()
            .await
            .context("Failed to stop avatar session")?
            .error_for_status()?;

        info!(session_id, "Avatar session stopped");
        Ok(())
    }

    async fn send_turn(
        &self,
        session_id: &str,
        turn: TurnPayload,
        record_id: Option<&str>,
    ) -> Result<TurnAck> {
        let (text, audio, mime_type) = match &turn {
            TurnPayload::Text(text) => (Some(text.as_str()), None, None),
            TurnPayload::Audio { data, mime_type } => (
                None,
                Some(base64::engine::general_purpose::STANDARD.encode(data)),
                Some(mime_type.as_str()),
            ),
        };

        let ack: TurnAck = self
            .client
            .post(self.url("/avatar/turn"))
            .json(&TurnRequest {
                session_id,
                text,
                audio,
                mime_type,
                record_id,
            })
            .send()
            .await
            .context("Failed to send turn")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse turn response")?;

        Ok(ack)
    }

    async fn create_record(&self, kind: &str) -> Result<InterviewRecord> {
        let record: InterviewRecord = self
            .client
            .post(self.url("/interviews"))
            .json(&CreateRecordRequest { kind })
            .send()
            .await
            .context("Failed to create interview record")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse interview record")?;

        info!(record_id = record.record_id, "Interview record created");
        Ok(record)
    }

    async fn finalize_record(
        &self,
        record_id: &str,
        elapsed_secs: u64,
        session_id: Option<&str>,
    ) -> Result<()> {
        self.client
            .post(self.url(&format!("/interviews/{}/finalize", record_id)))
            .json(&FinalizeRecordRequest {
                elapsed_secs,
                session_id,
            })
            .send()
            .await
            .context("Failed to finalize interview record")?
            .error_for_status()?;

        info!(record_id, elapsed_secs, "Interview record finalized");
        Ok(())
    }

    async fn upload_artifact(&self, record_id: &str, artifact: RecordedArtifact) -> Result<()> {
        self.client
            .post(self.url(&format!("/interviews/{}/video", record_id)))
            .json(&UploadArtifactRequest {
                mime_type: &artifact.mime_type,
                data: base64::engine::general_purpose::STANDARD.encode(&artifact.data),
            })
            .send()
            .await
            .context("Failed to upload recorded artifact")?
            .error_for_status()?;

        info!(record_id, bytes = artifact.len(), "Artifact uploaded");
        Ok(())
    }
}
