//! HTTP implementation of `SchemeBackend` on top of reqwest.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use super::{
    AudioPayload, AudioRequest, DEFAULT_AUDIO_MIME, EligibilityRequest, EligibilityVerdict,
    SchemeBackend, SchemeFile, SummaryResult,
};
use crate::config::ClientConfig;
use crate::error::BackendError;

/// Talks to the scheme backend over HTTP.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Send a request and read the JSON envelope, regardless of status.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let resp = request.send().await.map_err(classify)?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        let body = resp.bytes().await.map_err(classify)?;
        serde_json::from_slice(&body).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl SchemeBackend for HttpBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload_scheme(
        &self,
        file: SchemeFile,
        language_code: &str,
    ) -> Result<SummaryResult, BackendError> {
        tracing::debug!(
            file = %file.file_name,
            bytes = file.bytes.len(),
            language = language_code,
            "POST /upload_scheme"
        );

        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let form = Form::new()
            .part("scheme_file", part)
            .text("language", language_code.to_string());
        self.send_json(
            self.client
                .post(self.endpoint("upload_scheme"))
                .multipart(form),
        )
        .await
    }

    async fn check_eligibility(
        &self,
        request: &EligibilityRequest,
    ) -> Result<EligibilityVerdict, BackendError> {
        tracing::debug!(
            questions = request.questions.len(),
            language = %request.language,
            "POST /check_eligibility"
        );
        self.send_json(
            self.client
                .post(self.endpoint("check_eligibility"))
                .json(request),
        )
        .await
    }

    async fn generate_audio(&self, request: &AudioRequest) -> Result<AudioPayload, BackendError> {
        tracing::debug!(
            chars = request.summary.chars().count(),
            language = %request.language,
            "POST /generate_audio"
        );
        let resp = self
            .client
            .post(self.endpoint("generate_audio"))
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        // The narration comes back as raw bytes, not a JSON envelope.
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_AUDIO_MIME)
            .to_string();
        let bytes = resp.bytes().await.map_err(classify)?.to_vec();

        if bytes.is_empty() {
            return Err(BackendError::Malformed("empty audio payload".into()));
        }

        Ok(AudioPayload {
            bytes,
            content_type,
        })
    }
}

/// Map a transport failure onto the backend error taxonomy.
fn classify(err: reqwest::Error) -> BackendError {
    if err.is_connect() || err.is_timeout() {
        BackendError::Unreachable(err.to_string())
    } else if err.is_decode() {
        BackendError::Malformed(err.to_string())
    } else {
        BackendError::Transport(err.to_string())
    }
}

/// Build a status error, pulling the `error` field out of a JSON body.
async fn status_error(resp: reqwest::Response) -> BackendError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty());

    tracing::warn!(status, error = ?message, "Backend returned non-success status");
    BackendError::Status { status, message }
}
