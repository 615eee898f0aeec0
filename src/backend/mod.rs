//! Scheme backend interface.
//!
//! The backend does the document understanding, translation, narration and
//! eligibility reasoning. This crate only talks to it:
//!
//! - `POST /upload_scheme`: multipart PDF + language, JSON envelope back
//! - `POST /check_eligibility`: JSON in, JSON envelope back
//! - `POST /generate_audio`: JSON in, raw audio bytes back

pub mod http;
pub mod types;

pub use http::HttpBackend;
pub use types::*;

use async_trait::async_trait;

use crate::error::BackendError;

/// Operations offered by the scheme backend.
#[async_trait]
pub trait SchemeBackend: Send + Sync {
    /// Base URL shown to the user when the backend is unreachable.
    fn base_url(&self) -> &str;

    /// Upload a scheme document and get its summary and questions.
    async fn upload_scheme(
        &self,
        file: SchemeFile,
        language_code: &str,
    ) -> Result<SummaryResult, BackendError>;

    /// Ask for an eligibility verdict from the collected answers.
    async fn check_eligibility(
        &self,
        request: &EligibilityRequest,
    ) -> Result<EligibilityVerdict, BackendError>;

    /// Narrate the summary text.
    async fn generate_audio(&self, request: &AudioRequest) -> Result<AudioPayload, BackendError>;
}
