//! Workflow: drives upload, eligibility and audio against the backend and
//! keeps the client state consistent whatever the network does.
//!
//! Every stage follows the same shape:
//!
//! 1. Under the lock: refuse if the stage is already in flight, clear the
//!    error, take a ticket, reset downstream state.
//! 2. Release the lock and call the backend.
//! 3. Under the lock again: drop the response if the ticket went stale,
//!    otherwise clear the loading flag and apply the result.
//!
//! Errors are recorded in the shared error slot before they are returned,
//! so a caller that ignores the `Result` still leaves the UI correct.

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use super::audio::{AudioResource, AudioSlot, AudioStore};
use super::form::{Answer, FormView};
use super::state::{Stage, WorkflowEvent, WorkflowSnapshot, WorkflowState};
use crate::backend::{
    AudioRequest, EligibilityRequest, EligibilityVerdict, SchemeBackend, SummaryResult,
    UploadRequest,
};
use crate::config::ClientConfig;
use crate::error::{BackendError, StageError};
use crate::languages::{self, LANGUAGES, LanguageOption};

/// Event channel capacity.
const EVENT_CAPACITY: usize = 64;

impl Stage {
    /// Message when the backend rejected the request without saying why.
    fn rejected_message(&self) -> &'static str {
        match self {
            Self::Upload => "Failed to upload scheme. Please try again.",
            Self::Eligibility => "Failed to check eligibility. Please try again.",
            Self::Audio => "Failed to generate audio. Please try again.",
        }
    }

    /// Message when the backend answered but reported no result.
    fn unsuccessful_message(&self) -> &'static str {
        match self {
            Self::Upload => "No summary returned from server.",
            Self::Eligibility => "Failed to check eligibility.",
            Self::Audio => "Failed to generate audio. Please try again.",
        }
    }

    fn unexpected_message(&self) -> &'static str {
        match self {
            Self::Upload => "An unexpected error occurred. Please try again.",
            Self::Eligibility => "An unexpected error occurred while checking eligibility.",
            Self::Audio => "An unexpected error occurred while generating audio.",
        }
    }

    /// Translate a backend failure into what this stage shows the user.
    fn map_backend_error(&self, err: BackendError, base_url: &str) -> StageError {
        match err {
            BackendError::Unreachable(_) => StageError::Network {
                base_url: base_url.to_string(),
            },
            BackendError::Status {
                message: Some(message),
                ..
            } => StageError::Server(message),
            BackendError::Status { message: None, .. } => {
                StageError::Server(self.rejected_message().to_string())
            }
            BackendError::Malformed(_) => {
                StageError::Server(self.unsuccessful_message().to_string())
            }
            BackendError::Transport(_) => StageError::Unexpected(self.unexpected_message().to_string()),
        }
    }

    /// Error for a 2xx envelope with `success: false`.
    fn unsuccessful(&self, error: Option<String>) -> StageError {
        StageError::Server(
            error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| self.unsuccessful_message().to_string()),
        )
    }
}

/// Client-side controller for the scheme workflow.
pub struct Workflow {
    backend: Arc<dyn SchemeBackend>,
    config: ClientConfig,
    state: RwLock<WorkflowState>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl Workflow {
    pub fn new(backend: Arc<dyn SchemeBackend>, config: ClientConfig) -> Arc<Self> {
        Self::with_audio_store(backend, config, AudioStore::new())
    }

    /// Create a workflow whose narration buffers live in `store`.
    pub fn with_audio_store(
        backend: Arc<dyn SchemeBackend>,
        config: ClientConfig,
        store: Arc<AudioStore>,
    ) -> Arc<Self> {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        let state = WorkflowState::new(&config.default_language, AudioSlot::new(store));
        Arc::new(Self {
            backend,
            config,
            state: RwLock::new(state),
            events,
        })
    }

    /// Subscribe to workflow events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn languages(&self) -> &'static [LanguageOption] {
        LANGUAGES
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Copy of the current state for rendering.
    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.state.write().await.snapshot()
    }

    /// Bytes and content type of the current narration, when held locally.
    pub async fn audio_bytes(&self) -> Option<(Arc<Vec<u8>>, String)> {
        let state = self.state.read().await;
        let resource = state.audio.current()?;
        if !resource.is_local() {
            return None;
        }
        let store = state.audio.store();
        let bytes = store.bytes(resource.url())?;
        let content_type = store.content_type(resource.url())?;
        Some((bytes, content_type))
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Record a failure in the error slot and tell subscribers.
    fn fail(&self, state: &mut WorkflowState, stage: Stage, err: StageError) -> StageError {
        let message = err.to_string();
        if err.is_user_visible() {
            state.error = Some(message.clone());
        }
        warn!(stage = %stage, error = %message, "Stage failed");
        self.emit(WorkflowEvent::StageFailed { stage, message });
        err
    }

    /// Take a ticket for `stage`, refusing if one is already outstanding.
    fn begin(&self, state: &mut WorkflowState, stage: Stage) -> Result<u64, StageError> {
        if state.status(stage).in_flight {
            return Err(self.fail(state, stage, StageError::InFlight { stage }));
        }
        state.error = None;
        let ticket = state.status_mut(stage).begin();
        self.emit(WorkflowEvent::StageStarted { stage });
        Ok(ticket)
    }

    /// Re-check the ticket once the network call has settled.
    fn settle(&self, state: &mut WorkflowState, stage: Stage, ticket: u64) -> Result<(), StageError> {
        if !state.status(stage).is_current(ticket) {
            warn!(stage = %stage, ticket, "Discarding stale response");
            self.emit(WorkflowEvent::StageDiscarded { stage });
            return Err(StageError::Superseded { stage });
        }
        state.status_mut(stage).in_flight = false;
        Ok(())
    }

    /// Pick the language for the next upload.
    pub async fn select_language(&self, code: &str) -> Result<(), StageError> {
        let code = code.trim();
        let mut state = self.state.write().await;
        if code.is_empty() {
            let err = StageError::Validation("Please select a language.".into());
            return Err(self.fail(&mut state, Stage::Upload, err));
        }
        if !languages::is_supported(code) {
            warn!(language = code, "Language not in the registry; the backend decides");
        }
        state.pending_language = code.to_string();
        self.emit(WorkflowEvent::LanguageSelected {
            code: code.to_string(),
        });
        Ok(())
    }

    /// Answer question `index` of the current form.
    pub async fn set_answer(&self, index: usize, value: Answer) -> Result<(), StageError> {
        let mut state = self.state.write().await;
        let count = state.questions().len();
        if let Err(err) = state.form.set_answer(count, index, value) {
            return Err(self.fail(&mut state, Stage::Eligibility, err));
        }
        self.emit(WorkflowEvent::AnswerChanged {
            index,
            answer: value,
        });
        Ok(())
    }

    /// Upload a scheme document and replace the summary with the result.
    ///
    /// With `clear_summary_on_resubmit` off, the previous summary and
    /// everything derived from it stay visible until the new one arrives.
    pub async fn submit_upload(&self, request: UploadRequest) -> Result<SummaryResult, StageError> {
        let (file, language) = match request.into_parts() {
            Ok(parts) => parts,
            Err(err) => {
                let mut state = self.state.write().await;
                return Err(self.fail(&mut state, Stage::Upload, err));
            }
        };

        let ticket = {
            let mut state = self.state.write().await;
            let ticket = self.begin(&mut state, Stage::Upload)?;
            if self.config.clear_summary_on_resubmit {
                state.summary = None;
                state.clear_downstream_of_upload();
            } else {
                state.invalidate_downstream_of_upload();
            }
            state.pending_language = language.clone();
            ticket
        };

        info!(
            file = %file.file_name,
            bytes = file.bytes.len(),
            language = %language,
            "Uploading scheme"
        );
        let outcome = self.backend.upload_scheme(file, &language).await;

        let mut state = self.state.write().await;
        self.settle(&mut state, Stage::Upload, ticket)?;

        let result = match outcome {
            Ok(result) if result.success => result,
            Ok(result) => {
                let err = Stage::Upload.unsuccessful(result.error);
                return Err(self.fail(&mut state, Stage::Upload, err));
            }
            Err(err) => {
                let err = Stage::Upload.map_backend_error(err, self.backend.base_url());
                return Err(self.fail(&mut state, Stage::Upload, err));
            }
        };

        // The echoed code wins over the one we sent.
        state.selected_language = result
            .language_code
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(language);

        // Anything started against the old summary while we waited is stale.
        state.clear_downstream_of_upload();
        state.summary = Some(result.clone());
        if let Some(url) = result.audio_url.clone().filter(|u| !u.trim().is_empty()) {
            state.audio.replace(AudioResource::Remote { url });
        }
        let questions = state.questions().len();
        state.form.reset(questions);

        info!(
            title = result.title.as_deref().unwrap_or(""),
            language = %state.selected_language,
            questions,
            "Scheme summarized"
        );
        self.emit(WorkflowEvent::StageSucceeded {
            stage: Stage::Upload,
        });
        Ok(result)
    }

    /// Send the questions and answers the user was shown for a verdict.
    ///
    /// `rendered` must still match the current form. If a new summary or an
    /// answer change landed after it was drawn, nothing is sent.
    pub async fn submit_eligibility(
        &self,
        rendered: &FormView,
    ) -> Result<EligibilityVerdict, StageError> {
        let (ticket, request) = {
            let mut state = self.state.write().await;
            let current = state.form_view();
            if !current.is_presented() {
                let err =
                    StageError::Precondition("There are no eligibility questions to answer.".into());
                return Err(self.fail(&mut state, Stage::Eligibility, err));
            }
            if *rendered != current {
                let err = StageError::Precondition(
                    "The eligibility questions changed; please review your answers.".into(),
                );
                return Err(self.fail(&mut state, Stage::Eligibility, err));
            }
            let ticket = self.begin(&mut state, Stage::Eligibility)?;
            let FormView { questions, answers } = current;
            let request = EligibilityRequest {
                questions,
                responses: answers,
                language: state.selected_language.clone(),
            };
            (ticket, request)
        };

        info!(
            questions = request.questions.len(),
            language = %request.language,
            "Checking eligibility"
        );
        let outcome = self.backend.check_eligibility(&request).await;

        let mut state = self.state.write().await;
        self.settle(&mut state, Stage::Eligibility, ticket)?;

        match outcome {
            Ok(verdict) if verdict.success => {
                info!(eligible = verdict.is_eligible, "Eligibility verdict received");
                state.verdict = Some(verdict.clone());
                self.emit(WorkflowEvent::StageSucceeded {
                    stage: Stage::Eligibility,
                });
                Ok(verdict)
            }
            Ok(verdict) => {
                let err = Stage::Eligibility.unsuccessful(verdict.error);
                Err(self.fail(&mut state, Stage::Eligibility, err))
            }
            Err(err) => {
                let err = Stage::Eligibility.map_backend_error(err, self.backend.base_url());
                Err(self.fail(&mut state, Stage::Eligibility, err))
            }
        }
    }

    /// Narrate the current summary.
    pub async fn request_audio(&self) -> Result<AudioResource, StageError> {
        let (ticket, request) = {
            let mut state = self.state.write().await;
            if state.status(Stage::Audio).in_flight {
                return Err(self.fail(&mut state, Stage::Audio, StageError::InFlight {
                    stage: Stage::Audio,
                }));
            }
            let Some(summary) = state
                .summary
                .as_ref()
                .and_then(|s| s.summary())
                .map(str::to_string)
            else {
                state.audio.clear();
                let err = StageError::Precondition("No summary available to generate audio.".into());
                return Err(self.fail(&mut state, Stage::Audio, err));
            };
            let ticket = self.begin(&mut state, Stage::Audio)?;
            state.audio.clear();
            let request = AudioRequest {
                summary,
                language: state.selected_language.clone(),
            };
            (ticket, request)
        };

        info!(
            chars = request.summary.chars().count(),
            language = %request.language,
            "Generating audio"
        );
        let outcome = self.backend.generate_audio(&request).await;

        let mut state = self.state.write().await;
        self.settle(&mut state, Stage::Audio, ticket)?;

        match outcome {
            Ok(payload) => {
                let len = payload.bytes.len();
                let resource = state
                    .audio
                    .install_bytes(payload.bytes, &payload.content_type)
                    .clone();
                info!(url = %resource.url(), bytes = len, "Audio ready");
                self.emit(WorkflowEvent::StageSucceeded { stage: Stage::Audio });
                Ok(resource)
            }
            Err(err) => {
                state.audio.clear();
                let err = Stage::Audio.map_backend_error(err, self.backend.base_url());
                Err(self.fail(&mut state, Stage::Audio, err))
            }
        }
    }

    /// Abandon the outstanding request of `stage`, if any.
    ///
    /// Its response is discarded when it arrives and the stage can be
    /// submitted again right away. Returns whether anything was in flight.
    pub async fn cancel(&self, stage: Stage) -> bool {
        let mut state = self.state.write().await;
        if !state.status(stage).in_flight {
            return false;
        }
        state.status_mut(stage).invalidate();
        info!(stage = %stage, "Request cancelled");
        self.emit(WorkflowEvent::StageCancelled { stage });
        true
    }

    /// Tear everything down, releasing the narration buffer.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.reset();
        debug!("Workflow reset");
        self.emit(WorkflowEvent::Reset);
    }
}
