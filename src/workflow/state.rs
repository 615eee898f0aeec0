//! Workflow state: the slices each stage owns and the per-stage bookkeeping.

use serde::{Deserialize, Serialize};

use super::audio::{AudioResource, AudioSlot};
use super::form::{Answer, EligibilityForm, FormView, questions_for};
use crate::backend::{EligibilityVerdict, SummaryResult};

/// One network-backed step of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Eligibility,
    Audio,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Upload, Stage::Eligibility, Stage::Audio];

    /// Stages whose state depends on this one and must be reset when it
    /// re-runs.
    pub fn downstream(&self) -> &'static [Stage] {
        match self {
            Self::Upload => &[Stage::Eligibility, Stage::Audio],
            Self::Eligibility | Self::Audio => &[],
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Upload => "upload",
            Self::Eligibility => "eligibility",
            Self::Audio => "audio",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upload" => Ok(Self::Upload),
            "eligibility" => Ok(Self::Eligibility),
            "audio" => Ok(Self::Audio),
            other => Err(format!("Unknown stage: {other}")),
        }
    }
}

/// Loading flag plus a generation counter used to spot stale responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStatus {
    pub in_flight: bool,
    pub generation: u64,
}

impl StageStatus {
    /// Mark a request as started and return its ticket.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.in_flight = true;
        self.generation
    }

    /// Invalidate any outstanding request.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = false;
    }

    /// Whether a response carrying `ticket` is still wanted.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.generation == ticket
    }
}

/// Everything the client holds between user actions.
#[derive(Debug)]
pub struct WorkflowState {
    /// Language picked for the next upload.
    pub pending_language: String,
    /// Language echoed by the server; used for every later stage.
    pub selected_language: String,
    pub summary: Option<SummaryResult>,
    pub verdict: Option<EligibilityVerdict>,
    pub audio: AudioSlot,
    pub form: EligibilityForm,
    /// The single user-visible error message.
    pub error: Option<String>,
    upload: StageStatus,
    eligibility: StageStatus,
    audio_status: StageStatus,
}

impl WorkflowState {
    pub fn new(default_language: &str, audio: AudioSlot) -> Self {
        Self {
            pending_language: default_language.to_string(),
            selected_language: default_language.to_string(),
            summary: None,
            verdict: None,
            audio,
            form: EligibilityForm::new(),
            error: None,
            upload: StageStatus::default(),
            eligibility: StageStatus::default(),
            audio_status: StageStatus::default(),
        }
    }

    pub fn status(&self, stage: Stage) -> &StageStatus {
        match stage {
            Stage::Upload => &self.upload,
            Stage::Eligibility => &self.eligibility,
            Stage::Audio => &self.audio_status,
        }
    }

    pub fn status_mut(&mut self, stage: Stage) -> &mut StageStatus {
        match stage {
            Stage::Upload => &mut self.upload,
            Stage::Eligibility => &mut self.eligibility,
            Stage::Audio => &mut self.audio_status,
        }
    }

    /// Current derived question list.
    pub fn questions(&self) -> Vec<String> {
        questions_for(self.summary.as_ref())
    }

    /// Questions with their aligned answers.
    pub fn form_view(&mut self) -> FormView {
        let questions = self.questions();
        let answers = self.form.answers(questions.len()).to_vec();
        FormView { questions, answers }
    }

    /// Discard eligibility and audio requests started against the current
    /// summary, leaving their results in place.
    pub fn invalidate_downstream_of_upload(&mut self) {
        for stage in Stage::Upload.downstream() {
            self.status_mut(*stage).invalidate();
        }
    }

    /// Drop everything that was derived from the current summary.
    pub fn clear_downstream_of_upload(&mut self) {
        self.verdict = None;
        self.audio.clear();
        self.form.reset(0);
        self.invalidate_downstream_of_upload();
    }

    /// Return to the initial state, releasing the audio buffer.
    pub fn reset(&mut self) {
        for stage in Stage::ALL {
            self.status_mut(stage).invalidate();
        }
        self.summary = None;
        self.clear_downstream_of_upload();
        self.error = None;
        self.selected_language = self.pending_language.clone();
    }

    pub fn snapshot(&mut self) -> WorkflowSnapshot {
        let form = self.form_view();
        WorkflowSnapshot {
            pending_language: self.pending_language.clone(),
            selected_language: self.selected_language.clone(),
            summary: self.summary.clone(),
            show_eligibility_form: form.is_presented(),
            form,
            verdict: self.verdict.clone(),
            audio: self.audio.current().cloned(),
            error: self.error.clone(),
            uploading: self.upload.in_flight,
            checking_eligibility: self.eligibility.in_flight,
            generating_audio: self.audio_status.in_flight,
        }
    }
}

/// Read-only copy of the workflow for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub pending_language: String,
    pub selected_language: String,
    pub summary: Option<SummaryResult>,
    pub form: FormView,
    pub show_eligibility_form: bool,
    pub verdict: Option<EligibilityVerdict>,
    pub audio: Option<AudioResource>,
    pub error: Option<String>,
    pub uploading: bool,
    pub checking_eligibility: bool,
    pub generating_audio: bool,
}

impl WorkflowSnapshot {
    /// Audio can be requested once a non-blank summary exists.
    pub fn can_request_audio(&self) -> bool {
        self.summary.as_ref().and_then(|s| s.summary()).is_some() && !self.generating_audio
    }

    pub fn can_submit_eligibility(&self) -> bool {
        self.show_eligibility_form && !self.checking_eligibility
    }
}

/// Notification sent to subscribers whenever the workflow changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StageStarted { stage: Stage },
    StageSucceeded { stage: Stage },
    StageFailed { stage: Stage, message: String },
    StageDiscarded { stage: Stage },
    StageCancelled { stage: Stage },
    AnswerChanged { index: usize, answer: Answer },
    LanguageSelected { code: String },
    Reset,
}
