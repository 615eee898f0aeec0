//! The upload → summary → eligibility workflow, with optional narration.
//!
//! `Workflow` owns all client state. Each stage controller only replaces its
//! own slice and resets everything downstream of it when it re-runs.

pub mod audio;
pub mod controller;
pub mod form;
pub mod state;

pub use audio::{AudioResource, AudioSlot, AudioStore};
pub use controller::Workflow;
pub use form::{Answer, EligibilityForm, FormView, derive_questions};
pub use state::{Stage, StageStatus, WorkflowEvent, WorkflowSnapshot, WorkflowState};
