//! Scheme Assist: client-side controller for the scheme summary and
//! eligibility workflow.

pub mod backend;
pub mod config;
pub mod error;
pub mod languages;
pub mod workflow;
