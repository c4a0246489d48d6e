//! Clinical trial eligibility matching engine.
//!
//! Pairs a patient's condition profile with candidate trials from a public
//! registry and scores each trial's free-text eligibility criteria through an
//! LLM-backed assessor, with deterministic aggregation and bounded-concurrency
//! batch orchestration.

pub mod config;
pub mod error;
pub mod fhir;
pub mod matching;
pub mod registry;
pub mod telemetry;
