//! ClinicalTrials.gov registry integration: the search client and the
//! normalizer that flattens the registry's nested study records into the
//! matcher's trial shape.

mod client;
mod normalize;

pub use client::RegistryClient;
pub use normalize::{normalize_study, Study, StudyListing};
