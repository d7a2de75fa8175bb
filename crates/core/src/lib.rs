//! # Denials Core
//!
//! Core business logic for claim denial resolution.
//!
//! This crate contains the denial pipeline and the data it works over:
//! - Denial pattern identification against a catalogue of payer reason codes
//! - Auto-correction generation and application to claims
//! - Appeal-probability scoring and recommended actions
//! - Denial analytics over a date range
//! - Pre-submission claim validation and 837P rendering
//!
//! **No API concerns**: HTTP servers, CLI parsing and process configuration belong in
//! `api-rest`, `denials-cli` and the `denials-run` binary.

pub mod analytics;
pub mod config;
pub mod constants;
pub mod corrections;
pub mod edi;
pub mod error;
pub mod models;
pub mod patterns;
pub mod recommendations;
pub mod service;
pub mod store;
pub mod validation;

pub use claims_types::{Money, NonEmptyText, Percentage};
pub use config::CoreConfig;
pub use error::{DenialError, DenialResult};
pub use patterns::PatternCatalogue;
pub use service::{DenialAnalysis, DenialService};
pub use store::{ClaimsStore, InMemoryStore};
