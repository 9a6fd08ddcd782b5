//! Integration tests for MediBridge
//!
//! These tests drive the client crates against an in-process mock of the
//! MediBridge API and check what actually crosses the wire.

#[path = "style.rs"]
mod style;

#[path = "integration/mock_api.rs"]
mod mock_api;

#[path = "integration/remote_lookup.rs"]
mod remote_lookup;
#[path = "integration/prescription_submission.rs"]
mod prescription_submission;
#[path = "integration/session_persistence.rs"]
mod session_persistence;
#[path = "integration/catalogue_import.rs"]
mod catalogue_import;
