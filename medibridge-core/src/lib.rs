//! MediBridge Core - Session, prescription and API plumbing
//!
//! This crate provides the building blocks shared by the MediBridge clients:
//! configuration, the persisted session, drug records, prescription drafts and
//! the typed HTTP client for the MediBridge API.

pub mod api;
pub mod config;
pub mod drug;
pub mod prescription;
pub mod session;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use api::{ApiClient, ApiError, LoginResponse, PatientSummary, SubmissionReceipt};
pub use config::{ConfigError, MedibridgeConfig};
pub use drug::DrugRecord;
pub use prescription::{DraftError, DrugEntry, PrescriptionDraft, PrescriptionPayload};
pub use session::{Role, Session, SessionError, SessionStore};

/// Core errors that can bubble up from any MediBridge subsystem.
///
/// High-level error types representing failures in core functionality.
#[derive(Debug, thiserror::Error)]
pub enum MedibridgeError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Prescription error: {0}")]
    Prescription(#[from] DraftError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Not logged in: run `medibridge login` first")]
    NotLoggedIn,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MedibridgeError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            MedibridgeError::Api(e) => match e {
                ApiError::Unauthorized => {
                    "Session expired or invalid, please log in again".to_string()
                }
                ApiError::Status { message, .. } => format!("Server rejected request: {message}"),
                ApiError::Network { .. } => {
                    "Network error. Make sure the MediBridge API is reachable".to_string()
                }
                ApiError::Decode { .. } => "Unexpected response from server".to_string(),
            },
            MedibridgeError::Session(_) => "Could not read or write the session file".to_string(),
            MedibridgeError::Prescription(e) => e.to_string(),
            MedibridgeError::Configuration(e) => format!("Configuration error: {e}"),
            MedibridgeError::NotLoggedIn => "Please log in first".to_string(),
            MedibridgeError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            MedibridgeError::Prescription(_)
                | MedibridgeError::Configuration(_)
                | MedibridgeError::NotLoggedIn
        )
    }
}

pub type Result<T> = std::result::Result<T, MedibridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_user_errors() {
        let error = MedibridgeError::from(DraftError::NoPatientSelected);
        assert!(error.is_user_error());
        assert_eq!(error.user_message(), "Please select a patient");

        let error = MedibridgeError::from(ApiError::Unauthorized);
        assert!(!error.is_user_error());
    }
}
