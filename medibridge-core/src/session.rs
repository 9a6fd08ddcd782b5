//! Persisted client session.
//!
//! Holds the bearer token, the signed-in role and an optional cached drug
//! catalogue. The session is loaded once, passed explicitly to whatever needs
//! it, and saved back through [`SessionStore`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::drug::DrugRecord;

/// Roles issued by the MediBridge API at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Patient,
    Clinic,
    Scanning,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "clinic" => Ok(Role::Clinic),
            "scanning" => Ok(Role::Scanning),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Patient => write!(f, "Patient"),
            Role::Clinic => write!(f, "Clinic"),
            Role::Scanning => write!(f, "Scanning"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

/// Client-side session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    /// Mobile number used to log in. The server derives the clinic id from
    /// the token, so this is for display only.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub cached_drugs: Vec<DrugRecord>,
}

impl Session {
    /// Records a successful login, keeping any cached drug list.
    pub fn sign_in(&mut self, token: String, role: Role, user_id: String) {
        self.token = Some(token);
        self.role = Some(role);
        self.user_id = Some(user_id);
    }

    /// Forgets credentials. The cached drug list survives a logout.
    pub fn sign_out(&mut self) {
        self.token = None;
        self.role = None;
        self.user_id = None;
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Errors from reading or writing the session file.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON file backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the session, returning an empty one if no file exists yet.
    ///
    /// # Errors
    ///
    /// - `SessionError::Io` - If the file exists but cannot be read
    /// - `SessionError::Corrupt` - If the file is not a valid session document
    pub async fn load(&self) -> Result<Session, SessionError> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {}, starting fresh", self.path.display());
                return Ok(Session::default());
            }
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&contents).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the session through a temporary file and a rename.
    ///
    /// # Errors
    ///
    /// - `SessionError::Io` - If the directory or file cannot be written
    pub async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let io_error = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let contents = serde_json::to_vec_pretty(session).map_err(|source| {
            SessionError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents).await.map_err(io_error)?;
        fs::rename(&temp_path, &self.path).await.map_err(io_error)?;

        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    /// Removes the session file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// - `SessionError::Io` - If the file exists but cannot be removed
    pub async fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_file_returns_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let session = store.load().await.unwrap();
        assert_eq!(session, Session::default());
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        let mut session = Session::default();
        session.sign_in("jwt-abc".to_string(), Role::Clinic, "9876543210".to_string());
        session.cached_drugs = vec![DrugRecord::new(
            "D1",
            "Paracetamol",
            Some("allopathy".to_string()),
            None,
        )];

        store.save(&session).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, session);
        assert_eq!(loaded.token(), Some("jwt-abc"));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = SessionStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(SessionError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        store.save(&Session::default()).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_sign_out_keeps_cached_drugs() {
        let mut session = Session::default();
        session.sign_in("t".to_string(), Role::Clinic, "c1".to_string());
        session.cached_drugs = vec![DrugRecord::new("D1", "Paracetamol", None, None)];

        session.sign_out();

        assert!(!session.is_signed_in());
        assert_eq!(session.cached_drugs.len(), 1);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Clinic".parse::<Role>(), Ok(Role::Clinic));
        assert_eq!("patient".parse::<Role>(), Ok(Role::Patient));
        assert!("doctor".parse::<Role>().is_err());
    }
}
