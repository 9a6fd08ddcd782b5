//! Typed HTTP client for the MediBridge API.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::prescription::PrescriptionPayload;
use crate::session::Role;

/// Errors from talking to the MediBridge API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {reason}")]
    Network { reason: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {reason}")]
    Decode { reason: String },
}

/// Response from `POST /v1/auth/login`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
}

/// Patient as listed by patient search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
}

impl PatientSummary {
    /// Parses the `"PAT001 - A. Patient"` form returned by patient search.
    /// Entries without a separator keep the whole text as both id and name.
    fn from_listing(listing: &str) -> Self {
        match listing.split_once(" - ") {
            Some((id, name)) => Self {
                id: id.trim().to_string(),
                name: name.trim().to_string(),
            },
            None => Self {
                id: listing.trim().to_string(),
                name: listing.trim().to_string(),
            },
        }
    }
}

/// Outcome of a prescription submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub message: String,
    /// The server stored the prescription but translation/audio generation failed.
    pub ai_processing_deferred: bool,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    mobile: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct PatientSearchResponse {
    #[serde(default)]
    results: Vec<String>,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Thin client over the MediBridge REST endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Builds a client from API settings.
    ///
    /// # Errors
    ///
    /// - `ApiError::Network` - If the HTTP client cannot be constructed
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| ApiError::Network {
            reason: format!("Failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.base_url)
    }

    /// Authenticates with mobile number and password.
    ///
    /// # Errors
    ///
    /// - `ApiError::Unauthorized` - If the credentials are rejected
    /// - `ApiError::Network` - If the server is unreachable
    /// - `ApiError::Decode` - If the response is not a login response
    pub async fn login(&self, mobile: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = self
            .client
            .post(self.url("/v1/auth/login"))
            .json(&LoginRequest { mobile, password });

        let response = send(request).await?;
        decode(response).await
    }

    /// Issues an authorized GET and decodes the JSON body.
    ///
    /// `path_and_query` must already be URL-encoded.
    ///
    /// # Errors
    ///
    /// - `ApiError::Network` - If the request could not be sent
    /// - `ApiError::Unauthorized` - If the server answers 401
    /// - `ApiError::Status` - For any other non-success status
    /// - `ApiError::Decode` - If the body does not match `T`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        debug!("GET {path_and_query}");
        let request = authorize(self.client.get(self.url(path_and_query)), token);
        let response = send(request).await?;
        decode(response).await
    }

    /// Looks up patients by name or id.
    ///
    /// # Errors
    ///
    /// - `ApiError::Unauthorized` - If the token is missing or expired
    /// - `ApiError::Network` - If the server is unreachable
    /// - `ApiError::Status` - For any other non-success status
    /// - `ApiError::Decode` - If the response has an unexpected shape
    pub async fn search_patients(
        &self,
        token: Option<&str>,
        query: &str,
    ) -> Result<Vec<PatientSummary>, ApiError> {
        let path = format!(
            "/v1/clinic/patients/search?q={}",
            urlencoding::encode(query)
        );
        let response: PatientSearchResponse = self.get_json(&path, token).await?;

        Ok(response
            .results
            .iter()
            .map(|listing| PatientSummary::from_listing(listing))
            .collect())
    }

    /// Submits a validated prescription.
    ///
    /// # Errors
    ///
    /// - `ApiError::Unauthorized` - If the token is missing or expired
    /// - `ApiError::Network` - If the server is unreachable
    /// - `ApiError::Status` - If the server rejects the prescription
    pub async fn submit_prescription(
        &self,
        token: Option<&str>,
        payload: &PrescriptionPayload,
    ) -> Result<SubmissionReceipt, ApiError> {
        let request = authorize(
            self.client.post(self.url("/v1/clinic/prescriptions/new")),
            token,
        )
        .json(payload);

        let response = send(request).await?;
        let ai_processing_deferred = response.status() == StatusCode::ACCEPTED;
        let body: MessageResponse = decode(response).await?;

        if ai_processing_deferred {
            warn!(
                "Prescription for {} saved, AI processing deferred: {}",
                payload.patient_id, body.message
            );
        } else {
            info!("Prescription for {} submitted", payload.patient_id);
        }

        Ok(SubmissionReceipt {
            message: body.message,
            ai_processing_deferred,
        })
    }
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await.map_err(|e| ApiError::Network {
        reason: format!("HTTP request failed: {e}"),
    })?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("API Error: {}", status.as_u16()));
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response.json().await.map_err(|e| ApiError::Decode {
        reason: format!("JSON parsing failed: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_listing_parsing() {
        assert_eq!(
            PatientSummary::from_listing("PAT001 - A. Patient"),
            PatientSummary {
                id: "PAT001".to_string(),
                name: "A. Patient".to_string(),
            }
        );
        assert_eq!(PatientSummary::from_listing(" PAT009 ").id, "PAT009");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = ApiConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.url("/v1/auth/login"), "http://localhost:8080/v1/auth/login");
    }

    #[test]
    fn test_login_response_role() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"token":"jwt","role":"Clinic"}"#).unwrap();
        assert_eq!(response.role, Role::Clinic);
    }
}
