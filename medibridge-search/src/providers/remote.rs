//! MediBridge API drug search provider.

use async_trait::async_trait;
use medibridge_core::{ApiClient, DrugRecord, Session};
use serde::Deserialize;
use tracing::debug;

use super::DrugSearchProvider;
use crate::errors::DrugLookupError;

/// Searches the drug catalogue held by the MediBridge API.
///
/// Issues one request per lookup with the session's bearer token. The server
/// does the matching; responses are validated into [`DrugRecord`]s.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    api: ApiClient,
    token: Option<String>,
}

/// Single drug as returned by the search and catalogue endpoints.
#[derive(Debug, Deserialize)]
struct RemoteDrug {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    drug_type: Option<String>,
    #[serde(default)]
    strength: Option<String>,
}

impl RemoteDrug {
    fn into_record(self) -> Result<DrugRecord, DrugLookupError> {
        if self.id.trim().is_empty() || self.name.trim().is_empty() {
            return Err(DrugLookupError::ParseError {
                reason: format!(
                    "drug entry missing id or name (id: {:?}, name: {:?})",
                    self.id, self.name
                ),
            });
        }
        Ok(DrugRecord::new(
            self.id.trim(),
            self.name.trim(),
            self.drug_type,
            self.strength,
        ))
    }
}

impl RemoteProvider {
    /// Creates a provider using the session's token.
    pub fn new(api: ApiClient, session: &Session) -> Self {
        Self::with_token(api, session.token().map(str::to_string))
    }

    /// Creates a provider with an explicit token.
    pub fn with_token(api: ApiClient, token: Option<String>) -> Self {
        Self { api, token }
    }

    async fn fetch(&self, path: &str, query: &str) -> Result<Vec<RemoteDrug>, DrugLookupError> {
        // The server answers `null` for an empty table
        let drugs: Option<Vec<RemoteDrug>> = self
            .api
            .get_json(path, self.token.as_deref())
            .await
            .map_err(|e| DrugLookupError::from_api(query, e))?;
        Ok(drugs.unwrap_or_default())
    }
}

#[async_trait]
impl DrugSearchProvider for RemoteProvider {
    async fn search_drugs(&self, query: &str) -> Result<Vec<DrugRecord>, DrugLookupError> {
        let path = format!("/v1/clinic/drugs/search?q={}", urlencoding::encode(query));
        let drugs = self.fetch(&path, query).await?;
        debug!("Remote search for '{query}' returned {} drugs", drugs.len());

        drugs.into_iter().map(RemoteDrug::into_record).collect()
    }

    async fn catalog_size(&self) -> Result<usize, DrugLookupError> {
        Ok(self.fetch("/v1/clinic/drugs", "").await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_drug_validation() {
        let drug: RemoteDrug = serde_json::from_str(
            r#"{"id":"D1","name":"Paracetamol","type":"allopathy","strength":""}"#,
        )
        .unwrap();
        let record = drug.into_record().unwrap();
        assert_eq!(record.category(), Some("allopathy"));
        assert_eq!(record.strength(), None);

        let nameless: RemoteDrug = serde_json::from_str(r#"{"id":"D9"}"#).unwrap();
        assert!(matches!(
            nameless.into_record(),
            Err(DrugLookupError::ParseError { .. })
        ));
    }
}
