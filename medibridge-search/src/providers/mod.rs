//! Provider implementations for drug search.

use async_trait::async_trait;
use medibridge_core::DrugRecord;

use crate::errors::DrugLookupError;

pub mod development;
pub mod local;
pub mod mock;
pub mod remote;

pub use development::DevelopmentProvider;
pub use local::LocalProvider;
#[cfg(test)]
pub use mock::MockProvider;
pub use remote::RemoteProvider;

/// Trait for drug search backends.
///
/// Implementations provide drug lookup through different sources (the
/// MediBridge API, an imported catalogue, built-in development data, mock
/// providers for testing). Length checks and result truncation are applied by
/// [`crate::DrugLookup`], not by providers.
#[async_trait]
pub trait DrugSearchProvider: Send + Sync + std::fmt::Debug {
    /// Returns drugs whose name matches `query`, in source order.
    ///
    /// # Errors
    /// - `DrugLookupError::SearchFailed` - Search operation failed
    /// - `DrugLookupError::NetworkError` - Network connectivity issues
    /// - `DrugLookupError::Unauthorized` - Session token rejected
    /// - `DrugLookupError::ParseError` - Response did not contain valid records
    async fn search_drugs(&self, query: &str) -> Result<Vec<DrugRecord>, DrugLookupError>;

    /// Number of drugs the source can offer.
    ///
    /// # Errors
    /// Same as [`DrugSearchProvider::search_drugs`].
    async fn catalog_size(&self) -> Result<usize, DrugLookupError>;
}

/// Keeps records whose name contains `query` case-insensitively, preserving order.
pub(crate) fn filter_by_name<'a>(
    drugs: impl IntoIterator<Item = &'a DrugRecord>,
    query: &str,
) -> Vec<DrugRecord> {
    let needle = query.to_lowercase();
    drugs
        .into_iter()
        .filter(|drug| drug.name_contains(&needle))
        .cloned()
        .collect()
}
