//! Drug lookup service.
//!
//! Wraps a [`DrugSearchProvider`] with the rules every lookup follows: short
//! queries never reach the provider, results are truncated in source order,
//! and provider failures degrade to an empty list with a logged warning.

use medibridge_core::config::SearchConfig;
use medibridge_core::{ApiClient, DrugRecord, Session};
use tracing::{debug, warn};

use crate::errors::DrugLookupError;
use crate::providers::{DevelopmentProvider, DrugSearchProvider, LocalProvider, RemoteProvider};

/// Bounded drug lookup over a single provider.
#[derive(Debug)]
pub struct DrugLookup {
    provider: Box<dyn DrugSearchProvider>,
    min_query_chars: usize,
    max_results: usize,
}

impl DrugLookup {
    /// Creates a lookup over any provider.
    pub fn new(provider: Box<dyn DrugSearchProvider>, config: &SearchConfig) -> Self {
        Self {
            provider,
            min_query_chars: config.min_query_chars,
            max_results: config.max_results,
        }
    }

    /// Creates a lookup against the MediBridge API using the session's token.
    pub fn remote(api: ApiClient, session: &Session, config: &SearchConfig) -> Self {
        Self::new(Box::new(RemoteProvider::new(api, session)), config)
    }

    /// Creates a lookup over an imported catalogue.
    pub fn local(catalogue: LocalProvider, config: &SearchConfig) -> Self {
        Self::new(Box::new(catalogue), config)
    }

    /// Creates a lookup over the built-in development formulary.
    pub fn development(config: &SearchConfig) -> Self {
        Self::new(Box::new(DevelopmentProvider::new()), config)
    }

    /// True if `query` is long enough to be looked up.
    pub fn is_searchable(&self, query: &str) -> bool {
        query.chars().count() >= self.min_query_chars
    }

    /// Looks up `query`, returning at most `max_results` records.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn search(&self, query: &str) -> Vec<DrugRecord> {
        match self.try_search(query).await {
            Ok(drugs) => drugs,
            Err(e) => {
                warn!("Drug search for '{query}' failed: {e}");
                Vec::new()
            }
        }
    }

    /// Looks up `query`, surfacing provider failures.
    ///
    /// # Errors
    /// - `DrugLookupError::SearchFailed` - Server rejected the search
    /// - `DrugLookupError::NetworkError` - Network connectivity issues
    /// - `DrugLookupError::Unauthorized` - Session token rejected
    /// - `DrugLookupError::ParseError` - Response did not contain valid records
    pub async fn try_search(&self, query: &str) -> Result<Vec<DrugRecord>, DrugLookupError> {
        if !self.is_searchable(query) {
            debug!("Query '{query}' below {} chars, skipping", self.min_query_chars);
            return Ok(Vec::new());
        }

        let mut drugs = self.provider.search_drugs(query).await?;
        drugs.truncate(self.max_results);
        Ok(drugs)
    }

    /// Number of drugs available from the provider.
    ///
    /// # Errors
    /// Same as [`DrugLookup::try_search`].
    pub async fn catalog_size(&self) -> Result<usize, DrugLookupError> {
        self.provider.catalog_size().await
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::providers::MockProvider;

    fn catalogue(names: &[&str]) -> Vec<DrugRecord> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| DrugRecord::new(format!("D{}", i + 1), *name, None, None))
            .collect()
    }

    #[tokio::test]
    async fn test_short_query_never_reaches_provider() {
        let mock = MockProvider::new(catalogue(&["Paracetamol"]));
        let log = mock.query_log();
        let lookup = DrugLookup::new(Box::new(mock), &SearchConfig::default());

        assert!(lookup.search("").await.is_empty());
        assert!(lookup.search("p").await.is_empty());
        assert!(lookup.search("é").await.is_empty());
        assert!(log.lock().is_empty());

        assert_eq!(lookup.search("pa").await.len(), 1);
        assert_eq!(*log.lock(), vec!["pa".to_string()]);
    }

    #[tokio::test]
    async fn test_results_truncated_in_source_order() {
        let names: Vec<String> = (1..=15).map(|i| format!("Vitamin B{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let lookup = DrugLookup::new(
            Box::new(MockProvider::new(catalogue(&refs))),
            &SearchConfig::default(),
        );

        let results = lookup.search("vitamin").await;
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].name(), "Vitamin B1");
        assert_eq!(results[9].name(), "Vitamin B10");
    }

    #[tokio::test]
    async fn test_failure_degrades_to_empty_result() {
        let lookup = DrugLookup::new(Box::new(MockProvider::failing()), &SearchConfig::default());

        assert!(lookup.search("para").await.is_empty());
        assert!(matches!(
            lookup.try_search("para").await,
            Err(DrugLookupError::NetworkError { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_results_are_bounded_ordered_matches(
            names in proptest::collection::vec("[a-cA-C]{1,6}", 0..30),
            query in "[a-cA-C]{0,3}",
        ) {
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let drugs = catalogue(&refs);
            let lookup = DrugLookup::local(
                LocalProvider::from_records(drugs.clone()),
                &SearchConfig::default(),
            );

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let results = runtime.block_on(lookup.search(&query));

            if query.chars().count() < 2 {
                prop_assert!(results.is_empty());
            } else {
                let expected: Vec<DrugRecord> = drugs
                    .iter()
                    .filter(|d| d.name().to_lowercase().contains(&query.to_lowercase()))
                    .take(10)
                    .cloned()
                    .collect();
                prop_assert_eq!(results, expected);
            }
        }
    }
}
