//! Mock provider implementation for testing.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use medibridge_core::DrugRecord;
#[cfg(test)]
use parking_lot::Mutex;

#[cfg(test)]
use super::{DrugSearchProvider, filter_by_name};
#[cfg(test)]
use crate::errors::DrugLookupError;

/// Mock provider for testing.
///
/// Records every query it receives, can be told to fail, and can delay the
/// response for specific queries to reproduce out-of-order completions.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    drugs: Vec<DrugRecord>,
    fail: bool,
    delays: HashMap<String, Duration>,
    queries: Arc<Mutex<Vec<String>>>,
}

#[cfg(test)]
impl MockProvider {
    /// Creates a mock serving `drugs`.
    pub fn new(drugs: Vec<DrugRecord>) -> Self {
        Self {
            drugs,
            ..Default::default()
        }
    }

    /// Creates a mock whose lookups always fail with a network error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Delays the answer to `query` by `delay`.
    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    /// Shared log of received queries; clone before boxing the provider.
    pub fn query_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.queries)
    }
}

#[cfg(test)]
#[async_trait]
impl DrugSearchProvider for MockProvider {
    async fn search_drugs(&self, query: &str) -> Result<Vec<DrugRecord>, DrugLookupError> {
        self.queries.lock().push(query.to_string());

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }

        if self.fail {
            return Err(DrugLookupError::NetworkError {
                reason: "mock network failure".to_string(),
            });
        }

        Ok(filter_by_name(&self.drugs, query))
    }

    async fn catalog_size(&self) -> Result<usize, DrugLookupError> {
        Ok(self.drugs.len())
    }
}
