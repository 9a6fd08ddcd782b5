//! In-memory catalogue provider fed by delimited-text imports.

use std::sync::Arc;

use async_trait::async_trait;
use medibridge_core::DrugRecord;
use parking_lot::RwLock;
use tracing::info;

use super::{DrugSearchProvider, filter_by_name};
use crate::errors::{DrugLookupError, ImportError};
use crate::import::{ImportReport, parse_drug_csv};

/// Searches a client-held drug list.
///
/// Clones share the same list, so an import through one handle is visible to
/// lookups through another.
#[derive(Debug, Clone, Default)]
pub struct LocalProvider {
    drugs: Arc<RwLock<Vec<DrugRecord>>>,
}

impl LocalProvider {
    /// Creates an empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalogue from existing records, e.g. a cached session list.
    pub fn from_records(drugs: Vec<DrugRecord>) -> Self {
        Self {
            drugs: Arc::new(RwLock::new(drugs)),
        }
    }

    /// Parses `text` and replaces the whole list with its rows.
    ///
    /// The list is only touched once the file has parsed, so a rejected
    /// import leaves the previous catalogue in place.
    ///
    /// # Errors
    ///
    /// - `ImportError::Empty` - If the text has no header line
    /// - `ImportError::MissingNameColumn` - If the header has no `name` column
    pub fn import_csv(
        &self,
        text: &str,
        default_category: &str,
    ) -> Result<ImportReport, ImportError> {
        let report = parse_drug_csv(text, default_category)?;
        *self.drugs.write() = report.drugs.clone();
        info!("Local catalogue replaced with {} drugs", report.drugs.len());
        Ok(report)
    }

    /// Copy of the current list, for persisting.
    pub fn records(&self) -> Vec<DrugRecord> {
        self.drugs.read().clone()
    }

    /// Number of drugs currently held.
    pub fn len(&self) -> usize {
        self.drugs.read().len()
    }

    /// True if nothing has been imported.
    pub fn is_empty(&self) -> bool {
        self.drugs.read().is_empty()
    }
}

#[async_trait]
impl DrugSearchProvider for LocalProvider {
    async fn search_drugs(&self, query: &str) -> Result<Vec<DrugRecord>, DrugLookupError> {
        Ok(filter_by_name(self.drugs.read().iter(), query))
    }

    async fn catalog_size(&self) -> Result<usize, DrugLookupError> {
        Ok(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejected_import_keeps_previous_list() {
        let provider = LocalProvider::new();
        provider
            .import_csv("id,name,type\nD1,Paracetamol,allopathy\n", "allopathy")
            .unwrap();

        let result = provider.import_csv("id,title\nD2,Cetirizine\n", "allopathy");

        assert!(matches!(result, Err(ImportError::MissingNameColumn { .. })));
        assert_eq!(provider.len(), 1);
        assert_eq!(provider.records()[0].name(), "Paracetamol");
    }

    #[tokio::test]
    async fn test_search_preserves_source_order() {
        let provider = LocalProvider::from_records(vec![
            DrugRecord::new("D1", "Cetirizine", None, None),
            DrugRecord::new("D2", "Paracetamol", None, None),
            DrugRecord::new("D3", "Levocetirizine", None, None),
        ]);

        let results = provider.search_drugs("CETIR").await.unwrap();
        let ids: Vec<_> = results.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["D1", "D3"]);
        assert_eq!(provider.catalog_size().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_clones_share_catalogue() {
        let provider = LocalProvider::new();
        let handle = provider.clone();

        provider
            .import_csv("name\nOmeprazole\n", "allopathy")
            .unwrap();

        assert_eq!(handle.len(), 1);
        assert_eq!(handle.records()[0].id(), "drug-1");
    }
}
