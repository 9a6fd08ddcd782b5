//! Development provider with a small built-in formulary.

use async_trait::async_trait;
use medibridge_core::DrugRecord;

use super::{DrugSearchProvider, filter_by_name};
use crate::errors::DrugLookupError;

const FORMULARY: &[(&str, &str, &str, &str)] = &[
    ("D1", "Paracetamol", "allopathy", "500 mg"),
    ("D2", "Cetirizine", "allopathy", "10 mg"),
    ("D3", "Amoxicillin", "allopathy", "500 mg"),
    ("D4", "Azithromycin", "allopathy", "250 mg"),
    ("D5", "Ibuprofen", "allopathy", "400 mg"),
    ("D6", "Omeprazole", "allopathy", "20 mg"),
    ("D7", "Metformin", "allopathy", "500 mg"),
    ("D8", "Amlodipine", "allopathy", "5 mg"),
    ("D9", "Atorvastatin", "allopathy", "10 mg"),
    ("D10", "Pantoprazole", "allopathy", "40 mg"),
    ("D11", "Levocetirizine", "allopathy", "5 mg"),
    ("D12", "Paracetamol Syrup", "allopathy", "120 mg/5 mL"),
    ("D13", "Ashwagandha Churna", "ayurveda", "3 g"),
    ("D14", "Arnica Montana", "homeopathy", "30C"),
];

/// Serves lookups from built-in sample data, without external calls.
#[derive(Debug)]
pub struct DevelopmentProvider {
    drugs: Vec<DrugRecord>,
}

impl Default for DevelopmentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DevelopmentProvider {
    /// Creates the provider with the built-in formulary.
    pub fn new() -> Self {
        let drugs = FORMULARY
            .iter()
            .map(|(id, name, category, strength)| {
                DrugRecord::new(
                    *id,
                    *name,
                    Some(category.to_string()),
                    Some(strength.to_string()),
                )
            })
            .collect();
        Self { drugs }
    }
}

#[async_trait]
impl DrugSearchProvider for DevelopmentProvider {
    async fn search_drugs(&self, query: &str) -> Result<Vec<DrugRecord>, DrugLookupError> {
        Ok(filter_by_name(&self.drugs, query))
    }

    async fn catalog_size(&self) -> Result<usize, DrugLookupError> {
        Ok(self.drugs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_development_formulary_search() {
        let provider = DevelopmentProvider::new();

        let results = provider.search_drugs("para").await.unwrap();
        let names: Vec<_> = results.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["Paracetamol", "Paracetamol Syrup"]);
        assert_eq!(provider.catalog_size().await.unwrap(), FORMULARY.len());
    }
}
