//! Catalogue import feeding local lookups.

use medibridge_core::config::SearchConfig;
use medibridge_search::{DrugLookup, DrugSearchProvider, ImportError, LocalProvider};
use proptest::prelude::*;

const DEFAULT_CATEGORY: &str = "allopathy";

#[tokio::test]
async fn test_imported_catalogue_is_searchable() {
    let catalogue = LocalProvider::new();
    let report = catalogue
        .import_csv(
            "\"id\",\"name\",\"type\",\"strength\"\n\
             \"A1\",\"Ashwagandha\",\"ayurveda\",\"300 mg\"\n\
             \"\",\"Arnica Montana\",\"homeopathy\",\"30C\"\n\
             \"A3\",\"\",\"ayurveda\",\"\"\n",
            DEFAULT_CATEGORY,
        )
        .unwrap();
    assert_eq!(report.drugs.len(), 2);
    assert_eq!(report.skipped_rows, 1);

    let lookup = DrugLookup::local(catalogue.clone(), &SearchConfig::default());
    let results = lookup.search("ar").await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), "drug-2");
    assert_eq!(results[0].category(), Some("homeopathy"));
    assert_eq!(lookup.catalog_size().await.unwrap(), 2);
}

#[tokio::test]
async fn test_rejected_import_keeps_previous_catalogue() {
    let catalogue = LocalProvider::new();
    catalogue
        .import_csv("name\nParacetamol\n", DEFAULT_CATEGORY)
        .unwrap();

    let result = catalogue.import_csv("id,title\nD1,Ibuprofen\n", DEFAULT_CATEGORY);

    assert_eq!(
        result,
        Err(ImportError::MissingNameColumn {
            header: "id,title".to_string()
        })
    );
    assert_eq!(catalogue.len(), 1);
    let matches = catalogue.search_drugs("para").await.unwrap();
    assert_eq!(matches[0].name(), "Paracetamol");
}

proptest! {
    #[test]
    fn prop_import_keeps_every_named_row_in_order(
        names in proptest::collection::vec("[A-Za-z][A-Za-z0-9 ]{0,12}", 1..40),
    ) {
        let mut text = String::from("id,name\n");
        for (index, name) in names.iter().enumerate() {
            text.push_str(&format!("P{index},{name}\n"));
        }

        let catalogue = LocalProvider::new();
        let report = catalogue.import_csv(&text, DEFAULT_CATEGORY).unwrap();

        prop_assert_eq!(report.skipped_rows, 0);
        prop_assert_eq!(catalogue.len(), names.len());
        for (index, (drug, name)) in report.drugs.iter().zip(&names).enumerate() {
            let expected_id = format!("P{index}");
            prop_assert_eq!(drug.id(), expected_id.as_str());
            prop_assert_eq!(drug.name(), name.trim());
            prop_assert_eq!(drug.category(), Some(DEFAULT_CATEGORY));
        }
    }
}
