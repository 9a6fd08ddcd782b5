//! Drug records shared by lookup, import and prescription drafting.

use serde::{Deserialize, Serialize};

/// A named medication entity selectable into a prescription.
///
/// Records are immutable once constructed. The serialized form uses the
/// server's field names, so `category` travels as `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugRecord {
    id: String,
    name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strength: Option<String>,
}

impl DrugRecord {
    /// Creates a record. Blank optional fields are normalized to `None`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: Option<String>,
        strength: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: non_blank(category),
            strength: non_blank(strength),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn strength(&self) -> Option<&str> {
        self.strength.as_deref()
    }

    /// Case-insensitive substring match on the name.
    ///
    /// `needle_lower` must already be lowercased so callers filtering a whole
    /// list only lowercase the query once.
    pub fn name_contains(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
    }

    /// One-line label used in result listings, e.g. `Paracetamol (allopathy, 500 mg)`.
    pub fn display_label(&self) -> String {
        match (self.category(), self.strength()) {
            (Some(category), Some(strength)) => format!("{} ({category}, {strength})", self.name),
            (Some(category), None) => format!("{} ({category})", self.name),
            (None, Some(strength)) => format!("{} ({strength})", self.name),
            (None, None) => self.name.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_optionals_become_none() {
        let drug = DrugRecord::new("D1", "Paracetamol", Some("  ".to_string()), None);
        assert_eq!(drug.category(), None);
        assert_eq!(drug.strength(), None);
        assert_eq!(drug.display_label(), "Paracetamol");
    }

    #[test]
    fn test_wire_format_uses_type_field() {
        let drug = DrugRecord::new(
            "D1",
            "Paracetamol",
            Some("allopathy".to_string()),
            Some("500 mg".to_string()),
        );
        let json = serde_json::to_value(&drug).unwrap();
        assert_eq!(json["type"], "allopathy");
        assert_eq!(json["strength"], "500 mg");

        let parsed: DrugRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, drug);
    }

    #[test]
    fn test_name_contains_is_case_insensitive() {
        let drug = DrugRecord::new("D2", "Cetirizine", None, None);
        assert!(drug.name_contains("tiri"));
        assert!(drug.name_contains("cet"));
        assert!(!drug.name_contains("para"));
    }
}
