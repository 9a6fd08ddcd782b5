//! MediBridge Search - Drug lookup and catalogue import

#![deny(missing_docs)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Maps partial drug names to a bounded list of candidate records, either
//! through the MediBridge search endpoint or over a catalogue imported from a
//! delimited text file. A debouncer collapses rapid query changes into one
//! lookup per quiet period.

pub mod debounce;
pub mod errors;
pub mod import;
pub mod providers;
pub mod service;

// Re-export main types
pub use debounce::{DebouncedSearch, SearchSnapshot};
pub use errors::{DrugLookupError, ImportError};
pub use import::{ImportReport, parse_drug_csv};
pub use medibridge_core::DrugRecord;
pub use providers::{DevelopmentProvider, DrugSearchProvider, LocalProvider, RemoteProvider};
pub use service::DrugLookup;

/// Convenience type alias for Results with DrugLookupError.
pub type Result<T> = std::result::Result<T, DrugLookupError>;
