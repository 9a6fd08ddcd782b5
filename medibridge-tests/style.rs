//! Style Enforcement Tests
//!
//! Scans the workspace crates for patterns clippy does not catch on its own.
//!
//! - `production_code` - No `#[allow(dead_code)]` and no `unwrap`/`expect`
//!   outside test code

#[path = "style/production_code.rs"]
mod production_code;
