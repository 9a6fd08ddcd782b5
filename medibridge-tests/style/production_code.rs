//! Production Code Enforcement
//!
//! Production code must not silence dead code warnings and must propagate
//! errors instead of panicking on them. Everything from a file's first
//! `#[cfg(test)]` onwards is test code and exempt, as are whole test-only files.

use std::fs;
use std::path::{Path, PathBuf};

/// Crate directories scanned, relative to the workspace root.
const CRATE_PREFIX: &str = "medibridge-";

/// Test-only crates and files.
const EXEMPT: &[&str] = &["medibridge-tests", "providers/mock.rs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    DeadCodeAllowed,
    Panics,
}

impl Rule {
    fn matches(self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.starts_with("//") {
            return false;
        }
        match self {
            Rule::DeadCodeAllowed => trimmed.contains("#[allow(") && trimmed.contains("dead_code"),
            Rule::Panics => trimmed.contains(".unwrap()") || trimmed.contains(".expect("),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Rule::DeadCodeAllowed => "#[allow(dead_code)]",
            Rule::Panics => "unwrap/expect",
        }
    }
}

/// A rule violation found in production code
#[derive(Debug)]
struct Violation {
    file_path: String,
    line_number: usize,
    rule: Rule,
    context: String,
}

/// Checker for production code violations
struct ProductionCodeChecker {
    violations: Vec<Violation>,
    files_checked: usize,
}

impl ProductionCodeChecker {
    fn new() -> Self {
        Self {
            violations: Vec::new(),
            files_checked: 0,
        }
    }

    /// Source files of every workspace crate
    fn find_rust_files(root: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            let is_crate = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with(CRATE_PREFIX));
            if path.is_dir() && is_crate {
                Self::find_rust_files_recursive(&path.join("src"), &mut files)?;
            }
        }
        files.sort();
        Ok(files)
    }

    fn find_rust_files_recursive(
        dir: &Path,
        files: &mut Vec<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !dir.is_dir() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::find_rust_files_recursive(&path, files)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
        Ok(())
    }

    fn is_exempt(path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        EXEMPT.iter().any(|exempt| path_str.contains(exempt))
    }

    /// Checks production lines of one file's contents
    fn check_source(&mut self, file_path: &str, content: &str) {
        self.files_checked += 1;

        for (index, line) in content.lines().enumerate() {
            if line.trim_start().starts_with("#[cfg(test)]") {
                break;
            }
            for rule in [Rule::DeadCodeAllowed, Rule::Panics] {
                if rule.matches(line) {
                    self.violations.push(Violation {
                        file_path: file_path.to_string(),
                        line_number: index + 1,
                        rule,
                        context: line.trim().to_string(),
                    });
                }
            }
        }
    }

    fn check_workspace(&mut self, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
        for file in Self::find_rust_files(root)? {
            if Self::is_exempt(&file) {
                continue;
            }
            let content = fs::read_to_string(&file)?;
            self.check_source(&file.to_string_lossy(), &content);
        }
        Ok(())
    }

    /// Report violations and return whether the check passed
    fn report_violations(&self) -> bool {
        if self.violations.is_empty() {
            println!(
                "Production code check: {} files checked, no violations found",
                self.files_checked
            );
            return true;
        }

        println!("Production code violations found:");
        for violation in &self.violations {
            println!(
                "{}:{} [{}]\n  {}",
                violation.file_path,
                violation.line_number,
                violation.rule.describe(),
                violation.context
            );
        }
        println!(
            "Found {} violation(s) in {} file(s) checked",
            self.violations.len(),
            self.files_checked
        );
        println!("Remove unused code and propagate errors with `?` instead of panicking.");

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exempt_paths() {
        assert!(ProductionCodeChecker::is_exempt(Path::new(
            "../medibridge-tests/integration/mock_api.rs"
        )));
        assert!(ProductionCodeChecker::is_exempt(Path::new(
            "../medibridge-search/src/providers/mock.rs"
        )));
        assert!(!ProductionCodeChecker::is_exempt(Path::new(
            "../medibridge-search/src/providers/remote.rs"
        )));
        assert!(!ProductionCodeChecker::is_exempt(Path::new(
            "../medibridge-core/src/api.rs"
        )));
    }

    #[test]
    fn test_violations_before_test_module_only() {
        let mut checker = ProductionCodeChecker::new();
        let source = r#"
#[allow(dead_code)]
fn unused() {}

fn load() -> String {
    // a comment mentioning .unwrap() is fine
    std::fs::read_to_string("x").unwrap()
}

#[cfg(test)]
mod tests {
    #[allow(dead_code)]
    fn helper() { None::<u8>.expect("test code may panic"); }
}
"#;

        checker.check_source("sample.rs", source);

        let found: Vec<_> = checker
            .violations
            .iter()
            .map(|v| (v.line_number, v.rule))
            .collect();
        assert_eq!(found, vec![(2, Rule::DeadCodeAllowed), (7, Rule::Panics)]);
    }

    #[test]
    fn production_code_enforcement() {
        let mut checker = ProductionCodeChecker::new();

        checker
            .check_workspace(Path::new(".."))
            .expect("Failed to check workspace");

        assert!(checker.files_checked > 0, "No workspace sources found");
        assert!(
            checker.report_violations(),
            "Production code violations found - see output above"
        );
    }
}
