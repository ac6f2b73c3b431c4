//! Refactoring Engine
//!
//! Drives one run over a source tree: enumerate files, run the active
//! passes over each, write back the files that changed, and aggregate a
//! report. Files are independent, so they are processed in parallel;
//! the report is an order-free aggregate and thus deterministic for a
//! given tree.
//!
//! Within one file the passes run in registry order, and each pass scans
//! the text as it stands after the previous pass's accepted plans were
//! applied. Failures are file-scoped: a file that cannot be read, parsed
//! or written back is reported and left untouched while the rest of the
//! run proceeds. Only a configuration error aborts the run, and it does
//! so before any file is touched.

use crate::registry::PassRegistry;
use crate::rewrite;
use crate::syntax;
use crate::walker;
use crate::{Pass, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A configured run over one source tree.
pub struct Run {
    root: PathBuf,
    registry: PassRegistry,
    excluded: Vec<String>,
}

impl Run {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            registry: PassRegistry::builtin(),
            excluded: Vec::new(),
        }
    }

    /// Refactorings to leave out of this run, by name. An unknown name
    /// fails the run before any file is touched.
    pub fn exclude(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.excluded.extend(names);
        self
    }

    pub fn execute(&self) -> Result<RunReport> {
        let passes = self.registry.active_passes(&self.excluded)?;
        tracing::info!(root = %self.root.display(), passes = passes.len(), "starting run");

        let files: Vec<PathBuf> = walker::source_files(&self.root).collect();
        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|path| process_file(path, &passes))
            .collect();

        let mut report = RunReport {
            files_scanned: files.len(),
            ..RunReport::default()
        };
        for outcome in outcomes {
            report.files_changed += usize::from(outcome.changed);
            report.parse_failures += usize::from(outcome.parse_failed);
            report.io_failures += usize::from(outcome.io_failed);
            report.ambiguities += outcome.ambiguities;
        }
        tracing::info!(
            scanned = report.files_scanned,
            changed = report.files_changed,
            "run finished"
        );
        Ok(report)
    }
}

/// Aggregate outcome of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub parse_failures: usize,
    pub io_failures: usize,
    pub ambiguities: usize,
}

#[derive(Default)]
struct FileOutcome {
    changed: bool,
    parse_failed: bool,
    io_failed: bool,
    ambiguities: usize,
}

/// Runs every active pass over one file, re-parsing between passes so
/// each one sees the previous pass's result. The file is written back
/// once, and only when some plan changed it. Read, parse and write
/// failures are all file-scoped: reported, counted, never fatal to the
/// run.
fn process_file(path: &Path, passes: &[&Pass]) -> FileOutcome {
    let original = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable file skipped");
            return FileOutcome {
                io_failed: true,
                ..FileOutcome::default()
            };
        }
    };
    let mut text = original.clone();
    let mut ambiguities = 0;

    for pass in passes {
        let unit = match syntax::parse_source(path, &text) {
            Ok(unit) => unit,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "file left untouched");
                return FileOutcome {
                    parse_failed: true,
                    ambiguities,
                    ..FileOutcome::default()
                };
            }
        };
        let scan = pass.scan(&unit);
        for ambiguity in &scan.ambiguities {
            tracing::warn!(
                path = %path.display(),
                pass = ambiguity.pass,
                declaration = %ambiguity.declaration,
                reason = %ambiguity.reason,
                "ambiguous idiom, declaration left untouched"
            );
        }
        ambiguities += scan.ambiguities.len();
        if let Some(rewritten) = rewrite::apply(&unit, &scan.plans) {
            text = rewritten;
        }
    }

    let changed = text != original;
    if changed {
        if let Err(e) = fs::write(path, &text) {
            tracing::warn!(path = %path.display(), error = %e, "could not write file back");
            return FileOutcome {
                io_failed: true,
                ambiguities,
                ..FileOutcome::default()
            };
        }
        tracing::debug!(path = %path.display(), "rewritten");
    }
    FileOutcome {
        changed,
        ambiguities,
        ..FileOutcome::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree_reports_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = Run::new(dir.path()).execute().expect("run");
        assert_eq!(report, RunReport::default());
    }

    #[test]
    fn test_unknown_exclusion_fails_before_touching_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = "public class A {\n    @Autowired\n    private B b;\n}\n";
        let path = dir.path().join("A.java");
        fs::write(&path, source).expect("write");

        let err = Run::new(dir.path())
            .exclude(["no-such-refactoring".to_string()])
            .execute()
            .unwrap_err();
        assert!(matches!(err, crate::RebootError::UnknownExclusion(_)));
        assert_eq!(fs::read_to_string(&path).expect("read"), source);
    }

    #[test]
    fn test_unparsable_file_is_counted_and_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let broken = "public class {{{ not java";
        let path = dir.path().join("Broken.java");
        fs::write(&path, broken).expect("write");

        let report = Run::new(dir.path()).execute().expect("run");
        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.files_changed, 0);
        assert_eq!(report.parse_failures, 1);
        assert_eq!(fs::read_to_string(&path).expect("read"), broken);
    }

    #[test]
    fn test_clean_file_is_not_rewritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = "public class A {\n    private final B b;\n\n    public A(B b) {\n        this.b = b;\n    }\n}\n";
        let path = dir.path().join("A.java");
        fs::write(&path, source).expect("write");

        let report = Run::new(dir.path()).execute().expect("run");
        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.files_changed, 0);
        assert_eq!(fs::read_to_string(&path).expect("read"), source);
    }
}
