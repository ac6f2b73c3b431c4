//! ReBoot Core - Field Injection Refactoring Engine
//!
//! Mechanically rewrites a tree of Java source files, replacing
//! annotation-driven indirection with its explicit equivalent:
//! - `@Autowired` field injection becomes a synthesized constructor
//! - Mockito field-level test doubles (`@Mock`, `@Spy`, `@InjectMocks`)
//!   become constructor-supplied doubles with explicit initializers
//! - `@RequestMapping(method = ...)` becomes the dedicated shorthand
//!   (`@GetMapping`, `@PostMapping`, ...)
//! - web binding annotations drop arguments that just repeat the
//!   parameter name (`@PathVariable("id") Long id` -> `@PathVariable`)
//!
//! The pipeline is parse -> match -> plan -> rewrite -> emit. Rewrites are
//! surgical span edits against the original text; any region untouched by
//! an accepted plan is reproduced byte-for-byte.

#![warn(clippy::all)]

pub mod engine;
pub mod passes;
pub mod registry;
pub mod rewrite;
pub mod syntax;
pub mod walker;

// Re-export main types for convenience
pub use engine::{Run, RunReport};
pub use passes::{Pass, RewritePlan};
pub use registry::PassRegistry;
pub use syntax::SourceUnit;

use std::path::PathBuf;

/// Result type for refactoring operations
pub type Result<T> = std::result::Result<T, RebootError>;

/// Error types for refactoring operations. File-scoped I/O failures and
/// ambiguous declarations are diagnostics, not errors: the engine logs
/// them, counts them in the run report and moves on.
#[derive(Debug, thiserror::Error)]
pub enum RebootError {
    /// File text is not a well-formed compilation unit. Non-fatal to a
    /// run: the file is reported and left untouched.
    #[error("parse error in {path:?} at {line}:{column}")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    /// An exclusion name matched no registered pass. Fatal to the run,
    /// before any file is touched.
    #[error("unknown refactoring in exclusion list: `{0}`")]
    UnknownExclusion(String),

    /// Tree-sitter language error
    #[error("language error: {0}")]
    Language(String),
}

impl From<tree_sitter::LanguageError> for RebootError {
    fn from(err: tree_sitter::LanguageError) -> Self {
        RebootError::Language(format!("{err:?}"))
    }
}
