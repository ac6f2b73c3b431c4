//! Transformation passes
//!
//! Each pass recognizes one wiring idiom and produces a rewrite plan for
//! every match. The pass set is closed: one enum variant per shipped
//! idiom, dispatched through the uniform `scan` contract, so a missing
//! case is a compile error when a new idiom is added. Passes share no
//! mutable state; each one scans the source unit as it stands after the
//! previous pass's accepted plans were applied.

pub mod field_injection;
pub mod request_mappings;
pub mod test_doubles;
pub mod web_annotations;

pub use field_injection::FieldInjectionPass;
pub use request_mappings::RequestMappingsPass;
pub use test_doubles::TestDoubleInjectionPass;
pub use web_annotations::WebAnnotationsPass;

use crate::syntax::{Field, MarkerKind, SourceUnit, Span};

/// A single edit against a source unit's original text. Offsets always
/// refer to the text the plan was scanned against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert { at: usize, text: String },
    Remove { span: Span },
    Replace { span: Span, text: String },
}

impl Edit {
    pub fn start(&self) -> usize {
        match self {
            Edit::Insert { at, .. } => *at,
            Edit::Remove { span } | Edit::Replace { span, .. } => span.start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            Edit::Insert { at, .. } => *at,
            Edit::Remove { span } | Edit::Replace { span, .. } => span.end,
        }
    }
}

/// Precondition re-checked against the current declaration state
/// immediately before a plan is applied. A plan whose precondition no
/// longer holds is discarded, not an error.
#[derive(Debug, Clone)]
pub enum Precondition {
    /// The declaration must not already have a constructor taking exactly
    /// these parameter types.
    NoConstructorWith {
        declaration: String,
        param_types: Vec<String>,
    },
    /// The field must still carry the given marker.
    FieldHasMarker {
        declaration: String,
        field: String,
        kind: MarkerKind,
    },
    /// Some method with this name must still carry the given marker.
    MethodHasMarker {
        declaration: String,
        method: String,
        kind: MarkerKind,
    },
    /// Some parameter of the named method must still carry the given
    /// marker.
    ParamHasMarker {
        declaration: String,
        method: String,
        param: String,
        kind: MarkerKind,
    },
}

impl Precondition {
    pub fn holds(&self, unit: &SourceUnit) -> bool {
        match self {
            Precondition::NoConstructorWith {
                declaration,
                param_types,
            } => unit.declaration(declaration).is_some_and(|decl| {
                !decl.constructors().any(|c| &c.param_types == param_types)
            }),
            Precondition::FieldHasMarker {
                declaration,
                field,
                kind,
            } => unit.declaration(declaration).is_some_and(|decl| {
                decl.fields()
                    .any(|f| &f.name == field && f.has_marker(*kind))
            }),
            Precondition::MethodHasMarker {
                declaration,
                method,
                kind,
            } => unit.declaration(declaration).is_some_and(|decl| {
                decl.methods()
                    .any(|m| &m.name == method && m.markers.iter().any(|a| a.kind == *kind))
            }),
            Precondition::ParamHasMarker {
                declaration,
                method,
                param,
                kind,
            } => unit.declaration(declaration).is_some_and(|decl| {
                decl.methods().any(|m| {
                    &m.name == method
                        && m.params.iter().any(|p| {
                            &p.name == param && p.markers.iter().any(|a| a.kind == *kind)
                        })
                })
            }),
        }
    }
}

/// A proposed, validity-checked edit to one declaration, produced by
/// exactly one pass.
#[derive(Debug, Clone)]
pub struct RewritePlan {
    pub pass: &'static str,
    pub declaration: String,
    pub edits: Vec<Edit>,
    pub precondition: Precondition,
}

/// A declaration a pass detected but refused to rewrite.
#[derive(Debug, Clone)]
pub struct AmbiguityReport {
    pub pass: &'static str,
    pub declaration: String,
    pub reason: String,
}

/// Everything one pass found in one source unit.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub plans: Vec<RewritePlan>,
    pub ambiguities: Vec<AmbiguityReport>,
}

/// The closed set of shipped refactorings, in no particular order; the
/// registry fixes the run order.
#[derive(Debug)]
pub enum Pass {
    FieldInjection(FieldInjectionPass),
    TestDoubleInjection(TestDoubleInjectionPass),
    RequestMappings(RequestMappingsPass),
    WebAnnotations(WebAnnotationsPass),
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::FieldInjection(_) => FieldInjectionPass::NAME,
            Pass::TestDoubleInjection(_) => TestDoubleInjectionPass::NAME,
            Pass::RequestMappings(_) => RequestMappingsPass::NAME,
            Pass::WebAnnotations(_) => WebAnnotationsPass::NAME,
        }
    }

    /// Recognizes this pass's idiom across the unit and plans one rewrite
    /// per matching declaration.
    pub fn scan(&self, unit: &SourceUnit) -> ScanResult {
        match self {
            Pass::FieldInjection(pass) => pass.scan(unit),
            Pass::TestDoubleInjection(pass) => pass.scan(unit),
            Pass::RequestMappings(pass) => pass.scan(unit),
            Pass::WebAnnotations(pass) => pass.scan(unit),
        }
    }
}

/// Name shared by two or more marked fields, if any. Such a declaration
/// is ambiguous and must not be rewritten.
fn duplicate_marked_name(fields: &[&Field]) -> Option<String> {
    for (i, field) in fields.iter().enumerate() {
        if fields[i + 1..].iter().any(|other| other.name == field.name) {
            return Some(field.name.clone());
        }
    }
    None
}

/// First marked field carrying more than one injection-kind marker, if
/// any. Detected but unsupported.
fn overloaded_field<'a>(fields: &[&'a Field]) -> Option<&'a Field> {
    fields
        .iter()
        .find(|f| f.injection_markers().count() > 1)
        .copied()
}

/// Removal edits for a batch of import lines. When the removed lines are
/// the only thing between the top of the file (or a blank line) and a
/// following blank line, the now-redundant line break goes with them so
/// no stray blank line is left behind.
fn import_removal_edits(text: &str, spans: &[Span]) -> Vec<Edit> {
    let mut line_spans: Vec<Span> = spans.iter().map(|s| s.with_line_ending(text)).collect();
    line_spans.sort_by_key(|s| s.start);

    let bytes = text.as_bytes();
    for i in 0..line_spans.len() {
        let span = line_spans[i];
        if span.end >= bytes.len() || bytes[span.end] != b'\n' {
            continue;
        }
        // walk up through the contiguous removed lines above this one
        let mut start = span.start;
        let mut j = i;
        while j > 0 && line_spans[j - 1].end == start {
            j -= 1;
            start = line_spans[j].start;
        }
        let blank_above = start == 0
            || (start >= 2 && bytes[start - 1] == b'\n' && bytes[start - 2] == b'\n');
        if blank_above {
            line_spans[i].end += 1;
            break;
        }
    }

    line_spans
        .into_iter()
        .map(|span| Edit::Remove { span })
        .collect()
}

/// Insertion edit adding `import <path>;` alphabetically among the
/// imports that survive the plan's removals, after the package statement
/// when no import survives, at the top of the file as a last resort.
fn import_insertion_edit(unit: &SourceUnit, path: &str, removed: &[Span]) -> Edit {
    let line = format!("import {path};");
    let surviving: Vec<_> = unit
        .imports
        .iter()
        .filter(|i| !removed.contains(&i.span))
        .collect();

    if let Some(next) = surviving.iter().find(|i| i.path.as_str() > path) {
        return Edit::Insert {
            at: next.span.start,
            text: format!("{line}\n"),
        };
    }
    if let Some(last) = surviving.last() {
        return Edit::Insert {
            at: last.span.end,
            text: format!("\n{line}"),
        };
    }
    match unit.package_span {
        Some(package) => Edit::Insert {
            at: package.end,
            text: format!("\n\n{line}"),
        },
        None => Edit::Insert {
            at: 0,
            text: format!("{line}\n\n"),
        },
    }
}
