//! Test-Double-Injection-to-Constructor pass
//!
//! Rewrites field-level Mockito wiring into explicit construction:
//! `@Mock` fields get `Mockito.mock(...)` initializers, `@Spy` fields
//! keep their default expression wrapped in `Mockito.spy(...)`, and the
//! `@InjectMocks` target-under-test is constructed directly from the
//! other marked double fields, in their declared order.
//!
//! Deep-stub doubles (`@Mock(answer = ...)`) have no counterpart in a
//! constructor signature and degenerate to the plain double mapping.

use super::{
    duplicate_marked_name, import_insertion_edit, import_removal_edits, overloaded_field,
    AmbiguityReport, Edit, Precondition, RewritePlan, ScanResult,
};
use crate::syntax::{Field, MarkerKind, SourceUnit};

/// Import added when a `Mockito.` call is synthesized.
pub const MOCKITO_IMPORT: &str = "org.mockito.Mockito";

/// Imports removed once the last double marker in a unit is gone.
const DOUBLE_IMPORTS: [&str; 3] = [
    "org.mockito.InjectMocks",
    "org.mockito.Mock",
    "org.mockito.Spy",
];

#[derive(Debug, Default)]
pub struct TestDoubleInjectionPass;

impl TestDoubleInjectionPass {
    pub const NAME: &'static str = "test-double-injection-to-constructor";

    pub fn scan(&self, unit: &SourceUnit) -> ScanResult {
        let mut result = ScanResult::default();
        let mut needs_mockito = false;
        let mut markers_removed = 0;

        for decl in &unit.declarations {
            let marked: Vec<&Field> = decl
                .fields()
                .filter(|f| f.markers.iter().any(|m| is_double_marker(m.kind)))
                .collect();
            if marked.is_empty() {
                continue;
            }

            if let Some(field) = overloaded_field(&marked) {
                result.ambiguities.push(AmbiguityReport {
                    pass: Self::NAME,
                    declaration: decl.name.clone(),
                    reason: format!("field `{}` carries more than one injection marker", field.name),
                });
                continue;
            }
            if let Some(name) = duplicate_marked_name(&marked) {
                result.ambiguities.push(AmbiguityReport {
                    pass: Self::NAME,
                    declaration: decl.name.clone(),
                    reason: format!("multiple marked fields named `{name}`"),
                });
                continue;
            }
            let targets = marked
                .iter()
                .filter(|f| f.has_marker(MarkerKind::InjectTarget))
                .count();
            if targets > 1 {
                result.ambiguities.push(AmbiguityReport {
                    pass: Self::NAME,
                    declaration: decl.name.clone(),
                    reason: "more than one `@InjectMocks` target".to_string(),
                });
                continue;
            }

            // The doubles, in declared order, become the target's
            // constructor arguments.
            let doubles: Vec<&Field> = marked
                .iter()
                .filter(|f| !f.has_marker(MarkerKind::InjectTarget))
                .copied()
                .collect();

            let mut edits = Vec::new();
            for field in &marked {
                let marker = match field.markers.iter().find(|m| is_double_marker(m.kind)) {
                    Some(marker) => marker,
                    None => continue,
                };
                edits.push(Edit::Remove {
                    span: marker.span.with_trailing_whitespace(&unit.text),
                });
                markers_removed += 1;

                match marker.kind {
                    MarkerKind::TestDouble | MarkerKind::DeepStubTestDouble => {
                        needs_mockito = true;
                        edits.push(initializer_edit(
                            field,
                            &unit.text,
                            format!("Mockito.mock({}.class)", field.raw_type()),
                        ));
                    }
                    MarkerKind::Spy => {
                        needs_mockito = true;
                        let expr = match field.initializer {
                            // the in-place default stays as the spied instance
                            Some(init) => format!("Mockito.spy({})", init.text(&unit.text)),
                            None => format!("Mockito.spy(new {}())", field.ty),
                        };
                        edits.push(initializer_edit(field, &unit.text, expr));
                    }
                    MarkerKind::InjectTarget => {
                        let args = doubles
                            .iter()
                            .map(|f| f.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ");
                        edits.push(initializer_edit(
                            field,
                            &unit.text,
                            format!("new {}({args})", field.ty),
                        ));
                    }
                    _ => {}
                }
            }

            let pivot = &marked[0];
            let pivot_kind = pivot
                .injection_markers()
                .next()
                .map(|m| m.kind)
                .unwrap_or(MarkerKind::TestDouble);
            result.plans.push(RewritePlan {
                pass: Self::NAME,
                declaration: decl.name.clone(),
                edits,
                precondition: Precondition::FieldHasMarker {
                    declaration: decl.name.clone(),
                    field: pivot.name.clone(),
                    kind: pivot_kind,
                },
            });
        }

        if !result.plans.is_empty() {
            let mut removed_imports = Vec::new();
            if markers_removed == double_marker_count(unit) {
                removed_imports = unit
                    .imports
                    .iter()
                    .filter(|i| DOUBLE_IMPORTS.contains(&i.path.as_str()))
                    .map(|i| i.span)
                    .collect();
                result.plans[0]
                    .edits
                    .extend(import_removal_edits(&unit.text, &removed_imports));
            }
            if needs_mockito && !unit.imports.iter().any(|i| i.covers(MOCKITO_IMPORT)) {
                result.plans[0]
                    .edits
                    .push(import_insertion_edit(unit, MOCKITO_IMPORT, &removed_imports));
            }
        }

        result
    }
}

fn is_double_marker(kind: MarkerKind) -> bool {
    matches!(
        kind,
        MarkerKind::TestDouble
            | MarkerKind::DeepStubTestDouble
            | MarkerKind::Spy
            | MarkerKind::InjectTarget
    )
}

fn double_marker_count(unit: &SourceUnit) -> usize {
    unit.declarations
        .iter()
        .flat_map(|decl| decl.fields())
        .map(|f| f.markers.iter().filter(|m| is_double_marker(m.kind)).count())
        .sum()
}

/// Sets or replaces the field's initializer expression.
fn initializer_edit(field: &Field, text: &str, expr: String) -> Edit {
    match field.initializer {
        Some(span) => Edit::Replace { span, text: expr },
        None => Edit::Insert {
            at: field.name_span.end,
            text: format!(" = {expr}"),
        },
    }
}
