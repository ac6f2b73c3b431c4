//! Rewrite Applier / Emitter
//!
//! Applies the accepted plans for one source unit to its original text.
//! Edits are applied back-to-front so earlier offsets stay valid, and
//! every byte outside an edited span is carried over verbatim. Plans are
//! re-validated right before application; a plan invalidated by an
//! earlier one is dropped, not an error.

use crate::passes::{Edit, RewritePlan};
use crate::syntax::SourceUnit;
use std::cmp::Reverse;

/// Applies the plans accepted for `unit`, in the order their passes ran.
/// Returns the new text, or `None` when no plan survived validation.
pub fn apply(unit: &SourceUnit, plans: &[RewritePlan]) -> Option<String> {
    let mut accepted: Vec<&RewritePlan> = Vec::new();
    for plan in plans {
        if !plan.precondition.holds(unit) {
            tracing::debug!(
                pass = plan.pass,
                declaration = %plan.declaration,
                "plan precondition no longer holds, dropping"
            );
            continue;
        }
        if accepted.iter().any(|earlier| conflicts(earlier, plan)) {
            tracing::debug!(
                pass = plan.pass,
                declaration = %plan.declaration,
                "plan conflicts with an earlier plan, dropping"
            );
            continue;
        }
        accepted.push(plan);
    }

    if accepted.is_empty() {
        return None;
    }

    let edits: Vec<&Edit> = accepted.iter().flat_map(|p| p.edits.iter()).collect();
    Some(apply_edits(&unit.text, edits))
}

fn conflicts(a: &RewritePlan, b: &RewritePlan) -> bool {
    a.edits
        .iter()
        .any(|ea| b.edits.iter().any(|eb| overlaps(ea, eb)))
}

/// Zero-width inserts collide only when strictly inside the other span;
/// an insert at a removal's boundary composes cleanly.
fn overlaps(a: &Edit, b: &Edit) -> bool {
    let (a_start, a_end) = (a.start(), a.end());
    let (b_start, b_end) = (b.start(), b.end());
    if a_start == a_end {
        return b_start < a_start && a_start < b_end;
    }
    if b_start == b_end {
        return a_start < b_start && b_start < a_end;
    }
    a_start < b_end && b_start < a_end
}

/// All offsets refer to the original text, so edits run highest-first;
/// a removal at an offset runs before an insertion at the same offset.
fn apply_edits(text: &str, mut edits: Vec<&Edit>) -> String {
    edits.sort_by_key(|e| (Reverse(e.start()), matches!(e, Edit::Insert { .. })));

    let mut out = text.to_string();
    for edit in edits {
        match edit {
            Edit::Insert { at, text } => out.insert_str(*at, text),
            Edit::Remove { span } => out.replace_range(span.start..span.end, ""),
            Edit::Replace { span, text } => out.replace_range(span.start..span.end, text),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::Precondition;
    use crate::syntax::{parse_source, Span};
    use std::path::Path;

    fn plan(edits: Vec<Edit>, precondition: Precondition) -> RewritePlan {
        RewritePlan {
            pass: "test-pass",
            declaration: "UsersController".to_string(),
            edits,
            precondition,
        }
    }

    fn unit_with_constructor() -> SourceUnit {
        parse_source(
            Path::new("Test.java"),
            r#"public class UsersController {
    private final UsersService usersService;

    public UsersController(UsersService usersService) {
        this.usersService = usersService;
    }
}
"#,
        )
        .expect("should parse")
    }

    #[test]
    fn test_no_plans_means_no_output() {
        let unit = unit_with_constructor();
        assert!(apply(&unit, &[]).is_none());
    }

    #[test]
    fn test_invalidated_plan_is_dropped() {
        let unit = unit_with_constructor();
        let stale = plan(
            vec![Edit::Insert {
                at: 0,
                text: "// duplicate constructor\n".to_string(),
            }],
            Precondition::NoConstructorWith {
                declaration: "UsersController".to_string(),
                param_types: vec!["UsersService".to_string()],
            },
        );
        assert!(apply(&unit, &[stale]).is_none());
    }

    #[test]
    fn test_conflicting_later_plan_is_dropped() {
        let unit = unit_with_constructor();
        let holds = Precondition::NoConstructorWith {
            declaration: "UsersController".to_string(),
            param_types: vec![],
        };
        let first = plan(
            vec![Edit::Replace {
                span: Span { start: 0, end: 6 },
                text: "private".to_string(),
            }],
            holds.clone(),
        );
        let second = plan(
            vec![Edit::Remove {
                span: Span { start: 3, end: 9 },
            }],
            holds,
        );
        let out = apply(&unit, &[first, second]).expect("first plan applies");
        assert!(out.starts_with("private class UsersController"));
    }

    #[test]
    fn test_untouched_regions_are_byte_identical() {
        let unit = unit_with_constructor();
        let insert_at = unit.text.len();
        let tagged = plan(
            vec![Edit::Insert {
                at: insert_at,
                text: "// trailing\n".to_string(),
            }],
            Precondition::NoConstructorWith {
                declaration: "UsersController".to_string(),
                param_types: vec![],
            },
        );
        let out = apply(&unit, &[tagged]).expect("plan applies");
        assert_eq!(&out[..insert_at], unit.text);
    }

    #[test]
    fn test_edits_apply_back_to_front() {
        let unit = parse_source(Path::new("T.java"), "class A {\n}\n").expect("should parse");
        let holds = Precondition::NoConstructorWith {
            declaration: "A".to_string(),
            param_types: vec![],
        };
        let combined = plan(
            vec![
                Edit::Insert {
                    at: 0,
                    text: "// header\n".to_string(),
                },
                Edit::Replace {
                    span: Span { start: 6, end: 7 },
                    text: "B".to_string(),
                },
            ],
            holds,
        );
        let out = apply(&unit, &[combined]).expect("plan applies");
        assert_eq!(out, "// header\nclass B {\n}\n");
    }
}
