//! Web-Annotations pass
//!
//! Drops redundant binding names from Spring web annotations on handler
//! parameters: `@PathVariable("id") Long id` names the parameter it is
//! already attached to, so the argument goes and the marker form stays.
//! A name that differs from the parameter is load-bearing and is kept.

use super::{Edit, Precondition, RewritePlan, ScanResult};
use crate::syntax::{AnnotationMarker, MarkerKind, Parameter, SourceUnit};

#[derive(Debug, Default)]
pub struct WebAnnotationsPass;

impl WebAnnotationsPass {
    pub const NAME: &'static str = "web-annotations";

    pub fn scan(&self, unit: &SourceUnit) -> ScanResult {
        let mut result = ScanResult::default();

        for decl in &unit.declarations {
            let mut edits = Vec::new();
            let mut pivot = None;

            for method in decl.methods() {
                for param in &method.params {
                    for marker in param
                        .markers
                        .iter()
                        .filter(|m| m.kind == MarkerKind::WebBinding)
                    {
                        if let Some(text) = rewritten_annotation(marker, param) {
                            edits.push(Edit::Replace {
                                span: marker.span,
                                text,
                            });
                            pivot.get_or_insert((method.name.clone(), param.name.clone()));
                        }
                    }
                }
            }

            if let Some((method, param)) = pivot {
                result.plans.push(RewritePlan {
                    pass: Self::NAME,
                    declaration: decl.name.clone(),
                    edits,
                    precondition: Precondition::ParamHasMarker {
                        declaration: decl.name.clone(),
                        method,
                        param,
                        kind: MarkerKind::WebBinding,
                    },
                });
            }
        }

        result
    }
}

/// The annotation's new text, or `None` when it must stay as written.
fn rewritten_annotation(marker: &AnnotationMarker, param: &Parameter) -> Option<String> {
    let quoted = format!("\"{}\"", param.name);
    let redundant =
        |key: &String, value: &String| (key == "name" || key == "value") && *value == quoted;

    let remaining: Vec<&(String, String)> = marker
        .args
        .iter()
        .filter(|(k, v)| !redundant(k, v))
        .collect();
    if remaining.len() == marker.args.len() {
        return None;
    }

    if remaining.is_empty() {
        return Some(format!("@{}", marker.name));
    }
    let pairs = remaining
        .iter()
        .map(|(k, v)| format!("{k} = {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("@{}({pairs})", marker.name))
}
