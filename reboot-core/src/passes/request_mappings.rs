//! Request-Mappings pass
//!
//! Rewrites `@RequestMapping(method = RequestMethod.X)` on handler
//! methods into the dedicated shorthand (`@GetMapping`, `@PostMapping`,
//! ...). A lone `path`/`value` argument becomes the implicit single
//! argument; any other arguments are kept as written, minus `method`.
//! Class-level `@RequestMapping` (a shared prefix mapping) is left
//! alone.

use super::{
    import_insertion_edit, import_removal_edits, AmbiguityReport, Edit, Precondition, RewritePlan,
    ScanResult,
};
use crate::syntax::{MarkerKind, SourceUnit};
use std::collections::BTreeSet;

pub const REQUEST_MAPPING_IMPORT: &str =
    "org.springframework.web.bind.annotation.RequestMapping";
const REQUEST_METHOD_IMPORT: &str = "org.springframework.web.bind.annotation.RequestMethod";
const MAPPING_PACKAGE: &str = "org.springframework.web.bind.annotation";

#[derive(Debug, Default)]
pub struct RequestMappingsPass;

impl RequestMappingsPass {
    pub const NAME: &'static str = "request-mappings";

    pub fn scan(&self, unit: &SourceUnit) -> ScanResult {
        let mut result = ScanResult::default();
        let mut rewritten = 0;
        let mut needed: BTreeSet<&'static str> = BTreeSet::new();

        for decl in &unit.declarations {
            let mut edits = Vec::new();
            let mut pivot = None;

            for method in decl.methods() {
                let marker = match method
                    .markers
                    .iter()
                    .find(|m| m.kind == MarkerKind::RequestMapping)
                {
                    Some(marker) => marker,
                    None => continue,
                };
                let verb_expr = match marker.args.iter().find(|(k, _)| k == "method") {
                    Some((_, value)) => value,
                    // a mapping without a request method has no shorthand
                    None => continue,
                };
                let verb = verb_expr.rsplit('.').next().unwrap_or(verb_expr);
                let mapping = match mapping_annotation(verb) {
                    Some(mapping) => mapping,
                    None => {
                        result.ambiguities.push(AmbiguityReport {
                            pass: Self::NAME,
                            declaration: decl.name.clone(),
                            reason: format!(
                                "unknown request method expression `{verb_expr}` on `{}`",
                                method.name
                            ),
                        });
                        continue;
                    }
                };

                edits.push(Edit::Replace {
                    span: marker.span,
                    text: mapping_text(mapping, &marker.args),
                });
                rewritten += 1;
                needed.insert(mapping);
                pivot.get_or_insert(method.name.clone());
            }

            if let Some(method) = pivot {
                result.plans.push(RewritePlan {
                    pass: Self::NAME,
                    declaration: decl.name.clone(),
                    edits,
                    precondition: Precondition::MethodHasMarker {
                        declaration: decl.name.clone(),
                        method,
                        kind: MarkerKind::RequestMapping,
                    },
                });
            }
        }

        if !result.plans.is_empty() {
            let mut removed = Vec::new();
            if rewritten == request_mapping_marker_count(unit) {
                let shared_mapping = unit
                    .declarations
                    .iter()
                    .any(|d| d.has_marker(MarkerKind::RequestMapping));
                removed = unit
                    .imports
                    .iter()
                    .filter(|i| {
                        (i.path == REQUEST_MAPPING_IMPORT && !shared_mapping)
                            || i.path == REQUEST_METHOD_IMPORT
                            || (i.is_static
                                && i.path.starts_with(
                                    "org.springframework.web.bind.annotation.RequestMethod.",
                                ))
                    })
                    .map(|i| i.span)
                    .collect();
                result.plans[0]
                    .edits
                    .extend(import_removal_edits(&unit.text, &removed));
            }
            for mapping in needed {
                let path = format!("{MAPPING_PACKAGE}.{mapping}");
                if !unit.imports.iter().any(|i| i.covers(&path)) {
                    result.plans[0]
                        .edits
                        .push(import_insertion_edit(unit, &path, &removed));
                }
            }
        }

        result
    }
}

fn mapping_annotation(verb: &str) -> Option<&'static str> {
    match verb {
        "GET" => Some("GetMapping"),
        "POST" => Some("PostMapping"),
        "PUT" => Some("PutMapping"),
        "PATCH" => Some("PatchMapping"),
        "DELETE" => Some("DeleteMapping"),
        _ => None,
    }
}

/// Methods with a `@RequestMapping` marker; class-level mappings are not
/// counted because they are never rewritten.
fn request_mapping_marker_count(unit: &SourceUnit) -> usize {
    unit.declarations
        .iter()
        .flat_map(|decl| decl.methods())
        .filter(|m| m.markers.iter().any(|a| a.kind == MarkerKind::RequestMapping))
        .count()
}

fn mapping_text(mapping: &str, args: &[(String, String)]) -> String {
    let remaining: Vec<&(String, String)> = args.iter().filter(|(k, _)| k != "method").collect();
    if remaining.is_empty() {
        return format!("@{mapping}");
    }
    if remaining.len() == 1 {
        let (key, value) = remaining[0];
        if key == "path" || key == "value" {
            return format!("@{mapping}({value})");
        }
    }
    let pairs = remaining
        .iter()
        .map(|(k, v)| format!("{k} = {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("@{mapping}({pairs})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite;
    use crate::syntax::parse_source;
    use std::path::Path;

    fn run_pass(source: &str) -> (Option<String>, ScanResult) {
        let unit = parse_source(Path::new("Test.java"), source).expect("should parse");
        let pass = RequestMappingsPass;
        let scan = pass.scan(&unit);
        let text = rewrite::apply(&unit, &scan.plans);
        (text, scan)
    }

    #[test]
    fn test_method_only_mapping_becomes_marker_shorthand() {
        for (verb, mapping) in [
            ("GET", "GetMapping"),
            ("POST", "PostMapping"),
            ("PUT", "PutMapping"),
            ("PATCH", "PatchMapping"),
            ("DELETE", "DeleteMapping"),
        ] {
            let source = format!(
                r#"import org.springframework.web.bind.annotation.RequestMethod;
import org.springframework.web.bind.annotation.RequestMapping;

public class UsersController {{
    @RequestMapping(method = RequestMethod.{verb})
    public ResponseEntity<List<User>> getUsers() {{
        return ResponseEntity.ok().build();
    }}
}}
"#
            );
            let expected = format!(
                r#"import org.springframework.web.bind.annotation.{mapping};

public class UsersController {{
    @{mapping}
    public ResponseEntity<List<User>> getUsers() {{
        return ResponseEntity.ok().build();
    }}
}}
"#
            );
            let (text, _) = run_pass(&source);
            assert_eq!(text.as_deref(), Some(expected.as_str()));
        }
    }

    #[test]
    fn test_existing_mapping_import_is_not_duplicated() {
        let source = r#"import org.springframework.web.bind.annotation.RequestMethod;
import org.springframework.web.bind.annotation.RequestMapping;
import org.springframework.web.bind.annotation.GetMapping;

public class UsersController {
    @RequestMapping(method = RequestMethod.GET)
    public ResponseEntity<List<User>> getUsers() {
        return ResponseEntity.ok().build();
    }
}
"#;
        let expected = r#"import org.springframework.web.bind.annotation.GetMapping;

public class UsersController {
    @GetMapping
    public ResponseEntity<List<User>> getUsers() {
        return ResponseEntity.ok().build();
    }
}
"#;
        let (text, _) = run_pass(source);
        assert_eq!(text.as_deref(), Some(expected));
    }

    #[test]
    fn test_wildcard_import_blocks_mapping_import() {
        let source = r#"import org.springframework.web.bind.annotation.*;

public class UsersController {
    @RequestMapping(method = RequestMethod.GET)
    public ResponseEntity<List<User>> getUsers() {
        return ResponseEntity.ok().build();
    }
}
"#;
        let (text, _) = run_pass(source);
        let text = text.expect("should rewrite");
        assert!(text.contains("import org.springframework.web.bind.annotation.*;"));
        assert!(text.contains("@GetMapping"));
        assert!(!text.contains("import org.springframework.web.bind.annotation.GetMapping;"));
    }

    #[test]
    fn test_shared_class_level_mapping_keeps_its_import() {
        let source = r#"import org.springframework.web.bind.annotation.RequestMapping;
import org.springframework.web.bind.annotation.RequestMethod;

@RequestMapping("/users")
public class UsersController {
    @RequestMapping(method = RequestMethod.GET)
    public ResponseEntity<List<User>> getUsers() {
        return ResponseEntity.ok().build();
    }
}
"#;
        let (text, _) = run_pass(source);
        let text = text.expect("should rewrite");
        assert!(text.contains("import org.springframework.web.bind.annotation.RequestMapping;"));
        assert!(!text.contains("import org.springframework.web.bind.annotation.RequestMethod;"));
        assert!(text.contains("@RequestMapping(\"/users\")"));
        assert!(text.contains("@GetMapping\n"));
    }

    #[test]
    fn test_static_request_method_import_is_removed() {
        let source = r#"import static org.springframework.web.bind.annotation.RequestMethod.GET;
import org.springframework.web.bind.annotation.RequestMapping;

public class UsersController {
    @RequestMapping(method = GET)
    public ResponseEntity<List<User>> getUsers() {
        return ResponseEntity.ok().build();
    }
}
"#;
        let expected = r#"import org.springframework.web.bind.annotation.GetMapping;

public class UsersController {
    @GetMapping
    public ResponseEntity<List<User>> getUsers() {
        return ResponseEntity.ok().build();
    }
}
"#;
        let (text, _) = run_pass(source);
        assert_eq!(text.as_deref(), Some(expected));
    }

    #[test]
    fn test_lone_path_argument_becomes_implicit() {
        for key in ["path", "value"] {
            let source = format!(
                r#"public class UsersController {{
    @RequestMapping({key} = "/{{id}}", method = RequestMethod.GET)
    public ResponseEntity<User> getUser() {{
        return ResponseEntity.ok().build();
    }}
}}
"#
            );
            let (text, _) = run_pass(&source);
            let text = text.expect("should rewrite");
            assert!(text.contains("@GetMapping(\"/{id}\")"));
        }
    }

    #[test]
    fn test_other_arguments_are_kept_in_order() {
        let source = r#"public class UsersController {
    @RequestMapping(path = "/{id}", method = RequestMethod.GET, consumes = "application/json", produces = "application/json")
    public ResponseEntity<User> getUser() {
        return ResponseEntity.ok().build();
    }
}
"#;
        let (text, _) = run_pass(source);
        let text = text.expect("should rewrite");
        assert!(text.contains(
            "@GetMapping(path = \"/{id}\", consumes = \"application/json\", produces = \"application/json\")"
        ));
    }

    #[test]
    fn test_unknown_request_method_expression_left_untouched() {
        let source = r#"import org.springframework.web.bind.annotation.RequestMapping;

public class UsersController {
    @RequestMapping(method = 5)
    public ResponseEntity<User> getUser() {
        return ResponseEntity.ok().build();
    }
}
"#;
        let (text, scan) = run_pass(source);
        assert!(text.is_none());
        assert_eq!(scan.ambiguities.len(), 1);
        assert!(scan.ambiguities[0].reason.contains("5"));
    }

    #[test]
    fn test_second_scan_finds_nothing() {
        let source = r#"import org.springframework.web.bind.annotation.RequestMethod;
import org.springframework.web.bind.annotation.RequestMapping;

public class UsersController {
    @RequestMapping(method = RequestMethod.DELETE)
    public ResponseEntity<Void> deleteUser() {
        return ResponseEntity.noContent().build();
    }
}
"#;
        let (text, _) = run_pass(source);
        let rewritten = text.expect("should rewrite");
        let (again, scan) = run_pass(&rewritten);
        assert!(again.is_none());
        assert!(scan.plans.is_empty());
    }
}
