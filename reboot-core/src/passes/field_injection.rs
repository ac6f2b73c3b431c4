//! Field-Injection-to-Constructor pass
//!
//! Rewrites `@Autowired` field injection into an explicit constructor:
//! one parameter per marked field, in field declaration order, each
//! assigned to its field. The markers are removed and the fields become
//! `final`, assigned only through the new constructor.

use super::{
    duplicate_marked_name, import_removal_edits, overloaded_field, AmbiguityReport, Edit,
    Precondition, RewritePlan, ScanResult,
};
use crate::syntax::{Declaration, Field, MarkerKind, SourceUnit};

/// Import removed once the last field-injection marker in a unit is gone.
pub const AUTOWIRED_IMPORT: &str = "org.springframework.beans.factory.annotation.Autowired";

#[derive(Debug, Default)]
pub struct FieldInjectionPass;

impl FieldInjectionPass {
    pub const NAME: &'static str = "field-injection-to-constructor";

    pub fn scan(&self, unit: &SourceUnit) -> ScanResult {
        let mut result = ScanResult::default();

        // Test wiring is the test-double pass's concern.
        if unit.has_test_annotation {
            return result;
        }

        let mut markers_removed = 0;
        for decl in &unit.declarations {
            let marked: Vec<&Field> = decl
                .fields()
                .filter(|f| f.has_marker(MarkerKind::FieldInjection))
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
                    reason: format!("multiple `@Autowired` fields named `{name}`"),
                });
                continue;
            }

            // Lombok already generates the constructor.
            if decl.has_marker(MarkerKind::ExplicitConstruction) {
                continue;
            }

            // An identical signature means the wiring already exists; any
            // other constructor (a no-arg one, say) stays and the new one
            // is added alongside it.
            let param_types: Vec<String> = marked.iter().map(|f| f.ty.clone()).collect();
            if decl.constructors().any(|c| c.param_types == param_types) {
                continue;
            }

            let mut edits = Vec::new();
            for field in &marked {
                if let Some(marker) = field.marker(MarkerKind::FieldInjection) {
                    edits.push(Edit::Remove {
                        span: marker.span.with_trailing_whitespace(&unit.text),
                    });
                    markers_removed += 1;
                }
                if !field.is_final {
                    edits.push(Edit::Insert {
                        at: field.ty_span.start,
                        text: "final ".to_string(),
                    });
                }
            }
            if let Some(last_field) = decl.fields().last() {
                edits.push(Edit::Insert {
                    at: last_field.span.end,
                    text: constructor_text(decl, &marked),
                });
            }

            result.plans.push(RewritePlan {
                pass: Self::NAME,
                declaration: decl.name.clone(),
                edits,
                precondition: Precondition::NoConstructorWith {
                    declaration: decl.name.clone(),
                    param_types,
                },
            });
        }

        // The import goes only when no marker survives anywhere in the
        // unit (skipped declarations and annotated constructors keep it).
        if !result.plans.is_empty() && markers_removed == field_injection_marker_count(unit) {
            if let Some(import) = unit.imports.iter().find(|i| i.path == AUTOWIRED_IMPORT) {
                result.plans[0]
                    .edits
                    .extend(import_removal_edits(&unit.text, &[import.span]));
            }
        }

        result
    }
}

fn field_injection_marker_count(unit: &SourceUnit) -> usize {
    unit.declarations
        .iter()
        .map(|decl| {
            let on_fields: usize = decl
                .fields()
                .filter(|f| f.has_marker(MarkerKind::FieldInjection))
                .count();
            let on_constructors: usize = decl
                .constructors()
                .filter(|c| c.markers.iter().any(|m| m.kind == MarkerKind::FieldInjection))
                .count();
            let on_methods: usize = decl
                .methods()
                .filter(|m| m.markers.iter().any(|a| a.kind == MarkerKind::FieldInjection))
                .count();
            on_fields + on_constructors + on_methods
        })
        .sum()
}

fn constructor_text(decl: &Declaration, fields: &[&Field]) -> String {
    let indent = &decl.member_indent;
    let inner = format!("{indent}{}", decl.indent_step);
    let params = fields
        .iter()
        .map(|f| format!("{} {}", f.ty, f.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = format!("\n\n{indent}public {}({params}) {{\n", decl.name);
    for field in fields {
        out.push_str(&format!("{inner}this.{0} = {0};\n", field.name));
    }
    out.push_str(&format!("{indent}}}"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite;
    use crate::syntax::parse_source;
    use std::path::Path;

    fn run_pass(source: &str) -> (Option<String>, ScanResult) {
        let unit = parse_source(Path::new("Test.java"), source).expect("should parse");
        let pass = FieldInjectionPass;
        let scan = pass.scan(&unit);
        let text = rewrite::apply(&unit, &scan.plans);
        (text, scan)
    }

    #[test]
    fn test_rewrites_marked_fields_to_constructor() {
        let source = r#"import org.springframework.beans.factory.annotation.Autowired;

public class UsersController {
    @Autowired
    private UsersService b;

    @Autowired
    private UsernameService c;
}
"#;
        let (text, scan) = run_pass(source);
        assert_eq!(scan.plans.len(), 1);

        let expected = r#"public class UsersController {
    private final UsersService b;

    private final UsernameService c;

    public UsersController(UsersService b, UsernameService c) {
        this.b = b;
        this.c = c;
    }
}
"#;
        assert_eq!(text.as_deref(), Some(expected));
    }

    #[test]
    fn test_skips_test_units() {
        let source = r#"import org.junit.jupiter.api.Test;
import org.springframework.beans.factory.annotation.Autowired;

class UsersControllerTest {
    @Autowired
    private UsersService usersService;

    @Test
    void getUsersTest() {
    }
}
"#;
        let (text, scan) = run_pass(source);
        assert!(text.is_none());
        assert!(scan.plans.is_empty());
    }

    #[test]
    fn test_skips_identical_constructor_signature() {
        let source = r#"public class UsersController {
    @Autowired
    private UsersService usersService;

    public UsersController(UsersService usersService) {
        this.usersService = usersService;
    }
}
"#;
        let (text, scan) = run_pass(source);
        assert!(text.is_none());
        assert!(scan.plans.is_empty());
    }

    #[test]
    fn test_adds_constructor_alongside_no_arg_constructor() {
        let source = r#"public class UsersController {
    @Autowired
    private UsersService usersService;

    public UsersController() {
    }
}
"#;
        let (text, _) = run_pass(source);
        let text = text.expect("should rewrite");
        assert!(text.contains("public UsersController() {"));
        assert!(text.contains("public UsersController(UsersService usersService) {"));
        assert!(text.contains("this.usersService = usersService;"));
    }

    #[test]
    fn test_skips_lombok_constructed_declarations() {
        let source = r#"@RequiredArgsConstructor
public class UsersController {
    @Autowired
    private UsersService usersService;
}
"#;
        let (text, scan) = run_pass(source);
        assert!(text.is_none());
        assert!(scan.plans.is_empty());
    }

    #[test]
    fn test_duplicate_marked_field_names_are_ambiguous() {
        let source = r#"public class UsersController {
    @Autowired
    private UsersService usersService;
    @Autowired
    private UsernameService usersService;
}
"#;
        let (text, scan) = run_pass(source);
        assert!(text.is_none());
        assert_eq!(scan.ambiguities.len(), 1);
        assert!(scan.ambiguities[0].reason.contains("usersService"));
    }

    #[test]
    fn test_constructor_parameters_follow_field_order() {
        let source = r#"public class OrderService {
    @Autowired
    private PaymentGateway gateway;
    private String label;
    @Autowired
    private OrderRepository repository;
}
"#;
        let (text, _) = run_pass(source);
        let text = text.expect("should rewrite");
        assert!(text.contains(
            "public OrderService(PaymentGateway gateway, OrderRepository repository) {"
        ));
        // unmarked field is untouched and keeps its position
        assert!(text.contains("private String label;"));
    }

    #[test]
    fn test_import_stays_while_markers_remain_elsewhere() {
        let source = r#"import org.springframework.beans.factory.annotation.Autowired;

public class Wiring {
    @Autowired
    private ServiceA a;
}

@RequiredArgsConstructor
class Blocked {
    @Autowired
    private ServiceB b;
}
"#;
        let (text, scan) = run_pass(source);
        let text = text.expect("should rewrite the unblocked declaration");
        assert_eq!(scan.plans.len(), 1);
        assert!(text.contains("import org.springframework.beans.factory.annotation.Autowired;"));
        assert!(text.contains("public Wiring(ServiceA a) {"));
    }

    #[test]
    fn test_second_scan_finds_nothing() {
        let source = r#"import org.springframework.beans.factory.annotation.Autowired;

public class UsersController {
    @Autowired
    private UsersService usersService;
}
"#;
        let (text, _) = run_pass(source);
        let rewritten = text.expect("should rewrite");
        let (again, scan) = run_pass(&rewritten);
        assert!(again.is_none());
        assert!(scan.plans.is_empty());
    }
}
