// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::guard::*;

const REPLICAS: &str = r#"package k8sreplicas

violation[{"msg": msg}] {
    input.review.object.spec.replicas > input.parameters.max
    msg := "too many replicas"
}

violation[{"msg": msg}] {
    not input.review.object.spec.replicas
    msg := "replicas missing"
}
"#;

#[test]
fn source_without_violations_only_gains_guard_rule() {
    let source = "package foo\n\nallow { true }\n";
    let guarded = inject_guard(source);
    assert_eq!(guarded, format!("{source}{GUARD_RULE}"));
    assert_eq!(guarded.matches("regoplate_exempt_users :=").count(), 1);

    // A missing final newline is added before the guard.
    let guarded = inject_guard("package foo");
    assert_eq!(guarded, format!("package foo\n{GUARD_RULE}"));
}

#[test]
fn marker_goes_first_in_every_violation_body() {
    let guarded = inject_guard(REPLICAS);
    assert_eq!(guarded.matches(GUARD_MARKER).count(), 2);
    assert!(guarded.contains(&format!(
        "violation[{{\"msg\": msg}}] {{\n{GUARD_MARKER}    input.review"
    )));
    assert!(guarded.contains(&format!(
        "violation[{{\"msg\": msg}}] {{\n{GUARD_MARKER}    not input"
    )));
    assert!(guarded.ends_with(GUARD_RULE));
}

#[test]
fn guard_is_idempotent() {
    let once = inject_guard(REPLICAS);
    assert_eq!(inject_guard(&once), once);
}

#[test]
fn single_line_and_indented_heads_are_left_alone() {
    let source = "package foo\n\nviolation[msg] { msg := \"x\" }\n\n  violation[msg] {\n    msg := \"y\"\n  }\n";
    let guarded = inject_guard(source);
    assert_eq!(guarded.matches(GUARD_MARKER).count(), 0);
    assert!(guarded.starts_with(source));
}

#[test]
fn v1_heads_and_guard() {
    let source = r#"package k8sv1

import rego.v1

violation contains {"msg": msg} if {
    input.parameters.deny
    msg := "denied"
}

violation[{"msg": msg}] if {
    msg := "always"
}
"#;
    let guarded = inject_guard(source);
    assert_eq!(guarded.matches(GUARD_MARKER).count(), 2);
    assert!(guarded.contains(&format!(
        "violation contains {{\"msg\": msg}} if {{\n{GUARD_MARKER}"
    )));
    assert!(guarded.ends_with(GUARD_RULE_V1));

    // Forced v1 spelling without the import.
    assert!(inject_guard_with("package foo\n", true).ends_with(GUARD_RULE_V1));
}

#[test]
fn merge_strips_imports_and_library_packages() {
    let rego = "package k8slib\nimport future.keywords.in\nimport data.lib.helpers\n\nviolation[{\"msg\": \"m\"}] {\n    helpers.ok(input.parameters.x)\n}\n";
    let libs = vec![
        "package lib.helpers\nimport future.keywords.in\nimport future.keywords.if\n\nok(x) if { x }\n"
            .to_string(),
        "package lib.other\n\nother := 1".to_string(),
    ];

    let merged = merge_with_libraries(rego, &libs);
    assert!(merged.starts_with(
        "package k8slib\nimport future.keywords.in\nimport future.keywords.if\n\nviolation"
    ));
    assert_eq!(merged.matches("import").count(), 2);
    assert!(!merged.contains("package lib"));
    assert!(merged.contains("\nok(x) if { x }\n"));
    assert!(merged.ends_with("\nother := 1"));
}

#[test]
fn merge_without_libraries_only_strips_imports() {
    let merged = merge_with_libraries("package foo\nimport data.x\n\nallow { true }\n", &[]);
    assert_eq!(merged, "package foo\n\nallow { true }\n");
}
