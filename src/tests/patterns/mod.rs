// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::patterns::*;

use std::collections::BTreeMap;

#[test]
fn get_collapses_to_dotted_path() {
    assert_eq!(
        normalize_indirect_access(r#"get(input.parameters, "labels", [])"#),
        "input.parameters.labels"
    );
    assert_eq!(
        normalize_indirect_access(r#"count(get(input.parameters, "labels", [])) > 0"#),
        "count(input.parameters.labels) > 0"
    );
}

#[test]
fn nested_get_is_unwrapped_to_fixed_point() {
    assert_eq!(
        normalize_indirect_access(
            r#"object.get(object.get(input, "parameters", {}), "labels", [])"#
        ),
        "input.parameters.labels"
    );
}

#[test]
fn get_with_non_identifier_key_uses_brackets() {
    assert_eq!(
        normalize_indirect_access(r#"get(input.parameters, "my-key", "")"#),
        r#"input.parameters["my-key"]"#
    );
}

#[test]
fn get_default_may_hold_a_call() {
    assert_eq!(
        normalize_indirect_access(r#"x := get(input.parameters, "max", to_number("3"))"#),
        "x := input.parameters.max"
    );
}

#[test]
fn get_outside_parameters_is_kept() {
    let text = r#"get(input.review, "object", {})"#;
    assert_eq!(normalize_indirect_access(text), text);

    let text = r#"target(input.parameters, "x", 1)"#;
    assert_eq!(normalize_indirect_access(text), text);
}

#[test]
fn parameter_refs_follow_path_grammar() {
    let refs = extract_parameter_refs(
        r#"count(input.parameters.labels[_].key) > input["parameters"]["max"]; input.review.x"#,
    );
    let refs: Vec<&str> = refs.iter().map(String::as_str).collect();
    assert_eq!(
        refs,
        vec![
            "input.parameters.labels[_].key",
            r#"input["parameters"]["max"]"#,
        ]
    );
}

#[test]
fn parameter_refs_stop_at_variable_index() {
    let refs = extract_parameter_refs("input.parameters.labels[i].key == x");
    assert_eq!(
        refs.into_iter().collect::<Vec<_>>(),
        vec!["input.parameters.labels".to_string()]
    );
}

#[test]
fn interesting_gate() {
    assert!(is_parameter_expr("input"));
    assert!(is_parameter_expr(" input.parameters "));
    assert!(is_parameter_expr("input.parameters.labels[_]"));
    assert!(!is_parameter_expr("input.review.object"));
    assert!(!is_parameter_expr("input.parametersX"));
    assert!(!is_parameter_expr(""));
}

#[test]
fn aliases_replace_whole_identifiers_only() {
    let mut aliases = BTreeMap::new();
    aliases.insert("x".to_string(), "input.parameters.p".to_string());

    assert_eq!(
        substitute_aliases(r#"x.y == "x"; a.x; xx; f(x)"#, &aliases),
        r#"input.parameters.p.y == "x"; a.x; xx; f(input.parameters.p)"#
    );
    assert_eq!(
        substitute_aliases(r#"x == "a \" x""#, &aliases),
        r#"input.parameters.p == "a \" x""#
    );
}

#[test]
fn package_and_imports() {
    let source = "# policy\npackage foo.bar\n\nimport future.keywords.in\nimport data.lib.x as y\n\nallow { true }\n";

    assert_eq!(package_name(source), "foo.bar");
    assert_eq!(package_name("allow { true }"), "");
    assert_eq!(keyword_imports(source), vec!["future.keywords.in".to_string()]);
    assert_eq!(
        strip_imports(source),
        "# policy\npackage foo.bar\n\n\nallow { true }\n"
    );
    assert_eq!(strip_package(source).lines().next(), Some("# policy"));
    assert!(!strip_package(source).contains("package"));
}
