// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::patterns::{insert_after_package, keyword_imports, strip_imports, strip_package};

use lazy_static::lazy_static;
use regex::Regex;

pub const GUARD_RULE_NAME: &str = "regoplate_identity_guard";

/// Inserted as the first line of every violation rule body.
pub const GUARD_MARKER: &str = "    regoplate_identity_guard\n";

// The guard holds when the request carries no user info (audit) or when
// neither the user nor any of its groups is a known system identity.
// Both texts end up in stored templates and must not change.
pub const GUARD_RULE: &str = r#"
regoplate_identity_guard {
    not input.review.userInfo
}

regoplate_identity_guard {
    not regoplate_exempt_users[input.review.userInfo.username]
    count({g | g := input.review.userInfo.groups[_]} & regoplate_exempt_groups) == 0
}

regoplate_exempt_users := {"system:kube-controller-manager", "system:kube-scheduler", "system:admin"}

regoplate_exempt_groups := {"system:masters", "system:nodes", "system:serviceaccounts:kube-system"}
"#;

pub const GUARD_RULE_V1: &str = r#"
regoplate_identity_guard if {
    not input.review.userInfo
}

regoplate_identity_guard if {
    not regoplate_exempt_users[input.review.userInfo.username]
    count({g | g := input.review.userInfo.groups[_]} & regoplate_exempt_groups) == 0
}

regoplate_exempt_users := {"system:kube-controller-manager", "system:kube-scheduler", "system:admin"}

regoplate_exempt_groups := {"system:masters", "system:nodes", "system:serviceaccounts:kube-system"}
"#;

lazy_static! {
    static ref VIOLATION_HEAD: Regex = Regex::new(concat!(
        r"(?m)^violation(?:\[[^\n]*\]|[ \t]+contains[ \t]+[^\n]*?)",
        r"[ \t]*(?:if[ \t]*)?\{[ \t]*\r?\n",
    ))
    .expect("invalid violation head regex");

    static ref GUARD_HEAD: Regex = Regex::new(r"(?m)^regoplate_identity_guard\b")
        .expect("invalid guard head regex");
}

/// Guards every multi-line violation rule and appends the guard rule.
/// Source that already defines the guard rule is returned unchanged.
pub fn inject_guard(source: &str) -> String {
    inject_guard_with(source, false)
}

/// As [`inject_guard`]; `rego_v1` selects the `if` spelling of the guard
/// rule, which is also picked when the source imports `rego.v1`.
pub fn inject_guard_with(source: &str, rego_v1: bool) -> String {
    if GUARD_HEAD.is_match(source) {
        return source.to_string();
    }

    let rego_v1 = rego_v1 || keyword_imports(source).iter().any(|i| i == "rego.v1");

    let mut out = VIOLATION_HEAD
        .replace_all(source, |caps: &regex::Captures<'_>| {
            format!("{}{GUARD_MARKER}", &caps[0])
        })
        .into_owned();

    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(if rego_v1 { GUARD_RULE_V1 } else { GUARD_RULE });
    out
}

/// Concatenates the template and its libraries into one module.
///
/// Imports are dropped everywhere and library package lines are removed.
/// Keyword imports are put back once after the template's package line
/// since the merged rules may still use `if`, `contains`, `in` or `every`.
pub fn merge_with_libraries(rego: &str, libs: &[String]) -> String {
    let mut imports: Vec<String> = vec![];
    for source in core::iter::once(rego).chain(libs.iter().map(String::as_str)) {
        for import in keyword_imports(source) {
            if !imports.contains(&import) {
                imports.push(import);
            }
        }
    }

    let mut merged = strip_imports(rego);
    if !imports.is_empty() {
        let lines: String = imports.iter().map(|i| format!("import {i}\n")).collect();
        merged = insert_after_package(&merged, &lines);
    }

    for lib in libs {
        if !merged.is_empty() && !merged.ends_with('\n') {
            merged.push('\n');
        }
        merged.push('\n');
        merged.push_str(&strip_package(&strip_imports(lib)));
    }
    merged
}
