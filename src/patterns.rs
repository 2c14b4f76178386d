// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Text rewriters over canonically rendered expressions and raw Rego source.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    // get(BASE, "KEY", DEFAULT) and object.get(BASE, "KEY", DEFAULT).
    // DEFAULT may contain one level of balanced parentheses.
    static ref INDIRECT_GET: Regex = Regex::new(concat!(
        r#"(^|[^.\w])(?:object\.)?get\(\s*"#,
        r#"(input(?:\.[A-Za-z_][A-Za-z0-9_]*|\[_\]|\["[^"\\]*"\])*)"#,
        r#"\s*,\s*"([^"\\]*)"\s*,\s*(?:[^()]|\([^()]*\))*?\)"#,
    ))
    .expect("invalid indirect access regex");

    static ref PARAMETER_REF: Regex = Regex::new(concat!(
        r#"\binput(?:\.parameters|\["parameters"\])"#,
        r#"(?:\["[^"\\]*"\]|\[_\]|\.[A-Za-z_][A-Za-z0-9_]*)*"#,
    ))
    .expect("invalid parameter reference regex");

    static ref IDENT: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .expect("invalid identifier regex");

    static ref PACKAGE: Regex = Regex::new(r"(?m)^[ \t]*package[ \t]+([^\s#]*)")
        .expect("invalid package regex");

    static ref PACKAGE_LINE: Regex = Regex::new(r"(?m)^[ \t]*package[ \t]+[^\n]*(?:\n|$)")
        .expect("invalid package line regex");

    static ref IMPORT_LINE: Regex = Regex::new(r"(?m)^[ \t]*import[ \t]+([^\n]*?)[ \t]*\r?(?:\n|$)")
        .expect("invalid import regex");
}

pub(crate) fn is_identifier(s: &str) -> bool {
    IDENT.is_match(s)
}

// True when `base` is `input`, `input.parameters` or a path below it.
fn is_parameter_base(base: &str) -> bool {
    if base == "input" {
        return true;
    }
    for root in ["input.parameters", "input[\"parameters\"]"] {
        if let Some(rest) = base.strip_prefix(root) {
            return rest.is_empty() || rest.starts_with('.') || rest.starts_with('[');
        }
    }
    false
}

fn rewrite_indirect_get(caps: &Captures<'_>) -> String {
    let base = &caps[2];
    if !is_parameter_base(base) {
        return caps[0].to_string();
    }
    let key = &caps[3];
    if is_identifier(key) {
        format!("{}{base}.{key}", &caps[1])
    } else {
        format!("{}{base}[\"{key}\"]", &caps[1])
    }
}

/// Collapses `get(BASE, "KEY", DEFAULT)` into `BASE.KEY` until no rewrite
/// applies. Nested calls unwrap one level per pass.
pub fn normalize_indirect_access(expr: &str) -> String {
    let mut text = expr.to_string();
    loop {
        let next = match INDIRECT_GET.replace_all(&text, rewrite_indirect_get) {
            Cow::Borrowed(_) => return text,
            Cow::Owned(next) => next,
        };
        if next == text {
            return text;
        }
        text = next;
    }
}

/// Every substring of `text` that is a reference under `input.parameters`.
pub fn extract_parameter_refs(text: &str) -> BTreeSet<String> {
    PARAMETER_REF
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether a value may lead to parameters. A bare `input` counts since it
/// can be narrowed to `input.parameters` later.
pub fn is_parameter_expr(text: &str) -> bool {
    let text = text.trim();
    text == "input" || text == "input.parameters" || text.starts_with("input.parameters.")
}

/// Replaces whole identifiers found in `aliases` with their text.
/// String literals and field names after `.` are left alone.
pub fn substitute_aliases(text: &str, aliases: &BTreeMap<String, String>) -> String {
    if aliases.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    let mut prev = '\0';
    while let Some((start, ch)) = chars.next() {
        match ch {
            '"' => {
                out.push(ch);
                let mut escaped = false;
                for (_, c) in chars.by_ref() {
                    out.push(c);
                    match c {
                        '\\' if !escaped => escaped = true,
                        '"' if !escaped => break,
                        _ => escaped = false,
                    }
                }
                prev = '"';
            }
            '`' => {
                out.push(ch);
                for (_, c) in chars.by_ref() {
                    out.push(c);
                    if c == '`' {
                        break;
                    }
                }
                prev = '`';
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some((idx, c)) = chars.peek() {
                    if !(c.is_ascii_alphanumeric() || *c == '_') {
                        break;
                    }
                    end = idx + c.len_utf8();
                    chars.next();
                }
                let ident = &text[start..end];
                match aliases.get(ident) {
                    Some(value) if prev != '.' => out.push_str(value),
                    _ => out.push_str(ident),
                }
                prev = 'a';
            }
            c => {
                out.push(c);
                prev = c;
            }
        }
    }
    out
}

/// Name declared by the first `package` line, or "" if there is none.
pub fn package_name(source: &str) -> String {
    PACKAGE
        .captures(source)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

pub fn strip_imports(source: &str) -> String {
    IMPORT_LINE.replace_all(source, "").into_owned()
}

pub fn strip_package(source: &str) -> String {
    PACKAGE_LINE.replace_all(source, "").into_owned()
}

/// Import paths that change the keyword set, e.g. `future.keywords.in`
/// or `rego.v1`, in order of appearance.
pub fn keyword_imports(source: &str) -> Vec<String> {
    IMPORT_LINE
        .captures_iter(source)
        .map(|c| c[1].split('#').next().unwrap_or_default().trim().to_string())
        .filter(|path| path == "rego.v1" || path.starts_with("future.keywords"))
        .collect()
}

/// Inserts `text` on the line after the first `package` line, or at the
/// start when there is none.
pub fn insert_after_package(source: &str, text: &str) -> String {
    let pos = PACKAGE_LINE.find(source).map(|m| m.end()).unwrap_or(0);
    let mut out = String::with_capacity(source.len() + text.len() + 1);
    out.push_str(&source[..pos]);
    if pos > 0 && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(text);
    out.push_str(&source[pos..]);
    out
}
