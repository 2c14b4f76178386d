// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::CompileError;

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::Integer => "integer",
            ScalarType::Boolean => "boolean",
            ScalarType::Null => "null",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => ScalarType::String,
            "number" => ScalarType::Number,
            "integer" => ScalarType::Integer,
            "boolean" => ScalarType::Boolean,
            "null" => ScalarType::Null,
            _ => return None,
        })
    }
}

/// Type of a parameter.
///
/// `Unknown` is the inferred `any`: traced paths say where a value lives,
/// not what it holds. Array elements are never arrays themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParamType {
    Scalar(ScalarType),
    Object,
    Unknown,
    Array(Box<ParamType>),
}

impl ParamType {
    pub fn array_of(elem: ParamType) -> Self {
        ParamType::Array(Box::new(elem))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ParamType::Array(_))
    }

    /// The element type of an array, or the type itself.
    pub fn element(&self) -> &ParamType {
        match self {
            ParamType::Array(elem) => elem,
            t => t,
        }
    }

    /// Whether this type only comes from inference.
    pub fn is_synthetic(&self) -> bool {
        matches!(self.element(), ParamType::Unknown)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Scalar(s) => f.write_str(s.as_str()),
            ParamType::Object => f.write_str("object"),
            ParamType::Unknown => f.write_str("any"),
            ParamType::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

impl FromStr for ParamType {
    type Err = CompileError;

    /// Parses the declared vocabulary plus the inferred `any` and `any[]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, is_array) = match s.strip_suffix("[]") {
            Some(name) => (name, true),
            None => (s, false),
        };
        let elem = match name {
            "object" => ParamType::Object,
            "any" => ParamType::Unknown,
            _ => match ScalarType::from_name(name) {
                Some(scalar) => ParamType::Scalar(scalar),
                None => return Err(CompileError::InvalidParamType(s.to_string())),
            },
        };
        Ok(if is_array {
            ParamType::array_of(elem)
        } else {
            elem
        })
    }
}

impl TryFrom<String> for ParamType {
    type Error = CompileError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ParamType> for String {
    fn from(t: ParamType) -> Self {
        t.to_string()
    }
}

/// Checks a declared parameter type against
/// `string`, `number`, `integer`, `object`, `boolean`, `null`,
/// each optionally suffixed by `[]`.
pub fn validate_param_type(declared: &str) -> Result<ParamType, CompileError> {
    match declared.parse::<ParamType>() {
        Ok(t) if !t.is_synthetic() => Ok(t),
        _ => Err(CompileError::InvalidParamType(declared.to_string())),
    }
}

/// A node of the parameter tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDef {
    pub key: String,

    #[serde(rename = "type")]
    pub param_type: ParamType,

    /// Raw serialized default; empty when there is none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_value: String,

    #[serde(default)]
    pub is_array: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ParameterDef>,
}

impl ParameterDef {
    pub fn new(key: impl Into<String>, param_type: ParamType) -> Self {
        let is_array = param_type.is_array();
        Self {
            key: key.into(),
            param_type,
            default_value: String::new(),
            is_array,
            children: vec![],
        }
    }

    pub fn with_children(mut self, children: Vec<ParameterDef>) -> Self {
        self.children = children;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = default_value.into();
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Validates an authored parameter tree. Inferred types are not accepted
/// and `isArray` must agree with the type.
pub fn validate_parameter_defs(defs: &[ParameterDef]) -> Result<(), CompileError> {
    for def in defs {
        let declared = def.param_type.to_string();
        validate_param_type(&declared)?;
        if def.is_array != def.param_type.is_array() {
            return Err(CompileError::InvalidParamType(format!(
                "{declared} (isArray: {})",
                def.is_array
            )));
        }
        validate_parameter_defs(&def.children)?;
    }
    Ok(())
}

// Splits a parameter path into (key, is_array) segments below
// `input.parameters`. `["x"]` yields the key `x` and `[_]` marks the
// preceding segment as an array.
fn path_segments(path: &str) -> Vec<(String, bool)> {
    fn flush(current: &mut String, segments: &mut Vec<(String, bool)>) {
        if !current.is_empty() {
            segments.push((core::mem::take(current), false));
        }
    }

    let rest = ["input.parameters", "input[\"parameters\"]"]
        .iter()
        .find_map(|root| path.strip_prefix(root))
        .unwrap_or(path);

    let mut segments = vec![];
    let mut current = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '.' => flush(&mut current, &mut segments),
            '[' => {
                flush(&mut current, &mut segments);
                if chars.peek() == Some(&'"') {
                    chars.next();
                    let mut key: String = chars.by_ref().take_while(|c| *c != '"').collect();
                    // Closing bracket.
                    chars.next();
                    flush(&mut key, &mut segments);
                } else {
                    let index: String = chars.by_ref().take_while(|c| *c != ']').collect();
                    if index == "_" {
                        if let Some(last) = segments.last_mut() {
                            last.1 = true;
                        }
                    }
                }
            }
            c => current.push(c),
        }
    }
    flush(&mut current, &mut segments);
    segments
}

/// Builds the parameter tree from traced paths.
///
/// Paths are inserted in descending order so that a child path is always
/// seen before its parent. The parent then already exists as a composite
/// node when its own path arrives and is left as is.
#[derive(Debug, Default)]
pub struct ParamDefStore {
    root: Vec<ParameterDef>,
}

impl ParamDefStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str) {
        let segments = path_segments(path);
        let mut children = &mut self.root;
        for (idx, (key, is_array)) in segments.iter().enumerate() {
            let is_leaf = idx + 1 == segments.len();
            let pos = match children.iter().position(|c| &c.key == key) {
                Some(pos) => pos,
                None => {
                    let param_type = match (is_leaf, is_array) {
                        (true, true) => ParamType::array_of(ParamType::Unknown),
                        (true, false) => ParamType::Unknown,
                        (false, true) => ParamType::array_of(ParamType::Object),
                        (false, false) => ParamType::Object,
                    };
                    children.push(ParameterDef::new(key.clone(), param_type));
                    children.len() - 1
                }
            };
            children = &mut children[pos].children;
        }
    }

    pub fn into_defs(self) -> Vec<ParameterDef> {
        self.root
    }
}

/// Builds the parameter tree for a set of traced paths in any order.
///
/// A bracketed key is one segment even when it contains dots:
/// `input.parameters["x.y"]` yields the single key `x.y`, not `x` with a
/// child `y`.
pub fn build_schema<I, S>(refs: I) -> Vec<ParameterDef>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let refs: BTreeSet<String> = refs.into_iter().map(|r| r.as_ref().to_string()).collect();
    let mut store = ParamDefStore::new();
    for path in refs.iter().rev() {
        store.insert(path);
    }
    store.into_defs()
}
