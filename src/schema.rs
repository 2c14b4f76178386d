// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversion between parameter trees and the `openAPIV3Schema` carried by a
//! ConstraintTemplate.
//!
//! Only the subset of JSON Schema that Kubernetes structural schemas need is
//! modelled:
//!
//! ```text
//! ParameterDef                      JSON Schema
//! ------------                      -----------
//! string / number / ... leaf        { "type": "string" }
//! object with children              { "type": "object", "properties": { ... } }
//! object leaf                       { "type": "object", "x-kubernetes-preserve-unknown-fields": true }
//! any                               { "x-kubernetes-preserve-unknown-fields": true }
//! T[]                               { "type": "array", "items": <T> }
//! ```
//!
//! `any` is an inference placeholder, not part of the declared type
//! vocabulary. An `any` node that has children is emitted as an object, so a
//! round trip turns it into `object`. A leaf `any` survives the round trip
//! because a node without `type` reads back as `any`.
//!
//! Defaults are stored raw on ParameterDef. They are parsed as JSON when
//! emitted, falling back to a JSON string for text that is not valid JSON.

use crate::error::CompileError;
use crate::params::{validate_param_type, ParamType, ParameterDef};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(
        rename = "x-kubernetes-preserve-unknown-fields",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub preserve_unknown_fields: Option<bool>,
}

impl SchemaNode {
    fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    fn unconstrained(schema_type: Option<&str>) -> Self {
        Self {
            schema_type: schema_type.map(str::to_string),
            preserve_unknown_fields: Some(true),
            ..Self::default()
        }
    }

    fn object(children: &[ParameterDef]) -> Self {
        let mut node = Self::typed("object");
        node.properties = children
            .iter()
            .map(|c| (c.key.clone(), def_to_node(c)))
            .collect();
        node
    }
}

fn parse_default(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

// Node for a single (non-array) value of `def`.
fn element_node(def: &ParameterDef, elem: &ParamType) -> SchemaNode {
    if !def.children.is_empty() {
        return SchemaNode::object(&def.children);
    }
    match elem {
        ParamType::Scalar(s) => SchemaNode::typed(s.as_str()),
        ParamType::Object => SchemaNode::unconstrained(Some("object")),
        // Element types are never arrays.
        ParamType::Unknown | ParamType::Array(_) => SchemaNode::unconstrained(None),
    }
}

fn def_to_node(def: &ParameterDef) -> SchemaNode {
    let elem = def.param_type.element();
    let mut node = if def.is_array || def.param_type.is_array() {
        let mut node = SchemaNode::typed("array");
        node.items = Some(Box::new(element_node(def, elem)));
        node
    } else {
        element_node(def, elem)
    };

    if !def.default_value.is_empty() {
        node.default = Some(parse_default(&def.default_value));
    }
    node
}

/// Schema of the parameters object described by `defs`.
pub fn to_json_schema(defs: &[ParameterDef]) -> SchemaNode {
    SchemaNode::object(defs)
}

fn children_of(node: &SchemaNode) -> Result<Vec<ParameterDef>, CompileError> {
    node.properties
        .iter()
        .map(|(key, child)| node_to_def(key, child))
        .collect()
}

fn node_to_def(key: &str, node: &SchemaNode) -> Result<ParameterDef, CompileError> {
    let mut def = match node.schema_type.as_deref() {
        Some("array") => {
            let elem = match &node.items {
                Some(items) => node_to_def(key, items)?,
                None => ParameterDef::new(key, ParamType::Unknown),
            };
            if elem.param_type.is_array() {
                return Err(CompileError::InvalidParamType(format!(
                    "{}[]",
                    elem.param_type
                )));
            }
            ParameterDef::new(key, ParamType::array_of(elem.param_type))
                .with_children(elem.children)
        }
        Some("object") => ParameterDef::new(key, ParamType::Object).with_children(children_of(node)?),
        Some(declared) => {
            let param_type = validate_param_type(declared)?;
            if param_type.is_array() {
                return Err(CompileError::InvalidParamType(declared.to_string()));
            }
            ParameterDef::new(key, param_type)
        }
        None => ParameterDef::new(key, ParamType::Unknown).with_children(children_of(node)?),
    };

    if let Some(default) = &node.default {
        def.default_value = serde_json::to_string(default)?;
    }
    Ok(def)
}

/// Parameter tree described by a schema of the parameters object.
pub fn from_json_schema(node: &SchemaNode) -> Result<Vec<ParameterDef>, CompileError> {
    children_of(node)
}
