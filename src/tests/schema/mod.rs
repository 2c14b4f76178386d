// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::CompileError;
use crate::params::*;
use crate::schema::*;

use serde_json::json;

fn string() -> ParamType {
    ParamType::Scalar(ScalarType::String)
}

#[test]
fn inferred_tree_to_schema() {
    let defs = build_schema(["input.parameters.labels[_].key", "input.parameters.max"]);
    let schema = serde_json::to_value(to_json_schema(&defs)).unwrap();
    assert_eq!(
        schema,
        json!({
            "type": "object",
            "properties": {
                "max": { "x-kubernetes-preserve-unknown-fields": true },
                "labels": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "key": { "x-kubernetes-preserve-unknown-fields": true }
                        }
                    }
                }
            }
        })
    );
}

#[test]
fn defaults_are_json() {
    let defs = vec![
        ParameterDef::new("replicas", ParamType::Scalar(ScalarType::Integer)).with_default("3"),
        ParameterDef::new("message", string()).with_default("not json"),
        ParameterDef::new("repos", ParamType::array_of(string())).with_default(r#"["a"]"#),
    ];
    let schema = to_json_schema(&defs);
    assert_eq!(schema.properties["replicas"].default, Some(json!(3)));
    assert_eq!(schema.properties["message"].default, Some(json!("not json")));
    assert_eq!(schema.properties["repos"].default, Some(json!(["a"])));
    assert_eq!(
        schema.properties["repos"].items.as_deref().and_then(|i| i.schema_type.as_deref()),
        Some("string")
    );
}

#[test]
fn round_trip() {
    let defs = vec![
        ParameterDef::new("replicas", ParamType::Scalar(ScalarType::Integer)).with_default("3"),
        ParameterDef::new("repos", ParamType::array_of(string())).with_default(r#"["a"]"#),
        ParameterDef::new("labels", ParamType::array_of(ParamType::Object)).with_children(vec![
            ParameterDef::new("key", string()),
            ParameterDef::new("allowedRegex", string()).with_default(r#""^a""#),
        ]),
        ParameterDef::new("tags", ParamType::Object).with_children(vec![ParameterDef::new(
            "enabled",
            ParamType::Scalar(ScalarType::Boolean),
        )]),
        ParameterDef::new("extra", ParamType::Object),
        ParameterDef::new("nothing", ParamType::Scalar(ScalarType::Null)),
    ];

    let back = from_json_schema(&to_json_schema(&defs)).unwrap();
    assert_eq!(back, defs);
}

#[test]
fn composite_any_reads_back_as_object() {
    let defs = vec![ParameterDef::new("a", ParamType::Unknown)
        .with_children(vec![ParameterDef::new("b", ParamType::Unknown)])];

    let schema = to_json_schema(&defs);
    assert_eq!(schema.properties["a"].schema_type.as_deref(), Some("object"));

    let back = from_json_schema(&schema).unwrap();
    assert_eq!(back[0].param_type, ParamType::Object);
    assert_eq!(back[0].children[0].param_type, ParamType::Unknown);
}

#[test]
fn schema_json_is_read() {
    let schema: SchemaNode = serde_json::from_value(json!({
        "type": "object",
        "properties": {
            "labels": {
                "type": "array",
                "description": "required labels",
                "items": { "type": "string" },
                "default": ["team"]
            }
        }
    }))
    .unwrap();

    let defs = from_json_schema(&schema).unwrap();
    assert_eq!(
        defs,
        vec![ParameterDef::new("labels", ParamType::array_of(string())).with_default(r#"["team"]"#)]
    );
    assert!(defs[0].is_array);
}

#[test]
fn nested_arrays_are_rejected() {
    let schema: SchemaNode = serde_json::from_value(json!({
        "type": "object",
        "properties": {
            "matrix": { "type": "array", "items": { "type": "array", "items": { "type": "string" } } }
        }
    }))
    .unwrap();
    assert_eq!(
        from_json_schema(&schema),
        Err(CompileError::InvalidParamType("string[][]".to_string()))
    );
}

#[test]
fn unknown_types_are_rejected() {
    let schema: SchemaNode = serde_json::from_value(json!({
        "type": "object",
        "properties": { "x": { "type": "strings" } }
    }))
    .unwrap();
    assert_eq!(
        from_json_schema(&schema),
        Err(CompileError::InvalidParamType("strings".to_string()))
    );
}
