// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::CompileError;
use crate::kinds::{ApiGroupKinds, KindSet};
use crate::params::ParameterDef;
use crate::schema::SchemaNode;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const TEMPLATE_API_VERSION: &str = "templates.gatekeeper.sh/v1";
pub const CONSTRAINT_API_VERSION: &str = "constraints.gatekeeper.sh/v1beta1";

/// Authored input for a constraint template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSource {
    /// Kind of the constraints the template defines, e.g. `K8sRequiredLabels`.
    pub kind: String,
    pub rego: String,
    #[serde(default)]
    pub libs: Vec<String>,
    /// Parameters declared by hand. When absent they are inferred from the rego.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterDef>>,
}

/// A compiled template, ready to be rendered as a ConstraintTemplate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub kind: String,
    #[serde(rename = "openAPIV3Schema")]
    pub open_api_v3_schema: SchemaNode,
    pub target: String,
    pub rego: String,
    #[serde(default)]
    pub libs: Vec<String>,
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, CompileError> {
    Ok(serde_json::to_value(value)?)
}

impl Template {
    pub fn to_custom_resource(&self) -> Result<Value, CompileError> {
        let mut target = Map::new();
        target.insert("target".to_string(), Value::from(self.target.as_str()));
        target.insert("rego".to_string(), Value::from(self.rego.as_str()));
        if !self.libs.is_empty() {
            target.insert("libs".to_string(), to_value(&self.libs)?);
        }

        Ok(json!({
            "apiVersion": TEMPLATE_API_VERSION,
            "kind": "ConstraintTemplate",
            "metadata": { "name": self.kind.to_lowercase() },
            "spec": {
                "crd": {
                    "spec": {
                        "names": { "kind": self.kind },
                        "validation": {
                            "openAPIV3Schema": to_value(&self.open_api_v3_schema)?,
                        },
                    },
                },
                "targets": [Value::Object(target)],
            },
        }))
    }

    #[cfg(feature = "yaml")]
    pub fn to_yaml(&self) -> Result<String, CompileError> {
        Ok(serde_yaml::to_string(&self.to_custom_resource()?)?)
    }
}

/// Authored input for a constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySource {
    #[serde(default)]
    pub clusters: Vec<String>,
    /// Kind of the template the constraint instantiates.
    pub template: String,
    #[serde(default)]
    pub kinds: Vec<KindSet>,
    /// Other match fields such as `namespaces` or `labelSelector`, kept verbatim.
    #[serde(default, rename = "match")]
    pub match_metadata: IndexMap<String, Value>,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyMatch {
    pub kinds: Vec<ApiGroupKinds>,
    #[serde(flatten)]
    pub metadata: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    pub clusters: Vec<String>,
    pub template: String,
    #[serde(rename = "match")]
    pub match_spec: PolicyMatch,
    pub params: Value,
}

impl Policy {
    pub fn to_constraint(&self, name: &str) -> Result<Value, CompileError> {
        let mut spec = Map::new();
        spec.insert("match".to_string(), to_value(&self.match_spec)?);
        if !self.params.is_null() {
            spec.insert("parameters".to_string(), self.params.clone());
        }

        Ok(json!({
            "apiVersion": CONSTRAINT_API_VERSION,
            "kind": self.template,
            "metadata": { "name": name },
            "spec": Value::Object(spec),
        }))
    }

    #[cfg(feature = "yaml")]
    pub fn to_yaml(&self, name: &str) -> Result<String, CompileError> {
        Ok(serde_yaml::to_string(&self.to_constraint(name)?)?)
    }
}
