// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod compiler;
mod error;
mod guard;
mod kinds;
mod params;
mod patterns;
mod printer;
mod schema;
mod syntax;
mod template;
mod tracer;
mod traversal;

pub use compiler::{CompiledTemplate, Compiler, DEFAULT_TARGET};
pub use error::{CompileError, ModuleId};
pub use guard::{
    inject_guard, inject_guard_with, merge_with_libraries, GUARD_MARKER, GUARD_RULE,
    GUARD_RULE_NAME, GUARD_RULE_V1,
};
pub use kinds::{api_group_of, normalize_kinds, ApiGroupKinds, KindSet};
pub use params::{
    build_schema, validate_param_type, validate_parameter_defs, ParamDefStore, ParamType,
    ParameterDef, ScalarType,
};
pub use patterns::{
    extract_parameter_refs, is_parameter_expr, keyword_imports, normalize_indirect_access,
    package_name, strip_imports, strip_package, substitute_aliases,
};
pub use schema::{from_json_schema, to_json_schema, SchemaNode};
pub use template::{
    Policy, PolicyMatch, PolicySource, Template, TemplateSource, CONSTRAINT_API_VERSION,
    TEMPLATE_API_VERSION,
};
pub use tracer::{trace_parameter_paths, CallGraphTracer, DEFAULT_MAX_CALL_DEPTH};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::printer::{Canonical, ToCanonical};
    pub use crate::syntax::{parse_module, ExprExt, RuleExt};
    pub use crate::traversal::traverse;
    pub use regorus::unstable::*;
}
