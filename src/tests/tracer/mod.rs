// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::*;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct TestCase {
    note: String,
    rego: String,
    #[serde(default)]
    libs: Vec<String>,
    want_paths: Option<Vec<String>>,
    want_parameters: Option<Vec<ParameterDef>>,
    want_error: Option<String>,
    skip: Option<bool>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    std::eprintln!("running {file}");

    for case in test.cases {
        std::print!("case {} ", case.note);
        if case.skip == Some(true) {
            std::println!("skipped");
            continue;
        }

        let src = TemplateSource {
            kind: "TestTemplate".to_string(),
            rego: case.rego.clone(),
            libs: case.libs.clone(),
            parameters: None,
        };

        match (Compiler::new().compile_template(&src), &case.want_error) {
            (Ok(compiled), None) => {
                if let Some(paths) = &case.want_paths {
                    assert_eq!(&compiled.parameter_paths, paths, "{}", case.note);
                }
                if let Some(parameters) = &case.want_parameters {
                    if &compiled.parameters != parameters {
                        let expected = serde_yaml::to_string(parameters)?;
                        let actual = serde_yaml::to_string(&compiled.parameters)?;
                        std::println!(
                            "parameter mismatch :\n{}",
                            prettydiff::diff_lines(&expected, &actual)
                        );
                        panic!("{}", case.note);
                    }
                }
            }
            (Err(actual), Some(expected)) => {
                if !actual.to_string().contains(expected.as_str()) {
                    panic!("`{actual}` does not contain `{expected}`");
                }
            }
            (Ok(_), Some(expected)) => panic!("expected error `{expected}`"),
            (Err(actual), None) => panic!("compile raised `{actual}` unexpectedly."),
        }

        std::eprintln!("passed");
    }

    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    yaml_test_impl(file)
}

#[test_resources("src/tests/tracer/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn unbounded_tracing_matches_bounded() {
    let rego = r#"package cyc

a(x) {
  b(x)
}

b(y) {
  a(y)
  y.name == "n"
}

violation[{"msg": "m"}] {
  a(input.parameters.target)
}
"#;
    let mut compiler = Compiler::new();
    let bounded = compiler.trace_parameters(rego).unwrap();
    compiler.set_max_call_depth(None);
    assert_eq!(compiler.trace_parameters(rego).unwrap(), bounded);
    assert_eq!(
        bounded,
        vec![
            "input.parameters.target".to_string(),
            "input.parameters.target.name".to_string()
        ]
    );
}

#[test]
fn depth_limit_is_configurable() {
    let rego = r#"package deep

f(x) {
  f(x.next)
}

violation[{"msg": "m"}] {
  f(input.parameters.chain)
}
"#;
    let mut compiler = Compiler::new();
    compiler.set_max_call_depth(Some(4));
    assert_eq!(
        compiler.trace_parameters(rego),
        Err(CompileError::CallDepthExceeded {
            rule: "f".to_string(),
            limit: 4
        })
    );
}
