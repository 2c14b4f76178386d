// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use regoplate::unstable::{Lexer, Source, TokenKind};
use regoplate::{Compiler, KindSet, PolicySource, TemplateSource};

fn read_file(file: &str) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))
}

fn from_yaml_or_json<T: serde::de::DeserializeOwned>(file: &str) -> Result<T> {
    let contents = read_file(file)?;
    Ok(if file.ends_with(".json") {
        serde_json::from_str(&contents)?
    } else if file.ends_with(".yaml") || file.ends_with(".yml") {
        serde_yaml::from_str(&contents)?
    } else {
        bail!("Unsupported file `{file}`. Must be json or yaml.")
    })
}

fn rego_lex(file: String, verbose: bool) -> Result<()> {
    let source = Source::from_file(&file)?;
    let mut lexer = Lexer::new(&source);

    loop {
        let token = lexer.next_token()?;
        if token.0 == TokenKind::Eof {
            break;
        }

        if verbose {
            // Print each token's line and mark it with ^.
            println!("{}", token.1.message("", ""));
        }

        println!("{token:?}");
    }
    Ok(())
}

fn rego_parse(file: String) -> Result<()> {
    let source = Source::from_file(&file)?;
    let mut parser = regoplate::unstable::Parser::new(&source)?;
    let ast = parser.parse()?;
    println!("{ast:#?}");
    Ok(())
}

fn rego_trace(file: String, max_depth: Option<usize>, unbounded: bool) -> Result<()> {
    let rego = read_file(&file)?;
    let mut compiler = Compiler::new();
    if unbounded {
        compiler.set_max_call_depth(None);
    } else if max_depth.is_some() {
        compiler.set_max_call_depth(max_depth);
    }

    for path in compiler.trace_parameters(&rego)? {
        println!("{path}");
    }
    Ok(())
}

fn rego_schema(paths: Vec<String>) -> Result<()> {
    let defs = regoplate::build_schema(&paths);
    let schema = regoplate::to_json_schema(&defs);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn rego_compile(
    file: String,
    target: Option<String>,
    no_guard: bool,
    v1: bool,
    json: bool,
) -> Result<()> {
    let src: TemplateSource = from_yaml_or_json(&file)?;

    let mut compiler = Compiler::new();
    if let Some(target) = &target {
        compiler.set_target(target);
    }
    compiler.set_guard_enabled(!no_guard);
    compiler.set_rego_v1(v1);

    let compiled = compiler.compile_template(&src)?;
    if json {
        let cr = compiled.template.to_custom_resource()?;
        println!("{}", serde_json::to_string_pretty(&cr)?);
    } else {
        print!("{}", compiled.template.to_yaml()?);
    }
    Ok(())
}

fn rego_policy(file: String, name: String) -> Result<()> {
    let src: PolicySource = from_yaml_or_json(&file)?;
    let policy = Compiler::new().build_policy(&src)?;
    print!("{}", policy.to_yaml(&name)?);
    Ok(())
}

fn rego_kinds(kinds: Vec<String>) -> Result<()> {
    let groups = regoplate::normalize_kinds(&[KindSet::new(kinds)])?;
    println!("{}", serde_json::to_string_pretty(&groups)?);
    Ok(())
}

#[derive(Subcommand)]
enum RegoplateCommand {
    /// Tokenize a Rego policy.
    Lex {
        /// Rego policy file.
        file: String,

        /// Verbose output.
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse a Rego policy.
    Parse {
        /// Rego policy file.
        file: String,
    },

    /// List the parameter paths read by the violation rules of a policy.
    Trace {
        /// Rego policy file.
        file: String,

        /// Bound on nested rule calls.
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,

        /// Trace without a bound on nested rule calls.
        #[arg(long, conflicts_with = "max_depth")]
        unbounded: bool,
    },

    /// Print the openAPIV3Schema inferred from parameter paths.
    Schema {
        /// Paths such as input.parameters.labels[_].key
        #[arg(required(true))]
        paths: Vec<String>,
    },

    /// Compile a template source into a ConstraintTemplate.
    Compile {
        /// Template source. json or yaml.
        file: String,

        /// Admission target.
        #[arg(long, short)]
        target: Option<String>,

        /// Do not inject the identity guard.
        #[arg(long)]
        no_guard: bool,

        /// Parse with Rego v1 keywords enabled.
        #[arg(long)]
        v1: bool,

        /// Emit json instead of yaml.
        #[arg(long)]
        json: bool,
    },

    /// Build a constraint from a policy source.
    Policy {
        /// Policy source. json or yaml.
        file: String,

        /// Name of the constraint.
        #[arg(long, short)]
        name: String,
    },

    /// Resolve kinds to their API groups.
    Kinds {
        #[arg(required(true))]
        kinds: Vec<String>,
    },
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: RegoplateCommand,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        RegoplateCommand::Lex { file, verbose } => rego_lex(file, verbose),
        RegoplateCommand::Parse { file } => rego_parse(file),
        RegoplateCommand::Trace {
            file,
            max_depth,
            unbounded,
        } => rego_trace(file, max_depth, unbounded),
        RegoplateCommand::Schema { paths } => rego_schema(paths),
        RegoplateCommand::Compile {
            file,
            target,
            no_guard,
            v1,
            json,
        } => rego_compile(file, target, no_guard, v1, json),
        RegoplateCommand::Policy { file, name } => rego_policy(file, name),
        RegoplateCommand::Kinds { kinds } => rego_kinds(kinds),
    }
}
