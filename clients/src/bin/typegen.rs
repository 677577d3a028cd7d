//! `typegen` — Compiles a JSON model and prints the generated decoders.
//!
//! The model file is either an array of declarations or an object with
//! `properties` (model-level metadata such as `coding.references`) and
//! `declarations`.
//!
//! **Usage:**
//! ```
//! typegen --model <path> [--processors coding,docs] [--references decoder|codec] [--out <path>] [--json]
//! ```
//!
//! Exits non-zero if the model does not compile or a declaration produced
//! no fragment.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use typegen_check::processors::coding;
use typegen_check::{compile_with, Processor};
use typegen_codegen::{emit, generate, listing, DecoderOptions};
use typegen_ir::model::{Declaration, Position, UncheckedModel, Unresolved};
use typegen_ir::property::{Properties, Property};

/// Compile a typegen model into decoder fragments.
#[derive(Parser)]
#[command(name = "typegen", about = "Generate decoders from a typegen model")]
struct Args {
    /// JSON model file.
    #[arg(long)]
    model: PathBuf,

    /// Processors to run, in order.
    #[arg(long, value_delimiter = ',', default_value = "coding,docs")]
    processors: Vec<String>,

    /// How sibling declarations are referenced; overrides the model.
    #[arg(long, value_enum)]
    references: Option<References>,

    /// Write the output here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print fragments as JSON instead of a listing.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum References {
    Decoder,
    Codec,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelFile {
    Bare(Vec<Declaration<Unresolved>>),
    Full {
        #[serde(default)]
        properties: Properties,
        declarations: Vec<Declaration<Unresolved>>,
    },
}

fn render_position(file: &str) -> impl Fn(&Position) -> String + '_ {
    move |p| format!("{}:{}:{}", p.file.as_deref().unwrap_or(file), p.line, p.column)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let file = args.model.display().to_string();
    let source = fs::read_to_string(&args.model)
        .with_context(|| format!("Failed to read {file}"))?;
    let (mut properties, declarations) = match serde_json::from_str::<ModelFile>(&source)
        .with_context(|| format!("Failed to parse {file}"))?
    {
        ModelFile::Bare(declarations) => (Properties::new(), declarations),
        ModelFile::Full {
            properties,
            declarations,
        } => (properties, declarations),
    };

    if let Some(references) = args.references {
        let label = match references {
            References::Decoder => "decoder",
            References::Codec => "codec",
        };
        properties.insert(
            coding::REFERENCES,
            Property::enumeration(coding::REFERENCE_STYLES, label),
        );
    }

    let processors = args
        .processors
        .iter()
        .map(|name| {
            Processor::from_name(name).with_context(|| format!("Unknown processor: {name}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let model = match UncheckedModel::new(declarations) {
        Ok(model) => model,
        Err(errors) => {
            for err in &errors {
                eprintln!("{file}: {err}");
            }
            bail!("{} model error(s)", errors.len());
        }
    };

    let compiled = match compile_with(&model, properties, &processors) {
        Ok(compiled) => compiled,
        Err(err) => {
            for line in err.render(render_position(&file)) {
                eprintln!("{line}");
            }
            bail!("{err}");
        }
    };

    let options = DecoderOptions::from_api(&compiled.api())
        .context("The coding processor must run before generation")?;
    let report = generate(&compiled, &options);
    info!(
        aliases = report.alias_count,
        sums = report.sum_count,
        enums = report.enum_count,
        refinements = report.restricted_count,
        "generated"
    );

    let output = if args.json {
        serde_json::to_string_pretty(&report.fragments).context("Failed to serialize fragments")?
    } else {
        listing::render(&report.fragments)
    };
    match &args.out {
        Some(path) => {
            emit::write_file(path, &output)?;
            println!("Written: {}", path.display());
        }
        None => print!("{output}"),
    }

    for err in &report.errors {
        eprintln!("{file}: {err}");
    }
    if !report.is_complete() {
        eprintln!("{} declaration(s) produced no fragment.", report.errors.len());
        process::exit(1);
    }
    Ok(())
}
