//! MKB - Modal Knowledge Base
//!
//! Command-line interface: parse a query, evaluate it against the
//! configured reasoners and print the streamed answers.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use mkb::{parser, KnowledgeBase, PrefixRegistry, DEFAULT_STREAM_CAPACITY};

#[derive(Parser)]
#[command(name = "mkb", version, about = "Modal knowledge base query engine")]
struct Cli {
    /// Query string to evaluate, e.g. 'member(X, [a, b, c])'
    query: String,

    /// TOML configuration file declaring the reasoners to load
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Register an IRI prefix as alias=uri (repeatable)
    #[arg(long = "prefix", value_name = "ALIAS=URI")]
    prefixes: Vec<String>,

    /// Print the parsed formula and exit without evaluating
    #[arg(long)]
    parse_only: bool,

    /// Emit answers as JSON records instead of substitution text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct AnswerRecord {
    bindings: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    for entry in &cli.prefixes {
        let Some((alias, uri)) = entry.split_once('=') else {
            bail!("invalid --prefix '{}', expected ALIAS=URI", entry);
        };
        PrefixRegistry::global().register(alias, uri);
    }

    let goal = parser::parse(&cli.query)?;
    if cli.parse_only {
        println!("{}", goal);
        return Ok(());
    }

    let config: toml::Value = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            text.parse().context("parsing config file")?
        }
        // one local computable backend when nothing is configured
        None => "[[reasoner]]\ntype = \"Computable\"".parse().expect("default config"),
    };

    let kb = KnowledgeBase::new(&config)?;

    let mut count = 0usize;
    for answer in kb.submit_query(goal, DEFAULT_STREAM_CAPACITY) {
        count += 1;
        if cli.json {
            let record = AnswerRecord {
                bindings: answer
                    .substitution()
                    .iter()
                    .map(|(var, term)| (var.name().to_string(), term.to_string()))
                    .collect(),
                confidence: answer.confidence(),
            };
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!("{}", answer.substitution());
        }
    }
    eprintln!("{} answer(s).", count);
    Ok(())
}
