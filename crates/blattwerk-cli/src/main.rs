// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — command-line entry point.
//
// Initialises tracing, loads the converter config, builds the standard
// registry and dispatches to `list`, `describe` or `run`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use blattwerk_core::ConverterConfig;
use blattwerk_document::{Capabilities, Registry};

#[derive(Parser)]
#[command(name = "blattwerk")]
#[command(version)]
#[command(about = "Convert documents and edit PDF pages without leaving the machine", long_about = None)]
struct Cli {
    /// JSON converter config; missing keys keep their defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every registered operation
    List {
        /// Only show one family (e.g. "page operations")
        #[arg(long)]
        family: Option<String>,
    },

    /// Show the inputs, output and options of one operation
    Describe {
        #[arg(value_name = "OPERATION")]
        operation: String,
    },

    /// Run an operation and write its results
    Run {
        #[arg(value_name = "OPERATION")]
        operation: String,

        /// Input file, repeatable and kept in order
        #[arg(short, long = "input", value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Directory the results are written to
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// Operation option as key=value, repeatable
        #[arg(long = "opt", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ConverterConfig::load_or_default(path),
        None => ConverterConfig::default(),
    };
    let registry = Registry::standard(Capabilities::standard(), config);

    match cli.command {
        Command::List { family } => print!("{}", commands::list(&registry, family.as_deref())),
        Command::Describe { operation } => print!("{}", commands::describe(&registry, &operation)?),
        Command::Run {
            operation,
            inputs,
            output,
            options,
        } => {
            let written = commands::run(&registry, &operation, &inputs, &output, &options).await?;
            for line in written {
                println!("{line}");
            }
        }
    }
    Ok(())
}
