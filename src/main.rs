//! Command-line driver: parse, analyze and evaluate each input script in
//! order, exiting nonzero when any file fails a pipeline stage.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use smalt::interp::Runtime;
use smalt::pipeline::{PipelineError, evaluate_file};

#[derive(Parser, Debug)]
#[command(
    name = "smalt",
    version,
    about = "Compile and evaluate Smalltalk-flavored expression scripts"
)]
struct Cli {
    /// Input source files, evaluated in order.
    inputs: Vec<PathBuf>,

    /// Print each script's result value.
    #[arg(short = 'v')]
    verbose: bool,

    /// Output file name (reserved).
    #[arg(short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Accept the single-dash long spellings alongside clap's own.
    let args: Vec<String> = std::env::args()
        .map(|argument| match argument.as_str() {
            "-help" => "--help".to_string(),
            "-version" => "--version".to_string(),
            _ => argument,
        })
        .collect();
    let cli = Cli::parse_from(args);

    if cli.inputs.is_empty() {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }
    if let Some(output) = &cli.output {
        tracing::debug!(output = %output.display(), "output file name is reserved");
    }

    let mut success = true;
    for input in &cli.inputs {
        // The runtime's block-schedule cache is keyed by node handle, so
        // each script (own graph, own handles) gets a fresh runtime.
        let runtime = Runtime::new();
        match evaluate_file(&runtime, input) {
            Ok(value) => {
                if cli.verbose && !matches!(value, smalt::interp::Value::Nil) {
                    println!("{value}");
                }
            }
            Err(error) => {
                success = false;
                match &error {
                    PipelineError::Parse { diagnostics }
                    | PipelineError::Analysis { diagnostics } => {
                        for diagnostic in diagnostics {
                            eprintln!("{diagnostic}");
                        }
                    }
                    other => eprintln!("{other}"),
                }
            }
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
