//! The source-to-value driver: scan, parse, lower, analyze, schedule,
//! interpret. Shared by the CLI binary and the integration tests.

use std::path::Path;

use thiserror::Error;

use crate::asg::AsgGraph;
use crate::interp::{Interp, InterpretableInstructions, Runtime, RuntimeError, Value};
use crate::parser::{collect_errors, parse_source_string};
use crate::schedule::schedule_top_level_script;
use crate::semantic::{TopLevelEnv, expand_and_analyze, make_script_analysis_environment};
use crate::syntax::lower_parse_tree;

/// A failure of one pipeline stage. Parse and analysis failures carry the
/// already formatted `<position>: <message>` diagnostics.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{} parse error(s)", .diagnostics.len())]
    Parse { diagnostics: Vec<String> },

    #[error("{} analysis error(s)", .diagnostics.len())]
    Analysis { diagnostics: Vec<String> },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl PipelineError {
    /// The per-line diagnostics of a parse or analysis failure.
    pub fn diagnostics(&self) -> &[String] {
        match self {
            PipelineError::Parse { diagnostics } | PipelineError::Analysis { diagnostics } => {
                diagnostics
            }
            _ => &[],
        }
    }
}

/// Parse, analyze and evaluate one source string against a fresh top-level
/// target environment, returning the script's value.
pub fn evaluate_source(
    runtime: &Runtime,
    text: &str,
    name: &str,
) -> Result<Value, PipelineError> {
    let (_, parse_tree) = parse_source_string(text, name);
    let parse_errors = collect_errors(&parse_tree);
    if !parse_errors.is_empty() {
        return Err(PipelineError::Parse {
            diagnostics: parse_errors
                .iter()
                .map(|(position, message)| format!("{position}: {message}"))
                .collect(),
        });
    }

    let mut graph = AsgGraph::new();
    let syntax_root = lower_parse_tree(&mut graph, &parse_tree);

    let top_level = TopLevelEnv::new(&mut graph);
    let environment = make_script_analysis_environment(top_level, name);
    let analysis = expand_and_analyze(&mut graph, environment, syntax_root);
    if !analysis.errors.is_empty() {
        let diagnostics = analysis
            .errors
            .iter()
            .map(|error| {
                format!(
                    "{}: {}",
                    graph.position_of(*error),
                    graph.str_attr(*error, "message")
                )
            })
            .collect();
        return Err(PipelineError::Analysis { diagnostics });
    }

    let scheduled = schedule_top_level_script(&graph, analysis.root);
    let instructions = InterpretableInstructions::new(&graph, runtime, &scheduled)?;
    tracing::debug!(functional = %instructions.functional(), "evaluating scheduled script");

    let interp = Interp::new(&graph, runtime);
    let result = instructions.evaluate_with_arguments(&interp, &[])?;
    Ok(result)
}

/// Evaluate one source file.
pub fn evaluate_file(runtime: &Runtime, path: &Path) -> Result<Value, PipelineError> {
    let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.display().to_string(),
        source,
    })?;
    evaluate_source(runtime, &text, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(text: &str) -> Result<Value, PipelineError> {
        let runtime = Runtime::with_captured_stdout();
        evaluate_source(&runtime, text, "<test>")
    }

    #[test]
    fn test_literal_script() {
        let value = evaluate("42").unwrap();
        assert!(value.value_equals(&Value::Integer(42)));
    }

    #[test]
    fn test_parse_errors_halt_the_pipeline() {
        let error = evaluate("'unterminated").unwrap_err();
        assert!(matches!(error, PipelineError::Parse { .. }));
        assert!(!error.diagnostics().is_empty());
    }

    #[test]
    fn test_analysis_errors_halt_before_scheduling() {
        let error = evaluate("undefinedThing").unwrap_err();
        match error {
            PipelineError::Analysis { diagnostics } => {
                assert_eq!(diagnostics.len(), 1);
                assert!(diagnostics[0].contains("undefinedThing"));
            }
            other => panic!("expected an analysis error, got {other:?}"),
        }
    }
}
