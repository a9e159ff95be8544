//! # smalt
//!
//! Compiler and evaluator for a Smalltalk-flavored expression language.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! pipeline  → source-to-value driver used by the CLI and the tests
//!   ↓
//! interp    → runtime values, message-send runtime, flat-instruction interpreter
//!   ↓
//! schedule  → global code motion: dominator tree, early/late schedule, serialization
//!   ↓
//! semantic  → environments, expansion & analysis, reduction, beta substitution
//!   ↓
//! syntax    → parse-tree → syntax-IR lowering
//!   ↓
//! asg       → node meta-object protocol, graph arena, GVN builder, pattern dispatch
//!   ↓
//! parser    → Logos scanner, parse-tree data types, recursive-descent parser
//!   ↓
//! base      → primitives (SourceCode, SourcePosition)
//! ```
//!
//! The pipeline is: source text → scanner → parse tree → syntax IR (a graph
//! mirroring the parse tree one-to-one) → expansion and analysis (identifier
//! resolution, message-send expansion, constant reduction over a GVN-deduplicated
//! graph) → global code motion scheduling onto the sequencing spine → a flat
//! instruction stream executed by a register-less interpreter.

// ============================================================================
// MODULES (dependency order: base → parser → asg → syntax → semantic → ...)
// ============================================================================

/// Foundation types: SourceCode, SourcePosition
pub mod base;

/// Scanner, parse-tree data types, recursive-descent parser
pub mod parser;

/// Abstract semantic graph: node MOP, graph arena, GVN builder, pattern dispatch
pub mod asg;

/// Lowering from the parse tree into the syntax IR
pub mod syntax;

/// Environments, expansion & analysis, reduction, beta substitution
pub mod semantic;

/// Global code motion scheduling and instruction serialization
pub mod schedule;

/// Runtime values, message-send runtime, flat-instruction interpreter
pub mod interp;

/// Source-to-value driver shared by the CLI and the integration tests
pub mod pipeline;

// Re-export foundation types
pub use base::{SourceCode, SourcePosition};
