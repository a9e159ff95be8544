//! Node derivations: provenance records attached to every graph node.
//!
//! A derivation answers "where did this node come from": directly from
//! source code, from expanding another node, from a constant reduction, or
//! from nowhere (built-in bindings). Derivations never participate in
//! structural unification.

use crate::base::SourcePosition;

use super::mop::{AsgGraph, NodeId};

/// Provenance of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    /// Built directly from a region of source code.
    SourceCode(SourcePosition),
    /// Produced by expanding `source` during analysis.
    SyntaxExpansion { source: NodeId },
    /// Produced by reducing `source` (literal primitive folding).
    Reduction { source: NodeId },
    /// Canonicalized from `original` by global value numbering.
    Unification { original: NodeId },
    /// No provenance (built-in bindings, synthesized nodes).
    None,
}

impl Derivation {
    /// The source position, following expansion chains back to source code.
    pub fn position(&self, graph: &AsgGraph) -> SourcePosition {
        match self {
            Derivation::SourceCode(position) => position.clone(),
            Derivation::SyntaxExpansion { source }
            | Derivation::Reduction { source }
            | Derivation::Unification { original: source } => graph.position_of(*source),
            Derivation::None => SourcePosition::empty(),
        }
    }
}
