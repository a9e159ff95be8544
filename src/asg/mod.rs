//! The abstract semantic graph: node meta-object protocol, taxonomy, GVN
//! builder and pattern dispatch.
//!
//! ## Architecture
//!
//! ```text
//! nodes      → NodeKind taxonomy, ancestry, attribute schemas
//! mop        → AsgGraph arena, construction, unification, dependency iterators
//! derivation → provenance records (source / expansion / reduction / unification)
//! builder    → GVN-deduplicating builder with predecessor threading
//! pattern    → dynamic-programming memo + most-derived-first dispatch
//! ```
//!
//! Pure-data nodes are identified structurally (kind + compared attributes +
//! recursively unified inputs); sequencing nodes are identified by handle
//! and form an acyclic spine threaded through builder construction.

mod builder;
mod derivation;
mod mop;
mod nodes;
mod pattern;

pub use builder::{Built, BuilderId, GvnBuilder, GvnTable};
pub use derivation::Derivation;
pub use mop::{
    Arg, AsgGraph, AttrRole, AttrSpec, AttrValue, CompileTimeImpl, DataValue, HostObject, NodeId,
    predecessor_topological_order,
};
pub use nodes::NodeKind;
pub use pattern::{
    DynProgMemo, KindPattern, MemoEntry, PatternPredicate, find_matching_pattern,
};
