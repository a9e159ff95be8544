//! Semantic analysis: environments, expansion, reduction and substitution.
//!
//! ## Architecture
//!
//! ```text
//! environment → top-level target env, copy-on-write children, functional
//!               frames with capture tracking
//! analysis    → dynamic-programming expansion of syntax IR to analyzed IR
//! reduce      → constant reduction of literal primitive applications,
//!               beta substitution for inlining
//! ```

mod analysis;
mod environment;
mod reduce;

pub use analysis::{AnalysisResult, Expander, expand_and_analyze};
pub use environment::{
    Environment, FunctionalEnv, TopLevelEnv, make_script_analysis_environment,
};
pub use reduce::{
    BetaSubstitutionAlgorithm, BetaSubstitutionContext, ReductionAlgorithm,
    is_reducible_literal_application,
};
