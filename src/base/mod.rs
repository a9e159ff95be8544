//! Foundation types for the smalt toolchain.
//!
//! This module provides fundamental types used throughout the compiler:
//! - [`SourceCode`] - A loaded source file (or string) retained by reference
//! - [`SourcePosition`] - Byte span plus line/column coordinates
//!
//! This module has NO dependencies on other smalt modules.

mod position;

pub use position::{SourceCode, SourcePosition};
