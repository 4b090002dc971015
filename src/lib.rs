//! Go Splitter - Split one Go file into a self-contained module.
//!
//! Declarations are bucketed into types, functions and methods files, the
//! external dependency closure is vendored into a private `third_party/`
//! subtree, and every external import is shaded into that namespace.

// Common utilities
pub mod common;

pub mod constants;
pub mod debug_log;
pub mod error;

// Go source front end
pub mod go;

// Pipeline phases and orchestration
pub mod splitter;

pub use error::SplitError;
pub use splitter::{SplitConfig, SplitReport, Splitter};
