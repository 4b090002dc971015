//! Common utilities shared by the splitter phases
//!
//! - File operations: recursive copy, cross-device moves, Go file discovery
//! - Tree fingerprints used to check that a shading pass changed nothing

pub mod file_ops;

pub use file_ops::*;
