//! annotask - Schema-driven text annotation
//!
//! Parses DTD-like task schemas, models span-anchored extent tags and the
//! link tags that connect them, and reads and writes annotated documents in
//! a flat XML interchange format.

pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::AnnotaskError;
