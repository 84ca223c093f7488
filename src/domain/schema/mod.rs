//! Annotation schema: declared tag types and their grammar

pub mod ids;
pub mod model;
pub mod parser;

// Re-export main types
pub use ids::IdCounters;
pub use model::{ArgumentType, AttributeType, Schema, TagType, ValueSet};
pub use parser::SchemaParser;
