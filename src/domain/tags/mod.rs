//! Tag model

pub mod model;

// Re-export main types
pub use model::{compare_tids, Argument, Attribute, ExtentTag, LinkTag, Tag};
