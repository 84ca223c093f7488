//! Domain layer - Schema, span algebra and tag model

pub mod schema;
pub mod spans;
pub mod tags;

pub use schema::{Schema, SchemaParser, TagType};
pub use spans::SpanRange;
pub use tags::{ExtentTag, LinkTag, Tag};
