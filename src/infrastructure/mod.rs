//! Infrastructure layer: files, configuration, storage and the XML codec

pub mod config;
pub mod repository;
pub mod store;
pub mod xml;

pub use config::Config;
pub use repository::TaskFiles;
pub use store::{AnnotationStore, MemoryStore};
