//! Application layer - Use cases and orchestration

pub mod session;
pub mod validate;

pub use session::{AnnotationSession, LoadReport};
pub use validate::{ValidateService, ValidationOutcome, ValidationReport};
