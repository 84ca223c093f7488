//! Interchange XML format: encoder, two-pass decoder and structural probes

pub mod decode;
pub mod encode;
pub mod probe;
mod scan;

pub use decode::{decode, AnnotatedDocument, DecodeOptions, DecodeWarning, Decoded};
pub use encode::{encode, EncodeOptions, DEFAULT_ROOT};
