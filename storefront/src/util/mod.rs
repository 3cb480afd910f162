//! Small helpers shared across features

pub mod serialization;

pub use serialization::{RequestFailure, SerializableError, make_error_serializable};
