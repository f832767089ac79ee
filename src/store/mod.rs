//! Connection storage and definition persistence.
//!
//! This module provides:
//! - Connection types and the in-process registry
//! - Save-time validation and `\n` normalization of definitions
//! - Draft state with snapshot-based dirty tracking

mod draft;
mod repository;
mod types;
mod validation;

pub use draft::{ConnectionDraft, Draft};
pub use repository::ConnectionStore;
pub use types::{
    CloneConnection, Connection, ConnectionTarget, ConnectionUpdate, NewConnection, TargetUpdate,
};
pub use validation::{
    normalize_placeholders, validate_custom_placeholders, validate_external_properties,
    DefinitionErrors, FieldError,
};
