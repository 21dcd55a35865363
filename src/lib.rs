//! Partial Schema
//!
//! Derive variants of schema models in which selected fields become optional.
//!
//! A partial model keeps every field type, constraint and nested structure of
//! its base model, but the chosen fields accept the absent marker (`null`) and
//! default to it. This lets callers build or describe reduced representations
//! of a model, such as patch payloads or sparse responses.
//!
//! # Example
//!
//! ```
//! use partial_schema::{Annotation, FieldInfo, Model, PartialModel};
//!
//! let person = Model::builder("Person")
//!     .field("name", FieldInfo::required(Annotation::string()))
//!     .field("age", FieldInfo::required(Annotation::integer()))
//!     .derivable()
//!     .build();
//!
//! // Every field optional
//! let full = person.as_partial(&[], false).unwrap();
//! assert_eq!(full.name(), "PersonPartial");
//! assert!(!full.field("name").unwrap().is_required());
//!
//! // Only "age" optional
//! let age = person.as_partial(&["age"], false).unwrap();
//! assert!(age.field("name").unwrap().is_required());
//!
//! // Equal requests give the same model object
//! assert_eq!(age, person.as_partial(&["age"], false).unwrap());
//! ```
//!
//! # Selectors
//!
//! | Selector | Effect |
//! |----------|--------|
//! | (none) | Every top-level field becomes optional |
//! | `"age"` | `age` becomes optional |
//! | `"address.city"` | `address` keeps its optionality; its type becomes a partial model with `city` optional |
//! | `"address.*"` | `address` type becomes a partial model with every field optional |
//!
//! With `recursive` set, every derivable model nested in a selected field is
//! replaced by its fully partial variant. Selectors that match no field are
//! ignored.

mod cache;
mod derive;
mod error;
mod json_schema;
mod loader;
mod model;
mod partial;
mod types;

pub use cache::DerivationCache;
pub use derive::Deriver;
pub use error::{SchemaError, SynthesisError};
pub use json_schema::{to_json_schema, SchemaModels};
pub use loader::{is_url, load_schema, load_schema_auto, load_schema_str, navigate_fragment};
pub use model::{FieldOverride, InheritingFactory, Model, ModelBuilder, ModelFactory, ModelRef};
pub use partial::{derive_partial, partial_model, PartialModel};
pub use types::{
    Annotation, DefaultFactory, FieldInfo, PartialOptions, ScalarType, PARTIAL_SUFFIX, WILDCARD,
};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
