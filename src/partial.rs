//! The `as_partial` capability and the global entry points.

use crate::cache::DerivationCache;
use crate::derive::Deriver;
use crate::error::SynthesisError;
use crate::model::{InheritingFactory, ModelRef};
use crate::types::PartialOptions;

/// Models offering partial derivation.
///
/// Nested fields typed with a derivable model (see
/// [`ModelBuilder::derivable`](crate::ModelBuilder::derivable)) take part in
/// recursive and dotted-path derivation.
pub trait PartialModel {
    /// Derive a variant of this model with `fields` made optional.
    ///
    /// Calls with equal arguments return the same model object.
    fn as_partial(&self, fields: &[&str], recursive: bool) -> Result<ModelRef, SynthesisError>;
}

impl PartialModel for ModelRef {
    fn as_partial(&self, fields: &[&str], recursive: bool) -> Result<ModelRef, SynthesisError> {
        partial_model(self, fields, recursive)
    }
}

/// Derive a partial model through the global cache and the
/// [`InheritingFactory`].
///
/// # Errors
///
/// Returns `SynthesisError` if the model factory rejects the overrides.
pub fn partial_model(
    base: &ModelRef,
    fields: &[&str],
    recursive: bool,
) -> Result<ModelRef, SynthesisError> {
    let selectors: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    Deriver::new(DerivationCache::global(), &InheritingFactory).derive(base, &selectors, recursive)
}

/// Derive a partial model from [`PartialOptions`].
///
/// # Errors
///
/// Returns `SynthesisError` if the model factory rejects the overrides.
pub fn derive_partial(base: &ModelRef, options: &PartialOptions) -> Result<ModelRef, SynthesisError> {
    Deriver::new(DerivationCache::global(), &InheritingFactory).derive(
        base,
        &options.fields,
        options.recursive,
    )
}
