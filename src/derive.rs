//! Partial model derivation - makes selected fields optional.
//!
//! Selectors are bare field names (`"age"`), dotted paths into nested models
//! (`"address.city"`) or nested wildcards (`"address.*"`). No selectors means
//! every top-level field. Selectors that match nothing are ignored.

use tracing::{debug, trace};

use crate::cache::DerivationCache;
use crate::error::SynthesisError;
use crate::model::{FieldOverride, ModelFactory, ModelRef};
use crate::types::{Annotation, FieldInfo, PARTIAL_SUFFIX, WILDCARD};

/// Derivation engine bound to a cache and a model factory.
///
/// Nested models are derived through the same cache, so a nested partial
/// model is the same object whether it is requested directly or reached
/// through a parent.
pub struct Deriver<'a> {
    cache: &'a DerivationCache,
    factory: &'a dyn ModelFactory,
}

impl<'a> Deriver<'a> {
    /// Bind `cache` to `factory`.
    ///
    /// Cache keys do not include the factory, so a cache must only ever be
    /// paired with one factory. [`DerivationCache::global`] belongs to
    /// [`InheritingFactory`](crate::InheritingFactory); give a custom factory
    /// its own [`DerivationCache::new`].
    pub fn new(cache: &'a DerivationCache, factory: &'a dyn ModelFactory) -> Self {
        Self { cache, factory }
    }

    /// Derive the partial variant of `base`.
    ///
    /// Returns `base` itself when no field needs to change.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError` if the model factory rejects the overrides.
    pub fn derive(
        &self,
        base: &ModelRef,
        selectors: &[String],
        recursive: bool,
    ) -> Result<ModelRef, SynthesisError> {
        self.cache.get_or_derive(base, selectors, recursive, || {
            self.derive_uncached(base, selectors, recursive)
        })
    }

    fn derive_uncached(
        &self,
        base: &ModelRef,
        selectors: &[String],
        recursive: bool,
    ) -> Result<ModelRef, SynthesisError> {
        debug!(model = base.name(), ?selectors, recursive, "deriving partial model");

        let selectors: Vec<String> = if selectors.is_empty() {
            base.field_names().map(String::from).collect()
        } else {
            selectors.to_vec()
        };

        let mut overrides = Vec::new();
        for (name, info) in base.fields() {
            let Some(annotation) = info.annotation() else {
                trace!(model = base.name(), field = name, "skipping field without annotation");
                continue;
            };

            let prefix = format!("{}.", name);
            let sub_fields_requested = selectors.iter().any(|s| s.starts_with(&prefix));
            let selected = selectors.iter().any(|s| s == name);

            if !selected && !sub_fields_requested {
                continue;
            }

            let rewrite = recursive || sub_fields_requested;
            let rewritten = if rewrite {
                self.rewrite_annotation(name, annotation, &selectors, recursive)?
            } else {
                annotation.clone()
            };

            if selected && info.is_required() {
                overrides.push(FieldOverride::new(name, make_optional(info, rewritten)));
            } else if rewrite && rewritten != *annotation {
                // Only the nested type changes; this field keeps its own
                // requiredness and default.
                overrides.push(FieldOverride::new(
                    name,
                    info.clone().with_annotation(rewritten),
                ));
            }
        }

        if overrides.is_empty() {
            trace!(model = base.name(), "no field changed, reusing base model");
            return Ok(base.clone());
        }

        let name = format!("{}{}", base.name(), PARTIAL_SUFFIX);
        self.factory.create_model(&name, base, overrides)
    }

    /// Rebuild container annotations with each direct type argument derived;
    /// non-containers are derived as a whole.
    fn rewrite_annotation(
        &self,
        field: &str,
        annotation: &Annotation,
        selectors: &[String],
        recursive: bool,
    ) -> Result<Annotation, SynthesisError> {
        let arg = |a: &Annotation| self.rewrite_arg(field, a, selectors, recursive);
        let rewritten = match annotation {
            // Optional[Union[A, B]] is Union[A, B, None]: its arguments are A and B.
            Annotation::Optional(inner) => match inner.as_ref() {
                Annotation::Union(args) => Annotation::Optional(Box::new(Annotation::Union(
                    args.iter().map(arg).collect::<Result<_, _>>()?,
                ))),
                other => Annotation::Optional(Box::new(arg(other)?)),
            },
            Annotation::Union(args) => {
                Annotation::Union(args.iter().map(arg).collect::<Result<_, _>>()?)
            }
            Annotation::List(item) => Annotation::List(Box::new(arg(item)?)),
            Annotation::Tuple(items) => {
                Annotation::Tuple(items.iter().map(arg).collect::<Result<_, _>>()?)
            }
            Annotation::Map(key, value) => {
                Annotation::Map(Box::new(arg(key)?), Box::new(arg(value)?))
            }
            other => arg(other)?,
        };
        Ok(rewritten)
    }

    fn rewrite_arg(
        &self,
        field: &str,
        arg: &Annotation,
        selectors: &[String],
        recursive: bool,
    ) -> Result<Annotation, SynthesisError> {
        match arg {
            Annotation::Model(nested) if nested.is_derivable() => {
                let children = child_selectors(field, selectors);
                let derived = self.derive(nested, &children, recursive)?;
                Ok(Annotation::Model(derived))
            }
            other => Ok(other.clone()),
        }
    }
}

/// Selectors below `field`, with the `field.` prefix stripped.
///
/// A lone wildcard collapses to no selectors, which selects every field.
fn child_selectors(field: &str, selectors: &[String]) -> Vec<String> {
    let prefix = format!("{}.", field);
    let children: Vec<String> = selectors
        .iter()
        .filter_map(|s| s.strip_prefix(&prefix))
        .map(String::from)
        .collect();

    if children.len() == 1 && children[0] == WILDCARD {
        Vec::new()
    } else {
        children
    }
}

/// Copy of `info` accepting the absent marker and defaulting to it.
fn make_optional(info: &FieldInfo, annotation: Annotation) -> FieldInfo {
    info.clone()
        .with_annotation(annotation.nullable())
        .with_required(false)
        .with_default(Some(serde_json::Value::Null))
        .with_default_factory(None)
        .with_nullable(true)
}
