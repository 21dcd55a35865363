//! Schema models and the synthesis seam used to build derived ones.
//!
//! A [`Model`] is immutable once built and shared through [`ModelRef`], whose
//! equality and hashing are by identity. Models can only reference models
//! that already exist, so the model graph is acyclic by construction.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::error::SynthesisError;
use crate::types::FieldInfo;

/// Shared handle to an immutable [`Model`].
#[derive(Clone)]
pub struct ModelRef(Arc<Model>);

impl ModelRef {
    /// Returns true if both handles point at the same model object.
    pub fn ptr_eq(this: &ModelRef, other: &ModelRef) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }

    /// Stable identity of the model for the lifetime of this handle.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl Deref for ModelRef {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.0
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        ModelRef::ptr_eq(self, other)
    }
}

impl Eq for ModelRef {}

impl Hash for ModelRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Field annotations may reference other models; print names only.
        f.debug_struct("ModelRef")
            .field("name", &self.name)
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .finish()
    }
}

/// A structured data type: an ordered set of named fields.
pub struct Model {
    name: String,
    base: Option<ModelRef>,
    fields: Vec<(String, FieldInfo)>,
    derivable: bool,
    description: Option<String>,
}

impl Model {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            fields: Vec::new(),
            derivable: false,
            description: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The model this one was derived from, if any.
    pub fn base(&self) -> Option<&ModelRef> {
        self.base.as_ref()
    }

    /// Returns true if `other` is this model or one of its ancestors.
    pub fn is_subtype_of(&self, other: &ModelRef) -> bool {
        if std::ptr::eq(self, &**other) {
            return true;
        }
        self.base.as_ref().is_some_and(|b| b.is_subtype_of(other))
    }

    /// Returns true if the model offers partial derivation
    /// (see [`PartialModel`](crate::PartialModel)).
    pub fn is_derivable(&self) -> bool {
        self.derivable
    }

    /// All fields, inherited ones included, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldInfo)> {
        self.fields.iter().map(|(name, info)| (name.as_str(), info))
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, info)| info)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for base models.
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    fields: Vec<(String, FieldInfo)>,
    derivable: bool,
    description: Option<String>,
}

impl ModelBuilder {
    /// Add a field. Redeclaring a name replaces the field in place.
    pub fn field(mut self, name: impl Into<String>, info: FieldInfo) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = info,
            None => self.fields.push((name, info)),
        }
        self
    }

    /// Adopt the partial capability.
    pub fn derivable(mut self) -> Self {
        self.derivable = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> ModelRef {
        ModelRef(Arc::new(Model {
            name: self.name,
            base: None,
            fields: self.fields,
            derivable: self.derivable,
            description: self.description,
        }))
    }
}

/// Replacement descriptor for one field of a base model.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOverride {
    pub name: String,
    pub info: FieldInfo,
}

impl FieldOverride {
    pub fn new(name: impl Into<String>, info: FieldInfo) -> Self {
        Self {
            name: name.into(),
            info,
        }
    }
}

/// Creates new model types from a base model plus field overrides.
pub trait ModelFactory: Send + Sync {
    /// Build a model named `name` that behaves like `base` except for
    /// `overrides`.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError` if the override set is rejected.
    fn create_model(
        &self,
        name: &str,
        base: &ModelRef,
        overrides: Vec<FieldOverride>,
    ) -> Result<ModelRef, SynthesisError>;
}

/// Default factory: the new model extends `base`, keeps its field order and
/// capability, and replaces overridden fields in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct InheritingFactory;

impl ModelFactory for InheritingFactory {
    fn create_model(
        &self,
        name: &str,
        base: &ModelRef,
        overrides: Vec<FieldOverride>,
    ) -> Result<ModelRef, SynthesisError> {
        let mut fields = base.fields.clone();
        let mut seen: Vec<String> = Vec::with_capacity(overrides.len());

        for FieldOverride { name: field, info } in overrides {
            if seen.contains(&field) {
                return Err(SynthesisError::DuplicateOverride {
                    model: base.name.clone(),
                    field,
                });
            }
            let Some(slot) = fields.iter_mut().find(|(n, _)| *n == field) else {
                return Err(SynthesisError::UnknownField {
                    model: base.name.clone(),
                    field,
                });
            };
            slot.1 = info;
            seen.push(field);
        }

        Ok(ModelRef(Arc::new(Model {
            name: name.to_string(),
            base: Some(base.clone()),
            fields,
            derivable: base.derivable,
            description: base.description.clone(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Annotation;
    use serde_json::json;

    fn user() -> ModelRef {
        Model::builder("User")
            .field("name", FieldInfo::required(Annotation::string()))
            .field("age", FieldInfo::required(Annotation::integer()))
            .derivable()
            .build()
    }

    #[test]
    fn identity_equality() {
        let a = user();
        let b = user();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn builder_redeclare_replaces_in_place() {
        let model = Model::builder("User")
            .field("name", FieldInfo::required(Annotation::string()))
            .field("age", FieldInfo::required(Annotation::integer()))
            .field("name", FieldInfo::optional(Annotation::string(), json!("anon")))
            .build();

        assert_eq!(model.field_names().collect::<Vec<_>>(), ["name", "age"]);
        assert_eq!(model.len(), 2);
        assert!(!model.field("name").unwrap().is_required());
        assert!(!model.is_derivable());
        assert!(!model.is_empty());
        assert!(Model::builder("Empty").build().is_empty());
    }

    #[test]
    fn factory_overrides_in_place() {
        let base = user();
        let info = FieldInfo::optional(Annotation::integer().nullable(), json!(null));
        let derived = InheritingFactory
            .create_model("UserPartial", &base, vec![FieldOverride::new("name", info.clone())])
            .unwrap();

        assert_eq!(derived.name(), "UserPartial");
        assert_eq!(derived.field_names().collect::<Vec<_>>(), ["name", "age"]);
        assert_eq!(derived.field("name"), Some(&info));
        assert_eq!(derived.field("age"), base.field("age"));
        assert!(derived.is_subtype_of(&base));
        assert!(!base.is_subtype_of(&derived));
        assert!(derived.is_derivable());
        assert_eq!(derived.base(), Some(&base));
    }

    #[test]
    fn factory_rejects_unknown_field() {
        let base = user();
        let err = InheritingFactory
            .create_model(
                "UserPartial",
                &base,
                vec![FieldOverride::new("email", FieldInfo::required(Annotation::string()))],
            )
            .unwrap_err();
        assert_eq!(
            err,
            SynthesisError::UnknownField {
                model: "User".into(),
                field: "email".into()
            }
        );
    }

    #[test]
    fn factory_rejects_duplicate_override() {
        let base = user();
        let info = FieldInfo::required(Annotation::string());
        let err = InheritingFactory
            .create_model(
                "UserPartial",
                &base,
                vec![
                    FieldOverride::new("name", info.clone()),
                    FieldOverride::new("name", info),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, SynthesisError::DuplicateOverride { field, .. } if field == "name"));
    }
}
