//! Core types: field annotations, field descriptors and derivation options.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::model::ModelRef;

/// Suffix appended to a model name when deriving its partial variant.
pub const PARTIAL_SUFFIX: &str = "Partial";

/// Nested selector suffix meaning "every field of the nested model".
pub const WILDCARD: &str = "*";

/// Leaf types a field annotation can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Any,
}

impl ScalarType {
    /// Parse a JSON Schema `type` keyword value.
    ///
    /// Returns `None` for `array`, `object` and unknown names.
    pub fn from_json_type(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ScalarType::String),
            "integer" => Some(ScalarType::Integer),
            "number" => Some(ScalarType::Number),
            "boolean" => Some(ScalarType::Boolean),
            "null" => Some(ScalarType::Null),
            _ => None,
        }
    }

    /// Returns the JSON Schema `type` name, or `None` for [`ScalarType::Any`].
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            ScalarType::String => Some("string"),
            ScalarType::Integer => Some("integer"),
            ScalarType::Number => Some("number"),
            ScalarType::Boolean => Some("boolean"),
            ScalarType::Null => Some("null"),
            ScalarType::Any => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::String => "str",
            ScalarType::Integer => "int",
            ScalarType::Number => "float",
            ScalarType::Boolean => "bool",
            ScalarType::Null => "None",
            ScalarType::Any => "Any",
        };
        f.write_str(name)
    }
}

/// Type annotation of a model field.
///
/// Equality compares nested models by identity, so two annotations are equal
/// only if they reference the very same model objects.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Scalar(ScalarType),
    Model(ModelRef),
    /// Nullable wrapper: the inner type or the absent marker.
    Optional(Box<Annotation>),
    Union(Vec<Annotation>),
    List(Box<Annotation>),
    Tuple(Vec<Annotation>),
    Map(Box<Annotation>, Box<Annotation>),
}

impl Annotation {
    pub fn string() -> Self {
        Annotation::Scalar(ScalarType::String)
    }

    pub fn integer() -> Self {
        Annotation::Scalar(ScalarType::Integer)
    }

    pub fn number() -> Self {
        Annotation::Scalar(ScalarType::Number)
    }

    pub fn boolean() -> Self {
        Annotation::Scalar(ScalarType::Boolean)
    }

    pub fn any() -> Self {
        Annotation::Scalar(ScalarType::Any)
    }

    pub fn model(model: &ModelRef) -> Self {
        Annotation::Model(model.clone())
    }

    pub fn list(item: Annotation) -> Self {
        Annotation::List(Box::new(item))
    }

    pub fn map(key: Annotation, value: Annotation) -> Self {
        Annotation::Map(Box::new(key), Box::new(value))
    }

    /// Wrap in [`Annotation::Optional`] unless it already accepts null.
    pub fn nullable(self) -> Self {
        if self.accepts_null() {
            self
        } else {
            Annotation::Optional(Box::new(self))
        }
    }

    /// Returns true if the absent marker is a valid value for this annotation.
    pub fn accepts_null(&self) -> bool {
        match self {
            Annotation::Optional(_) => true,
            Annotation::Scalar(ScalarType::Null | ScalarType::Any) => true,
            Annotation::Union(args) => args.iter().any(Annotation::accepts_null),
            _ => false,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Scalar(scalar) => write!(f, "{}", scalar),
            Annotation::Model(model) => f.write_str(model.name()),
            Annotation::Optional(inner) => write!(f, "Optional[{}]", inner),
            Annotation::Union(args) => write!(f, "Union[{}]", join(args)),
            Annotation::List(item) => write!(f, "list[{}]", item),
            Annotation::Tuple(items) => write!(f, "tuple[{}]", join(items)),
            Annotation::Map(key, value) => write!(f, "dict[{}, {}]", key, value),
        }
    }
}

fn join(args: &[Annotation]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Named producer of default values, invoked each time a default is needed.
#[derive(Clone)]
pub struct DefaultFactory {
    name: String,
    produce: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl DefaultFactory {
    pub fn new(name: impl Into<String>, produce: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            produce: Arc::new(produce),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce a fresh default value.
    pub fn call(&self) -> Value {
        (self.produce)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DefaultFactory").field(&self.name).finish()
    }
}

impl PartialEq for DefaultFactory {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.produce, &other.produce)
    }
}

/// Metadata of a single model field.
///
/// The `with_*` methods copy the descriptor with one attribute replaced;
/// everything else (constraints in particular) is carried over.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    annotation: Option<Annotation>,
    required: bool,
    default: Option<Value>,
    default_factory: Option<DefaultFactory>,
    nullable: bool,
    constraints: Map<String, Value>,
}

impl FieldInfo {
    /// A required field with no default.
    pub fn required(annotation: Annotation) -> Self {
        Self {
            annotation: Some(annotation),
            required: true,
            default: None,
            default_factory: None,
            nullable: false,
            constraints: Map::new(),
        }
    }

    /// An optional field falling back to `default`.
    pub fn optional(annotation: Annotation, default: Value) -> Self {
        Self {
            annotation: Some(annotation),
            required: false,
            default: Some(default),
            default_factory: None,
            nullable: false,
            constraints: Map::new(),
        }
    }

    /// An optional field whose default is produced by `factory`.
    pub fn with_factory(annotation: Annotation, factory: DefaultFactory) -> Self {
        Self {
            annotation: Some(annotation),
            required: false,
            default: None,
            default_factory: Some(factory),
            nullable: false,
            constraints: Map::new(),
        }
    }

    /// A field whose type could not be resolved.
    pub fn unresolved(required: bool) -> Self {
        Self {
            annotation: None,
            required,
            default: None,
            default_factory: None,
            nullable: false,
            constraints: Map::new(),
        }
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn default_factory(&self) -> Option<&DefaultFactory> {
        self.default_factory.as_ref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn constraints(&self) -> &Map<String, Value> {
        &self.constraints
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    pub fn with_default_factory(mut self, factory: Option<DefaultFactory>) -> Self {
        self.default_factory = factory;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Attach a constraint keyword such as `minLength` or `description`.
    pub fn with_constraint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.constraints.insert(key.into(), value);
        self
    }
}

/// Options for deriving a partial model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialOptions {
    /// Field selectors: bare names, dotted paths (`address.city`) or nested
    /// wildcards (`address.*`). Empty means every top-level field.
    pub fields: Vec<String>,
    /// Rewrite every nested derivable model, not only the selected paths.
    pub recursive: bool,
}

impl PartialOptions {
    /// Create options with recursion disabled.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            recursive: false,
        }
    }

    /// Set recursive derivation of nested models.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}
