//! JSON Schema adapter - builds models from object schemas and renders
//! models back to JSON Schema.
//!
//! # Import mapping
//!
//! | Schema | Annotation |
//! |--------|------------|
//! | `{"type": "string"}` (`integer`, `number`, `boolean`, `null`) | scalar |
//! | `{}` or `true` | `Any` |
//! | `{"$ref": "#/$defs/X"}` with properties | nested model `X` |
//! | `{"anyOf": [S, {"type": "null"}]}`, `{"type": ["string", "null"]}` | `Optional[S]` |
//! | `{"anyOf": [A, B]}` | `Union[A, B]` |
//! | `{"type": "array", "items": S}` | `list[S]` |
//! | `{"type": "array", "prefixItems": [A, B]}` | `tuple[A, B]` |
//! | `{"type": "object", "properties": ...}` | inline nested model |
//! | `{"type": "object", "additionalProperties": S}` | `dict[str, S]` |
//!
//! Anything else leaves the field without an annotation; the derivation
//! engine passes such fields through untouched.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::SchemaError;
use crate::loader::navigate_fragment;
use crate::model::{Model, ModelRef};
use crate::types::{Annotation, FieldInfo, ScalarType};

/// Keys describing the type itself rather than a constraint on the field.
const STRUCTURAL_KEYS: &[&str] = &[
    "$ref",
    "$defs",
    "definitions",
    "anyOf",
    "oneOf",
    "allOf",
    "type",
    "items",
    "prefixItems",
    "properties",
    "required",
    "additionalProperties",
    "default",
    "nullable",
];

/// Name given to a root schema without a `title`.
const DEFAULT_ROOT_NAME: &str = "Model";

/// Models built from one JSON Schema document.
#[derive(Debug, Clone)]
pub struct SchemaModels {
    root: ModelRef,
    defs: Vec<(String, ModelRef)>,
}

impl SchemaModels {
    /// Build models from a root object schema and its `$defs`.
    ///
    /// Every model is derivable. A `$ref` always resolves to the same model
    /// object, so shared definitions keep a single identity.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the root is not an object schema, a `$ref`
    /// is external, dangling or circular.
    pub fn from_json_schema(schema: &Value) -> Result<Self, SchemaError> {
        let mut importer = Importer::new(schema);

        let root = if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            match importer.resolve_ref(reference)? {
                Some(Annotation::Model(model)) => model,
                _ => return Err(not_an_object_schema("#")),
            }
        } else {
            let map = object_schema(schema).ok_or_else(|| not_an_object_schema("#"))?;
            let name = schema
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_ROOT_NAME);
            importer.model_from_object(name, map, "#")?
        };

        let mut defs = Vec::new();
        for key in ["$defs", "definitions"] {
            let Some(entries) = schema.get(key).and_then(Value::as_object) else {
                continue;
            };
            for (name, def) in entries {
                if object_schema(def).is_none() {
                    continue;
                }
                let reference = format!("#/{}/{}", key, escape_pointer(name));
                if let Some(Annotation::Model(model)) = importer.resolve_ref(&reference)? {
                    defs.push((name.clone(), model));
                }
            }
        }

        Ok(Self { root, defs })
    }

    pub fn root(&self) -> &ModelRef {
        &self.root
    }

    /// Look up a model by root title or definition name.
    pub fn get(&self, name: &str) -> Option<&ModelRef> {
        if self.root.name() == name {
            return Some(&self.root);
        }
        self.defs
            .iter()
            .find(|(key, model)| key == name || model.name() == name)
            .map(|(_, model)| model)
    }

    /// The named model, or the root when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnknownModel` if no model has that name.
    pub fn select(&self, name: Option<&str>) -> Result<ModelRef, SchemaError> {
        match name {
            None => Ok(self.root.clone()),
            Some(name) => self
                .get(name)
                .cloned()
                .ok_or_else(|| SchemaError::UnknownModel {
                    name: name.to_string(),
                }),
        }
    }

    /// Definition names and their models, in document order.
    pub fn defs(&self) -> impl Iterator<Item = (&str, &ModelRef)> {
        self.defs.iter().map(|(name, model)| (name.as_str(), model))
    }
}

/// Render a model as a JSON Schema document.
///
/// Nested models are emitted under `$defs`. Distinct models sharing a name
/// get a numeric suffix. Default factories have no JSON form and are left out.
pub fn to_json_schema(model: &ModelRef) -> Value {
    let mut exporter = Exporter {
        names: vec![(model.clone(), model.name().to_string())],
        defs: Map::new(),
    };

    let mut schema = exporter.model_schema(model);
    if !exporter.defs.is_empty() {
        schema.insert("$defs".to_string(), Value::Object(exporter.defs));
    }
    Value::Object(schema)
}

// --- Import ---

struct Importer<'a> {
    document: &'a Value,
    resolved: HashMap<String, ModelRef>,
    in_progress: Vec<String>,
}

impl<'a> Importer<'a> {
    fn new(document: &'a Value) -> Self {
        Self {
            document,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    fn model_from_object(
        &mut self,
        name: &str,
        map: &'a Map<String, Value>,
        path: &str,
    ) -> Result<ModelRef, SchemaError> {
        let required: Vec<&str> = map
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut builder = Model::builder(name).derivable();
        if let Some(description) = map.get("description").and_then(Value::as_str) {
            builder = builder.description(description);
        }

        if let Some(props) = map.get("properties").and_then(Value::as_object) {
            for (field, prop) in props {
                let prop_path = format!("{}/properties/{}", path, escape_pointer(field));
                let info = self.field_info(field, prop, required.contains(&field.as_str()), &prop_path)?;
                builder = builder.field(field.clone(), info);
            }
        }

        Ok(builder.build())
    }

    fn field_info(
        &mut self,
        field: &str,
        prop: &'a Value,
        required: bool,
        path: &str,
    ) -> Result<FieldInfo, SchemaError> {
        let annotation = self.parse_annotation(prop, field, path)?;
        if annotation.is_none() {
            warn!(path, "field type cannot be resolved; it will not be derived");
        }

        let mut info = FieldInfo::unresolved(required)
            .with_default(prop.get("default").cloned())
            .with_nullable(prop.get("nullable") == Some(&Value::Bool(true)));
        if let Some(annotation) = annotation {
            info = info.with_annotation(annotation);
        }

        if let Some(map) = prop.as_object() {
            for (key, value) in map {
                if !STRUCTURAL_KEYS.contains(&key.as_str()) {
                    info = info.with_constraint(key.clone(), value.clone());
                }
            }
        }
        Ok(info)
    }

    /// Returns `Ok(None)` for schemas with no annotation equivalent.
    fn parse_annotation(
        &mut self,
        schema: &'a Value,
        field: &str,
        path: &str,
    ) -> Result<Option<Annotation>, SchemaError> {
        let map = match schema {
            Value::Bool(true) => return Ok(Some(Annotation::any())),
            Value::Object(map) => map,
            _ => return Ok(None),
        };

        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            return self.resolve_ref(reference);
        }

        for key in ["anyOf", "oneOf"] {
            if let Some(branches) = map.get(key).and_then(Value::as_array) {
                let mut members = Vec::with_capacity(branches.len());
                for (i, branch) in branches.iter().enumerate() {
                    let branch_path = format!("{}/{}/{}", path, key, i);
                    match self.parse_annotation(branch, field, &branch_path)? {
                        Some(member) => members.push(member),
                        None => return Ok(None),
                    }
                }
                return Ok(Some(union_of(members)));
            }
        }

        // `allOf` wrapping a single schema is how sibling keywords get
        // attached to a `$ref`.
        if let Some(all_of) = map.get("allOf").and_then(Value::as_array) {
            return match all_of.as_slice() {
                [single] => self.parse_annotation(single, field, &format!("{}/allOf/0", path)),
                _ => Ok(None),
            };
        }

        match map.get("type") {
            Some(Value::String(name)) => self.parse_typed(name, map, field, path),
            Some(Value::Array(names)) => {
                let mut members = Vec::with_capacity(names.len());
                for name in names {
                    let Some(name) = name.as_str() else {
                        return Err(invalid(path, "type array must contain strings"));
                    };
                    match self.parse_typed(name, map, field, path)? {
                        Some(member) => members.push(member),
                        None => return Ok(None),
                    }
                }
                Ok(Some(union_of(members)))
            }
            Some(_) => Err(invalid(path, "type must be a string or an array")),
            None if map.contains_key("properties") => self.parse_typed("object", map, field, path),
            None if map.contains_key("not") || map.contains_key("if") => Ok(None),
            None => Ok(Some(Annotation::any())),
        }
    }

    fn parse_typed(
        &mut self,
        name: &str,
        map: &'a Map<String, Value>,
        field: &str,
        path: &str,
    ) -> Result<Option<Annotation>, SchemaError> {
        if let Some(scalar) = ScalarType::from_json_type(name) {
            return Ok(Some(Annotation::Scalar(scalar)));
        }

        match name {
            "array" => {
                if let Some(prefix) = map.get("prefixItems").and_then(Value::as_array) {
                    let mut items = Vec::with_capacity(prefix.len());
                    for (i, item) in prefix.iter().enumerate() {
                        let item_path = format!("{}/prefixItems/{}", path, i);
                        match self.parse_annotation(item, field, &item_path)? {
                            Some(item) => items.push(item),
                            None => return Ok(None),
                        }
                    }
                    return Ok(Some(Annotation::Tuple(items)));
                }
                match map.get("items") {
                    Some(items) => Ok(self
                        .parse_annotation(items, field, &format!("{}/items", path))?
                        .map(Annotation::list)),
                    None => Ok(Some(Annotation::list(Annotation::any()))),
                }
            }
            "object" => {
                if map.get("properties").is_some_and(Value::is_object) {
                    let model_name = map
                        .get("title")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .unwrap_or_else(|| pascal_case(field));
                    let model = self.model_from_object(&model_name, map, path)?;
                    return Ok(Some(Annotation::Model(model)));
                }
                let value = match map.get("additionalProperties") {
                    Some(schema) if schema.is_object() => {
                        let value_path = format!("{}/additionalProperties", path);
                        match self.parse_annotation(schema, field, &value_path)? {
                            Some(value) => value,
                            None => return Ok(None),
                        }
                    }
                    _ => Annotation::any(),
                };
                Ok(Some(Annotation::map(Annotation::string(), value)))
            }
            _ => Ok(None),
        }
    }

    fn resolve_ref(&mut self, reference: &str) -> Result<Option<Annotation>, SchemaError> {
        if !reference.starts_with('#') {
            return Err(SchemaError::UnsupportedRef {
                reference: reference.to_string(),
            });
        }
        if let Some(model) = self.resolved.get(reference) {
            return Ok(Some(Annotation::Model(model.clone())));
        }
        if self.in_progress.iter().any(|r| r == reference) {
            return Err(SchemaError::CircularReference {
                reference: reference.to_string(),
            });
        }

        let document: &'a Value = self.document;
        let target = navigate_fragment(document, reference)?;
        let name = ref_name(reference);

        self.in_progress.push(reference.to_string());
        let annotation = match object_schema(target) {
            Some(map) => {
                let title = target.get("title").and_then(Value::as_str).unwrap_or(&name);
                let model = self.model_from_object(title, map, reference)?;
                self.resolved.insert(reference.to_string(), model.clone());
                Some(Annotation::Model(model))
            }
            None => self.parse_annotation(target, &name, reference)?,
        };
        self.in_progress.pop();

        Ok(annotation)
    }
}

/// Returns the object map if `schema` describes an object with properties.
fn object_schema(schema: &Value) -> Option<&Map<String, Value>> {
    let map = schema.as_object()?;
    let typed_object = match map.get("type") {
        None => true,
        Some(t) => t == "object",
    };
    (typed_object && map.get("properties").is_some_and(Value::is_object)).then_some(map)
}

/// Combine union members, folding `null` into an `Optional` wrapper.
fn union_of(members: Vec<Annotation>) -> Annotation {
    let null = Annotation::Scalar(ScalarType::Null);
    let has_null = members.contains(&null);
    let mut others: Vec<Annotation> = members.into_iter().filter(|m| *m != null).collect();

    let inner = match others.len() {
        0 => return null,
        1 => others.remove(0),
        _ => Annotation::Union(others),
    };
    if has_null {
        Annotation::Optional(Box::new(inner))
    } else {
        inner
    }
}

fn ref_name(reference: &str) -> String {
    let last = reference.rsplit('/').next().unwrap_or(reference);
    last.replace("~1", "/").replace("~0", "~")
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn pascal_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn invalid(path: &str, message: &str) -> SchemaError {
    SchemaError::InvalidSchema {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn not_an_object_schema(path: &str) -> SchemaError {
    invalid(path, "expected an object schema with properties")
}

// --- Export ---

struct Exporter {
    names: Vec<(ModelRef, String)>,
    defs: Map<String, Value>,
}

impl Exporter {
    fn model_schema(&mut self, model: &ModelRef) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, info) in model.fields() {
            properties.insert(name.to_string(), Value::Object(self.field_schema(info)));
            if info.is_required() {
                required.push(Value::String(name.to_string()));
            }
        }

        let mut schema = Map::new();
        schema.insert("title".to_string(), Value::String(model.name().to_string()));
        if let Some(description) = model.description() {
            schema.insert("description".to_string(), Value::String(description.to_string()));
        }
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema
    }

    fn field_schema(&mut self, info: &FieldInfo) -> Map<String, Value> {
        let mut schema = match info.annotation() {
            Some(annotation) => self.annotation_schema(annotation),
            None => Map::new(),
        };
        for (key, value) in info.constraints() {
            schema.insert(key.clone(), value.clone());
        }
        if let Some(default) = info.default() {
            schema.insert("default".to_string(), default.clone());
        }
        if info.is_nullable() {
            schema.insert("nullable".to_string(), Value::Bool(true));
        }
        schema
    }

    fn annotation_schema(&mut self, annotation: &Annotation) -> Map<String, Value> {
        let value = match annotation {
            Annotation::Scalar(scalar) => match scalar.json_type() {
                Some(name) => json!({ "type": name }),
                None => json!({}),
            },
            Annotation::Model(model) => {
                let name = self.def_name(model);
                json!({ "$ref": format!("#/$defs/{}", escape_pointer(&name)) })
            }
            Annotation::Optional(inner) => {
                json!({ "anyOf": [self.annotation_schema(inner), { "type": "null" }] })
            }
            Annotation::Union(args) => {
                let branches: Vec<Value> = args
                    .iter()
                    .map(|a| Value::Object(self.annotation_schema(a)))
                    .collect();
                json!({ "anyOf": branches })
            }
            Annotation::List(item) => {
                json!({ "type": "array", "items": self.annotation_schema(item) })
            }
            Annotation::Tuple(items) => {
                let prefix: Vec<Value> = items
                    .iter()
                    .map(|a| Value::Object(self.annotation_schema(a)))
                    .collect();
                json!({
                    "type": "array",
                    "prefixItems": prefix,
                    "minItems": items.len(),
                    "maxItems": items.len()
                })
            }
            Annotation::Map(_, value) => {
                json!({ "type": "object", "additionalProperties": self.annotation_schema(value) })
            }
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Definition name for `model`, emitting its schema on first use.
    fn def_name(&mut self, model: &ModelRef) -> String {
        if let Some((_, name)) = self.names.iter().find(|(m, _)| m == model) {
            return name.clone();
        }

        let base = model.name();
        let mut name = base.to_string();
        let mut n = 2;
        while self.names.iter().any(|(_, taken)| *taken == name) {
            name = format!("{}{}", base, n);
            n += 1;
        }
        self.names.push((model.clone(), name.clone()));

        let schema = self.model_schema(model);
        self.defs.insert(name.clone(), Value::Object(schema));
        name
    }
}
