//! Integration tests for the JSON Schema adapter.

use serde_json::{json, Value};
use partial_schema::{
    derive_partial, to_json_schema, Annotation, ModelRef, PartialModel, PartialOptions,
    SchemaError, SchemaModels,
};

fn order_schema() -> Value {
    json!({
        "title": "Order",
        "description": "A customer order",
        "type": "object",
        "required": ["id", "buyer", "lines"],
        "properties": {
            "id": { "type": "string", "minLength": 1 },
            "buyer": { "$ref": "#/$defs/Buyer" },
            "lines": {
                "type": "array",
                "items": { "$ref": "#/$defs/Line" }
            },
            "note": {
                "anyOf": [{ "type": "string" }, { "type": "null" }],
                "default": null
            }
        },
        "$defs": {
            "Buyer": {
                "title": "Buyer",
                "type": "object",
                "required": ["email", "address"],
                "properties": {
                    "email": { "type": "string", "format": "email" },
                    "address": { "$ref": "#/$defs/Address" }
                }
            },
            "Address": {
                "title": "Address",
                "type": "object",
                "required": ["city"],
                "properties": {
                    "city": { "type": "string" },
                    "zip": { "type": "string", "default": "00000" }
                }
            },
            "Line": {
                "title": "Line",
                "type": "object",
                "required": ["sku", "qty"],
                "properties": {
                    "sku": { "type": "string" },
                    "qty": { "type": "integer", "minimum": 1 }
                }
            }
        }
    })
}

fn validates(schema: &Value, payload: &Value) -> bool {
    jsonschema::validator_for(schema)
        .expect("exported schema should compile")
        .is_valid(payload)
}

fn model_of(annotation: Option<&Annotation>) -> ModelRef {
    match annotation {
        Some(Annotation::Model(model)) => model.clone(),
        Some(Annotation::Optional(inner)) => model_of(Some(&**inner)),
        Some(Annotation::List(item)) => model_of(Some(&**item)),
        other => panic!("expected model annotation, got {:?}", other),
    }
}

// === Import ===

mod import {
    use super::*;

    #[test]
    fn root_and_defs() {
        let models = SchemaModels::from_json_schema(&order_schema()).unwrap();
        let root = models.root();

        assert_eq!(root.name(), "Order");
        assert_eq!(root.description(), Some("A customer order"));
        assert!(root.is_derivable());
        assert_eq!(
            root.field_names().collect::<Vec<_>>(),
            ["id", "buyer", "lines", "note"]
        );
        assert_eq!(
            models.defs().map(|(name, _)| name).collect::<Vec<_>>(),
            ["Buyer", "Address", "Line"]
        );
    }

    #[test]
    fn fields_carry_metadata() {
        let models = SchemaModels::from_json_schema(&order_schema()).unwrap();
        let root = models.root();

        let id = root.field("id").unwrap();
        assert!(id.is_required());
        assert_eq!(id.annotation(), Some(&Annotation::string()));
        assert_eq!(id.constraints()["minLength"], json!(1));

        let note = root.field("note").unwrap();
        assert!(!note.is_required());
        assert_eq!(note.default(), Some(&Value::Null));
        assert_eq!(note.annotation(), Some(&Annotation::string().nullable()));

        let zip = models.get("Address").unwrap().field("zip").unwrap();
        assert_eq!(zip.default(), Some(&json!("00000")));
    }

    #[test]
    fn refs_share_identity() {
        let models = SchemaModels::from_json_schema(&order_schema()).unwrap();
        let buyer = model_of(models.root().field("buyer").unwrap().annotation());
        let address = model_of(buyer.field("address").unwrap().annotation());

        assert_eq!(&buyer, models.get("Buyer").unwrap());
        assert_eq!(&address, models.get("Address").unwrap());
    }

    #[test]
    fn inline_object_becomes_model() {
        let schema = json!({
            "title": "Event",
            "type": "object",
            "properties": {
                "shipping_address": {
                    "type": "object",
                    "properties": { "city": { "type": "string" } }
                },
                "venue": {
                    "title": "Venue",
                    "type": "object",
                    "properties": { "name": { "type": "string" } }
                }
            }
        });
        let models = SchemaModels::from_json_schema(&schema).unwrap();
        let root = models.root();

        let shipping = model_of(root.field("shipping_address").unwrap().annotation());
        assert_eq!(shipping.name(), "ShippingAddress");
        assert!(shipping.is_derivable());
        let venue = model_of(root.field("venue").unwrap().annotation());
        assert_eq!(venue.name(), "Venue");
    }

    #[test]
    fn root_ref_and_untitled_root() {
        let schema = json!({
            "$ref": "#/$defs/User",
            "$defs": {
                "User": { "type": "object", "properties": { "id": { "type": "integer" } } }
            }
        });
        let models = SchemaModels::from_json_schema(&schema).unwrap();
        assert_eq!(models.root().name(), "User");
        assert_eq!(models.root(), models.get("User").unwrap());

        let untitled = json!({ "properties": { "id": { "type": "integer" } } });
        let models = SchemaModels::from_json_schema(&untitled).unwrap();
        assert_eq!(models.root().name(), "Model");
    }

    #[test]
    fn all_of_wrapped_ref() {
        let schema = json!({
            "title": "Wrapper",
            "properties": {
                "inner": { "allOf": [{ "$ref": "#/$defs/Inner" }], "description": "wrapped" }
            },
            "$defs": {
                "Inner": { "properties": { "x": { "type": "number" } } }
            }
        });
        let models = SchemaModels::from_json_schema(&schema).unwrap();
        let inner = models.root().field("inner").unwrap();

        assert_eq!(model_of(inner.annotation()).name(), "Inner");
        assert_eq!(inner.constraints()["description"], json!("wrapped"));
    }

    #[test]
    fn scalar_def_ref_is_inlined() {
        let schema = json!({
            "title": "Shirt",
            "properties": {
                "size": { "$ref": "#/$defs/Size" }
            },
            "$defs": {
                "Size": { "type": "string", "enum": ["S", "M", "L"] }
            }
        });
        let models = SchemaModels::from_json_schema(&schema).unwrap();

        assert_eq!(
            models.root().field("size").unwrap().annotation(),
            Some(&Annotation::string())
        );
        assert_eq!(models.defs().count(), 0);
    }
}

// === Import Errors ===

mod import_errors {
    use super::*;

    #[test]
    fn circular_reference() {
        let schema = json!({
            "title": "Node",
            "properties": {
                "next": { "$ref": "#/$defs/Node" }
            },
            "$defs": {
                "Node": {
                    "properties": {
                        "value": { "type": "integer" },
                        "next": { "$ref": "#/$defs/Node" }
                    }
                }
            }
        });
        let result = SchemaModels::from_json_schema(&schema);
        assert!(matches!(
            result,
            Err(SchemaError::CircularReference { reference }) if reference == "#/$defs/Node"
        ));
    }

    #[test]
    fn external_reference() {
        let schema = json!({
            "properties": { "x": { "$ref": "other.json#/$defs/X" } }
        });
        let result = SchemaModels::from_json_schema(&schema);
        assert!(matches!(result, Err(SchemaError::UnsupportedRef { .. })));
    }

    #[test]
    fn dangling_reference() {
        let schema = json!({
            "properties": { "x": { "$ref": "#/$defs/Missing" } }
        });
        let result = SchemaModels::from_json_schema(&schema);
        assert!(matches!(result, Err(SchemaError::InvalidSchema { .. })));
    }

    #[test]
    fn root_must_be_object_schema() {
        let result = SchemaModels::from_json_schema(&json!({ "type": "string" }));
        assert!(matches!(result, Err(SchemaError::InvalidSchema { .. })));
    }

    #[test]
    fn unknown_model_name() {
        let models = SchemaModels::from_json_schema(&order_schema()).unwrap();
        assert!(models.select(None).is_ok());
        assert!(models.select(Some("Line")).is_ok());
        assert!(matches!(
            models.select(Some("Invoice")),
            Err(SchemaError::UnknownModel { name }) if name == "Invoice"
        ));
    }
}

// === Derive and Export ===

mod export {
    use super::*;

    #[test]
    fn full_partial_accepts_nulls() {
        let models = SchemaModels::from_json_schema(&order_schema()).unwrap();
        let base = models.root();
        let partial = base.as_partial(&[], false).unwrap();

        let base_schema = to_json_schema(base);
        let partial_schema = to_json_schema(&partial);
        let payload = json!({ "id": null, "buyer": null, "lines": null });

        assert!(!validates(&base_schema, &payload));
        assert!(validates(&partial_schema, &payload));
        assert!(validates(&partial_schema, &json!({})));
        assert_eq!(partial_schema["title"], "OrderPartial");
        assert!(partial_schema.get("required").is_none());
    }

    #[test]
    fn selected_fields_only() {
        let models = SchemaModels::from_json_schema(&order_schema()).unwrap();
        let partial = derive_partial(models.root(), &PartialOptions::new(["id"])).unwrap();
        let schema = to_json_schema(&partial);

        assert_eq!(schema["required"], json!(["buyer", "lines"]));
        assert_eq!(schema["properties"]["id"]["default"], Value::Null);
        assert_eq!(schema["properties"]["id"]["nullable"], true);
        assert_eq!(schema["properties"]["id"]["minLength"], 1);
    }

    #[test]
    fn nested_wildcard_in_list() {
        let models = SchemaModels::from_json_schema(&order_schema()).unwrap();
        let partial = models.root().as_partial(&["lines.*"], false).unwrap();
        let schema = to_json_schema(&partial);

        assert_eq!(schema["properties"]["lines"]["items"]["$ref"], "#/$defs/LinePartial");
        assert!(schema["$defs"]["LinePartial"].get("required").is_none());

        let payload = json!({
            "id": "o-1",
            "buyer": { "email": "a@b.c", "address": { "city": "Oslo" } },
            "lines": [{ "sku": null }]
        });
        assert!(validates(&schema, &payload));
        assert!(!validates(&schema, &json!({ "id": "o-1", "lines": [] })));
    }

    #[test]
    fn recursive_partial_reaches_deep_models() {
        let models = SchemaModels::from_json_schema(&order_schema()).unwrap();
        let partial = models.root().as_partial(&[], true).unwrap();
        let schema = to_json_schema(&partial);

        let payload = json!({ "buyer": { "address": { "city": null } } });
        assert!(validates(&schema, &payload));
        assert!(schema["$defs"].get("AddressPartial").is_some());
        assert!(schema["$defs"].get("BuyerPartial").is_some());
    }

    #[test]
    fn nullable_any_of_reaches_referenced_model() {
        let schema = json!({
            "title": "Holder",
            "properties": {
                "loc": {
                    "anyOf": [
                        { "$ref": "#/$defs/Address" },
                        { "type": "string" },
                        { "type": "null" }
                    ],
                    "default": null
                }
            },
            "$defs": {
                "Address": {
                    "title": "Address",
                    "required": ["city"],
                    "properties": { "city": { "type": "string" } }
                }
            }
        });
        let models = SchemaModels::from_json_schema(&schema).unwrap();
        let partial = models.root().as_partial(&[], true).unwrap();

        assert_eq!(partial.name(), "HolderPartial");
        assert_eq!(
            partial.field("loc").unwrap().annotation().unwrap().to_string(),
            "Optional[Union[AddressPartial, str]]"
        );

        let exported = to_json_schema(&partial);
        assert!(validates(&exported, &json!({ "loc": { "city": null } })));
        assert!(!validates(&to_json_schema(models.root()), &json!({ "loc": { "city": null } })));
    }

    #[test]
    fn export_round_trips_through_import() {
        let models = SchemaModels::from_json_schema(&order_schema()).unwrap();
        let partial = models.root().as_partial(&["buyer.address.city"], false).unwrap();
        let exported = to_json_schema(&partial);

        let reimported = SchemaModels::from_json_schema(&exported).unwrap();
        let root = reimported.root();
        assert_eq!(root.name(), "OrderPartial");

        let buyer = model_of(root.field("buyer").unwrap().annotation());
        assert_eq!(buyer.name(), "BuyerPartial");
        let address = model_of(buyer.field("address").unwrap().annotation());
        let city = address.field("city").unwrap();
        assert!(!city.is_required());
        assert!(city.is_nullable());
        assert_eq!(city.annotation(), Some(&Annotation::string().nullable()));
    }
}
