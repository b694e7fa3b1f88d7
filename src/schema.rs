//! Declarative description of the record expected from one page.

use serde_json::{Map, Value, json};
use std::collections::HashSet;
use thiserror::Error;

/// Type of a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// Nested record with its own ordered fields
    Record(Vec<Field>),
    /// Sequence of values with optional cardinality bounds
    Array {
        items: Box<FieldType>,
        min: Option<usize>,
        max: Option<usize>,
    },
}

/// A named field with a hint used to steer extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldType,
    pub optional: bool,
    pub hint: String,
}

impl Field {
    pub fn required(name: &str, kind: FieldType, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            optional: false,
            hint: hint.to_string(),
        }
    }

    pub fn optional(name: &str, kind: FieldType, hint: &str) -> Self {
        Self {
            optional: true,
            ..Self::required(name, kind, hint)
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    #[error("array field {field} has min {min} greater than max {max}")]
    InvalidBounds {
        field: String,
        min: usize,
        max: usize,
    },
}

/// One mismatch between a value and the schema
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Dotted path to the offending value, e.g. `productos[3].precio`
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Ordered set of uniquely named fields describing one page's record
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSchema {
    pub name: String,
    fields: Vec<Field>,
}

impl ExtractionSchema {
    /// Build a schema, rejecting duplicate names and inverted bounds at any depth
    pub fn new(name: &str, fields: Vec<Field>) -> Result<Self, SchemaError> {
        check_fields(&fields)?;
        Ok(Self {
            name: name.to_string(),
            fields,
        })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Listing envelope around the given per-item fields
    pub fn listing(item_fields: Vec<Field>, max_items: usize) -> Result<Self, SchemaError> {
        Self::new(
            "listado",
            vec![
                Field::required(
                    "productos",
                    FieldType::Array {
                        items: Box::new(FieldType::Record(item_fields)),
                        min: None,
                        max: Some(max_items),
                    },
                    "Extract EVERY product visible on the page: product cards, offer lists, \
                     grids and any element carrying a price. Do not stop after the first few.",
                ),
                Field::required("pagina_actual", FieldType::Number, "Current page number"),
                Field::required(
                    "total_productos",
                    FieldType::Number,
                    "Total number of products found on this page",
                ),
                Field::required(
                    "hay_siguiente_pagina",
                    FieldType::Boolean,
                    "Whether a next page is available",
                ),
                Field::optional(
                    "comentarios_extraccion",
                    FieldType::String,
                    "Comments about the extraction process",
                ),
            ],
        )
    }

    /// Product listing schema with the default product fields
    pub fn product_listing(max_items: usize) -> Result<Self, SchemaError> {
        Self::listing(product_fields(), max_items)
    }

    /// Render as a JSON Schema object for the provider call
    pub fn to_json_schema(&self) -> Value {
        record_json_schema(&self.fields)
    }

    /// Check a value against the schema, collecting every violation
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        validate_record(&self.fields, value, "", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Fields describing one product card
pub fn product_fields() -> Vec<Field> {
    vec![
        Field::required("titulo", FieldType::String, "Full product title"),
        Field::required("precio", FieldType::String, "Current product price"),
        Field::optional(
            "precio_anterior",
            FieldType::String,
            "Previous price when discounted",
        ),
        Field::optional("descuento", FieldType::String, "Discount percentage"),
        Field::optional("vendedor", FieldType::String, "Seller name"),
        Field::optional("envio_gratis", FieldType::Boolean, "Whether shipping is free"),
        Field::optional("calificacion", FieldType::String, "Seller rating"),
        Field::optional("vendidos", FieldType::String, "Units sold"),
        Field::required("enlace", FieldType::String, "Full link to the product"),
    ]
}

fn check_fields(fields: &[Field]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField(field.name.clone()));
        }
        check_type(&field.name, &field.kind)?;
    }
    Ok(())
}

fn check_type(name: &str, kind: &FieldType) -> Result<(), SchemaError> {
    match kind {
        FieldType::Record(fields) => check_fields(fields),
        FieldType::Array { items, min, max } => {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(SchemaError::InvalidBounds {
                        field: name.to_string(),
                        min: *min,
                        max: *max,
                    });
                }
            }
            check_type(name, items)
        }
        _ => Ok(()),
    }
}

fn record_json_schema(fields: &[Field]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let mut schema = type_json_schema(&field.kind);
        if let Value::Object(obj) = &mut schema {
            obj.insert("description".to_string(), Value::String(field.hint.clone()));
        }
        properties.insert(field.name.clone(), schema);
        if !field.optional {
            required.push(Value::String(field.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn type_json_schema(kind: &FieldType) -> Value {
    match kind {
        FieldType::String => json!({ "type": "string" }),
        FieldType::Number => json!({ "type": "number" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::Record(fields) => record_json_schema(fields),
        FieldType::Array { items, min, max } => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), json!("array"));
            obj.insert("items".to_string(), type_json_schema(items));
            if let Some(min) = min {
                obj.insert("minItems".to_string(), json!(min));
            }
            if let Some(max) = max {
                obj.insert("maxItems".to_string(), json!(max));
            }
            Value::Object(obj)
        }
    }
}

fn validate_record(fields: &[Field], value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = value.as_object() else {
        out.push(violation(path, "expected an object"));
        return;
    };

    for field in fields {
        let field_path = if path.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", path, field.name)
        };
        match obj.get(&field.name) {
            None | Some(Value::Null) if field.optional => {}
            None | Some(Value::Null) => out.push(violation(&field_path, "missing required field")),
            Some(v) => validate_value(&field.kind, v, &field_path, out),
        }
    }
}

fn validate_value(kind: &FieldType, value: &Value, path: &str, out: &mut Vec<Violation>) {
    match kind {
        FieldType::String if !value.is_string() => out.push(violation(path, "expected a string")),
        FieldType::Number if !value.is_number() => out.push(violation(path, "expected a number")),
        FieldType::Boolean if !value.is_boolean() => {
            out.push(violation(path, "expected a boolean"))
        }
        FieldType::Record(fields) => validate_record(fields, value, path, out),
        FieldType::Array { items, min, max } => {
            let Some(values) = value.as_array() else {
                out.push(violation(path, "expected an array"));
                return;
            };
            if let Some(min) = min {
                if values.len() < *min {
                    out.push(violation(
                        path,
                        &format!("expected at least {} items, got {}", min, values.len()),
                    ));
                }
            }
            if let Some(max) = max {
                if values.len() > *max {
                    out.push(violation(
                        path,
                        &format!("expected at most {} items, got {}", max, values.len()),
                    ));
                }
            }
            for (i, item) in values.iter().enumerate() {
                validate_value(items, item, &format!("{}[{}]", path, i), out);
            }
        }
        _ => {}
    }
}

fn violation(path: &str, message: &str) -> Violation {
    Violation {
        path: if path.is_empty() {
            "$".to_string()
        } else {
            path.to_string()
        },
        message: message.to_string(),
    }
}
