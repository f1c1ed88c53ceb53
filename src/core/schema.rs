//! Field types and schema validation
//!
//! Stores validate records against a [`Schema`] before persisting them and
//! report every violation at once.

use crate::core::error::FieldValidationError;
use crate::core::record::Record;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON type a field must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Number,
    Integer,
    String,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
}

impl FieldType {
    /// Check whether a value fits this type. `null` fits every type.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Any => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Any => "any",
        }
    }
}

/// Declaration of a single field
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub required: bool,
    /// Only checked against string values
    pub pattern: Option<Regex>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    fn check(&self, field: &str, value: &Value, errors: &mut Vec<FieldValidationError>) {
        if !self.field_type.accepts(value) {
            errors.push(FieldValidationError {
                field: field.to_string(),
                message: format!("expected {}", self.field_type.name()),
            });
            return;
        }
        if self.required && value.is_null() {
            errors.push(FieldValidationError {
                field: field.to_string(),
                message: "is required".to_string(),
            });
            return;
        }
        if let (Some(pattern), Some(s)) = (&self.pattern, value.as_str()) {
            if !pattern.is_match(s) {
                errors.push(FieldValidationError {
                    field: field.to_string(),
                    message: format!("does not match pattern {}", pattern.as_str()),
                });
            }
        }
    }
}

/// Schema of the managed model
///
/// An empty schema accepts everything. A strict schema rejects fields it
/// does not declare, except the id field which the store owns.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: IndexMap<String, FieldSpec>,
    strict: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an optional field of the given type
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with_field(name, FieldSpec::new(field_type))
    }

    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Validate a complete record (create, or the merged result of an update)
    pub fn validate(&self, record: &Record, id_field: &str) -> Result<(), Vec<FieldValidationError>> {
        let mut errors = self.check_present(record, id_field);
        for (name, spec) in &self.fields {
            if spec.required && name != id_field && !record.contains_key(name) {
                errors.push(FieldValidationError {
                    field: name.clone(),
                    message: "is required".to_string(),
                });
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Validate only the fields present in a partial update
    pub fn validate_patch(&self, patch: &Record, id_field: &str) -> Result<(), Vec<FieldValidationError>> {
        let errors = self.check_present(patch, id_field);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn check_present(&self, record: &Record, id_field: &str) -> Vec<FieldValidationError> {
        let mut errors = Vec::new();
        for (name, value) in record {
            match self.fields.get(name) {
                Some(spec) => spec.check(name, value, &mut errors),
                None if self.strict && name != id_field => errors.push(FieldValidationError {
                    field: name.clone(),
                    message: "is not declared in the schema".to_string(),
                }),
                None => {}
            }
        }
        errors
    }
}
