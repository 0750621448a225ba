//! Value validation and insert defaults.

use crate::error::RegistryError;
use crate::schema::{DeviceSchema, FieldSpec, FIELD_ADDRESS, FIELD_ID, FIELD_NAME, FIELD_SELECTED, FIELD_USER};
use serde_json::Value;
use std::collections::HashMap;

pub struct ValuesValidator;

impl ValuesValidator {
    /// Validate insert values and fill defaults. Each default is gated on its own key:
    /// `name` falls back to `default_name`, `address` to `user + "/" + name` (using the
    /// final name), `selected` to false. An explicit null counts as absent.
    pub fn prepare_insert<'s>(
        schema: &'s DeviceSchema,
        values: &HashMap<String, Value>,
        default_name: &str,
    ) -> Result<Vec<(&'s FieldSpec, Value)>, RegistryError> {
        check_fields(schema, values)?;

        let user = present_str(values, FIELD_USER)
            .ok_or(RegistryError::MissingRequiredField(FIELD_USER))?
            .to_string();
        let name = present_str(values, FIELD_NAME).unwrap_or(default_name).to_string();
        let address = present_str(values, FIELD_ADDRESS)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", user, name));
        let selected = values
            .get(FIELD_SELECTED)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(vec![
            (schema.field(FIELD_USER)?, Value::String(user)),
            (schema.field(FIELD_NAME)?, Value::String(name)),
            (schema.field(FIELD_ADDRESS)?, Value::String(address)),
            (schema.field(FIELD_SELECTED)?, Value::Bool(selected)),
        ])
    }

    /// Validate update values. Returns the fields to set, in schema order.
    pub fn prepare_update<'s>(
        schema: &'s DeviceSchema,
        values: &HashMap<String, Value>,
    ) -> Result<Vec<(&'s FieldSpec, Value)>, RegistryError> {
        check_fields(schema, values)?;
        if values.is_empty() {
            return Err(RegistryError::EmptyUpdate);
        }
        Ok(schema
            .fields()
            .iter()
            .filter_map(|f| values.get(f.name).map(|v| (f, v.clone())))
            .collect())
    }
}

/// Every key must be a known, non-id field holding a value of the field's kind.
fn check_fields(schema: &DeviceSchema, values: &HashMap<String, Value>) -> Result<(), RegistryError> {
    for (name, value) in values {
        let field = schema.field(name)?;
        if field.name == FIELD_ID {
            return Err(RegistryError::InvalidField(name.clone()));
        }
        if !field.kind.accepts(value) {
            return Err(RegistryError::InvalidFieldValue {
                field: name.clone(),
                expected: field.kind.expected(),
            });
        }
    }
    Ok(())
}

fn present_str<'v>(values: &'v HashMap<String, Value>, key: &str) -> Option<&'v str> {
    values.get(key).and_then(Value::as_str)
}
