//! Device table schema: API field names, storage columns, value kinds, and sort order.
//!
//! The schema is the single source of truth for storage-level names. Field
//! `id` is stored in column `_id`; the other fields use same-named columns.

use crate::error::RegistryError;
use crate::router::DEVICES_PATH;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const FIELD_ID: &str = "id";
pub const FIELD_USER: &str = "user";
pub const FIELD_NAME: &str = "name";
pub const FIELD_ADDRESS: &str = "address";
pub const FIELD_SELECTED: &str = "selected";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    Boolean,
}

impl FieldKind {
    /// SQLite column type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Integer | FieldKind::Boolean => "INTEGER",
            FieldKind::Text => "TEXT",
        }
    }

    pub fn expected(&self) -> &'static str {
        match self {
            FieldKind::Integer => "an integer",
            FieldKind::Text => "a string",
            FieldKind::Boolean => "a boolean",
        }
    }

    /// Null is accepted by every kind; required-ness is checked separately.
    pub fn accepts(&self, v: &Value) -> bool {
        match (self, v) {
            (_, Value::Null) => true,
            (FieldKind::Integer, Value::Number(n)) => n.is_i64(),
            (FieldKind::Text, Value::String(_)) => true,
            (FieldKind::Boolean, Value::Bool(_)) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortTerm {
    pub field: &'static str,
    pub direction: SortDirection,
}

/// One or more sort terms, each naming a schema field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortOrder {
    pub terms: Vec<SortTerm>,
}

#[derive(Clone, Debug)]
pub struct DeviceSchema {
    fields: Vec<FieldSpec>,
    by_name: HashMap<&'static str, usize>,
    default_sort: SortOrder,
}

impl DeviceSchema {
    /// The devices table: `id`, `user`, `name`, `address`, `selected`, sorted by `address ASC`.
    pub fn devices() -> Self {
        let fields = vec![
            FieldSpec { name: FIELD_ID, column: "_id", kind: FieldKind::Integer },
            FieldSpec { name: FIELD_USER, column: FIELD_USER, kind: FieldKind::Text },
            FieldSpec { name: FIELD_NAME, column: FIELD_NAME, kind: FieldKind::Text },
            FieldSpec { name: FIELD_ADDRESS, column: FIELD_ADDRESS, kind: FieldKind::Text },
            FieldSpec { name: FIELD_SELECTED, column: FIELD_SELECTED, kind: FieldKind::Boolean },
        ];
        let by_name = fields.iter().enumerate().map(|(i, f)| (f.name, i)).collect();
        DeviceSchema {
            fields,
            by_name,
            default_sort: SortOrder {
                terms: vec![SortTerm {
                    field: FIELD_ADDRESS,
                    direction: SortDirection::Asc,
                }],
            },
        }
    }

    pub fn table_name(&self) -> &'static str {
        DEVICES_PATH
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Field names in schema order.
    pub fn allowed_fields(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn default_sort(&self) -> &SortOrder {
        &self.default_sort
    }

    pub fn id_field(&self) -> &FieldSpec {
        &self.fields[self.by_name[FIELD_ID]]
    }

    pub fn field(&self, name: &str) -> Result<&FieldSpec, RegistryError> {
        self.by_name
            .get(name)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| RegistryError::InvalidField(name.to_string()))
    }

    pub fn column_for(&self, name: &str) -> Result<&'static str, RegistryError> {
        self.field(name).map(|f| f.column)
    }

    /// Fields to return for a query. Empty or absent means every field.
    pub fn projection(&self, requested: Option<&[&str]>) -> Result<Vec<&FieldSpec>, RegistryError> {
        match requested {
            None | Some([]) => Ok(self.fields.iter().collect()),
            Some(names) => names.iter().map(|n| self.field(n)).collect(),
        }
    }

    /// Parse `"field [ASC|DESC], ..."`. Blank or absent yields the default sort.
    pub fn sort_order(&self, order: Option<&str>) -> Result<SortOrder, RegistryError> {
        let Some(order) = order.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(self.default_sort.clone());
        };
        let mut terms = Vec::new();
        for term in order.split(',') {
            let mut words = term.split_whitespace();
            let name = words
                .next()
                .ok_or_else(|| RegistryError::InvalidField(order.to_string()))?;
            let field = self.field(name)?;
            let direction = match words.next() {
                None => SortDirection::Asc,
                Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                Some(d) => return Err(RegistryError::InvalidField(format!("{} {}", name, d))),
            };
            if let Some(extra) = words.next() {
                return Err(RegistryError::InvalidField(format!("{} (unexpected '{}')", term.trim(), extra)));
            }
            terms.push(SortTerm {
                field: field.name,
                direction,
            });
        }
        Ok(SortOrder { terms })
    }
}

impl Default for DeviceSchema {
    fn default() -> Self {
        DeviceSchema::devices()
    }
}

/// One full row of the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub user: String,
    pub name: String,
    pub address: String,
    pub selected: bool,
}

impl TryFrom<Value> for Device {
    type Error = serde_json::Error;

    fn try_from(row: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(row)
    }
}
