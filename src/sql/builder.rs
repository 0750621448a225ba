//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for the devices table.
//! Identifiers come from the schema only; values are always bound as `?` parameters,
//! in the order they appear in the statement text.

use crate::error::RegistryError;
use crate::router::Route;
use crate::schema::{DeviceSchema, FieldSpec, SortOrder};
use serde_json::Value;

/// Quote identifier for SQLite (safe: only from schema).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug)]
enum Predicate {
    FieldEq { field: String, value: Value },
    Raw { clause: String, args: Vec<Value> },
}

/// Caller-supplied row filter: a conjunction of predicates. Empty selects every row.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    predicates: Vec<Predicate>,
}

impl Selection {
    /// Matches every row.
    pub fn all() -> Self {
        Selection::default()
    }

    /// `field = value` (or `field IS NULL` for a null value). The field is checked against the schema when the statement is built.
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Selection {
            predicates: vec![Predicate::FieldEq {
                field: field.into(),
                value: value.into(),
            }],
        }
    }

    /// Storage-level SQL fragment with `?` placeholders bound to `args` in order.
    pub fn raw(clause: impl Into<String>, args: Vec<Value>) -> Self {
        Selection {
            predicates: vec![Predicate::Raw {
                clause: clause.into(),
                args,
            }],
        }
    }

    pub fn and(mut self, other: Selection) -> Self {
        self.predicates.extend(other.predicates);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: Value) {
        self.params.push(v);
    }

    /// Appends ` WHERE ...` for the route's id restriction AND the caller's selection, if any.
    fn push_where(
        &mut self,
        schema: &DeviceSchema,
        route: &Route,
        selection: Option<&Selection>,
    ) -> Result<(), RegistryError> {
        let mut parts = Vec::new();
        if let Route::Item(id) = route {
            parts.push(format!("{} = ?", quoted(schema.id_field().column)));
            self.push_param(Value::from(*id));
        }
        for p in selection.map(|s| s.predicates.as_slice()).unwrap_or(&[]) {
            match p {
                Predicate::FieldEq { field, value: Value::Null } => {
                    parts.push(format!("{} IS NULL", quoted(schema.column_for(field)?)));
                }
                Predicate::FieldEq { field, value } => {
                    parts.push(format!("{} = ?", quoted(schema.column_for(field)?)));
                    self.push_param(value.clone());
                }
                Predicate::Raw { clause, args } => {
                    parts.push(format!("({})", clause));
                    for a in args {
                        self.push_param(a.clone());
                    }
                }
            }
        }
        if !parts.is_empty() {
            self.sql.push_str(" WHERE ");
            self.sql.push_str(&parts.join(" AND "));
        }
        Ok(())
    }
}

/// SELECT list: storage column aliased to its field name when they differ.
fn select_column_list(fields: &[&FieldSpec]) -> String {
    fields
        .iter()
        .map(|f| {
            if f.column == f.name {
                quoted(f.column)
            } else {
                format!("{} AS {}", quoted(f.column), quoted(f.name))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn order_clause(schema: &DeviceSchema, sort: &SortOrder) -> Result<String, RegistryError> {
    let mut terms = Vec::with_capacity(sort.terms.len());
    for t in &sort.terms {
        terms.push(format!("{} {}", quoted(schema.column_for(t.field)?), t.direction.as_sql()));
    }
    Ok(format!(" ORDER BY {}", terms.join(", ")))
}

/// SELECT fields for the route, narrowed by selection, ordered by sort.
pub fn select(
    schema: &DeviceSchema,
    fields: &[&FieldSpec],
    route: &Route,
    selection: Option<&Selection>,
    sort: &SortOrder,
) -> Result<QueryBuf, RegistryError> {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {}",
        select_column_list(fields),
        quoted(schema.table_name())
    );
    q.push_where(schema, route, selection)?;
    q.sql.push_str(&order_clause(schema, sort)?);
    Ok(q)
}

/// INSERT one row from (field, value) pairs; the id column is left to the store.
pub fn insert(schema: &DeviceSchema, values: &[(&FieldSpec, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (field, value) in values {
        cols.push(quoted(field.column));
        placeholders.push("?");
        q.push_param(value.clone());
    }
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quoted(schema.table_name()))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(schema.table_name()),
            cols.join(", "),
            placeholders.join(", ")
        )
    };
    q
}

/// UPDATE: SET the given fields on rows matching route and selection.
pub fn update(
    schema: &DeviceSchema,
    route: &Route,
    values: &[(&FieldSpec, Value)],
    selection: Option<&Selection>,
) -> Result<QueryBuf, RegistryError> {
    if values.is_empty() {
        return Err(RegistryError::EmptyUpdate);
    }
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(values.len());
    for (field, value) in values {
        sets.push(format!("{} = ?", quoted(field.column)));
        q.push_param(value.clone());
    }
    q.sql = format!("UPDATE {} SET {}", quoted(schema.table_name()), sets.join(", "));
    q.push_where(schema, route, selection)?;
    Ok(q)
}

/// DELETE rows matching route and selection. A collection route with no selection deletes every row.
pub fn delete(
    schema: &DeviceSchema,
    route: &Route,
    selection: Option<&Selection>,
) -> Result<QueryBuf, RegistryError> {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {}", quoted(schema.table_name()));
    q.push_where(schema, route, selection)?;
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> DeviceSchema {
        DeviceSchema::devices()
    }

    #[test]
    fn item_select_narrows_by_id_before_selection() {
        let s = schema();
        let fields = s.projection(Some(&["id", "name"])).unwrap();
        let sel = Selection::field_eq("user", "a@b.com");
        let q = select(&s, &fields, &Route::Item(4), Some(&sel), s.default_sort()).unwrap();
        assert_eq!(
            q.sql,
            r#"SELECT "_id" AS "id", "name" FROM "devices" WHERE "_id" = ? AND "user" = ? ORDER BY "address" ASC"#
        );
        assert_eq!(q.params, vec![json!(4), json!("a@b.com")]);
    }

    #[test]
    fn collection_select_uses_selection_as_is() {
        let s = schema();
        let fields = s.projection(None).unwrap();
        let sort = s.sort_order(Some("name DESC")).unwrap();
        let q = select(&s, &fields, &Route::Collection, None, &sort).unwrap();
        assert_eq!(
            q.sql,
            r#"SELECT "_id" AS "id", "user", "name", "address", "selected" FROM "devices" ORDER BY "name" DESC"#
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn raw_clauses_are_parenthesized_and_args_follow_text_order() {
        let s = schema();
        let sel = Selection::raw("user = ? OR name = ?", vec![json!("u"), json!("n")])
            .and(Selection::field_eq("selected", true));
        let q = delete(&s, &Route::Item(9), Some(&sel)).unwrap();
        assert_eq!(
            q.sql,
            r#"DELETE FROM "devices" WHERE "_id" = ? AND (user = ? OR name = ?) AND "selected" = ?"#
        );
        assert_eq!(q.params, vec![json!(9), json!("u"), json!("n"), json!(true)]);
    }

    #[test]
    fn null_equality_becomes_is_null() {
        let s = schema();
        let q = delete(&s, &Route::Collection, Some(&Selection::field_eq("name", Value::Null))).unwrap();
        assert_eq!(q.sql, r#"DELETE FROM "devices" WHERE "name" IS NULL"#);
        assert!(q.params.is_empty());
    }

    #[test]
    fn unqualified_collection_delete_has_no_where() {
        let q = delete(&schema(), &Route::Collection, None).unwrap();
        assert_eq!(q.sql, r#"DELETE FROM "devices""#);
    }

    #[test]
    fn update_binds_set_values_before_where() {
        let s = schema();
        let selected = s.field("selected").unwrap();
        let q = update(&s, &Route::Item(2), &[(selected, json!(true))], None).unwrap();
        assert_eq!(q.sql, r#"UPDATE "devices" SET "selected" = ? WHERE "_id" = ?"#);
        assert_eq!(q.params, vec![json!(true), json!(2)]);
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(matches!(
            update(&schema(), &Route::Collection, &[], None),
            Err(RegistryError::EmptyUpdate)
        ));
    }

    #[test]
    fn unknown_selection_field_is_rejected() {
        let sel = Selection::field_eq("colour", "red");
        assert!(matches!(
            delete(&schema(), &Route::Collection, Some(&sel)),
            Err(RegistryError::InvalidField(_))
        ));
    }

    #[test]
    fn insert_lists_columns_in_given_order() {
        let s = schema();
        let user = s.field("user").unwrap();
        let name = s.field("name").unwrap();
        let q = insert(&s, &[(user, json!("u")), (name, json!("n"))]);
        assert_eq!(q.sql, r#"INSERT INTO "devices" ("user", "name") VALUES (?, ?)"#);
        assert_eq!(q.params, vec![json!("u"), json!("n")]);
    }
}
