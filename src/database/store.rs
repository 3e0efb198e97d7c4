// Generic persistence mapper.
//
// All six entities share one CRUD implementation driven by the schema
// descriptors: SQL text comes from the descriptor's column list, values are
// bound with their column types, and rows come back as `row_to_json` so no
// per-entity row structs exist. Payloads reaching this layer have already
// passed boundary validation.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Postgres, Row};
use uuid::Uuid;

use super::{Database, DatabaseError};
use crate::schema::{self, EntityKind, FieldSpec, FieldType};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Credential columns for the login flow. The only place a password hash
/// leaves the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileCredentials {
    pub id: Uuid,
    pub profile_password: String,
    pub profile_role: String,
}

impl Database {
    /// Inserts one record; the id is generated here, timestamps come from
    /// column defaults. Returns the stored row.
    pub async fn insert(
        &self,
        kind: EntityKind,
        fields: &Map<String, Value>,
    ) -> Result<Value, DatabaseError> {
        let provided = provided_fields(kind, fields);
        let mut columns = vec!["id"];
        columns.extend(provided.iter().map(|(spec, _)| spec.name));

        let sql = insert_sql(kind.table(), &columns);
        let mut query = sqlx::query(&sql).bind(Uuid::new_v4());
        for (spec, value) in &provided {
            query = bind_field(query, spec, value)?;
        }

        let row = query.fetch_one(self.pool()).await?;
        row_value(&row, kind)
    }

    /// Reads one record by id.
    pub async fn fetch(&self, kind: EntityKind, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let sql = select_sql(kind.table());
        let row = sqlx::query(&sql).bind(id).fetch_optional(self.pool()).await?;
        row.map(|row| row_value(&row, kind)).transpose()
    }

    /// Applies a whitelisted partial update and returns the new row, or
    /// `None` when the id does not exist. `updated_at` is touched on tables
    /// that carry it.
    pub async fn update(
        &self,
        kind: EntityKind,
        id: Uuid,
        fields: &Map<String, Value>,
    ) -> Result<Option<Value>, DatabaseError> {
        let provided = provided_fields(kind, fields);
        if provided.is_empty() {
            return Err(DatabaseError::Query("update requires at least one field".into()));
        }
        let columns: Vec<&str> = provided.iter().map(|(spec, _)| spec.name).collect();

        let sql = update_sql(kind.table(), &columns, kind.descriptor().has_updated_at);
        let mut query = sqlx::query(&sql);
        for (spec, value) in &provided {
            query = bind_field(query, spec, value)?;
        }
        query = query.bind(id);

        let row = query.fetch_optional(self.pool()).await?;
        row.map(|row| row_value(&row, kind)).transpose()
    }

    /// Deletes one record and returns it, or `None` when the id does not
    /// exist. Dependent rows follow the cascade rules declared in the DDL.
    pub async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let sql = delete_sql(kind.table());
        let row = sqlx::query(&sql).bind(id).fetch_optional(self.pool()).await?;
        row.map(|row| row_value(&row, kind)).transpose()
    }

    /// Lists records newest first.
    pub async fn list(
        &self,
        kind: EntityKind,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Value>, DatabaseError> {
        let sql = list_sql(kind.table());
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(|row| row_value(row, kind)).collect()
    }

    /// Links a tag to a document. Duplicate links violate the relation's
    /// primary key and surface as `UniqueViolation`.
    pub async fn attach_tag(&self, document_id: Uuid, tag_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query(r#"INSERT INTO "document_tag_relation" ("document_id", "tag_id") VALUES ($1, $2)"#)
            .bind(document_id)
            .bind(tag_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Unlinks a tag from a document; `false` when no link existed.
    pub async fn detach_tag(&self, document_id: Uuid, tag_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"DELETE FROM "document_tag_relation" WHERE "document_id" = $1 AND "tag_id" = $2"#,
        )
        .bind(document_id)
        .bind(tag_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Tags attached to one document, ordered by name.
    pub async fn document_tags(&self, document_id: Uuid) -> Result<Vec<Value>, DatabaseError> {
        let rows = sqlx::query(
            r#"SELECT row_to_json(t) AS row FROM (
                SELECT tg.* FROM "tags" tg
                JOIN "document_tag_relation" dtr ON dtr."tag_id" = tg."id"
                WHERE dtr."document_id" = $1
                ORDER BY tg."name"
            ) t"#,
        )
        .bind(document_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(|row| row_value(row, EntityKind::Tag)).collect()
    }

    /// Looks up login credentials by email.
    pub async fn find_profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileCredentials>, DatabaseError> {
        sqlx::query_as::<_, ProfileCredentials>(
            r#"SELECT "id", "profile_password", "profile_role" FROM "profiles" WHERE "email" = $1"#,
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(Into::into)
    }
}

/// Pairs each provided value with its descriptor spec, in descriptor order
/// so generated SQL is deterministic.
fn provided_fields<'f>(
    kind: EntityKind,
    fields: &'f Map<String, Value>,
) -> Vec<(&'static FieldSpec, &'f Value)> {
    kind.descriptor()
        .fields
        .iter()
        .filter_map(|spec| fields.get(spec.name).map(|value| (spec, value)))
        .collect()
}

/// Binds one JSON value with the column type its spec declares. Nulls bind
/// as typed `None` so Postgres sees the right parameter type.
fn bind_field<'q>(
    query: PgQuery<'q>,
    spec: &FieldSpec,
    value: &'q Value,
) -> Result<PgQuery<'q>, DatabaseError> {
    if value.is_null() {
        return Ok(match spec.kind {
            FieldType::Uuid => query.bind(None::<Uuid>),
            FieldType::Date => query.bind(None::<NaiveDate>),
            _ => query.bind(None::<String>),
        });
    }

    let text = value.as_str().ok_or_else(|| {
        DatabaseError::Query(format!("field '{}' did not reach the store as a string", spec.name))
    })?;

    Ok(match spec.kind {
        FieldType::Uuid => {
            let id = Uuid::parse_str(text).map_err(|err| {
                DatabaseError::Query(format!("field '{}': {err}", spec.name))
            })?;
            query.bind(id)
        }
        FieldType::Date => {
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|err| {
                DatabaseError::Query(format!("field '{}': {err}", spec.name))
            })?;
            query.bind(date)
        }
        _ => query.bind(text),
    })
}

/// Extracts the `row_to_json` column and strips secret fields before the
/// record can leave the database layer.
fn row_value(row: &PgRow, kind: EntityKind) -> Result<Value, DatabaseError> {
    let mut value: Value = row.try_get("row")?;
    schema::strip_secrets(kind, &mut value);
    Ok(value)
}

fn quoted(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "WITH inserted AS (INSERT INTO \"{table}\" ({}) VALUES ({placeholders}) RETURNING *) \
         SELECT row_to_json(inserted) AS row FROM inserted",
        quoted(columns)
    )
}

fn select_sql(table: &str) -> String {
    format!("SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{table}\" WHERE \"id\" = $1) t")
}

fn list_sql(table: &str) -> String {
    format!(
        "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{table}\" \
         ORDER BY \"created_at\" DESC, \"id\" LIMIT $1 OFFSET $2) t"
    )
}

fn update_sql(table: &str, columns: &[&str], touch_updated_at: bool) -> String {
    let mut assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("\"{column}\" = ${}", i + 1))
        .collect();
    if touch_updated_at {
        assignments.push("\"updated_at\" = now()".to_string());
    }
    let id_param = columns.len() + 1;
    format!(
        "WITH updated AS (UPDATE \"{table}\" SET {} WHERE \"id\" = ${id_param} RETURNING *) \
         SELECT row_to_json(updated) AS row FROM updated",
        assignments.join(", ")
    )
}

fn delete_sql(table: &str) -> String {
    format!(
        "WITH deleted AS (DELETE FROM \"{table}\" WHERE \"id\" = $1 RETURNING *) \
         SELECT row_to_json(deleted) AS row FROM deleted"
    )
}
