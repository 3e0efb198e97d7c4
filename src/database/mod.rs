// Database connection management and schema bootstrap.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

pub mod store;

pub use store::ProfileCredentials;

/// Errors surfaced by the persistence layer, classified so handlers can map
/// them to HTTP statuses without inspecting driver internals.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {message}")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("foreign key constraint violated: {message}")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("check constraint violated: {message}")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().map(String::from);
                let table = db_err
                    .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                    .and_then(|pg| pg.table())
                    .map(String::from);
                let message = db_err.message().to_string();

                if db_err.is_unique_violation() {
                    DatabaseError::UniqueViolation { constraint, table, message }
                } else if db_err.is_foreign_key_violation() {
                    DatabaseError::ForeignKeyViolation { constraint, table, message }
                } else if db_err.is_check_violation() {
                    DatabaseError::CheckViolation { constraint, table, message }
                } else {
                    DatabaseError::Sqlx(err)
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Unavailable(err.to_string())
            }
            _ => DatabaseError::Sqlx(err),
        }
    }
}

/// Handle to the Postgres pool. Cheap to clone; all store operations hang
/// off this type.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Opens a pool and verifies connectivity with one round trip.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect(&config.url)
            .await?;

        let db = Self { pool };
        db.health_check().await?;
        info!("database pool ready ({} max connections)", config.max_connections);
        Ok(db)
    }

    /// Opens a pool without connecting. The first query pays the connection
    /// cost; used by tests that never reach the database.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect_lazy(&config.url)?;
        Ok(Self { pool })
    }

    /// Creates every table and index the API needs. Idempotent.
    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA_DDL {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("database schema ensured");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const SCHEMA_DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "profiles" (
        "id" uuid PRIMARY KEY,
        "nome" text NOT NULL,
        "email" text NOT NULL UNIQUE,
        "profile_password" text NOT NULL,
        "cpf" text NOT NULL,
        "telefone" text NOT NULL,
        "data_nascimento" date NOT NULL,
        "profile_role" text NOT NULL DEFAULT 'user'
            CHECK ("profile_role" IN ('admin', 'user')),
        "created_at" timestamptz NOT NULL DEFAULT now(),
        "updated_at" timestamptz NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "conversations" (
        "id" uuid PRIMARY KEY,
        "profile_id" uuid NOT NULL REFERENCES "profiles" ("id") ON DELETE CASCADE,
        "title" text NOT NULL,
        "status" text NOT NULL DEFAULT 'open'
            CHECK ("status" IN ('open', 'closed', 'archived')),
        "created_at" timestamptz NOT NULL DEFAULT now(),
        "updated_at" timestamptz NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "messages" (
        "id" uuid PRIMARY KEY,
        "conversation_id" uuid NOT NULL REFERENCES "conversations" ("id") ON DELETE CASCADE,
        "sender_role" text NOT NULL
            CHECK ("sender_role" IN ('user', 'assistant', 'system')),
        "content" text NOT NULL,
        "created_at" timestamptz NOT NULL DEFAULT now(),
        "updated_at" timestamptz NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "documents" (
        "id" uuid PRIMARY KEY,
        "profile_id" uuid REFERENCES "profiles" ("id") ON DELETE SET NULL,
        "title" text NOT NULL,
        "content" text NOT NULL,
        "status" text NOT NULL DEFAULT 'pending'
            CHECK ("status" IN ('pending', 'processed', 'failed')),
        "created_at" timestamptz NOT NULL DEFAULT now(),
        "updated_at" timestamptz NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "tags" (
        "id" uuid PRIMARY KEY,
        "name" text NOT NULL UNIQUE,
        "created_at" timestamptz NOT NULL DEFAULT now(),
        "updated_at" timestamptz NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "document_tag_relation" (
        "document_id" uuid NOT NULL REFERENCES "documents" ("id") ON DELETE CASCADE,
        "tag_id" uuid NOT NULL REFERENCES "tags" ("id") ON DELETE CASCADE,
        PRIMARY KEY ("document_id", "tag_id")
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "activity_logs" (
        "id" uuid PRIMARY KEY,
        "profile_id" uuid REFERENCES "profiles" ("id") ON DELETE SET NULL,
        "action" text NOT NULL
            CHECK ("action" IN ('login', 'create', 'update', 'delete')),
        "description" text,
        "created_at" timestamptz NOT NULL DEFAULT now()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_conversations_profile_id"
        ON "conversations" ("profile_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_messages_conversation_id"
        ON "messages" ("conversation_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_documents_profile_id"
        ON "documents" ("profile_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_activity_logs_profile_id"
        ON "activity_logs" ("profile_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_document_tag_relation_tag_id"
        ON "document_tag_relation" ("tag_id")"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_covers_every_entity_table() {
        let ddl = SCHEMA_DDL.join("\n");
        for kind in crate::schema::EntityKind::ALL {
            assert!(
                ddl.contains(&format!("\"{}\"", kind.table())),
                "no DDL for {}",
                kind.table()
            );
        }
        assert!(ddl.contains("\"document_tag_relation\""));
    }

    #[test]
    fn cascade_rules_match_the_data_model() {
        let ddl = SCHEMA_DDL.join("\n");
        // deleting a profile removes conversations but keeps documents and logs
        assert!(ddl
            .contains(r#""profile_id" uuid NOT NULL REFERENCES "profiles" ("id") ON DELETE CASCADE"#));
        assert!(ddl
            .contains(r#""profile_id" uuid REFERENCES "profiles" ("id") ON DELETE SET NULL"#));
        assert!(ddl.contains(
            r#""conversation_id" uuid NOT NULL REFERENCES "conversations" ("id") ON DELETE CASCADE"#
        ));
    }

    #[test]
    fn classifies_row_not_found() {
        let err = DatabaseError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DatabaseError::NotFound));
    }

    #[test]
    fn classifies_pool_exhaustion_as_unavailable() {
        let err = DatabaseError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, DatabaseError::Unavailable(_)));
    }
}
