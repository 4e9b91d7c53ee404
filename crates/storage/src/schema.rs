//! ClickHouse table schema.
//!
//! Books are append-only versioned rows: every write inserts a new row and
//! `ReplacingMergeTree(version)` keeps the newest per id. Reads use `FINAL`
//! so they never see a superseded version. Deletes insert a tombstone row
//! with `deleted = 1`.

/// SQL for creating the database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// SQL for creating the books table.
pub const CREATE_BOOKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id String,

    title Nullable(String),
    author Nullable(String),
    published_date Nullable(String),
    description Nullable(String),
    image_url Nullable(String),
    created_by Nullable(String),
    created_by_id Nullable(String),

    deleted UInt8 DEFAULT 0,
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
ORDER BY id
"#;

/// Columns in the order [`BookRow`](crate::clickhouse_store::BookRow) declares them.
pub const BOOK_COLUMNS: &str = "id, title, author, published_date, description, \
     image_url, created_by, created_by_id, deleted, version";

/// Next offset each worker subscription reads, per topic partition.
pub const CREATE_OFFSETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS subscription_offsets (
    subscription String,
    topic String,
    partition Int32,
    next_offset Int64,
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
ORDER BY (subscription, topic, partition)
"#;

/// Returns all table DDL statements in order.
pub fn all_tables() -> Vec<&'static str> {
    vec![CREATE_BOOKS_TABLE, CREATE_OFFSETS_TABLE]
}
