//! Schema creation
//!
//! Idempotent: every statement uses IF NOT EXISTS so startup can always run
//! it. Timestamps are integer milliseconds since the UNIX epoch.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;

const SCHEMA: &[(&str, &str)] = &[
    (
        "assets",
        r#"
        CREATE TABLE IF NOT EXISTS assets (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            audio_url TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL CHECK (duration_seconds >= 0)
        )
        "#,
    ),
    (
        "shows",
        r#"
        CREATE TABLE IF NOT EXISTS shows (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            host_name TEXT
        )
        "#,
    ),
    (
        // No foreign key on asset_guid: a dangling asset reference is a
        // legal state that resolves to the live fallback.
        "schedule_items",
        r#"
        CREATE TABLE IF NOT EXISTS schedule_items (
            guid TEXT PRIMARY KEY,
            asset_guid TEXT NOT NULL,
            show_guid TEXT,
            scheduled_start_ms INTEGER NOT NULL,
            scheduled_end_ms INTEGER NOT NULL,
            CHECK (scheduled_start_ms < scheduled_end_ms)
        )
        "#,
    ),
    (
        "idx_schedule_items_window",
        r#"
        CREATE INDEX IF NOT EXISTS idx_schedule_items_window
            ON schedule_items (scheduled_start_ms, scheduled_end_ms)
        "#,
    ),
];

/// Create all tables and indexes
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for (name, sql) in SCHEMA {
        sqlx::query(sql).execute(pool).await?;
        debug!("Schema object ready: {}", name);
    }
    Ok(())
}
