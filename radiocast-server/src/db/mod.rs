//! Database access layer
//!
//! The [`ScheduleStore`] trait is everything the radio core needs from
//! persistence. [`SqliteStore`] implements it over a sqlx SQLite pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use radiocast_common::{Asset, ScheduleItem, Show};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

pub mod init;
mod sqlite;

pub use sqlite::SqliteStore;

/// Persistence contract for schedule items, assets and shows
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Item whose `[start, end)` contains `at`; latest start wins on overlap
    async fn find_schedule_item_active_at(&self, at: DateTime<Utc>) -> Result<Option<ScheduleItem>>;

    async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>>;

    async fn get_show(&self, id: Uuid) -> Result<Option<Show>>;

    /// All items ordered by scheduled start
    async fn list_schedule_items(&self) -> Result<Vec<ScheduleItem>>;

    async fn get_schedule_item(&self, id: Uuid) -> Result<Option<ScheduleItem>>;

    async fn create_schedule_item(&self, item: &ScheduleItem) -> Result<()>;

    /// Returns false when no item with that id exists
    async fn update_schedule_item(&self, item: &ScheduleItem) -> Result<bool>;

    /// Returns false when no item with that id exists
    async fn delete_schedule_item(&self, id: Uuid) -> Result<bool>;

    async fn create_asset(&self, asset: &Asset) -> Result<()>;

    async fn list_assets(&self) -> Result<Vec<Asset>>;

    async fn create_show(&self, show: &Show) -> Result<()>;
}

/// Open (creating if missing) the database file and ensure the schema
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init::init_schema(&pool).await?;
    info!("Database ready at {}", db_path.display());
    Ok(pool)
}

/// Single-connection in-memory database with schema, for tests
///
/// One connection only: every new SQLite memory connection is a separate
/// empty database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init::init_schema(&pool).await?;
    Ok(pool)
}
