//! SQLite implementation of [`ScheduleStore`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use radiocast_common::time::{from_epoch_ms, to_epoch_ms};
use radiocast_common::{Asset, ScheduleItem, Show};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::ScheduleStore;
use crate::error::{Error, Result};

const ITEM_COLUMNS: &str = "guid, asset_guid, show_guid, scheduled_start_ms, scheduled_end_ms";

/// Schedule store backed by a sqlx SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Corrupt guid '{}': {}", value, e)))
}

fn schedule_item_from_row(row: &SqliteRow) -> Result<ScheduleItem> {
    let show_guid: Option<String> = row.get("show_guid");
    Ok(ScheduleItem {
        id: parse_guid(row.get("guid"))?,
        asset_id: parse_guid(row.get("asset_guid"))?,
        show_id: show_guid.as_deref().map(parse_guid).transpose()?,
        scheduled_start: from_epoch_ms(row.get("scheduled_start_ms")),
        scheduled_end: from_epoch_ms(row.get("scheduled_end_ms")),
    })
}

fn asset_from_row(row: &SqliteRow) -> Result<Asset> {
    let duration: i64 = row.get("duration_seconds");
    Ok(Asset {
        id: parse_guid(row.get("guid"))?,
        title: row.get("title"),
        artist: row.get("artist"),
        audio_url: row.get("audio_url"),
        duration_seconds: duration.clamp(0, i64::from(u32::MAX)) as u32,
    })
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn find_schedule_item_active_at(&self, at: DateTime<Utc>) -> Result<Option<ScheduleItem>> {
        let at_ms = to_epoch_ms(at);
        let row = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM schedule_items
            WHERE scheduled_start_ms <= ? AND scheduled_end_ms > ?
            ORDER BY scheduled_start_ms DESC, rowid DESC
            LIMIT 1
            "#
        ))
        .bind(at_ms)
        .bind(at_ms)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(schedule_item_from_row).transpose()
    }

    async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>> {
        let row = sqlx::query(
            "SELECT guid, title, artist, audio_url, duration_seconds FROM assets WHERE guid = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(asset_from_row).transpose()
    }

    async fn get_show(&self, id: Uuid) -> Result<Option<Show>> {
        let row = sqlx::query("SELECT guid, name, host_name FROM shows WHERE guid = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Show {
                id: parse_guid(row.get("guid"))?,
                name: row.get("name"),
                host_name: row.get("host_name"),
            })),
            None => Ok(None),
        }
    }

    async fn list_schedule_items(&self) -> Result<Vec<ScheduleItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM schedule_items ORDER BY scheduled_start_ms ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(schedule_item_from_row).collect()
    }

    async fn get_schedule_item(&self, id: Uuid) -> Result<Option<ScheduleItem>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM schedule_items WHERE guid = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(schedule_item_from_row).transpose()
    }

    async fn create_schedule_item(&self, item: &ScheduleItem) -> Result<()> {
        item.validate()?;
        sqlx::query(
            r#"
            INSERT INTO schedule_items (guid, asset_guid, show_guid, scheduled_start_ms, scheduled_end_ms)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.asset_id.to_string())
        .bind(item.show_id.map(|id| id.to_string()))
        .bind(to_epoch_ms(item.scheduled_start))
        .bind(to_epoch_ms(item.scheduled_end))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_schedule_item(&self, item: &ScheduleItem) -> Result<bool> {
        item.validate()?;
        let result = sqlx::query(
            r#"
            UPDATE schedule_items
            SET asset_guid = ?, show_guid = ?, scheduled_start_ms = ?, scheduled_end_ms = ?
            WHERE guid = ?
            "#,
        )
        .bind(item.asset_id.to_string())
        .bind(item.show_id.map(|id| id.to_string()))
        .bind(to_epoch_ms(item.scheduled_start))
        .bind(to_epoch_ms(item.scheduled_end))
        .bind(item.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_schedule_item(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM schedule_items WHERE guid = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_asset(&self, asset: &Asset) -> Result<()> {
        sqlx::query(
            "INSERT INTO assets (guid, title, artist, audio_url, duration_seconds) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(asset.id.to_string())
        .bind(&asset.title)
        .bind(&asset.artist)
        .bind(&asset.audio_url)
        .bind(i64::from(asset.duration_seconds))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<Asset>> {
        let rows = sqlx::query(
            "SELECT guid, title, artist, audio_url, duration_seconds FROM assets ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(asset_from_row).collect()
    }

    async fn create_show(&self, show: &Show) -> Result<()> {
        sqlx::query("INSERT INTO shows (guid, name, host_name) VALUES (?, ?, ?)")
            .bind(show.id.to_string())
            .bind(&show.name)
            .bind(&show.host_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use chrono::{Duration, TimeZone};

    async fn store() -> SqliteStore {
        SqliteStore::new(connect_in_memory().await.unwrap())
    }

    fn item_at(start: DateTime<Utc>, secs: i64) -> ScheduleItem {
        ScheduleItem {
            id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
            show_id: None,
            scheduled_start: start,
            scheduled_end: start + Duration::seconds(secs),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 18, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_find_active_respects_half_open_window() {
        let store = store().await;
        let item = item_at(t0(), 180);
        store.create_schedule_item(&item).await.unwrap();

        let found = store.find_schedule_item_active_at(t0()).await.unwrap();
        assert_eq!(found, Some(item.clone()));

        let at_end = store
            .find_schedule_item_active_at(t0() + Duration::seconds(180))
            .await
            .unwrap();
        assert!(at_end.is_none());

        let before = store
            .find_schedule_item_active_at(t0() - Duration::milliseconds(1))
            .await
            .unwrap();
        assert!(before.is_none());
    }

    #[tokio::test]
    async fn test_find_active_prefers_latest_start() {
        let store = store().await;
        let early = item_at(t0(), 600);
        let late = item_at(t0() + Duration::seconds(60), 600);
        store.create_schedule_item(&late).await.unwrap();
        store.create_schedule_item(&early).await.unwrap();

        let found = store
            .find_schedule_item_active_at(t0() + Duration::seconds(120))
            .await
            .unwrap();
        assert_eq!(found.map(|i| i.id), Some(late.id));
    }

    #[tokio::test]
    async fn test_update_and_delete_report_missing_rows() {
        let store = store().await;
        let mut item = item_at(t0(), 60);
        assert!(!store.update_schedule_item(&item).await.unwrap());
        assert!(!store.delete_schedule_item(item.id).await.unwrap());

        store.create_schedule_item(&item).await.unwrap();
        item.scheduled_end = item.scheduled_start + Duration::seconds(90);
        assert!(store.update_schedule_item(&item).await.unwrap());
        assert_eq!(store.get_schedule_item(item.id).await.unwrap(), Some(item.clone()));

        assert!(store.delete_schedule_item(item.id).await.unwrap());
        assert!(store.get_schedule_item(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_window() {
        let store = store().await;
        let mut item = item_at(t0(), 60);
        item.scheduled_end = item.scheduled_start;
        assert!(matches!(
            store.create_schedule_item(&item).await,
            Err(Error::Common(radiocast_common::Error::InvalidInput(_)))
        ));
    }

    #[tokio::test]
    async fn test_assets_and_shows_round_trip_through_lookup() {
        let store = store().await;
        let asset = Asset {
            id: Uuid::new_v4(),
            title: "Harbour Lights".to_string(),
            artist: "Noor".to_string(),
            audio_url: "https://cdn.example.com/harbour.mp3".to_string(),
            duration_seconds: 240,
        };
        let show = Show {
            id: Uuid::new_v4(),
            name: "Sunday Tapes".to_string(),
            host_name: None,
        };
        store.create_asset(&asset).await.unwrap();
        store.create_show(&show).await.unwrap();

        assert_eq!(store.get_asset(asset.id).await.unwrap(), Some(asset.clone()));
        assert_eq!(store.get_show(show.id).await.unwrap(), Some(show));
        assert!(store.get_asset(Uuid::new_v4()).await.unwrap().is_none());
        assert_eq!(store.list_assets().await.unwrap(), vec![asset]);
    }
}
