//! Canvas persistence: latest state per room, named snapshots, and the
//! room-owner lookup that gates clearing.

use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::warn;

use crate::{
    codec::canvas::Stroke,
    error::{bad, AppErr, AppResult},
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS rooms (
        id        TEXT PRIMARY KEY,
        owner_id  TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS canvas_snapshots (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id    TEXT NOT NULL,
        state_json TEXT NOT NULL,
        created_by TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_snapshots_room ON canvas_snapshots (room_id, created_at)",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub snapshot_id: i64,
    pub room_id:     String,
    pub created_at:  String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub snapshot_id: i64,
    pub room_id:     String,
    pub state_json:  String,
    pub created_at:  String,
}

#[derive(Clone)]
pub struct CanvasStore {
    pool: SqlitePool,
}

fn now() -> String { Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true) }

/// Parse a stored stroke list. Anything unreadable counts as a blank canvas.
pub fn parse_strokes(room: &str, json: &str) -> Vec<Stroke> {
    serde_json::from_str(json).unwrap_or_else(|e| {
        warn!(room, error = %e, "stored canvas state is not a stroke list");
        Vec::new()
    })
}

impl CanvasStore {
    /// Connect and make sure the schema exists. In-memory databases get a
    /// single connection so every query sees the same data.
    pub async fn open(url: &str) -> Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(opts)
                .await?
        } else {
            SqlitePoolOptions::new().max_connections(8).connect_with(opts).await?
        };
        let store = CanvasStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool { &self.pool }

    /* ------------ ownership ------------ */

    async fn owner_of(&self, room: &str) -> AppResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT owner_id FROM rooms WHERE id = ? AND is_active = 1")
                .bind(room)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(o,)| o))
    }

    pub async fn is_owner(&self, user: &str, room: &str) -> AppResult<bool> {
        Ok(self.owner_of(room).await?.as_deref() == Some(user))
    }

    /* ------------ current state ------------ */

    async fn latest(&self, room: &str) -> AppResult<Option<(i64, String, String)>> {
        let row: Option<(i64, String, String)> = sqlx::query_as(
            "SELECT id, state_json, created_at FROM canvas_snapshots
             WHERE room_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(room)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Latest saved state as raw JSON plus its timestamp.
    pub async fn load_state(&self, room: &str) -> AppResult<Option<(String, String)>> {
        Ok(self.latest(room).await?.map(|(_, json, at)| (json, at)))
    }

    /// What a room starts from when its first connection arrives.
    pub async fn load_strokes(&self, room: &str) -> AppResult<Vec<Stroke>> {
        Ok(match self.load_state(room).await? {
            Some((json, _)) => parse_strokes(room, &json),
            None => Vec::new(),
        })
    }

    /// Overwrite the latest state, or create it.
    pub async fn save_state(&self, room: &str, state_json: &str) -> AppResult<()> {
        check_strokes(state_json)?;
        match self.latest(room).await? {
            Some((id, _, _)) => {
                sqlx::query("UPDATE canvas_snapshots SET state_json = ? WHERE id = ?")
                    .bind(state_json)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            None => {
                self.insert(room, state_json, None).await?;
            }
        }
        Ok(())
    }

    /* ------------ snapshots ------------ */

    async fn insert(&self, room: &str, state_json: &str, by: Option<&str>) -> AppResult<(i64, String)> {
        let at = now();
        let res = sqlx::query(
            "INSERT INTO canvas_snapshots (room_id, state_json, created_by, created_at) VALUES (?,?,?,?)",
        )
        .bind(room)
        .bind(state_json)
        .bind(by)
        .bind(&at)
        .execute(&self.pool)
        .await?;
        Ok((res.last_insert_rowid(), at))
    }

    /// Always a new version, never an overwrite.
    pub async fn save_snapshot(&self, room: &str, state_json: &str, by: &str) -> AppResult<(i64, String)> {
        check_strokes(state_json)?;
        self.insert(room, state_json, Some(by)).await
    }

    /// Newest first.
    pub async fn list_snapshots(&self, room: &str) -> AppResult<Vec<SnapshotInfo>> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT id, room_id, created_at FROM canvas_snapshots
             WHERE room_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(room)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(snapshot_id, room_id, created_at)| SnapshotInfo { snapshot_id, room_id, created_at })
            .collect())
    }

    pub async fn load_snapshot(&self, id: i64) -> AppResult<Snapshot> {
        let row: Option<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, room_id, state_json, created_at FROM canvas_snapshots WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let (snapshot_id, room_id, state_json, created_at) =
            row.ok_or_else(|| AppErr::NotFound("Snapshot not found.".into()))?;
        Ok(Snapshot { snapshot_id, room_id, state_json, created_at })
    }

    /// Owner-only: record a blank canvas as the newest version.
    pub async fn clear(&self, room: &str, by: &str) -> AppResult<i64> {
        match self.owner_of(room).await? {
            None => return Err(AppErr::NotFound("Room not found".into())),
            Some(owner) if owner != by => {
                return Err(AppErr::Forbidden("Only the room owner can clear the canvas.".into()))
            }
            Some(_) => {}
        }
        let (id, _) = self.insert(room, "[]", Some(by)).await?;
        Ok(id)
    }
}

fn check_strokes(json: &str) -> AppResult<()> {
    serde_json::from_str::<Vec<Stroke>>(json).map(|_| ()).map_err(bad)
}
