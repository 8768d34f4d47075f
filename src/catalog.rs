//! SurrealDB-backed catalog of archived audio streams.

use crate::migration::{EmbeddedMigrations, MigrationRunner, execute_in_transaction};
use eyre::{Result, eyre};
use include_dir::{Dir, include_dir};
use serde::{Deserialize, Serialize};
use surrealdb::{Connection, RecordId, Surreal};

static CATALOG_MIGRATIONS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

/// Table definition of `audio_streams`, as applied by the first migration.
pub const SURREAL_SCHEMA: &str =
    include_str!("../migrations/000_create_audio_streams/up.surql");

/// A recording in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStream {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub blob_url: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
    /// Start of a scheduled live session, if any.
    pub scheduled_at: Option<String>,
    pub is_live: bool,
    pub speaker: String,
    /// `HH:MM:SS`.
    pub running_time: String,
}

const PAST_AUDIOS: &str = "\
SELECT
    id,
    title,
    description,
    blob_url,
    <string> created_at AS created_at,
    IF scheduled_at != NONE THEN <string> scheduled_at END AS scheduled_at,
    is_live,
    speaker,
    running_time
FROM audio_streams
ORDER BY created_at DESC;";

/// Data access for the catalog.
pub struct AudioService<'a, C: Connection> {
    db: &'a Surreal<C>,
}

impl<'a, C: Connection> AudioService<'a, C> {
    pub fn new(db: &'a Surreal<C>) -> Self {
        Self { db }
    }

    fn runner(&self) -> MigrationRunner<'a, C, EmbeddedMigrations<'static>> {
        MigrationRunner::new(self.db, EmbeddedMigrations::new(&CATALOG_MIGRATIONS))
    }

    /// Bring the catalog schema up to date. Returns the migrations applied.
    pub async fn migrate(&self) -> Result<Vec<String>> {
        self.runner().up().await
    }

    /// Drop the catalog schema.
    pub async fn reset(&self) -> Result<Vec<String>> {
        self.runner().down().await
    }

    /// Load a generated SurrealQL insert script in one transaction.
    pub async fn import_script(&self, script: &str) -> Result<()> {
        execute_in_transaction(self.db, script).await?;
        tracing::info!("imported archive script");
        Ok(())
    }

    /// Every recording in the catalog, newest first.
    pub async fn past_audios(&self) -> Result<Vec<AudioStream>> {
        let mut response = self
            .db
            .query(PAST_AUDIOS)
            .await
            .map_err(|e| eyre!(e.to_string()))?;
        let audios: Vec<AudioStream> = response.take(0).map_err(|e| eyre!(e.to_string()))?;
        tracing::debug!(count = audios.len(), "loaded past audios");
        Ok(audios)
    }
}
