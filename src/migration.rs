use eyre::{Result, eyre};
use include_dir::Dir;
use serde::{Deserialize, Serialize};
use std::path::Path;
use surrealdb::{Connection, RecordId, Surreal};

const FAILED_TRANSACTION: &str = "The query was not executed due to a failed transaction";

/// A migration found in a [`MigrationSource`].
#[derive(Debug, Clone)]
pub struct Migration {
    /// Directory name, e.g. `000_create_audio_streams`.
    pub name: String,
}

/// A row of the `migrations` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: RecordId,
    pub name: String,
}

/// Somewhere migrations can be read from. `list()` returns them in the
/// order they must be applied.
pub trait MigrationSource {
    fn list(&self) -> Result<Vec<Migration>>;

    fn get_up(&self, migration: &Migration) -> Result<String>;

    fn get_down(&self, migration: &Migration) -> Result<String>;
}

/// Migrations compiled into the binary with `include_dir`.
///
/// Each migration is a directory holding `up.surql` and `down.surql`. Loose
/// files and entries whose names do not start with an ASCII digit are
/// ignored.
pub struct EmbeddedMigrations<'a> {
    source: &'a Dir<'a>,
}

impl<'a> EmbeddedMigrations<'a> {
    pub fn new(source: &'a Dir<'a>) -> Self {
        Self { source }
    }

    fn read(&self, path: &Path) -> Result<String> {
        let file = self
            .source
            .get_file(path)
            .ok_or_else(|| eyre!("{} not found", path.display()))?;
        let content = file
            .contents_utf8()
            .ok_or_else(|| eyre!("{} is not valid UTF-8", path.display()))?;
        Ok(content.to_string())
    }
}

impl MigrationSource for EmbeddedMigrations<'_> {
    fn list(&self) -> Result<Vec<Migration>> {
        let mut migrations = Vec::new();

        for dir in self.source.dirs() {
            let name = dir
                .path()
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();

            if !name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                continue;
            }
            migrations.push(Migration { name });
        }

        migrations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(migrations)
    }

    fn get_up(&self, migration: &Migration) -> Result<String> {
        self.read(&Path::new(&migration.name).join("up.surql"))
    }

    fn get_down(&self, migration: &Migration) -> Result<String> {
        self.read(&Path::new(&migration.name).join("down.surql"))
    }
}

/// Run `sql` inside a single transaction, failing on the first statement error.
pub async fn execute_in_transaction<C: Connection>(db: &Surreal<C>, sql: &str) -> Result<()> {
    let tx_sql = format!("BEGIN TRANSACTION;\n{sql}\nCOMMIT TRANSACTION;");
    let mut response = db
        .query(&tx_sql)
        .await
        .map_err(|e| eyre!(e.to_string()))?;

    let errors = response.take_errors();
    if !errors.is_empty() {
        // every statement after the failing one reports the rollback; skip those
        let mut remaining = errors
            .into_iter()
            .map(|(index, e)| (index, e.to_string()))
            .filter(|(_, s)| !s.contains(FAILED_TRANSACTION))
            .collect::<Vec<_>>();
        remaining.sort_by_key(|(index, _)| *index);

        if let Some((_, first)) = remaining.into_iter().next() {
            eyre::bail!(first);
        }
    }
    Ok(())
}

/// Applies and reverts migrations against a SurrealDB database, keeping
/// track of applied names in the `migrations` table.
pub struct MigrationRunner<'a, C: Connection, S: MigrationSource> {
    db: &'a Surreal<C>,
    source: S,
}

impl<'a, C: Connection, S: MigrationSource> MigrationRunner<'a, C, S> {
    pub fn new(db: &'a Surreal<C>, source: S) -> Self {
        Self { db, source }
    }

    /// Apply every migration not yet recorded, in source order.
    pub async fn up(&self) -> Result<Vec<String>> {
        self.ensure_migrations_table_exists().await?;

        let applied = self.applied_migrations().await?;
        let pending = self
            .source
            .list()?
            .into_iter()
            .filter(|m| !applied.contains(&m.name))
            .collect::<Vec<_>>();

        let mut names = Vec::with_capacity(pending.len());
        for migration in pending {
            let content = self.source.get_up(&migration)?;
            execute_in_transaction(self.db, &content).await?;
            self.record_migration(&migration.name).await?;
            tracing::info!("Applied migration: {}", migration.name);
            names.push(migration.name);
        }

        Ok(names)
    }

    /// Revert applied migrations, most recent first.
    pub async fn down(&self) -> Result<Vec<String>> {
        self.ensure_migrations_table_exists().await?;

        let applied = self.applied_migrations().await?;
        let mut reverted = Vec::new();

        for migration in self.source.list()?.into_iter().rev() {
            if !applied.contains(&migration.name) {
                continue;
            }
            let content = self.source.get_down(&migration)?;
            execute_in_transaction(self.db, &content).await?;
            self.remove_migration_record(&migration.name).await?;
            tracing::info!("Reverted migration: {}", migration.name);
            reverted.push(migration.name);
        }

        Ok(reverted)
    }

    async fn ensure_migrations_table_exists(&self) -> Result<()> {
        let sql = "DEFINE TABLE IF NOT EXISTS migrations PERMISSIONS NONE;";
        self.db
            .query(sql)
            .await
            .map_err(|e| eyre!(e.to_string()))?;
        Ok(())
    }

    /// Names recorded in the `migrations` table.
    pub async fn applied_migrations(&self) -> Result<Vec<String>> {
        let records: Vec<MigrationRecord> = match self.db.select("migrations").await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("failed to select migrations: {}", e.to_string());
                return Ok(Vec::new());
            }
        };

        Ok(records
            .into_iter()
            .map(|r| r.name)
            .filter(|name| !name.is_empty())
            .collect())
    }

    async fn record_migration(&self, name: &str) -> Result<()> {
        self.db
            .query("CREATE migrations SET name = $name, applied_at = time::now()")
            .bind(("name", name.to_owned()))
            .await
            .map_err(|e| eyre!(e.to_string()))?;
        Ok(())
    }

    async fn remove_migration_record(&self, name: &str) -> Result<()> {
        self.db
            .query("DELETE FROM migrations WHERE name = $name;")
            .bind(("name", name.to_owned()))
            .await
            .map_err(|e| eyre!(e.to_string()))?;
        Ok(())
    }
}
