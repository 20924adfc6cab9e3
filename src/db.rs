use crate::config::Config;
use crate::error::ApiResult;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;
use tokio::sync::{Mutex, MutexGuard};

pub const IN_MEMORY: &str = ":memory:";

const MIGRATIONS_TABLE: &str = include_str!("migrations/system/000_migrations_table.sql");

const MIGRATIONS: &[(&str, &str)] = &[("001_books.sql", include_str!("migrations/001_books.sql"))];

fn all_migrations() -> impl Iterator<Item = &'static (&'static str, &'static str)> {
    MIGRATIONS
        .iter()
        .chain(crate::inventory::migrations())
        .chain(crate::school::migrations())
}

/// Shared storage handle. All access goes through one connection, and
/// `tx_lock` serializes operations so a transaction is never interleaved with
/// another request's statements.
pub struct Database {
    _db: LibsqlDatabase,
    conn: Connection,
    tx_lock: Mutex<()>,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs every migration whose name is not yet in `_migrations`, in the
    /// given order, and records it. Returns the number applied.
    async fn apply_migrations<'m>(
        conn: &Connection,
        migrations: impl IntoIterator<Item = &'m (&'m str, &'m str)>,
    ) -> Result<usize> {
        let mut applied = 0;
        for (name, sql) in migrations {
            let mut seen = conn
                .query("SELECT 1 FROM _migrations WHERE name = ?", libsql::params![*name])
                .await?;
            if seen.next().await?.is_some() {
                tracing::debug!(migration = name, "already applied");
                continue;
            }

            tracing::info!(migration = name, "applying migration");
            conn.execute_batch(sql)
                .await
                .with_context(|| format!("migration {name} failed"))?;
            conn.execute(
                "INSERT INTO _migrations (name, applied_at) VALUES (?, ?)",
                libsql::params![*name, format_timestamp(&Utc::now())],
            )
            .await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Opens the database named in the config. A relative file name is
    /// resolved against `data_dir`; `:memory:` is passed through.
    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let name = cfg.app.get_db();
        if name == IN_MEMORY {
            Self::open(IN_MEMORY).await
        } else {
            Self::open(data_dir.join(name)).await
        }
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "[db] opening local database");

        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;
        // SQLite leaves REFERENCES clauses unenforced unless asked, per connection.
        conn.execute("PRAGMA foreign_keys = ON", ()).await?;

        conn.execute_batch(MIGRATIONS_TABLE).await?;
        let applied = Self::apply_migrations(&conn, all_migrations()).await?;
        tracing::info!(applied, "[db] schema up to date");

        Ok(Database {
            _db: db,
            conn,
            tx_lock: Mutex::new(()),
        })
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.tx_lock.lock().await
    }

    /// Starts a write transaction. Callers must hold the guard from `lock`
    /// and hand the outcome to `finish`.
    pub(crate) async fn begin(&self) -> ApiResult<()> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(())
    }

    pub(crate) async fn finish<T>(&self, result: ApiResult<T>) -> ApiResult<T> {
        let result = match result {
            Ok(value) => match self.conn.execute("COMMIT", ()).await {
                Ok(_) => return Ok(value),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };

        if let Err(e) = self.conn.execute("ROLLBACK", ()).await {
            tracing::warn!("rollback failed: {}", e);
        }
        result
    }
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(raw).map_err(|e| anyhow::anyhow!("invalid timestamp {raw}: {e}"))?;
    Ok(ts.with_timezone(&Utc))
}
