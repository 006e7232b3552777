//! libSQL storage layer for TopicBase.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the keyed
//! artifact store (raw text, cleaned sentences, the ranked-term index, and
//! the knowledge base, all as JSON blobs) plus a history of crawl runs.
//!
//! **Access rules:**
//! - `crawl` command: read-write (sole writer) via [`Storage::open`]
//! - `terms` / `facts` commands: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use topicbase_shared::{Result, RunId, TopicBaseError};

/// Artifact key for the raw visible text of a site.
pub fn raw_text_key(site_id: usize) -> String {
    format!("site/{site_id}/raw")
}

/// Artifact key for the cleaned sentence list of a site.
pub fn clean_text_key(site_id: usize) -> String {
    format!("site/{site_id}/clean")
}

/// Artifact key for the ranked-term index.
pub const TERM_INDEX_KEY: &str = "term_index";

/// Artifact key for the knowledge base.
pub const KNOWLEDGE_BASE_KEY: &str = "knowledge_base";

/// A row from the `crawl_runs` table.
#[derive(Debug, Clone)]
pub struct CrawlRunRecord {
    pub id: String,
    pub seed_url: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub stats_json: Option<String>,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TopicBaseError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (for query commands).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    TopicBaseError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(TopicBaseError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Blob operations
    // -----------------------------------------------------------------------

    /// Upsert a raw blob under `key`.
    pub async fn put_blob(&self, key: &str, value: &[u8]) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                params![key, value.to_vec(), now.as_str()],
            )
            .await
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get the blob stored under `key`, if any.
    pub async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM blobs WHERE key = ?1", params![key])
            .await
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<Vec<u8>>(0)
                    .map_err(|e| TopicBaseError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(TopicBaseError::Storage(e.to_string())),
        }
    }

    /// Serialize `value` as JSON and store it under `key`.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| TopicBaseError::Storage(format!("serialize {key}: {e}")))?;
        self.put_blob(key, &bytes).await
    }

    /// Load and deserialize the JSON blob under `key`, if any.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_blob(key).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| TopicBaseError::Storage(format!("deserialize {key}: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Delete all blobs whose key starts with `prefix`.
    ///
    /// Used to clear `site/` artifacts from a previous run before a new
    /// crawl writes a possibly smaller working set.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        self.check_writable()?;
        let pattern = format!("{prefix}%");
        let deleted = self
            .conn
            .execute(
                "DELETE FROM blobs WHERE key LIKE ?1",
                params![pattern.as_str()],
            )
            .await
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Crawl run operations
    // -----------------------------------------------------------------------

    /// Record the start of a crawl run.
    pub async fn insert_crawl_run(&self, id: &RunId, seed_url: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO crawl_runs (id, seed_url, started_at) VALUES (?1, ?2, ?3)",
                params![id.to_string(), seed_url, now.as_str()],
            )
            .await
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Mark a crawl run finished and attach its stats.
    pub async fn finish_crawl_run(&self, id: &RunId, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE crawl_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, id.to_string()],
            )
            .await
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;
        Ok(())
    }

    /// The most recently started crawl run, if any.
    pub async fn latest_run(&self) -> Result<Option<CrawlRunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, seed_url, started_at, finished_at, stats_json
                 FROM crawl_runs ORDER BY started_at DESC, id DESC LIMIT 1",
                params![],
            )
            .await
            .map_err(|e| TopicBaseError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(CrawlRunRecord {
                id: row
                    .get::<String>(0)
                    .map_err(|e| TopicBaseError::Storage(e.to_string()))?,
                seed_url: row
                    .get::<String>(1)
                    .map_err(|e| TopicBaseError::Storage(e.to_string()))?,
                started_at: row
                    .get::<String>(2)
                    .map_err(|e| TopicBaseError::Storage(e.to_string()))?,
                finished_at: row.get::<String>(3).ok(),
                stats_json: row.get::<String>(4).ok(),
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(TopicBaseError::Storage(e.to_string())),
        }
    }
}
