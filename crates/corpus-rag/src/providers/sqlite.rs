//! SQLite-backed persistent vector index
//!
//! Units are stored one row per key with the embedding as a little-endian
//! `f32` blob. Similarity is computed in process over all rows, which suits
//! corpora of up to a few hundred thousand units.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{DocumentMeta, RetrievalUnit, ScoredUnit};

use super::vector_index::{cosine_similarity, rank, VectorIndex};

/// Vector index persisted in a SQLite database file
pub struct SqliteVectorIndex {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVectorIndex {
    /// Create or open the index at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path.as_ref())
            .map_err(|e| Error::vector_index(format!("Failed to open database: {}", e)))?;

        let index = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        index.migrate()?;

        tracing::info!("Opened SQLite vector index at {}", path.as_ref().display());
        Ok(index)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::vector_index(format!("Failed to open in-memory database: {}", e)))?;

        let index = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        index.migrate()?;
        Ok(index)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
        "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS units (
                key TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                document_id TEXT NOT NULL,
                meta TEXT NOT NULL,
                order_index INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                indexed_at TEXT NOT NULL
            );
        "#,
        )?;

        Ok(())
    }

    async fn blocking<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            operation(&conn)
        })
        .await
        .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, units: &[RetrievalUnit]) -> Result<()> {
        if let Some(unit) = units.iter().find(|u| u.embedding.is_empty()) {
            return Err(Error::vector_index(format!("Unit {} has no embedding", unit.key)));
        }

        let units = units.to_vec();
        let indexed_at = chrono::Utc::now().to_rfc3339();
        self.blocking(move |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                // ON CONFLICT keeps the rowid, so a rewritten unit keeps its insertion rank
                let mut stmt = tx.prepare_cached(
                    r#"
                    INSERT INTO units (key, text, document_id, meta, order_index, embedding, indexed_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(key) DO UPDATE SET
                        text = excluded.text,
                        document_id = excluded.document_id,
                        meta = excluded.meta,
                        order_index = excluded.order_index,
                        embedding = excluded.embedding,
                        indexed_at = excluded.indexed_at
                "#,
                )?;

                for unit in &units {
                    stmt.execute(params![
                        unit.key,
                        unit.text,
                        unit.document_id,
                        serde_json::to_string(&unit.meta)?,
                        unit.order_index,
                        encode_embedding(&unit.embedding),
                        indexed_at,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredUnit>> {
        let vector = vector.to_vec();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT key, text, document_id, meta, order_index, embedding FROM units ORDER BY rowid",
            )?;

            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, Vec<u8>>(5)?,
                ))
            })?;

            let mut scored = Vec::new();
            for row in rows {
                let (key, text, document_id, meta, order_index, blob) = row?;
                let embedding = decode_embedding(&blob);
                if embedding.len() != vector.len() {
                    return Err(Error::vector_index(format!(
                        "Dimension mismatch: query has {}, unit {} has {}",
                        vector.len(),
                        key,
                        embedding.len()
                    )));
                }

                let meta: DocumentMeta = serde_json::from_str(&meta)?;
                scored.push(ScoredUnit {
                    score: cosine_similarity(&embedding, &vector),
                    unit: RetrievalUnit {
                        key,
                        text,
                        document_id,
                        meta,
                        order_index,
                        embedding,
                    },
                });
            }

            Ok(rank(scored, top_k))
        })
        .await
    }

    async fn len(&self) -> Result<usize> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM units", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
