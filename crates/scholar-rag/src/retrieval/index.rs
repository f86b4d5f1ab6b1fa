//! SQLite chunk index with exact cosine search
//!
//! Chunks, their metadata and embeddings live in one table scoped by
//! collection. Search is a filtered scan: the metadata filter runs in SQL,
//! scoring runs in Rust.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkMetadata, DocType, MetadataFilter, RetrievalResult};

use super::similarity::{cosine_similarity, l2_norm, relevance_score};

/// Persistent chunk index
pub struct ChunkIndex {
    conn: Arc<Mutex<Connection>>,
    collection: String,
}

impl ChunkIndex {
    /// Create or open the index at the given path
    pub fn open<P: AsRef<Path>>(path: P, collection: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            Error::vector_db(format!("Failed to open vector store {}: {}", path.display(), e))
        })?;

        Self::with_connection(conn, collection.into())
    }

    /// Create an in-memory index (for tests and dry runs)
    pub fn in_memory(collection: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, collection.into())
    }

    fn with_connection(conn: Connection, collection: String) -> Result<Self> {
        let index = Self {
            conn: Arc::new(Mutex::new(conn)),
            collection,
        };
        index.migrate()?;
        Ok(index)
    }

    /// Collection this index reads and writes
    pub fn collection(&self) -> &str {
        &self.collection
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
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT NOT NULL,
                collection TEXT NOT NULL,
                content TEXT NOT NULL,
                source_file TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                subject TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                file_path TEXT NOT NULL,
                embedding BLOB NOT NULL,
                added_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_doc_type ON chunks(collection, doc_type);
            CREATE INDEX IF NOT EXISTS idx_chunks_subject ON chunks(collection, subject);
            CREATE INDEX IF NOT EXISTS idx_chunks_file ON chunks(collection, file_path);

            -- Embedding model that produced the stored vectors
            CREATE TABLE IF NOT EXISTS store_meta (
                collection TEXT PRIMARY KEY,
                embedding_model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
        "#,
        )?;

        Ok(())
    }

    /// Record the embedding model on first use, reject a different one afterwards
    pub fn ensure_model(&self, model: &str, dimensions: usize) -> Result<()> {
        let conn = self.conn.lock();

        let recorded: Option<(String, i64)> = conn
            .query_row(
                "SELECT embedding_model, dimensions FROM store_meta WHERE collection = ?1",
                params![self.collection],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match recorded {
            None => {
                conn.execute(
                    "INSERT INTO store_meta (collection, embedding_model, dimensions, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        self.collection,
                        model,
                        dimensions as i64,
                        chrono::Utc::now().to_rfc3339()
                    ],
                )?;
                Ok(())
            }
            Some((recorded_model, recorded_dims))
                if recorded_model == model && recorded_dims == dimensions as i64 =>
            {
                Ok(())
            }
            Some((recorded_model, recorded_dims)) => Err(Error::Config(format!(
                "vector store '{}' holds {}-dimension embeddings from '{}', but '{}' ({} dimensions) is configured; clear the store before switching models",
                self.collection, recorded_dims, recorded_model, model, dimensions
            ))),
        }
    }

    /// Insert or replace chunks with their embeddings in one transaction
    pub fn upsert(&self, entries: &[(Chunk, Vec<f32>)]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let added_at = chrono::Utc::now().to_rfc3339();

        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO chunks
                 (id, collection, content, source_file, doc_type, subject, page_number, file_path, embedding, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for (chunk, embedding) in entries {
                let meta = &chunk.metadata;
                stmt.execute(params![
                    chunk.id,
                    self.collection,
                    chunk.content,
                    meta.source_file,
                    meta.doc_type.as_str(),
                    meta.subject,
                    meta.page_number,
                    meta.file_path,
                    encode_embedding(embedding),
                    added_at,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Score every chunk passing the filter and return the best `k`
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let doc_type = filter.and_then(|f| f.doc_type).map(|t| t.as_str());
        let subject = filter.and_then(|f| f.subject.as_deref());
        let query_norm = l2_norm(query);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, content, source_file, doc_type, subject, page_number, file_path, embedding
             FROM chunks
             WHERE collection = ?1
               AND (?2 IS NULL OR doc_type = ?2)
               AND (?3 IS NULL OR subject = ?3)
             ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![self.collection, doc_type, subject], |row| {
            Ok(StoredRow {
                id: row.get(0)?,
                content: row.get(1)?,
                source_file: row.get(2)?,
                doc_type: row.get(3)?,
                subject: row.get(4)?,
                page_number: row.get(5)?,
                file_path: row.get(6)?,
                embedding: row.get(7)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            let row = row?;
            let Some(doc_type) = DocType::from_label(&row.doc_type) else {
                tracing::warn!("Skipping chunk {} with unknown doc type '{}'", row.id, row.doc_type);
                continue;
            };

            let embedding = decode_embedding(&row.embedding);
            if embedding.len() != query.len() {
                return Err(Error::vector_db(format!(
                    "chunk {} has {} dimensions, query has {}",
                    row.id,
                    embedding.len(),
                    query.len()
                )));
            }

            let cosine = cosine_similarity(query, &embedding, query_norm, l2_norm(&embedding));
            results.push(RetrievalResult {
                chunk: Chunk {
                    id: row.id,
                    content: row.content,
                    metadata: ChunkMetadata {
                        source_file: row.source_file,
                        doc_type,
                        subject: row.subject,
                        page_number: row.page_number,
                        file_path: row.file_path,
                    },
                },
                score: relevance_score(cosine),
            });
        }

        // Stable sort keeps insertion order among equal scores
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }

    /// Delete the chunks of one source file
    pub fn delete_file(&self, file_path: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM chunks WHERE collection = ?1 AND file_path = ?2",
            params![self.collection, file_path],
        )?;
        Ok(deleted)
    }

    /// Delete every chunk and the recorded embedding model for this collection
    pub fn clear(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM chunks WHERE collection = ?1",
            params![self.collection],
        )?;
        conn.execute(
            "DELETE FROM store_meta WHERE collection = ?1",
            params![self.collection],
        )?;
        conn.execute_batch("VACUUM;")?;
        Ok(deleted)
    }

    /// Get chunk count
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Check if empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

struct StoredRow {
    id: String,
    content: String,
    source_file: String,
    doc_type: String,
    subject: String,
    page_number: u32,
    file_path: String,
    embedding: Vec<u8>,
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
