//! libSQL-backed [`VectorStore`] (embedded, offline).
//!
//! Documents and their embeddings live in a single local database file.
//! Similarity search loads the collection's vectors and ranks them in
//! process with cosine similarity.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_shared::{
    BeaconError, Document, DocumentId, DocumentMeta, Result, ScoredDocument, content_hash,
};
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{debug, info, instrument, warn};

use crate::embedding::{Embedder, blob_to_vec, cosine_similarity, vec_to_blob};
use crate::{MetadataFilter, VectorStore, migrations, rank_top_k};

fn storage_err(e: impl std::fmt::Display) -> BeaconError {
    BeaconError::Storage(e.to_string())
}

/// Durable corpus store wrapping a libSQL database.
pub struct LibsqlStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl LibsqlStore {
    /// Open or create the database at `path` and get-or-create `collection`.
    pub async fn open(
        path: &Path,
        collection: &str,
        description: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BeaconError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let store = Self {
            db,
            conn,
            collection: collection.to_string(),
            embedder,
        };
        store.run_migrations().await?;
        store.ensure_collection(description).await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    BeaconError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 on a fresh database.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    async fn ensure_collection(&self, description: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let inserted = self
            .conn
            .execute(
                "INSERT INTO collections (name, description, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO NOTHING",
                params![self.collection.as_str(), description, now.as_str()],
            )
            .await
            .map_err(storage_err)?;

        if inserted > 0 {
            info!(collection = %self.collection, "created collection");
        } else {
            debug!(collection = %self.collection, "using existing collection");
        }
        Ok(())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder
            .embed(&[text.to_string()])
            .await
            .map_err(|e| BeaconError::Storage(format!("embedding failed: {e}")))?
            .into_iter()
            .next()
            .ok_or_else(|| BeaconError::Storage("embedder returned no query vector".into()))
    }
}

#[async_trait]
impl VectorStore for LibsqlStore {
    #[instrument(skip_all, fields(collection = %self.collection))]
    async fn get_metadata(&self, filter: &MetadataFilter) -> Result<Vec<DocumentMeta>> {
        let mut rows = match &filter.url {
            Some(url) => self
                .conn
                .query(
                    "SELECT id, url, ingested_at FROM documents
                     WHERE collection = ?1 AND url = ?2",
                    params![self.collection.as_str(), url.as_str()],
                )
                .await,
            None => self
                .conn
                .query(
                    "SELECT id, url, ingested_at FROM documents WHERE collection = ?1",
                    params![self.collection.as_str()],
                )
                .await,
        }
        .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(DocumentMeta {
                id: parse_id(&row.get::<String>(0).map_err(storage_err)?)?,
                url: row.get::<String>(1).map_err(storage_err)?,
                ingested_at: parse_timestamp(&row.get::<String>(2).map_err(storage_err)?)?,
            });
        }
        Ok(results)
    }

    #[instrument(skip_all, fields(collection = %self.collection, documents = documents.len()))]
    async fn add(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| BeaconError::Storage(format!("embedding failed: {e}")))?;

        if vectors.len() != documents.len() {
            return Err(BeaconError::Storage(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let tx = self.conn.transaction().await.map_err(storage_err)?;
        let model = self.embedder.model();

        for (doc, vector) in documents.iter().zip(&vectors) {
            let inserted = tx
                .execute(
                    "INSERT INTO documents
                       (id, collection, url, text, content_hash, ingested_at, embedding_model, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        doc.id.to_string(),
                        self.collection.as_str(),
                        doc.url.as_str(),
                        doc.text.as_str(),
                        content_hash(&doc.text),
                        doc.ingested_at.to_rfc3339(),
                        model,
                        vec_to_blob(vector),
                    ],
                )
                .await;

            if let Err(e) = inserted {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                return Err(storage_err(e));
            }
        }

        tx.commit().await.map_err(storage_err)?;
        debug!("batch committed");
        Ok(())
    }

    #[instrument(skip_all, fields(collection = %self.collection, k = k))]
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        let query_vec = self.embed_one(text).await?;

        let mut rows = self
            .conn
            .query(
                "SELECT id, url, text, ingested_at, embedding FROM documents WHERE collection = ?1",
                params![self.collection.as_str()],
            )
            .await
            .map_err(storage_err)?;

        let mut scored = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let blob: Vec<u8> = row.get(4).map_err(storage_err)?;
            scored.push(ScoredDocument {
                document: Document {
                    id: parse_id(&row.get::<String>(0).map_err(storage_err)?)?,
                    url: row.get::<String>(1).map_err(storage_err)?,
                    text: row.get::<String>(2).map_err(storage_err)?,
                    ingested_at: parse_timestamp(&row.get::<String>(3).map_err(storage_err)?)?,
                },
                similarity: cosine_similarity(&query_vec, &blob_to_vec(&blob)),
            });
        }

        Ok(rank_top_k(scored, k))
    }

    async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![self.collection.as_str()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(storage_err)? as u64),
            None => Ok(0),
        }
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

fn parse_id(raw: &str) -> Result<DocumentId> {
    raw.parse()
        .map_err(|e| BeaconError::Storage(format!("invalid document id '{raw}': {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BeaconError::Storage(format!("invalid date: {e}")))
}
