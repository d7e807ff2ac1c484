//! Index build-or-load.
//!
//! The index lives in `<persist_dir>/index.sqlite`. When the persist
//! directory holds any entry, the stored index is loaded as-is: the corpus
//! is not read, re-embedded, or compared against what was indexed. Picking
//! up corpus edits therefore needs an explicit rebuild (`focusia index
//! --rebuild`), which clears the index first.
//!
//! # Build
//!
//! ```text
//! corpus.json ─▶ read + parse ─▶ normalize (dedup) ─▶ embed ─▶ SQLite (one transaction)
//! ```
//!
//! A failed build removes the partially written database so the next start
//! builds again.
//!
//! # Load
//!
//! Units are read in build order and materialized into an
//! [`InMemoryStore`]; similarity search runs in memory.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use focusia_core::corpus::{parse_corpus, NormalizedCorpus};
use focusia_core::embedding::{blob_to_vec, check_batch, vec_to_blob, EmbeddingProvider};
use focusia_core::models::IndexedUnit;
use focusia_core::store::memory::InMemoryStore;
use focusia_core::FocusiaError;

use crate::db;
use crate::migrate;

/// File name of the index database inside the persist directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// How the index was built, stored alongside the units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexMeta {
    pub model: String,
    pub dims: usize,
    pub unit_count: usize,
    pub corpus_path: String,
    pub built_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexOrigin {
    /// Read from an existing persist directory.
    Loaded,
    /// Built from the corpus during this call.
    Built,
}

impl fmt::Display for IndexOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOrigin::Loaded => f.write_str("loaded"),
            IndexOrigin::Built => f.write_str("built"),
        }
    }
}

/// A ready-to-query index.
pub struct Index {
    pub meta: IndexMeta,
    pub origin: IndexOrigin,
    store: Arc<InMemoryStore>,
}

impl Index {
    pub fn store(&self) -> Arc<InMemoryStore> {
        Arc::clone(&self.store)
    }

    pub fn units(&self) -> &[IndexedUnit] {
        self.store.units()
    }

    pub fn len(&self) -> usize {
        self.store.units().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn index_path(persist_dir: &Path) -> PathBuf {
    persist_dir.join(INDEX_FILE)
}

/// Whether `persist_dir` exists and contains at least one entry.
pub fn has_index(persist_dir: &Path) -> Result<bool> {
    if !persist_dir.is_dir() {
        return Ok(false);
    }
    let mut entries = std::fs::read_dir(persist_dir)
        .with_context(|| format!("Failed to read {}", persist_dir.display()))?;
    Ok(entries.next().is_some())
}

/// Load the persisted index if there is one, otherwise build it from the corpus.
pub async fn build_or_load(
    corpus_path: &Path,
    persist_dir: &Path,
    embedder: &dyn EmbeddingProvider,
) -> Result<Index> {
    if has_index(persist_dir)? {
        tracing::info!(persist_dir = %persist_dir.display(), "reusing persisted index");
        return load_index(persist_dir, embedder).await;
    }
    build_index(corpus_path, persist_dir, embedder).await
}

/// Read and validate the corpus file.
///
/// Typed errors: [`FocusiaError::CorpusNotFound`] for a missing file,
/// [`FocusiaError::CorpusFormat`] for invalid JSON or a non-list top level,
/// [`FocusiaError::EmptyCorpus`] when no row survives normalization.
pub fn read_corpus(corpus_path: &Path) -> Result<NormalizedCorpus> {
    let path_str = corpus_path.display().to_string();
    if !corpus_path.is_file() {
        return Err(FocusiaError::CorpusNotFound(path_str).into());
    }

    let content = std::fs::read_to_string(corpus_path)
        .with_context(|| format!("Failed to read corpus file: {}", path_str))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| FocusiaError::CorpusFormat {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;
    if !value.is_array() {
        return Err(FocusiaError::CorpusFormat {
            path: path_str,
            reason: "top-level value is not a list".to_string(),
        }
        .into());
    }

    let corpus = parse_corpus(&value)?;
    tracing::info!(
        rows = corpus.stats.rows,
        skipped = corpus.stats.skipped,
        duplicates = corpus.stats.duplicates,
        units = corpus.stats.units,
        "normalized corpus"
    );
    Ok(corpus)
}

/// Build the index from scratch and persist it.
pub async fn build_index(
    corpus_path: &Path,
    persist_dir: &Path,
    embedder: &dyn EmbeddingProvider,
) -> Result<Index> {
    let corpus = read_corpus(corpus_path)?;

    let texts: Vec<String> = corpus.units.iter().map(|u| u.text.clone()).collect();
    let vectors = embedder
        .embed(&texts)
        .await
        .with_context(|| format!("Failed to embed corpus with '{}'", embedder.model_name()))?;
    check_batch(embedder, texts.len(), &vectors)?;

    let units: Vec<IndexedUnit> = corpus
        .units
        .into_iter()
        .zip(vectors)
        .map(|(draft, vec)| IndexedUnit::from_draft(draft, vec))
        .collect();

    let meta = IndexMeta {
        model: embedder.model_name().to_string(),
        dims: embedder.dims(),
        unit_count: units.len(),
        corpus_path: corpus_path.display().to_string(),
        built_at: chrono::Utc::now().to_rfc3339(),
    };

    std::fs::create_dir_all(persist_dir)
        .with_context(|| format!("Failed to create {}", persist_dir.display()))?;
    let db_path = index_path(persist_dir);
    if let Err(e) = persist(&db_path, &meta, &units).await {
        remove_index_files(persist_dir);
        return Err(e.context(format!("Failed to write index to {}", db_path.display())));
    }

    tracing::info!(
        units = meta.unit_count,
        model = %meta.model,
        dims = meta.dims,
        path = %db_path.display(),
        "index built"
    );

    Ok(Index {
        meta,
        origin: IndexOrigin::Built,
        store: Arc::new(InMemoryStore::new(units)),
    })
}

async fn persist(db_path: &Path, meta: &IndexMeta, units: &[IndexedUnit]) -> Result<()> {
    let pool = db::connect(db_path).await?;
    let result = write_units(&pool, meta, units).await;
    pool.close().await;
    result
}

async fn write_units(pool: &SqlitePool, meta: &IndexMeta, units: &[IndexedUnit]) -> Result<()> {
    migrate::run_migrations(pool).await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO index_meta (id, model, dims, unit_count, corpus_path, built_at)
         VALUES (1, ?, ?, ?, ?, ?)",
    )
    .bind(&meta.model)
    .bind(meta.dims as i64)
    .bind(meta.unit_count as i64)
    .bind(&meta.corpus_path)
    .bind(&meta.built_at)
    .execute(&mut *tx)
    .await?;

    for (position, unit) in units.iter().enumerate() {
        sqlx::query(
            "INSERT INTO units (position, id, topic, text, embedding) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(position as i64)
        .bind(&unit.id)
        .bind(&unit.topic)
        .bind(&unit.text)
        .bind(vec_to_blob(&unit.embedding))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load a persisted index without touching the corpus.
///
/// Fails when the stored vectors have a different width than `embedder`
/// produces; a different model name with the same width only warns.
pub async fn load_index(persist_dir: &Path, embedder: &dyn EmbeddingProvider) -> Result<Index> {
    let db_path = index_path(persist_dir);
    if !db_path.is_file() {
        bail!(
            "{} is not empty but has no {}; clear it or run `focusia index --rebuild`",
            persist_dir.display(),
            INDEX_FILE
        );
    }

    let pool = db::connect(&db_path).await?;
    let loaded = read_units(&pool).await;
    pool.close().await;
    let (meta, units) =
        loaded.with_context(|| format!("Failed to load index from {}", db_path.display()))?;

    if meta.dims != embedder.dims() {
        bail!(
            "Index at {} has {}-dim vectors from '{}', but the configured embedder '{}' produces {}; \
             run `focusia index --rebuild`",
            db_path.display(),
            meta.dims,
            meta.model,
            embedder.model_name(),
            embedder.dims()
        );
    }
    if meta.model != embedder.model_name() {
        tracing::warn!(
            indexed_with = %meta.model,
            configured = embedder.model_name(),
            "index was built with a different embedding model"
        );
    }

    tracing::info!(units = units.len(), built_at = %meta.built_at, "index loaded");

    Ok(Index {
        meta,
        origin: IndexOrigin::Loaded,
        store: Arc::new(InMemoryStore::new(units)),
    })
}

async fn read_units(pool: &SqlitePool) -> Result<(IndexMeta, Vec<IndexedUnit>)> {
    let row = sqlx::query(
        "SELECT model, dims, unit_count, corpus_path, built_at FROM index_meta WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| anyhow::anyhow!("index metadata is missing"))?;

    let meta = IndexMeta {
        model: row.get("model"),
        dims: row.get::<i64, _>("dims") as usize,
        unit_count: row.get::<i64, _>("unit_count") as usize,
        corpus_path: row.get("corpus_path"),
        built_at: row.get("built_at"),
    };

    let rows = sqlx::query("SELECT id, topic, text, embedding FROM units ORDER BY position")
        .fetch_all(pool)
        .await?;

    let units: Vec<IndexedUnit> = rows
        .iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            IndexedUnit {
                id: row.get("id"),
                topic: row.get("topic"),
                text: row.get("text"),
                embedding: blob_to_vec(&blob),
            }
        })
        .collect();

    if units.len() != meta.unit_count {
        bail!(
            "index metadata lists {} units but {} are stored",
            meta.unit_count,
            units.len()
        );
    }

    Ok((meta, units))
}

/// Remove the index so the next [`build_or_load`] rebuilds.
///
/// Only files this module writes are deleted. If anything else is left in
/// `persist_dir` the call fails instead of deleting it.
pub fn clear_index(persist_dir: &Path) -> Result<()> {
    if !persist_dir.exists() {
        return Ok(());
    }
    remove_index_files(persist_dir);

    let leftovers: Vec<String> = std::fs::read_dir(persist_dir)
        .with_context(|| format!("Failed to read {}", persist_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    if !leftovers.is_empty() {
        bail!(
            "{} still contains {}; remove them manually to rebuild",
            persist_dir.display(),
            leftovers.join(", ")
        );
    }

    std::fs::remove_dir(persist_dir)
        .with_context(|| format!("Failed to remove {}", persist_dir.display()))?;
    tracing::info!(persist_dir = %persist_dir.display(), "index cleared");
    Ok(())
}

fn remove_index_files(persist_dir: &Path) {
    for name in [
        INDEX_FILE.to_string(),
        format!("{}-journal", INDEX_FILE),
        format!("{}-wal", INDEX_FILE),
        format!("{}-shm", INDEX_FILE),
    ] {
        let path = persist_dir.join(name);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove index file");
            }
        }
    }
}
