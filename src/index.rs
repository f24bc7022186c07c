//! Persisted vector index lifecycle.
//!
//! One persisted index lives under `<artifact_dir>/<storage_dir>/` as three
//! companion files: `index_store.json` (build metadata), `docstore.json`
//! (full artifact texts), and `vector_store.json` (chunk embeddings). The
//! index is valid only when all three files are present; partial presence is
//! treated as absent and triggers a rebuild. The persisted artifact is never
//! mutated in place — a refresh rewrites all three files.
//!
//! [`IndexManager`] is the state machine over that directory:
//!
//! ```text
//! Absent ──build──▶ Loaded ◀──load── Loadable
//!                     │ ▲
//!              refresh│ │build
//!                     ▼ │
//!                   Stale
//! ```
//!
//! Load failures never propagate: a corrupt or mismatched persisted index is
//! logged and rebuilt from the artifacts. A build over zero artifacts is a
//! hard failure — no empty index is ever written.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::chunk::{chunk_text, MAX_CHUNK_CHARS};
use crate::ollama::OllamaClient;

pub const INDEX_STORE_FILE: &str = "index_store.json";
pub const DOCSTORE_FILE: &str = "docstore.json";
pub const VECTOR_STORE_FILE: &str = "vector_store.json";

/// Bumped when the companion-file layout changes; a mismatch on load
/// falls back to a rebuild.
const INDEX_FORMAT_VERSION: u32 = 1;

/// Typed failures from the index lifecycle. Callers branch on the kind;
/// the CLI layer turns them into messages and a non-zero exit.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no information to index: no .txt artifacts in {0}")]
    NoArtifacts(PathBuf),
    #[error("failed to load persisted index: {0}")]
    LoadFailed(String),
    #[error("failed to build index: {0}")]
    BuildFailed(String),
    #[error("index not initialized: refresh requires a bound model")]
    ModelUnbound,
}

/// Embedding backend seam. Production binds Ollama; tests bind a
/// deterministic fake.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// [`Embedder`] backed by Ollama's `/api/embed`.
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed(&self.model, texts).await
    }
}

// ============ Companion file records ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStore {
    pub version: u32,
    pub embedding_model: String,
    pub dims: usize,
    pub built_at: DateTime<Utc>,
    pub document_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    /// Artifact name (file stem, e.g. `memory`).
    pub name: String,
    pub text: String,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DocStore {
    pub docs: BTreeMap<String, StoredDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VectorStore {
    pub vectors: BTreeMap<String, VectorRecord>,
}

// ============ In-memory index ============

/// A loaded index: companion-file contents held in memory for querying.
pub struct VectorIndex {
    pub meta: IndexStore,
    pub docs: DocStore,
    pub vectors: VectorStore,
}

/// One retrieved chunk with its similarity score and owning artifact name.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub artifact: String,
    pub text: String,
    pub score: f32,
}

impl VectorIndex {
    pub fn document_count(&self) -> usize {
        self.docs.docs.len()
    }

    /// Top-k chunks by cosine similarity against `query_vec`.
    /// Ties break on chunk text for a deterministic order.
    pub fn top_k(&self, query_vec: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .vectors
            .vectors
            .values()
            .map(|record| {
                let artifact = self
                    .docs
                    .docs
                    .get(&record.document_id)
                    .map(|d| d.name.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                ScoredChunk {
                    artifact,
                    text: record.text.clone(),
                    score: cosine_similarity(query_vec, &record.vector),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.text.cmp(&b.text))
        });
        scored.truncate(k);
        scored
    }
}

// ============ Lifecycle manager ============

/// Where the persisted index currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// No persisted index, or an incomplete one.
    Absent,
    /// All three companion files are present on disk.
    Loadable,
    /// An in-memory index is bound to this manager.
    Loaded,
    /// Explicitly invalidated by a refresh request; rebuild pending.
    Stale,
}

/// True iff all three companion files exist under `storage_dir`.
pub fn has_persisted_index(storage_dir: &Path) -> bool {
    [INDEX_STORE_FILE, DOCSTORE_FILE, VECTOR_STORE_FILE]
        .iter()
        .all(|file| storage_dir.join(file).is_file())
}

/// List `*.txt` artifacts directly under `dir`, sorted by name.
/// Non-recursive: the storage subdirectory (and any other subdirectory)
/// is never descended into, so the index cannot index its own metadata.
pub fn artifact_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Decides whether to load, build, or rebuild the persisted index, and
/// keeps that decision consistent with the on-disk companion files.
pub struct IndexManager {
    artifact_dir: PathBuf,
    storage_dir: PathBuf,
    embedder: Box<dyn Embedder>,
    state: IndexState,
    index: Option<VectorIndex>,
}

impl IndexManager {
    pub fn new(artifact_dir: &Path, storage_dir: &Path, embedder: Box<dyn Embedder>) -> Self {
        Self {
            artifact_dir: artifact_dir.to_path_buf(),
            storage_dir: storage_dir.to_path_buf(),
            embedder,
            state: IndexState::Absent,
            index: None,
        }
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    /// The embedding backend bound to this manager (also used to embed
    /// query text, so queries and documents share one vector space).
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// On-disk state of the persisted index, ignoring any loaded copy.
    pub fn persisted_state(&self) -> IndexState {
        if has_persisted_index(&self.storage_dir) {
            IndexState::Loadable
        } else {
            IndexState::Absent
        }
    }

    /// Load the persisted index if it is valid, otherwise build a new one.
    ///
    /// A load failure of any kind (unreadable file, parse error, format or
    /// model mismatch) is logged and downgraded to the build path.
    pub async fn initialize(&mut self) -> Result<(), IndexError> {
        if self.persisted_state() == IndexState::Loadable {
            match self.load() {
                Ok(index) => {
                    println!(
                        "Loaded existing index ({} documents, built {})",
                        index.document_count(),
                        index.meta.built_at.format("%Y-%m-%d %H:%M UTC")
                    );
                    self.index = Some(index);
                    self.state = IndexState::Loaded;
                    return Ok(());
                }
                Err(e) => {
                    eprintln!("Warning: {}. Rebuilding from artifacts.", e);
                }
            }
        }

        self.build().await
    }

    /// Build a fresh index from the artifact directory and persist it,
    /// replacing any prior companion files.
    pub async fn build(&mut self) -> Result<(), IndexError> {
        let files = artifact_files(&self.artifact_dir)
            .map_err(|e| IndexError::BuildFailed(e.to_string()))?;
        if files.is_empty() {
            return Err(IndexError::NoArtifacts(self.artifact_dir.clone()));
        }

        println!("Loading {} system info files...", files.len());

        let mut docs = DocStore::default();
        let mut chunks = Vec::new();

        for path in &files {
            let text = std::fs::read_to_string(path)
                .map_err(|e| IndexError::BuildFailed(format!("{}: {}", path.display(), e)))?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let id = Uuid::new_v4().to_string();

            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            let hash = format!("{:x}", hasher.finalize());

            chunks.extend(chunk_text(&id, &text, MAX_CHUNK_CHARS));
            docs.docs.insert(
                id.clone(),
                StoredDocument {
                    id,
                    name,
                    text,
                    hash,
                },
            );
        }

        println!("Creating search index ({} chunks)...", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| IndexError::BuildFailed(e.to_string()))?;
        if vectors.len() != chunks.len() {
            return Err(IndexError::BuildFailed(format!(
                "embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        let mut vector_store = VectorStore::default();
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            vector_store.vectors.insert(
                chunk.id.clone(),
                VectorRecord {
                    document_id: chunk.document_id,
                    chunk_index: chunk.chunk_index,
                    text: chunk.text,
                    vector,
                },
            );
        }

        let meta = IndexStore {
            version: INDEX_FORMAT_VERSION,
            embedding_model: self.embedder.model_name().to_string(),
            dims,
            built_at: Utc::now(),
            document_ids: docs.docs.keys().cloned().collect(),
        };

        let index = VectorIndex {
            meta,
            docs,
            vectors: vector_store,
        };
        self.persist(&index)
            .map_err(|e| IndexError::BuildFailed(e.to_string()))?;

        println!(
            "Index built: {} documents, persisted to {}",
            index.document_count(),
            self.storage_dir.display()
        );

        self.index = Some(index);
        self.state = IndexState::Loaded;
        Ok(())
    }

    /// Force a rebuild, superseding any persisted state.
    ///
    /// Requires a prior successful [`initialize`](Self::initialize) — refresh
    /// rebinds the existing index, it does not establish the model binding.
    pub async fn refresh(&mut self) -> Result<(), IndexError> {
        if self.index.is_none() {
            return Err(IndexError::ModelUnbound);
        }
        self.state = IndexState::Stale;
        println!("Refreshing index...");
        self.build().await
    }

    fn load(&self) -> Result<VectorIndex, IndexError> {
        let meta: IndexStore = read_json(&self.storage_dir.join(INDEX_STORE_FILE))?;
        let docs: DocStore = read_json(&self.storage_dir.join(DOCSTORE_FILE))?;
        let vectors: VectorStore = read_json(&self.storage_dir.join(VECTOR_STORE_FILE))?;

        if meta.version != INDEX_FORMAT_VERSION {
            return Err(IndexError::LoadFailed(format!(
                "index format version {} (expected {})",
                meta.version, INDEX_FORMAT_VERSION
            )));
        }
        if meta.embedding_model != self.embedder.model_name() {
            return Err(IndexError::LoadFailed(format!(
                "index was built with embedding model '{}' (configured: '{}')",
                meta.embedding_model,
                self.embedder.model_name()
            )));
        }

        Ok(VectorIndex {
            meta,
            docs,
            vectors,
        })
    }

    fn persist(&self, index: &VectorIndex) -> Result<()> {
        std::fs::create_dir_all(&self.storage_dir)?;
        write_json(&self.storage_dir.join(INDEX_STORE_FILE), &index.meta)?;
        write_json(&self.storage_dir.join(DOCSTORE_FILE), &index.docs)?;
        write_json(&self.storage_dir.join(VECTOR_STORE_FILE), &index.vectors)?;
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, IndexError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| IndexError::LoadFailed(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| IndexError::LoadFailed(format!("{}: {}", path.display(), e)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Cosine similarity between two vectors. Returns `0.0` for empty or
/// mismatched-length inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
