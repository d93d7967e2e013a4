use crate::error::{Error, Result};
use crate::index::InvertedIndex;
use crate::store::Document;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const FORMAT_VERSION: u32 = 2;

const DOCUMENTS_KEY: &str = "documents";
const INDEX_KEY: &str = "search_index";
const META_KEY: &str = "meta";

/// Key-value blob storage. `put_all` must write every entry or none.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put_all(&self, entries: Vec<(&str, Vec<u8>)>) -> Result<()>;
}

/// Durable store backed by a sled tree.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }
}

impl BlobStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn put_all(&self, entries: Vec<(&str, Vec<u8>)>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for (key, value) in entries {
            batch.insert(key, value);
        }
        self.db.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }
}

/// Process-local store, for tests and throwaway engines.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().get(key).cloned())
    }

    fn put_all(&self, entries: Vec<(&str, Vec<u8>)>) -> Result<()> {
        let mut blobs = self.blobs.lock();
        for (key, value) in entries {
            blobs.insert(key.to_string(), value);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: u32,
    pub num_docs: usize,
    pub num_terms: usize,
    pub saved_at: String,
}

/// Full persisted state of an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
    pub index: InvertedIndex,
}

/// Loads and saves engine state. Every save overwrites the whole state.
pub trait Persistence {
    /// Previously saved state, or an empty snapshot when nothing was saved.
    fn load(&self) -> Result<Snapshot>;
    fn save(&self, documents: &[Document], index: &InvertedIndex) -> Result<()>;
}

/// [`Persistence`] over any [`BlobStore`]: documents and index as bincode
/// blobs, metadata as JSON, written in a single batch.
pub struct BlobPersistence<S> {
    store: S,
}

impl<S: BlobStore> BlobPersistence<S> {
    pub fn new(store: S) -> Self { Self { store } }

    pub fn store(&self) -> &S { &self.store }

    pub fn into_inner(self) -> S { self.store }

    pub fn load_meta(&self) -> Result<Option<SnapshotMeta>> {
        match self.store.get(META_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl BlobPersistence<SledStore> {
    pub fn open_sled<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(SledStore::open(path)?))
    }
}

impl<S: BlobStore> Persistence for BlobPersistence<S> {
    fn load(&self) -> Result<Snapshot> {
        let Some(meta) = self.load_meta()? else {
            return Ok(Snapshot::default());
        };
        if meta.version != FORMAT_VERSION {
            return Err(Error::IncompatibleSnapshot { found: meta.version, expected: FORMAT_VERSION });
        }
        let documents = match self.store.get(DOCUMENTS_KEY)? {
            Some(bytes) => bincode::deserialize(&bytes)?,
            None => Vec::new(),
        };
        let index = match self.store.get(INDEX_KEY)? {
            Some(bytes) => bincode::deserialize(&bytes)?,
            None => InvertedIndex::default(),
        };
        Ok(Snapshot { documents, index })
    }

    fn save(&self, documents: &[Document], index: &InvertedIndex) -> Result<()> {
        let meta = SnapshotMeta {
            version: FORMAT_VERSION,
            num_docs: documents.len(),
            num_terms: index.len(),
            saved_at: now_rfc3339(),
        };
        let entries = vec![
            (DOCUMENTS_KEY, bincode::serialize(documents)?),
            (INDEX_KEY, bincode::serialize(index)?),
            (META_KEY, serde_json::to_vec_pretty(&meta)?),
        ];
        self.store.put_all(entries)?;
        tracing::debug!(num_docs = meta.num_docs, num_terms = meta.num_terms, "saved snapshot");
        Ok(())
    }
}

impl<P: Persistence + ?Sized> Persistence for Box<P> {
    fn load(&self) -> Result<Snapshot> { (**self).load() }
    fn save(&self, documents: &[Document], index: &InvertedIndex) -> Result<()> {
        (**self).save(documents, index)
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into())
}
