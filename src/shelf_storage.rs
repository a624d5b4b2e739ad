//! Persistence adapters for the shelf collection.
//!
//! The whole [`Collection`] is stored as a single JSON value under a fixed
//! key. A missing or unparseable value yields an empty collection,
//! indistinguishable from a first run. A failed read is an error: treating it
//! as empty would let the next write-through overwrite the stored catalog.

use std::fs;
use std::path::{Path, PathBuf};

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};

use crate::catalog_error::{CatalogError, CatalogResult};
use crate::config::CatalogConfig;
use crate::shelf_model::Collection;

/// Name of the LMDB sub-database holding the catalog value.
const SHELF_DB_NAME: &str = "shelves";

/// Durable home of the serialized collection.
pub trait ShelfStorage {
    /// Returns the stored collection, or an empty one when nothing is stored
    /// or the stored value is corrupt. Fails only when the store itself
    /// cannot be read.
    fn try_load(&self) -> CatalogResult<Collection>;

    /// Like [`try_load`](ShelfStorage::try_load), with read failures also
    /// reported as an empty collection.
    fn load(&self) -> Collection {
        self.try_load().unwrap_or_else(|e| {
            warn!("Could not read stored catalog: {e}");
            Collection::new()
        })
    }

    /// Serializes the full collection and overwrites the stored value.
    fn save(&mut self, collection: &Collection) -> CatalogResult<()>;
}

/// Serializes a collection into its persisted JSON form.
pub fn encode_collection(collection: &Collection) -> CatalogResult<String> {
    Ok(serde_json::to_string(collection)?)
}

/// Parses a persisted value, treating any corruption as an empty collection.
pub fn decode_collection(raw: &[u8]) -> Collection {
    let collection: Collection = match serde_json::from_slice(raw) {
        Ok(collection) => collection,
        Err(e) => {
            warn!("Stored catalog is not valid JSON, starting fresh: {e}");
            return Collection::new();
        }
    };

    match collection.validate() {
        Ok(()) => collection,
        Err(e) => {
            warn!("Stored catalog violates invariants, starting fresh: {e}");
            Collection::new()
        }
    }
}

/// LMDB-backed storage: one environment directory, one value.
pub struct LmdbStorage {
    env: Option<Environment>,
    db: Database,
    path: PathBuf,
    key: String,
}

impl LmdbStorage {
    /// Opens (or creates) the environment at `<name>.lmdb`.
    pub fn open(name: impl AsRef<Path>, config: &CatalogConfig) -> CatalogResult<Self> {
        let mut dir = name.as_ref().as_os_str().to_owned();
        dir.push(".lmdb");
        let path = PathBuf::from(dir);

        fs::create_dir_all(&path)?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(config.map_size)
            .open(&path)?;
        let db = env.create_db(Some(SHELF_DB_NAME), DatabaseFlags::empty())?;

        info!("Opened catalog storage at {}", path.display());

        Ok(Self {
            env: Some(env),
            db,
            path,
            key: config.storage_key.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.env.is_some()
    }

    /// Removes the stored value; the next load returns an empty collection.
    pub fn clear(&mut self) -> CatalogResult<()> {
        let env = self.env()?;
        let mut txn = env.begin_rw_txn()?;
        match txn.del(self.db, &self.key, None) {
            Ok(()) | Err(lmdb::Error::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        txn.commit()?;
        info!("Cleared catalog storage at {}", self.path.display());
        Ok(())
    }

    /// Closes the environment. Later reads and writes fail with `Storage`.
    pub fn close(&mut self) -> CatalogResult<()> {
        if let Some(env) = self.env.take() {
            env.sync(true)?;
            info!("Closed catalog storage at {}", self.path.display());
        }
        Ok(())
    }

    fn env(&self) -> CatalogResult<&Environment> {
        self.env
            .as_ref()
            .ok_or_else(|| CatalogError::Storage("Storage is closed".to_string()))
    }

    fn read_raw(&self) -> CatalogResult<Option<Vec<u8>>> {
        let env = self.env()?;
        let txn = env.begin_ro_txn()?;
        let raw = match txn.get(self.db, &self.key) {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        txn.abort();
        Ok(raw)
    }
}

impl ShelfStorage for LmdbStorage {
    fn try_load(&self) -> CatalogResult<Collection> {
        match self.read_raw()? {
            Some(raw) => Ok(decode_collection(&raw)),
            None => {
                debug!("No stored catalog under key '{}'", self.key);
                Ok(Collection::new())
            }
        }
    }

    fn save(&mut self, collection: &Collection) -> CatalogResult<()> {
        let json = encode_collection(collection)?;
        let env = self.env()?;
        let mut txn = env.begin_rw_txn()?;
        txn.put(self.db, &self.key, &json, WriteFlags::empty())?;
        txn.commit()?;
        debug!(
            "Saved catalog: {} shelves, {} bytes",
            collection.len(),
            json.len()
        );
        Ok(())
    }
}

/// Storage that keeps the serialized value in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    raw: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an arbitrary stored value, as if written by an earlier session.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { raw: Some(raw.into()) }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn set_raw(&mut self, raw: impl Into<String>) {
        self.raw = Some(raw.into());
    }
}

impl ShelfStorage for MemoryStorage {
    fn try_load(&self) -> CatalogResult<Collection> {
        Ok(match &self.raw {
            Some(raw) => decode_collection(raw.as_bytes()),
            None => Collection::new(),
        })
    }

    fn save(&mut self, collection: &Collection) -> CatalogResult<()> {
        self.raw = Some(encode_collection(collection)?);
        Ok(())
    }
}
