//! State object handed across the FFI boundary.

use std::path::Path;

use log::info;

use crate::catalog_error::CatalogResult;
use crate::config::CatalogConfig;
use crate::shelf_storage::LmdbStorage;
use crate::shelf_store::ShelfStore;
use crate::view::ShelfController;

/// An opened catalog: the store over LMDB plus the UI state of its shelf list.
pub struct CatalogState {
    pub store: ShelfStore<LmdbStorage>,
    pub controller: ShelfController,
    pub config: CatalogConfig,
}

impl CatalogState {
    pub fn init(name: impl AsRef<Path>, config: CatalogConfig) -> CatalogResult<Self> {
        let storage = LmdbStorage::open(name, &config)?;
        Ok(Self {
            store: ShelfStore::init(storage)?,
            controller: ShelfController::new(),
            config,
        })
    }

    /// Removes every shelf from storage and memory.
    pub fn clear_all(&mut self) -> CatalogResult<()> {
        self.store.storage_mut().clear()?;
        self.store.reload()?;
        self.controller = ShelfController::new();
        Ok(())
    }

    pub fn close(&mut self) -> CatalogResult<()> {
        self.store.storage_mut().close()?;
        info!("Catalog closed");
        Ok(())
    }
}
