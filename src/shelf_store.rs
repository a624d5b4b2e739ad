//! The authoritative in-memory collection with write-through persistence.
//!
//! Every mutation builds the next collection on a copy, writes it to storage
//! and only then replaces the in-memory state, so a failed write leaves the
//! store exactly as it was.
//!
//! ```rust
//! use shelf_core::shelf_store::ShelfStore;
//! use shelf_core::shelf_storage::MemoryStorage;
//! use shelf_core::shelf_model::EncodedImage;
//!
//! let mut store = ShelfStore::init(MemoryStorage::new())?;
//! let shelf = store.ensure_shelf("Read")?;
//! assert_eq!(shelf, store.ensure_shelf("read")?);
//!
//! store.add_book(&shelf, EncodedImage::from_jpeg_bytes(b"cover"))?;
//! assert_eq!(store.shelf(&shelf).map(|s| s.book_count()), Some(1));
//! # Ok::<(), shelf_core::catalog_error::CatalogError>(())
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::catalog_error::{CatalogError, CatalogResult};
use crate::shelf_model::{Book, BookRef, Collection, EncodedImage, Shelf, ShelfName, ShelfRef};
use crate::shelf_storage::ShelfStorage;

/// Source of creation timestamps, in milliseconds since the Unix epoch.
pub type Clock = fn() -> u64;

fn system_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct ShelfStore<S: ShelfStorage> {
    collection: Collection,
    storage: S,
    clock: Clock,
}

impl<S: ShelfStorage> ShelfStore<S> {
    /// Loads the persisted collection and takes ownership of the storage.
    ///
    /// Fails when the storage cannot be read, so a store never starts empty
    /// over a catalog it could not see.
    pub fn init(storage: S) -> CatalogResult<Self> {
        Self::with_clock(storage, system_clock)
    }

    pub fn with_clock(storage: S, clock: Clock) -> CatalogResult<Self> {
        let collection = storage.try_load()?;
        info!(
            "Shelf store ready: {} shelves, {} books",
            collection.len(),
            collection.book_total()
        );
        Ok(Self { collection, storage, clock })
    }

    /// Returns the shelf named `name` (case-insensitive), creating it if needed.
    pub fn ensure_shelf(&mut self, name: &str) -> CatalogResult<ShelfRef> {
        let name = ShelfName::parse(name)?;

        if self.collection.shelf(&name).is_some() {
            return Ok(ShelfRef { name });
        }

        let mut next = self.collection.clone();
        next.shelves.push(Shelf::new(name.clone()));
        self.write_through(next)?;

        info!("Created shelf '{name}'");
        Ok(ShelfRef { name })
    }

    /// Appends a book holding `image` to the end of the shelf.
    pub fn add_book(&mut self, shelf: &ShelfRef, image: EncodedImage) -> CatalogResult<BookRef> {
        if image.is_empty() {
            return Err(CatalogError::MissingImage);
        }

        let mut next = self.collection.clone();
        let target = next
            .shelf_mut(&shelf.name)
            .ok_or_else(|| CatalogError::UnknownShelf(shelf.name.to_string()))?;
        let id = target.next_book_id((self.clock)()).ok_or_else(|| {
            CatalogError::Serialization(format!("Book id space exhausted on shelf '{}'", shelf.name))
        })?;
        target.books.push(Book { id, src: image });
        self.write_through(next)?;

        debug!("Added book {id} to shelf '{}'", shelf.name);
        Ok(BookRef { shelf: shelf.name.clone(), id })
    }

    /// Removes the shelf and every book on it. Callers confirm with the user first.
    pub fn delete_shelf(&mut self, shelf: &ShelfRef) -> CatalogResult<()> {
        if self.collection.shelf(&shelf.name).is_none() {
            return Err(CatalogError::UnknownShelf(shelf.name.to_string()));
        }

        let mut next = self.collection.clone();
        next.shelves.retain(|s| s.name != shelf.name);
        self.write_through(next)?;

        info!("Deleted shelf '{}'", shelf.name);
        Ok(())
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn shelf(&self, shelf: &ShelfRef) -> Option<&Shelf> {
        self.collection.shelf(&shelf.name)
    }

    /// Looks a shelf up by user-entered name without creating it.
    pub fn find_shelf(&self, name: &str) -> Option<ShelfRef> {
        let name = ShelfName::parse(name).ok()?;
        self.collection.shelf(&name).map(|_| ShelfRef { name })
    }

    pub fn book(&self, book: &BookRef) -> Option<&Book> {
        self.collection.shelf(&book.shelf)?.book(book.id)
    }

    /// Shelf names in creation order.
    pub fn shelf_names(&self) -> Vec<String> {
        self.collection
            .shelves
            .iter()
            .map(|shelf| shelf.name.to_string())
            .collect()
    }

    /// Names for the shelf picker: existing shelves first, then any default
    /// not yet created.
    pub fn shelf_suggestions(&self, defaults: &[String]) -> Vec<String> {
        let mut names = self.shelf_names();
        for default in defaults {
            if let Ok(name) = ShelfName::parse(default) {
                if !names.iter().any(|n| n == name.as_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Re-reads the persisted collection, discarding in-memory state.
    /// On a read failure the in-memory state is kept.
    pub fn reload(&mut self) -> CatalogResult<()> {
        self.collection = self.storage.try_load()?;
        Ok(())
    }

    fn write_through(&mut self, next: Collection) -> CatalogResult<()> {
        self.storage.save(&next)?;
        self.collection = next;
        Ok(())
    }
}
