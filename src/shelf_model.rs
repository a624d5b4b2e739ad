//! Data model definitions for the shelf catalog.
//!
//! A [`Collection`] is an ordered list of [`Shelf`]s, each holding an ordered
//! list of [`Book`]s. The whole collection is persisted as one JSON value:
//!
//! ```json
//! [
//!   { "name": "read", "books": [ { "id": 1718000000000, "src": "data:image/jpeg;base64,..." } ] }
//! ]
//! ```
//!
//! Shelf identity is its lowercase name. Book identity is a timestamp-derived
//! id, unique within its shelf.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::catalog_error::{CatalogError, CatalogResult};

/// Prefix every stored image carries.
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// A normalized shelf name: trimmed and lowercased, never empty.
///
/// ```rust
/// use shelf_core::shelf_model::ShelfName;
///
/// let name = ShelfName::parse("  Wishlist ")?;
/// assert_eq!(name.as_str(), "wishlist");
/// assert!(ShelfName::parse("   ").is_err());
/// # Ok::<(), shelf_core::catalog_error::CatalogError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShelfName(String);

impl ShelfName {
    pub fn parse(raw: &str) -> CatalogResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::InvalidName);
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ShelfName {
    type Error = CatalogError;

    fn try_from(raw: String) -> CatalogResult<Self> {
        ShelfName::parse(&raw)
    }
}

impl From<ShelfName> for String {
    fn from(name: ShelfName) -> Self {
        name.0
    }
}

impl Display for ShelfName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base64-encoded image data, normally a JPEG data URI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    /// Encodes raw JPEG bytes as a `data:image/jpeg;base64,` URI.
    pub fn from_jpeg_bytes(bytes: &[u8]) -> Self {
        Self(format!(
            "{JPEG_DATA_URI_PREFIX}{}",
            general_purpose::STANDARD.encode(bytes)
        ))
    }

    /// True when there is no image payload at all.
    pub fn is_empty(&self) -> bool {
        self.payload().trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Decodes the base64 payload that follows the data URI header.
    pub fn decode_bytes(&self) -> CatalogResult<Vec<u8>> {
        general_purpose::STANDARD
            .decode(self.payload())
            .map_err(|e| CatalogError::Serialization(format!("Invalid base64 image data: {e}")))
    }

    fn payload(&self) -> &str {
        match self.0.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => &self.0,
        }
    }
}

/// A single stored image record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Creation-timestamp-derived id in milliseconds, unique within its shelf.
    pub id: u64,
    pub src: EncodedImage,
}

/// A named group of books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shelf {
    pub name: ShelfName,
    #[serde(default)]
    pub books: Vec<Book>,
}

impl Shelf {
    pub fn new(name: ShelfName) -> Self {
        Self { name, books: Vec::new() }
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn book(&self, id: u64) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    /// Position of a book within this shelf, zero-based.
    pub fn position_of(&self, id: u64) -> Option<usize> {
        self.books.iter().position(|book| book.id == id)
    }

    /// Next id for a book created at `now_millis`.
    ///
    /// Ids are strictly increasing within a shelf, so two books created in
    /// the same millisecond still get distinct ids. `None` once the shelf
    /// already holds `u64::MAX`.
    pub fn next_book_id(&self, now_millis: u64) -> Option<u64> {
        match self.books.iter().map(|book| book.id).max() {
            Some(last) if last >= now_millis => last.checked_add(1),
            _ => Some(now_millis),
        }
    }
}

/// Every shelf in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    pub shelves: Vec<Shelf>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.shelves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shelves.len()
    }

    pub fn shelf(&self, name: &ShelfName) -> Option<&Shelf> {
        self.shelves.iter().find(|shelf| &shelf.name == name)
    }

    pub fn shelf_mut(&mut self, name: &ShelfName) -> Option<&mut Shelf> {
        self.shelves.iter_mut().find(|shelf| &shelf.name == name)
    }

    pub fn book_total(&self) -> usize {
        self.shelves.iter().map(Shelf::book_count).sum()
    }

    /// Checks the invariants a freshly parsed collection must satisfy.
    ///
    /// Shelf names are normalized while parsing; they must also be unique,
    /// and book ids unique within each shelf.
    pub fn validate(&self) -> CatalogResult<()> {
        let mut names = HashSet::new();
        for shelf in &self.shelves {
            if !names.insert(shelf.name.as_str()) {
                return Err(CatalogError::Serialization(format!(
                    "Duplicate shelf '{}'",
                    shelf.name
                )));
            }
            let mut ids = HashSet::new();
            if let Some(book) = shelf.books.iter().find(|book| !ids.insert(book.id)) {
                return Err(CatalogError::Serialization(format!(
                    "Duplicate book id {} in shelf '{}'",
                    book.id, shelf.name
                )));
            }
        }
        Ok(())
    }
}

/// Reference to a shelf held by callers between operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShelfRef {
    pub name: ShelfName,
}

/// Reference to a book: its shelf plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookRef {
    pub shelf: ShelfName,
    pub id: u64,
}
