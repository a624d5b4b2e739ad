//! Projection of the collection into an abstract view tree.
//!
//! [`render`] is a pure function; painting and diffing belong to the host
//! toolkit. User interaction comes back as [`ViewIntent`]s, which
//! [`ShelfController`] applies to the store.

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog_error::{CatalogError, CatalogResult};
use crate::shelf_model::{BookRef, Collection, Shelf, ShelfName, ShelfRef};
use crate::shelf_storage::ShelfStorage;
use crate::shelf_store::ShelfStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookThumbView {
    pub id: u64,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfGroupView {
    pub name: String,
    /// Header text, e.g. `read (2)`.
    pub header: String,
    pub book_count: usize,
    pub collapsed: bool,
    pub books: Vec<BookThumbView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShelfListView {
    pub shelves: Vec<ShelfGroupView>,
}

/// Full-size viewer for one book, with its place in the shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageViewerView {
    pub shelf: String,
    pub book_id: u64,
    pub src: String,
    /// One-based.
    pub index: usize,
    pub total: usize,
    /// `index / total`, e.g. `2 / 5`.
    pub position: String,
}

/// UI-only state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewState {
    collapsed: BTreeSet<ShelfName>,
}

impl ViewState {
    pub fn is_collapsed(&self, shelf: &ShelfName) -> bool {
        self.collapsed.contains(shelf)
    }

    /// Flips the collapse flag and returns the new value.
    pub fn toggle(&mut self, shelf: &ShelfName) -> bool {
        if self.collapsed.remove(shelf) {
            false
        } else {
            self.collapsed.insert(shelf.clone());
            true
        }
    }

    /// Drops UI state for a shelf that no longer exists.
    pub fn forget(&mut self, shelf: &ShelfName) {
        self.collapsed.remove(shelf);
    }
}

pub fn render(collection: &Collection, state: &ViewState) -> ShelfListView {
    ShelfListView {
        shelves: collection
            .shelves
            .iter()
            .map(|shelf| render_shelf(shelf, state))
            .collect(),
    }
}

fn render_shelf(shelf: &Shelf, state: &ViewState) -> ShelfGroupView {
    ShelfGroupView {
        name: shelf.name.to_string(),
        header: format!("{} ({})", shelf.name, shelf.book_count()),
        book_count: shelf.book_count(),
        collapsed: state.is_collapsed(&shelf.name),
        books: shelf
            .books
            .iter()
            .map(|book| BookThumbView {
                id: book.id,
                src: book.src.as_str().to_string(),
            })
            .collect(),
    }
}

pub fn delete_confirmation_message(shelf: &ShelfName) -> String {
    format!("Delete shelf \"{shelf}\" and all its books?")
}

/// Host-provided yes/no prompt used before destructive actions.
pub trait ConfirmPrompt {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> ConfirmPrompt for F {
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewIntent {
    ToggleCollapse { shelf: ShelfRef },
    RequestDeleteShelf { shelf: ShelfRef },
    RequestViewImage { book: BookRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewOutcome {
    /// State changed; repaint with this tree.
    Rerender(ShelfListView),
    /// Nothing changed, e.g. the user declined a deletion.
    Unchanged,
    OpenViewer(ImageViewerView),
}

/// Owns the UI state and routes intents to the store.
#[derive(Debug, Default)]
pub struct ShelfController {
    view_state: ViewState,
}

impl ShelfController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    /// Renders the store's current collection. Call on load and after every mutation.
    pub fn render<S: ShelfStorage>(&self, store: &ShelfStore<S>) -> ShelfListView {
        render(store.collection(), &self.view_state)
    }

    pub fn handle<S: ShelfStorage, P: ConfirmPrompt>(
        &mut self,
        intent: ViewIntent,
        store: &mut ShelfStore<S>,
        prompt: &mut P,
    ) -> CatalogResult<ViewOutcome> {
        match intent {
            ViewIntent::ToggleCollapse { shelf } => {
                ensure_exists(store, &shelf)?;
                let collapsed = self.view_state.toggle(&shelf.name);
                debug!("Shelf '{}' collapsed: {collapsed}", shelf.name);
                Ok(ViewOutcome::Rerender(self.render(store)))
            }
            ViewIntent::RequestDeleteShelf { shelf } => {
                ensure_exists(store, &shelf)?;
                if !prompt.confirm(&delete_confirmation_message(&shelf.name)) {
                    debug!("Deletion of shelf '{}' declined", shelf.name);
                    return Ok(ViewOutcome::Unchanged);
                }
                store.delete_shelf(&shelf)?;
                self.view_state.forget(&shelf.name);
                Ok(ViewOutcome::Rerender(self.render(store)))
            }
            ViewIntent::RequestViewImage { book } => {
                open_viewer(store.collection(), &book).map(ViewOutcome::OpenViewer)
            }
        }
    }
}

fn ensure_exists<S: ShelfStorage>(store: &ShelfStore<S>, shelf: &ShelfRef) -> CatalogResult<()> {
    match store.shelf(shelf) {
        Some(_) => Ok(()),
        None => Err(CatalogError::UnknownShelf(shelf.name.to_string())),
    }
}

/// Builds the viewer for `book`, locating it within its shelf.
pub fn open_viewer(collection: &Collection, book: &BookRef) -> CatalogResult<ImageViewerView> {
    let shelf = collection
        .shelf(&book.shelf)
        .ok_or_else(|| CatalogError::UnknownShelf(book.shelf.to_string()))?;
    let position = shelf
        .position_of(book.id)
        .ok_or_else(|| CatalogError::UnknownBook(book.shelf.to_string(), book.id))?;
    let entry = &shelf.books[position];
    let index = position + 1;
    let total = shelf.book_count();

    Ok(ImageViewerView {
        shelf: shelf.name.to_string(),
        book_id: entry.id,
        src: entry.src.as_str().to_string(),
        index,
        total,
        position: format!("{index} / {total}"),
    })
}
