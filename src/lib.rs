//! # Shelf Core
//!
//! The core of a personal media catalog: the user photographs an item (a
//! trading card, a book cover), crops the photo and files it under a named
//! shelf. Shelves and their images persist locally in LMDB.
//!
//! ## Components
//!
//! - [`shelf_storage`]: persistence adapters; the whole collection is one JSON value
//! - [`shelf_store`]: the authoritative collection with write-through persistence
//! - [`capture`]: the capture → crop → commit state machine over host collaborators
//! - [`view`]: pure projection into a view tree plus interaction intents
//!
//! ## Quick Start
//!
//! ```no_run
//! use shelf_core::{create_catalog, ensure_shelf, add_book, render_shelves};
//! use std::ffi::CString;
//!
//! let name = CString::new("my_catalog").unwrap();
//! let catalog = create_catalog(name.as_ptr());
//!
//! let shelf = CString::new("Read").unwrap();
//! let result = ensure_shelf(catalog, shelf.as_ptr());
//!
//! let src = CString::new("data:image/jpeg;base64,/9j/4AAQ").unwrap();
//! let result = add_book(catalog, shelf.as_ptr(), src.as_ptr());
//!
//! let view = render_shelves(catalog);
//! ```
//!
//! ## FFI Functions
//!
//! Every function returns a JSON [`AppResponse`](app_response::AppResponse)
//! string that must be released with [`free_response`]:
//!
//! - [`create_catalog`] / [`create_catalog_with_config`] - Open a catalog
//! - [`ensure_shelf`] - Find or create a shelf
//! - [`add_book`] - File an image under a shelf
//! - [`delete_shelf`] - Delete a shelf and its books (the host confirms first)
//! - [`get_collection`] - The whole collection as stored
//! - [`get_shelf_suggestions`] - Names for the shelf picker
//! - [`render_shelves`] / [`toggle_shelf`] - The shelf list view tree
//! - [`view_book`] - Full-size viewer for one book
//! - [`clear_catalog`] - Remove every shelf
//! - [`close_catalog`] / [`destroy_catalog`] - Connection cleanup

pub mod app_response;
pub mod capture;
pub mod catalog_error;
pub mod catalog_state;
pub mod config;
pub mod shelf_model;
pub mod shelf_storage;
pub mod shelf_store;
pub mod view;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Serialize;

use crate::app_response::AppResponse;
use crate::catalog_error::{CatalogError, CatalogResult};
use crate::catalog_state::CatalogState;
use crate::config::CatalogConfig;
use crate::shelf_model::{BookRef, EncodedImage, ShelfName, ShelfRef};
use crate::view::{open_viewer, ViewIntent, ViewOutcome};

/// Opens (or creates) the catalog stored at `<name>.lmdb` with default settings.
///
/// # Returns
///
/// A pointer to the [`CatalogState`], or null if the name is null, not
/// UTF-8, or the storage cannot be opened. Release it with [`destroy_catalog`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use shelf_core::create_catalog;
///
/// let name = CString::new("test_catalog").unwrap();
/// let catalog = create_catalog(name.as_ptr());
/// assert!(!catalog.is_null());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_catalog(name: *const c_char) -> *mut CatalogState {
    open_catalog(name, CatalogConfig::default())
}

/// Opens a catalog with a JSON [`CatalogConfig`]; omitted fields keep their defaults.
///
/// Returns null on a malformed configuration.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_catalog_with_config(
    name: *const c_char,
    config_json: *const c_char,
) -> *mut CatalogState {
    let config = match read_c_str(config_json).map(|json| CatalogConfig::from_json(&json)) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            warn!("Invalid catalog configuration: {e}");
            return std::ptr::null_mut();
        }
        None => {
            warn!("Null or non UTF-8 config passed to create_catalog_with_config");
            return std::ptr::null_mut();
        }
    };
    open_catalog(name, config)
}

fn open_catalog(name: *const c_char, config: CatalogConfig) -> *mut CatalogState {
    let name = match read_c_str(name) {
        Some(name) => name,
        None => {
            warn!("Null or non UTF-8 name passed to create_catalog");
            return std::ptr::null_mut();
        }
    };

    info!("Opening catalog '{name}'");

    match CatalogState::init(&name, config) {
        Ok(state) => Box::into_raw(Box::new(state)),
        Err(e) => {
            warn!("Failed to open catalog '{name}': {e}");
            std::ptr::null_mut()
        }
    }
}

/// Finds the shelf named `name` (case-insensitive) or creates it.
///
/// Responds with the shelf reference, e.g. `{"Ok":"{\"name\":\"read\"}"}`,
/// or `ValidationError` for a blank name.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn ensure_shelf(state: *mut CatalogState, name: *const c_char) -> *const c_char {
    let state = match state_mut(state, "ensure_shelf") {
        Ok(state) => state,
        Err(err) => return err,
    };
    let name = match c_ptr_to_string(name, "name") {
        Ok(name) => name,
        Err(err) => return err,
    };

    respond(state.store.ensure_shelf(&name))
}

/// Appends an image (a `data:image/jpeg;base64,...` URI) to an existing shelf.
///
/// Responds with the new book reference, or `ValidationError` when `src` is
/// empty, or `NotFound` when the shelf does not exist.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_book(
    state: *mut CatalogState,
    shelf: *const c_char,
    src: *const c_char,
) -> *const c_char {
    let state = match state_mut(state, "add_book") {
        Ok(state) => state,
        Err(err) => return err,
    };
    let shelf = match shelf_ref(shelf) {
        Ok(shelf) => shelf,
        Err(err) => return err,
    };
    let src = match c_ptr_to_string(src, "src") {
        Ok(src) => src,
        Err(err) => return err,
    };

    respond(state.store.add_book(&shelf, EncodedImage::new(src)))
}

/// Deletes a shelf and all its books.
///
/// Irreversible; the host asks the user for confirmation before calling.
/// Responds with the re-rendered shelf list.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_shelf(state: *mut CatalogState, shelf: *const c_char) -> *const c_char {
    let state = match state_mut(state, "delete_shelf") {
        Ok(state) => state,
        Err(err) => return err,
    };
    let shelf = match shelf_ref(shelf) {
        Ok(shelf) => shelf,
        Err(err) => return err,
    };

    let mut host_confirmed = |_: &str| true;
    let result = state
        .controller
        .handle(ViewIntent::RequestDeleteShelf { shelf }, &mut state.store, &mut host_confirmed)
        .map(|outcome| match outcome {
            ViewOutcome::Rerender(view) => view,
            _ => state.controller.render(&state.store),
        });
    respond(result)
}

/// Returns the whole collection in its persisted layout.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_collection(state: *mut CatalogState) -> *const c_char {
    let state = match state_mut(state, "get_collection") {
        Ok(state) => state,
        Err(err) => return err,
    };

    respond(Ok(state.store.collection()))
}

/// Returns the shelf names to offer in the picker: existing shelves first,
/// then configured defaults not yet created.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_shelf_suggestions(state: *mut CatalogState) -> *const c_char {
    let state = match state_mut(state, "get_shelf_suggestions") {
        Ok(state) => state,
        Err(err) => return err,
    };

    respond(Ok(state.store.shelf_suggestions(&state.config.default_shelves)))
}

/// Returns the shelf list view tree for the current collection.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn render_shelves(state: *mut CatalogState) -> *const c_char {
    let state = match state_mut(state, "render_shelves") {
        Ok(state) => state,
        Err(err) => return err,
    };

    respond(Ok(state.controller.render(&state.store)))
}

/// Collapses or expands a shelf and returns the re-rendered view tree.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn toggle_shelf(state: *mut CatalogState, shelf: *const c_char) -> *const c_char {
    let state = match state_mut(state, "toggle_shelf") {
        Ok(state) => state,
        Err(err) => return err,
    };
    let shelf = match shelf_ref(shelf) {
        Ok(shelf) => shelf,
        Err(err) => return err,
    };

    // Toggling never prompts.
    let mut no_prompt = |_: &str| false;
    let result = state
        .controller
        .handle(ViewIntent::ToggleCollapse { shelf }, &mut state.store, &mut no_prompt)
        .map(|outcome| match outcome {
            ViewOutcome::Rerender(view) => view,
            _ => state.controller.render(&state.store),
        });
    respond(result)
}

/// Returns the full-size viewer for one book, including its `i / n` position.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn view_book(state: *mut CatalogState, shelf: *const c_char, id: u64) -> *const c_char {
    let state = match state_mut(state, "view_book") {
        Ok(state) => state,
        Err(err) => return err,
    };
    let shelf = match shelf_ref(shelf) {
        Ok(shelf) => shelf,
        Err(err) => return err,
    };

    let book = BookRef { shelf: shelf.name, id };
    respond(open_viewer(state.store.collection(), &book))
}

/// Removes every shelf. The catalog stays open.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_catalog(state: *mut CatalogState) -> *const c_char {
    let state = match state_mut(state, "clear_catalog") {
        Ok(state) => state,
        Err(err) => return err,
    };

    match state.clear_all() {
        Ok(()) => response_to_c_string(&AppResponse::success("Catalog cleared successfully")),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Explicitly closes the underlying storage, e.g. before a Flutter hot restart.
///
/// Later mutations on this state fail with `DatabaseError`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_catalog(state: *mut CatalogState) -> *const c_char {
    let state = match state_mut(state, "close_catalog") {
        Ok(state) => state,
        Err(err) => return err,
    };

    match state.close() {
        Ok(()) => response_to_c_string(&AppResponse::success("Catalog closed successfully")),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Releases a state returned by [`create_catalog`]. Null is ignored.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn destroy_catalog(state: *mut CatalogState) {
    if state.is_null() {
        return;
    }
    let mut state = unsafe { Box::from_raw(state) };
    if let Err(e) = state.close() {
        warn!("Error closing catalog during destroy: {e}");
    }
}

/// Releases a response string returned by any function of this crate.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(response: *mut c_char) {
    if response.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(response) });
}

/// Serializes a successful value into `AppResponse::Ok`, or maps the error.
fn respond<T: Serialize>(result: CatalogResult<T>) -> *const c_char {
    let response = match result {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(json) => AppResponse::Ok(json),
            Err(e) => AppResponse::from(e),
        },
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

fn state_mut<'a>(state: *mut CatalogState, caller: &str) -> Result<&'a mut CatalogState, *const c_char> {
    match unsafe { state.as_mut() } {
        Some(state) => Ok(state),
        None => {
            warn!("Null state pointer passed to {caller}");
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn shelf_ref(ptr: *const c_char) -> Result<ShelfRef, *const c_char> {
    let raw = c_ptr_to_string(ptr, "shelf")?;
    ShelfName::parse(&raw)
        .map(|name| ShelfRef { name })
        .map_err(|e: CatalogError| response_to_c_string(&AppResponse::from(e)))
}

fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(str::to_string)
}

/// Converts an [`AppResponse`] to a C string owned by the caller.
///
/// Returns null if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust String, reporting null pointers and
/// invalid UTF-8 as a `BadRequest` response.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
