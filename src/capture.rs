//! Capture → crop → commit state machine.
//!
//! The pipeline drives two host collaborators, a [`Camera`] and an
//! interactive [`Cropper`], and hands the final image to a
//! [`ShelfStore`]. Only one capture is active per pipeline:
//!
//! ```text
//! Idle --start--> Capturing --take_photo--> Captured --confirm_crop--> Cropped --commit--> Idle
//!   ^                                                                                       |
//!   +------------------------------------ cancel (any state) --------------------------------+
//! ```
//!
//! The camera stream is held only while `Capturing`; every transition out
//! of that state releases it, including cancellation and drop.

use std::fmt::{Display, Formatter};
use std::mem;

use log::{debug, info, warn};
use thiserror::Error;

use crate::catalog_error::{CatalogError, CatalogResult};
use crate::config::{CameraConfig, CropConfig};
use crate::shelf_model::{BookRef, EncodedImage, ShelfName};
use crate::shelf_storage::ShelfStorage;
use crate::shelf_store::ShelfStore;

/// Failure reported by a camera collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CameraError(pub String);

/// Device camera owned by the host.
///
/// `acquire_stream` returns once the platform has granted or denied access.
pub trait Camera {
    type Stream;

    fn acquire_stream(&mut self, config: &CameraConfig) -> Result<Self::Stream, CameraError>;

    /// Freezes the current frame of `stream` into a JPEG image.
    fn capture_frame(&mut self, stream: &Self::Stream) -> Result<EncodedImage, CameraError>;

    fn release_stream(&mut self, stream: Self::Stream);
}

/// Interactive cropping widget owned by the host.
pub trait Cropper {
    type Handle;

    fn open_cropper(&mut self, image: EncodedImage, config: &CropConfig) -> Self::Handle;

    /// Returns the confirmed crop region re-encoded as an image, once the
    /// widget resolves. `None` when the widget could not produce a result.
    fn get_result(&mut self, handle: &Self::Handle) -> Option<EncodedImage>;

    fn destroy(&mut self, handle: Self::Handle);
}

/// Observable pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Captured,
    Cropped,
}

impl Display for CaptureState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Capturing => "capturing",
            CaptureState::Captured => "captured",
            CaptureState::Cropped => "cropped",
        };
        f.write_str(name)
    }
}

enum Stage<S, H> {
    Idle,
    Capturing(S),
    Captured(H),
    Cropped(EncodedImage),
}

impl<S, H> Stage<S, H> {
    fn state(&self) -> CaptureState {
        match self {
            Stage::Idle => CaptureState::Idle,
            Stage::Capturing(_) => CaptureState::Capturing,
            Stage::Captured(_) => CaptureState::Captured,
            Stage::Cropped(_) => CaptureState::Cropped,
        }
    }
}

pub struct CapturePipeline<C: Camera, K: Cropper> {
    camera: C,
    cropper: K,
    camera_config: CameraConfig,
    crop_config: CropConfig,
    stage: Stage<C::Stream, K::Handle>,
}

impl<C: Camera, K: Cropper> CapturePipeline<C, K> {
    pub fn new(camera: C, cropper: K, camera_config: CameraConfig, crop_config: CropConfig) -> Self {
        Self {
            camera,
            cropper,
            camera_config,
            crop_config,
            stage: Stage::Idle,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.stage.state()
    }

    pub fn holds_stream(&self) -> bool {
        matches!(self.stage, Stage::Capturing(_))
    }

    /// The cropped image awaiting a shelf, if the crop has been confirmed.
    pub fn pending_image(&self) -> Option<&EncodedImage> {
        match &self.stage {
            Stage::Cropped(image) => Some(image),
            _ => None,
        }
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn cropper(&self) -> &K {
        &self.cropper
    }

    /// Opens the camera stream.
    pub fn start(&mut self) -> CatalogResult<()> {
        if !matches!(self.stage, Stage::Idle) {
            return Err(self.rejected("start a capture"));
        }

        match self.camera.acquire_stream(&self.camera_config) {
            Ok(stream) => {
                self.stage = Stage::Capturing(stream);
                info!("Camera stream acquired");
                Ok(())
            }
            Err(e) => {
                warn!("Camera not available: {e}");
                Err(CatalogError::CameraUnavailable(e.0))
            }
        }
    }

    /// Freezes the current frame, releases the stream and opens the cropper.
    pub fn take_photo(&mut self) -> CatalogResult<()> {
        let stream = match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Capturing(stream) => stream,
            other => {
                self.stage = other;
                return Err(self.rejected("take a photo"));
            }
        };

        let frame = self.camera.capture_frame(&stream);
        self.camera.release_stream(stream);
        debug!("Camera stream released after frame capture");

        let frame = match frame {
            Ok(frame) if !frame.is_empty() => frame,
            Ok(_) => {
                warn!("Camera returned an empty frame");
                return Err(CatalogError::CameraUnavailable("empty frame".to_string()));
            }
            Err(e) => {
                warn!("Frame capture failed: {e}");
                return Err(CatalogError::CameraUnavailable(e.0));
            }
        };

        let handle = self.cropper.open_cropper(frame, &self.crop_config);
        self.stage = Stage::Captured(handle);
        Ok(())
    }

    /// Takes the cropper's result and discards the pre-crop frame.
    ///
    /// When the cropper yields nothing the pipeline stays `Captured` so the
    /// user can adjust and confirm again.
    pub fn confirm_crop(&mut self) -> CatalogResult<()> {
        let result = match &self.stage {
            Stage::Captured(handle) => self.cropper.get_result(handle),
            _ => return Err(self.rejected("confirm a crop")),
        };

        let image = match result {
            Some(image) if !image.is_empty() => image,
            _ => {
                warn!("Cropper produced no image");
                return Err(CatalogError::MissingImage);
            }
        };

        if let Stage::Captured(handle) = mem::replace(&mut self.stage, Stage::Cropped(image)) {
            self.cropper.destroy(handle);
        }
        debug!("Crop confirmed");
        Ok(())
    }

    /// Files the cropped image under `shelf_name`, creating the shelf if needed.
    ///
    /// Validation failures leave both the pipeline and the store untouched.
    pub fn commit<S: ShelfStorage>(
        &mut self,
        store: &mut ShelfStore<S>,
        shelf_name: &str,
    ) -> CatalogResult<BookRef> {
        ShelfName::parse(shelf_name)?;

        let image = match &self.stage {
            Stage::Cropped(image) => image.clone(),
            _ => return Err(CatalogError::MissingImage),
        };

        let shelf = store.ensure_shelf(shelf_name)?;
        let book = store.add_book(&shelf, image)?;

        self.stage = Stage::Idle;
        info!("Committed book {} to shelf '{}'", book.id, book.shelf);
        Ok(book)
    }

    /// Abandons the capture from any state, releasing whatever is held.
    pub fn cancel(&mut self) {
        match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Capturing(stream) => {
                self.camera.release_stream(stream);
                debug!("Capture cancelled, camera stream released");
            }
            Stage::Captured(handle) => {
                self.cropper.destroy(handle);
                debug!("Capture cancelled, cropper destroyed");
            }
            Stage::Cropped(_) => debug!("Capture cancelled, cropped image discarded"),
            Stage::Idle => {}
        }
    }

    fn rejected(&self, action: &str) -> CatalogError {
        CatalogError::InvalidCaptureStep(format!("cannot {action} while {}", self.state()))
    }
}

impl<C: Camera, K: Cropper> Drop for CapturePipeline<C, K> {
    fn drop(&mut self) {
        self.cancel();
    }
}
