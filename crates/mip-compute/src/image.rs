//! Device-resident RGBA8 images.

use crate::{ComputeError, ComputeResult};
use crate::backend::ImageData;
use crate::device::DeviceContext;

/// How an image is used by the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Source data, uploaded at construction.
    ReadOnly,
    /// Kernel output, materialized on first initialize.
    WriteOnly,
}

/// A 2D RGBA8 image in device memory.
///
/// Read-only images are backed by pixels immediately; write-only images
/// allocate lazily. Both `initialize` and `dispose` are idempotent, and
/// dropping the image disposes it.
pub struct DeviceImage {
    device: DeviceContext,
    width: u32,
    height: u32,
    mode: AccessMode,
    handle: Option<Box<dyn ImageData>>,
    initialized: bool,
    disposed: bool,
}

impl DeviceImage {
    /// Create a read-only image from packed RGBA8 pixels. Uploads eagerly.
    pub fn from_pixels(device: &DeviceContext, pixels: &[u8], width: u32, height: u32) -> ComputeResult<Self> {
        if width == 0 || height == 0 {
            return Err(ComputeError::InvalidDimensions(width, height));
        }
        let expected = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected {
            return Err(ComputeError::BufferSizeMismatch { expected, actual: pixels.len() });
        }

        let handle = device.upload(pixels, width, height)?;
        Ok(Self {
            device: device.clone(),
            width,
            height,
            mode: AccessMode::ReadOnly,
            handle: Some(handle),
            initialized: true,
            disposed: false,
        })
    }

    /// Create a write-only image. Device memory is allocated on the first
    /// call to [`initialize`](Self::initialize).
    pub fn writable(device: &DeviceContext, width: u32, height: u32) -> ComputeResult<Self> {
        if width == 0 || height == 0 {
            return Err(ComputeError::InvalidDimensions(width, height));
        }
        Ok(Self {
            device: device.clone(),
            width,
            height,
            mode: AccessMode::WriteOnly,
            handle: None,
            initialized: false,
            disposed: false,
        })
    }

    /// Materialize the device allocation. Repeated calls are no-ops.
    pub fn initialize(&mut self) -> ComputeResult<()> {
        if self.disposed {
            return Err(ComputeError::UseAfterDispose);
        }
        if self.initialized {
            return Ok(());
        }
        self.handle = Some(self.device.allocate(self.width, self.height)?);
        self.initialized = true;
        Ok(())
    }

    /// Synchronously copy the full image back as packed RGBA8 bytes.
    pub fn read_back(&self) -> ComputeResult<Vec<u8>> {
        self.device.read(self.data()?)
    }

    /// Release the device allocation. Repeated calls are no-ops; every
    /// other operation afterwards fails with `UseAfterDispose`.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.handle = None;
        self.disposed = true;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn data(&self) -> ComputeResult<&dyn ImageData> {
        if self.disposed {
            return Err(ComputeError::UseAfterDispose);
        }
        self.handle.as_deref().ok_or(ComputeError::NotInitialized)
    }
}

impl Drop for DeviceImage {
    fn drop(&mut self) {
        self.dispose();
    }
}
