//! Device context: backend selection and the shared submission queue.

use std::sync::Arc;

use tracing::info;

use crate::ComputeResult;
use crate::backend::{self, Backend, DevicePrimitives, ImageData, ProgramHandle};

/// Handle to a compute device and its single in-order queue.
///
/// Cheap to clone; all clones share the same device.
#[derive(Clone)]
pub struct DeviceContext {
    primitives: Arc<dyn DevicePrimitives>,
}

impl DeviceContext {
    /// Create a context on the best available backend (wgpu preferred,
    /// CPU fallback).
    pub fn new() -> ComputeResult<Self> {
        Self::with_backend(Backend::Auto)
    }

    /// Create a context on a specific backend.
    ///
    /// Fails with [`crate::ComputeError::DeviceUnavailable`] when the
    /// requested backend cannot be brought up.
    pub fn with_backend(backend: Backend) -> ComputeResult<Self> {
        let primitives = backend::create_primitives(backend)?;
        info!(
            backend = primitives.backend().name(),
            device = primitives.device_name(),
            "compute device ready"
        );
        Ok(Self { primitives })
    }

    /// Backend kind actually in use.
    pub fn backend(&self) -> Backend {
        self.primitives.backend()
    }

    /// Device name for reporting.
    pub fn device_name(&self) -> &str {
        self.primitives.device_name()
    }

    pub(crate) fn upload(&self, pixels: &[u8], width: u32, height: u32) -> ComputeResult<Box<dyn ImageData>> {
        self.primitives.upload(pixels, width, height)
    }

    pub(crate) fn allocate(&self, width: u32, height: u32) -> ComputeResult<Box<dyn ImageData>> {
        self.primitives.allocate(width, height)
    }

    pub(crate) fn read(&self, image: &dyn ImageData) -> ComputeResult<Vec<u8>> {
        self.primitives.read(image)
    }

    pub(crate) fn compile(&self, source: &str, entry_point: &str) -> ComputeResult<Box<dyn ProgramHandle>> {
        self.primitives.compile(source, entry_point)
    }

    pub(crate) fn enqueue_downsample(
        &self,
        program: &dyn ProgramHandle,
        src: &dyn ImageData,
        dst: &dyn ImageData,
        step: u32,
    ) -> ComputeResult<()> {
        self.primitives.enqueue_downsample(program, src, dst, step)
    }

    /// Block until every queued dispatch has completed.
    pub fn finish(&self) {
        self.primitives.finish();
    }
}
