//! Compute backends for pyramid generation.
//!
//! Provides CPU (rayon) and wgpu backends with automatic selection.
//!
//! All backends share the enqueue-then-drain execution model: dispatches
//! are queued in submission order and nothing blocks until `finish()`.
//! The CPU backend executes eagerly, which drains trivially.

mod primitives;
mod detect;
mod cpu;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use primitives::{ImageData, ProgramHandle, AsAny};
pub use detect::{detect_backends, select_best_backend, describe_backends, BackendInfo};

pub use cpu::{CpuPrimitives, CpuImage};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuPrimitives, WgpuImage};

use crate::ComputeResult;
#[cfg(not(feature = "wgpu"))]
use crate::ComputeError;

/// Available compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Auto-select best available (wgpu > CPU).
    #[default]
    Auto,
    /// CPU backend using rayon for parallelization.
    Cpu,
    /// wgpu backend (Vulkan/Metal/DX12).
    Wgpu,
}

impl Backend {
    /// Check if this backend is available on the current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Cpu => true,
            #[cfg(feature = "wgpu")]
            Self::Wgpu => WgpuPrimitives::is_available(),
            #[cfg(not(feature = "wgpu"))]
            Self::Wgpu => false,
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Wgpu => "wgpu",
        }
    }
}

/// Trait for pyramid compute backends.
///
/// Object-safe so a `DeviceContext` can hold any backend behind an `Arc`.
pub trait DevicePrimitives: Send + Sync {
    /// Backend kind.
    fn backend(&self) -> Backend;

    /// Device name for reporting.
    fn device_name(&self) -> &str;

    /// Upload packed RGBA8 pixels into a new device image.
    fn upload(&self, pixels: &[u8], width: u32, height: u32) -> ComputeResult<Box<dyn ImageData>>;

    /// Allocate an uninitialized device image.
    fn allocate(&self, width: u32, height: u32) -> ComputeResult<Box<dyn ImageData>>;

    /// Read an image back as packed RGBA8 bytes. Blocks until the copy
    /// completes.
    fn read(&self, image: &dyn ImageData) -> ComputeResult<Vec<u8>>;

    /// Compile a device program for the given entry point, capturing the
    /// full build log on failure.
    fn compile(&self, source: &str, entry_point: &str) -> ComputeResult<Box<dyn ProgramHandle>>;

    /// Queue one downsample dispatch (src -> dst with the given step).
    /// Never blocks; completion is observable only after `finish()`.
    fn enqueue_downsample(
        &self,
        program: &dyn ProgramHandle,
        src: &dyn ImageData,
        dst: &dyn ImageData,
        step: u32,
    ) -> ComputeResult<()>;

    /// Block until every queued dispatch has completed.
    fn finish(&self);
}

/// Create a backend instance.
pub fn create_primitives(backend: Backend) -> ComputeResult<std::sync::Arc<dyn DevicePrimitives>> {
    match backend {
        Backend::Auto => {
            let best = select_best_backend();
            create_primitives(best)
        }
        Backend::Cpu => Ok(std::sync::Arc::new(CpuPrimitives::new())),
        Backend::Wgpu => {
            #[cfg(feature = "wgpu")]
            {
                Ok(std::sync::Arc::new(WgpuPrimitives::new()?))
            }
            #[cfg(not(feature = "wgpu"))]
            {
                Err(ComputeError::DeviceUnavailable(
                    "wgpu feature not enabled".to_string()
                ))
            }
        }
    }
}
