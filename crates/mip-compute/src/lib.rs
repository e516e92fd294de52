//! Mip pyramid generation on CPU and GPU.
//!
//! Builds the full chain of power-of-two reductions of an RGBA8 image,
//! with automatic backend selection.
//!
//! # Architecture
//!
//! ```text
//! MipPyramidBuilder
//!     ├── DeviceImage (source, level 0)
//!     └── DownsampleKernel (one per level)
//!             └── DeviceContext
//!                     └── DevicePrimitives trait
//!                             ├── CpuPrimitives (rayon)
//!                             └── WgpuPrimitives (compute shaders)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mip_compute::{DeviceContext, MipPyramidBuilder, Strategy};
//!
//! let device = DeviceContext::new()?;
//! let mut builder = MipPyramidBuilder::new(device);
//!
//! builder.set_source_pixels(pixels, 256, 256)?;
//! builder.run()?;
//!
//! let quarter = builder.read_image(2)?;
//! ```

pub mod backend;
pub mod builder;
pub mod device;
pub mod image;
pub mod kernel;
pub mod levels;
pub mod signal;
mod shaders;

pub use backend::{Backend, detect_backends, select_best_backend, describe_backends};
pub use builder::MipPyramidBuilder;
pub use device::DeviceContext;
pub use image::{AccessMode, DeviceImage};
pub use kernel::{DownsampleKernel, Strategy};
pub use levels::{level_count, level_dims};
pub use signal::CompletionSignal;

use thiserror::Error;

/// Pyramid build errors.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("No compute device available: {0}")]
    DeviceUnavailable(String),

    #[error("Kernel build failed:\n{0}")]
    KernelBuildFailed(String),

    #[error("Failed to load source {path}: {reason}")]
    SourceLoad { path: String, reason: String },

    #[error("Invalid dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Image is not initialized")]
    NotInitialized,

    #[error("Kernel has no level configured")]
    NotConfigured,

    #[error("Pyramid has not been run")]
    NotRun,

    #[error("Use after dispose")]
    UseAfterDispose,

    #[error("Level {level} out of range: pyramid has {levels} levels")]
    LevelOutOfRange { level: usize, levels: usize },

    #[error("Device operation failed: {0}")]
    OperationFailed(String),
}

pub type ComputeResult<T> = Result<T, ComputeError>;
