//! Per-level downsample kernels.

use tracing::debug;

use crate::{ComputeError, ComputeResult};
use crate::backend::ProgramHandle;
use crate::device::DeviceContext;
use crate::image::DeviceImage;
use crate::shaders;

/// Sampling strategy for pyramid reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Pick the top-left source texel of each step block. Bit-exact.
    #[default]
    Nearest,
    /// Bilinear blend of the 2x2 neighborhood around the texel center.
    Linear,
}

impl Strategy {
    /// Shader source for this variant.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Nearest => shaders::DOWNSAMPLE_NEAREST,
            Self::Linear => shaders::DOWNSAMPLE_LINEAR,
        }
    }

    /// Entry point name for this variant.
    pub fn entry_point(&self) -> &'static str {
        match self {
            Self::Nearest => "downsample_nearest",
            Self::Linear => "downsample_linear",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Linear => "linear",
        }
    }
}

/// One pyramid level: a compiled program plus its output image.
///
/// Construction compiles the program; `setup_level` sizes and owns the
/// destination; `run` enqueues the dispatch. The destination is only
/// readable after the queue the dispatch went into has been drained.
pub struct DownsampleKernel {
    device: DeviceContext,
    strategy: Strategy,
    program: Option<Box<dyn ProgramHandle>>,
    dst: Option<DeviceImage>,
    level: usize,
    step: u32,
    has_run: bool,
    disposed: bool,
}

impl DownsampleKernel {
    /// Compile the kernel for the given strategy.
    ///
    /// A build failure carries the full device diagnostic log.
    pub fn new(device: &DeviceContext, strategy: Strategy) -> ComputeResult<Self> {
        let program = device.compile(strategy.source(), strategy.entry_point())?;
        Ok(Self {
            device: device.clone(),
            strategy,
            program: Some(program),
            dst: None,
            level: 0,
            step: 1,
            has_run: false,
            disposed: false,
        })
    }

    /// Configure the kernel for one pyramid level of the given source.
    ///
    /// Allocates a write-only destination of `floor(src / 2^level)` in
    /// each dimension, replacing any previous destination.
    pub fn setup_level(&mut self, level: usize, source: &DeviceImage) -> ComputeResult<()> {
        if self.disposed {
            return Err(ComputeError::UseAfterDispose);
        }

        // Absurd levels produce a 0-dim destination and are rejected there.
        let step = 1u32.checked_shl(level as u32).unwrap_or(u32::MAX);
        let dw = source.width() / step;
        let dh = source.height() / step;

        if let Some(mut old) = self.dst.take() {
            old.dispose();
        }
        self.dst = Some(DeviceImage::writable(&self.device, dw, dh)?);
        self.level = level;
        self.step = step;
        self.has_run = false;
        debug!(level, step, dw, dh, strategy = self.strategy.name(), "kernel configured");
        Ok(())
    }

    /// Enqueue the downsample dispatch for this level.
    ///
    /// Covers the destination with 8x8 tiles rounded up; out-of-range
    /// invocations are guarded inside the shader.
    pub fn run(&mut self, source: &DeviceImage) -> ComputeResult<()> {
        if self.disposed {
            return Err(ComputeError::UseAfterDispose);
        }
        let program = self.program.as_deref().ok_or(ComputeError::UseAfterDispose)?;
        let dst = self.dst.as_mut().ok_or(ComputeError::NotConfigured)?;

        dst.initialize()?;
        self.device.enqueue_downsample(program, source.data()?, dst.data()?, self.step)?;
        self.has_run = true;
        Ok(())
    }

    /// Read this level's output back as packed RGBA8 bytes.
    pub fn read_image(&self) -> ComputeResult<Vec<u8>> {
        if self.disposed {
            return Err(ComputeError::UseAfterDispose);
        }
        if !self.has_run {
            return Err(ComputeError::NotRun);
        }
        let dst = self.dst.as_ref().ok_or(ComputeError::NotConfigured)?;
        dst.read_back()
    }

    /// Pyramid level this kernel is configured for.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Destination dimensions, if configured.
    pub fn output_dims(&self) -> Option<(u32, u32)> {
        self.dst.as_ref().map(|d| (d.width(), d.height()))
    }

    /// Sampling strategy this kernel was compiled for.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Release the program, then the destination. Repeated calls are
    /// no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.program = None;
        if let Some(mut dst) = self.dst.take() {
            dst.dispose();
        }
        self.disposed = true;
    }
}

impl Drop for DownsampleKernel {
    fn drop(&mut self) {
        self.dispose();
    }
}
