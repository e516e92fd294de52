//! Pyramid orchestration: source management, kernel chain, execution.

#[cfg(feature = "io")]
use std::path::{Path, PathBuf};

use tracing::info;

use crate::{ComputeError, ComputeResult};
use crate::device::DeviceContext;
use crate::image::DeviceImage;
use crate::kernel::{DownsampleKernel, Strategy};
use crate::levels;
use crate::signal::CompletionSignal;

/// Builds and executes the full mip chain of one source image.
///
/// Owns the source image and one kernel per level. Replacing the source
/// (or the strategy) tears down and rebuilds the whole chain; a failed
/// replacement leaves the previous state untouched.
pub struct MipPyramidBuilder {
    device: DeviceContext,
    strategy: Strategy,
    #[cfg(feature = "io")]
    source_path: Option<PathBuf>,
    source_pixels: Option<Vec<u8>>,
    source_dims: (u32, u32),
    source: Option<DeviceImage>,
    kernels: Vec<DownsampleKernel>,
    on_run_finished: CompletionSignal,
    has_run: bool,
}

impl MipPyramidBuilder {
    /// Create a builder with the default (nearest) strategy.
    pub fn new(device: DeviceContext) -> Self {
        Self::with_strategy(device, Strategy::default())
    }

    /// Create a builder with an explicit strategy.
    pub fn with_strategy(device: DeviceContext, strategy: Strategy) -> Self {
        Self {
            device,
            strategy,
            #[cfg(feature = "io")]
            source_path: None,
            source_pixels: None,
            source_dims: (0, 0),
            source: None,
            kernels: Vec::new(),
            on_run_finished: CompletionSignal::new(),
            has_run: false,
        }
    }

    /// Decode an image file and make it the pyramid source.
    ///
    /// A decode failure surfaces as `SourceLoad` and leaves the previous
    /// source, chain, and outputs fully intact.
    #[cfg(feature = "io")]
    pub fn set_source(&mut self, path: impl AsRef<Path>) -> ComputeResult<()> {
        let path = path.as_ref();
        let (pixels, width, height) =
            mip_io::read_rgba8(path).map_err(|e| ComputeError::SourceLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        self.rebuild_chain(pixels, width, height)?;
        self.source_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Make decoded RGBA8 pixels the pyramid source.
    pub fn set_source_pixels(&mut self, pixels: &[u8], width: u32, height: u32) -> ComputeResult<()> {
        self.rebuild_chain(pixels.to_vec(), width, height)?;
        #[cfg(feature = "io")]
        {
            self.source_path = None;
        }
        Ok(())
    }

    /// Current sampling strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Switch sampling strategy.
    ///
    /// Setting the current value is a no-op. A genuine change with a
    /// source present rebuilds the whole chain from that source (decoding
    /// the last path again when one is known) and re-runs immediately.
    /// On failure the previous strategy stays in effect.
    pub fn set_strategy(&mut self, strategy: Strategy) -> ComputeResult<()> {
        if strategy == self.strategy {
            return Ok(());
        }
        if self.source.is_none() {
            self.strategy = strategy;
            return Ok(());
        }

        let previous = std::mem::replace(&mut self.strategy, strategy);
        if let Err(e) = self.rebuild_and_run() {
            self.strategy = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Dispatch every level in order, drain the queue once, then raise
    /// the completion signal. No partial completion is observable.
    pub fn run(&mut self) -> ComputeResult<()> {
        let source = self.source.as_ref().ok_or(ComputeError::NotConfigured)?;

        for kernel in &mut self.kernels {
            kernel.run(source)?;
        }
        self.device.finish();
        self.has_run = true;
        self.on_run_finished.raise();
        Ok(())
    }

    /// Read one pyramid level as packed RGBA8 bytes.
    ///
    /// Level 0 is the retained source, available as soon as a source is
    /// set and never altered by a run. Higher levels require a completed
    /// run.
    pub fn read_image(&self, level: usize) -> ComputeResult<Vec<u8>> {
        let pixels = self.source_pixels.as_ref().ok_or(ComputeError::NotConfigured)?;

        if level == 0 {
            return Ok(pixels.clone());
        }
        match self.kernels.get(level - 1) {
            Some(kernel) => kernel.read_image(),
            None => Err(ComputeError::LevelOutOfRange { level, levels: self.kernels.len() }),
        }
    }

    /// Number of reduction levels in the current chain (excluding level 0).
    pub fn levels(&self) -> usize {
        self.kernels.len()
    }

    /// Source dimensions, if a source is set.
    pub fn source_dims(&self) -> Option<(u32, u32)> {
        self.source.as_ref().map(|_| self.source_dims)
    }

    /// Dimensions of one pyramid level.
    pub fn level_dims(&self, level: usize) -> ComputeResult<(u32, u32)> {
        if self.source.is_none() {
            return Err(ComputeError::NotConfigured);
        }
        if level > self.kernels.len() {
            return Err(ComputeError::LevelOutOfRange { level, levels: self.kernels.len() });
        }
        let (w, h) = self.source_dims;
        Ok(levels::level_dims(w, h, level))
    }

    /// Whether a run has completed since the last source or strategy
    /// change.
    pub fn has_run(&self) -> bool {
        self.has_run
    }

    /// Signal raised after each completed run.
    pub fn on_run_finished(&mut self) -> &mut CompletionSignal {
        &mut self.on_run_finished
    }

    /// Device this pyramid executes on.
    pub fn device(&self) -> &DeviceContext {
        &self.device
    }

    /// Build the replacement source and full kernel chain, then commit.
    /// Nothing is mutated until every piece has been built.
    fn rebuild_chain(&mut self, pixels: Vec<u8>, width: u32, height: u32) -> ComputeResult<()> {
        let source = DeviceImage::from_pixels(&self.device, &pixels, width, height)?;

        let n = levels::level_count(width, height);
        let mut kernels = Vec::with_capacity(n);
        for level in 1..=n {
            let mut kernel = DownsampleKernel::new(&self.device, self.strategy)?;
            kernel.setup_level(level, &source)?;
            kernels.push(kernel);
        }

        for kernel in &mut self.kernels {
            kernel.dispose();
        }
        if let Some(mut old) = self.source.take() {
            old.dispose();
        }

        self.source = Some(source);
        self.source_pixels = Some(pixels);
        self.source_dims = (width, height);
        self.kernels = kernels;
        self.has_run = false;

        info!(width, height, levels = n, strategy = self.strategy.name(), "pyramid chain rebuilt");
        Ok(())
    }

    fn rebuild_and_run(&mut self) -> ComputeResult<()> {
        #[cfg(feature = "io")]
        if let Some(path) = self.source_path.clone() {
            self.set_source(&path)?;
            return self.run();
        }

        let pixels = self.source_pixels.clone().ok_or(ComputeError::NotConfigured)?;
        let (width, height) = self.source_dims;
        self.rebuild_chain(pixels, width, height)?;
        self.run()
    }
}
