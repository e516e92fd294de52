//! CPU backend using rayon for parallelization.
//!
//! Executes dispatches eagerly on enqueue, so the queue drain is a no-op.
//! Sampling arithmetic mirrors the WGSL shaders, including the
//! pack4x8unorm round-half-up requantization, so both backends agree.

use std::sync::RwLock;

use rayon::prelude::*;

use super::{Backend, DevicePrimitives};
use super::primitives::{ImageData, ProgramHandle, AsAny};
use crate::{ComputeError, ComputeResult};

/// CPU image handle. Packed RGBA8 in RAM.
pub struct CpuImage {
    data: RwLock<Vec<u8>>,
    width: u32,
    height: u32,
}

impl CpuImage {
    fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self { data: RwLock::new(data), width, height }
    }
}

impl AsAny for CpuImage {
    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}

impl ImageData for CpuImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Clone, Copy)]
enum Sampler {
    Nearest,
    Linear,
}

/// "Compiled" CPU program: the entry point resolved to a sampler.
struct CpuProgram {
    sampler: Sampler,
    entry: String,
}

impl AsAny for CpuProgram {
    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}

impl ProgramHandle for CpuProgram {
    fn entry_point(&self) -> &str {
        &self.entry
    }
}

/// CPU primitives implementation.
pub struct CpuPrimitives;

impl CpuPrimitives {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpuPrimitives {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast_image(image: &dyn ImageData) -> ComputeResult<&CpuImage> {
    image.as_any()
        .downcast_ref::<CpuImage>()
        .ok_or_else(|| ComputeError::OperationFailed("Invalid handle type".into()))
}

/// WGSL pack4x8unorm quantization: floor(0.5 + 255 * clamp(v, 0, 1)).
fn quantize(v: f32) -> u8 {
    (0.5 + 255.0 * v.clamp(0.0, 1.0)).floor() as u8
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn downsample_nearest(src: &[u8], sw: u32, sh: u32, dst: &mut [u8], dw: u32, step: u32) {
    dst.par_chunks_mut((dw as usize) * 4)
        .enumerate()
        .for_each(|(dy, row)| {
            let sy = (dy as u32 * step).min(sh - 1);
            for dx in 0..dw {
                let sx = (dx * step).min(sw - 1);
                let s = ((sy * sw + sx) as usize) * 4;
                let d = (dx as usize) * 4;
                row[d..d + 4].copy_from_slice(&src[s..s + 4]);
            }
        });
}

fn downsample_linear(src: &[u8], sw: u32, sh: u32, dst: &mut [u8], dw: u32, step: u32) {
    let stepf = step as f32;

    dst.par_chunks_mut((dw as usize) * 4)
        .enumerate()
        .for_each(|(dy, row)| {
            let sy = ((dy as f32 + 0.5) * stepf - 0.5).max(0.0);
            let fy = sy - sy.floor();
            let y0 = (sy as u32).min(sh - 1);
            let y1 = (y0 + 1).min(sh - 1);

            for dx in 0..dw {
                let sx = ((dx as f32 + 0.5) * stepf - 0.5).max(0.0);
                let fx = sx - sx.floor();
                let x0 = (sx as u32).min(sw - 1);
                let x1 = (x0 + 1).min(sw - 1);

                let p00 = ((y0 * sw + x0) as usize) * 4;
                let p10 = ((y0 * sw + x1) as usize) * 4;
                let p01 = ((y1 * sw + x0) as usize) * 4;
                let p11 = ((y1 * sw + x1) as usize) * 4;
                let d = (dx as usize) * 4;

                for c in 0..4 {
                    let top = mix(
                        src[p00 + c] as f32 / 255.0,
                        src[p10 + c] as f32 / 255.0,
                        fx,
                    );
                    let bot = mix(
                        src[p01 + c] as f32 / 255.0,
                        src[p11 + c] as f32 / 255.0,
                        fx,
                    );
                    row[d + c] = quantize(mix(top, bot, fy));
                }
            }
        });
}

impl DevicePrimitives for CpuPrimitives {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn device_name(&self) -> &str {
        "CPU (rayon)"
    }

    fn upload(&self, pixels: &[u8], width: u32, height: u32) -> ComputeResult<Box<dyn ImageData>> {
        Ok(Box::new(CpuImage::new(pixels.to_vec(), width, height)))
    }

    fn allocate(&self, width: u32, height: u32) -> ComputeResult<Box<dyn ImageData>> {
        let size = (width as usize) * (height as usize) * 4;
        Ok(Box::new(CpuImage::new(vec![0; size], width, height)))
    }

    fn read(&self, image: &dyn ImageData) -> ComputeResult<Vec<u8>> {
        let img = downcast_image(image)?;
        let data = img.data.read()
            .map_err(|_| ComputeError::OperationFailed("Image lock poisoned".into()))?;
        Ok(data.clone())
    }

    fn compile(&self, _source: &str, entry_point: &str) -> ComputeResult<Box<dyn ProgramHandle>> {
        let sampler = match entry_point {
            "downsample_nearest" => Sampler::Nearest,
            "downsample_linear" => Sampler::Linear,
            other => {
                return Err(ComputeError::KernelBuildFailed(
                    format!("unknown entry point: {other}")
                ));
            }
        };

        Ok(Box::new(CpuProgram { sampler, entry: entry_point.to_string() }))
    }

    fn enqueue_downsample(
        &self,
        program: &dyn ProgramHandle,
        src: &dyn ImageData,
        dst: &dyn ImageData,
        step: u32,
    ) -> ComputeResult<()> {
        let prog = program.as_any()
            .downcast_ref::<CpuProgram>()
            .ok_or_else(|| ComputeError::OperationFailed("Invalid handle type".into()))?;
        let src_img = downcast_image(src)?;
        let dst_img = downcast_image(dst)?;

        let (sw, sh) = src_img.dimensions();
        let (dw, _dh) = dst_img.dimensions();

        let src_data = src_img.data.read()
            .map_err(|_| ComputeError::OperationFailed("Image lock poisoned".into()))?;
        let mut dst_data = dst_img.data.write()
            .map_err(|_| ComputeError::OperationFailed("Image lock poisoned".into()))?;

        match prog.sampler {
            Sampler::Nearest => downsample_nearest(&src_data, sw, sh, &mut dst_data, dw, step),
            Sampler::Linear => downsample_linear(&src_data, sw, sh, &mut dst_data, dw, step),
        }

        Ok(())
    }

    fn finish(&self) {
        // Eager execution: everything enqueued has already run.
    }
}
