//! wgpu backend implementation.
//!
//! Packed RGBA8 texels live in storage buffers, one u32 per pixel.
//! Dispatches are submitted without waiting; `finish()` performs the
//! single blocking drain.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use tracing::debug;
use wgpu::util::DeviceExt;

use super::{Backend, DevicePrimitives};
use super::primitives::{ImageData, ProgramHandle, AsAny};
use crate::{ComputeError, ComputeResult};

/// Dimensions uniform: [width, height, step, 0]
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct DimsUniform {
    dims: [u32; 4],
}

/// GPU buffer handle for packed RGBA8 image data.
pub struct WgpuImage {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    size_bytes: u64,
}

impl AsAny for WgpuImage {
    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}

impl ImageData for WgpuImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Compiled compute pipeline handle.
struct WgpuProgram {
    pipeline: wgpu::ComputePipeline,
    entry: String,
}

impl AsAny for WgpuProgram {
    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}

impl ProgramHandle for WgpuProgram {
    fn entry_point(&self) -> &str {
        &self.entry
    }
}

/// wgpu primitives implementation.
pub struct WgpuPrimitives {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_name: String,
}

impl WgpuPrimitives {
    /// Check if wgpu is available.
    pub fn is_available() -> bool {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .is_some()
        })
    }

    /// Create new wgpu primitives.
    pub fn new() -> ComputeResult<Self> {
        pollster::block_on(Self::new_async())
    }

    /// Create new wgpu primitives asynchronously.
    pub async fn new_async() -> ComputeResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| ComputeError::DeviceUnavailable(
                "no suitable GPU adapter found".to_string()
            ))?;

        let adapter_info = adapter.get_info();
        debug!(adapter = %adapter_info.name, backend = ?adapter_info.backend, "selected GPU adapter");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("mip_device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            }, None)
            .await
            .map_err(|e| ComputeError::DeviceUnavailable(e.to_string()))?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name: adapter_info.name,
        })
    }

    /// Create dims uniform buffer.
    fn create_dims_buffer(&self, w: u32, h: u32, step: u32) -> wgpu::Buffer {
        let uniform = DimsUniform { dims: [w, h, step, 0] };
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dims_uniform"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        })
    }
}

impl DevicePrimitives for WgpuPrimitives {
    fn backend(&self) -> Backend {
        Backend::Wgpu
    }

    fn device_name(&self) -> &str {
        &self.adapter_name
    }

    fn upload(&self, pixels: &[u8], width: u32, height: u32) -> ComputeResult<Box<dyn ImageData>> {
        let size_bytes = pixels.len() as u64;

        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("image_buffer"),
            contents: pixels,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Box::new(WgpuImage { buffer, width, height, size_bytes }))
    }

    fn allocate(&self, width: u32, height: u32) -> ComputeResult<Box<dyn ImageData>> {
        let size_bytes = (width as u64) * (height as u64) * 4;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("level_buffer"),
            size: size_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Box::new(WgpuImage { buffer, width, height, size_bytes }))
    }

    fn read(&self, image: &dyn ImageData) -> ComputeResult<Vec<u8>> {
        let img = image.as_any()
            .downcast_ref::<WgpuImage>()
            .ok_or_else(|| ComputeError::OperationFailed("Invalid handle type".into()))?;
        let size = img.size_bytes;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&Default::default());
        encoder.copy_buffer_to_buffer(&img.buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| { let _ = tx.send(r); });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| ComputeError::OperationFailed("Map channel closed".into()))?
            .map_err(|e| ComputeError::OperationFailed(format!("Map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let result = data.to_vec();
        drop(data);
        staging.unmap();

        Ok(result)
    }

    fn compile(&self, source: &str, entry_point: &str) -> ComputeResult<Box<dyn ProgramHandle>> {
        // Validation scope captures the full shader diagnostic instead of
        // letting it surface as an uncaptured device error.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(entry_point),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(entry_point),
            layout: None, // Auto layout
            module: &module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ComputeError::KernelBuildFailed(err.to_string()));
        }

        Ok(Box::new(WgpuProgram { pipeline, entry: entry_point.to_string() }))
    }

    fn enqueue_downsample(
        &self,
        program: &dyn ProgramHandle,
        src: &dyn ImageData,
        dst: &dyn ImageData,
        step: u32,
    ) -> ComputeResult<()> {
        let prog = program.as_any()
            .downcast_ref::<WgpuProgram>()
            .ok_or_else(|| ComputeError::OperationFailed("Invalid handle type".into()))?;
        let src_img = src.as_any()
            .downcast_ref::<WgpuImage>()
            .ok_or_else(|| ComputeError::OperationFailed("Invalid handle type".into()))?;
        let dst_img = dst.as_any()
            .downcast_ref::<WgpuImage>()
            .ok_or_else(|| ComputeError::OperationFailed("Invalid handle type".into()))?;

        let (sw, sh) = src_img.dimensions();
        let (dw, dh) = dst_img.dimensions();

        let src_dims_buf = self.create_dims_buffer(sw, sh, 0);
        let dst_dims_buf = self.create_dims_buffer(dw, dh, step);

        let layout = prog.pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("downsample_bind_group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: src_img.buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: dst_img.buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: src_dims_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: dst_dims_buf.as_entire_binding() },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("downsample_encoder"),
        });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("downsample_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&prog.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            // 8x8 tiles, rounded up over the destination grid
            pass.dispatch_workgroups(dw.div_ceil(8), dh.div_ceil(8), 1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn finish(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}
