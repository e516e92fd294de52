//! Pyramid tests on the CPU backend, with wgpu coverage when an adapter
//! is present.

use mip_compute::{
    Backend, ComputeError, DeviceContext, DeviceImage, DownsampleKernel, MipPyramidBuilder,
    Strategy, describe_backends,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn cpu_device() -> DeviceContext {
    DeviceContext::with_backend(Backend::Cpu).unwrap()
}

/// Deterministic test image with distinct pixel values.
fn gradient(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x * 7 % 256) as u8);
            pixels.push((y * 13 % 256) as u8);
            pixels.push(((x + y) * 29 % 256) as u8);
            pixels.push(255);
        }
    }
    pixels
}

fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

#[test]
fn test_cpu_backend_available() {
    assert!(Backend::Cpu.is_available());
}

#[test]
fn test_describe_backends() {
    let desc = describe_backends();
    println!("{}", desc);
    assert!(desc.contains("CPU"));
}

#[test]
fn test_device_reports_name() {
    let device = cpu_device();
    assert_eq!(device.backend(), Backend::Cpu);
    assert!(!device.device_name().is_empty());
}

#[test]
fn test_level_counts() {
    let device = cpu_device();

    let mut builder = MipPyramidBuilder::new(device.clone());
    builder.set_source_pixels(&gradient(256, 256), 256, 256).unwrap();
    assert_eq!(builder.levels(), 7);
    assert_eq!(builder.level_dims(7).unwrap(), (2, 2));

    let mut tiny = MipPyramidBuilder::new(device);
    tiny.set_source_pixels(&gradient(3, 3), 3, 3).unwrap();
    assert_eq!(tiny.levels(), 0);
}

#[test]
fn test_run_with_no_levels_still_completes() {
    let mut builder = MipPyramidBuilder::new(cpu_device());
    builder.set_source_pixels(&gradient(3, 3), 3, 3).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    builder.on_run_finished().connect(move || { counter.fetch_add(1, Ordering::SeqCst); });

    builder.run().unwrap();
    assert!(builder.has_run());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_level_zero_is_source_verbatim() {
    let pixels = gradient(16, 12);
    let mut builder = MipPyramidBuilder::new(cpu_device());
    builder.set_source_pixels(&pixels, 16, 12).unwrap();

    assert_eq!(builder.read_image(0).unwrap(), pixels);
    builder.run().unwrap();
    assert_eq!(builder.read_image(0).unwrap(), pixels);
}

#[test]
fn test_nearest_picks_exact_texels() {
    let pixels = gradient(4, 4);
    let mut builder = MipPyramidBuilder::with_strategy(cpu_device(), Strategy::Nearest);
    builder.set_source_pixels(&pixels, 4, 4).unwrap();
    assert_eq!(builder.levels(), 1);

    builder.run().unwrap();
    let level1 = builder.read_image(1).unwrap();
    assert_eq!(level1.len(), 2 * 2 * 4);

    // Each output texel is the top-left of its 2x2 step block, untouched.
    assert_eq!(pixel(&level1, 2, 0, 0), pixel(&pixels, 4, 0, 0));
    assert_eq!(pixel(&level1, 2, 1, 0), pixel(&pixels, 4, 2, 0));
    assert_eq!(pixel(&level1, 2, 0, 1), pixel(&pixels, 4, 0, 2));
    assert_eq!(pixel(&level1, 2, 1, 1), pixel(&pixels, 4, 2, 2));
}

#[test]
fn test_nearest_deep_levels_sample_from_source() {
    // Level 2 reads the source directly with step 4, not level 1.
    let pixels = gradient(8, 8);
    let mut builder = MipPyramidBuilder::with_strategy(cpu_device(), Strategy::Nearest);
    builder.set_source_pixels(&pixels, 8, 8).unwrap();
    assert_eq!(builder.levels(), 2);

    builder.run().unwrap();
    let level2 = builder.read_image(2).unwrap();
    assert_eq!(pixel(&level2, 2, 0, 0), pixel(&pixels, 8, 0, 0));
    assert_eq!(pixel(&level2, 2, 1, 1), pixel(&pixels, 8, 4, 4));
}

#[test]
fn test_linear_averages_step_blocks() {
    // With step 2 the sample center lands exactly between the 2x2 block,
    // so each output texel is the block average (round half up).
    let mut pixels = vec![0u8; 4 * 4 * 4];
    // Top-left block: two black, two white pixels per channel.
    for (x, y) in [(1, 0), (0, 1)] {
        let i = ((y * 4 + x) * 4) as usize;
        pixels[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
    }

    let mut builder = MipPyramidBuilder::with_strategy(cpu_device(), Strategy::Linear);
    builder.set_source_pixels(&pixels, 4, 4).unwrap();
    builder.run().unwrap();

    let level1 = builder.read_image(1).unwrap();
    assert_eq!(pixel(&level1, 2, 0, 0), [128, 128, 128, 128]);
    assert_eq!(pixel(&level1, 2, 1, 1), [0, 0, 0, 0]);
}

#[test]
fn test_linear_preserves_constant_image() {
    let pixels = vec![100u8; 8 * 8 * 4];
    let mut builder = MipPyramidBuilder::with_strategy(cpu_device(), Strategy::Linear);
    builder.set_source_pixels(&pixels, 8, 8).unwrap();
    builder.run().unwrap();

    for level in 1..=builder.levels() {
        let out = builder.read_image(level).unwrap();
        assert!(out.iter().all(|&b| b == 100), "level {} not constant", level);
    }
}

#[test]
fn test_strategy_roundtrip_is_bit_identical() {
    let pixels = gradient(16, 16);
    let mut builder = MipPyramidBuilder::with_strategy(cpu_device(), Strategy::Nearest);
    builder.set_source_pixels(&pixels, 16, 16).unwrap();
    builder.run().unwrap();

    let nearest_l2 = builder.read_image(2).unwrap();

    // Each change rebuilds the chain and re-runs on its own.
    builder.set_strategy(Strategy::Linear).unwrap();
    assert!(builder.has_run());
    let linear_l2 = builder.read_image(2).unwrap();
    assert_ne!(nearest_l2, linear_l2);

    builder.set_strategy(Strategy::Nearest).unwrap();
    assert_eq!(builder.read_image(2).unwrap(), nearest_l2);
}

#[test]
fn test_strategy_same_value_is_noop() {
    let mut builder = MipPyramidBuilder::with_strategy(cpu_device(), Strategy::Nearest);
    builder.set_source_pixels(&gradient(8, 8), 8, 8).unwrap();
    builder.run().unwrap();

    builder.set_strategy(Strategy::Nearest).unwrap();
    assert!(builder.has_run());
}

#[test]
fn test_bad_pixel_buffer_preserves_state() {
    let pixels = gradient(8, 8);
    let mut builder = MipPyramidBuilder::new(cpu_device());
    builder.set_source_pixels(&pixels, 8, 8).unwrap();
    builder.run().unwrap();
    let level1 = builder.read_image(1).unwrap();

    let err = builder.set_source_pixels(&pixels, 16, 16).unwrap_err();
    assert!(matches!(err, ComputeError::BufferSizeMismatch { .. }));

    assert_eq!(builder.levels(), 2);
    assert_eq!(builder.read_image(1).unwrap(), level1);
}

#[cfg(feature = "io")]
#[test]
fn test_failed_decode_preserves_state() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("not_an_image.png");
    std::fs::write(&bad, b"definitely not a png").unwrap();

    let pixels = gradient(8, 8);
    let mut builder = MipPyramidBuilder::new(cpu_device());
    builder.set_source_pixels(&pixels, 8, 8).unwrap();
    builder.run().unwrap();
    let level1 = builder.read_image(1).unwrap();

    let err = builder.set_source(&bad).unwrap_err();
    assert!(matches!(err, ComputeError::SourceLoad { .. }));

    assert_eq!(builder.levels(), 2);
    assert_eq!(builder.read_image(0).unwrap(), pixels);
    assert_eq!(builder.read_image(1).unwrap(), level1);
}

#[cfg(feature = "io")]
#[test]
fn test_set_source_decodes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("source.png");
    let pixels = gradient(8, 8);
    mip_io::write_png_rgba8(&path, &pixels, 8, 8).unwrap();

    let mut builder = MipPyramidBuilder::new(cpu_device());
    builder.set_source(&path).unwrap();
    assert_eq!(builder.levels(), 2);
    assert_eq!(builder.read_image(0).unwrap(), pixels);

    builder.run().unwrap();
    assert_eq!(builder.read_image(1).unwrap().len(), 4 * 4 * 4);
}

#[test]
fn test_error_states() {
    let mut builder = MipPyramidBuilder::new(cpu_device());

    assert!(matches!(builder.run(), Err(ComputeError::NotConfigured)));
    assert!(matches!(builder.read_image(0), Err(ComputeError::NotConfigured)));

    builder.set_source_pixels(&gradient(8, 8), 8, 8).unwrap();
    assert!(matches!(builder.read_image(1), Err(ComputeError::NotRun)));
    assert!(matches!(
        builder.read_image(9),
        Err(ComputeError::LevelOutOfRange { level: 9, levels: 2 })
    ));

    builder.run().unwrap();
    assert!(builder.read_image(2).is_ok());
    assert!(matches!(
        builder.read_image(3),
        Err(ComputeError::LevelOutOfRange { level: 3, levels: 2 })
    ));
}

#[test]
fn test_image_lifecycle() {
    let device = cpu_device();

    let mut img = DeviceImage::writable(&device, 4, 4).unwrap();
    assert!(!img.is_initialized());
    assert!(matches!(img.read_back(), Err(ComputeError::NotInitialized)));

    img.initialize().unwrap();
    img.initialize().unwrap();
    assert!(img.is_initialized());
    assert_eq!(img.read_back().unwrap().len(), 4 * 4 * 4);

    img.dispose();
    img.dispose();
    assert!(img.is_disposed());
    assert!(matches!(img.read_back(), Err(ComputeError::UseAfterDispose)));
    assert!(matches!(img.initialize(), Err(ComputeError::UseAfterDispose)));
}

#[test]
fn test_readonly_image_is_eager() {
    let device = cpu_device();
    let pixels = gradient(4, 4);

    let img = DeviceImage::from_pixels(&device, &pixels, 4, 4).unwrap();
    assert!(img.is_initialized());
    assert_eq!(img.read_back().unwrap(), pixels);
}

#[test]
fn test_kernel_lifecycle() {
    let device = cpu_device();
    let source = DeviceImage::from_pixels(&device, &gradient(8, 8), 8, 8).unwrap();

    let mut kernel = DownsampleKernel::new(&device, Strategy::Nearest).unwrap();
    assert!(matches!(kernel.run(&source), Err(ComputeError::NotConfigured)));

    kernel.setup_level(1, &source).unwrap();
    assert_eq!(kernel.output_dims(), Some((4, 4)));
    assert!(matches!(kernel.read_image(), Err(ComputeError::NotRun)));

    kernel.run(&source).unwrap();
    device.finish();
    assert_eq!(kernel.read_image().unwrap().len(), 4 * 4 * 4);

    kernel.dispose();
    kernel.dispose();
    assert!(matches!(kernel.run(&source), Err(ComputeError::UseAfterDispose)));
    assert!(matches!(kernel.read_image(), Err(ComputeError::UseAfterDispose)));
}

#[test]
fn test_completion_signal_fires_per_run() {
    let mut builder = MipPyramidBuilder::new(cpu_device());
    builder.set_source_pixels(&gradient(8, 8), 8, 8).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    builder.on_run_finished().connect(move || { counter.fetch_add(1, Ordering::SeqCst); });

    builder.run().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    builder.run().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[cfg(feature = "wgpu")]
mod wgpu_tests {
    use super::*;

    #[test]
    fn test_wgpu_matches_cpu_nearest() {
        if !Backend::Wgpu.is_available() {
            println!("wgpu not available, skipping");
            return;
        }

        let pixels = gradient(32, 24);

        let mut cpu = MipPyramidBuilder::with_strategy(cpu_device(), Strategy::Nearest);
        cpu.set_source_pixels(&pixels, 32, 24).unwrap();
        cpu.run().unwrap();

        let device = DeviceContext::with_backend(Backend::Wgpu).unwrap();
        assert!(!device.device_name().is_empty());
        let mut gpu = MipPyramidBuilder::with_strategy(device, Strategy::Nearest);
        gpu.set_source_pixels(&pixels, 32, 24).unwrap();
        gpu.run().unwrap();

        assert_eq!(cpu.levels(), gpu.levels());
        for level in 0..=cpu.levels() {
            assert_eq!(
                cpu.read_image(level).unwrap(),
                gpu.read_image(level).unwrap(),
                "level {} differs between backends",
                level
            );
        }
    }

    #[test]
    fn test_wgpu_linear_runs() {
        if !Backend::Wgpu.is_available() {
            println!("wgpu not available, skipping");
            return;
        }

        let device = DeviceContext::with_backend(Backend::Wgpu).unwrap();
        let mut builder = MipPyramidBuilder::with_strategy(device, Strategy::Linear);

        let pixels = vec![100u8; 16 * 16 * 4];
        builder.set_source_pixels(&pixels, 16, 16).unwrap();
        builder.run().unwrap();

        let level1 = builder.read_image(1).unwrap();
        assert!(level1.iter().all(|&b| b == 100));
    }
}
