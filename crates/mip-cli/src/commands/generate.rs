//! Pyramid generation command.

use anyhow::{Context, Result};
use tracing::info;

use mip_compute::{DeviceContext, MipPyramidBuilder};

use crate::GenerateArgs;

pub fn run(args: GenerateArgs, verbose: bool) -> Result<()> {
    let backend = super::parse_backend(&args.backend)?;
    let strategy = super::parse_strategy(&args.strategy)?;

    let device = DeviceContext::with_backend(backend)
        .context("Failed to initialize compute device")?;

    if verbose {
        println!("Backend: {} ({})", device.backend().name(), device.device_name());
        println!("Strategy: {}", strategy.name());
    }

    let mut builder = MipPyramidBuilder::with_strategy(device, strategy);
    builder.on_run_finished().connect(|| info!("pyramid run finished"));

    builder.set_source(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let (width, height) = builder.level_dims(0)?;
    if verbose {
        println!("Source: {}x{}, {} levels", width, height, builder.levels());
    }

    builder.run().context("Pyramid run failed")?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    for level in 0..=builder.levels() {
        let (w, h) = builder.level_dims(level)?;
        let pixels = builder.read_image(level)
            .with_context(|| format!("Failed to read level {level}"))?;

        let path = args.output.join(format!("level_{level}.png"));
        mip_io::write_png_rgba8(&path, &pixels, w, h)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        if verbose {
            println!("  Level {}: {}x{} -> {}", level, w, h, path.display());
        }
    }

    println!("Wrote {} levels to {}", builder.levels() + 1, args.output.display());
    Ok(())
}
