//! Backend report command.

use anyhow::{Context, Result};

use mip_compute::{DeviceContext, describe_backends};

pub fn run() -> Result<()> {
    print!("{}", describe_backends());

    let device = DeviceContext::new().context("Failed to initialize compute device")?;
    println!("Selected: {} ({})", device.backend().name(), device.device_name());
    Ok(())
}
