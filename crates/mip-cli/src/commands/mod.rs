pub mod generate;
pub mod probe;

use anyhow::{Result, anyhow, bail};
use mip_compute::{Backend, Strategy};

pub fn parse_backend(name: &str) -> Result<Backend> {
    let backend = match name.to_lowercase().as_str() {
        "auto" => Backend::Auto,
        "cpu" => Backend::Cpu,
        "wgpu" | "gpu" => Backend::Wgpu,
        other => bail!("unknown backend: {other} (expected auto, cpu, wgpu)"),
    };

    if !backend.is_available() {
        return Err(anyhow!("backend {} is not available on this system", backend.name()));
    }
    Ok(backend)
}

pub fn parse_strategy(name: &str) -> Result<Strategy> {
    match name.to_lowercase().as_str() {
        "nearest" | "point" => Ok(Strategy::Nearest),
        "linear" | "bilinear" => Ok(Strategy::Linear),
        other => bail!("unknown strategy: {other} (expected nearest, linear)"),
    }
}
