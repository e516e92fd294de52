//! WGSL shader sources for the downsample pipelines.
//!
//! Images are packed RGBA8, one u32 texel per pixel. Both shaders run in
//! 8x8 tiles over the destination grid with a guard for the ragged edge.

/// Nearest-neighbor reduction. Copies the packed texel untouched.
pub const DOWNSAMPLE_NEAREST: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<u32>;
@group(0) @binding(1) var<storage, read_write> dst: array<u32>;
@group(0) @binding(2) var<uniform> src_dims: vec4<u32>;  // sw, sh, 0, 0
@group(0) @binding(3) var<uniform> dst_dims: vec4<u32>;  // dw, dh, step, 0

@compute @workgroup_size(8, 8)
fn downsample_nearest(@builtin(global_invocation_id) id: vec3<u32>) {
    let dx = id.x;
    let dy = id.y;
    if dx >= dst_dims.x || dy >= dst_dims.y { return; }

    let step = dst_dims.z;
    let sx = min(dx * step, src_dims.x - 1u);
    let sy = min(dy * step, src_dims.y - 1u);

    dst[dy * dst_dims.x + dx] = src[sy * src_dims.x + sx];
}
"#;

/// Bilinear reduction. Samples the 2x2 neighborhood around the texel
/// center `(d + 0.5) * step - 0.5` and requantizes with pack4x8unorm.
pub const DOWNSAMPLE_LINEAR: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<u32>;
@group(0) @binding(1) var<storage, read_write> dst: array<u32>;
@group(0) @binding(2) var<uniform> src_dims: vec4<u32>;  // sw, sh, 0, 0
@group(0) @binding(3) var<uniform> dst_dims: vec4<u32>;  // dw, dh, step, 0

fn texel(x: u32, y: u32) -> vec4<f32> {
    return unpack4x8unorm(src[y * src_dims.x + x]);
}

@compute @workgroup_size(8, 8)
fn downsample_linear(@builtin(global_invocation_id) id: vec3<u32>) {
    let dx = id.x;
    let dy = id.y;
    if dx >= dst_dims.x || dy >= dst_dims.y { return; }

    let step = f32(dst_dims.z);
    let sx = max((f32(dx) + 0.5) * step - 0.5, 0.0);
    let sy = max((f32(dy) + 0.5) * step - 0.5, 0.0);

    let fx = sx - floor(sx);
    let fy = sy - floor(sy);

    let x0 = min(u32(sx), src_dims.x - 1u);
    let y0 = min(u32(sy), src_dims.y - 1u);
    let x1 = min(x0 + 1u, src_dims.x - 1u);
    let y1 = min(y0 + 1u, src_dims.y - 1u);

    let top = mix(texel(x0, y0), texel(x1, y0), fx);
    let bot = mix(texel(x0, y1), texel(x1, y1), fx);

    dst[dy * dst_dims.x + dx] = pack4x8unorm(mix(top, bot, fy));
}
"#;
