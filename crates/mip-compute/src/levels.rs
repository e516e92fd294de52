//! Pyramid level math.
//!
//! Level 0 is the source image. Each further level halves both dimensions
//! (integer division). The chain stops before a level where either
//! dimension would collapse to 1 or below.

/// Number of reduction levels for a source of the given size.
///
/// Counts successive halvings after which both dimensions remain > 1.
/// A 256x256 source yields 7 levels (level 7 is 2x2); a 3x3 source
/// yields none.
pub fn level_count(width: u32, height: u32) -> usize {
    let mut n = 0;
    let (mut w, mut h) = (width, height);
    loop {
        w /= 2;
        h /= 2;
        if w > 1 && h > 1 {
            n += 1;
        } else {
            break;
        }
    }
    n
}

/// Dimensions of the given level: `floor(size / 2^level)`.
pub fn level_dims(width: u32, height: u32, level: usize) -> (u32, u32) {
    (width >> level, height >> level)
}
