//! Handle abstractions shared by the backend implementations.

/// Handle to an image in device memory.
pub trait ImageData: Send + Sync + AsAny {
    /// Image dimensions (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// Width.
    fn width(&self) -> u32 { self.dimensions().0 }

    /// Height.
    fn height(&self) -> u32 { self.dimensions().1 }

    /// Size in bytes of device memory used.
    fn size_bytes(&self) -> u64 {
        let (w, h) = self.dimensions();
        (w as u64) * (h as u64) * 4 // packed RGBA8
    }
}

/// Handle to a compiled device program.
pub trait ProgramHandle: Send + Sync + AsAny {
    /// Entry point the program was built for.
    fn entry_point(&self) -> &str;
}

/// Helper trait for downcasting.
pub trait AsAny: 'static {
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
