/// Frame size in logical pixels.
///
/// Sprite `dest` positions are expressed in this space; the sprite shader maps
/// `[0, width] x [0, height]` onto clip space with +Y down.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// False for zero-sized (minimized) or non-finite frames.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn size(self) -> [f32; 2] {
        [self.width, self.height]
    }
}
