use image::{Rgba, RgbaImage};

/// Generated sprite sheet used when no atlas image is configured.
///
/// Each tile gets its own hue with a one-texel transparent border, so
/// neighbouring tiles never bleed into each other under linear filtering.
pub fn checker_atlas(width: u32, height: u32, tile_w: u32, tile_h: u32) -> RgbaImage {
    let cols = (width / tile_w.max(1)).max(1);

    RgbaImage::from_fn(width, height, |x, y| {
        let (tx, ty) = (x / tile_w.max(1), y / tile_h.max(1));
        let (lx, ly) = (x % tile_w.max(1), y % tile_h.max(1));

        if lx == 0 || ly == 0 || lx + 1 == tile_w || ly + 1 == tile_h {
            return Rgba([0, 0, 0, 0]);
        }

        let index = ty * cols + tx;
        let [r, g, b] = hue(index.wrapping_mul(37) % 360);
        let shade = if (lx / 4 + ly / 4) % 2 == 0 { 255 } else { 200 };
        Rgba([scale(r, shade), scale(g, shade), scale(b, shade), 255])
    })
}

/// Tile origins (texels) in row-major order; partial tiles are skipped.
pub fn tile_origins(width: u32, height: u32, tile_w: u32, tile_h: u32) -> impl Iterator<Item = [u32; 2]> {
    let rows = height / tile_h.max(1);
    let cols = width / tile_w.max(1);
    (0..rows).flat_map(move |r| (0..cols).map(move |c| [c * tile_w, r * tile_h]))
}

fn scale(c: u8, shade: u16) -> u8 {
    ((c as u16 * shade) / 255) as u8
}

// Fully saturated RGB for a hue in degrees.
fn hue(deg: u32) -> [u8; 3] {
    let x = ((deg % 60) * 255 / 60) as u8;
    match deg / 60 {
        0 => [255, x, 0],
        1 => [255 - x, 255, 0],
        2 => [0, 255, x],
        3 => [0, 255 - x, 255],
        4 => [x, 0, 255],
        _ => [255, 0, 255 - x],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atlas_has_requested_size() {
        let img = checker_atlas(64, 32, 16, 16);
        assert_eq!(img.dimensions(), (64, 32));
    }

    #[test]
    fn tile_borders_are_transparent() {
        let img = checker_atlas(32, 32, 16, 16);
        assert_eq!(img.get_pixel(0, 5)[3], 0);
        assert_eq!(img.get_pixel(15, 5)[3], 0);
        assert_eq!(img.get_pixel(16, 5)[3], 0);
        assert_eq!(img.get_pixel(5, 5)[3], 255);
    }

    #[test]
    fn neighbouring_tiles_differ() {
        let img = checker_atlas(32, 16, 16, 16);
        assert_ne!(img.get_pixel(5, 5), img.get_pixel(21, 5));
    }

    #[test]
    fn origins_cover_whole_tiles_only() {
        let origins: Vec<_> = tile_origins(40, 32, 16, 16).collect();
        assert_eq!(origins, vec![[0, 0], [16, 0], [0, 16], [16, 16]]);
    }

    #[test]
    fn hue_wheel_corners() {
        assert_eq!(hue(0), [255, 0, 0]);
        assert_eq!(hue(120), [0, 255, 0]);
        assert_eq!(hue(240), [0, 0, 255]);
    }
}
