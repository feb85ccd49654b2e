use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{ensure, Context, Result};

static NEXT_ATLAS_ID: AtomicU64 = AtomicU64::new(1);

/// Checks that both atlas dimensions are non-zero powers of two.
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    ensure!(width.is_power_of_two(), "atlas width {width} is not a power of two");
    ensure!(height.is_power_of_two(), "atlas height {height} is not a power of two");
    Ok(())
}

/// Sprite sheet texture sampled by the sprite renderer.
///
/// Sprites address the atlas in texels; the renderer converts to UVs with the
/// inverse size.
pub struct Atlas {
    id: u64,
    width: u32,
    height: u32,
    // Kept alive for the view.
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl Atlas {
    /// Loads an image file and uploads it as an RGBA atlas.
    pub fn load(device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to load atlas image {}", path.display()))?
            .to_rgba8();
        Self::from_rgba(device, queue, &image)
    }

    /// Uploads an in-memory RGBA image.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &image::RgbaImage,
    ) -> Result<Self> {
        let (width, height) = image.dimensions();
        check_dimensions(width, height)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("websprite atlas"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("websprite atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        log::info!("atlas uploaded: {width}x{height}");

        Ok(Self {
            id: NEXT_ATLAS_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            _texture: texture,
            view,
            sampler,
        })
    }

    /// Process-unique identity; bind groups are rebuilt when it changes.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// `[1 / width, 1 / height]`.
    pub fn inverse_size(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_of_two_dimensions_accepted() {
        assert!(check_dimensions(1, 1).is_ok());
        assert!(check_dimensions(256, 1024).is_ok());
    }

    #[test]
    fn non_power_of_two_rejected() {
        assert!(check_dimensions(0, 64).is_err());
        assert!(check_dimensions(64, 100).is_err());
        let err = check_dimensions(300, 256).unwrap_err();
        assert!(err.to_string().contains("width"));
    }
}
