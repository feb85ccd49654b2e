use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use websprite_engine::render::atlas::check_dimensions;

/// How sprites move each frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Motion {
    /// Independent velocities, reflected at the frame edges.
    #[default]
    Bounce,
    /// All sprites on one rotating spiral around the frame centre.
    Spiral,
}

/// Demo settings, read from a JSON file.
///
/// Every field is optional in the file; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Sprite sheet image. `None` uses a generated checker atlas.
    pub atlas: Option<PathBuf>,
    pub atlas_w: u32,
    pub atlas_h: u32,
    pub tile_w: u32,
    pub tile_h: u32,

    /// On-screen size multiplier for each tile.
    pub scale: f32,

    /// Depth range mapped onto clip-space z.
    pub frame_depth: f32,

    pub initial_capacity: usize,

    /// Upper bound for a sprite's speed in logical px/s.
    pub max_speed: f32,

    pub motion: Motion,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            atlas: None,
            atlas_w: 1024,
            atlas_h: 1024,
            tile_w: 16,
            tile_h: 16,
            scale: 2.0,
            frame_depth: 65536.0,
            initial_capacity: 4096,
            max_speed: 33.0,
            motion: Motion::Bounce,
        }
    }
}

impl DemoConfig {
    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;

        log::info!("config loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.tile_w > 0 && self.tile_h > 0, "tile size must be non-zero");
        ensure!(
            self.tile_w <= self.atlas_w && self.tile_h <= self.atlas_h,
            "tile {}x{} does not fit atlas {}x{}",
            self.tile_w,
            self.tile_h,
            self.atlas_w,
            self.atlas_h
        );
        check_dimensions(self.atlas_w, self.atlas_h)?;
        ensure!(self.scale > 0.0, "scale must be positive");
        ensure!(self.frame_depth > 0.0, "frame_depth must be positive");
        ensure!(self.max_speed >= 0.0, "max_speed must not be negative");
        Ok(())
    }

    /// Tiles per atlas row and column.
    pub fn tile_grid(&self) -> (u32, u32) {
        (self.atlas_w / self.tile_w, self.atlas_h / self.tile_h)
    }

    /// On-screen sprite size in logical px.
    pub fn sprite_size(&self) -> [f32; 2] {
        [self.tile_w as f32 * self.scale, self.tile_h as f32 * self.scale]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = DemoConfig::from_json("{}").unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config =
            DemoConfig::from_json(r#"{ "atlas": "sheet.png", "tile_w": 32, "motion": "spiral" }"#)
                .unwrap();
        assert_eq!(config.atlas.as_deref(), Some(Path::new("sheet.png")));
        assert_eq!(config.tile_w, 32);
        assert_eq!(config.tile_h, 16);
        assert_eq!(config.motion, Motion::Spiral);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(DemoConfig::from_json(r#"{ "tileW": 16 }"#).is_err());
    }

    #[test]
    fn zero_tile_rejected() {
        assert!(DemoConfig::from_json(r#"{ "tile_w": 0 }"#).is_err());
    }

    #[test]
    fn tile_larger_than_atlas_rejected() {
        let err = DemoConfig::from_json(r#"{ "atlas_w": 8, "atlas_h": 8 }"#).unwrap_err();
        assert!(format!("{err:#}").contains("does not fit"));
    }

    #[test]
    fn non_power_of_two_atlas_rejected() {
        let err = DemoConfig::from_json(r#"{ "atlas_w": 1000 }"#).unwrap_err();
        assert!(format!("{err:#}").contains("power of two"));
        assert!(DemoConfig::from_json(r#"{ "atlas_w": 512, "atlas_h": 96 }"#).is_err());
        assert!(DemoConfig::from_json(r#"{ "atlas_w": 512, "atlas_h": 128 }"#).is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = DemoConfig::load(Path::new("definitely/not/here.json")).unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn grid_and_sprite_size() {
        let config = DemoConfig::default();
        assert_eq!(config.tile_grid(), (64, 64));
        assert_eq!(config.sprite_size(), [32.0, 32.0]);
    }
}
