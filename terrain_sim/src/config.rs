//! Configuration for the terrain simulation module.
//!
//! Loaded from `terrain_config.json` with support for an environment variable override.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    fieldgen::{FalloffEnvelope, GeneratorMode},
    tiles::{TileCategory, TileWeight},
};

pub const BUILTIN_TERRAIN_CONFIG: &str = include_str!("data/terrain_config.json");

/// Root configuration for the terrain module.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub screen: ScreenConfig,
    pub grid: GridConfig,
    pub generator: GeneratorConfig,
    /// Ordered category weights; order decides the value sub-ranges.
    pub tiles: Vec<TileWeight>,
    pub render: RenderConfig,
    pub keys: KeyConfig,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            screen: ScreenConfig::default(),
            grid: GridConfig::default(),
            generator: GeneratorConfig::default(),
            tiles: default_tiles(),
            render: RenderConfig::default(),
            keys: KeyConfig::default(),
        }
    }
}

fn default_tiles() -> Vec<TileWeight> {
    vec![
        TileWeight::new(TileCategory::Water, 8),
        TileWeight::new(TileCategory::Sand, 2),
        TileWeight::new(TileCategory::Grass, 4),
        TileWeight::new(TileCategory::Stone, 5),
        TileWeight::new(TileCategory::Snow, 2),
    ]
}

impl TerrainConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_TERRAIN_CONFIG)
                .expect("builtin terrain config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TerrainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        TerrainConfig::from_json_str(&contents)
    }

    /// Pixel dimensions of the presentation surface.
    pub fn screen_size(&self) -> (u32, u32) {
        (
            self.screen.width_ratio * self.screen.scale,
            self.screen.height_ratio * self.screen.scale,
        )
    }

    /// Grid dimensions in cells, one cell per `cell_pixels` square of screen.
    pub fn grid_size(&self) -> (u32, u32) {
        let (width, height) = self.screen_size();
        let cell = self.grid.cell_pixels.max(1);
        (width / cell, height / cell)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = self.screen_size();
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid("screen dimensions must be non-zero"));
        }
        let (grid_w, grid_h) = self.grid_size();
        if self.grid.cell_pixels == 0 || grid_w == 0 || grid_h == 0 {
            return Err(ConfigError::Invalid("grid must contain at least one cell"));
        }
        if self.screen.target_fps == 0 {
            return Err(ConfigError::Invalid("target_fps must be non-zero"));
        }
        if self.grid.value_range < 2 {
            return Err(ConfigError::Invalid("value_range must be at least 2"));
        }
        // Diffusion deltas are i32 and span the whole range.
        if self.grid.value_range > i32::MAX as u32 {
            return Err(ConfigError::Invalid("value_range must fit in an i32"));
        }
        if self.tiles.is_empty() {
            return Err(ConfigError::Invalid("tile weight table is empty"));
        }
        if self.tiles.iter().any(|tile| tile.weight == 0) {
            return Err(ConfigError::Invalid("tile weights must be positive"));
        }
        let generator = &self.generator;
        if generator.min_bumps > generator.max_bumps {
            return Err(ConfigError::Invalid("min_bumps exceeds max_bumps"));
        }
        if generator.min_radius == 0 || generator.min_radius > generator.max_radius {
            return Err(ConfigError::Invalid(
                "bump radius range must be non-empty and start above zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width_ratio: u32,
    pub height_ratio: u32,
    pub scale: u32,
    pub target_fps: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width_ratio: 16,
            height_ratio: 9,
            scale: 70,
            target_fps: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub cell_pixels: u32,
    /// Exclusive upper bound of every cell value.
    pub value_range: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_pixels: 2,
            value_range: 1024,
        }
    }
}

/// Tuning for the scalar field generator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub mode: GeneratorMode,
    pub seed: u64,
    pub min_bumps: u32,
    pub max_bumps: u32,
    pub min_radius: u32,
    pub max_radius: u32,
    pub bump_amount: u32,
    /// Denominator of the falloff; `radius` fades bumps to zero on their rim.
    pub envelope: FalloffEnvelope,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::FalloffBumps,
            seed: 1337,
            min_bumps: 1024,
            max_bumps: 2048,
            min_radius: 2,
            max_radius: 20,
            bump_amount: 224,
            envelope: FalloffEnvelope::Padded,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub background: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: 0xFF21_2121,
        }
    }
}

/// Keys the terrain module reacts to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub toggle_view: char,
    pub regenerate: char,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            toggle_view: 'b',
            regenerate: 'g',
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Load the terrain configuration from `TERRAIN_CONFIG_PATH`, falling back to the builtin copy.
pub fn load_terrain_config_from_env() -> Arc<TerrainConfig> {
    let Some(path) = env::var("TERRAIN_CONFIG_PATH").ok().map(PathBuf::from) else {
        tracing::info!(target: "terrain::config", "terrain_config.loaded=builtin");
        return TerrainConfig::builtin();
    };

    match TerrainConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "terrain::config",
                path = %path.display(),
                "terrain_config.loaded=file"
            );
            Arc::new(config)
        }
        Err(err) => {
            tracing::warn!(
                target: "terrain::config",
                path = %path.display(),
                error = %err,
                "terrain_config.load_failed"
            );
            TerrainConfig::builtin()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_matches_defaults() {
        let config = TerrainConfig::builtin();
        assert!(config.validate().is_ok());
        assert_eq!(config.screen_size(), (1120, 630));
        assert_eq!(config.grid_size(), (560, 315));
        assert_eq!(config.grid.value_range, 1024);
        assert_eq!(config.generator.mode, GeneratorMode::FalloffBumps);
        assert_eq!(config.tiles, default_tiles());
        assert_eq!(config.render.background, 0xFF21_2121);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = TerrainConfig::from_json_str(r#"{ "generator": { "mode": "diffusion" } }"#)
            .expect("partial config should parse");
        assert_eq!(config.generator.mode, GeneratorMode::Diffusion);
        assert_eq!(config.generator.max_radius, 20);
        assert_eq!(config.tiles.len(), 5);
        assert_eq!(config.keys.regenerate, 'g');
        assert_eq!(config.generator.envelope, FalloffEnvelope::Padded);

        let rim = TerrainConfig::from_json_str(r#"{ "generator": { "envelope": "radius" } }"#)
            .expect("envelope should parse");
        assert_eq!(rim.generator.envelope, FalloffEnvelope::Radius);
    }

    #[test]
    fn rejects_empty_tile_table() {
        let err = TerrainConfig::from_json_str(r#"{ "tiles": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_weight_and_inverted_ranges() {
        let zero = r#"{ "tiles": [ { "category": "water", "weight": 0 } ] }"#;
        assert!(TerrainConfig::from_json_str(zero).is_err());

        let inverted = r#"{ "generator": { "min_radius": 9, "max_radius": 3 } }"#;
        assert!(TerrainConfig::from_json_str(inverted).is_err());
    }

    #[test]
    fn rejects_value_range_beyond_i32() {
        let huge = r#"{ "grid": { "value_range": 4294967295 }, "generator": { "mode": "diffusion" } }"#;
        assert!(matches!(
            TerrainConfig::from_json_str(huge),
            Err(ConfigError::Invalid(_))
        ));

        let widest = format!(r#"{{ "grid": {{ "value_range": {} }} }}"#, i32::MAX);
        assert!(TerrainConfig::from_json_str(&widest).is_ok());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TerrainConfig::from_file(Path::new("/nonexistent/terrain.json")).unwrap_err();
        assert!(err.to_string().contains("nonexistent"));
    }
}
