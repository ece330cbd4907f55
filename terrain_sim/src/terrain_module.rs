//! The terrain simulation module: a procedurally generated, classified scalar field.

use std::{ops::Range, sync::Arc};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};

use crate::{
    config::{ConfigError, TerrainConfig},
    fieldgen::FieldGenerator,
    grid::FieldGrid,
    hashing::field_checksum,
    metrics::FieldMetrics,
    module::{Key, ModuleDescriptor, SimModule, MODULE_ABI_VERSION},
    raster::{render_field, Canvas, DisplayMode},
    state::{adopt_state, StateBlob},
    tiles::{TileCategory, TileClassifier, TileWeightTable},
};

/// Bytes in the terrain state layout.
pub const TERRAIN_STATE_SIZE: usize = 24;

const TICKS: Range<usize> = 0..4;
const SEED: Range<usize> = 4..12;
const GENERATION: Range<usize> = 12..16;
const DISPLAY_MODE: usize = 16;

/// Decoded view of the terrain state blob.
///
/// Layout (little endian): `ticks:u32 @0`, `seed:u64 @4`, `generation:u32 @12`,
/// `display_mode:u8 @16`, bytes `17..24` reserved and written as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerrainState {
    pub ticks: u32,
    /// Zero means "not seeded yet"; the configured seed is used instead.
    pub seed: u64,
    pub generation: u32,
    pub display_mode: DisplayMode,
}

impl TerrainState {
    /// Decode untrusted bytes. Short input reads as zero and unknown display
    /// modes fall back to the terrain view.
    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            ticks: read_u32(bytes, TICKS),
            seed: bytes
                .get(SEED)
                .and_then(|raw| raw.try_into().ok())
                .map(u64::from_le_bytes)
                .unwrap_or(0),
            generation: read_u32(bytes, GENERATION),
            display_mode: DisplayMode::from_u8(bytes.get(DISPLAY_MODE).copied().unwrap_or(0)),
        }
    }

    pub fn encode_into(&self, bytes: &mut [u8]) {
        if bytes.len() < TERRAIN_STATE_SIZE {
            return;
        }
        bytes[TICKS].copy_from_slice(&self.ticks.to_le_bytes());
        bytes[SEED].copy_from_slice(&self.seed.to_le_bytes());
        bytes[GENERATION].copy_from_slice(&self.generation.to_le_bytes());
        bytes[DISPLAY_MODE] = self.display_mode.as_u8();
        bytes[DISPLAY_MODE + 1..TERRAIN_STATE_SIZE].fill(0);
    }
}

fn read_u32(bytes: &[u8], range: Range<usize>) -> u32 {
    bytes
        .get(range)
        .and_then(|raw| raw.try_into().ok())
        .map(u32::from_le_bytes)
        .unwrap_or(0)
}

pub struct TerrainModule {
    config: Arc<TerrainConfig>,
    generator: FieldGenerator,
    classifier: TileClassifier,
    grid: FieldGrid,
    state: StateBlob,
    current: TerrainState,
    metrics: FieldMetrics,
    checksum: u64,
}

impl TerrainModule {
    pub const NAME: &'static str = "terrain";

    pub fn new(config: Arc<TerrainConfig>) -> Result<Self, ConfigError> {
        config.validate()?;
        let table = TileWeightTable::new(config.tiles.clone())?;
        let classifier = TileClassifier::new(table, config.grid.value_range)?;
        let generator = FieldGenerator::new(&config.generator, config.grid.value_range);
        let (grid_w, grid_h) = config.grid_size();

        Ok(Self {
            generator,
            classifier,
            grid: FieldGrid::new(grid_w, grid_h),
            state: StateBlob::zeroed(TERRAIN_STATE_SIZE),
            current: TerrainState::default(),
            metrics: FieldMetrics::default(),
            checksum: 0,
            config,
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn grid(&self) -> &FieldGrid {
        &self.grid
    }

    pub fn classifier(&self) -> &TileClassifier {
        &self.classifier
    }

    pub fn metrics(&self) -> &FieldMetrics {
        &self.metrics
    }

    /// FNV-1a checksum of the field produced by the last regeneration.
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    pub fn terrain_state(&self) -> TerrainState {
        self.current
    }

    fn commit(&mut self) {
        self.current.encode_into(self.state.as_bytes_mut());
    }

    fn field_rng(&self) -> ChaCha8Rng {
        let salt = (self.current.generation as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        ChaCha8Rng::seed_from_u64(self.current.seed ^ salt)
    }

    fn regenerate(&mut self) {
        let mut rng = self.field_rng();
        self.generator.generate(&mut self.grid, &mut rng);
        self.metrics = FieldMetrics::collect(&self.grid, &self.classifier);
        self.checksum = field_checksum(&self.grid);

        info!(
            target: "terrain::module",
            seed = self.current.seed,
            generation = self.current.generation,
            mode = ?self.generator.mode(),
            checksum = self.checksum,
            max_value = self.metrics.max_value,
            mean_value = self.metrics.mean_value,
            water_share = self.metrics.share(TileCategory::Water),
            "field.regenerated"
        );
    }
}

impl SimModule for TerrainModule {
    fn init(&mut self) -> ModuleDescriptor {
        let (width, height) = self.config.screen_size();
        ModuleDescriptor {
            name: Self::NAME.to_string(),
            abi_version: MODULE_ABI_VERSION,
            width,
            height,
            target_fps: self.config.screen.target_fps,
            state_size: TERRAIN_STATE_SIZE,
        }
    }

    fn get_state(&self) -> &[u8] {
        self.state.as_bytes()
    }

    fn reload_state(&mut self, previous: &[u8]) {
        let adopted = adopt_state(previous, TERRAIN_STATE_SIZE)
            .unwrap_or_else(|| StateBlob::zeroed(TERRAIN_STATE_SIZE));
        self.current = TerrainState::decode(adopted.as_bytes());
        self.state = adopted;

        if self.current.seed == 0 {
            self.current.seed = self.config.generator.seed;
        }
        self.commit();

        debug!(
            target: "terrain::module",
            incoming_bytes = previous.len(),
            state_size = TERRAIN_STATE_SIZE,
            ticks = self.current.ticks,
            "module.state_adopted"
        );
        self.regenerate();
    }

    fn update(&mut self, canvas: &mut Canvas<'_>, delta_seconds: f32) {
        self.current.ticks = self.current.ticks.wrapping_add(1);
        self.commit();

        render_field(
            canvas,
            &self.grid,
            &self.classifier,
            self.current.display_mode,
            self.config.render.background,
        );
        trace!(
            target: "terrain::module",
            ticks = self.current.ticks,
            delta_seconds,
            "frame.rendered"
        );
    }

    fn on_key(&mut self, key: Key) {
        let Key::Char(c) = key else {
            return;
        };

        if c == self.config.keys.toggle_view {
            self.current.display_mode = self.current.display_mode.toggled();
            self.commit();
            debug!(
                target: "terrain::module",
                mode = ?self.current.display_mode,
                "display_mode.toggled"
            );
        } else if c == self.config.keys.regenerate {
            self.current.generation = self.current.generation.wrapping_add(1);
            self.commit();
            self.regenerate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;

    fn small_config() -> Arc<TerrainConfig> {
        let mut config = TerrainConfig::default();
        config.screen.width_ratio = 4;
        config.screen.height_ratio = 3;
        config.screen.scale = 8;
        config.grid.cell_pixels = 2;
        config.render.background = 0;
        config.generator = GeneratorConfig {
            min_bumps: 20,
            max_bumps: 40,
            min_radius: 1,
            max_radius: 4,
            ..GeneratorConfig::default()
        };
        Arc::new(config)
    }

    fn started(config: Arc<TerrainConfig>) -> TerrainModule {
        let mut module = TerrainModule::new(config).expect("valid config");
        module.init();
        module.reload_state(&[]);
        module
    }

    fn frame(module: &mut TerrainModule) -> Vec<u32> {
        let descriptor = module.init();
        let (w, h) = (descriptor.width as usize, descriptor.height as usize);
        let mut pixels = vec![0u32; w * h];
        let mut canvas = Canvas::new(&mut pixels, w, h).unwrap();
        module.update(&mut canvas, 1.0 / 60.0);
        pixels
    }

    #[test]
    fn state_layout_round_trips() {
        let state = TerrainState {
            ticks: 0xDEAD_BEEF,
            seed: 0x0102_0304_0506_0708,
            generation: 17,
            display_mode: DisplayMode::Heightmap,
        };
        let mut bytes = [0xAAu8; TERRAIN_STATE_SIZE];
        state.encode_into(&mut bytes);

        assert_eq!(&bytes[0..4], &0xDEAD_BEEFu32.to_le_bytes());
        assert!(bytes[17..].iter().all(|&b| b == 0));
        assert_eq!(TerrainState::decode(&bytes), state);
    }

    #[test]
    fn decode_tolerates_short_and_garbage_input() {
        let decoded = TerrainState::decode(&[5, 0, 0, 0]);
        assert_eq!(decoded.ticks, 5);
        assert_eq!(decoded.seed, 0);
        assert_eq!(decoded.display_mode, DisplayMode::Terrain);

        let mut garbage = [0xFFu8; TERRAIN_STATE_SIZE];
        garbage[DISPLAY_MODE] = 77;
        assert_eq!(
            TerrainState::decode(&garbage).display_mode,
            DisplayMode::Terrain
        );
    }

    #[test]
    fn descriptor_reflects_config() {
        let mut module = TerrainModule::new(small_config()).unwrap();
        let descriptor = module.init();
        assert_eq!(descriptor.name, "terrain");
        assert_eq!(descriptor.abi_version, MODULE_ABI_VERSION);
        assert_eq!((descriptor.width, descriptor.height), (32, 24));
        assert_eq!(descriptor.target_fps, 60);
        assert_eq!(descriptor.state_size, TERRAIN_STATE_SIZE);
    }

    #[test]
    fn fresh_start_uses_configured_seed() {
        let module = started(small_config());
        let state = module.terrain_state();
        assert_eq!(state.seed, 1337);
        assert_eq!(state.generation, 0);
        assert_eq!(module.get_state().len(), TERRAIN_STATE_SIZE);
        assert!(module.grid().cells().iter().all(|cell| cell.value < 1024));
        assert!(module.metrics().max_value > 0);
    }

    #[test]
    fn update_counts_ticks_and_paints_every_pixel() {
        let mut module = started(small_config());
        let pixels = frame(&mut module);
        frame(&mut module);

        assert_eq!(module.terrain_state().ticks, 2);
        assert_eq!(TerrainState::decode(module.get_state()).ticks, 2);
        // 32 / 16 divides evenly, so no background shows through.
        assert!(pixels.iter().all(|&p| p != 0));
    }

    #[test]
    fn reload_with_same_state_reproduces_field() {
        let mut first = started(small_config());
        first.on_key(Key::Char('g'));
        frame(&mut first);
        let carried = first.get_state().to_vec();

        let mut second = TerrainModule::new(small_config()).unwrap();
        second.init();
        second.reload_state(&carried);

        assert_eq!(second.get_state(), first.get_state());
        assert_eq!(second.checksum(), first.checksum());
        assert_eq!(second.grid(), first.grid());
    }

    #[test]
    fn regenerate_key_advances_generation() {
        let mut module = started(small_config());
        let before = module.checksum();
        module.on_key(Key::Char('g'));
        assert_eq!(module.terrain_state().generation, 1);
        assert_ne!(module.checksum(), before);
    }

    #[test]
    fn toggle_key_switches_display_mode() {
        let mut module = started(small_config());
        let terrain = frame(&mut module);

        module.on_key(Key::Char('b'));
        assert_eq!(module.terrain_state().display_mode, DisplayMode::Heightmap);
        let heightmap = frame(&mut module);
        assert_ne!(terrain, heightmap);

        module.on_key(Key::Char('b'));
        assert_eq!(module.terrain_state().display_mode, DisplayMode::Terrain);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut module = started(small_config());
        let before = module.get_state().to_vec();
        module.on_key(Key::Char('x'));
        module.on_key(Key::Code(65307));
        assert_eq!(module.get_state(), before.as_slice());
    }
}
