//! Live-reloadable terrain simulation.
//!
//! A [`ModuleHost`] keeps exactly one [`SimModule`] implementation active and can
//! replace it at runtime while carrying the module's state bytes across the swap.
//! The bundled [`TerrainModule`] synthesizes a scalar field from radial bumps,
//! classifies it into weighted tile categories and rasterizes it every frame.

pub mod config;
pub mod fieldgen;
pub mod grid;
pub mod hashing;
pub mod host;
pub mod host_config;
pub mod loader;
pub mod metrics;
pub mod module;
pub mod raster;
pub mod state;
pub mod terrain_module;
pub mod tiles;

pub use config::{load_terrain_config_from_env, ConfigError, TerrainConfig};
pub use fieldgen::{FalloffEnvelope, FieldGenerator, GeneratorMode};
pub use grid::{FieldGrid, GridCell};
pub use hashing::{field_checksum, ChecksumHasher};
pub use host::{KeyDispatch, ModuleHost};
pub use host_config::{load_host_config_from_env, ChannelOrder, HostConfig};
pub use loader::{
    BuildStep, LoadError, LoadedModule, ManifestLoader, ModuleCatalog, ModuleLoader,
    ModuleManifest,
};
pub use metrics::FieldMetrics;
pub use module::{Key, ModuleDescriptor, SimModule, MODULE_ABI_VERSION};
pub use raster::{Canvas, CanvasError, DisplayMode};
pub use state::{adopt_state, StateBlob};
pub use terrain_module::{TerrainModule, TerrainState, TERRAIN_STATE_SIZE};
pub use tiles::{Classification, TileCategory, TileClassifier, TileWeight, TileWeightTable};
