//! The contract between the host and a hot-swappable simulation module.
//!
//! The host only ever talks to a module through [`SimModule`]. A module owns its
//! mutable state as a flat byte blob so that a newer implementation can adopt the
//! bytes left behind by an older one.

use crate::raster::Canvas;

/// Bumped whenever [`SimModule`] or the meaning of [`ModuleDescriptor`] changes.
pub const MODULE_ABI_VERSION: u32 = 1;

/// Static facts a module reports once per load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub abi_version: u32,
    /// Presentation surface size in pixels.
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Size in bytes of the state blob this version declares.
    pub state_size: usize,
}

/// A discrete key press forwarded from the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Code(u32),
}

impl From<char> for Key {
    fn from(value: char) -> Self {
        Key::Char(value)
    }
}

/// Entry points every module implementation provides.
///
/// All methods are total: a module must not panic on any input, including state
/// bytes written by a different version of itself.
pub trait SimModule {
    /// Describe this implementation. Called exactly once per load.
    fn init(&mut self) -> ModuleDescriptor;

    /// Current state blob; stays owned by the module.
    fn get_state(&self) -> &[u8];

    /// Adopt the state left by the previous implementation (empty on first load),
    /// then rebuild anything derived from it.
    fn reload_state(&mut self, previous: &[u8]);

    /// Run one frame and paint it into `canvas`.
    fn update(&mut self, canvas: &mut Canvas<'_>, delta_seconds: f32);

    fn on_key(&mut self, key: Key);
}
