//! Owner of the active module.
//!
//! The host is the only place that decides which implementation is live. A reload
//! copies the outgoing state, asks the loader for a complete replacement and only
//! then swaps; any failure leaves the running module exactly as it was.

use std::mem;

use tracing::{info, warn};

use crate::{
    loader::{LoadError, LoadedModule, ModuleLoader},
    module::{Key, ModuleDescriptor},
    raster::Canvas,
    state,
};

/// What the host did with a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDispatch {
    Forwarded,
    Reloaded,
    ReloadFailed,
}

pub struct ModuleHost<L> {
    loader: L,
    active: LoadedModule,
    reload_key: Key,
    reloads: u64,
    failed_reloads: u64,
}

impl<L: ModuleLoader> ModuleHost<L> {
    /// Perform the initial load. There is no previous module to fall back to, so
    /// any failure is returned to the caller.
    pub fn start(mut loader: L, reload_key: impl Into<Key>) -> Result<Self, LoadError> {
        let mut active = loader.load()?;
        active.module.reload_state(&[]);
        info!(
            target: "terrain::host",
            module = %active.descriptor.name,
            width = active.descriptor.width,
            height = active.descriptor.height,
            target_fps = active.descriptor.target_fps,
            state_size = active.descriptor.state_size,
            "module.started"
        );
        Ok(Self {
            loader,
            active,
            reload_key: reload_key.into(),
            reloads: 0,
            failed_reloads: 0,
        })
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.active.descriptor
    }

    /// State bytes of the active module. Opaque to the host.
    pub fn active_state(&self) -> &[u8] {
        self.active.module.get_state()
    }

    pub fn reload_key(&self) -> Key {
        self.reload_key
    }

    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    pub fn failed_reload_count(&self) -> u64 {
        self.failed_reloads
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Swap in a freshly loaded implementation, carrying the current state across.
    ///
    /// Blocks for as long as the loader takes, including any build step.
    pub fn reload(&mut self) -> Result<&ModuleDescriptor, LoadError> {
        let carried = state::extract(self.active.module.as_ref());

        let mut next = match self.loader.load() {
            Ok(next) => next,
            Err(err) => {
                self.failed_reloads += 1;
                warn!(
                    target: "terrain::host",
                    module = %self.active.descriptor.name,
                    error = %err,
                    "module.reload.failed"
                );
                return Err(err);
            }
        };

        state::inject(next.module.as_mut(), &carried);
        let retired = mem::replace(&mut self.active, next);
        self.reloads += 1;
        info!(
            target: "terrain::host",
            from = %retired.descriptor.name,
            to = %self.active.descriptor.name,
            carried_bytes = carried.len(),
            state_size = self.active.descriptor.state_size,
            reloads = self.reloads,
            "module.reload.completed"
        );
        Ok(&self.active.descriptor)
    }

    pub fn update(&mut self, canvas: &mut Canvas<'_>, delta_seconds: f32) {
        self.active.module.update(canvas, delta_seconds);
    }

    /// Route a key press. The reload key never reaches the module.
    pub fn handle_key(&mut self, key: Key) -> KeyDispatch {
        if key != self.reload_key {
            self.active.module.on_key(key);
            return KeyDispatch::Forwarded;
        }
        match self.reload() {
            Ok(_) => KeyDispatch::Reloaded,
            Err(_) => KeyDispatch::ReloadFailed,
        }
    }
}
