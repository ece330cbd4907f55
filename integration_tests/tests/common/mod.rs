#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::PathBuf;

use tempfile::TempDir;

use terrain_sim::{
    adopt_state, Canvas, Key, LoadError, LoadedModule, ModuleDescriptor, ModuleLoader, SimModule,
    MODULE_ABI_VERSION,
};

/// Small terrain tuning so scenario tests generate in microseconds.
/// Screen 64x36, grid 32x18.
pub const SMALL_TERRAIN_CONFIG: &str = r#"{
    "screen": { "width_ratio": 16, "height_ratio": 9, "scale": 4, "target_fps": 30 },
    "grid": { "cell_pixels": 2, "value_range": 1024 },
    "generator": { "seed": 42, "min_bumps": 8, "max_bumps": 16, "min_radius": 1, "max_radius": 4, "bump_amount": 400 },
    "render": { "background": 0 }
}"#;

/// Module whose entire state is a raw byte blob of a fixed declared size.
pub struct BlobModule {
    name: String,
    state_size: usize,
    fresh: Vec<u8>,
    state: Vec<u8>,
}

impl BlobModule {
    pub fn new(name: &str, state_size: usize) -> Self {
        Self {
            name: name.to_string(),
            state_size,
            fresh: Vec::new(),
            state: Vec::new(),
        }
    }

    /// Content adopted when the module starts with no previous state.
    pub fn with_fresh_state(mut self, bytes: &[u8]) -> Self {
        self.fresh = bytes.to_vec();
        self
    }

    pub fn boxed(self) -> Box<dyn SimModule> {
        Box::new(self)
    }
}

impl SimModule for BlobModule {
    fn init(&mut self) -> ModuleDescriptor {
        ModuleDescriptor {
            name: self.name.clone(),
            abi_version: MODULE_ABI_VERSION,
            width: 8,
            height: 4,
            target_fps: 30,
            state_size: self.state_size,
        }
    }

    fn get_state(&self) -> &[u8] {
        &self.state
    }

    fn reload_state(&mut self, previous: &[u8]) {
        let source = if previous.is_empty() {
            self.fresh.as_slice()
        } else {
            previous
        };
        self.state = adopt_state(source, self.state_size)
            .map(|blob| blob.into_bytes())
            .unwrap_or_default();
    }

    fn update(&mut self, canvas: &mut Canvas<'_>, _delta_seconds: f32) {
        let level = self.state.first().copied().unwrap_or(0) as u32;
        canvas.clear(0xFF00_0000 | level);
    }

    fn on_key(&mut self, key: Key) {
        if let (Key::Char(c), Some(first)) = (key, self.state.first_mut()) {
            *first = c as u8;
        }
    }
}

/// Hands out a fixed sequence of load results, then fails.
#[derive(Default)]
pub struct ScriptedLoader {
    queue: VecDeque<Result<Box<dyn SimModule>, LoadError>>,
    pub attempts: usize,
}

impl ScriptedLoader {
    pub fn then_module(mut self, module: BlobModule) -> Self {
        self.queue.push_back(Ok(module.boxed()));
        self
    }

    pub fn then_error(mut self, err: LoadError) -> Self {
        self.queue.push_back(Err(err));
        self
    }
}

impl ModuleLoader for ScriptedLoader {
    fn load(&mut self) -> Result<LoadedModule, LoadError> {
        self.attempts += 1;
        let module = self
            .queue
            .pop_front()
            .unwrap_or_else(|| Err(missing_image("exhausted.json")))?;
        LoadedModule::activate(module)
    }
}

pub fn missing_image(path: &str) -> LoadError {
    LoadError::ImageMissing {
        path: PathBuf::from(path),
        source: io::Error::new(io::ErrorKind::NotFound, "no such module image"),
    }
}

/// Write `contents` to `name` inside the test's temp dir.
pub fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

/// Render one frame of whatever module is active, sized from its descriptor.
pub fn render_frame<L: ModuleLoader>(host: &mut terrain_sim::ModuleHost<L>) -> Vec<u32> {
    let (width, height) = (host.descriptor().width, host.descriptor().height);
    let mut pixels = vec![0u32; width as usize * height as usize];
    let mut canvas =
        Canvas::new(&mut pixels, width as usize, height as usize).expect("descriptor-sized canvas");
    host.update(&mut canvas, 1.0 / 30.0);
    pixels
}
