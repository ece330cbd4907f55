//! Locating, building and instantiating module images.
//!
//! A module image is a small JSON manifest at a well-known path naming which
//! catalogued implementation to instantiate and, optionally, the config it runs
//! with. Loading either yields a fully initialised [`LoadedModule`] or an error;
//! nothing is activated halfway.

use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    config::{load_terrain_config_from_env, ConfigError, TerrainConfig},
    module::{ModuleDescriptor, SimModule, MODULE_ABI_VERSION},
    terrain_module::TerrainModule,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read module image {path:?}: {source}")]
    ImageMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed module manifest {path:?}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no module named `{0}` is registered")]
    UnknownModule(String),
    #[error("module `{module}` targets ABI {found}, host speaks {expected}")]
    AbiMismatch {
        module: String,
        expected: u32,
        found: u32,
    },
    #[error("module `{module}` reported an unusable descriptor: {reason}")]
    InvalidDescriptor { module: String, reason: &'static str },
    #[error("build command `{command}` exited with {status}")]
    Build { command: String, status: String },
    #[error("failed to spawn build command `{command}`: {source}")]
    BuildSpawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("module config rejected: {0}")]
    Config(#[from] ConfigError),
}

/// Contents of a module image.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleManifest {
    pub module: String,
    #[serde(default = "default_abi_version")]
    pub abi_version: u32,
    /// Module config file, relative to the manifest's directory.
    #[serde(default)]
    pub config: Option<PathBuf>,
    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_abi_version() -> u32 {
    MODULE_ABI_VERSION
}

impl ModuleManifest {
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let contents = fs::read_to_string(path).map_err(|source| LoadError::ImageMissing {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest: ModuleManifest =
            serde_json::from_str(&contents).map_err(|source| LoadError::Manifest {
                path: path.to_path_buf(),
                source,
            })?;
        manifest.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(manifest)
    }

    /// Resolved path of the module config, if the manifest names one.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                self.base_dir.join(path)
            }
        })
    }
}

/// Constructs a module from its manifest.
pub type ModuleFactory = fn(&ModuleManifest) -> Result<Box<dyn SimModule>, LoadError>;

/// Named module implementations the host may instantiate.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    factories: HashMap<String, ModuleFactory>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(TerrainModule::NAME, terrain_factory);
        catalog
    }

    pub fn register(&mut self, name: impl Into<String>, factory: ModuleFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn instantiate(&self, manifest: &ModuleManifest) -> Result<Box<dyn SimModule>, LoadError> {
        let factory = self
            .factories
            .get(&manifest.module)
            .ok_or_else(|| LoadError::UnknownModule(manifest.module.clone()))?;
        factory(manifest)
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ModuleCatalog").field("modules", &names).finish()
    }
}

fn terrain_factory(manifest: &ModuleManifest) -> Result<Box<dyn SimModule>, LoadError> {
    let config = match manifest.config_path() {
        Some(path) => Arc::new(TerrainConfig::from_file(&path)?),
        None => load_terrain_config_from_env(),
    };
    Ok(Box::new(TerrainModule::new(config)?))
}

/// A module that passed every load check, paired with the descriptor it reported.
pub struct LoadedModule {
    pub module: Box<dyn SimModule>,
    pub descriptor: ModuleDescriptor,
}

impl LoadedModule {
    /// Query the module's descriptor once and reject anything the host cannot drive.
    pub fn activate(mut module: Box<dyn SimModule>) -> Result<Self, LoadError> {
        let descriptor = module.init();
        validate_descriptor(&descriptor)?;
        Ok(Self { module, descriptor })
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

pub fn validate_descriptor(descriptor: &ModuleDescriptor) -> Result<(), LoadError> {
    if descriptor.abi_version != MODULE_ABI_VERSION {
        return Err(LoadError::AbiMismatch {
            module: descriptor.name.clone(),
            expected: MODULE_ABI_VERSION,
            found: descriptor.abi_version,
        });
    }
    let reason = if descriptor.width == 0 || descriptor.height == 0 {
        Some("surface size must be non-zero")
    } else if descriptor.target_fps == 0 {
        Some("target_fps must be non-zero")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(LoadError::InvalidDescriptor {
            module: descriptor.name.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Source of module implementations for the host.
pub trait ModuleLoader {
    fn load(&mut self) -> Result<LoadedModule, LoadError>;
}

/// External command run before each load, e.g. a rebuild of the module sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    program: String,
    args: Vec<String>,
}

impl BuildStep {
    /// `None` for an empty argv.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion; blocks the caller for as long as the command takes.
    pub fn run(&self) -> Result<(), LoadError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| LoadError::BuildSpawn {
                command: self.command_line(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(LoadError::Build {
                command: self.command_line(),
                status: status.to_string(),
            })
        }
    }
}

/// Loads the module named by the manifest at a fixed path.
#[derive(Debug)]
pub struct ManifestLoader {
    manifest_path: PathBuf,
    catalog: ModuleCatalog,
    build: Option<BuildStep>,
}

impl ManifestLoader {
    pub fn new(manifest_path: impl Into<PathBuf>, catalog: ModuleCatalog) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            catalog,
            build: None,
        }
    }

    pub fn with_build_step(mut self, build: Option<BuildStep>) -> Self {
        self.build = build;
        self
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }
}

impl ModuleLoader for ManifestLoader {
    fn load(&mut self) -> Result<LoadedModule, LoadError> {
        if let Some(build) = &self.build {
            info!(
                target: "terrain::loader",
                command = %build.command_line(),
                "module.build.started"
            );
            build.run()?;
        }

        let manifest = ModuleManifest::from_file(&self.manifest_path)?;
        if manifest.abi_version != MODULE_ABI_VERSION {
            return Err(LoadError::AbiMismatch {
                module: manifest.module,
                expected: MODULE_ABI_VERSION,
                found: manifest.abi_version,
            });
        }

        let module = self.catalog.instantiate(&manifest)?;
        let loaded = LoadedModule::activate(module)?;
        debug!(
            target: "terrain::loader",
            path = %self.manifest_path.display(),
            module = %loaded.descriptor.name,
            state_size = loaded.descriptor.state_size,
            "module.image.loaded"
        );
        Ok(loaded)
    }
}
