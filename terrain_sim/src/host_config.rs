//! Host-side settings: where the module image lives and how reloads are triggered.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{config::ConfigError, loader::BuildStep, raster::abgr_to_argb};

pub const BUILTIN_HOST_CONFIG: &str = include_str!("data/host_config.json");

/// Channel order expected by the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOrder {
    #[default]
    Argb,
    Abgr,
}

impl ChannelOrder {
    /// Convert a module-produced ARGB pixel into this order.
    #[inline]
    pub fn from_argb(self, pixel: u32) -> u32 {
        match self {
            ChannelOrder::Argb => pixel,
            // The swap is its own inverse.
            ChannelOrder::Abgr => abgr_to_argb(pixel),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub manifest_path: PathBuf,
    /// Intercepted by the host, never forwarded to the module.
    pub reload_key: char,
    /// Argv run before every load; `null` skips the build.
    pub build_command: Option<Vec<String>>,
    pub watch_manifest: bool,
    pub channel_order: ChannelOrder,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("terrain_module.json"),
            reload_key: 'r',
            build_command: None,
            watch_manifest: false,
            channel_order: ChannelOrder::Argb,
        }
    }
}

impl HostConfig {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_HOST_CONFIG).expect("builtin host config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: HostConfig = serde_json::from_str(json)?;
        if config.manifest_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("manifest_path must not be empty"));
        }
        if matches!(&config.build_command, Some(argv) if argv.is_empty()) {
            return Err(ConfigError::Invalid("build_command must name a program"));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        HostConfig::from_json_str(&contents)
    }

    pub fn build_step(&self) -> Option<BuildStep> {
        self.build_command
            .as_deref()
            .and_then(BuildStep::from_argv)
    }
}

/// Load the host configuration from `TERRAIN_HOST_CONFIG_PATH`, falling back to the builtin copy.
pub fn load_host_config_from_env() -> HostConfig {
    let Some(path) = env::var("TERRAIN_HOST_CONFIG_PATH").ok().map(PathBuf::from) else {
        tracing::info!(target: "terrain::config", "host_config.loaded=builtin");
        return HostConfig::builtin();
    };

    match HostConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "terrain::config",
                path = %path.display(),
                "host_config.loaded=file"
            );
            config
        }
        Err(err) => {
            tracing::warn!(
                target: "terrain::config",
                path = %path.display(),
                error = %err,
                "host_config.load_failed"
            );
            HostConfig::builtin()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_matches_defaults() {
        let config = HostConfig::builtin();
        assert_eq!(config.manifest_path, PathBuf::from("terrain_module.json"));
        assert_eq!(config.reload_key, 'r');
        assert!(config.build_step().is_none());
        assert!(!config.watch_manifest);
        assert_eq!(config.channel_order, ChannelOrder::Argb);
    }

    #[test]
    fn parses_build_command_and_channel_order() {
        let config = HostConfig::from_json_str(
            r#"{ "build_command": ["make", "module"], "channel_order": "abgr" }"#,
        )
        .unwrap();
        assert_eq!(
            config.build_step().map(|step| step.command_line()),
            Some("make module".to_string())
        );
        assert_eq!(config.channel_order.from_argb(0xFF11_2233), 0xFF33_2211);
        assert_eq!(ChannelOrder::Argb.from_argb(0xFF11_2233), 0xFF11_2233);
    }

    #[test]
    fn rejects_empty_build_command() {
        assert!(matches!(
            HostConfig::from_json_str(r#"{ "build_command": [] }"#),
            Err(ConfigError::Invalid(_))
        ));
    }
}
