mod types;

pub use types::*;

use crate::decoder::CodecRegistry;
use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./asfclip.toml",
        "~/.config/asfclip/config.toml",
        "/etc/asfclip/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.extract.chunk_size == 0 {
        anyhow::bail!("Extract chunk size cannot be 0");
    }

    let clip = config.extract.audio_clip_secs;
    if !clip.is_finite() || clip <= 0.0 {
        anyhow::bail!("Audio clip length must be a positive number of seconds, got {}", clip);
    }

    Ok(())
}

/// Build the codec registry described by the configuration.
pub fn build_registry(config: &Config) -> CodecRegistry {
    let mut registry = CodecRegistry::new();
    if config.decode.passthrough {
        registry.register_passthrough();
    }
    registry
}
