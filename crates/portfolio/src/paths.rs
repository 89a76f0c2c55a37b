use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories_next::ProjectDirs;
use themes::{ThemeConfig, VariantRegistry};

pub const ENV_CONFIG_DIR: &str = "PORTFOLIO_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "themes.toml";

const QUALIFIER: &str = "dev";
const ORGANISATION: &str = "Portfolio";
const APPLICATION: &str = "portfolio";

/// Where the theme file came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Discovered(PathBuf),
    BuiltIn,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Discovered(path) => Some(path),
            ConfigSource::BuiltIn => None,
        }
    }
}

/// Parsed theme file plus the registry built from it.
#[derive(Debug)]
pub struct LoadedThemes {
    pub config: ThemeConfig,
    pub registry: VariantRegistry,
    pub source: ConfigSource,
}

/// Picks the theme file: `--config`, then `$PORTFOLIO_CONFIG_DIR`, then the
/// platform config directory.
pub fn discover_config(explicit: Option<&Path>) -> ConfigSource {
    let platform = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.config_dir().to_path_buf());
    resolve_config(explicit, env_override(ENV_CONFIG_DIR), platform)
}

fn resolve_config(
    explicit: Option<&Path>,
    env_dir: Option<PathBuf>,
    platform_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }
    match env_dir.or(platform_dir) {
        Some(dir) => ConfigSource::Discovered(dir.join(CONFIG_FILE_NAME)),
        None => ConfigSource::BuiltIn,
    }
}

/// Loads the theme file (if any) and builds the registry.
///
/// A discovered file that does not exist means built-in defaults; an explicit
/// `--config` that does not exist is an error.
pub fn load_themes(explicit: Option<&Path>) -> Result<LoadedThemes> {
    let source = discover_config(explicit);
    if let ConfigSource::Explicit(path) = &source {
        if !path.is_file() {
            bail!("theme file {} does not exist", path.display());
        }
    }

    let (config, base_dir) = match source.path() {
        Some(path) => {
            let config = ThemeConfig::load(path)
                .with_context(|| format!("failed to load theme file {}", path.display()))?;
            let base_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (config, base_dir)
        }
        None => (ThemeConfig::default(), PathBuf::from(".")),
    };

    let registry = config
        .build_registry(&base_dir)
        .context("failed to build theme registry")?;
    tracing::debug!(
        source = ?source,
        themes = registry.len(),
        enabled = registry.list_enabled().len(),
        "themes loaded"
    );

    Ok(LoadedThemes {
        config,
        registry,
        source,
    })
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
