use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shaderhost::{ParameterRange, RenderParameters, ShaderSource, UniformBindings, QUAD_VERTEX_SHADER};

use crate::catalog::builtin_variants;
use crate::registry::{RegistryError, VariantRegistry};
use crate::variant::VariantDescriptor;

pub const CONFIG_VERSION: u32 = 1;

/// Value of `initial` that starts on a random enabled theme.
pub const RANDOM_INITIAL: &str = "random";

const DEFAULT_PREVIEW: &str = "linear-gradient(135deg, #222222, #000000)";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse theme configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid theme configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemeConfig {
    pub version: u32,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub initial: Option<String>,
    #[serde(default)]
    pub parameters: ParameterConfig,
    #[serde(default)]
    pub enabled: BTreeMap<String, bool>,
    #[serde(default)]
    pub variants: Vec<VariantConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterConfig {
    pub speed: Option<f32>,
    pub hue: Option<f32>,
    pub saturation: Option<f32>,
    pub intensity: Option<f32>,
}

impl ParameterConfig {
    /// Overlays the configured values on `base`.
    pub fn apply(&self, base: RenderParameters) -> RenderParameters {
        RenderParameters {
            speed: self.speed.unwrap_or(base.speed),
            hue: self.hue.unwrap_or(base.hue),
            saturation: self.saturation.unwrap_or(base.saturation),
            intensity: self.intensity.unwrap_or(base.intensity),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("speed", self.speed, RenderParameters::SPEED),
            ("hue", self.hue, RenderParameters::HUE),
            ("saturation", self.saturation, RenderParameters::SATURATION),
            ("intensity", self.intensity, RenderParameters::INTENSITY),
        ];
        for (name, value, range) in fields {
            if let Some(value) = value {
                check_range(name, value, range)?;
            }
        }
        Ok(())
    }
}

fn check_range(name: &str, value: f32, range: ParameterRange) -> Result<(), ConfigError> {
    if !value.is_finite() || !range.contains(value) {
        return Err(ConfigError::Invalid(format!(
            "parameters.{name} = {value} is outside {}..={}",
            range.min, range.max
        )));
    }
    Ok(())
}

/// Naming scheme of a configured shader's attribute and uniforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingScheme {
    #[default]
    Plain,
    Prefixed,
    PrefixedShort,
    Shadertoy,
}

impl BindingScheme {
    pub fn bindings(self) -> UniformBindings {
        match self {
            BindingScheme::Plain => UniformBindings::PLAIN,
            BindingScheme::Prefixed => UniformBindings::PREFIXED,
            BindingScheme::PrefixedShort => UniformBindings::PREFIXED_SHORT,
            BindingScheme::Shadertoy => UniformBindings::SHADERTOY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantConfig {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    pub fragment: PathBuf,
    #[serde(default)]
    pub vertex: Option<PathBuf>,
    #[serde(default)]
    pub uniforms: BindingScheme,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn read_shader(base_dir: &Path, path: &Path) -> Result<String, RegistryError> {
    let full = base_dir.join(path);
    std::fs::read_to_string(&full).map_err(|source| RegistryError::Io { path: full, source })
}

impl VariantConfig {
    /// Reads the shader files, resolving relative paths against `base_dir`.
    pub fn load(&self, base_dir: &Path) -> Result<VariantDescriptor, RegistryError> {
        let fragment = read_shader(base_dir, &self.fragment)?;
        let source = match &self.vertex {
            Some(vertex) => ShaderSource::new(read_shader(base_dir, vertex)?, fragment),
            None => ShaderSource::new(QUAD_VERTEX_SHADER, fragment),
        }
        .with_bindings(self.uniforms.bindings());

        let name = self.name.clone().unwrap_or_else(|| self.key.clone());
        let preview = self
            .preview
            .clone()
            .unwrap_or_else(|| DEFAULT_PREVIEW.to_string());
        Ok(VariantDescriptor::shader(self.key.clone(), name, preview, source).with_enabled(self.enabled))
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            default: None,
            initial: None,
            parameters: ParameterConfig::default(),
            enabled: BTreeMap::new(),
            variants: Vec::new(),
        }
    }
}

impl ThemeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: ThemeConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the built-in defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no theme config; using built-in defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self::from_toml_str(&contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported version {} (expected {CONFIG_VERSION})",
                self.version
            )));
        }
        self.parameters.validate()?;

        let builtin: HashSet<String> = builtin_variants()
            .iter()
            .map(|variant| variant.key().to_string())
            .collect();
        let mut known = builtin.clone();
        for variant in &self.variants {
            let key = variant.key.trim();
            if key.is_empty() {
                return Err(ConfigError::Invalid("variant key must not be empty".into()));
            }
            if key != variant.key {
                return Err(ConfigError::Invalid(format!(
                    "variant key `{}` has surrounding whitespace",
                    variant.key
                )));
            }
            if builtin.contains(key) {
                return Err(ConfigError::Invalid(format!(
                    "variant `{key}` shadows a built-in theme"
                )));
            }
            if !known.insert(key.to_string()) {
                return Err(ConfigError::Invalid(format!(
                    "variant `{key}` is defined more than once"
                )));
            }
        }

        if let Some(default) = &self.default {
            if !known.contains(default) {
                return Err(ConfigError::Invalid(format!(
                    "default theme `{default}` is unknown"
                )));
            }
        }
        if let Some(initial) = &self.initial {
            if initial != RANDOM_INITIAL && !known.contains(initial) {
                return Err(ConfigError::Invalid(format!(
                    "initial theme `{initial}` is unknown"
                )));
            }
        }
        if let Some(key) = self.enabled.keys().find(|key| !known.contains(*key)) {
            return Err(ConfigError::Invalid(format!(
                "enabled override for unknown theme `{key}`"
            )));
        }
        Ok(())
    }

    /// Builds the registry: built-ins, then configured variants, then overrides.
    pub fn build_registry(&self, base_dir: &Path) -> Result<VariantRegistry, RegistryError> {
        self.validate()?;
        let mut registry = VariantRegistry::builtin();
        for variant in &self.variants {
            registry.push(variant.load(base_dir)?)?;
        }
        for (key, enabled) in &self.enabled {
            registry.set_enabled(key, *enabled)?;
        }
        if let Some(default) = &self.default {
            registry.set_default(default)?;
        }
        tracing::debug!(
            variants = registry.len(),
            enabled = registry.list_enabled().len(),
            default = registry.default_variant().key(),
            "theme registry ready"
        );
        Ok(registry)
    }

    /// Initial parameters with configured values applied.
    pub fn render_parameters(&self) -> RenderParameters {
        self.parameters.apply(RenderParameters::default())
    }
}
