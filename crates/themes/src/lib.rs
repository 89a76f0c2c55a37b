//! Background theme catalog for the portfolio shaders.
//!
//! A [`VariantRegistry`] maps theme keys to [`VariantDescriptor`]s, each
//! carrying either a GLSL pair or a CSS gradient. The built-in table lives in
//! [`catalog`]; [`ThemeConfig`] layers a TOML file on top of it.

pub mod catalog;
pub mod config;
pub mod gradient;
pub mod registry;
pub mod variant;

pub use catalog::{builtin_variants, DEFAULT_VARIANT};
pub use config::{
    BindingScheme, ConfigError, ParameterConfig, ThemeConfig, VariantConfig, RANDOM_INITIAL,
};
pub use gradient::{GradientShape, GradientStyle, Rgb};
pub use registry::{RegistryError, VariantRegistry};
pub use variant::{VariantDescriptor, VariantKind, VariantPayload, VariantSummary};
