use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use shaderhost::ShaderSource;

use crate::gradient::GradientStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantKind {
    Shader,
    CssGradient,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Shader => f.pad("shader"),
            VariantKind::CssGradient => f.pad("css-gradient"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantPayload {
    Shader(ShaderSource),
    Gradient(GradientStyle),
}

/// One selectable background theme.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDescriptor {
    key: Cow<'static, str>,
    display_name: Cow<'static, str>,
    preview: Cow<'static, str>,
    payload: VariantPayload,
    enabled: bool,
}

impl VariantDescriptor {
    pub fn shader(
        key: impl Into<Cow<'static, str>>,
        display_name: impl Into<Cow<'static, str>>,
        preview: impl Into<Cow<'static, str>>,
        source: ShaderSource,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            preview: preview.into(),
            payload: VariantPayload::Shader(source),
            enabled: true,
        }
    }

    pub fn gradient(
        key: impl Into<Cow<'static, str>>,
        display_name: impl Into<Cow<'static, str>>,
        preview: impl Into<Cow<'static, str>>,
        style: GradientStyle,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            preview: preview.into(),
            payload: VariantPayload::Gradient(style),
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// CSS background value used for palette swatches.
    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn payload(&self) -> &VariantPayload {
        &self.payload
    }

    pub fn kind(&self) -> VariantKind {
        match self.payload {
            VariantPayload::Shader(_) => VariantKind::Shader,
            VariantPayload::Gradient(_) => VariantKind::CssGradient,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Shader pair to mount for this theme; gradients are rendered by a generated shader.
    pub fn shader_source(&self) -> ShaderSource {
        match &self.payload {
            VariantPayload::Shader(source) => source.clone(),
            VariantPayload::Gradient(style) => style.to_shader_source(),
        }
    }
}

/// Serialisable listing row for `themes list --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSummary {
    pub key: String,
    pub name: String,
    pub kind: VariantKind,
    pub enabled: bool,
}

impl From<&VariantDescriptor> for VariantSummary {
    fn from(descriptor: &VariantDescriptor) -> Self {
        Self {
            key: descriptor.key().to_string(),
            name: descriptor.display_name().to_string(),
            kind: descriptor.kind(),
            enabled: descriptor.is_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::{GradientShape, Rgb};

    #[test]
    fn kind_follows_payload() {
        let shader = VariantDescriptor::shader(
            "plain",
            "Plain",
            "#000",
            ShaderSource::new(shaderhost::QUAD_VERTEX_SHADER, "void main() {}"),
        );
        assert_eq!(shader.kind(), VariantKind::Shader);
        assert_eq!(shader.shader_source().fragment(), "void main() {}");

        let gradient = VariantDescriptor::gradient(
            "flat",
            "Flat",
            "#123456",
            GradientStyle {
                class: "flat".into(),
                css: "#123456".into(),
                shape: GradientShape::Radial,
                stops: vec![Rgb::new(0x12, 0x34, 0x56)],
                animated: false,
            },
        )
        .with_enabled(false);
        assert_eq!(gradient.kind(), VariantKind::CssGradient);
        assert!(!gradient.is_enabled());
        assert!(gradient.shader_source().fragment().contains("STOP_0"));
    }

    #[test]
    fn summary_serialises_kind_in_kebab_case() {
        let descriptor = VariantDescriptor::shader(
            "plain",
            "Plain",
            "#000",
            ShaderSource::new(shaderhost::QUAD_VERTEX_SHADER, "void main() {}"),
        );
        let json = serde_json::to_string(&VariantSummary::from(&descriptor)).unwrap();
        assert_eq!(
            json,
            r#"{"key":"plain","name":"Plain","kind":"shader","enabled":true}"#
        );
    }
}
