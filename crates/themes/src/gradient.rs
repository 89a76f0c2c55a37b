use std::borrow::Cow;
use std::fmt::{self, Write as _};

use shaderhost::{ShaderSource, UniformBindings, QUAD_VERTEX_SHADER};

/// 8-bit sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (case-insensitive, leading `#` optional).
    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value.strip_prefix('#').unwrap_or(value);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    fn to_glsl(self) -> String {
        format!(
            "vec3({:.4}, {:.4}, {:.4})",
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientShape {
    /// CSS `linear-gradient` angle: 0° points up, increasing clockwise.
    Linear { angle_deg: f32 },
    /// Circle centred on the surface reaching the corners.
    Radial,
}

/// A CSS background theme.
///
/// Web callers apply `class` / `css` directly. Native front-ends render the
/// same gradient through [`GradientStyle::to_shader_source`].
#[derive(Debug, Clone, PartialEq)]
pub struct GradientStyle {
    pub class: Cow<'static, str>,
    pub css: Cow<'static, str>,
    pub shape: GradientShape,
    pub stops: Vec<Rgb>,
    pub animated: bool,
}

impl GradientStyle {
    /// Builds an evenly spaced gradient shader using the plain uniform names.
    ///
    /// Speed only affects animated gradients; intensity scales the colour.
    pub fn to_shader_source(&self) -> ShaderSource {
        let mut fragment = String::from(
            "precision mediump float;
uniform vec2 resolution;
uniform float time;
uniform float speed;
uniform float colorHue;
uniform float colorSaturation;
uniform float intensity;
",
        );

        let stops: Vec<Rgb> = match self.stops.as_slice() {
            [] => vec![Rgb::new(0, 0, 0)],
            stops => stops.to_vec(),
        };
        for (index, stop) in stops.iter().enumerate() {
            let _ = writeln!(fragment, "const vec3 STOP_{index} = {};", stop.to_glsl());
        }

        fragment.push_str("vec3 gradient(float t) {\n");
        let _ = writeln!(
            fragment,
            "  float scaled = clamp(t, 0.0, 1.0) * {:.1};",
            (stops.len().max(2) - 1) as f32
        );
        fragment.push_str("  vec3 color = STOP_0;\n");
        for index in 1..stops.len() {
            let _ = writeln!(
                fragment,
                "  color = mix(color, STOP_{index}, clamp(scaled - {:.1}, 0.0, 1.0));",
                (index - 1) as f32
            );
        }
        fragment.push_str("  return color;\n}\n");

        fragment.push_str("void main() {\n");
        fragment.push_str("  vec2 uv = gl_FragCoord.xy / max(resolution, vec2(1.0));\n");
        match self.shape {
            GradientShape::Linear { angle_deg } => {
                let radians = angle_deg.to_radians();
                let _ = writeln!(
                    fragment,
                    "  vec2 direction = vec2({:.6}, {:.6});",
                    radians.sin(),
                    radians.cos()
                );
                fragment.push_str(
                    "  float extent = 0.5 * (abs(direction.x) + abs(direction.y));\n",
                );
                fragment.push_str("  float t = 0.5 + dot(uv - 0.5, direction) / (2.0 * extent);\n");
            }
            GradientShape::Radial => {
                fragment.push_str("  float t = length(uv - 0.5) / 0.7071068;\n");
            }
        }
        if self.animated {
            fragment.push_str(
                "  t = 1.0 - abs(1.0 - 2.0 * fract(0.5 * t + time * speed * 0.05));\n",
            );
        }
        fragment.push_str("  gl_FragColor = vec4(gradient(t) * intensity, 1.0);\n}\n");

        ShaderSource::new(QUAD_VERTEX_SHADER, fragment).with_bindings(UniformBindings::PLAIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stop(shape: GradientShape, animated: bool) -> GradientStyle {
        GradientStyle {
            class: "test-gradient".into(),
            css: "linear-gradient(135deg, #FF6B35, #FF5722)".into(),
            shape,
            stops: vec![Rgb::new(0xFF, 0x6B, 0x35), Rgb::new(0xFF, 0x57, 0x22)],
            animated,
        }
    }

    #[test]
    fn parses_hex_colours() {
        assert_eq!(Rgb::from_hex("#0041E6"), Some(Rgb::new(0x00, 0x41, 0xE6)));
        assert_eq!(Rgb::from_hex("ff1aaf"), Some(Rgb::new(0xFF, 0x1A, 0xAF)));
        assert_eq!(Rgb::from_hex("#fff"), None);
        assert_eq!(Rgb::from_hex("#12345g"), None);
        assert_eq!(Rgb::new(0x5C, 0x00, 0xB3).to_string(), "#5C00B3");
    }

    #[test]
    fn generated_shader_declares_plain_bindings() {
        let source = two_stop(GradientShape::Linear { angle_deg: 135.0 }, false).to_shader_source();
        let bindings = source.bindings();
        assert_eq!(bindings, &UniformBindings::PLAIN);
        for name in [
            &bindings.resolution,
            &bindings.time,
            &bindings.speed,
            &bindings.hue,
            &bindings.saturation,
            &bindings.intensity,
        ] {
            assert!(
                source.fragment().contains(&format!(" {name};")),
                "missing uniform {name}"
            );
        }
        assert!(source.vertex().contains("attribute vec2 position;"));
    }

    #[test]
    fn one_constant_per_stop() {
        let mut style = two_stop(GradientShape::Radial, true);
        style.stops.push(Rgb::new(0, 0, 0));
        let fragment = style.to_shader_source().fragment().to_string();

        assert_eq!(fragment.matches("const vec3 STOP_").count(), 3);
        assert!(fragment.contains("STOP_2, clamp(scaled - 1.0"));
        assert!(fragment.contains("length(uv - 0.5)"));
        assert!(fragment.contains("fract("), "animated gradients move with time");
    }

    #[test]
    fn static_linear_gradient_ignores_time() {
        let fragment = two_stop(GradientShape::Linear { angle_deg: 90.0 }, false)
            .to_shader_source()
            .fragment()
            .to_string();
        assert!(fragment.contains("vec2 direction = vec2(1.000000, "));
        assert!(!fragment.contains("fract("));
    }

    #[test]
    fn empty_stop_list_renders_black() {
        let style = GradientStyle {
            stops: Vec::new(),
            ..two_stop(GradientShape::Radial, false)
        };
        let fragment = style.to_shader_source().fragment().to_string();
        assert!(fragment.contains("const vec3 STOP_0 = vec3(0.0000, 0.0000, 0.0000);"));
        assert!(fragment.contains("* 1.0;"));
    }
}
