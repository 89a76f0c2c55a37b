use std::borrow::Cow;
use std::fmt;

/// Pipeline stage a piece of GLSL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Names of the attribute and uniforms a shader pair declares.
///
/// The harness never inspects shader text; it resolves these names against
/// the linked program and uploads the matching values every frame. Names the
/// program does not use resolve to nothing and are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBindings {
    pub position: Cow<'static, str>,
    pub resolution: Cow<'static, str>,
    pub time: Cow<'static, str>,
    pub speed: Cow<'static, str>,
    pub hue: Cow<'static, str>,
    pub saturation: Cow<'static, str>,
    pub intensity: Cow<'static, str>,
}

impl UniformBindings {
    /// `position`, `resolution`, `time`, `speed`, `colorHue`, `colorSaturation`, `intensity`.
    pub const PLAIN: Self = Self::borrowed(
        "position",
        "resolution",
        "time",
        "speed",
        "colorHue",
        "colorSaturation",
        "intensity",
    );

    /// `a_position` with `u_`-prefixed uniforms.
    pub const PREFIXED: Self = Self::borrowed(
        "a_position",
        "u_resolution",
        "u_time",
        "u_speed",
        "u_colorHue",
        "u_colorSaturation",
        "u_intensity",
    );

    /// Like [`Self::PREFIXED`] but with `u_hue` / `u_saturation`.
    pub const PREFIXED_SHORT: Self = Self::borrowed(
        "a_position",
        "u_resolution",
        "u_time",
        "u_speed",
        "u_hue",
        "u_saturation",
        "u_intensity",
    );

    /// ShaderToy-style `iResolution` / `iTime` with plain parameter names.
    pub const SHADERTOY: Self = Self::borrowed(
        "position",
        "iResolution",
        "iTime",
        "speed",
        "colorHue",
        "colorSaturation",
        "intensity",
    );

    const fn borrowed(
        position: &'static str,
        resolution: &'static str,
        time: &'static str,
        speed: &'static str,
        hue: &'static str,
        saturation: &'static str,
        intensity: &'static str,
    ) -> Self {
        Self {
            position: Cow::Borrowed(position),
            resolution: Cow::Borrowed(resolution),
            time: Cow::Borrowed(time),
            speed: Cow::Borrowed(speed),
            hue: Cow::Borrowed(hue),
            saturation: Cow::Borrowed(saturation),
            intensity: Cow::Borrowed(intensity),
        }
    }
}

impl Default for UniformBindings {
    fn default() -> Self {
        Self::PLAIN
    }
}

/// Immutable vertex/fragment GLSL pair handed to the backend as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    vertex: Cow<'static, str>,
    fragment: Cow<'static, str>,
    bindings: UniformBindings,
}

impl ShaderSource {
    pub fn new(
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            bindings: UniformBindings::default(),
        }
    }

    pub fn with_bindings(mut self, bindings: UniformBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn vertex(&self) -> &str {
        &self.vertex
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn stage(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => self.vertex(),
            ShaderStage::Fragment => self.fragment(),
        }
    }

    pub fn bindings(&self) -> &UniformBindings {
        &self.bindings
    }
}

/// Vertex shader that passes the quad's clip-space position straight through.
pub const QUAD_VERTEX_SHADER: &str = "attribute vec2 position;
void main() {
  gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Inclusive range a front-end slider offers for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
}

impl ParameterRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Caller-owned knobs uploaded to every frame.
///
/// Values outside [`RenderParameters::SPEED`] and friends are legal; shader
/// math clamps them visually. Non-finite fields are replaced with their
/// defaults before upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParameters {
    pub speed: f32,
    pub hue: f32,
    pub saturation: f32,
    pub intensity: f32,
}

impl RenderParameters {
    pub const SPEED: ParameterRange = ParameterRange::new(0.1, 3.0);
    pub const HUE: ParameterRange = ParameterRange::new(0.0, 1.0);
    pub const SATURATION: ParameterRange = ParameterRange::new(0.0, 1.0);
    pub const INTENSITY: ParameterRange = ParameterRange::new(0.1, 2.0);

    pub fn is_finite(&self) -> bool {
        self.speed.is_finite()
            && self.hue.is_finite()
            && self.saturation.is_finite()
            && self.intensity.is_finite()
    }

    /// Replaces any NaN or infinite field with its default.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let pick = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };
        Self {
            speed: pick(self.speed, defaults.speed),
            hue: pick(self.hue, defaults.hue),
            saturation: pick(self.saturation, defaults.saturation),
            intensity: pick(self.intensity, defaults.intensity),
        }
    }

    /// Clamps every field into the slider ranges.
    pub fn clamped(&self) -> Self {
        let sane = self.sanitized();
        Self {
            speed: Self::SPEED.clamp(sane.speed),
            hue: Self::HUE.clamp(sane.hue),
            saturation: Self::SATURATION.clamp(sane.saturation),
            intensity: Self::INTENSITY.clamp(sane.intensity),
        }
    }
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            speed: 1.0,
            hue: 0.5,
            saturation: 0.8,
            intensity: 1.0,
        }
    }
}

/// Current layout size of a surface in device-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSize {
    pub width: f64,
    pub height: f64,
    pub scale_factor: f64,
}

impl LayoutSize {
    pub fn new(width: f64, height: f64, scale_factor: f64) -> Self {
        Self {
            width,
            height,
            scale_factor,
        }
    }

    /// Converts to device pixels, rounding to the nearest pixel.
    pub fn to_device(&self) -> SurfaceSize {
        let scale = if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        SurfaceSize::new(to_pixels(self.width * scale), to_pixels(self.height * scale))
    }
}

fn to_pixels(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Drawable size in device pixels. Zero in either dimension is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
