//! The authored theme table, in palette order.

use shaderhost::{ShaderSource, UniformBindings};

use crate::gradient::{GradientShape, GradientStyle, Rgb};
use crate::variant::VariantDescriptor;

/// Theme shown when a requested key is unknown.
pub const DEFAULT_VARIANT: &str = "plasma";

macro_rules! shader_asset {
    ($name:literal, $bindings:expr) => {
        ShaderSource::new(
            include_str!(concat!("../shaders/", $name, ".vert")),
            include_str!(concat!("../shaders/", $name, ".frag")),
        )
        .with_bindings($bindings)
    };
}

fn shader(
    key: &'static str,
    name: &'static str,
    preview: &'static str,
    source: ShaderSource,
    enabled: bool,
) -> VariantDescriptor {
    VariantDescriptor::shader(key, name, preview, source).with_enabled(enabled)
}

/// Every built-in theme with its authored enabled flag.
pub fn builtin_variants() -> Vec<VariantDescriptor> {
    vec![
        shader(
            "eyeofdragon",
            "Dragon's Eye",
            "radial-gradient(circle at 50% 50%, hsl(20, 100%, 50%) 0%, hsl(340, 90%, 40%) 40%, hsl(280, 85%, 25%) 80%, hsl(0,0%,5%) 100%)",
            shader_asset!("eyeofdragon", UniformBindings::PREFIXED),
            false,
        ),
        shader(
            "burningship",
            "Burning Ship",
            "linear-gradient(135deg, hsl(20, 100%, 60%) 0%, hsl(350, 100%, 50%) 25%, hsl(280, 100%, 40%) 50%, hsl(200, 100%, 30%) 100%)",
            shader_asset!("burningship", UniformBindings::PREFIXED),
            true,
        ),
        shader(
            "crossgalacticocean",
            "Galactic Ocean",
            "linear-gradient(180deg, hsl(215, 70%, 15%) 0%, hsl(180, 100%, 60%) 40%, hsl(300, 100%, 70%) 100%)",
            shader_asset!("crossgalacticocean", UniformBindings::PREFIXED_SHORT),
            true,
        ),
        shader(
            "galaxy",
            "Galaxy of Universes",
            "radial-gradient(circle at 30% 30%, hsl(280, 100%, 60%) 0%, hsl(240, 100%, 40%) 30%, hsl(320, 100%, 50%) 100%)",
            shader_asset!("galaxy", UniformBindings::SHADERTOY),
            true,
        ),
        shader(
            "tunnelvision",
            "Neon Tunnel",
            "radial-gradient(circle at 50% 50%, hsl(290, 100%, 70%) 0%, hsl(240, 100%, 40%) 40%, hsl(0, 0%, 5%) 80%)",
            shader_asset!("tunnelvision", UniformBindings::SHADERTOY),
            true,
        ),
        shader(
            "spiralwhirlpool",
            "Spiral Whirlpool",
            "conic-gradient(from 180deg, hsl(240, 100%, 70%), hsl(300, 100%, 60%), hsl(20, 100%, 60%), hsl(280, 100%, 70%), hsl(240, 100%, 70%))",
            shader_asset!("spiralwhirlpool", UniformBindings::PREFIXED_SHORT),
            false,
        ),
        shader(
            "turbulence",
            "Turbulent Flow",
            "radial-gradient(ellipse at 70% 30%, hsl(200, 90%, 60%), hsl(240, 80%, 50%), hsl(280, 85%, 35%))",
            shader_asset!("turbulence", UniformBindings::PREFIXED),
            true,
        ),
        shader(
            "cybergrid",
            "Cyber Grid",
            "linear-gradient(45deg, hsl(180, 100%, 30%), hsl(200, 100%, 40%), hsl(220, 100%, 50%))",
            shader_asset!("cybergrid", UniformBindings::PLAIN),
            true,
        ),
        shader(
            "quantumfield",
            "Quantum Field",
            "conic-gradient(hsl(240, 100%, 60%), hsl(280, 100%, 70%), hsl(200, 100%, 50%), hsl(160, 100%, 40%), hsl(240, 100%, 60%))",
            shader_asset!("quantumfield", UniformBindings::PLAIN),
            true,
        ),
        shader(
            "fluiddynamics",
            "Fluid Dynamics",
            "radial-gradient(ellipse, hsl(200, 100%, 50%), hsl(220, 100%, 40%), hsl(280, 100%, 50%))",
            shader_asset!("fluiddynamics", UniformBindings::PLAIN),
            true,
        ),
        shader(
            "kaleidoscope",
            "Kaleidoscope",
            "conic-gradient(hsl(300, 100%, 60%), hsl(240, 100%, 50%), hsl(180, 100%, 40%), hsl(120, 100%, 50%), hsl(300, 100%, 60%))",
            shader_asset!("kaleidoscope", UniformBindings::PLAIN),
            false,
        ),
        shader(
            "sdfmorph",
            "SDF Morph",
            "radial-gradient(circle, hsl(320, 100%, 60%), hsl(280, 100%, 50%), hsl(240, 100%, 40%))",
            shader_asset!("sdfmorph", UniformBindings::PLAIN),
            true,
        ),
        shader(
            "voronoi",
            "Crystal Cells",
            "radial-gradient(circle, hsl(270, 100%, 60%), hsl(320, 100%, 50%), hsl(200, 100%, 30%))",
            shader_asset!("voronoi", UniformBindings::PLAIN),
            true,
        ),
        shader(
            "plasma",
            "Plasma Field",
            "radial-gradient(circle, hsl(300, 100%, 60%), hsl(260, 100%, 50%), hsl(220, 100%, 40%))",
            shader_asset!("plasma", UniformBindings::PLAIN),
            true,
        ),
        shader(
            "waveform",
            "Synthwave",
            "linear-gradient(135deg, hsl(320, 100%, 40%), hsl(280, 100%, 50%), hsl(240, 100%, 30%))",
            shader_asset!("waveform", UniformBindings::PLAIN),
            true,
        ),
        shader(
            "fractalmandala",
            "Fractal Mandala",
            "radial-gradient(circle, hsl(45, 100%, 70%), hsl(30, 100%, 60%), hsl(320, 100%, 50%))",
            shader_asset!("fractalmandala", UniformBindings::PLAIN),
            false,
        ),
        shader(
            "juliaset",
            "Julia Set",
            "conic-gradient(hsl(200, 100%, 70%), hsl(260, 100%, 50%), hsl(320, 100%, 60%), hsl(40, 100%, 60%), hsl(200, 100%, 70%))",
            shader_asset!("juliaset", UniformBindings::PREFIXED),
            false,
        ),
        shader(
            "zippyzaps",
            "Zippy Zaps",
            "radial-gradient(circle, hsl(240, 100%, 80%), hsl(280, 100%, 60%), hsl(180, 100%, 70%))",
            shader_asset!("zippyzaps", UniformBindings::PREFIXED),
            false,
        ),
        VariantDescriptor::gradient(
            "animated",
            "Dynamic Flow",
            "linear-gradient(-45deg, hsl(223, 100%, 45%), hsl(271, 100%, 35%), hsl(195, 100%, 65%), hsl(321, 100%, 55%))",
            GradientStyle {
                class: "shader-gradient-animated".into(),
                css: "linear-gradient(-45deg, #0041E6, #5C00B3, #4DD2FF, #FF1AAF)".into(),
                shape: GradientShape::Linear { angle_deg: -45.0 },
                stops: vec![
                    Rgb::new(0x00, 0x41, 0xE6),
                    Rgb::new(0x5C, 0x00, 0xB3),
                    Rgb::new(0x4D, 0xD2, 0xFF),
                    Rgb::new(0xFF, 0x1A, 0xAF),
                ],
                animated: true,
            },
        )
        .with_enabled(false),
        VariantDescriptor::gradient(
            "blue",
            "Deep Blue",
            "linear-gradient(135deg, hsl(223, 100%, 45%), hsl(271, 100%, 35%), #000)",
            GradientStyle {
                class: "shader-gradient-blue".into(),
                css: "linear-gradient(135deg, #0041E6, #5C00B3, #000000)".into(),
                shape: GradientShape::Linear { angle_deg: 135.0 },
                stops: vec![
                    Rgb::new(0x00, 0x41, 0xE6),
                    Rgb::new(0x5C, 0x00, 0xB3),
                    Rgb::new(0x00, 0x00, 0x00),
                ],
                animated: false,
            },
        )
        .with_enabled(false),
        VariantDescriptor::gradient(
            "radial",
            "Radial Glow",
            "radial-gradient(circle, hsl(195, 100%, 65%), hsl(223, 100%, 45%), #000)",
            GradientStyle {
                class: "shader-gradient-radial".into(),
                css: "radial-gradient(circle, #4DD2FF, #0041E6, #000000)".into(),
                shape: GradientShape::Radial,
                stops: vec![
                    Rgb::new(0x4D, 0xD2, 0xFF),
                    Rgb::new(0x00, 0x41, 0xE6),
                    Rgb::new(0x00, 0x00, 0x00),
                ],
                animated: false,
            },
        )
        .with_enabled(false),
        VariantDescriptor::gradient(
            "orange",
            "Classic Orange",
            "linear-gradient(135deg, #FF6B35, #FF5722)",
            GradientStyle {
                class: "vibrant-orange".into(),
                css: "linear-gradient(135deg, #FF6B35, #FF5722)".into(),
                shape: GradientShape::Linear { angle_deg: 135.0 },
                stops: vec![Rgb::new(0xFF, 0x6B, 0x35), Rgb::new(0xFF, 0x57, 0x22)],
                animated: false,
            },
        ),
    ]
}
