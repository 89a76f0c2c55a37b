use std::borrow::Cow;

use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::ShaderStage as NagaStage;

use super::uniforms::{UniformBlock, UniformKind};
use crate::error::HostError;
use crate::types::{ShaderSource, ShaderStage};

pub(crate) const VERTEX_BLOCK_BINDING: u32 = 0;
pub(crate) const FRAGMENT_BLOCK_BINDING: u32 = 1;
pub(crate) const VIEWPORT_UNIFORM: &str = "portfolio_viewport";

const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

/// Vertex input declared with `attribute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VertexAttribute {
    pub name: String,
    pub location: u32,
    pub components: usize,
}

/// A WebGL-dialect stage rewritten as GLSL 450 for `wgpu`.
#[derive(Debug, Clone)]
pub(crate) struct TranslatedShader {
    pub glsl: String,
    pub block: UniformBlock,
    pub attributes: Vec<VertexAttribute>,
}

/// Compiles a translated stage, surfacing `wgpu` validation errors as the log.
pub(crate) fn compile_stage(
    device: &wgpu::Device,
    stage: ShaderStage,
    source: &str,
) -> Result<(wgpu::ShaderModule, TranslatedShader), String> {
    let translated = translate(stage, source)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            ShaderStage::Vertex => "portfolio vertex",
            ShaderStage::Fragment => "portfolio fragment",
        }),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(translated.glsl.clone()),
            stage: naga_stage(stage),
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        tracing::debug!(%stage, glsl = %translated.glsl, "translated shader rejected");
        return Err(err.to_string());
    }
    Ok((module, translated))
}

/// Translates both stages and runs them through naga's parser and validator.
///
/// Needs no device, so theme tooling can vet sources before a window exists.
/// Cross-stage checks (attribute count, varying pairing) still happen at link.
pub fn check_source(source: &ShaderSource) -> Result<(), HostError> {
    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        check_stage(stage, source.stage(stage)).map_err(|log| HostError::Compile { stage, log })?;
    }
    Ok(())
}

fn check_stage(stage: ShaderStage, source: &str) -> Result<(), String> {
    let translated = translate(stage, source)?;
    let module = Frontend::default()
        .parse(&Options::from(naga_stage(stage)), &translated.glsl)
        .map_err(|errors| errors.emit_to_string(&translated.glsl))?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| err.emit_to_string(&translated.glsl))?;
    Ok(())
}

fn naga_stage(stage: ShaderStage) -> NagaStage {
    match stage {
        ShaderStage::Vertex => NagaStage::Vertex,
        ShaderStage::Fragment => NagaStage::Fragment,
    }
}

/// Rewrites a GLSL ES 1.00 stage into GLSL 450.
///
/// 1. Drop `#version` and default `precision` statements.
/// 2. Collect loose `uniform` declarations into a std140 block; the fragment
///    block always starts with a hidden viewport size.
/// 3. Give `attribute` and `varying` declarations explicit locations.
/// 4. Route `gl_FragColor` to an output and flip `gl_FragCoord` to a
///    bottom-left origin.
///
/// Removed lines are left blank so compiler line numbers match the input.
pub(crate) fn translate(stage: ShaderStage, source: &str) -> Result<TranslatedShader, String> {
    let mut translator = Translator::new(stage)?;

    for (index, line) in source.lines().enumerate() {
        let keyword = line.split_whitespace().next().unwrap_or("");
        match keyword {
            "#version" | "precision" => {}
            "uniform" | "attribute" | "varying" => {
                let (code, comment) = match line.split_once("//") {
                    Some((code, comment)) => (code, Some(comment)),
                    None => (line, None),
                };
                for statement in code.split(';') {
                    translator
                        .statement(statement)
                        .map_err(|err| format!("ERROR: 0:{}: {err}", index + 1))?;
                }
                if let Some(comment) = comment {
                    translator.body.push_str("//");
                    translator.body.push_str(comment);
                }
            }
            _ => translator.body.push_str(line),
        }
        translator.body.push('\n');
    }

    Ok(translator.finish())
}

struct Translator {
    stage: ShaderStage,
    block: UniformBlock,
    attributes: Vec<VertexAttribute>,
    varyings: u32,
    body: String,
}

impl Translator {
    fn new(stage: ShaderStage) -> Result<Self, String> {
        let mut block = UniformBlock::new();
        if stage == ShaderStage::Fragment {
            block.push(VIEWPORT_UNIFORM, UniformKind::Vec2)?;
        }
        Ok(Self {
            stage,
            block,
            attributes: Vec::new(),
            varyings: 0,
            body: String::new(),
        })
    }

    /// Handles one `;`-separated piece of a declaration line.
    fn statement(&mut self, statement: &str) -> Result<(), String> {
        let trimmed = statement.trim();
        let keyword = trimmed.split_whitespace().next().unwrap_or("");
        match keyword {
            "" => {}
            "uniform" => {
                for (name, kind) in parse_uniforms(trimmed)? {
                    self.block.push(&name, kind)?;
                }
            }
            "attribute" if self.stage == ShaderStage::Vertex => {
                let (glsl_type, names) = split_declaration(trimmed, "attribute")?;
                let components = vector_components(&glsl_type)
                    .ok_or_else(|| format!("unsupported attribute type `{glsl_type}`"))?;
                for name in names {
                    let location = self.attributes.len() as u32;
                    self.body.push_str(&format!(
                        "layout(location = {location}) in {glsl_type} {name}; "
                    ));
                    self.attributes.push(VertexAttribute {
                        name,
                        location,
                        components,
                    });
                }
            }
            "varying" => {
                let (glsl_type, names) = split_declaration(trimmed, "varying")?;
                let direction = match self.stage {
                    ShaderStage::Vertex => "out",
                    ShaderStage::Fragment => "in",
                };
                for name in names {
                    self.body.push_str(&format!(
                        "layout(location = {}) {direction} {glsl_type} {name}; ",
                        self.varyings
                    ));
                    self.varyings += 1;
                }
            }
            _ => {
                self.body.push_str(statement);
                self.body.push_str("; ");
            }
        }
        Ok(())
    }

    fn finish(self) -> TranslatedShader {
        let Self {
            stage,
            block,
            attributes,
            body,
            ..
        } = self;
        let glsl = match stage {
            ShaderStage::Vertex => {
                let declaration = if block.is_empty() {
                    String::new()
                } else {
                    block.declaration("PortfolioVertexParams", VERTEX_BLOCK_BINDING)
                };
                format!("#version 450\n{declaration}#line 1\n{body}")
            }
            ShaderStage::Fragment => {
                let declaration =
                    block.declaration("PortfolioFragmentParams", FRAGMENT_BLOCK_BINDING);
                format!("#version 450\n{FRAGMENT_OUTPUTS}{declaration}{FRAGMENT_MACROS}#line 1\n{body}{FRAGMENT_FOOTER}")
            }
        };
        TranslatedShader {
            glsl,
            block,
            attributes,
        }
    }
}

/// Parses `uniform [precision] type a, b;` into its members.
fn parse_uniforms(line: &str) -> Result<Vec<(String, UniformKind)>, String> {
    let (glsl_type, names) = split_declaration(line, "uniform")?;
    let kind = UniformKind::parse(&glsl_type)
        .ok_or_else(|| format!("unsupported uniform type `{glsl_type}`"))?;
    Ok(names.into_iter().map(|name| (name, kind)).collect())
}

fn split_declaration(line: &str, qualifier: &str) -> Result<(String, Vec<String>), String> {
    let declaration = line
        .split(';')
        .next()
        .unwrap_or("")
        .trim_start_matches(qualifier);
    let mut tokens = declaration
        .split_whitespace()
        .filter(|token| !PRECISION_QUALIFIERS.contains(token));
    let glsl_type = tokens
        .next()
        .ok_or_else(|| format!("`{qualifier}` declaration is missing a type"))?
        .to_string();
    let rest: Vec<&str> = tokens.collect();
    let names: Vec<String> = rest
        .join(" ")
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        return Err(format!("`{qualifier} {glsl_type}` declaration has no name"));
    }
    if let Some(array) = names.iter().find(|name| name.contains('[')) {
        return Err(format!("array {qualifier} `{array}` is not supported"));
    }
    Ok((glsl_type, names))
}

fn vector_components(glsl_type: &str) -> Option<usize> {
    match glsl_type {
        "float" => Some(1),
        "vec2" => Some(2),
        "vec3" => Some(3),
        "vec4" => Some(4),
        _ => None,
    }
}

const FRAGMENT_OUTPUTS: &str = "layout(location = 0) out vec4 portfolio_frag_color;\n";

const FRAGMENT_MACROS: &str = r"vec4 portfolio_frag_coord;
#define gl_FragColor portfolio_frag_color
#define gl_FragCoord portfolio_frag_coord
#define main portfolio_shader_main
";

/// Reads the real `gl_FragCoord`, flips it to a bottom-left origin and calls the shader.
const FRAGMENT_FOOTER: &str = r"#undef main
void main() {
    #undef gl_FragCoord
    vec4 portfolio_builtin_coord = gl_FragCoord;
    #define gl_FragCoord portfolio_frag_coord
    portfolio_frag_coord = vec4(
        portfolio_builtin_coord.x,
        portfolio_viewport.y - portfolio_builtin_coord.y,
        portfolio_builtin_coord.z,
        portfolio_builtin_coord.w
    );
    portfolio_frag_color = vec4(0.0, 0.0, 0.0, 1.0);
    portfolio_shader_main();
}
";

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = "precision mediump float;
uniform vec2 u_resolution;
uniform float u_time, u_speed;
uniform highp float u_intensity;
void main() {
  vec2 uv = gl_FragCoord.xy / u_resolution;
  gl_FragColor = vec4(uv, sin(u_time * u_speed), u_intensity);
}
";

    #[test]
    fn fragment_uniforms_move_into_block() {
        let translated = translate(ShaderStage::Fragment, FRAGMENT).unwrap();
        let glsl = &translated.glsl;

        assert!(glsl.starts_with("#version 450\n"));
        assert!(!glsl.contains("precision mediump"));
        assert!(!glsl.contains("uniform float u_time"));
        assert!(glsl.contains("binding = 1) uniform PortfolioFragmentParams"));
        assert!(glsl.contains("#define gl_FragColor portfolio_frag_color"));
        assert!(glsl.contains("portfolio_shader_main();"));

        let block = &translated.block;
        assert_eq!(block.member(VIEWPORT_UNIFORM).unwrap().offset, 0);
        assert_eq!(block.member("u_resolution").unwrap().offset, 8);
        assert_eq!(block.member("u_time").unwrap().offset, 16);
        assert_eq!(block.member("u_speed").unwrap().offset, 20);
        assert_eq!(block.member("u_intensity").unwrap().kind, UniformKind::Float);
        assert!(translated.attributes.is_empty());
    }

    #[test]
    fn line_numbers_survive_translation() {
        let translated = translate(ShaderStage::Fragment, FRAGMENT).unwrap();
        let body = translated
            .glsl
            .split("#line 1\n")
            .nth(1)
            .expect("line directive");
        let main_line = body.lines().position(|line| line.starts_with("void main"));
        assert_eq!(main_line, Some(4));
    }

    #[test]
    fn vertex_attributes_get_locations() {
        let source = "attribute vec4 a_position;\nvoid main() {\n  gl_Position = a_position;\n}\n";
        let translated = translate(ShaderStage::Vertex, source).unwrap();

        assert!(translated
            .glsl
            .contains("layout(location = 0) in vec4 a_position;"));
        assert!(!translated.glsl.contains("uniform"));
        assert!(translated.block.is_empty());
        assert_eq!(
            translated.attributes,
            vec![VertexAttribute {
                name: "a_position".into(),
                location: 0,
                components: 4,
            }]
        );
    }

    #[test]
    fn varyings_pair_by_declaration_order() {
        let vertex = translate(
            ShaderStage::Vertex,
            "attribute vec2 position;\nvarying vec2 v_uv;\nvoid main() { v_uv = position; gl_Position = vec4(position, 0.0, 1.0); }\n",
        )
        .unwrap();
        let fragment = translate(
            ShaderStage::Fragment,
            "precision mediump float;\nvarying vec2 v_uv;\nvoid main() { gl_FragColor = vec4(v_uv, 0.0, 1.0); }\n",
        )
        .unwrap();

        assert!(vertex.glsl.contains("layout(location = 0) out vec2 v_uv;"));
        assert!(fragment.glsl.contains("layout(location = 0) in vec2 v_uv;"));
    }

    #[test]
    fn unsupported_uniform_type_reports_line() {
        let err = translate(
            ShaderStage::Fragment,
            "precision mediump float;\nuniform sampler2D image;\nvoid main() {}\n",
        )
        .unwrap_err();
        assert!(err.starts_with("ERROR: 0:2:"));
        assert!(err.contains("sampler2D"));
    }

    #[test]
    fn several_declarations_on_one_line() {
        let translated = translate(
            ShaderStage::Fragment,
            "uniform float a; uniform vec2 b; float scale = 2.0; // a; b\nvoid main() {}\n",
        )
        .unwrap();
        assert_eq!(translated.block.member("a").unwrap().kind, UniformKind::Float);
        assert_eq!(translated.block.member("b").unwrap().kind, UniformKind::Vec2);
        assert!(translated.glsl.contains("float scale = 2.0; // a; b\n"));
        assert!(!translated.glsl.contains("uniform float a"));

        let vertex = translate(
            ShaderStage::Vertex,
            "attribute vec2 position; varying vec2 v_uv; varying float v_t;\nvoid main() {}\n",
        )
        .unwrap();
        assert!(vertex.glsl.contains("layout(location = 0) in vec2 position;"));
        assert!(vertex.glsl.contains("layout(location = 0) out vec2 v_uv;"));
        assert!(vertex.glsl.contains("layout(location = 1) out float v_t;"));
    }

    #[test]
    fn check_source_accepts_valid_pairs_and_reports_the_stage() {
        let valid = ShaderSource::new(crate::QUAD_VERTEX_SHADER, FRAGMENT);
        check_source(&valid).unwrap();

        let broken = ShaderSource::new(
            crate::QUAD_VERTEX_SHADER,
            "precision mediump float;\nvoid main() { gl_FragColor = vec4(missing); }\n",
        );
        match check_source(&broken) {
            Err(HostError::Compile { stage, log }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn uniform_arrays_are_rejected() {
        let err = translate(
            ShaderStage::Fragment,
            "uniform float weights[4];\nvoid main() {}\n",
        )
        .unwrap_err();
        assert!(err.contains("weights[4]"));
    }
}
