//! Contracts between [`crate::ShaderHost`] and its environment.
//!
//! A [`Surface`] is everything the harness needs from the outside world: a
//! layout size, a way to obtain a rendering context, and a per-frame
//! scheduling primitive. The context itself is a [`RenderContext`], a small
//! GL-shaped API that both the `wgpu` backend and test doubles implement.

use std::fmt;

use crate::error::{ContextLost, HostError};
use crate::types::{LayoutSize, ShaderStage, SurfaceSize};

/// Token identifying one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host environment a shader is drawn into.
pub trait Surface {
    type Context: RenderContext;

    /// Current layout size in device-independent pixels.
    fn layout_size(&self) -> LayoutSize;

    /// Creates a fresh rendering context bound to this surface.
    fn acquire_context(&mut self) -> Result<Self::Context, HostError>;

    /// Asks the platform to invoke the frame callback once more.
    fn request_frame(&mut self) -> FrameHandle;

    /// Withdraws a previously requested frame. Unknown handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// GL-shaped rendering backend.
///
/// Compile and link failures carry the backend's diagnostic log. Every handle
/// returned here must be released through the matching `delete_*` call; the
/// harness guarantees it does so on every exit path.
pub trait RenderContext {
    type Shader;
    type Program;
    type Buffer;
    type Location: Clone + fmt::Debug;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;

    fn delete_shader(&mut self, shader: Self::Shader);

    fn create_program(&mut self) -> Result<Self::Program, ContextLost>;

    fn link_program(
        &mut self,
        program: &mut Self::Program,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<(), String>;

    fn delete_program(&mut self, program: Self::Program);

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<Self::Buffer, ContextLost>;

    fn delete_buffer(&mut self, buffer: Self::Buffer);

    fn attribute_location(&self, program: &Self::Program, name: &str) -> Option<Self::Location>;

    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<Self::Location>;

    /// Resizes the backing drawable and the viewport.
    ///
    /// Returns the size actually allocated, which backends may clamp below
    /// the request.
    fn resize(&mut self, size: SurfaceSize) -> SurfaceSize;

    fn set_uniform_f32(&mut self, program: &mut Self::Program, location: &Self::Location, value: f32);

    fn set_uniform_vec2(
        &mut self,
        program: &mut Self::Program,
        location: &Self::Location,
        value: [f32; 2],
    );

    /// Draws `vertex_count` vertices of `buffer` as a triangle strip.
    fn draw_quad(
        &mut self,
        program: &Self::Program,
        buffer: &Self::Buffer,
        position: Option<&Self::Location>,
        vertex_count: u32,
    ) -> Result<(), ContextLost>;

    fn is_lost(&self) -> bool;
}
