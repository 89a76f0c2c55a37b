//! Lifecycle harness for full-surface GLSL background shaders.
//!
//! [`ShaderHost`] compiles a vertex/fragment pair against a [`Surface`],
//! draws a single quad each frame with the standard uniform set (resolution,
//! time, speed, hue, saturation, intensity) and tears everything down again
//! on unmount. The rendering API is abstracted behind [`RenderContext`]; the
//! crate ships a `wgpu` implementation in [`gpu`] and a winit-backed
//! [`WindowSurface`].
//!
//! ```text
//! Surface ──acquire_context──▶ RenderContext ◀── ShaderHost::{mount, tick, unmount}
//!    ▲                                                   │
//!    └──────────── request_frame / cancel_frame ─────────┘
//! ```

mod error;
pub mod gpu;
mod host;
mod surface;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod types;
mod window;

pub use error::{ContextLost, HostError};
pub use host::{HostState, ShaderHost, QUAD_VERTICES};
pub use surface::{FrameHandle, RenderContext, Surface};
pub use types::{
    LayoutSize, ParameterRange, RenderParameters, ShaderSource, ShaderStage, SurfaceSize,
    UniformBindings, QUAD_VERTEX_SHADER,
};
pub use window::WindowSurface;
