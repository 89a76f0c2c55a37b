//! `wgpu` implementation of [`crate::RenderContext`].
//!
//! - `compile` rewrites WebGL-dialect GLSL into GLSL 450 that naga accepts,
//!   hoisting loose uniforms into std140 blocks, and can vet a source with
//!   naga alone through [`check_source`].
//! - `uniforms` lays those blocks out and keeps a CPU copy that is written
//!   through the queue before every draw.
//! - `context` owns the instance, device and swapchain for one window.

mod compile;
mod context;
mod uniforms;

pub use compile::check_source;
pub use context::{GpuBuffer, GpuLocation, GpuProgram, GpuShader, WgpuContext};
