//! In-memory [`Surface`] and [`RenderContext`] that record every call.
//!
//! Shaders "compile" unless they contain [`COMPILE_ERROR_MARKER`] and "link"
//! unless either stage contains [`LINK_ERROR_MARKER`]. Attribute and uniform
//! locations resolve for names declared with `attribute` / `uniform` lines.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ContextLost, HostError};
use crate::surface::{FrameHandle, RenderContext, Surface};
use crate::types::{LayoutSize, ShaderStage, SurfaceSize};

pub const COMPILE_ERROR_MARKER: &str = "#error recording backend rejects this source";
pub const LINK_ERROR_MARKER: &str = "// recording-backend: unresolved symbol";

/// Snapshot of everything a [`RecordingContext`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub live_shaders: usize,
    pub live_programs: usize,
    pub live_buffers: usize,
    pub compiled: usize,
    pub programs_created: usize,
    pub buffer_uploads: Vec<Vec<f32>>,
    pub resizes: Vec<SurfaceSize>,
    pub draws: Vec<u32>,
    pub uniforms: HashMap<String, Vec<f32>>,
    pub lost: bool,
    /// Largest drawable dimension `resize` will allocate.
    pub max_dimension: Option<u32>,
}

impl Ledger {
    pub fn live_handles(&self) -> usize {
        self.live_shaders + self.live_programs + self.live_buffers
    }

    /// Last value uploaded to `name`.
    pub fn uniform(&self, name: &str) -> Option<Vec<f32>> {
        self.uniforms.get(name).cloned()
    }
}

#[derive(Debug)]
pub struct RecordedShader {
    source: String,
}

#[derive(Debug)]
pub struct RecordedProgram {
    sources: Vec<String>,
}

#[derive(Debug)]
pub struct RecordedBuffer;

pub struct RecordingContext {
    ledger: Rc<RefCell<Ledger>>,
}

fn declares(sources: &[String], qualifier: &str, name: &str) -> bool {
    sources.iter().flat_map(|source| source.lines()).any(|line| {
        let mut tokens = line.split_whitespace();
        tokens.next() == Some(qualifier)
            && tokens
                .last()
                .map(|token| token.trim_end_matches(';') == name)
                .unwrap_or(false)
    })
}

impl RenderContext for RecordingContext {
    type Shader = RecordedShader;
    type Program = RecordedProgram;
    type Buffer = RecordedBuffer;
    type Location = String;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String> {
        if source.contains(COMPILE_ERROR_MARKER) {
            return Err(format!("ERROR: 0:1: {stage} source rejected by recording backend"));
        }
        let mut ledger = self.ledger.borrow_mut();
        ledger.live_shaders += 1;
        ledger.compiled += 1;
        Ok(RecordedShader {
            source: source.to_string(),
        })
    }

    fn delete_shader(&mut self, _shader: Self::Shader) {
        self.ledger.borrow_mut().live_shaders -= 1;
    }

    fn create_program(&mut self) -> Result<Self::Program, ContextLost> {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.lost {
            return Err(ContextLost);
        }
        ledger.live_programs += 1;
        ledger.programs_created += 1;
        Ok(RecordedProgram {
            sources: Vec::new(),
        })
    }

    fn link_program(
        &mut self,
        program: &mut Self::Program,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<(), String> {
        for shader in [vertex, fragment] {
            if shader.source.contains(LINK_ERROR_MARKER) {
                return Err("unresolved symbol in recording backend".to_string());
            }
        }
        program.sources = vec![vertex.source.clone(), fragment.source.clone()];
        Ok(())
    }

    fn delete_program(&mut self, _program: Self::Program) {
        self.ledger.borrow_mut().live_programs -= 1;
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<Self::Buffer, ContextLost> {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.lost {
            return Err(ContextLost);
        }
        ledger.live_buffers += 1;
        ledger.buffer_uploads.push(data.to_vec());
        Ok(RecordedBuffer)
    }

    fn delete_buffer(&mut self, _buffer: Self::Buffer) {
        self.ledger.borrow_mut().live_buffers -= 1;
    }

    fn attribute_location(&self, program: &Self::Program, name: &str) -> Option<Self::Location> {
        declares(&program.sources, "attribute", name).then(|| name.to_string())
    }

    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<Self::Location> {
        declares(&program.sources, "uniform", name).then(|| name.to_string())
    }

    fn resize(&mut self, size: SurfaceSize) -> SurfaceSize {
        let mut ledger = self.ledger.borrow_mut();
        ledger.resizes.push(size);
        match ledger.max_dimension {
            Some(max) => SurfaceSize::new(size.width.min(max), size.height.min(max)),
            None => size,
        }
    }

    fn set_uniform_f32(&mut self, _program: &mut Self::Program, location: &Self::Location, value: f32) {
        self.ledger
            .borrow_mut()
            .uniforms
            .insert(location.clone(), vec![value]);
    }

    fn set_uniform_vec2(
        &mut self,
        _program: &mut Self::Program,
        location: &Self::Location,
        value: [f32; 2],
    ) {
        self.ledger
            .borrow_mut()
            .uniforms
            .insert(location.clone(), value.to_vec());
    }

    fn draw_quad(
        &mut self,
        _program: &Self::Program,
        _buffer: &Self::Buffer,
        _position: Option<&Self::Location>,
        vertex_count: u32,
    ) -> Result<(), ContextLost> {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.lost {
            return Err(ContextLost);
        }
        ledger.draws.push(vertex_count);
        Ok(())
    }

    fn is_lost(&self) -> bool {
        self.ledger.borrow().lost
    }
}

/// Surface whose frame requests are only recorded, never delivered.
pub struct RecordingSurface {
    ledger: Rc<RefCell<Ledger>>,
    layout: LayoutSize,
    next_frame: u64,
    requested: u32,
    outstanding: Vec<FrameHandle>,
    cancelled: Vec<FrameHandle>,
    acquire_error: Option<String>,
}

impl RecordingSurface {
    pub fn new(layout: LayoutSize) -> Self {
        Self {
            ledger: Rc::new(RefCell::new(Ledger::default())),
            layout,
            next_frame: 1,
            requested: 0,
            outstanding: Vec::new(),
            cancelled: Vec::new(),
            acquire_error: None,
        }
    }

    pub fn ledger(&self) -> Ledger {
        self.ledger.borrow().clone()
    }

    pub fn set_layout(&mut self, layout: LayoutSize) {
        self.layout = layout;
    }

    /// Caps the drawable size contexts from this surface allocate.
    pub fn limit_dimension(&mut self, max: u32) {
        self.ledger.borrow_mut().max_dimension = Some(max);
    }

    pub fn lose_context(&mut self) {
        self.ledger.borrow_mut().lost = true;
    }

    /// Makes the next [`Surface::acquire_context`] call fail with `reason`.
    pub fn fail_next_acquire(&mut self, reason: impl Into<String>) {
        self.acquire_error = Some(reason.into());
    }

    pub fn requested_frames(&self) -> u32 {
        self.requested
    }

    pub fn outstanding_frames(&self) -> &[FrameHandle] {
        &self.outstanding
    }

    pub fn cancelled_frames(&self) -> Vec<FrameHandle> {
        self.cancelled.clone()
    }
}

impl Surface for RecordingSurface {
    type Context = RecordingContext;

    fn layout_size(&self) -> LayoutSize {
        self.layout
    }

    fn acquire_context(&mut self) -> Result<Self::Context, HostError> {
        if let Some(reason) = self.acquire_error.take() {
            return Err(HostError::ContextUnavailable(reason));
        }
        self.ledger.borrow_mut().lost = false;
        Ok(RecordingContext {
            ledger: Rc::clone(&self.ledger),
        })
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_frame);
        self.next_frame += 1;
        self.requested += 1;
        self.outstanding.clear();
        self.outstanding.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(index) = self.outstanding.iter().position(|pending| *pending == handle) {
            self.outstanding.remove(index);
            self.cancelled.push(handle);
        }
    }
}
