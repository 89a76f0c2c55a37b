//! The per-shader lifecycle harness.
//!
//! ```text
//!   Unmounted ──mount()──▶ Mounting ──▶ Running ──unmount()──▶ Unmounted
//!                              │            │
//!                              ▼            ▼ context lost
//!                            Failed ◀───────┘
//! ```
//!
//! A [`ShaderHost`] owns one rendering context and at most one linked program
//! at a time. Each successful [`ShaderHost::tick`] requests exactly one more
//! frame from the surface, so ticks of one host never overlap; unmounting
//! cancels the outstanding request.

use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::error::HostError;
use crate::surface::{FrameHandle, RenderContext, Surface};
use crate::types::{RenderParameters, ShaderSource, ShaderStage, SurfaceSize, UniformBindings};

/// Two triangles covering clip space, laid out for a 4-vertex triangle strip.
pub const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
const QUAD_VERTEX_COUNT: u32 = 4;

/// Observable lifecycle phase of a [`ShaderHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Unmounted,
    Mounting,
    Running,
    Failed,
}

enum Phase<C: RenderContext> {
    Unmounted,
    Mounting,
    Running(Mounted<C>),
    Failed(HostError),
}

struct Locations<L> {
    position: Option<L>,
    resolution: Option<L>,
    time: Option<L>,
    speed: Option<L>,
    hue: Option<L>,
    saturation: Option<L>,
    intensity: Option<L>,
}

impl<L> Locations<L> {
    fn resolve<C>(context: &C, program: &C::Program, bindings: &UniformBindings) -> Self
    where
        C: RenderContext<Location = L>,
    {
        Self {
            position: context.attribute_location(program, &bindings.position),
            resolution: context.uniform_location(program, &bindings.resolution),
            time: context.uniform_location(program, &bindings.time),
            speed: context.uniform_location(program, &bindings.speed),
            hue: context.uniform_location(program, &bindings.hue),
            saturation: context.uniform_location(program, &bindings.saturation),
            intensity: context.uniform_location(program, &bindings.intensity),
        }
    }
}

struct Mounted<C: RenderContext> {
    context: C,
    program: C::Program,
    quad: C::Buffer,
    locations: Locations<C::Location>,
    mounted_at: Instant,
    size: Option<SurfaceSize>,
    drawable: SurfaceSize,
    pending: Option<FrameHandle>,
    frames: u64,
}

impl<C: RenderContext> Mounted<C> {
    fn draw_frame(
        &mut self,
        size: SurfaceSize,
        now: Instant,
        params: &RenderParameters,
    ) -> Result<(), HostError> {
        if self.context.is_lost() {
            return Err(HostError::ContextLost);
        }

        if self.size != Some(size) {
            debug!(
                width = size.width,
                height = size.height,
                previous = ?self.size,
                "resizing shader surface"
            );
            self.drawable = self.context.resize(size);
            self.size = Some(size);
        }

        let elapsed = now.saturating_duration_since(self.mounted_at).as_secs_f32();
        if !params.is_finite() {
            debug!(?params, "non-finite render parameters replaced with defaults");
        }
        let params = params.sanitized();

        let context = &mut self.context;
        let program = &mut self.program;
        let locations = &self.locations;
        if let Some(location) = locations.resolution.as_ref() {
            let drawable = self.drawable;
            context.set_uniform_vec2(
                program,
                location,
                [drawable.width as f32, drawable.height as f32],
            );
        }
        upload_f32(context, program, locations.time.as_ref(), elapsed);
        upload_f32(context, program, locations.speed.as_ref(), params.speed);
        upload_f32(context, program, locations.hue.as_ref(), params.hue);
        upload_f32(context, program, locations.saturation.as_ref(), params.saturation);
        upload_f32(context, program, locations.intensity.as_ref(), params.intensity);

        self.context.draw_quad(
            &self.program,
            &self.quad,
            self.locations.position.as_ref(),
            QUAD_VERTEX_COUNT,
        )?;
        self.frames += 1;
        Ok(())
    }

    fn release(self) {
        let Mounted {
            mut context,
            program,
            quad,
            ..
        } = self;
        context.delete_buffer(quad);
        context.delete_program(program);
    }
}

fn upload_f32<C: RenderContext>(
    context: &mut C,
    program: &mut C::Program,
    location: Option<&C::Location>,
    value: f32,
) {
    if let Some(location) = location {
        context.set_uniform_f32(program, location, value);
    }
}

/// Compiles both stages and links them, releasing every intermediate handle.
fn build_program<C: RenderContext>(
    context: &mut C,
    source: &ShaderSource,
) -> Result<C::Program, HostError> {
    let vertex = context
        .compile_shader(ShaderStage::Vertex, source.vertex())
        .map_err(|log| compile_error(ShaderStage::Vertex, log))?;
    let fragment = match context.compile_shader(ShaderStage::Fragment, source.fragment()) {
        Ok(shader) => shader,
        Err(log) => {
            context.delete_shader(vertex);
            return Err(compile_error(ShaderStage::Fragment, log));
        }
    };

    let linked = match context.create_program() {
        Ok(mut program) => match context.link_program(&mut program, &vertex, &fragment) {
            Ok(()) => Ok(program),
            Err(log) => {
                context.delete_program(program);
                Err(HostError::Link {
                    log: non_empty_log(log),
                })
            }
        },
        Err(lost) => Err(lost.into()),
    };

    context.delete_shader(vertex);
    context.delete_shader(fragment);
    linked
}

fn compile_error(stage: ShaderStage, log: String) -> HostError {
    HostError::Compile {
        stage,
        log: non_empty_log(log),
    }
}

fn non_empty_log(log: String) -> String {
    if log.trim().is_empty() {
        "no diagnostic log reported by the backend".to_string()
    } else {
        log
    }
}

/// Drives one shader program against a surface.
pub struct ShaderHost<C: RenderContext> {
    phase: Phase<C>,
}

impl<C: RenderContext> ShaderHost<C> {
    pub fn new() -> Self {
        Self {
            phase: Phase::Unmounted,
        }
    }

    pub fn state(&self) -> HostState {
        match self.phase {
            Phase::Unmounted => HostState::Unmounted,
            Phase::Mounting => HostState::Mounting,
            Phase::Running(_) => HostState::Running,
            Phase::Failed(_) => HostState::Failed,
        }
    }

    /// Error that moved the host into [`HostState::Failed`].
    pub fn failure(&self) -> Option<&HostError> {
        match &self.phase {
            Phase::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Frames drawn since the current mount.
    pub fn frames_drawn(&self) -> u64 {
        match &self.phase {
            Phase::Running(mounted) => mounted.frames,
            _ => 0,
        }
    }

    /// Size applied by the most recent resize, if any.
    pub fn surface_size(&self) -> Option<SurfaceSize> {
        match &self.phase {
            Phase::Running(mounted) => mounted.size,
            _ => None,
        }
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        match &self.phase {
            Phase::Running(mounted) => mounted.pending,
            _ => None,
        }
    }

    /// Compiles `source` against a fresh context from `surface` and starts the frame loop.
    ///
    /// Any program already mounted is released first. On failure nothing
    /// allocated during this call survives and the host is left in
    /// [`HostState::Failed`].
    pub fn mount<S>(
        &mut self,
        surface: &mut S,
        source: &ShaderSource,
        now: Instant,
    ) -> Result<(), HostError>
    where
        S: Surface<Context = C>,
    {
        self.unmount(surface);
        self.phase = Phase::Mounting;

        let mut context = match surface.acquire_context() {
            Ok(context) => context,
            Err(err) => return Err(self.fail(err)),
        };
        let program = match build_program(&mut context, source) {
            Ok(program) => program,
            Err(err) => return Err(self.fail(err)),
        };
        let quad = match context.create_vertex_buffer(&QUAD_VERTICES) {
            Ok(buffer) => buffer,
            Err(lost) => {
                context.delete_program(program);
                return Err(self.fail(lost.into()));
            }
        };
        let locations = Locations::resolve(&context, &program, source.bindings());
        if locations.position.is_none() {
            warn!(
                attribute = %source.bindings().position,
                "position attribute not found in linked program"
            );
        }

        let pending = surface.request_frame();
        debug!(?pending, "shader mounted");
        self.phase = Phase::Running(Mounted {
            context,
            program,
            quad,
            locations,
            mounted_at: now,
            size: None,
            drawable: SurfaceSize::default(),
            pending: Some(pending),
            frames: 0,
        });
        Ok(())
    }

    /// Renders one frame and requests the next.
    ///
    /// Does nothing unless the host is running. A lost context releases the
    /// program, stops the loop and is returned as [`HostError::ContextLost`].
    pub fn tick<S>(
        &mut self,
        surface: &mut S,
        now: Instant,
        params: &RenderParameters,
    ) -> Result<(), HostError>
    where
        S: Surface<Context = C>,
    {
        let mut mounted = match std::mem::replace(&mut self.phase, Phase::Unmounted) {
            Phase::Running(mounted) => mounted,
            other => {
                trace!(state = ?self.state_of(&other), "tick ignored; host not running");
                self.phase = other;
                return Ok(());
            }
        };

        mounted.pending = None;
        let size = surface.layout_size().to_device();
        match mounted.draw_frame(size, now, params) {
            Ok(()) => {
                mounted.pending = Some(surface.request_frame());
                self.phase = Phase::Running(mounted);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, frames = mounted.frames, "stopping shader frame loop");
                mounted.release();
                self.phase = Phase::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Cancels the pending frame and releases the program. Safe to call at any time.
    pub fn unmount<S>(&mut self, surface: &mut S)
    where
        S: Surface<Context = C>,
    {
        match std::mem::replace(&mut self.phase, Phase::Unmounted) {
            Phase::Running(mounted) => {
                if let Some(handle) = mounted.pending {
                    surface.cancel_frame(handle);
                }
                debug!(frames = mounted.frames, "shader unmounted");
                mounted.release();
            }
            Phase::Unmounted | Phase::Mounting | Phase::Failed(_) => {}
        }
    }

    fn fail(&mut self, err: HostError) -> HostError {
        warn!(error = %err, "shader mount failed");
        self.phase = Phase::Failed(err.clone());
        err
    }

    fn state_of(&self, phase: &Phase<C>) -> HostState {
        match phase {
            Phase::Unmounted => HostState::Unmounted,
            Phase::Mounting => HostState::Mounting,
            Phase::Running(_) => HostState::Running,
            Phase::Failed(_) => HostState::Failed,
        }
    }
}

impl<C: RenderContext> Default for ShaderHost<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RenderContext> Drop for ShaderHost<C> {
    fn drop(&mut self) {
        if let Phase::Running(mounted) = std::mem::replace(&mut self.phase, Phase::Unmounted) {
            mounted.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{RecordingSurface, COMPILE_ERROR_MARKER, LINK_ERROR_MARKER};
    use crate::types::{LayoutSize, QUAD_VERTEX_SHADER};

    const FRAGMENT: &str = "precision mediump float;
uniform vec2 resolution;
uniform float time;
uniform float speed;
uniform float colorHue;
uniform float colorSaturation;
uniform float intensity;
void main() {
  gl_FragColor = vec4(colorHue, colorSaturation, intensity, time * speed);
}
";

    fn source() -> ShaderSource {
        ShaderSource::new(QUAD_VERTEX_SHADER, FRAGMENT)
    }

    fn surface() -> RecordingSurface {
        RecordingSurface::new(LayoutSize::new(800.0, 600.0, 1.0))
    }

    #[test]
    fn mount_reaches_running_and_requests_first_frame() {
        let mut surface = surface();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), Instant::now())
            .expect("mount");

        assert_eq!(host.state(), HostState::Running);
        assert_eq!(surface.requested_frames(), 1);
        assert!(host.pending_frame().is_some());

        let ledger = surface.ledger();
        assert_eq!(ledger.live_programs, 1);
        assert_eq!(ledger.live_buffers, 1);
        assert_eq!(ledger.live_shaders, 0, "shaders released once linked");
        assert_eq!(ledger.buffer_uploads, vec![QUAD_VERTICES.to_vec()]);
    }

    #[test]
    fn fragment_syntax_error_names_stage_and_leaks_nothing() {
        let mut surface = surface();
        let broken = format!("{FRAGMENT}\n{COMPILE_ERROR_MARKER}\n");
        let mut host = ShaderHost::new();
        let err = host
            .mount(
                &mut surface,
                &ShaderSource::new(QUAD_VERTEX_SHADER, broken),
                Instant::now(),
            )
            .unwrap_err();

        match &err {
            HostError::Compile { stage, log } => {
                assert_eq!(*stage, ShaderStage::Fragment);
                assert_eq!(stage.to_string(), "fragment");
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(host.state(), HostState::Failed);
        assert_eq!(host.failure(), Some(&err));
        assert_eq!(surface.ledger().live_handles(), 0);
        assert_eq!(surface.requested_frames(), 0);
    }

    #[test]
    fn vertex_error_is_reported_before_fragment_compiles() {
        let mut surface = surface();
        let broken = format!("{QUAD_VERTEX_SHADER}{COMPILE_ERROR_MARKER}\n");
        let mut host = ShaderHost::new();
        let err = host
            .mount(
                &mut surface,
                &ShaderSource::new(broken, FRAGMENT),
                Instant::now(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            HostError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
        let ledger = surface.ledger();
        assert_eq!(ledger.compiled, 0);
        assert_eq!(ledger.live_handles(), 0);
    }

    #[test]
    fn link_failure_releases_program_and_shaders() {
        let mut surface = surface();
        let broken = format!("{FRAGMENT}{LINK_ERROR_MARKER}\n");
        let mut host = ShaderHost::new();
        let err = host
            .mount(
                &mut surface,
                &ShaderSource::new(QUAD_VERTEX_SHADER, broken),
                Instant::now(),
            )
            .unwrap_err();

        match err {
            HostError::Link { log } => assert!(log.contains("unresolved")),
            other => panic!("unexpected error {other:?}"),
        }
        let ledger = surface.ledger();
        assert_eq!(ledger.compiled, 2);
        assert_eq!(ledger.live_handles(), 0);
    }

    #[test]
    fn unavailable_context_fails_mount() {
        let mut surface = surface();
        surface.fail_next_acquire("no adapter");
        let mut host = ShaderHost::new();
        let err = host
            .mount(&mut surface, &source(), Instant::now())
            .unwrap_err();

        assert_eq!(err, HostError::ContextUnavailable("no adapter".into()));
        assert_eq!(host.state(), HostState::Failed);
        assert_eq!(surface.ledger().live_handles(), 0);
    }

    #[test]
    fn tick_uploads_uniforms_and_requests_exactly_one_frame() {
        let mut surface = surface();
        let start = Instant::now();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), start).expect("mount");

        let params = RenderParameters {
            speed: 2.0,
            hue: 0.25,
            saturation: 0.6,
            intensity: 1.5,
        };
        host.tick(&mut surface, start + Duration::from_millis(1500), &params)
            .expect("tick");

        assert_eq!(surface.requested_frames(), 2);
        assert_eq!(host.frames_drawn(), 1);
        let ledger = surface.ledger();
        assert_eq!(ledger.draws, vec![4]);
        assert_eq!(ledger.uniform("resolution"), Some(vec![800.0, 600.0]));
        assert_eq!(ledger.uniform("time"), Some(vec![1.5]));
        assert_eq!(ledger.uniform("speed"), Some(vec![2.0]));
        assert_eq!(ledger.uniform("colorHue"), Some(vec![0.25]));
        assert_eq!(ledger.uniform("colorSaturation"), Some(vec![0.6]));
        assert_eq!(ledger.uniform("intensity"), Some(vec![1.5]));
    }

    #[test]
    fn ticks_at_same_size_resize_once() {
        let mut surface = surface();
        let start = Instant::now();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), start).expect("mount");

        let params = RenderParameters::default();
        host.tick(&mut surface, start, &params).expect("first tick");
        host.tick(&mut surface, start, &params).expect("second tick");
        assert_eq!(surface.ledger().resizes, vec![SurfaceSize::new(800, 600)]);

        surface.set_layout(LayoutSize::new(400.0, 300.0, 2.0));
        host.tick(&mut surface, start, &params).expect("third tick");
        assert_eq!(
            surface.ledger().resizes,
            vec![SurfaceSize::new(800, 600)],
            "same device size after a scale change is not a resize"
        );

        surface.set_layout(LayoutSize::new(500.0, 300.0, 2.0));
        host.tick(&mut surface, start, &params).expect("fourth tick");
        assert_eq!(surface.ledger().resizes.len(), 2);
        assert_eq!(host.surface_size(), Some(SurfaceSize::new(1000, 600)));
    }

    #[test]
    fn resolution_follows_the_clamped_drawable() {
        let mut surface = RecordingSurface::new(LayoutSize::new(5000.0, 100.0, 1.0));
        surface.limit_dimension(4096);
        let start = Instant::now();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), start).expect("mount");
        host.tick(&mut surface, start, &RenderParameters::default())
            .expect("tick");

        let ledger = surface.ledger();
        assert_eq!(ledger.resizes, vec![SurfaceSize::new(5000, 100)]);
        assert_eq!(ledger.uniform("resolution"), Some(vec![4096.0, 100.0]));
        assert_eq!(host.surface_size(), Some(SurfaceSize::new(5000, 100)));
    }

    #[test]
    fn zero_sized_surface_still_draws() {
        let mut surface = RecordingSurface::new(LayoutSize::new(0.0, 0.0, 1.0));
        let start = Instant::now();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), start).expect("mount");
        host.tick(&mut surface, start, &RenderParameters::default())
            .expect("tick");

        let ledger = surface.ledger();
        assert_eq!(ledger.resizes, vec![SurfaceSize::new(0, 0)]);
        assert_eq!(ledger.uniform("resolution"), Some(vec![0.0, 0.0]));
        assert_eq!(ledger.draws.len(), 1);
    }

    #[test]
    fn non_finite_parameters_upload_defaults() {
        let mut surface = surface();
        let start = Instant::now();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), start).expect("mount");
        let params = RenderParameters {
            speed: f32::NAN,
            hue: f32::INFINITY,
            saturation: 0.3,
            intensity: f32::NEG_INFINITY,
        };
        host.tick(&mut surface, start, &params).expect("tick");

        let ledger = surface.ledger();
        assert_eq!(ledger.uniform("speed"), Some(vec![1.0]));
        assert_eq!(ledger.uniform("colorHue"), Some(vec![0.5]));
        assert_eq!(ledger.uniform("colorSaturation"), Some(vec![0.3]));
        assert_eq!(ledger.uniform("intensity"), Some(vec![1.0]));
    }

    #[test]
    fn missing_uniforms_are_skipped() {
        let mut surface = surface();
        let fragment = "uniform float time;\nvoid main() { gl_FragColor = vec4(time); }\n";
        let mut host = ShaderHost::new();
        let start = Instant::now();
        host.mount(
            &mut surface,
            &ShaderSource::new(QUAD_VERTEX_SHADER, fragment),
            start,
        )
        .expect("mount");
        host.tick(&mut surface, start, &RenderParameters::default())
            .expect("tick");

        let ledger = surface.ledger();
        assert!(ledger.uniform("time").is_some());
        assert!(ledger.uniform("speed").is_none());
        assert_eq!(ledger.draws.len(), 1);
    }

    #[test]
    fn unmount_before_mount_and_twice_is_noop() {
        let mut surface = surface();
        let mut host: ShaderHost<crate::testing::RecordingContext> = ShaderHost::new();
        host.unmount(&mut surface);
        host.unmount(&mut surface);
        assert_eq!(host.state(), HostState::Unmounted);

        host.mount(&mut surface, &source(), Instant::now())
            .expect("mount");
        host.unmount(&mut surface);
        host.unmount(&mut surface);
        assert_eq!(host.state(), HostState::Unmounted);
        assert_eq!(surface.ledger().live_handles(), 0);
    }

    #[test]
    fn unmount_cancels_pending_frame() {
        let mut surface = surface();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), Instant::now())
            .expect("mount");
        let pending = host.pending_frame().expect("pending frame");

        host.unmount(&mut surface);
        assert_eq!(surface.cancelled_frames(), vec![pending]);
        assert!(surface.outstanding_frames().is_empty());
    }

    #[test]
    fn tick_after_unmount_does_not_schedule() {
        let mut surface = surface();
        let start = Instant::now();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), start).expect("mount");
        host.unmount(&mut surface);

        host.tick(&mut surface, start, &RenderParameters::default())
            .expect("idle tick");
        assert_eq!(surface.requested_frames(), 1);
        assert!(surface.ledger().draws.is_empty());
    }

    #[test]
    fn lost_context_stops_the_loop() {
        let mut surface = surface();
        let start = Instant::now();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), start).expect("mount");
        host.tick(&mut surface, start, &RenderParameters::default())
            .expect("tick");
        assert_eq!(surface.requested_frames(), 2);

        surface.lose_context();
        let err = host
            .tick(&mut surface, start, &RenderParameters::default())
            .unwrap_err();
        assert_eq!(err, HostError::ContextLost);
        assert_eq!(host.state(), HostState::Failed);
        assert_eq!(surface.requested_frames(), 2, "no frame after loss");
        assert_eq!(surface.ledger().live_handles(), 0);

        host.tick(&mut surface, start, &RenderParameters::default())
            .expect("failed host ignores ticks");
        assert_eq!(surface.requested_frames(), 2);
    }

    #[test]
    fn remount_keeps_a_single_program() {
        let mut surface = surface();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), Instant::now())
            .expect("first mount");
        let first = host.pending_frame().expect("pending");
        host.mount(&mut surface, &source(), Instant::now())
            .expect("second mount");

        let ledger = surface.ledger();
        assert_eq!(ledger.live_programs, 1);
        assert_eq!(ledger.live_buffers, 1);
        assert_eq!(ledger.programs_created, 2);
        assert_eq!(surface.cancelled_frames(), vec![first]);
    }

    #[test]
    fn failed_host_can_be_mounted_again() {
        let mut surface = surface();
        let mut host = ShaderHost::new();
        let broken = ShaderSource::new(QUAD_VERTEX_SHADER, COMPILE_ERROR_MARKER);
        assert!(host.mount(&mut surface, &broken, Instant::now()).is_err());
        host.mount(&mut surface, &source(), Instant::now())
            .expect("retry with a valid source");
        assert_eq!(host.state(), HostState::Running);
        assert!(host.failure().is_none());
    }

    #[test]
    fn dropping_a_running_host_releases_resources() {
        let mut surface = surface();
        {
            let mut host = ShaderHost::new();
            host.mount(&mut surface, &source(), Instant::now())
                .expect("mount");
        }
        assert_eq!(surface.ledger().live_handles(), 0);
    }

    #[test]
    fn elapsed_time_never_goes_negative() {
        let mut surface = surface();
        let start = Instant::now();
        let mut host = ShaderHost::new();
        host.mount(&mut surface, &source(), start + Duration::from_secs(5))
            .expect("mount");
        host.tick(&mut surface, start, &RenderParameters::default())
            .expect("tick");
        assert_eq!(surface.ledger().uniform("time"), Some(vec![0.0]));
    }
}
