use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shaderhost::gpu::WgpuContext;
use shaderhost::{HostError, HostState, RenderParameters, ShaderHost, WindowSurface};
use themes::{ParameterConfig, ThemeConfig, VariantRegistry, RANDOM_INITIAL};
use tracing_subscriber::EnvFilter;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, StartCause, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::cli::{parse_size, RunArgs};
use crate::paths::load_themes;

const WINDOW_TITLE: &str = "Portfolio";
const DEFAULT_WINDOW_SIZE: (u32, u32) = (1280, 720);
const SPEED_STEP: f32 = 0.1;
const HUE_STEP: f32 = 0.05;

pub fn run(args: RunArgs, config: Option<&Path>) -> Result<()> {
    let loaded = load_themes(config)?;
    let params = resolve_parameters(&args, &loaded.config);
    let mut rng = seeded_rng(args.seed);
    let initial = initial_theme(
        args.theme.as_deref(),
        &loaded.config,
        &loaded.registry,
        &mut rng,
    );
    let (width, height) = match args.size.as_deref() {
        Some(value) => parse_size(value).map_err(|err| anyhow!(err))?,
        None => DEFAULT_WINDOW_SIZE,
    };

    tracing::info!(
        theme = %initial,
        speed = params.speed,
        hue = params.hue,
        saturation = params.saturation,
        intensity = params.intensity,
        "starting portfolio renderer"
    );

    let event_loop = EventLoop::new().context("failed to create window event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(f64::from(width), f64::from(height)))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let mut app = App::new(WindowSurface::new(window), loaded.registry, params, rng);
    app.activate(&initial)?;

    event_loop
        .run(|event, elwt| app.handle_event(event, elwt))
        .map_err(|err| anyhow!("window event loop error: {err}"))?;

    app.finish()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Config parameters overlaid with CLI flags, clamped to the slider ranges.
fn resolve_parameters(args: &RunArgs, config: &ThemeConfig) -> RenderParameters {
    let overrides = ParameterConfig {
        speed: args.speed,
        hue: args.hue,
        saturation: args.saturation,
        intensity: args.intensity,
    };
    let requested = overrides.apply(config.render_parameters());
    let clamped = requested.clamped();
    if clamped != requested {
        tracing::warn!(?requested, ?clamped, "parameters clamped to their ranges");
    }
    clamped
}

/// CLI theme, then the configured initial theme, then the registry default.
fn initial_theme(
    requested: Option<&str>,
    config: &ThemeConfig,
    registry: &VariantRegistry,
    rng: &mut StdRng,
) -> String {
    let default_key = registry.default_variant().key();
    match requested.or(config.initial.as_deref()) {
        Some(RANDOM_INITIAL) => registry
            .pick_random_other("", rng)
            .unwrap_or(default_key)
            .to_string(),
        Some(key) => registry.resolve_or_default(key).key().to_string(),
        None => default_key.to_string(),
    }
}

/// Themes to try for `key`: the theme itself, then every other enabled theme
/// in authoring order, each at most once.
fn mount_order(registry: &VariantRegistry, key: &str) -> Vec<String> {
    let first = registry.resolve_or_default(key).key().to_string();
    let mut order = vec![first];
    while let Some(next) = order.last().and_then(|last| registry.next_enabled(last)) {
        if order.iter().any(|seen| seen == next) {
            break;
        }
        let next = next.to_string();
        order.push(next);
    }
    order
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Shuffle,
    Next,
    Previous,
    SpeedUp,
    SpeedDown,
    HueStep,
    Quit,
}

fn action_for_key(key: &Key) -> Option<Action> {
    match key {
        Key::Named(NamedKey::Space) => Some(Action::Shuffle),
        Key::Named(NamedKey::ArrowRight) => Some(Action::Next),
        Key::Named(NamedKey::ArrowLeft) => Some(Action::Previous),
        Key::Named(NamedKey::Escape) => Some(Action::Quit),
        Key::Character(text) => match text.as_str() {
            "]" => Some(Action::SpeedUp),
            "[" => Some(Action::SpeedDown),
            "h" | "H" => Some(Action::HueStep),
            _ => None,
        },
        _ => None,
    }
}

fn adjust_parameters(params: RenderParameters, action: Action) -> RenderParameters {
    match action {
        Action::SpeedUp => RenderParameters {
            speed: RenderParameters::SPEED.clamp(params.speed + SPEED_STEP),
            ..params
        },
        Action::SpeedDown => RenderParameters {
            speed: RenderParameters::SPEED.clamp(params.speed - SPEED_STEP),
            ..params
        },
        Action::HueStep => {
            let hue = params.hue + HUE_STEP;
            RenderParameters {
                hue: if hue > 1.0 { hue - 1.0 } else { hue },
                ..params
            }
        }
        Action::Shuffle | Action::Next | Action::Previous | Action::Quit => params,
    }
}

struct App {
    surface: WindowSurface,
    host: ShaderHost<WgpuContext>,
    registry: VariantRegistry,
    params: RenderParameters,
    rng: StdRng,
    current: String,
    context_losses: u32,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(
        surface: WindowSurface,
        registry: VariantRegistry,
        params: RenderParameters,
        rng: StdRng,
    ) -> Self {
        Self {
            surface,
            host: ShaderHost::new(),
            registry,
            params,
            rng,
            current: String::new(),
            context_losses: 0,
            failure: None,
        }
    }

    /// Mounts `key`, stepping to the next enabled theme while shaders fail to build.
    fn activate(&mut self, key: &str) -> Result<()> {
        let order = mount_order(&self.registry, key);

        for candidate in &order {
            let variant = self.registry.resolve_or_default(candidate);
            let name = variant.display_name().to_string();
            let source = variant.shader_source();

            match self.host.mount(&mut self.surface, &source, Instant::now()) {
                Ok(()) => {
                    tracing::info!(theme = %candidate, name = %name, "theme mounted");
                    self.surface
                        .window()
                        .set_title(&format!("{WINDOW_TITLE} - {name}"));
                    self.current = candidate.clone();
                    return Ok(());
                }
                Err(err) if err.is_shader_error() => {
                    tracing::warn!(theme = %candidate, error = %err, "theme failed to build");
                }
                Err(err) => {
                    return Err(anyhow::Error::new(err)
                        .context(format!("failed to mount theme `{candidate}`")));
                }
            }
        }

        bail!("none of {} themes could be mounted", order.len())
    }

    fn handle_event(&mut self, event: Event<()>, elwt: &EventLoopWindowTarget<()>) {
        match event {
            Event::NewEvents(StartCause::Init) => elwt.set_control_flow(ControlFlow::Wait),
            Event::WindowEvent { window_id, event } if window_id == self.surface.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        self.shutdown();
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event, elwt),
                    WindowEvent::Resized(size) => {
                        tracing::debug!(width = size.width, height = size.height, "window resized");
                    }
                    WindowEvent::RedrawRequested => self.redraw(elwt),
                    _ => {}
                }
            }
            Event::LoopExiting => self.shutdown(),
            _ => {}
        }
    }

    fn handle_key(&mut self, event: &KeyEvent, elwt: &EventLoopWindowTarget<()>) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let Some(action) = action_for_key(&event.logical_key) else {
            return;
        };

        match action {
            Action::Quit => {
                self.shutdown();
                elwt.exit();
            }
            Action::Shuffle => {
                let next = self
                    .registry
                    .pick_random_other(&self.current, &mut self.rng)
                    .map(str::to_owned);
                self.switch_to(next, elwt);
            }
            Action::Next => {
                let next = self.registry.next_enabled(&self.current).map(str::to_owned);
                self.switch_to(next, elwt);
            }
            Action::Previous => {
                let previous = self
                    .registry
                    .previous_enabled(&self.current)
                    .map(str::to_owned);
                self.switch_to(previous, elwt);
            }
            Action::SpeedUp | Action::SpeedDown | Action::HueStep => {
                self.params = adjust_parameters(self.params, action);
                tracing::info!(speed = self.params.speed, hue = self.params.hue, "parameters updated");
            }
        }
    }

    fn switch_to(&mut self, key: Option<String>, elwt: &EventLoopWindowTarget<()>) {
        let Some(key) = key else {
            tracing::warn!("no enabled themes to switch to");
            return;
        };
        if key == self.current && self.host.state() == HostState::Running {
            return;
        }
        if let Err(err) = self.activate(&key) {
            self.fail(elwt, err);
        }
    }

    fn redraw(&mut self, elwt: &EventLoopWindowTarget<()>) {
        if self.surface.take_due_frame().is_none() {
            return;
        }
        match self.host.tick(&mut self.surface, Instant::now(), &self.params) {
            Ok(()) => self.context_losses = 0,
            Err(HostError::ContextLost) => {
                self.context_losses += 1;
                if self.context_losses > 1 {
                    self.fail(elwt, anyhow!("rendering context lost twice in a row"));
                    return;
                }
                tracing::warn!(theme = %self.current, "rendering context lost; remounting");
                let current = self.current.clone();
                if let Err(err) = self.activate(&current) {
                    self.fail(elwt, err);
                }
            }
            Err(err) => self.fail(elwt, anyhow::Error::new(err).context("render loop failed")),
        }
    }

    fn fail(&mut self, elwt: &EventLoopWindowTarget<()>, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.failure = Some(err);
        self.shutdown();
        elwt.exit();
    }

    fn shutdown(&mut self) {
        self.host.unmount(&mut self.surface);
    }

    fn finish(self) -> Result<()> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
