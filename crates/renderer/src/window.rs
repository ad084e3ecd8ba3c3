use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use exprgen::{Generator, Pattern};
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::runtime::{FrameScheduler, ResetTimer};
use crate::types::RendererConfig;

const WINDOW_TITLE: &str = "randshade";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    Reset,
    Close,
}

/// Maps a pressed key onto a window action.
pub(crate) fn key_action(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::Space | NamedKey::Enter) => Some(KeyAction::Reset),
        Key::Named(NamedKey::Escape) => Some(KeyAction::Close),
        Key::Character(value) if value.eq_ignore_ascii_case("r") || value.as_str() == " " => {
            Some(KeyAction::Reset)
        }
        _ => None,
    }
}

/// Aggregates GPU state and pattern generation for the interactive window.
pub(crate) struct WindowState {
    // Dropped before `window`: the surface borrows its raw handles.
    gpu: GpuState,
    window: Arc<Window>,
    generator: Generator,
    depth: u32,
    scheduler: FrameScheduler,
    reset_timer: ResetTimer,
    resets: u64,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let source = &config.source;
        let mut generator = Generator::with_seed(source.grammar.clone(), source.seed);
        let pattern = generator.pattern(source.depth);
        log_pattern(&pattern, 0);

        let gpu = GpuState::new(
            window.as_ref(),
            window.inner_size(),
            config.antialiasing,
            &pattern,
        )
        .context("failed to initialise window renderer")?;

        let now = Instant::now();
        Ok(Self {
            window,
            gpu,
            generator,
            depth: source.depth,
            scheduler: FrameScheduler::new(config.target_fps, now),
            reset_timer: ResetTimer::new(config.auto_reset, now),
            resets: 0,
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        self.window.request_redraw();
    }

    /// Generates a fresh pattern and tries to make it live.
    pub(crate) fn reset(&mut self, now: Instant) {
        self.reset_timer.restart(now);
        self.resets += 1;
        let pattern = self.generator.pattern(self.depth);
        log_pattern(&pattern, self.resets);
        if let Err(err) = self.gpu.reset(&pattern) {
            error!(reset = self.resets, error = %err, "generated pattern failed to compile");
        }
        self.window.request_redraw();
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.next_deadline(), self.reset_timer.next_deadline()) {
            (Some(frame), Some(reset)) => Some(frame.min(reset)),
            (frame, reset) => frame.or(reset),
        }
    }
}

fn log_pattern(pattern: &Pattern, reset: u64) {
    let [red, green, blue] = pattern.render();
    info!(reset, %red, %green, %blue, "new pattern");
}

/// Opens the preview window and blocks until it is closed.
pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config)?;
    info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        fps = ?config.target_fps,
        auto_reset = ?config.auto_reset,
        "window ready; press R, Space, Enter or click to regenerate"
    );
    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state != ElementState::Pressed || event.repeat {
                        return;
                    }
                    match key_action(&event.logical_key) {
                        Some(KeyAction::Reset) => state.reset(Instant::now()),
                        Some(KeyAction::Close) => elwt.exit(),
                        None => {}
                    }
                }
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => {
                    state.reset(Instant::now());
                }
                WindowEvent::Resized(new_size) => {
                    state.resize(new_size);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    if !state.scheduler.is_due(now) {
                        return;
                    }
                    match state.gpu.render() {
                        Ok(()) => state.scheduler.mark_presented(now),
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            state.gpu.reconfigure();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; closing window");
                            elwt.exit();
                        }
                        Err(wgpu::SurfaceError::Timeout) => {
                            warn!("surface timeout; retrying next frame");
                        }
                        Err(other) => {
                            warn!(error = ?other, "surface error; retrying next frame");
                        }
                    }
                }
                _ => {}
            }
        }
        Event::AboutToWait => {
            let now = Instant::now();
            if state.reset_timer.is_due(now) {
                info!("automatic reset");
                state.reset(now);
            }
            if state.scheduler.is_due(now) {
                tracing::trace!("scheduler: issuing redraw now");
                state.window().request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = state.next_deadline() {
                tracing::trace!(
                    deadline_ms = deadline.saturating_duration_since(now).as_millis(),
                    "scheduler: waiting until next frame"
                );
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
