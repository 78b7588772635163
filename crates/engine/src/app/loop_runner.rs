use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::{InputAction, InputSnapshot, MetricsHandle, Renderer, Scene, SceneCommand};
use crate::tiles::PixelBuffer;

const CANVAS_CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];
const FALLBACK_MAX_FRAME_DELTA: Duration = Duration::from_millis(250);
const FALLBACK_METRICS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    /// Window size as a multiple of the scene canvas.
    pub window_scale: u32,
    pub target_tps: u32,
    /// Longer frames are treated as this long before feeding the accumulator.
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Cottage".to_string(),
            window_scale: 2,
            target_tps: 60,
            max_frame_delta: FALLBACK_MAX_FRAME_DELTA,
            max_ticks_per_frame: 5,
            metrics_log_interval: FALLBACK_METRICS_INTERVAL,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("scene canvas must be non-empty, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    run_app_with_metrics(config, scene, MetricsHandle::default())
}

/// Opens a window sized to the scene canvas and drives the scene at a fixed
/// tick rate until it quits or the window closes. `metrics` receives a
/// snapshot once per `metrics_log_interval`.
pub fn run_app_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics: MetricsHandle,
) -> Result<(), AppError> {
    let (canvas_width, canvas_height) = scene.canvas_size();
    if canvas_width == 0 || canvas_height == 0 {
        return Err(AppError::EmptyCanvas {
            width: canvas_width,
            height: canvas_height,
        });
    }
    let window_scale = config.window_scale.max(1);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                f64::from(canvas_width.saturating_mul(window_scale)),
                f64::from(canvas_height.saturating_mul(window_scale)),
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window), canvas_width, canvas_height)
        .map_err(AppError::CreateRenderer)?;
    let mut canvas = PixelBuffer::filled(canvas_width, canvas_height, CANVAS_CLEAR_COLOR);
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut clock = FixedStepClock::new(&config, Instant::now());
    let metrics_interval = non_zero_or(config.metrics_log_interval, FALLBACK_METRICS_INTERVAL);
    let mut frame_metrics = MetricsAccumulator::new(metrics_interval);
    let mut keys = KeyState::default();

    scene.load();
    info!(
        canvas_width,
        canvas_height,
        window_scale,
        target_tps = clock.target_tps(),
        max_ticks_per_frame = clock.max_ticks,
        "scene_loaded"
    );

    let started_at = Instant::now();
    let mut shown_title: Option<String> = None;
    let mut unloaded = false;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(size) => {
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    keys.apply(&event);
                    if keys.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let frame = clock.advance(now);
                    for _ in 0..frame.ticks {
                        let input = keys.take_tick_input();
                        if scene.update(clock.tick_seconds(), &input) == SceneCommand::Quit {
                            info!(reason = "scene_command", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                    }
                    frame_metrics.record_ticks(frame.ticks);
                    if !frame.dropped.is_zero() {
                        frame_metrics.record_clamp();
                        warn!(
                            dropped_ms = frame.dropped.as_millis() as u64,
                            max_ticks_per_frame = clock.max_ticks,
                            "sim_clamp_triggered"
                        );
                    }

                    scene.render(&mut canvas, started_at.elapsed());
                    if let Err(error) = renderer.present(&canvas) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }

                    let title = scene.debug_title();
                    if title != shown_title {
                        window.set_title(title.as_deref().unwrap_or(&config.window_title));
                        shown_title = title;
                    }

                    frame_metrics.record_frame(frame.elapsed);
                    if let Some(snapshot) = frame_metrics.maybe_snapshot(now) {
                        metrics.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            worst_frame_ms = snapshot.worst_frame_ms,
                            clamped_frames = snapshot.clamped_frames,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => {
                if !unloaded {
                    scene.unload();
                    unloaded = true;
                }
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Converts wall-clock frame time into a whole number of fixed ticks.
#[derive(Debug)]
struct FixedStepClock {
    tick: Duration,
    max_frame_delta: Duration,
    max_ticks: u32,
    owed: Duration,
    last_frame: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameSteps {
    /// Unclamped time since the previous frame.
    elapsed: Duration,
    ticks: u32,
    /// Backlog discarded because the per-frame tick cap was reached.
    dropped: Duration,
}

impl FixedStepClock {
    fn new(config: &LoopConfig, now: Instant) -> Self {
        let target_tps = config.target_tps.max(1);
        Self {
            tick: Duration::from_secs_f64(1.0 / f64::from(target_tps)),
            max_frame_delta: non_zero_or(config.max_frame_delta, FALLBACK_MAX_FRAME_DELTA),
            max_ticks: config.max_ticks_per_frame.max(1),
            owed: Duration::ZERO,
            last_frame: now,
        }
    }

    fn tick_seconds(&self) -> f32 {
        self.tick.as_secs_f32()
    }

    fn target_tps(&self) -> u32 {
        (1.0 / self.tick.as_secs_f64()).round() as u32
    }

    fn advance(&mut self, now: Instant) -> FrameSteps {
        let elapsed = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.owed = self.owed.saturating_add(elapsed.min(self.max_frame_delta));

        let mut ticks = 0;
        while self.owed >= self.tick && ticks < self.max_ticks {
            self.owed -= self.tick;
            ticks += 1;
        }
        let dropped = if self.owed >= self.tick {
            std::mem::take(&mut self.owed)
        } else {
            Duration::ZERO
        };
        FrameSteps {
            elapsed,
            ticks,
            dropped,
        }
    }
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyBinding {
    Hold(InputAction),
    Interact,
    Quit,
}

fn key_binding(key: PhysicalKey) -> Option<KeyBinding> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let binding = match code {
        KeyCode::KeyW | KeyCode::ArrowUp => KeyBinding::Hold(InputAction::MoveUp),
        KeyCode::KeyS | KeyCode::ArrowDown => KeyBinding::Hold(InputAction::MoveDown),
        KeyCode::KeyA | KeyCode::ArrowLeft => KeyBinding::Hold(InputAction::MoveLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => KeyBinding::Hold(InputAction::MoveRight),
        KeyCode::KeyE | KeyCode::Space | KeyCode::Enter => KeyBinding::Interact,
        KeyCode::Escape => KeyBinding::Quit,
        _ => return None,
    };
    Some(binding)
}

/// Keyboard state between ticks. Interact is latched on the press edge and
/// handed to exactly one tick; key repeat does not re-latch it.
#[derive(Debug, Default)]
struct KeyState {
    held: ActionStates,
    interact_latched: bool,
    quit_requested: bool,
}

impl KeyState {
    fn apply(&mut self, event: &KeyEvent) {
        self.set_key(event.physical_key, event.state == ElementState::Pressed);
    }

    fn set_key(&mut self, key: PhysicalKey, pressed: bool) {
        match key_binding(key) {
            Some(KeyBinding::Hold(action)) => self.held.set(action, pressed),
            Some(KeyBinding::Interact) => {
                if pressed && !self.held.is_down(InputAction::Interact) {
                    self.interact_latched = true;
                }
                self.held.set(InputAction::Interact, pressed);
            }
            Some(KeyBinding::Quit) => {
                self.held.set(InputAction::Quit, pressed);
                self.quit_requested |= pressed;
            }
            None => {}
        }
    }

    fn take_tick_input(&mut self) -> InputSnapshot {
        let interact_pressed = std::mem::take(&mut self.interact_latched);
        InputSnapshot::new(self.quit_requested, interact_pressed, self.held)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(tps: u32, max_ticks: u32, start: Instant) -> FixedStepClock {
        let config = LoopConfig {
            target_tps: tps,
            max_ticks_per_frame: max_ticks,
            ..LoopConfig::default()
        };
        FixedStepClock::new(&config, start)
    }

    fn key(state: &mut KeyState, code: KeyCode, pressed: bool) {
        state.set_key(PhysicalKey::Code(code), pressed);
    }

    #[test]
    fn frame_time_becomes_whole_ticks_with_remainder_carried() {
        let start = Instant::now();
        let mut clock = clock(50, 5, start);
        assert_eq!(clock.target_tps(), 50);

        let frame = clock.advance(start + Duration::from_millis(50));
        assert_eq!(frame.ticks, 2);
        assert!(frame.dropped.is_zero());

        // 10 ms carried plus 10 ms new make one more tick.
        let frame = clock.advance(start + Duration::from_millis(60));
        assert_eq!(frame.ticks, 1);
        assert_eq!(frame.elapsed, Duration::from_millis(10));
    }

    #[test]
    fn tick_cap_drops_the_backlog() {
        let start = Instant::now();
        let mut clock = clock(50, 3, start);
        let frame = clock.advance(start + Duration::from_millis(200));
        assert_eq!(frame.ticks, 3);
        assert_eq!(frame.dropped, Duration::from_millis(140));

        let frame = clock.advance(start + Duration::from_millis(205));
        assert_eq!(frame.ticks, 0);
    }

    #[test]
    fn long_frames_are_clamped_before_ticking() {
        let start = Instant::now();
        let mut clock = clock(10, 100, start);
        let frame = clock.advance(start + Duration::from_secs(3));
        assert_eq!(frame.elapsed, Duration::from_secs(3));
        assert_eq!(frame.ticks, 2);
    }

    #[test]
    fn zero_settings_fall_back_to_defaults() {
        let config = LoopConfig {
            target_tps: 0,
            max_frame_delta: Duration::ZERO,
            max_ticks_per_frame: 0,
            ..LoopConfig::default()
        };
        let clock = FixedStepClock::new(&config, Instant::now());
        assert_eq!(clock.target_tps(), 1);
        assert_eq!(clock.max_frame_delta, FALLBACK_MAX_FRAME_DELTA);
        assert_eq!(clock.max_ticks, 1);
    }

    #[test]
    fn interact_reaches_exactly_one_tick() {
        let mut keys = KeyState::default();
        key(&mut keys, KeyCode::KeyE, true);

        let first = keys.take_tick_input();
        let second = keys.take_tick_input();
        assert!(first.interact_pressed());
        assert!(!second.interact_pressed());
        assert!(second.is_down(InputAction::Interact));
    }

    #[test]
    fn held_interact_does_not_repeat_until_released() {
        let mut keys = KeyState::default();
        key(&mut keys, KeyCode::Space, true);
        assert!(keys.take_tick_input().interact_pressed());

        // Key repeat delivers further presses while held.
        key(&mut keys, KeyCode::Space, true);
        assert!(!keys.take_tick_input().interact_pressed());

        key(&mut keys, KeyCode::Space, false);
        key(&mut keys, KeyCode::Enter, true);
        assert!(keys.take_tick_input().interact_pressed());
    }

    #[test]
    fn movement_keys_are_held_states() {
        let mut keys = KeyState::default();
        key(&mut keys, KeyCode::KeyW, true);
        key(&mut keys, KeyCode::ArrowLeft, true);
        key(&mut keys, KeyCode::KeyD, true);
        key(&mut keys, KeyCode::KeyD, false);

        let input = keys.take_tick_input();
        assert!(input.is_down(InputAction::MoveUp));
        assert!(input.is_down(InputAction::MoveLeft));
        assert!(!input.is_down(InputAction::MoveRight));
        assert!(!input.is_down(InputAction::MoveDown));
    }

    #[test]
    fn escape_requests_quit_and_unbound_keys_are_ignored() {
        let mut keys = KeyState::default();
        key(&mut keys, KeyCode::KeyQ, true);
        assert_eq!(keys.take_tick_input(), InputSnapshot::empty());

        key(&mut keys, KeyCode::Escape, true);
        assert!(keys.take_tick_input().quit_requested());
    }
}
