use std::env;
use std::sync::Arc;
use std::thread;
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
use super::rendering::{LOGICAL_HEIGHT, LOGICAL_WIDTH};
use super::scene::{SceneError, SceneKey, SceneMachine};
use super::tools::{print_progress, CheatConsole, CommandProcessor, CommandRegistry, ConsoleCommand};
use super::{InputAction, InputSnapshot, Renderer};

pub const SLOW_FRAME_ENV_VAR: &str = "GS_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    /// Integer scale of the 320x180 logical resolution for the initial window.
    pub window_scale: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Tiny Game".to_string(),
            window_scale: 3,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to enter start scene: {0}")]
    StartScene(#[from] SceneError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window, enters `start` and drives `scenes` at a fixed tick rate
/// until the window closes.
pub fn run_app(
    config: LoopConfig,
    mut scenes: SceneMachine,
    start: SceneKey,
    commands: CommandRegistry,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let scale = config.window_scale.max(1);
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                (LOGICAL_WIDTH * scale) as f64,
                (LOGICAL_HEIGHT * scale) as f64,
            ))
            .with_min_inner_size(LogicalSize::new(LOGICAL_WIDTH as f64, LOGICAL_HEIGHT as f64))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    scenes.enter_scene(start)?;

    let mut input_collector = InputCollector::default();
    let mut console = CheatConsole::default();
    let processor = CommandProcessor::new(commands);
    let mut tick_clock = TickClock::new(fixed_dt);
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
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
                WindowEvent::Focused(false) => input_collector.release_all(),
                WindowEvent::KeyboardInput { event, .. } => {
                    if is_console_toggle(&event) {
                        console.toggle();
                        input_collector.release_all();
                        info!(open = console.is_open(), "console_toggled");
                    } else if console.is_open() {
                        console.handle_key_event(&event);
                    } else {
                        input_collector.handle_keyboard_input(&event);
                    }
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    accumulator =
                        accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

                    for command in processor.process(&mut console) {
                        match command {
                            ConsoleCommand::SwitchScene(key) => {
                                info!(scene = %key, "console_scene_jump");
                                scenes.request_scene_transition(key);
                                console.close();
                            }
                            ConsoleCommand::DumpProgress => {
                                print_progress(&mut console, scenes.registry());
                            }
                        }
                    }

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let snapshot = input_collector.snapshot_for_tick();
                        let snapshot = if console.is_open() {
                            InputSnapshot::empty()
                        } else {
                            snapshot
                        };
                        if let Err(error) = scenes.update(tick_clock.next_tick_ms(), &snapshot) {
                            warn!(error = %error, "scene_update_failed");
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;
                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    if let Err(error) =
                        renderer.render(scenes.view(), scenes.dialogue(), Some(&console))
                    {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = scenes.debug_title();
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => {
                                window.set_title(&format!("{} - {title}", config.window_title))
                            }
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scenes.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Held and newly pressed actions between two simulation ticks.
#[derive(Debug, Default)]
struct InputCollector {
    down: ActionStates,
    pressed: ActionStates,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let Some(action) = action_for_key(key) else {
            return;
        };
        if is_pressed && !self.down.is_down(action) {
            self.pressed.set(action, true);
        }
        self.down.set(action, is_pressed);
    }

    fn release_all(&mut self) {
        self.down = ActionStates::default();
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(self.down, self.pressed);
        self.pressed = ActionStates::default();
        snapshot
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let action = match code {
        KeyCode::KeyW | KeyCode::ArrowUp => InputAction::Up,
        KeyCode::KeyS | KeyCode::ArrowDown => InputAction::Down,
        KeyCode::KeyA | KeyCode::ArrowLeft => InputAction::Left,
        KeyCode::KeyD | KeyCode::ArrowRight => InputAction::Right,
        KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::Space => InputAction::Confirm,
        KeyCode::KeyE => InputAction::Interact,
        KeyCode::Backspace => InputAction::Cancel,
        KeyCode::Escape => InputAction::Menu,
        KeyCode::KeyH => InputAction::Help,
        _ => return None,
    };
    Some(action)
}

fn is_console_toggle(key_event: &KeyEvent) -> bool {
    key_event.state == ElementState::Pressed
        && !key_event.repeat
        && matches!(key_event.physical_key, PhysicalKey::Code(KeyCode::Backquote))
}

/// Converts the fixed tick duration into whole milliseconds per tick,
/// carrying the sub-millisecond remainder so the long-run sum stays exact.
#[derive(Debug, Clone, Copy)]
struct TickClock {
    tick_nanos: u128,
    carry_nanos: u128,
}

impl TickClock {
    fn new(fixed_dt: Duration) -> Self {
        Self {
            tick_nanos: fixed_dt.as_nanos().max(1),
            carry_nanos: 0,
        }
    }

    fn next_tick_ms(&mut self) -> u64 {
        let total = self.carry_nanos + self.tick_nanos;
        let whole_ms = total / 1_000_000;
        self.carry_nanos = total % 1_000_000;
        whole_ms as u64
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    cap.map_or_else(|| "off".to_string(), |value| value.to_string())
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    parse_slow_frame_override(env::var(SLOW_FRAME_ENV_VAR), config_slow_frame_ms)
}

fn parse_slow_frame_override(
    value: Result<String, env::VarError>,
    config_slow_frame_ms: u64,
) -> Duration {
    let fallback = Duration::from_millis(config_slow_frame_ms);
    match value {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = raw.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                fallback
            }
        },
        Err(env::VarError::NotPresent) => fallback,
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputCollector, code: KeyCode) {
        input.update_action_state_from_physical_key(PhysicalKey::Code(code), true);
    }

    fn release(input: &mut InputCollector, code: KeyCode) {
        input.update_action_state_from_physical_key(PhysicalKey::Code(code), false);
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(48), Duration::from_millis(16), 5);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_keeps_partial_tick_for_next_frame() {
        let result = plan_sim_steps(Duration::from_millis(20), Duration::from_millis(16), 5);
        assert_eq!(result.ticks_to_run, 1);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(4));
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn tick_clock_carries_sub_millisecond_remainder() {
        let mut clock = TickClock::new(Duration::from_secs_f64(1.0 / 60.0));
        let ticks: Vec<u64> = (0..60).map(|_| clock.next_tick_ms()).collect();
        assert!(ticks.iter().all(|ms| (16..=17).contains(ms)));
        let total: u64 = ticks.iter().sum();
        assert!((999..=1000).contains(&total), "total {total}");

        let mut even = TickClock::new(Duration::from_millis(20));
        assert_eq!(even.next_tick_ms(), 20);
        assert_eq!(even.next_tick_ms(), 20);
    }

    #[test]
    fn key_press_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Enter);
        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();
        assert!(first.just_pressed(InputAction::Confirm));
        assert!(!second.just_pressed(InputAction::Confirm));
        assert!(second.is_down(InputAction::Confirm));
    }

    #[test]
    fn held_key_does_not_spam_press_edges() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyE);
        let first = input.snapshot_for_tick();
        press(&mut input, KeyCode::KeyE);
        let second = input.snapshot_for_tick();
        release(&mut input, KeyCode::KeyE);
        press(&mut input, KeyCode::KeyE);
        let third = input.snapshot_for_tick();

        assert!(first.just_pressed(InputAction::Interact));
        assert!(!second.just_pressed(InputAction::Interact));
        assert!(third.just_pressed(InputAction::Interact));
    }

    #[test]
    fn tap_between_ticks_still_registers_a_press() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Space);
        release(&mut input, KeyCode::Space);
        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.just_pressed(InputAction::Confirm));
        assert!(!snapshot.is_down(InputAction::Confirm));
    }

    #[test]
    fn wasd_and_arrow_keys_map_to_directions() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyW);
        press(&mut input, KeyCode::ArrowLeft);
        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::Up));
        assert!(snapshot.is_down(InputAction::Left));
        assert_eq!(snapshot.movement_axis(), (-1.0, -1.0));
    }

    #[test]
    fn menu_help_and_cancel_keys_map_to_actions() {
        assert_eq!(
            action_for_key(PhysicalKey::Code(KeyCode::Escape)),
            Some(InputAction::Menu)
        );
        assert_eq!(
            action_for_key(PhysicalKey::Code(KeyCode::KeyH)),
            Some(InputAction::Help)
        );
        assert_eq!(
            action_for_key(PhysicalKey::Code(KeyCode::Backspace)),
            Some(InputAction::Cancel)
        );
        assert_eq!(action_for_key(PhysicalKey::Code(KeyCode::Backquote)), None);
    }

    #[test]
    fn release_all_clears_held_keys_but_keeps_this_ticks_presses() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyD);
        input.release_all();
        let snapshot = input.snapshot_for_tick();
        assert!(!snapshot.is_down(InputAction::Right));
        assert!(snapshot.just_pressed(InputAction::Right));
        assert_eq!(input.snapshot_for_tick(), InputSnapshot::empty());
    }

    #[test]
    fn slow_frame_override_parses_or_falls_back() {
        assert_eq!(
            parse_slow_frame_override(Ok("25".to_string()), 0),
            Duration::from_millis(25)
        );
        assert_eq!(
            parse_slow_frame_override(Ok("soon".to_string()), 7),
            Duration::from_millis(7)
        );
        assert_eq!(
            parse_slow_frame_override(Err(env::VarError::NotPresent), 3),
            Duration::from_millis(3)
        );
    }

    #[test]
    fn target_frame_duration_none_when_cap_off() {
        assert_eq!(target_frame_duration(None), None);
        assert_eq!(format_render_cap(None), "off");
    }

    #[test]
    fn compute_cap_sleep_only_when_under_budget() {
        let target = target_frame_duration(Some(60));
        assert_eq!(compute_cap_sleep(Duration::from_millis(20), target), Duration::ZERO);
        assert!(compute_cap_sleep(Duration::from_millis(5), target) > Duration::ZERO);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
    }
}
