//! Narrative runtime for small exploration scenes: timers, progress flags,
//! dialogue, proximity-gated interactions and scripted sequences, plus the
//! winit/pixels host that drives them at a fixed tick rate.

pub mod app;
pub mod narrative;

pub use app::{
    run_app, AppError, CommandOutcome, CommandParseError, CommandRegistry, ConsoleCommand,
    InputAction, InputSnapshot, LoopConfig, Scene, SceneCommand, SceneContext, SceneError,
    SceneFactory, SceneKey, SceneMachine, SceneView, LOGICAL_HEIGHT, LOGICAL_WIDTH,
    SLOW_FRAME_ENV_VAR,
};
pub use narrative::{
    BeatError, Cue, Director, DialogueSession, LatchKey, NarrativeSequence, ProgressRegistry,
    Step, Vec2,
};
