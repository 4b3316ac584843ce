mod input;
mod loop_runner;
mod rendering;
mod scene;
mod tools;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use rendering::{Renderer, LOGICAL_HEIGHT, LOGICAL_WIDTH};
pub use scene::{
    Scene, SceneCommand, SceneContext, SceneError, SceneFactory, SceneKey, SceneMachine, SceneView,
};
pub use tools::{
    no_args, CommandOutcome, CommandParseError, CommandRegistrationError, CommandRegistry,
    ConsoleCommand, UNKNOWN_COMMAND_MESSAGE,
};
