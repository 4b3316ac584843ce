mod cue;
mod dialogue;
mod director;
mod gate;
mod registry;
mod scene_state;
mod scheduler;
mod sequence;
mod stage;

use thiserror::Error;

pub use cue::{Action, Cue, Predicate, TimerCallback, DEFAULT_FADE_MS};
pub use dialogue::{DialogueAdvance, DialogueSession, DialogueToken};
pub use director::Director;
pub use gate::{
    Anchor, Barrier, GateId, GatedActionSpec, GrantTier, Hook, InteractionGate, MoveOutcome,
    Prompt, TriggerEdge, TriggerId, TriggerSpec,
};
pub use registry::{LatchKey, Latches, ProgressRegistry};
pub use scene_state::{MenuKind, SceneState, SceneStateMachine};
pub use scheduler::{Fired, Scheduler, TimerHandle};
pub use sequence::{
    NarrativeSequence, SequenceId, SequenceRunner, SequenceState, SequenceWake, Step,
    FINISHED_HISTORY,
};
pub use stage::{
    Actor, ActorHandle, ActorKind, ActorStage, AnimationId, Easing, Effect, EffectKind, EffectLog,
    Motion, Rect, TweenAnimator, Vec2,
};

/// Failure reported by a timer callback. Logged by the director; never stops
/// the rest of the tick.
#[derive(Debug, Error)]
pub enum BeatError {
    #[error("actor {0:?} is not on stage")]
    MissingActor(ActorHandle),
    #[error("{0}")]
    Failed(String),
}
