use std::collections::{HashMap, VecDeque};

use tracing::{debug, info};

use crate::app::{SceneCommand, SceneContext, SceneKey};

use super::dialogue::{DialogueSession, DialogueToken};
use super::gate::{Barrier, MoveOutcome};
use super::registry::{LatchKey, Latches, ProgressRegistry};
use super::scheduler::{Fired, Scheduler, TimerHandle};
use super::sequence::{NarrativeSequence, SequenceId, SequenceRequest, SequenceWake};
use super::stage::{
    ActorHandle, ActorStage, AnimationId, EffectKind, EffectLog, Easing, Motion, TweenAnimator,
    Vec2,
};
use super::BeatError;

pub type Action<W> = Box<dyn FnOnce(&mut Cue<'_, W>)>;
pub type Predicate<W> = Box<dyn Fn(&Cue<'_, W>) -> bool>;
pub type TimerCallback<W> = Box<dyn FnMut(&mut Cue<'_, W>) -> Result<(), BeatError>>;

pub const DEFAULT_FADE_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Callback,
    Sequence(SequenceWake),
}

/// Scheduler plus the callbacks owned by `Wake::Callback` entries.
pub struct Timers<W> {
    scheduler: Scheduler<Wake>,
    callbacks: HashMap<TimerHandle, TimerCallback<W>>,
}

impl<W> Default for Timers<W> {
    fn default() -> Self {
        Self {
            scheduler: Scheduler::new(),
            callbacks: HashMap::new(),
        }
    }
}

impl<W> Timers<W> {
    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn live_count(&self) -> usize {
        self.scheduler.live_count()
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.scheduler.is_live(handle)
    }

    pub(crate) fn delay(&mut self, ms: u64, callback: TimerCallback<W>) -> TimerHandle {
        let handle = self.scheduler.delay(ms, Wake::Callback);
        self.callbacks.insert(handle, callback);
        handle
    }

    pub(crate) fn every(&mut self, ms: u64, callback: TimerCallback<W>) -> TimerHandle {
        let handle = self.scheduler.every(ms, Wake::Callback);
        self.callbacks.insert(handle, callback);
        handle
    }

    pub(crate) fn wake_after(&mut self, ms: u64, wake: SequenceWake) -> TimerHandle {
        self.scheduler.delay(ms, Wake::Sequence(wake))
    }

    pub(crate) fn poll_every(&mut self, ms: u64, wake: SequenceWake) -> TimerHandle {
        self.scheduler.every(ms, Wake::Sequence(wake))
    }

    pub(crate) fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.callbacks.remove(&handle);
        self.scheduler.cancel(handle)
    }

    pub(crate) fn advance(&mut self, dt_ms: u64) {
        self.scheduler.advance(dt_ms);
    }

    pub(crate) fn pop_due(&mut self) -> Option<Fired<Wake>> {
        self.scheduler.pop_due()
    }

    pub(crate) fn take_callback(&mut self, handle: TimerHandle) -> Option<TimerCallback<W>> {
        self.callbacks.remove(&handle)
    }

    /// Puts a recurring callback back unless it was cancelled while running.
    pub(crate) fn restore_callback(&mut self, handle: TimerHandle, callback: TimerCallback<W>) {
        if self.scheduler.is_live(handle) {
            self.callbacks.insert(handle, callback);
        }
    }

    pub(crate) fn clear(&mut self) -> usize {
        self.callbacks.clear();
        self.scheduler.clear()
    }
}

/// Everything a beat may touch that belongs to one scene instance.
pub struct Backstage<W> {
    pub(crate) world: W,
    pub(crate) latches: Latches,
    pub(crate) timers: Timers<W>,
    pub(crate) stage: ActorStage,
    pub(crate) animator: TweenAnimator,
    pub(crate) effects: EffectLog,
    pub(crate) barriers: Vec<Barrier>,
    pub(crate) runs: VecDeque<SequenceRequest<W>>,
    pub(crate) cancels: Vec<SequenceId>,
    pub(crate) followups: Vec<(DialogueToken, Action<W>)>,
    pub(crate) command: SceneCommand,
    next_sequence: u64,
}

impl<W> Backstage<W> {
    pub(crate) fn new(world: W) -> Self {
        Self {
            world,
            latches: Latches::default(),
            timers: Timers::default(),
            stage: ActorStage::default(),
            animator: TweenAnimator::default(),
            effects: EffectLog::default(),
            barriers: Vec::new(),
            runs: VecDeque::new(),
            cancels: Vec::new(),
            followups: Vec::new(),
            command: SceneCommand::None,
            next_sequence: 0,
        }
    }

    pub(crate) fn take_followup(&mut self, token: DialogueToken) -> Option<Action<W>> {
        let index = self
            .followups
            .iter()
            .position(|(waiting_on, _)| *waiting_on == token)?;
        Some(self.followups.remove(index).1)
    }

    fn allocate_sequence(&mut self) -> SequenceId {
        self.next_sequence = self.next_sequence.saturating_add(1);
        SequenceId(self.next_sequence)
    }
}

/// What every timer callback, step action, trigger hook and predicate is
/// handed: the scene's backstage plus the process-wide registry and dialogue
/// box, borrowed for the duration of one beat.
pub struct Cue<'a, W> {
    backstage: &'a mut Backstage<W>,
    registry: &'a mut ProgressRegistry,
    dialogue: &'a mut DialogueSession,
}

impl<'a, W: 'static> Cue<'a, W> {
    pub(crate) fn new(backstage: &'a mut Backstage<W>, ctx: &'a mut SceneContext<'_>) -> Self {
        Self {
            backstage,
            registry: &mut *ctx.registry,
            dialogue: &mut *ctx.dialogue,
        }
    }

    pub fn world(&self) -> &W {
        &self.backstage.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.backstage.world
    }

    pub fn registry(&self) -> &ProgressRegistry {
        &*self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProgressRegistry {
        &mut *self.registry
    }

    pub fn dialogue(&self) -> &DialogueSession {
        &*self.dialogue
    }

    pub fn stage(&self) -> &ActorStage {
        &self.backstage.stage
    }

    pub fn stage_mut(&mut self) -> &mut ActorStage {
        &mut self.backstage.stage
    }

    pub fn effects(&self) -> &EffectLog {
        &self.backstage.effects
    }

    pub fn spawn_effect(&mut self, kind: EffectKind, position: Vec2) {
        self.backstage.effects.spawn_effect(kind, position);
    }

    pub fn latches(&self) -> &Latches {
        &self.backstage.latches
    }

    pub fn latch(&mut self, key: LatchKey) -> bool {
        key.raise(&mut self.backstage.latches, &mut *self.registry)
    }

    pub fn is_latched(&self, key: LatchKey) -> bool {
        key.is_set(&self.backstage.latches, &*self.registry)
    }

    pub fn now_ms(&self) -> u64 {
        self.backstage.timers.now_ms()
    }

    pub fn delay<F>(&mut self, ms: u64, callback: F) -> TimerHandle
    where
        F: FnMut(&mut Cue<'_, W>) -> Result<(), BeatError> + 'static,
    {
        self.backstage.timers.delay(ms, Box::new(callback))
    }

    pub fn every<F>(&mut self, ms: u64, callback: F) -> TimerHandle
    where
        F: FnMut(&mut Cue<'_, W>) -> Result<(), BeatError> + 'static,
    {
        self.backstage.timers.every(ms, Box::new(callback))
    }

    pub fn cancel_timer(&mut self, handle: TimerHandle) -> bool {
        self.backstage.timers.cancel(handle)
    }

    pub fn animate(
        &mut self,
        target: ActorHandle,
        motion: Motion,
        duration_ms: u64,
        easing: Easing,
    ) -> Option<AnimationId> {
        let backstage = &mut *self.backstage;
        backstage
            .animator
            .animate(&backstage.stage, target, motion, duration_ms, easing)
    }

    pub fn is_animating(&self, target: ActorHandle) -> bool {
        self.backstage.animator.is_animating(target)
    }

    pub fn cancel_animation(&mut self, animation: AnimationId) -> bool {
        self.backstage.animator.cancel(animation)
    }

    pub fn show_dialogue<I, S>(&mut self, lines: I) -> DialogueToken
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dialogue.show(lines)
    }

    /// Shows `lines` and runs `then` once the player closes the last line.
    /// `then` is dropped if the dialogue is hidden or replaced first.
    pub fn show_dialogue_then<I, S, F>(&mut self, lines: I, then: F) -> DialogueToken
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Cue<'_, W>) + 'static,
    {
        let token = self.dialogue.show(lines);
        self.backstage.followups.push((token, Box::new(then)));
        token
    }

    pub fn hide_dialogue(&mut self) {
        self.dialogue.hide();
    }

    /// Queues `sequence`; it starts once the current beat returns.
    pub fn run(&mut self, sequence: NarrativeSequence<W>) -> SequenceId {
        self.queue_run(sequence, None)
    }

    pub fn run_then<F>(&mut self, sequence: NarrativeSequence<W>, on_complete: F) -> SequenceId
    where
        F: FnOnce(&mut Cue<'_, W>) + 'static,
    {
        self.queue_run(sequence, Some(Box::new(on_complete)))
    }

    pub fn cancel_sequence(&mut self, id: SequenceId) {
        self.backstage.cancels.push(id);
    }

    /// First request of a tick wins.
    pub fn transition_to(&mut self, scene: SceneKey) {
        self.request_command(SceneCommand::SwitchTo(scene));
    }

    pub fn restart_scene(&mut self) {
        self.request_command(SceneCommand::Restart);
    }

    /// Fades out over `duration_ms`, then switches scenes.
    pub fn fade_to(&mut self, scene: SceneKey, duration_ms: u64) -> TimerHandle {
        self.backstage
            .effects
            .spawn_effect_for(EffectKind::FadeOut, Vec2::ZERO, duration_ms);
        info!(scene = %scene, duration_ms, "scene_fade_started");
        self.delay(duration_ms, move |cue| {
            cue.transition_to(scene);
            Ok(())
        })
    }

    /// Moves `actor` to `to` unless a passage barrier whose requirement is
    /// unmet would be entered.
    pub fn try_move(&mut self, actor: ActorHandle, to: Vec2) -> MoveOutcome {
        let Some(from) = self.backstage.stage.position(actor) else {
            return MoveOutcome::Missing;
        };
        let backstage = &*self.backstage;
        let registry = &*self.registry;
        let blocked_by = backstage.barriers.iter().find(|barrier| {
            barrier.blocks(from, to) && !barrier.requires.is_set(&backstage.latches, registry)
        });
        if let Some(barrier) = blocked_by {
            debug!(barrier = barrier.label, x = to.x, y = to.y, "barrier_blocked");
            return MoveOutcome::Blocked {
                barrier: barrier.label,
            };
        }
        self.backstage.stage.set_position(actor, to);
        MoveOutcome::Moved(to)
    }

    pub(crate) fn wake_after(&mut self, ms: u64, wake: SequenceWake) -> TimerHandle {
        self.backstage.timers.wake_after(ms, wake)
    }

    pub(crate) fn poll_every(&mut self, ms: u64, wake: SequenceWake) -> TimerHandle {
        self.backstage.timers.poll_every(ms, wake)
    }

    fn queue_run(
        &mut self,
        sequence: NarrativeSequence<W>,
        on_complete: Option<Action<W>>,
    ) -> SequenceId {
        let id = self.backstage.allocate_sequence();
        self.backstage.runs.push_back(SequenceRequest {
            id,
            sequence,
            on_complete,
        });
        id
    }

    fn request_command(&mut self, command: SceneCommand) {
        if self.backstage.command == SceneCommand::None {
            self.backstage.command = command;
        } else {
            debug!(ignored = ?command, pending = ?self.backstage.command, "scene_command_already_pending");
        }
    }
}
