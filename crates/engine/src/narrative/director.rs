use std::mem;

use tracing::{debug, info, warn};

use crate::app::{InputAction, InputSnapshot, SceneCommand, SceneContext, SceneKey, SceneView};

use super::cue::{Backstage, Cue, Wake};
use super::dialogue::DialogueAdvance;
use super::gate::{Barrier, GateId, GatedActionSpec, InteractionGate, TriggerId, TriggerSpec};
use super::registry::{Latches, ProgressRegistry};
use super::scene_state::{MenuKind, SceneState, SceneStateMachine};
use super::sequence::{NarrativeSequence, SequenceId, SequenceRunner, SequenceState};
use super::stage::{ActorStage, EffectLog};

/// Owns one scene instance's narrative machinery and runs it in a fixed
/// order each tick:
///
/// 1. pause/help menus (a tick that starts or ends with a menu open stops here)
/// 2. effects
/// 3. dialogue confirm
/// 4. exploration (movement), only while exploring
/// 5. proximity edges, then gated input
/// 6. scheduler firing
/// 7. tween completions
/// 8. state re-derivation
///
/// Sequence starts, cancellations and abandoned dialogues are settled after
/// every beat so each beat observes a consistent runner.
pub struct Director<W> {
    label: &'static str,
    backstage: Backstage<W>,
    runner: SequenceRunner<W>,
    gate: InteractionGate<W>,
    state: SceneStateMachine,
    exit_scene: Option<SceneKey>,
    torn_down: bool,
}

impl<W: 'static> Director<W> {
    pub fn new(label: &'static str, world: W) -> Self {
        Self {
            label,
            backstage: Backstage::new(world),
            runner: SequenceRunner::default(),
            gate: InteractionGate::default(),
            state: SceneStateMachine::new(label),
            exit_scene: None,
            torn_down: false,
        }
    }

    /// Enables the pause and help menus. Confirming in the pause menu leaves
    /// for `exit_scene`.
    pub fn with_menus(mut self, exit_scene: SceneKey) -> Self {
        self.exit_scene = Some(exit_scene);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn world(&self) -> &W {
        &self.backstage.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.backstage.world
    }

    pub fn stage(&self) -> &ActorStage {
        &self.backstage.stage
    }

    pub fn effects(&self) -> &EffectLog {
        &self.backstage.effects
    }

    pub fn latches(&self) -> &Latches {
        &self.backstage.latches
    }

    pub fn state(&self) -> SceneState {
        self.state.current()
    }

    pub fn menu(&self) -> Option<MenuKind> {
        self.state.menu()
    }

    pub fn sequence_state(&self, id: SequenceId) -> SequenceState {
        self.runner.state(id)
    }

    pub fn live_timers(&self) -> usize {
        self.backstage.timers.live_count()
    }

    pub fn active_animations(&self) -> usize {
        self.backstage.animator.active_count()
    }

    pub fn running_sequences(&self) -> usize {
        self.runner.running_count()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn add_barrier(&mut self, barrier: Barrier) {
        self.backstage.barriers.push(barrier);
    }

    pub fn register_trigger(&mut self, spec: TriggerSpec<W>) -> TriggerId {
        self.gate.register_trigger(spec)
    }

    pub fn set_trigger_enabled(&mut self, id: TriggerId, enabled: bool) {
        self.gate.set_trigger_enabled(id, enabled);
    }

    pub fn in_range(&self, id: TriggerId) -> bool {
        self.gate.in_range(id)
    }

    pub fn add_gated_action(&mut self, spec: GatedActionSpec<W>) -> GateId {
        self.gate.add_gated_action(spec)
    }

    pub fn set_action_enabled(&mut self, id: GateId, enabled: bool) {
        self.gate.set_action_enabled(id, enabled);
    }

    /// Runs `f` as a beat outside the tick, e.g. while loading.
    pub fn with_cue<R>(
        &mut self,
        ctx: &mut SceneContext<'_>,
        f: impl FnOnce(&mut Cue<'_, W>) -> R,
    ) -> R {
        let result = {
            let mut cue = Cue::new(&mut self.backstage, ctx);
            f(&mut cue)
        };
        self.settle(ctx);
        self.sync_state(ctx);
        result
    }

    pub fn run(&mut self, ctx: &mut SceneContext<'_>, sequence: NarrativeSequence<W>) -> SequenceId {
        self.with_cue(ctx, |cue| cue.run(sequence))
    }

    /// Advances the scene by one tick. `explore` is the scene's movement
    /// handler and only runs while nothing narrative holds the player.
    pub fn update<F>(
        &mut self,
        dt_ms: u64,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
        explore: F,
    ) -> SceneCommand
    where
        F: FnOnce(&mut Cue<'_, W>, &InputSnapshot, u64),
    {
        if self.torn_down {
            return SceneCommand::None;
        }
        if self.handle_menus(input) {
            return self.take_command();
        }

        self.backstage.effects.tick(dt_ms);

        let dialogue_was_open = ctx.dialogue.is_visible();
        if dialogue_was_open && input.just_pressed(InputAction::Confirm) {
            if let DialogueAdvance::Closed { token } = ctx.dialogue.advance_or_close() {
                let followup = self.backstage.take_followup(token);
                let mut cue = Cue::new(&mut self.backstage, ctx);
                self.runner.on_dialogue_closed(token, &mut cue);
                if let Some(followup) = followup {
                    followup(&mut cue);
                }
            }
            self.settle(ctx);
        }

        if self.is_idle(ctx) {
            let mut cue = Cue::new(&mut self.backstage, ctx);
            explore(&mut cue, input, dt_ms);
        }

        {
            let mut cue = Cue::new(&mut self.backstage, ctx);
            self.gate.update(&mut cue);
        }
        self.settle(ctx);
        if !dialogue_was_open && self.is_idle(ctx) {
            {
                let mut cue = Cue::new(&mut self.backstage, ctx);
                self.gate.handle_input(input, &mut cue);
            }
            self.settle(ctx);
        }

        self.fire_timers(dt_ms, ctx);

        let finished = self
            .backstage
            .animator
            .tick(dt_ms, &mut self.backstage.stage);
        for animation in finished {
            {
                let mut cue = Cue::new(&mut self.backstage, ctx);
                self.runner.on_animation_finished(animation, &mut cue);
            }
            self.settle(ctx);
        }

        self.sync_state(ctx);
        self.take_command()
    }

    /// Cancels everything this scene scheduled. Later updates are inert.
    pub fn teardown(&mut self, ctx: &mut SceneContext<'_>) {
        if self.torn_down {
            return;
        }
        let sequences = {
            let mut cue = Cue::new(&mut self.backstage, ctx);
            self.runner.cancel_all(&mut cue)
        };
        let queued = self.backstage.runs.len();
        for request in self.backstage.runs.drain(..) {
            self.runner.discard(request.id);
        }
        let timers = self.backstage.timers.clear();
        let tweens = self.backstage.animator.clear();
        self.backstage.effects.clear();
        self.backstage.cancels.clear();
        self.backstage.followups.clear();
        self.backstage.command = SceneCommand::None;
        ctx.dialogue.hide();
        ctx.dialogue.take_abandoned();
        self.torn_down = true;
        info!(
            scene = self.label,
            sequences,
            queued,
            timers,
            tweens,
            "director_teardown"
        );
    }

    /// What the renderer draws for this scene. The interaction prompt only
    /// shows while exploring.
    pub fn view(&self, registry: &ProgressRegistry, backdrop: [u8; 4]) -> SceneView<'_> {
        let prompt = if self.state.is_exploring() {
            self.gate
                .prompt(&self.backstage.stage, &self.backstage.latches, registry)
        } else {
            None
        };
        SceneView {
            stage: &self.backstage.stage,
            effects: self.backstage.effects.effects(),
            prompt,
            menu: self.state.menu(),
            backdrop,
        }
    }

    /// Returns true when the rest of the tick must be skipped.
    fn handle_menus(&mut self, input: &InputSnapshot) -> bool {
        let Some(exit_scene) = self.exit_scene else {
            return false;
        };
        let was_open = self.state.menu().is_some();
        match self.state.menu() {
            None => {
                if input.just_pressed(InputAction::Menu) {
                    self.state.open_menu(MenuKind::Pause);
                } else if input.just_pressed(InputAction::Help) {
                    self.state.open_menu(MenuKind::Help);
                }
            }
            Some(MenuKind::Pause) => {
                if input.just_pressed(InputAction::Menu) || input.just_pressed(InputAction::Cancel) {
                    self.state.close_menu();
                } else if input.just_pressed(InputAction::Confirm) {
                    self.state.close_menu();
                    if self.backstage.command == SceneCommand::None {
                        info!(scene = self.label, exit = %exit_scene, "pause_menu_exit");
                        self.backstage.command = SceneCommand::SwitchTo(exit_scene);
                    }
                } else if input.just_pressed(InputAction::Help) {
                    self.state.open_menu(MenuKind::Help);
                }
            }
            Some(MenuKind::Help) => {
                if input.just_pressed(InputAction::Help)
                    || input.just_pressed(InputAction::Menu)
                    || input.just_pressed(InputAction::Cancel)
                    || input.just_pressed(InputAction::Confirm)
                {
                    self.state.close_menu();
                }
            }
        }
        was_open || self.state.menu().is_some()
    }

    fn fire_timers(&mut self, dt_ms: u64, ctx: &mut SceneContext<'_>) {
        self.backstage.timers.advance(dt_ms);
        while let Some(fired) = self.backstage.timers.pop_due() {
            match fired.payload {
                Wake::Callback => {
                    let Some(mut callback) = self.backstage.timers.take_callback(fired.handle)
                    else {
                        continue;
                    };
                    let result = {
                        let mut cue = Cue::new(&mut self.backstage, ctx);
                        callback(&mut cue)
                    };
                    if let Err(err) = result {
                        warn!(
                            scene = self.label,
                            timer = fired.handle.raw(),
                            error = %err,
                            "timer_callback_failed"
                        );
                    }
                    if fired.recurring {
                        self.backstage
                            .timers
                            .restore_callback(fired.handle, callback);
                    }
                }
                Wake::Sequence(wake) => {
                    let mut cue = Cue::new(&mut self.backstage, ctx);
                    self.runner.on_wake(wake, &mut cue);
                }
            }
            self.settle(ctx);
        }
    }

    /// Applies everything beats queued: abandoned dialogues, cancellations
    /// and sequence starts, until nothing is left.
    fn settle(&mut self, ctx: &mut SceneContext<'_>) {
        loop {
            let abandoned = ctx.dialogue.take_abandoned();
            let cancels = mem::take(&mut self.backstage.cancels);
            let next_run = self.backstage.runs.pop_front();
            if abandoned.is_empty() && cancels.is_empty() && next_run.is_none() {
                return;
            }
            for token in &abandoned {
                if self.backstage.take_followup(*token).is_some() {
                    debug!(scene = self.label, "dialogue_followup_dropped");
                }
            }
            let mut next_run = next_run;
            for id in &cancels {
                if next_run.as_ref().is_some_and(|request| request.id == *id) {
                    next_run = None;
                    self.runner.discard(*id);
                }
                let before = self.backstage.runs.len();
                self.backstage.runs.retain(|request| request.id != *id);
                if self.backstage.runs.len() != before {
                    self.runner.discard(*id);
                }
            }
            let mut cue = Cue::new(&mut self.backstage, ctx);
            for token in abandoned {
                self.runner.on_dialogue_abandoned(token, &mut cue);
            }
            for id in cancels {
                self.runner.cancel(id, &mut cue);
            }
            if let Some(request) = next_run {
                self.runner.start(request, &mut cue);
            }
        }
    }

    fn is_idle(&self, ctx: &SceneContext<'_>) -> bool {
        !ctx.dialogue.is_visible() && !self.runner.is_running() && self.backstage.runs.is_empty()
    }

    fn sync_state(&mut self, ctx: &SceneContext<'_>) {
        self.state
            .sync(ctx.dialogue.is_visible(), self.runner.is_running());
    }

    fn take_command(&mut self) -> SceneCommand {
        mem::replace(&mut self.backstage.command, SceneCommand::None)
    }
}
