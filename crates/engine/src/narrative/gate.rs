use tracing::{debug, info};

use crate::app::{InputAction, InputSnapshot};

use super::cue::Cue;
use super::registry::{LatchKey, Latches, ProgressRegistry};
use super::stage::{ActorHandle, ActorStage, Rect, Vec2};

pub type Hook<W> = Box<dyn FnMut(&mut Cue<'_, W>)>;

/// One end of a proximity check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    Actor(ActorHandle),
    Point(Vec2),
}

impl Anchor {
    pub fn resolve(self, stage: &ActorStage) -> Option<Vec2> {
        match self {
            Anchor::Actor(handle) => stage.position(handle),
            Anchor::Point(point) => Some(point),
        }
    }
}

pub struct TriggerSpec<W> {
    source: Anchor,
    target: Anchor,
    threshold: f32,
    on_enter: Option<Hook<W>>,
    on_exit: Option<Hook<W>>,
    on_stay: Option<Hook<W>>,
}

impl<W: 'static> TriggerSpec<W> {
    pub fn new(source: Anchor, target: Anchor, threshold: f32) -> Self {
        Self {
            source,
            target,
            threshold,
            on_enter: None,
            on_exit: None,
            on_stay: None,
        }
    }

    pub fn on_enter(mut self, hook: impl FnMut(&mut Cue<'_, W>) + 'static) -> Self {
        self.on_enter = Some(Box::new(hook));
        self
    }

    pub fn on_exit(mut self, hook: impl FnMut(&mut Cue<'_, W>) + 'static) -> Self {
        self.on_exit = Some(Box::new(hook));
        self
    }

    pub fn on_stay(mut self, hook: impl FnMut(&mut Cue<'_, W>) + 'static) -> Self {
        self.on_stay = Some(Box::new(hook));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    Entered,
    Stayed,
    Exited,
    Outside,
}

struct ProximityTrigger<W> {
    spec: TriggerSpec<W>,
    was_in_range: bool,
    enabled: bool,
}

impl<W> ProximityTrigger<W> {
    /// `None` when either anchor is gone; the latch bit is left untouched.
    fn evaluate(&mut self, stage: &ActorStage) -> Option<TriggerEdge> {
        let source = self.spec.source.resolve(stage)?;
        let target = self.spec.target.resolve(stage)?;
        let in_range = source.distance(target) < self.spec.threshold;
        let edge = match (self.was_in_range, in_range) {
            (false, true) => TriggerEdge::Entered,
            (true, true) => TriggerEdge::Stayed,
            (true, false) => TriggerEdge::Exited,
            (false, false) => TriggerEdge::Outside,
        };
        self.was_in_range = in_range;
        Some(edge)
    }
}

/// How often a gated action may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantTier {
    /// The latch is raised before the effect runs; once set the action is no
    /// longer offered and a repeat press is refused.
    OneShot(LatchKey),
    /// Always offered while in range. The optional latch records that the
    /// action happened at least once and is raised after the effect, so the
    /// effect sees whether this is the first time.
    Repeatable(Option<LatchKey>),
}

pub struct GatedActionSpec<W> {
    pub source: Anchor,
    pub target: Anchor,
    pub threshold: f32,
    pub input: InputAction,
    pub tier: GrantTier,
    pub prompt: &'static str,
    effect: Hook<W>,
}

impl<W: 'static> GatedActionSpec<W> {
    pub fn new(
        source: Anchor,
        target: Anchor,
        threshold: f32,
        tier: GrantTier,
        prompt: &'static str,
        effect: impl FnMut(&mut Cue<'_, W>) + 'static,
    ) -> Self {
        Self {
            source,
            target,
            threshold,
            input: InputAction::Interact,
            tier,
            prompt,
            effect: Box::new(effect),
        }
    }

    pub fn with_input(mut self, input: InputAction) -> Self {
        self.input = input;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateId(usize);

struct GatedAction<W> {
    trigger: TriggerId,
    input: InputAction,
    tier: GrantTier,
    prompt: &'static str,
    target: Anchor,
    effect: Hook<W>,
    enabled: bool,
}

impl<W> GatedAction<W> {
    fn is_spent(&self, latches: &Latches, registry: &ProgressRegistry) -> bool {
        match self.tier {
            GrantTier::OneShot(latch) => latch.is_set(latches, registry),
            GrantTier::Repeatable(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prompt {
    pub text: &'static str,
    pub anchor: Vec2,
}

/// A region that may only be entered once `requires` is latched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barrier {
    pub label: &'static str,
    pub region: Rect,
    pub requires: LatchKey,
}

impl Barrier {
    /// Whether a move from `from` to `to` crosses into the region. Moves that
    /// start inside (or stay outside) are never blocked.
    pub fn blocks(&self, from: Vec2, to: Vec2) -> bool {
        !self.region.contains(from) && self.region.contains(to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    Moved(Vec2),
    Blocked { barrier: &'static str },
    Missing,
}

/// Proximity triggers plus the input-gated actions they make available.
pub struct InteractionGate<W> {
    triggers: Vec<ProximityTrigger<W>>,
    actions: Vec<GatedAction<W>>,
}

impl<W> Default for InteractionGate<W> {
    fn default() -> Self {
        Self {
            triggers: Vec::new(),
            actions: Vec::new(),
        }
    }
}

impl<W: 'static> InteractionGate<W> {
    pub fn register_trigger(&mut self, spec: TriggerSpec<W>) -> TriggerId {
        self.triggers.push(ProximityTrigger {
            spec,
            was_in_range: false,
            enabled: true,
        });
        TriggerId(self.triggers.len() - 1)
    }

    pub fn set_trigger_enabled(&mut self, id: TriggerId, enabled: bool) {
        if let Some(trigger) = self.triggers.get_mut(id.0) {
            trigger.enabled = enabled;
            if !enabled {
                trigger.was_in_range = false;
            }
        }
    }

    pub fn in_range(&self, id: TriggerId) -> bool {
        self.triggers
            .get(id.0)
            .is_some_and(|trigger| trigger.enabled && trigger.was_in_range)
    }

    pub fn add_gated_action(&mut self, spec: GatedActionSpec<W>) -> GateId {
        let GatedActionSpec {
            source,
            target,
            threshold,
            input,
            tier,
            prompt,
            effect,
        } = spec;
        let trigger = self.register_trigger(TriggerSpec::new(source, target, threshold));
        self.actions.push(GatedAction {
            trigger,
            input,
            tier,
            prompt,
            target,
            effect,
            enabled: true,
        });
        GateId(self.actions.len() - 1)
    }

    pub fn set_action_enabled(&mut self, id: GateId, enabled: bool) {
        if let Some(action) = self.actions.get_mut(id.0) {
            action.enabled = enabled;
        }
    }

    /// Recomputes every trigger and dispatches its edge hooks.
    pub fn update(&mut self, cue: &mut Cue<'_, W>) {
        for trigger in self.triggers.iter_mut().filter(|trigger| trigger.enabled) {
            let Some(edge) = trigger.evaluate(cue.stage()) else {
                continue;
            };
            let hook = match edge {
                TriggerEdge::Entered => trigger.spec.on_enter.as_mut(),
                TriggerEdge::Stayed => trigger.spec.on_stay.as_mut(),
                TriggerEdge::Exited => trigger.spec.on_exit.as_mut(),
                TriggerEdge::Outside => None,
            };
            if let Some(hook) = hook {
                hook(cue);
            }
        }
    }

    /// Commits at most one available action whose input was pressed this tick.
    pub fn handle_input(&mut self, input: &InputSnapshot, cue: &mut Cue<'_, W>) -> Option<GateId> {
        for (index, action) in self.actions.iter_mut().enumerate() {
            if !action.enabled || !input.just_pressed(action.input) {
                continue;
            }
            let in_range = self
                .triggers
                .get(action.trigger.0)
                .is_some_and(|trigger| trigger.enabled && trigger.was_in_range);
            if !in_range {
                continue;
            }
            match action.tier {
                GrantTier::OneShot(latch) => {
                    if !cue.latch(latch) {
                        debug!(prompt = action.prompt, latch = latch.name(), "gated_action_refused");
                        continue;
                    }
                    info!(prompt = action.prompt, latch = latch.name(), "gated_action_granted");
                    (action.effect)(cue);
                }
                GrantTier::Repeatable(latch) => {
                    info!(prompt = action.prompt, "gated_action_committed");
                    (action.effect)(cue);
                    if let Some(latch) = latch {
                        cue.latch(latch);
                    }
                }
            }
            return Some(GateId(index));
        }
        None
    }

    /// The first action currently on offer, for the prompt bubble.
    pub fn prompt(
        &self,
        stage: &ActorStage,
        latches: &Latches,
        registry: &ProgressRegistry,
    ) -> Option<Prompt> {
        self.actions
            .iter()
            .filter(|action| action.enabled && self.in_range(action.trigger))
            .find(|action| !action.is_spent(latches, registry))
            .and_then(|action| {
                Some(Prompt {
                    text: action.prompt,
                    anchor: action.target.resolve(stage)?,
                })
            })
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }
}
