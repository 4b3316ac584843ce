use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info};

use super::cue::{Action, Cue, Predicate};
use super::dialogue::DialogueToken;
use super::scheduler::TimerHandle;
use super::stage::{ActorHandle, AnimationId, Easing, Motion};

/// One authored beat of a [`NarrativeSequence`].
pub enum Step<W> {
    WaitFor {
        ms: u64,
    },
    /// Polled through a recurring scheduler entry every `poll_ms` (0 = every
    /// tick). The first poll happens on the tick after the step is reached.
    WaitForCondition {
        predicate: Predicate<W>,
        poll_ms: u64,
    },
    Animate {
        target: ActorHandle,
        motion: Motion,
        duration_ms: u64,
        easing: Easing,
    },
    ShowDialogue {
        lines: Vec<String>,
    },
    /// Evaluated once when reached; the chosen branch replaces every step
    /// that would have followed.
    Branch {
        predicate: Predicate<W>,
        if_true: Vec<Step<W>>,
        if_false: Vec<Step<W>>,
    },
    /// Runs inline and continues with the next step in the same tick.
    Invoke(Action<W>),
}

impl<W> Step<W> {
    fn kind(&self) -> &'static str {
        match self {
            Step::WaitFor { .. } => "wait_for",
            Step::WaitForCondition { .. } => "wait_for_condition",
            Step::Animate { .. } => "animate",
            Step::ShowDialogue { .. } => "show_dialogue",
            Step::Branch { .. } => "branch",
            Step::Invoke(_) => "invoke",
        }
    }
}

impl<W> std::fmt::Debug for Step<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// Ordered, possibly branching list of beats. Built once, consumed by
/// [`SequenceRunner::start`].
pub struct NarrativeSequence<W> {
    label: &'static str,
    steps: Vec<Step<W>>,
}

impl<W: 'static> NarrativeSequence<W> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            steps: Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(mut self, step: Step<W>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn wait(self, ms: u64) -> Self {
        self.step(Step::WaitFor { ms })
    }

    pub fn wait_until<P>(self, predicate: P) -> Self
    where
        P: Fn(&Cue<'_, W>) -> bool + 'static,
    {
        self.wait_until_polled(0, predicate)
    }

    pub fn wait_until_polled<P>(self, poll_ms: u64, predicate: P) -> Self
    where
        P: Fn(&Cue<'_, W>) -> bool + 'static,
    {
        self.step(Step::WaitForCondition {
            predicate: Box::new(predicate),
            poll_ms,
        })
    }

    pub fn animate(
        self,
        target: ActorHandle,
        motion: Motion,
        duration_ms: u64,
        easing: Easing,
    ) -> Self {
        self.step(Step::Animate {
            target,
            motion,
            duration_ms,
            easing,
        })
    }

    pub fn dialogue<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step(Step::ShowDialogue {
            lines: lines.into_iter().map(Into::into).collect(),
        })
    }

    pub fn branch<P>(
        self,
        predicate: P,
        if_true: NarrativeSequence<W>,
        if_false: NarrativeSequence<W>,
    ) -> Self
    where
        P: Fn(&Cue<'_, W>) -> bool + 'static,
    {
        self.step(Step::Branch {
            predicate: Box::new(predicate),
            if_true: if_true.steps,
            if_false: if_false.steps,
        })
    }

    pub fn invoke<F>(self, action: F) -> Self
    where
        F: FnOnce(&mut Cue<'_, W>) + 'static,
    {
        self.step(Step::Invoke(Box::new(action)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Not started (or unknown to this runner).
    Idle,
    Running { step_index: usize },
    Completed,
    Cancelled,
}

/// Scheduler payload that resumes a sequence. `arm` must match the
/// sequence's current arm or the wake is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceWake {
    pub sequence: SequenceId,
    pub arm: u64,
}

pub(crate) struct SequenceRequest<W> {
    pub(crate) id: SequenceId,
    pub(crate) sequence: NarrativeSequence<W>,
    pub(crate) on_complete: Option<Action<W>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Armed {
    Timer(TimerHandle),
    Condition(TimerHandle),
    Animation(AnimationId),
    Dialogue(DialogueToken),
}

struct ActiveSequence<W> {
    label: &'static str,
    steps: VecDeque<Step<W>>,
    step_index: usize,
    started_steps: usize,
    arm: u64,
    armed: Option<Armed>,
    condition: Option<Predicate<W>>,
    on_complete: Option<Action<W>>,
}

/// How many finished outcomes are kept for [`SequenceRunner::state`]. Older
/// ids read as `Idle`.
pub const FINISHED_HISTORY: usize = 32;

/// Drives running sequences one armed step at a time.
pub struct SequenceRunner<W> {
    active: BTreeMap<SequenceId, ActiveSequence<W>>,
    finished: BTreeMap<SequenceId, SequenceState>,
}

impl<W> Default for SequenceRunner<W> {
    fn default() -> Self {
        Self {
            active: BTreeMap::new(),
            finished: BTreeMap::new(),
        }
    }
}

impl<W: 'static> SequenceRunner<W> {
    pub fn state(&self, id: SequenceId) -> SequenceState {
        if let Some(sequence) = self.active.get(&id) {
            return SequenceState::Running {
                step_index: sequence.step_index,
            };
        }
        self.finished
            .get(&id)
            .copied()
            .unwrap_or(SequenceState::Idle)
    }

    pub fn is_running(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn running_count(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn start(&mut self, request: SequenceRequest<W>, cue: &mut Cue<'_, W>) {
        let SequenceRequest {
            id,
            sequence,
            on_complete,
        } = request;
        info!(
            sequence = sequence.label,
            id = id.0,
            step_count = sequence.steps.len(),
            "sequence_started"
        );
        self.active.insert(
            id,
            ActiveSequence {
                label: sequence.label,
                steps: sequence.steps.into(),
                step_index: 0,
                started_steps: 0,
                arm: 0,
                armed: None,
                condition: None,
                on_complete,
            },
        );
        self.drive(id, cue);
    }

    pub(crate) fn on_wake(&mut self, wake: SequenceWake, cue: &mut Cue<'_, W>) {
        let Some(sequence) = self.active.get_mut(&wake.sequence) else {
            return;
        };
        if sequence.arm != wake.arm {
            debug!(
                sequence = sequence.label,
                wake_arm = wake.arm,
                current_arm = sequence.arm,
                "sequence_stale_wake_ignored"
            );
            return;
        }
        match sequence.armed {
            Some(Armed::Timer(_)) => {
                sequence.armed = None;
            }
            Some(Armed::Condition(handle)) => {
                let satisfied = sequence
                    .condition
                    .as_ref()
                    .map_or(true, |predicate| predicate(&*cue));
                if !satisfied {
                    return;
                }
                cue.cancel_timer(handle);
                sequence.condition = None;
                sequence.armed = None;
            }
            _ => return,
        }
        self.drive(wake.sequence, cue);
    }

    pub(crate) fn on_animation_finished(&mut self, animation: AnimationId, cue: &mut Cue<'_, W>) {
        if let Some(id) = self.take_armed(Armed::Animation(animation)) {
            self.drive(id, cue);
        }
    }

    pub(crate) fn on_dialogue_closed(&mut self, token: DialogueToken, cue: &mut Cue<'_, W>) {
        if let Some(id) = self.take_armed(Armed::Dialogue(token)) {
            self.drive(id, cue);
        }
    }

    /// A dialogue a sequence was waiting on was hidden or replaced; that
    /// sequence can never resume and is cancelled.
    pub(crate) fn on_dialogue_abandoned(&mut self, token: DialogueToken, cue: &mut Cue<'_, W>) {
        let waiting = self
            .active
            .iter()
            .find(|(_, sequence)| sequence.armed == Some(Armed::Dialogue(token)))
            .map(|(id, _)| *id);
        if let Some(id) = waiting {
            self.cancel(id, cue);
        }
    }

    pub fn cancel(&mut self, id: SequenceId, cue: &mut Cue<'_, W>) -> bool {
        let Some(sequence) = self.active.remove(&id) else {
            return false;
        };
        match sequence.armed {
            Some(Armed::Timer(handle)) | Some(Armed::Condition(handle)) => {
                cue.cancel_timer(handle);
            }
            Some(Armed::Animation(animation)) => {
                cue.cancel_animation(animation);
            }
            Some(Armed::Dialogue(token)) => {
                if cue.dialogue().owner() == Some(token) {
                    cue.hide_dialogue();
                }
            }
            None => {}
        }
        self.record_finished(id, SequenceState::Cancelled);
        info!(
            sequence = sequence.label,
            id = id.0,
            step_index = sequence.step_index,
            "sequence_cancelled"
        );
        true
    }

    /// Records a queued request that was cancelled before it started.
    pub(crate) fn discard(&mut self, id: SequenceId) {
        self.record_finished(id, SequenceState::Cancelled);
        debug!(id = id.0, "sequence_discarded_before_start");
    }

    pub fn cancel_all(&mut self, cue: &mut Cue<'_, W>) -> usize {
        let ids: Vec<SequenceId> = self.active.keys().copied().collect();
        ids.into_iter().filter(|id| self.cancel(*id, cue)).count()
    }

    pub fn finished_count(&self) -> usize {
        self.finished.len()
    }

    /// Ids are handed out in increasing order, so the first entry is the oldest.
    fn record_finished(&mut self, id: SequenceId, state: SequenceState) {
        self.finished.insert(id, state);
        while self.finished.len() > FINISHED_HISTORY {
            self.finished.pop_first();
        }
    }

    fn take_armed(&mut self, armed: Armed) -> Option<SequenceId> {
        let (id, sequence) = self
            .active
            .iter_mut()
            .find(|(_, sequence)| sequence.armed == Some(armed))?;
        sequence.armed = None;
        Some(*id)
    }

    /// Starts steps until one arms a wait or the sequence runs out.
    fn drive(&mut self, id: SequenceId, cue: &mut Cue<'_, W>) {
        loop {
            let Some(sequence) = self.active.get_mut(&id) else {
                return;
            };
            let Some(step) = sequence.steps.pop_front() else {
                self.complete(id, cue);
                return;
            };
            sequence.step_index = sequence.started_steps;
            sequence.started_steps += 1;
            sequence.arm += 1;
            let wake = SequenceWake {
                sequence: id,
                arm: sequence.arm,
            };
            debug!(
                sequence = sequence.label,
                step_index = sequence.step_index,
                step = step.kind(),
                "sequence_step_started"
            );
            match step {
                Step::WaitFor { ms } => {
                    sequence.armed = Some(Armed::Timer(cue.wake_after(ms, wake)));
                    return;
                }
                Step::WaitForCondition { predicate, poll_ms } => {
                    sequence.condition = Some(predicate);
                    sequence.armed = Some(Armed::Condition(cue.poll_every(poll_ms, wake)));
                    return;
                }
                Step::Animate {
                    target,
                    motion,
                    duration_ms,
                    easing,
                } => {
                    if let Some(animation) = cue.animate(target, motion, duration_ms, easing) {
                        sequence.armed = Some(Armed::Animation(animation));
                        return;
                    }
                    debug!(sequence = sequence.label, "sequence_animate_target_missing");
                }
                Step::ShowDialogue { lines } => {
                    sequence.armed = Some(Armed::Dialogue(cue.show_dialogue(lines)));
                    return;
                }
                Step::Branch {
                    predicate,
                    if_true,
                    if_false,
                } => {
                    let taken = predicate(&*cue);
                    debug!(sequence = sequence.label, taken, "sequence_branch_taken");
                    let chosen = if taken { if_true } else { if_false };
                    sequence.steps = chosen.into();
                }
                Step::Invoke(action) => {
                    action(cue);
                }
            }
        }
    }

    fn complete(&mut self, id: SequenceId, cue: &mut Cue<'_, W>) {
        let Some(sequence) = self.active.remove(&id) else {
            return;
        };
        self.record_finished(id, SequenceState::Completed);
        info!(sequence = sequence.label, id = id.0, "sequence_completed");
        if let Some(on_complete) = sequence.on_complete {
            on_complete(cue);
        }
    }
}
