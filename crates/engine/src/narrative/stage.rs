//! Concrete stand-ins for the collaborators the narrative core drives but does
//! not own the look of: actors on screen, position tweens and fire-and-forget
//! effects.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(self, dx: f32, dy: f32) -> Vec2 {
        Vec2::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// Top-left origin, like the authored level layouts.
    pub const fn from_origin_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2 { x, y },
            max: Vec2 {
                x: x + width,
                y: y + height,
            },
        }
    }

    pub fn centered(center: Vec2, half_extent: Vec2) -> Self {
        Self {
            min: Vec2::new(center.x - half_extent.x, center.y - half_extent.y),
            max: Vec2::new(center.x + half_extent.x, center.y + half_extent.y),
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorHandle(u64);

/// How an actor is drawn by the placeholder renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorKind {
    pub name: &'static str,
    pub color: [u8; 4],
    pub half_extent: Vec2,
}

impl ActorKind {
    pub const fn new(name: &'static str, color: [u8; 4], width: f32, height: f32) -> Self {
        Self {
            name,
            color,
            half_extent: Vec2 {
                x: width * 0.5,
                y: height * 0.5,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub handle: ActorHandle,
    pub kind: ActorKind,
    pub position: Vec2,
    pub visible: bool,
}

impl Actor {
    pub fn bounds(&self) -> Rect {
        Rect::centered(self.position, self.kind.half_extent)
    }
}

#[derive(Debug, Default)]
pub struct ActorStage {
    actors: Vec<Actor>,
    next_handle: u64,
}

impl ActorStage {
    pub fn create_actor(&mut self, kind: ActorKind, position: Vec2) -> ActorHandle {
        self.next_handle = self.next_handle.saturating_add(1);
        let handle = ActorHandle(self.next_handle);
        self.actors.push(Actor {
            handle,
            kind,
            position,
            visible: true,
        });
        debug!(actor = kind.name, x = position.x, y = position.y, "actor_created");
        handle
    }

    pub fn set_position(&mut self, handle: ActorHandle, position: Vec2) -> bool {
        let Some(actor) = self.find_mut(handle) else {
            return false;
        };
        actor.position = position;
        true
    }

    pub fn set_visible(&mut self, handle: ActorHandle, visible: bool) -> bool {
        let Some(actor) = self.find_mut(handle) else {
            return false;
        };
        actor.visible = visible;
        true
    }

    pub fn destroy(&mut self, handle: ActorHandle) -> bool {
        let before = self.actors.len();
        self.actors.retain(|actor| actor.handle != handle);
        before != self.actors.len()
    }

    pub fn position(&self, handle: ActorHandle) -> Option<Vec2> {
        self.find(handle).map(|actor| actor.position)
    }

    pub fn find(&self, handle: ActorHandle) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.handle == handle)
    }

    pub fn contains(&self, handle: ActorHandle) -> bool {
        self.find(handle).is_some()
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn clear(&mut self) {
        self.actors.clear();
    }

    fn find_mut(&mut self, handle: ActorHandle) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|actor| actor.handle == handle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => t * (2.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

/// Property change requested from the animator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Relative move, resolved against the position when the tween starts.
    By(Vec2),
    /// Absolute destination.
    To(Vec2),
    /// Absolute destination on one axis only.
    ToX(f32),
    ToY(f32),
}

impl Motion {
    fn destination(self, from: Vec2) -> Vec2 {
        match self {
            Motion::By(delta) => from.offset(delta.x, delta.y),
            Motion::To(to) => to,
            Motion::ToX(x) => Vec2::new(x, from.y),
            Motion::ToY(y) => Vec2::new(from.x, y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(u64);

#[derive(Debug, Clone)]
struct Tween {
    id: AnimationId,
    target: ActorHandle,
    from: Vec2,
    to: Vec2,
    elapsed_ms: u64,
    duration_ms: u64,
    easing: Easing,
}

#[derive(Debug, Default)]
pub struct TweenAnimator {
    tweens: Vec<Tween>,
    next_id: u64,
}

impl TweenAnimator {
    /// Starts a tween on `target`. Returns `None` when the actor is gone.
    pub fn animate(
        &mut self,
        stage: &ActorStage,
        target: ActorHandle,
        motion: Motion,
        duration_ms: u64,
        easing: Easing,
    ) -> Option<AnimationId> {
        let from = stage.position(target)?;
        self.next_id = self.next_id.saturating_add(1);
        let id = AnimationId(self.next_id);
        self.tweens.push(Tween {
            id,
            target,
            from,
            to: motion.destination(from),
            elapsed_ms: 0,
            duration_ms,
            easing,
        });
        Some(id)
    }

    /// Advances all tweens and writes positions to the stage. Returns the ids
    /// that finished this tick, in start order. Tweens whose actor was
    /// destroyed finish immediately.
    pub fn tick(&mut self, dt_ms: u64, stage: &mut ActorStage) -> Vec<AnimationId> {
        let mut finished = Vec::new();
        self.tweens.retain_mut(|tween| {
            tween.elapsed_ms = tween.elapsed_ms.saturating_add(dt_ms);
            let t = if tween.duration_ms == 0 {
                1.0
            } else {
                tween.elapsed_ms as f32 / tween.duration_ms as f32
            };
            let eased = tween.easing.apply(t);
            let position = Vec2::new(
                tween.from.x + (tween.to.x - tween.from.x) * eased,
                tween.from.y + (tween.to.y - tween.from.y) * eased,
            );
            let alive = stage.set_position(tween.target, position);
            if !alive || tween.elapsed_ms >= tween.duration_ms {
                finished.push(tween.id);
                return false;
            }
            true
        });
        finished
    }

    pub fn cancel(&mut self, id: AnimationId) -> bool {
        let before = self.tweens.len();
        self.tweens.retain(|tween| tween.id != id);
        before != self.tweens.len()
    }

    pub fn is_running(&self, id: AnimationId) -> bool {
        self.tweens.iter().any(|tween| tween.id == id)
    }

    pub fn is_animating(&self, target: ActorHandle) -> bool {
        self.tweens.iter().any(|tween| tween.target == target)
    }

    pub fn active_count(&self) -> usize {
        self.tweens.len()
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.tweens.len();
        self.tweens.clear();
        dropped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Sparkles,
    Flash,
    FadeOut,
    Pickup,
}

impl EffectKind {
    pub const fn default_ttl_ms(self) -> u64 {
        match self {
            EffectKind::Sparkles => 1200,
            EffectKind::Flash => 200,
            EffectKind::FadeOut => 1000,
            EffectKind::Pickup => 400,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub kind: EffectKind,
    pub position: Vec2,
    pub ttl_ms: u64,
    pub duration_ms: u64,
}

impl Effect {
    /// 0.0 when just spawned, 1.0 when about to expire.
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        1.0 - self.ttl_ms as f32 / self.duration_ms as f32
    }
}

#[derive(Debug, Default)]
pub struct EffectLog {
    effects: Vec<Effect>,
}

impl EffectLog {
    pub fn spawn_effect(&mut self, kind: EffectKind, position: Vec2) {
        self.spawn_effect_for(kind, position, kind.default_ttl_ms());
    }

    pub fn spawn_effect_for(&mut self, kind: EffectKind, position: Vec2, ttl_ms: u64) {
        debug!(effect = ?kind, x = position.x, y = position.y, ttl_ms, "effect_spawned");
        self.effects.push(Effect {
            kind,
            position,
            ttl_ms,
            duration_ms: ttl_ms,
        });
    }

    pub fn tick(&mut self, dt_ms: u64) {
        self.effects.retain_mut(|effect| {
            effect.ttl_ms = effect.ttl_ms.saturating_sub(dt_ms);
            effect.ttl_ms > 0
        });
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOT: ActorKind = ActorKind::new("dot", [255, 255, 255, 255], 2.0, 2.0);

    #[test]
    fn missing_actor_calls_are_no_ops() {
        let mut stage = ActorStage::default();
        let handle = stage.create_actor(DOT, Vec2::new(1.0, 1.0));
        assert!(stage.destroy(handle));
        assert!(!stage.set_position(handle, Vec2::ZERO));
        assert!(!stage.set_visible(handle, false));
        assert!(!stage.destroy(handle));
        assert_eq!(stage.position(handle), None);
    }

    #[test]
    fn linear_tween_reaches_destination_and_reports_completion_once() {
        let mut stage = ActorStage::default();
        let mut animator = TweenAnimator::default();
        let handle = stage.create_actor(DOT, Vec2::new(160.0, 220.0));
        let id = animator
            .animate(&stage, handle, Motion::ToY(145.0), 2000, Easing::Linear)
            .expect("actor exists");

        assert!(animator.tick(1000, &mut stage).is_empty());
        let midway = stage.position(handle).expect("actor exists");
        assert!((midway.y - 182.5).abs() < 0.001);

        assert_eq!(animator.tick(1000, &mut stage), vec![id]);
        assert_eq!(stage.position(handle), Some(Vec2::new(160.0, 145.0)));
        assert!(animator.tick(16, &mut stage).is_empty());
    }

    #[test]
    fn tween_on_destroyed_actor_finishes_without_moving_anything() {
        let mut stage = ActorStage::default();
        let mut animator = TweenAnimator::default();
        let handle = stage.create_actor(DOT, Vec2::ZERO);
        let id = animator
            .animate(&stage, handle, Motion::By(Vec2::new(10.0, 0.0)), 500, Easing::QuadOut)
            .expect("actor exists");
        stage.destroy(handle);
        assert_eq!(animator.tick(16, &mut stage), vec![id]);
        assert_eq!(animator.active_count(), 0);
    }

    #[test]
    fn animate_missing_actor_returns_none() {
        let stage = ActorStage::default();
        let mut animator = TweenAnimator::default();
        let mut other = ActorStage::default();
        let stranger = other.create_actor(DOT, Vec2::ZERO);
        assert_eq!(
            animator.animate(&stage, stranger, Motion::To(Vec2::ZERO), 10, Easing::Linear),
            None
        );
    }

    #[test]
    fn easing_curves_hit_endpoints() {
        for easing in [Easing::Linear, Easing::QuadIn, Easing::QuadOut, Easing::QuadInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert!((easing.apply(1.0) - 1.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn effects_expire_after_ttl() {
        let mut effects = EffectLog::default();
        effects.spawn_effect_for(EffectKind::Flash, Vec2::ZERO, 200);
        effects.tick(150);
        assert_eq!(effects.effects().len(), 1);
        effects.tick(50);
        assert!(effects.effects().is_empty());
    }

    #[test]
    fn rect_intersection_is_exclusive_at_edges() {
        let a = Rect::from_origin_size(0.0, 0.0, 10.0, 10.0);
        let b = Rect::from_origin_size(10.0, 0.0, 10.0, 10.0);
        let c = Rect::from_origin_size(9.0, 9.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(a.contains(Vec2::new(10.0, 10.0)));
    }
}
