use narrative_engine::narrative::{
    ActorHandle, ActorKind, Anchor, Barrier, BeatError, Cue, Director, EffectKind, Easing,
    GatedActionSpec, GrantTier, LatchKey, Motion, MoveOutcome, NarrativeSequence, Rect,
    TriggerSpec, Vec2, DEFAULT_FADE_MS,
};
use narrative_engine::{
    InputAction, InputSnapshot, ProgressRegistry, Scene, SceneCommand, SceneContext, SceneFactory,
    SceneKey, SceneView,
};
use tracing::{debug, info};

pub(crate) const TITLE: SceneKey = SceneKey("Title");
pub(crate) const HUB: SceneKey = SceneKey("Game");
pub(crate) const NORTHGATE: SceneKey = SceneKey("Northgate");
pub(crate) const ICE_HOCKEY: SceneKey = SceneKey("IceHockey");
pub(crate) const FARMERS_MARKET: SceneKey = SceneKey("FarmersMarket");

const SCENE_KEYS: [SceneKey; 5] = [TITLE, HUB, NORTHGATE, ICE_HOCKEY, FARMERS_MARKET];

const HAS_TICKET: &str = "hasTicket";
const SHOW_HELP_HINT: &str = "showHelpHint";
const MET_EBOSHI: &str = "metEboshi";
const MEMORY_SHARDS: &str = "memoryShards";
const FINAL_LEVEL: u32 = 3;

include!("util.rs");
include!("title.rs");
include!("hub.rs");
include!("northgate.rs");
include!("ice_hockey.rs");
include!("farmers_market.rs");

pub(crate) fn scene_factory() -> SceneFactory {
    Box::new(|key| -> Option<Box<dyn Scene>> {
        let scene: Box<dyn Scene> = match key {
            TITLE => Box::new(TitleScene::new()),
            HUB => Box::new(HubScene::new()),
            NORTHGATE => Box::new(NorthgateScene::new()),
            ICE_HOCKEY => Box::new(IceHockeyScene::new()),
            FARMERS_MARKET => Box::new(FarmersMarketScene::new()),
            _ => return None,
        };
        Some(scene)
    })
}

/// Case-insensitive lookup used by config and env overrides.
pub(crate) fn scene_key_named(name: &str) -> Option<SceneKey> {
    SCENE_KEYS
        .into_iter()
        .find(|key| key.0.eq_ignore_ascii_case(name.trim()))
}

/// Scene that plays level `level` (1..=3).
pub(crate) fn level_scene(level: u32) -> Option<SceneKey> {
    match level {
        1 => Some(NORTHGATE),
        2 => Some(ICE_HOCKEY),
        3 => Some(FARMERS_MARKET),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
