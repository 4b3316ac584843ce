const ICE_HOCKEY_BACKDROP: [u8; 4] = rgb(0x1a3a52);
const RINK: ActorKind = ActorKind::new("rink", rgb(0xdff3ff), 280.0, 120.0);
const CENTER_LINE: ActorKind = ActorKind::new("center_line", rgb(0xd62828), 3.0, 120.0);
const LEVEL_CLEARED: LatchKey = LatchKey::Scene("levelCleared");

/// Level 2 placeholder: confirm counts the level as done.
pub(crate) struct IceHockeyScene {
    director: Director<()>,
}

impl IceHockeyScene {
    pub(crate) fn new() -> Self {
        Self {
            director: Director::new("IceHockey", ()).with_menus(TITLE),
        }
    }
}

impl Scene for IceHockeyScene {
    fn load(&mut self, ctx: &mut SceneContext<'_>) {
        self.director.with_cue(ctx, |cue| {
            let stage = cue.stage_mut();
            stage.create_actor(RINK, Vec2::new(160.0, 90.0));
            stage.create_actor(CENTER_LINE, Vec2::new(160.0, 90.0));
            stage.create_actor(CECI, Vec2::new(160.0, 160.0));
        });
    }

    fn update(
        &mut self,
        dt_ms: u64,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand {
        self.director.update(dt_ms, input, ctx, |cue, input, _| {
            if !input.just_pressed(InputAction::Confirm) || !cue.latch(LEVEL_CLEARED) {
                return;
            }
            cue.registry_mut().advance_level(2);
            cue.transition_to(HUB);
        })
    }

    fn unload(&mut self, ctx: &mut SceneContext<'_>) {
        self.director.teardown(ctx);
    }

    fn view(&self, registry: &ProgressRegistry) -> SceneView<'_> {
        self.director.view(registry, ICE_HOCKEY_BACKDROP)
    }

    fn debug_title(&self, _registry: &ProgressRegistry) -> Option<String> {
        Some("IceHockey | coming soon, press Enter".to_string())
    }
}
