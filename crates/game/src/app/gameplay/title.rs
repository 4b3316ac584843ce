const TITLE_BACKDROP: [u8; 4] = rgb(0x0b0f14);
const TITLE_BOY_SPAWN: Vec2 = Vec2::new(160.0, 92.0);
const TITLE_GIRL_SPAWN: Vec2 = Vec2::new(60.0, 92.0);
const TITLE_BOY_SPEED: f32 = 100.0;
const TITLE_MIN_X: f32 = 20.0;
const TITLE_MAX_X: f32 = 300.0;
const TITLE_MEET_DISTANCE: f32 = 50.0;

#[derive(Default)]
struct TitleWorld {
    boy: Option<ActorHandle>,
}

/// Boy walks left/right; reaching the girl starts the game.
pub(crate) struct TitleScene {
    director: Director<TitleWorld>,
}

impl TitleScene {
    pub(crate) fn new() -> Self {
        Self {
            director: Director::new("Title", TitleWorld::default()),
        }
    }
}

impl Scene for TitleScene {
    fn load(&mut self, ctx: &mut SceneContext<'_>) {
        let (boy, girl) = self.director.with_cue(ctx, |cue| {
            let girl = cue.stage_mut().create_actor(GIRL, TITLE_GIRL_SPAWN);
            let boy = cue.stage_mut().create_actor(GRAYSON, TITLE_BOY_SPAWN);
            cue.world_mut().boy = Some(boy);
            (boy, girl)
        });
        self.director.register_trigger(
            TriggerSpec::new(Anchor::Actor(boy), Anchor::Actor(girl), TITLE_MEET_DISTANCE)
                .on_enter(|cue| {
                    info!("title_meeting");
                    cue.transition_to(HUB);
                }),
        );
    }

    fn update(
        &mut self,
        dt_ms: u64,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand {
        self.director.update(dt_ms, input, ctx, |cue, input, dt_ms| {
            let Some(boy) = cue.world().boy else {
                return;
            };
            let (axis_x, _) = input.movement_axis();
            if axis_x == 0.0 {
                return;
            }
            let Some(position) = cue.stage().position(boy) else {
                return;
            };
            let x = (position.x + axis_x * travel(TITLE_BOY_SPEED, dt_ms))
                .clamp(TITLE_MIN_X, TITLE_MAX_X);
            cue.stage_mut().set_position(boy, Vec2::new(x, position.y));
        })
    }

    fn unload(&mut self, ctx: &mut SceneContext<'_>) {
        self.director.teardown(ctx);
    }

    fn view(&self, registry: &ProgressRegistry) -> SceneView<'_> {
        self.director.view(registry, TITLE_BACKDROP)
    }
}
