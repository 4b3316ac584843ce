const NORTHGATE_BACKDROP: [u8; 4] = rgb(0x1a1a2e);
const NORTHGATE_SPAWN: Vec2 = Vec2::new(50.0, 150.0);
const NORTHGATE_SPEED: f32 = 100.0;

const ESCALATOR_CENTER: Vec2 = Vec2::new(200.0, 147.0);
const ESCALATOR_LIFT: f32 = 80.0;
const ESCALATOR: ActorKind = ActorKind::new("escalator", rgb(0x888888), 30.0, 35.0);
const UPPER_PLATFORM: ActorKind = ActorKind::new("upper_platform", rgb(0x777777), 320.0, 8.0);

const TRAIN: ActorKind = ActorKind::new("train", rgb(0xff0000), 80.0, 20.0);
const TRAIN_START: Vec2 = Vec2::new(400.0, 80.0);
const TRAIN_END_X: f32 = -100.0;
/// 500 px at 150 px/s.
const TRAIN_RUN_MS: u64 = 3333;
const TRAIN_PERIOD_MS: u64 = 5000;

const CECI_NORTHGATE_SPOT: Vec2 = Vec2::new(280.0, 30.0);
const CECI_REACH: f32 = 35.0;
const CARD_FRAGMENT: LatchKey = LatchKey::Scene("cardFragment");

#[derive(Default)]
struct NorthgateWorld {
    player: Option<ActorHandle>,
    train: Option<ActorHandle>,
}

/// Level 1: dodge the trains across the station to reach Ceci.
pub(crate) struct NorthgateScene {
    director: Director<NorthgateWorld>,
}

impl NorthgateScene {
    pub(crate) fn new() -> Self {
        Self {
            director: Director::new("Northgate", NorthgateWorld::default()).with_menus(TITLE),
        }
    }
}

impl Scene for NorthgateScene {
    fn load(&mut self, ctx: &mut SceneContext<'_>) {
        let (player, ceci) = self.director.with_cue(ctx, |cue| {
            let stage = cue.stage_mut();
            stage.create_actor(UPPER_PLATFORM, Vec2::new(160.0, 40.0));
            stage.create_actor(ESCALATOR, ESCALATOR_CENTER);
            let ceci = stage.create_actor(CECI, CECI_NORTHGATE_SPOT);
            let player = stage.create_actor(GRAYSON, NORTHGATE_SPAWN);
            let train = stage.create_actor(TRAIN, TRAIN_START);
            cue.world_mut().player = Some(player);
            cue.world_mut().train = Some(train);

            cue.animate(train, Motion::ToX(TRAIN_END_X), TRAIN_RUN_MS, Easing::Linear);
            cue.every(TRAIN_PERIOD_MS, move |cue| {
                cue.stage_mut().set_position(train, TRAIN_START);
                cue.animate(train, Motion::ToX(TRAIN_END_X), TRAIN_RUN_MS, Easing::Linear)
                    .ok_or(BeatError::MissingActor(train))?;
                debug!("train_departed");
                Ok(())
            });
            (player, ceci)
        });

        self.director.add_gated_action(GatedActionSpec::new(
            Anchor::Actor(player),
            Anchor::Actor(ceci),
            CECI_REACH,
            GrantTier::OneShot(CARD_FRAGMENT),
            "Talk to Ceci",
            |cue| {
                cue.spawn_effect(EffectKind::Pickup, CECI_NORTHGATE_SPOT);
                cue.run(
                    NarrativeSequence::new("card_fragment")
                        .dialogue([
                            "Ceci: This is my first time at this station!",
                            "Ceci: So glad we found each other!",
                        ])
                        .invoke(|cue| {
                            cue.registry_mut().advance_level(1);
                            cue.fade_to(HUB, DEFAULT_FADE_MS);
                        })
                        .wait(DEFAULT_FADE_MS),
                );
            },
        ));
    }

    fn update(
        &mut self,
        dt_ms: u64,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand {
        self.director.update(dt_ms, input, ctx, |cue, input, dt_ms| {
            let NorthgateWorld {
                player: Some(player),
                train,
            } = *cue.world()
            else {
                return;
            };
            let (Some(from), Some(bounds)) = (cue.stage().position(player), actor_bounds(cue, player))
            else {
                return;
            };

            let direction = input_direction(input);
            let step = travel(NORTHGATE_SPEED, dt_ms);
            let mut delta = Vec2::new(direction.x * step, direction.y * step);
            let escalator = Rect::centered(ESCALATOR_CENTER, ESCALATOR.half_extent);
            if escalator.intersects(&bounds) {
                delta.y -= travel(ESCALATOR_LIFT, dt_ms);
            }
            let to = clamp_inside(from.offset(delta.x, delta.y), PLAY_AREA, GRAYSON.half_extent);
            cue.stage_mut().set_position(player, to);

            let train_bounds = train.and_then(|train| actor_bounds(cue, train));
            let hit = match (actor_bounds(cue, player), train_bounds) {
                (Some(player_bounds), Some(train_bounds)) => player_bounds.intersects(&train_bounds),
                _ => false,
            };
            if hit {
                info!(x = to.x, y = to.y, "train_hit");
                cue.stage_mut().set_position(player, NORTHGATE_SPAWN);
                cue.spawn_effect(EffectKind::Flash, NORTHGATE_SPAWN);
            }
        })
    }

    fn unload(&mut self, ctx: &mut SceneContext<'_>) {
        self.director.teardown(ctx);
    }

    fn view(&self, registry: &ProgressRegistry) -> SceneView<'_> {
        self.director.view(registry, NORTHGATE_BACKDROP)
    }
}
