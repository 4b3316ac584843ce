const HUB_BACKDROP: [u8; 4] = rgb(0x0e1a24);
const HUB_SPEED: f32 = 80.0;
const HUB_SPAWN: Vec2 = Vec2::new(160.0, 150.0);
const HUB_INTERACT_RANGE: f32 = 24.0;
const HELP_HINT_DELAY_MS: u64 = 1500;
const ENDING_DELAY_MS: u64 = 600;

/// Crossing into this strip boards the train to the next level.
const PLATFORM_ZONE: Rect = Rect::from_origin_size(0.0, 0.0, 320.0, 24.0);
const PLATFORM_EDGE: ActorKind = ActorKind::new("platform_edge", rgb(0x2f4858), 320.0, 24.0);
const TICKET_BOOTH: ActorKind = ActorKind::new("ticket_booth", rgb(0xffd166), 18.0, 16.0);
const MEMORY_SHARD: ActorKind = ActorKind::new("memory_shard", rgb(0x7df9ff), 5.0, 5.0);

const BOOTH_SPOT: Vec2 = Vec2::new(60.0, 60.0);
const EBOSHI_SPOT: Vec2 = Vec2::new(230.0, 110.0);
const EBOSHI_BOOTH_STOP: Vec2 = Vec2::new(82.0, 60.0);
const PLAYER_BOOTH_STOP: Vec2 = Vec2::new(100.0, 66.0);
const CECI_HUB_SPOT: Vec2 = Vec2::new(110.0, 110.0);
const SMUSH_HUB_SPOT: Vec2 = Vec2::new(210.0, 150.0);
const SHARDS: [(&str, Vec2); 3] = [
    ("memoryShard1", Vec2::new(30.0, 160.0)),
    ("memoryShard2", Vec2::new(295.0, 160.0)),
    ("memoryShard3", Vec2::new(295.0, 45.0)),
];

const DEPARTING: LatchKey = LatchKey::Scene("departing");
const TICKET_HINT: LatchKey = LatchKey::Scene("ticketHint");

#[derive(Default)]
struct HubWorld {
    player: Option<ActorHandle>,
}

/// The void between levels. Who is waiting here depends on how many levels
/// are done; the platform leads to the next one once a ticket is bought.
pub(crate) struct HubScene {
    director: Director<HubWorld>,
}

impl HubScene {
    pub(crate) fn new() -> Self {
        Self {
            director: Director::new("Game", HubWorld::default()).with_menus(TITLE),
        }
    }
}

struct HubCast {
    player: ActorHandle,
    eboshi: Option<ActorHandle>,
    ceci: Option<ActorHandle>,
    smush: Option<ActorHandle>,
    shards: Vec<(&'static str, Vec2, ActorHandle)>,
}

impl Scene for HubScene {
    fn load(&mut self, ctx: &mut SceneContext<'_>) {
        let level = ctx.registry.level();
        let needs_hint = !ctx.registry.flag(SHOW_HELP_HINT);
        let cast = self.director.with_cue(ctx, |cue| {
            let uncollected: Vec<(&'static str, Vec2)> = SHARDS
                .into_iter()
                .filter(|(flag, _)| !cue.registry().flag(flag))
                .collect();

            let stage = cue.stage_mut();
            stage.create_actor(PLATFORM_EDGE, Vec2::new(160.0, 12.0));
            stage.create_actor(TICKET_BOOTH, BOOTH_SPOT);
            let shards = uncollected
                .into_iter()
                .map(|(flag, spot)| (flag, spot, stage.create_actor(MEMORY_SHARD, spot)))
                .collect();
            let eboshi = (level == 0).then(|| stage.create_actor(EBOSHI, EBOSHI_SPOT));
            let ceci = (level >= 1).then(|| stage.create_actor(CECI, CECI_HUB_SPOT));
            let smush = (level >= 2).then(|| stage.create_actor(SMUSH, SMUSH_HUB_SPOT));
            let player = stage.create_actor(GRAYSON, HUB_SPAWN);
            cue.world_mut().player = Some(player);

            if needs_hint {
                cue.delay(HELP_HINT_DELAY_MS, |cue| {
                    if cue.latch(LatchKey::Progress(SHOW_HELP_HINT)) && !cue.dialogue().is_visible() {
                        cue.show_dialogue(["Press H for help, Esc to pause."]);
                    }
                    Ok(())
                });
            }
            if level >= FINAL_LEVEL {
                cue.run(
                    NarrativeSequence::new("hub_ending")
                        .wait(ENDING_DELAY_MS)
                        .dialogue([
                            "Grayson: I remember now. All of it.",
                            "Grayson: Thanks for bringing me home, everyone.",
                        ]),
                );
            }
            HubCast {
                player,
                eboshi,
                ceci,
                smush,
                shards,
            }
        });

        self.director.add_barrier(Barrier {
            label: "platform",
            region: PLATFORM_ZONE,
            requires: LatchKey::Progress(HAS_TICKET),
        });
        self.add_ticket_booth(cast.player);
        for (flag, spot, shard) in cast.shards {
            self.add_shard(cast.player, flag, spot, shard);
        }
        if let Some(eboshi) = cast.eboshi {
            self.add_eboshi(cast.player, eboshi);
        }
        if let Some(ceci) = cast.ceci {
            self.director.add_gated_action(GatedActionSpec::new(
                Anchor::Actor(cast.player),
                Anchor::Actor(ceci),
                HUB_INTERACT_RANGE,
                GrantTier::Repeatable(None),
                "Talk",
                |cue| {
                    cue.run(NarrativeSequence::new("ceci_talk").branch(
                        |cue| cue.registry().level() >= 2,
                        NarrativeSequence::new("ceci_later").dialogue([
                            "Ceci: Smush keeps sniffing toward the farmers market.",
                            "Ceci: Something about pies...",
                        ]),
                        NarrativeSequence::new("ceci_first").dialogue([
                            "Ceci: Next stop, the hockey game!",
                            "Ceci: Go Silvertips!",
                        ]),
                    ));
                },
            ));
        }
        if let Some(smush) = cast.smush {
            self.director.add_gated_action(GatedActionSpec::new(
                Anchor::Actor(cast.player),
                Anchor::Actor(smush),
                HUB_INTERACT_RANGE,
                GrantTier::Repeatable(None),
                "Pet",
                |cue| {
                    let line = if cue.registry().level() >= FINAL_LEVEL {
                        "Smush: *Purr...* (Thanks for sharing the pies.)"
                    } else {
                        "Smush: *Meow?*"
                    };
                    cue.show_dialogue([line]);
                },
            ));
        }
    }

    fn update(
        &mut self,
        dt_ms: u64,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand {
        self.director.update(dt_ms, input, ctx, |cue, input, dt_ms| {
            let Some(player) = cue.world().player else {
                return;
            };
            match walk(cue, player, input, dt_ms, HUB_SPEED) {
                Some(MoveOutcome::Moved(at)) if PLATFORM_ZONE.contains(at) => depart(cue),
                Some(MoveOutcome::Blocked { .. }) => {
                    if cue.latch(TICKET_HINT) {
                        cue.show_dialogue(["Grayson: I need a ticket before I can board."]);
                    }
                }
                _ => {}
            }
        })
    }

    fn unload(&mut self, ctx: &mut SceneContext<'_>) {
        self.director.teardown(ctx);
    }

    fn view(&self, registry: &ProgressRegistry) -> SceneView<'_> {
        self.director.view(registry, HUB_BACKDROP)
    }

    fn debug_title(&self, registry: &ProgressRegistry) -> Option<String> {
        Some(format!(
            "Game | level {} | shards {}/{} | ticket {}",
            registry.level(),
            registry.counter(MEMORY_SHARDS),
            SHARDS.len(),
            if registry.flag(HAS_TICKET) { "yes" } else { "no" }
        ))
    }
}

impl HubScene {
    fn add_ticket_booth(&mut self, player: ActorHandle) {
        self.director.add_gated_action(GatedActionSpec::new(
            Anchor::Actor(player),
            Anchor::Point(BOOTH_SPOT),
            HUB_INTERACT_RANGE,
            GrantTier::OneShot(LatchKey::Progress(HAS_TICKET)),
            "Buy ticket",
            |cue| {
                cue.spawn_effect(EffectKind::Pickup, BOOTH_SPOT);
                cue.show_dialogue(["You bought a ticket to the platform."]);
            },
        ));
    }

    fn add_shard(&mut self, player: ActorHandle, flag: &'static str, spot: Vec2, shard: ActorHandle) {
        self.director.add_gated_action(GatedActionSpec::new(
            Anchor::Actor(player),
            Anchor::Point(spot),
            HUB_INTERACT_RANGE,
            GrantTier::OneShot(LatchKey::Progress(flag)),
            "Pick up",
            move |cue| {
                cue.stage_mut().destroy(shard);
                cue.spawn_effect(EffectKind::Pickup, spot);
                let total = cue.registry_mut().increment_counter(MEMORY_SHARDS);
                info!(shard = flag, total, "memory_shard_collected");
            },
        ));
    }

    fn add_eboshi(&mut self, player: ActorHandle, eboshi: ActorHandle) {
        self.director.add_gated_action(GatedActionSpec::new(
            Anchor::Actor(player),
            Anchor::Actor(eboshi),
            HUB_INTERACT_RANGE,
            GrantTier::Repeatable(Some(LatchKey::Progress(MET_EBOSHI))),
            "Talk",
            move |cue| {
                if cue.is_latched(LatchKey::Progress(MET_EBOSHI)) {
                    cue.show_dialogue(["Eboshi: Ticket booth, then the platform up top. Go!"]);
                } else {
                    cue.run(eboshi_greeting(player, eboshi));
                }
            },
        ));
    }
}

fn eboshi_greeting(player: ActorHandle, eboshi: ActorHandle) -> NarrativeSequence<HubWorld> {
    NarrativeSequence::new("eboshi_greeting")
        .dialogue([
            "Eboshi: Grayson! You're finally awake.",
            "Eboshi: Your memories are scattered all over town.",
            "Eboshi: Catch me if you can! To the ticket booth!",
        ])
        .animate(eboshi, Motion::To(EBOSHI_BOOTH_STOP), 1200, Easing::QuadInOut)
        .animate(player, Motion::To(PLAYER_BOOTH_STOP), 800, Easing::QuadOut)
        .dialogue(["Eboshi: Buy a ticket here, then hop on at the platform."])
}

/// Boards the train to the next level. No-op once every level is done.
fn depart(cue: &mut Cue<'_, HubWorld>) {
    let Some(next) = level_scene(cue.registry().level() + 1) else {
        return;
    };
    if !cue.latch(DEPARTING) {
        return;
    }
    info!(next = %next, "hub_departure");
    cue.run(
        NarrativeSequence::new("platform_departure")
            .invoke(move |cue| {
                cue.fade_to(next, DEFAULT_FADE_MS);
            })
            .wait(DEFAULT_FADE_MS),
    );
}
