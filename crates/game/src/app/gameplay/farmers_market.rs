const MARKET_BACKDROP: [u8; 4] = rgb(0xbfdbfe);
const MARKET_CENTER: Vec2 = Vec2::new(160.0, 90.0);

const GRAYSON_RACER: ActorKind = ActorKind::new("grayson", rgb(0xa7c7ff), 8.0, 8.0);
const SMUSH_RACER: ActorKind = ActorKind::new("smush", rgb(0x9e9e9e), 8.0, 8.0);
const PIE: ActorKind = ActorKind::new("pie", rgb(0xfef08a), 4.0, 4.0);
const PLAYFIELD: ActorKind = ActorKind::new("playfield", [0, 0, 0, 255], 310.0, 170.0);
const TUNNEL: ActorKind = ActorKind::new("tunnel", [0, 0, 0, 255], 30.0, 15.0);

const GRAYSON_SPEED: f32 = 100.0;
const SMUSH_SPEED: f32 = 95.0;
const RACER_HALF: Vec2 = Vec2::new(3.0, 3.0);
const GRAYSON_ENTRY: Vec2 = Vec2::new(160.0, 220.0);
const SMUSH_ENTRY: Vec2 = Vec2::new(160.0, -30.0);
const GRAYSON_START_Y: f32 = 145.0;
const SMUSH_START_Y: f32 = 35.0;
const ENTRANCE_DELAY_MS: u64 = 300;
const ENTRANCE_MS: u64 = 2000;
const ENTRANCE_LINE_MS: u64 = 800;

const PIE_SPACING: usize = 10;
const PIE_REACH: f32 = 12.0;
const PIE_HALF: Vec2 = Vec2::new(2.0, 2.0);

const TUNNEL_CENTER_X: f32 = 160.0;
const TUNNEL_HALF_WIDTH: f32 = 15.0;
const TUNNEL_TOP_Y: f32 = 10.0;
const TUNNEL_BOTTOM_Y: f32 = 170.0;

const MARKET_OUTCOME: LatchKey = LatchKey::Scene("marketOutcome");

struct MarketWall {
    rect: Rect,
    color: [u8; 4],
}

const fn wall(x: f32, y: f32, width: f32, height: f32, color: u32) -> MarketWall {
    MarketWall {
        rect: Rect::from_origin_size(x, y, width, height),
        color: rgb(color),
    }
}

/// Outer border with gaps for the two tunnels, then the stall blocks.
const MARKET_WALLS: [MarketWall; 19] = [
    wall(5.0, 5.0, 140.0, 4.0, 0xc4b5fd),
    wall(175.0, 5.0, 140.0, 4.0, 0xc4b5fd),
    wall(5.0, 171.0, 140.0, 4.0, 0xc4b5fd),
    wall(175.0, 171.0, 140.0, 4.0, 0xc4b5fd),
    wall(5.0, 5.0, 4.0, 170.0, 0xc4b5fd),
    wall(311.0, 5.0, 4.0, 170.0, 0xc4b5fd),
    wall(22.0, 22.0, 56.0, 26.0, 0xfda4af),
    wall(242.0, 22.0, 56.0, 26.0, 0xfda4af),
    wall(92.0, 22.0, 56.0, 26.0, 0xbfdbfe),
    wall(172.0, 22.0, 56.0, 26.0, 0xbfdbfe),
    wall(22.0, 62.0, 46.0, 26.0, 0xfed7aa),
    wall(252.0, 62.0, 46.0, 26.0, 0xfed7aa),
    wall(112.0, 62.0, 98.0, 56.0, 0xa7f3d0),
    wall(22.0, 102.0, 46.0, 56.0, 0xddd6fe),
    wall(252.0, 102.0, 46.0, 56.0, 0xddd6fe),
    wall(82.0, 132.0, 66.0, 26.0, 0xfef08a),
    wall(172.0, 132.0, 66.0, 26.0, 0xfef08a),
    wall(82.0, 62.0, 17.0, 96.0, 0xfef08a),
    wall(221.0, 62.0, 17.0, 96.0, 0xfef08a),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Racer {
    Grayson,
    Smush,
}

#[derive(Clone, Copy)]
struct Pie {
    spot: Vec2,
    actor: ActorHandle,
    eaten: bool,
}

#[derive(Default)]
struct MarketWorld {
    grayson: Option<ActorHandle>,
    smush: Option<ActorHandle>,
    pies: Vec<Pie>,
    needed: u32,
    grayson_pies: u32,
    smush_pies: u32,
    entrance_done: bool,
}

/// Level 3: a pie race through the market maze against Smush.
pub(crate) struct FarmersMarketScene {
    director: Director<MarketWorld>,
}

impl FarmersMarketScene {
    pub(crate) fn new() -> Self {
        Self {
            director: Director::new("FarmersMarket", MarketWorld::default()).with_menus(TITLE),
        }
    }
}

impl Scene for FarmersMarketScene {
    fn load(&mut self, ctx: &mut SceneContext<'_>) {
        self.director.with_cue(ctx, |cue| {
            let stage = cue.stage_mut();
            stage.create_actor(PLAYFIELD, MARKET_CENTER);
            stage.create_actor(TUNNEL, Vec2::new(TUNNEL_CENTER_X, 7.5));
            stage.create_actor(TUNNEL, Vec2::new(TUNNEL_CENTER_X, 172.5));
            for wall in &MARKET_WALLS {
                let size = Vec2::new(wall.rect.max.x - wall.rect.min.x, wall.rect.max.y - wall.rect.min.y);
                stage.create_actor(
                    ActorKind::new("market_wall", wall.color, size.x, size.y),
                    Vec2::new(wall.rect.min.x + size.x * 0.5, wall.rect.min.y + size.y * 0.5),
                );
            }
            let pies: Vec<Pie> = pie_spots()
                .into_iter()
                .map(|spot| Pie {
                    spot,
                    actor: stage.create_actor(PIE, spot),
                    eaten: false,
                })
                .collect();
            let grayson = stage.create_actor(GRAYSON_RACER, GRAYSON_ENTRY);
            let smush = stage.create_actor(SMUSH_RACER, SMUSH_ENTRY);

            let world = cue.world_mut();
            world.needed = pies_needed(pies.len());
            info!(total = pies.len(), needed = world.needed, "market_pies_spawned");
            world.pies = pies;
            world.grayson = Some(grayson);
            world.smush = Some(smush);

            cue.run(market_entrance(grayson, smush));
        });
    }

    fn update(
        &mut self,
        dt_ms: u64,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_>,
    ) -> SceneCommand {
        self.director.update(dt_ms, input, ctx, |cue, input, dt_ms| {
            let (Some(grayson), Some(smush)) = (cue.world().grayson, cue.world().smush) else {
                return;
            };
            if !cue.world().entrance_done || cue.is_latched(MARKET_OUTCOME) {
                return;
            }

            if let Some(from) = cue.stage().position(grayson) {
                let direction = input_direction(input);
                let step = travel(GRAYSON_SPEED, dt_ms);
                let to = wrap_tunnel(slide(from, Vec2::new(direction.x * step, direction.y * step)));
                cue.stage_mut().set_position(grayson, to);
            }

            if let Some(from) = cue.stage().position(smush) {
                if let Some(target) = nearest_pie(&cue.world().pies, from) {
                    let distance = from.distance(target);
                    if distance > 0.0 {
                        let step = travel(SMUSH_SPEED, dt_ms);
                        let delta = Vec2::new(
                            (target.x - from.x) / distance * step,
                            (target.y - from.y) / distance * step,
                        );
                        cue.stage_mut().set_position(smush, wrap_tunnel(slide(from, delta)));
                    }
                }
            }

            if let Some(winner) = collect_pies(cue, grayson, smush) {
                finish_race(cue, winner);
            }
        })
    }

    fn unload(&mut self, ctx: &mut SceneContext<'_>) {
        self.director.teardown(ctx);
    }

    fn view(&self, registry: &ProgressRegistry) -> SceneView<'_> {
        self.director.view(registry, MARKET_BACKDROP)
    }

    fn debug_title(&self, _registry: &ProgressRegistry) -> Option<String> {
        let world = self.director.world();
        Some(format!(
            "FarmersMarket | Grayson {}/{} | Smush {}/{}",
            world.grayson_pies, world.needed, world.smush_pies, world.needed
        ))
    }
}

/// Both racers walk in through their tunnels; play starts once both arrive.
fn market_entrance(grayson: ActorHandle, smush: ActorHandle) -> NarrativeSequence<MarketWorld> {
    NarrativeSequence::new("market_entrance")
        .wait(ENTRANCE_DELAY_MS)
        .invoke(move |cue| {
            cue.animate(grayson, Motion::ToY(GRAYSON_START_Y), ENTRANCE_MS, Easing::Linear);
            cue.animate(smush, Motion::ToY(SMUSH_START_Y), ENTRANCE_MS, Easing::Linear);
        })
        .wait(ENTRANCE_LINE_MS)
        .invoke(|cue| {
            cue.show_dialogue(["Grayson: Smush! These are MY pies!"]);
        })
        .wait_until(move |cue| !cue.is_animating(grayson) && !cue.is_animating(smush))
        .invoke(|cue: &mut Cue<'_, MarketWorld>| {
            cue.world_mut().entrance_done = true;
            debug!("market_entrance_done");
        })
}

fn pie_spots() -> Vec<Vec2> {
    let mut spots = Vec::new();
    for x in (15..310).step_by(PIE_SPACING) {
        for y in (15..170).step_by(PIE_SPACING) {
            let spot = Vec2::new(x as f32, y as f32);
            let footprint = Rect::centered(spot, PIE_HALF);
            if !MARKET_WALLS.iter().any(|wall| wall.rect.intersects(&footprint)) {
                spots.push(spot);
            }
        }
    }
    spots
}

/// 60% of the pies, rounded up.
fn pies_needed(total: usize) -> u32 {
    (total as u32 * 3).div_ceil(5)
}

fn hits_wall(center: Vec2) -> bool {
    let hitbox = Rect::centered(center, RACER_HALF);
    MARKET_WALLS.iter().any(|wall| wall.rect.intersects(&hitbox))
}

/// Moves one axis at a time so racers slide along walls instead of sticking.
fn slide(from: Vec2, delta: Vec2) -> Vec2 {
    let mut at = from;
    let along_x = Vec2::new(at.x + delta.x, at.y);
    if !hits_wall(along_x) {
        at = along_x;
    }
    let along_y = Vec2::new(at.x, at.y + delta.y);
    if !hits_wall(along_y) {
        at = along_y;
    }
    clamp_inside(at, PLAY_AREA, RACER_HALF)
}

fn wrap_tunnel(at: Vec2) -> Vec2 {
    if (at.x - TUNNEL_CENTER_X).abs() >= TUNNEL_HALF_WIDTH {
        return at;
    }
    if at.y < TUNNEL_TOP_Y {
        Vec2::new(at.x, TUNNEL_BOTTOM_Y)
    } else if at.y > TUNNEL_BOTTOM_Y {
        Vec2::new(at.x, TUNNEL_TOP_Y)
    } else {
        at
    }
}

fn nearest_pie(pies: &[Pie], from: Vec2) -> Option<Vec2> {
    pies.iter()
        .filter(|pie| !pie.eaten)
        .map(|pie| pie.spot)
        .min_by(|a, b| from.distance(*a).total_cmp(&from.distance(*b)))
}

/// Grayson gets first pick of a pie both can reach. Returns the winner once
/// either side reaches the target, or Smush when the pies run out first.
fn collect_pies(cue: &mut Cue<'_, MarketWorld>, grayson: ActorHandle, smush: ActorHandle) -> Option<Racer> {
    let (Some(grayson_at), Some(smush_at)) = (cue.stage().position(grayson), cue.stage().position(smush)) else {
        return None;
    };
    for index in 0..cue.world().pies.len() {
        let Pie { spot, actor, eaten } = cue.world().pies[index];
        if eaten {
            continue;
        }
        let racer = if grayson_at.distance(spot) < PIE_REACH {
            Racer::Grayson
        } else if smush_at.distance(spot) < PIE_REACH {
            Racer::Smush
        } else {
            continue;
        };
        cue.world_mut().pies[index].eaten = true;
        let world = cue.world_mut();
        let score = match racer {
            Racer::Grayson => {
                world.grayson_pies += 1;
                world.grayson_pies
            }
            Racer::Smush => {
                world.smush_pies += 1;
                world.smush_pies
            }
        };
        let needed = world.needed;
        match racer {
            Racer::Grayson => cue.stage_mut().set_visible(actor, false),
            Racer::Smush => cue.stage_mut().destroy(actor),
        };
        if score >= needed {
            return Some(racer);
        }
    }
    cue.world()
        .pies
        .iter()
        .all(|pie| pie.eaten)
        .then_some(Racer::Smush)
}

fn finish_race(cue: &mut Cue<'_, MarketWorld>, winner: Racer) {
    if !cue.latch(MARKET_OUTCOME) {
        return;
    }
    let world = cue.world();
    info!(
        winner = ?winner,
        grayson = world.grayson_pies,
        smush = world.smush_pies,
        needed = world.needed,
        "market_race_decided"
    );
    let finale = match winner {
        Racer::Grayson => NarrativeSequence::new("grayson_wins")
            .invoke(|cue| {
                cue.show_dialogue(["Grayson: Got my pies! The memory is coming back..."]);
            })
            .wait(2000)
            .invoke(|cue| {
                cue.stage_mut().create_actor(CARD_PIECE, MARKET_CENTER);
                cue.spawn_effect(EffectKind::Sparkles, MARKET_CENTER);
            })
            .wait(3000)
            .invoke(|cue| {
                cue.registry_mut().advance_level(FINAL_LEVEL);
                cue.fade_to(HUB, DEFAULT_FADE_MS);
            })
            .wait(DEFAULT_FADE_MS),
        Racer::Smush => NarrativeSequence::new("smush_wins")
            .invoke(|cue| {
                cue.show_dialogue([
                    "Smush: *Meow meow!* (I win!)",
                    "Grayson: Okay okay, let's try again...",
                ]);
            })
            .wait(3000)
            .invoke(|cue| cue.restart_scene()),
    };
    cue.run(finale);
}
