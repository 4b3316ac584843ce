const PLAY_AREA: Rect = Rect::from_origin_size(0.0, 0.0, 320.0, 180.0);

const fn rgb(hex: u32) -> [u8; 4] {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255]
}

const GRAYSON: ActorKind = ActorKind::new("grayson", rgb(0xa7c7ff), 10.0, 12.0);
const GIRL: ActorKind = ActorKind::new("girl", rgb(0xff66ff), 10.0, 12.0);
const EBOSHI: ActorKind = ActorKind::new("eboshi", rgb(0xf4a261), 10.0, 12.0);
const CECI: ActorKind = ActorKind::new("ceci", rgb(0xff66ff), 10.0, 12.0);
const SMUSH: ActorKind = ActorKind::new("smush", rgb(0x9e9e9e), 10.0, 8.0);
const CARD_PIECE: ActorKind = ActorKind::new("card_piece", rgb(0xfff4d6), 8.0, 11.0);

/// Unit direction from held input; diagonals are normalized.
fn input_direction(input: &InputSnapshot) -> Vec2 {
    let (x, y) = input.movement_axis();
    let length = (x * x + y * y).sqrt();
    if length == 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(x / length, y / length)
}

fn travel(speed: f32, dt_ms: u64) -> f32 {
    speed * dt_ms as f32 / 1000.0
}

/// Keeps an actor of `half_extent` fully inside `area`.
fn clamp_inside(point: Vec2, area: Rect, half_extent: Vec2) -> Vec2 {
    Vec2::new(
        point
            .x
            .clamp(area.min.x + half_extent.x, area.max.x - half_extent.x),
        point
            .y
            .clamp(area.min.y + half_extent.y, area.max.y - half_extent.y),
    )
}

fn actor_bounds<W: 'static>(cue: &Cue<'_, W>, actor: ActorHandle) -> Option<Rect> {
    cue.stage().find(actor).map(|found| found.bounds())
}

/// Walks `actor` along the held direction, clamped to the play area and
/// checked against the scene's barriers. `None` when nothing is held.
fn walk<W: 'static>(
    cue: &mut Cue<'_, W>,
    actor: ActorHandle,
    input: &InputSnapshot,
    dt_ms: u64,
    speed: f32,
) -> Option<MoveOutcome> {
    let direction = input_direction(input);
    if direction == Vec2::ZERO {
        return None;
    }
    let Some((from, half_extent)) = cue
        .stage()
        .find(actor)
        .map(|found| (found.position, found.kind.half_extent))
    else {
        return Some(MoveOutcome::Missing);
    };
    let step = travel(speed, dt_ms);
    let to = clamp_inside(
        from.offset(direction.x * step, direction.y * step),
        PLAY_AREA,
        half_extent,
    );
    Some(cue.try_move(actor, to))
}
