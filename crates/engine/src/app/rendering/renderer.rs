use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use tracing::debug;
use winit::window::Window;

use crate::app::scene::SceneView;
use crate::app::tools::{draw_console, CheatConsole};
use crate::narrative::{DialogueSession, Effect, EffectKind, MenuKind, Prompt};

use super::canvas::Canvas;
use super::font::{text_width, wrap_text, GLYPH_ADVANCE, LINE_ADVANCE};

pub const LOGICAL_WIDTH: u32 = 320;
pub const LOGICAL_HEIGHT: u32 = 180;

const EMPTY_BACKDROP: [u8; 4] = [12, 12, 16, 255];
const TEXT_COLOR: [u8; 4] = [236, 236, 236, 255];
const DIM_TEXT_COLOR: [u8; 4] = [150, 150, 160, 255];
const PANEL_COLOR: [u8; 4] = [16, 18, 28, 255];
const PANEL_BORDER_COLOR: [u8; 4] = [200, 200, 220, 255];
const PROMPT_COLOR: [u8; 4] = [255, 224, 120, 255];
const SPARKLE_COLOR: [u8; 4] = [255, 236, 140, 255];
const PICKUP_COLOR: [u8; 4] = [140, 255, 180, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

const DIALOGUE_MARGIN: i32 = 6;
const DIALOGUE_HEIGHT: i32 = 36;
const DIALOGUE_PADDING: i32 = 5;
const DIALOGUE_MAX_LINES: usize = 3;
const PROMPT_LIFT_PX: i32 = 16;
const SPARKLE_POINTS: [(f32, f32); 4] = [(-1.0, -0.6), (1.0, -0.4), (-0.5, 0.9), (0.7, 0.8)];
const SPARKLE_SPREAD_PX: f32 = 14.0;
const PICKUP_RISE_PX: f32 = 10.0;

const HELP_LINES: [&str; 7] = [
    "HELP",
    "ARROWS / WASD  MOVE",
    "ENTER / SPACE  CONFIRM",
    "E  INTERACT",
    "ESC  PAUSE",
    "H  HELP",
    "BACKSPACE  CLOSE",
];
const PAUSE_LINES: [&str; 3] = ["PAUSED", "ENTER  EXIT TO TITLE", "BACKSPACE  RESUME"];

/// Placeholder renderer: coloured boxes for actors, a bitmap font for
/// dialogue, prompts, menus and the console. Draws into a fixed logical
/// buffer that `pixels` scales to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self { window, pixels })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width.max(1), height.max(1), window);
        Pixels::new(LOGICAL_WIDTH, LOGICAL_HEIGHT, surface)
    }

    pub(crate) fn render(
        &mut self,
        scene: Option<SceneView<'_>>,
        dialogue: &DialogueSession,
        console: Option<&CheatConsole>,
    ) -> Result<(), Error> {
        let mut canvas = Canvas::new(self.pixels.frame_mut(), LOGICAL_WIDTH, LOGICAL_HEIGHT);
        draw_frame(&mut canvas, scene, dialogue, console);
        self.pixels.render()
    }
}

pub(crate) fn draw_frame(
    canvas: &mut Canvas<'_>,
    scene: Option<SceneView<'_>>,
    dialogue: &DialogueSession,
    console: Option<&CheatConsole>,
) {
    match scene {
        Some(view) => {
            canvas.clear(view.backdrop);
            draw_actors(canvas, &view);
            draw_effects(canvas, view.effects);
            if let Some(prompt) = view.prompt {
                draw_prompt(canvas, prompt);
            }
        }
        None => canvas.clear(EMPTY_BACKDROP),
    }
    draw_dialogue(canvas, dialogue);
    if let Some(menu) = scene.and_then(|view| view.menu) {
        draw_menu(canvas, menu);
    }
    if let Some(console) = console {
        draw_console(canvas, console);
    }
}

fn draw_actors(canvas: &mut Canvas<'_>, view: &SceneView<'_>) {
    for actor in view.stage.actors().iter().filter(|actor| actor.visible) {
        let bounds = actor.bounds();
        let x = bounds.min.x.round() as i32;
        let y = bounds.min.y.round() as i32;
        let w = (bounds.max.x - bounds.min.x).round().max(1.0) as i32;
        let h = (bounds.max.y - bounds.min.y).round().max(1.0) as i32;
        canvas.fill_rect(x, y, w, h, actor.kind.color);
    }
}

fn draw_effects(canvas: &mut Canvas<'_>, effects: &[Effect]) {
    let width = canvas.width() as i32;
    let height = canvas.height() as i32;
    for effect in effects {
        let progress = effect.progress().clamp(0.0, 1.0);
        let cx = effect.position.x.round() as i32;
        let cy = effect.position.y.round() as i32;
        match effect.kind {
            EffectKind::Flash => canvas.blend_rect(0, 0, width, height, WHITE, 1.0 - progress),
            EffectKind::FadeOut => canvas.blend_rect(0, 0, width, height, BLACK, progress),
            EffectKind::Sparkles => {
                let spread = SPARKLE_SPREAD_PX * (0.3 + progress);
                for (dx, dy) in SPARKLE_POINTS {
                    let px = cx + (dx * spread).round() as i32;
                    let py = cy + (dy * spread).round() as i32;
                    canvas.cross(px, py, 2, SPARKLE_COLOR);
                }
            }
            EffectKind::Pickup => {
                let rise = (PICKUP_RISE_PX * progress).round() as i32;
                canvas.outline_rect(cx - 4, cy - 4 - rise, 9, 9, PICKUP_COLOR);
            }
        }
    }
}

fn draw_prompt(canvas: &mut Canvas<'_>, prompt: Prompt) {
    let text = format!("[E] {}", prompt.text);
    let width = text_width(&text);
    let x = (prompt.anchor.x.round() as i32 - width / 2)
        .clamp(1, (canvas.width() as i32 - width - 1).max(1));
    let y = (prompt.anchor.y.round() as i32 - PROMPT_LIFT_PX).max(1);
    canvas.fill_rect(x - 2, y - 2, width + 3, LINE_ADVANCE + 2, PANEL_COLOR);
    canvas.text(x, y, &text, PROMPT_COLOR);
}

fn draw_dialogue(canvas: &mut Canvas<'_>, dialogue: &DialogueSession) {
    let Some(line) = dialogue.current_line() else {
        return;
    };
    let x = DIALOGUE_MARGIN;
    let y = canvas.height() as i32 - DIALOGUE_HEIGHT - DIALOGUE_MARGIN;
    let w = canvas.width() as i32 - DIALOGUE_MARGIN * 2;
    canvas.fill_rect(x, y, w, DIALOGUE_HEIGHT, PANEL_COLOR);
    canvas.outline_rect(x, y, w, DIALOGUE_HEIGHT, PANEL_BORDER_COLOR);

    let max_chars = ((w - DIALOGUE_PADDING * 2) / GLYPH_ADVANCE).max(1) as usize;
    let mut text_y = y + DIALOGUE_PADDING;
    for wrapped in dialogue_rows(line, max_chars) {
        canvas.text(x + DIALOGUE_PADDING, text_y, &wrapped, TEXT_COLOR);
        text_y += LINE_ADVANCE;
    }

    let position = format!(
        "{}/{}",
        dialogue.line_index().map_or(0, |index| index + 1),
        dialogue.line_count()
    );
    canvas.text(
        x + w - DIALOGUE_PADDING - text_width(&position),
        y + DIALOGUE_HEIGHT - DIALOGUE_PADDING - LINE_ADVANCE + 2,
        &position,
        DIM_TEXT_COLOR,
    );
}

/// Wraps one dialogue line to the box width, keeping at most
/// `DIALOGUE_MAX_LINES` rows.
fn dialogue_rows(line: &str, max_chars: usize) -> Vec<String> {
    let mut rows = wrap_text(line, max_chars);
    if rows.len() > DIALOGUE_MAX_LINES {
        debug!(
            wrapped_rows = rows.len(),
            shown_rows = DIALOGUE_MAX_LINES,
            max_chars,
            "dialogue_line_truncated"
        );
        rows.truncate(DIALOGUE_MAX_LINES);
    }
    rows
}

fn draw_menu(canvas: &mut Canvas<'_>, menu: MenuKind) {
    let lines: &[&str] = match menu {
        MenuKind::Pause => &PAUSE_LINES,
        MenuKind::Help => &HELP_LINES,
    };
    let width = canvas.width() as i32;
    let height = canvas.height() as i32;
    canvas.blend_rect(0, 0, width, height, BLACK, 0.6);

    let panel_w = lines.iter().map(|line| text_width(line)).max().unwrap_or(0) + 16;
    let panel_h = lines.len() as i32 * LINE_ADVANCE + 12;
    let panel_x = (width - panel_w) / 2;
    let panel_y = (height - panel_h) / 2;
    canvas.fill_rect(panel_x, panel_y, panel_w, panel_h, PANEL_COLOR);
    canvas.outline_rect(panel_x, panel_y, panel_w, panel_h, PANEL_BORDER_COLOR);
    for (index, line) in lines.iter().enumerate() {
        let color = if index == 0 { PROMPT_COLOR } else { TEXT_COLOR };
        canvas.text(
            panel_x + 8,
            panel_y + 6 + index as i32 * LINE_ADVANCE,
            line,
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::{ActorKind, ActorStage, Vec2};

    const BACKDROP: [u8; 4] = [10, 20, 30, 255];
    const RED: ActorKind = ActorKind::new("red", [255, 0, 0, 255], 10.0, 10.0);

    fn frame() -> Vec<u8> {
        vec![0u8; (LOGICAL_WIDTH * LOGICAL_HEIGHT * 4) as usize]
    }

    fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * LOGICAL_WIDTH + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    fn view<'a>(stage: &'a ActorStage, effects: &'a [Effect], menu: Option<MenuKind>) -> SceneView<'a> {
        SceneView {
            stage,
            effects,
            prompt: None,
            menu,
            backdrop: BACKDROP,
        }
    }

    #[test]
    fn visible_actors_are_drawn_and_hidden_ones_are_not() {
        let mut stage = ActorStage::default();
        stage.create_actor(RED, Vec2::new(50.0, 50.0));
        let hidden = stage.create_actor(RED, Vec2::new(100.0, 50.0));
        stage.set_visible(hidden, false);
        let dialogue = DialogueSession::new();
        let mut buffer = frame();
        let mut canvas = Canvas::new(&mut buffer, LOGICAL_WIDTH, LOGICAL_HEIGHT);
        draw_frame(&mut canvas, Some(view(&stage, &[], None)), &dialogue, None);
        assert_eq!(pixel(&buffer, 50, 50), [255, 0, 0, 255]);
        assert_eq!(pixel(&buffer, 100, 50), BACKDROP);
    }

    #[test]
    fn dialogue_box_covers_the_bottom_of_the_frame() {
        let stage = ActorStage::default();
        let mut dialogue = DialogueSession::new();
        let mut buffer = frame();
        {
            let mut canvas = Canvas::new(&mut buffer, LOGICAL_WIDTH, LOGICAL_HEIGHT);
            draw_frame(&mut canvas, Some(view(&stage, &[], None)), &dialogue, None);
        }
        let bottom_y = LOGICAL_HEIGHT - DIALOGUE_MARGIN as u32 - 2;
        assert_eq!(pixel(&buffer, 160, bottom_y), BACKDROP);

        dialogue.show(["Hello there"]);
        let mut canvas = Canvas::new(&mut buffer, LOGICAL_WIDTH, LOGICAL_HEIGHT);
        draw_frame(&mut canvas, Some(view(&stage, &[], None)), &dialogue, None);
        assert_eq!(pixel(&buffer, 160, bottom_y), PANEL_COLOR);
    }

    #[test]
    fn long_dialogue_lines_keep_only_the_rows_that_fit() {
        let short = dialogue_rows("one two", 10);
        assert_eq!(short, vec!["one two".to_string()]);

        let long = dialogue_rows("aa bb cc dd ee ff", 2);
        assert_eq!(long.len(), DIALOGUE_MAX_LINES);
        assert_eq!(long, vec!["aa", "bb", "cc"]);
    }

    #[test]
    fn finished_fade_covers_the_scene_in_black() {
        let mut stage = ActorStage::default();
        stage.create_actor(RED, Vec2::new(50.0, 50.0));
        let effects = [Effect {
            kind: EffectKind::FadeOut,
            position: Vec2::ZERO,
            ttl_ms: 0,
            duration_ms: 1000,
        }];
        let dialogue = DialogueSession::new();
        let mut buffer = frame();
        let mut canvas = Canvas::new(&mut buffer, LOGICAL_WIDTH, LOGICAL_HEIGHT);
        draw_frame(&mut canvas, Some(view(&stage, &effects, None)), &dialogue, None);
        assert_eq!(pixel(&buffer, 50, 50), [0, 0, 0, 255]);
    }

    #[test]
    fn menu_dims_the_scene() {
        let stage = ActorStage::default();
        let dialogue = DialogueSession::new();
        let mut buffer = frame();
        let mut canvas = Canvas::new(&mut buffer, LOGICAL_WIDTH, LOGICAL_HEIGHT);
        draw_frame(
            &mut canvas,
            Some(view(&stage, &[], Some(MenuKind::Pause))),
            &dialogue,
            None,
        );
        let corner = pixel(&buffer, 0, 0);
        assert!(corner[2] < BACKDROP[2]);
    }

    #[test]
    fn no_scene_clears_to_the_empty_backdrop() {
        let dialogue = DialogueSession::new();
        let mut buffer = frame();
        let mut canvas = Canvas::new(&mut buffer, LOGICAL_WIDTH, LOGICAL_HEIGHT);
        draw_frame(&mut canvas, None, &dialogue, None);
        assert_eq!(pixel(&buffer, 0, 0), EMPTY_BACKDROP);
    }
}
