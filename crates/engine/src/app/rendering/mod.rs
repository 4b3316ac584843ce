mod canvas;
mod font;
mod renderer;

pub(crate) use canvas::Canvas;
pub(crate) use font::{wrap_text, GLYPH_ADVANCE, LINE_ADVANCE};
pub use renderer::{Renderer, LOGICAL_HEIGHT, LOGICAL_WIDTH};
