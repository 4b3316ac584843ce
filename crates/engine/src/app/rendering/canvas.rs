use super::font::{glyph_or_fallback, GLYPH_ADVANCE, GLYPH_WIDTH};

/// RGBA8 frame buffer with clipped drawing helpers. Every write outside the
/// buffer is dropped.
pub(crate) struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    pub(crate) fn write_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        let Some(byte_offset) = self.byte_offset(x, y) else {
            return;
        };
        self.frame[byte_offset..byte_offset + 4].copy_from_slice(&color);
    }

    /// Source-over blend of `color` scaled by `alpha` (0.0..=1.0).
    pub(crate) fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4], alpha: f32) {
        let Some(byte_offset) = self.byte_offset(x, y) else {
            return;
        };
        let alpha = alpha.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
        for channel in 0..3 {
            let dst = self.frame[byte_offset + channel] as f32;
            let src = color[channel] as f32;
            self.frame[byte_offset + channel] = (dst + (src - dst) * alpha).round() as u8;
        }
        self.frame[byte_offset + 3] = 255;
    }

    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        let (start_x, start_y, end_x, end_y) = self.clip(x, y, w, h);
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.write_pixel(px, py, color);
            }
        }
    }

    pub(crate) fn blend_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4], alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let (start_x, start_y, end_x, end_y) = self.clip(x, y, w, h);
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.blend_pixel(px, py, color, alpha);
            }
        }
    }

    pub(crate) fn outline_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        if w <= 1 || h <= 1 {
            return;
        }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }

    pub(crate) fn cross(&mut self, cx: i32, cy: i32, half_size: i32, color: [u8; 4]) {
        for x in (cx - half_size)..=(cx + half_size) {
            self.write_pixel(x, cy, color);
        }
        for y in (cy - half_size)..=(cy + half_size) {
            self.write_pixel(cx, y, color);
        }
    }

    /// Draws `text` with its top-left corner at (`x`, `y`).
    pub(crate) fn text(&mut self, x: i32, y: i32, text: &str, color: [u8; 4]) {
        let mut pen_x = x;
        for ch in text.chars() {
            let glyph = glyph_or_fallback(ch);
            for (row_index, row_bits) in glyph.rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if row_bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                        self.write_pixel(pen_x + col, y + row_index as i32, color);
                    }
                }
            }
            pen_x += GLYPH_ADVANCE;
        }
    }

    fn clip(&self, x: i32, y: i32, w: i32, h: i32) -> (i32, i32, i32, i32) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(w).min(self.width as i32);
        let end_y = y.saturating_add(h).min(self.height as i32);
        (start_x, start_y, end_x.max(start_x), end_y.max(start_y))
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let pixel_offset = (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)?;
        let byte_offset = pixel_offset.checked_mul(4)?;
        if byte_offset.checked_add(4)? > self.frame.len() {
            return None;
        }
        Some(byte_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(frame: &[u8], width: u32, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * width as usize + x) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn out_of_bounds_writes_are_dropped() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut frame, 4, 4);
        canvas.fill_rect(-10, -10, 100, 2, [9, 9, 9, 255]);
        canvas.cross(-1, 8, 3, [1, 1, 1, 255]);
        canvas.text(2, 2, "WWW", [5, 5, 5, 255]);
        assert_eq!(pixel(&frame, 4, 3, 0), [9, 9, 9, 255]);
        assert_eq!(pixel(&frame, 4, 0, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn tiny_frames_never_panic() {
        let mut frame = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut frame, 1, 1);
        canvas.outline_rect(0, 0, 5, 5, [1, 2, 3, 255]);
        canvas.blend_rect(0, 0, 1, 1, [255, 255, 255, 255], 0.5);
        canvas.text(0, 0, "hello", [255, 255, 255, 255]);
        let mut empty: Vec<u8> = Vec::new();
        Canvas::new(&mut empty, 0, 0).clear([1, 1, 1, 1]);
    }

    #[test]
    fn blend_mixes_towards_source() {
        let mut frame = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut frame, 1, 1);
        canvas.clear([0, 0, 0, 255]);
        canvas.blend_pixel(0, 0, [200, 100, 0, 255], 0.5);
        assert_eq!(pixel(&frame, 1, 0, 0), [100, 50, 0, 255]);
    }
}
