//! 3x5 bitmap font. Lowercase letters render as uppercase; anything without
//! a glyph falls back to `?`.

pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;
pub(crate) const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;
pub(crate) const LINE_ADVANCE: i32 = GLYPH_HEIGHT + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Glyph {
    pub(crate) rows: [u8; GLYPH_HEIGHT as usize],
}

const fn g(rows: [u8; 5]) -> Glyph {
    Glyph { rows }
}

const SPACE: Glyph = g([0, 0, 0, 0, 0]);
const FALLBACK: Glyph = g([0b110, 0b001, 0b010, 0b000, 0b010]);

pub(crate) fn glyph_for(ch: char) -> Option<Glyph> {
    let glyph = match ch.to_ascii_uppercase() {
        ' ' => SPACE,
        'A' => g([0b010, 0b101, 0b111, 0b101, 0b101]),
        'B' => g([0b110, 0b101, 0b110, 0b101, 0b110]),
        'C' => g([0b011, 0b100, 0b100, 0b100, 0b011]),
        'D' => g([0b110, 0b101, 0b101, 0b101, 0b110]),
        'E' => g([0b111, 0b100, 0b110, 0b100, 0b111]),
        'F' => g([0b111, 0b100, 0b110, 0b100, 0b100]),
        'G' => g([0b011, 0b100, 0b101, 0b101, 0b011]),
        'H' => g([0b101, 0b101, 0b111, 0b101, 0b101]),
        'I' => g([0b111, 0b010, 0b010, 0b010, 0b111]),
        'J' => g([0b001, 0b001, 0b001, 0b101, 0b010]),
        'K' => g([0b101, 0b101, 0b110, 0b101, 0b101]),
        'L' => g([0b100, 0b100, 0b100, 0b100, 0b111]),
        'M' => g([0b101, 0b111, 0b111, 0b101, 0b101]),
        'N' => g([0b110, 0b101, 0b101, 0b101, 0b101]),
        'O' => g([0b010, 0b101, 0b101, 0b101, 0b010]),
        'P' => g([0b110, 0b101, 0b110, 0b100, 0b100]),
        'Q' => g([0b010, 0b101, 0b101, 0b110, 0b011]),
        'R' => g([0b110, 0b101, 0b110, 0b101, 0b101]),
        'S' => g([0b011, 0b100, 0b010, 0b001, 0b110]),
        'T' => g([0b111, 0b010, 0b010, 0b010, 0b010]),
        'U' => g([0b101, 0b101, 0b101, 0b101, 0b111]),
        'V' => g([0b101, 0b101, 0b101, 0b101, 0b010]),
        'W' => g([0b101, 0b101, 0b111, 0b111, 0b101]),
        'X' => g([0b101, 0b101, 0b010, 0b101, 0b101]),
        'Y' => g([0b101, 0b101, 0b010, 0b010, 0b010]),
        'Z' => g([0b111, 0b001, 0b010, 0b100, 0b111]),
        '0' => g([0b111, 0b101, 0b101, 0b101, 0b111]),
        '1' => g([0b010, 0b110, 0b010, 0b010, 0b111]),
        '2' => g([0b110, 0b001, 0b010, 0b100, 0b111]),
        '3' => g([0b110, 0b001, 0b010, 0b001, 0b110]),
        '4' => g([0b101, 0b101, 0b111, 0b001, 0b001]),
        '5' => g([0b111, 0b100, 0b110, 0b001, 0b110]),
        '6' => g([0b011, 0b100, 0b111, 0b101, 0b111]),
        '7' => g([0b111, 0b001, 0b010, 0b010, 0b010]),
        '8' => g([0b111, 0b101, 0b111, 0b101, 0b111]),
        '9' => g([0b111, 0b101, 0b111, 0b001, 0b110]),
        '.' => g([0b000, 0b000, 0b000, 0b000, 0b010]),
        ',' => g([0b000, 0b000, 0b000, 0b010, 0b100]),
        '!' => g([0b010, 0b010, 0b010, 0b000, 0b010]),
        '?' => FALLBACK,
        '\'' => g([0b010, 0b010, 0b000, 0b000, 0b000]),
        '"' => g([0b101, 0b101, 0b000, 0b000, 0b000]),
        ':' => g([0b000, 0b010, 0b000, 0b010, 0b000]),
        ';' => g([0b000, 0b010, 0b000, 0b010, 0b100]),
        '-' => g([0b000, 0b000, 0b111, 0b000, 0b000]),
        '_' => g([0b000, 0b000, 0b000, 0b000, 0b111]),
        '=' => g([0b000, 0b111, 0b000, 0b111, 0b000]),
        '+' => g([0b000, 0b010, 0b111, 0b010, 0b000]),
        '*' => g([0b101, 0b010, 0b101, 0b000, 0b000]),
        '/' => g([0b001, 0b001, 0b010, 0b100, 0b100]),
        '(' => g([0b001, 0b010, 0b010, 0b010, 0b001]),
        ')' => g([0b100, 0b010, 0b010, 0b010, 0b100]),
        '[' => g([0b110, 0b100, 0b100, 0b100, 0b110]),
        ']' => g([0b011, 0b001, 0b001, 0b001, 0b011]),
        '<' => g([0b001, 0b010, 0b100, 0b010, 0b001]),
        '>' => g([0b100, 0b010, 0b001, 0b010, 0b100]),
        '#' => g([0b101, 0b111, 0b101, 0b111, 0b101]),
        '%' => g([0b101, 0b001, 0b010, 0b100, 0b101]),
        '&' => g([0b010, 0b101, 0b010, 0b101, 0b011]),
        '|' => g([0b010, 0b010, 0b010, 0b010, 0b010]),
        '`' => g([0b100, 0b010, 0b000, 0b000, 0b000]),
        _ => return None,
    };
    Some(glyph)
}

pub(crate) fn glyph_or_fallback(ch: char) -> Glyph {
    glyph_for(ch).unwrap_or(FALLBACK)
}

pub(crate) fn text_width(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE
}

/// Greedy word wrap to at most `max_chars` per line. Words longer than a line
/// are split.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
