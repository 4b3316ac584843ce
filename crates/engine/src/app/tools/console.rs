use std::collections::VecDeque;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::app::rendering::{wrap_text, Canvas, GLYPH_ADVANCE, LINE_ADVANCE};

const PANEL_PADDING: i32 = 4;
const PANEL_MAX_ROWS: usize = 8;
const PANEL_COLOR: [u8; 4] = [8, 10, 14, 255];
const PANEL_EDGE_COLOR: [u8; 4] = [70, 200, 120, 255];
const TEXT_COLOR: [u8; 4] = [190, 240, 200, 255];
const INPUT_PREFIX: &str = "> ";

pub(crate) const HISTORY_CAPACITY: usize = 32;
pub(crate) const OUTPUT_CAPACITY: usize = 128;
pub(crate) const SUBMITTED_CAPACITY: usize = 16;
pub(crate) const INPUT_CAPACITY: usize = 64;

/// Cheat console line editor. Submitted lines queue up until the loop drains
/// them into the command processor; results come back through `print`.
#[derive(Debug, Default)]
pub(crate) struct CheatConsole {
    open: bool,
    input: String,
    history: VecDeque<String>,
    recall: Option<usize>,
    stashed_input: Option<String>,
    output: VecDeque<String>,
    submitted: VecDeque<String>,
}

impl CheatConsole {
    pub(crate) fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn toggle(&mut self) {
        self.open = !self.open;
        self.reset_input();
    }

    pub(crate) fn close(&mut self) {
        self.open = false;
        self.reset_input();
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    pub(crate) fn output(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.output.iter().map(String::as_str)
    }

    pub(crate) fn print(&mut self, line: impl Into<String>) {
        push_capped(&mut self.output, line.into(), OUTPUT_CAPACITY);
    }

    pub(crate) fn clear_output(&mut self) {
        self.output.clear();
    }

    pub(crate) fn take_submitted(&mut self) -> Vec<String> {
        self.submitted.drain(..).collect()
    }

    /// Editing keys plus typed text. Ignored while closed.
    pub(crate) fn handle_key_event(&mut self, event: &KeyEvent) {
        if !self.open || event.state != ElementState::Pressed {
            return;
        }
        if let PhysicalKey::Code(code) = event.physical_key {
            if self.edit(code) {
                return;
            }
        }
        if let Some(text) = event.text.as_ref() {
            self.type_text(text);
        }
    }

    fn edit(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter | KeyCode::NumpadEnter => self.submit(),
            KeyCode::Escape => self.close(),
            KeyCode::ArrowUp => self.recall_older(),
            KeyCode::ArrowDown => self.recall_newer(),
            // The toggle key is handled by the loop; never type it.
            KeyCode::Backquote => {}
            _ => return false,
        }
        true
    }

    fn type_text(&mut self, text: &str) {
        for ch in text.chars().filter(|ch| !ch.is_control()) {
            if self.input.chars().count() >= INPUT_CAPACITY {
                break;
            }
            self.input.push(ch);
        }
    }

    fn reset_input(&mut self) {
        self.input.clear();
        self.recall = None;
        self.stashed_input = None;
    }

    fn submit(&mut self) {
        let line = std::mem::take(&mut self.input);
        self.reset_input();
        self.submit_line(&line);
    }

    pub(crate) fn submit_line(&mut self, line: &str) {
        let line = line.trim().to_string();
        if line.is_empty() {
            return;
        }
        if self.history.back() != Some(&line) {
            push_capped(&mut self.history, line.clone(), HISTORY_CAPACITY);
        }
        push_capped(&mut self.output, format!("{INPUT_PREFIX}{line}"), OUTPUT_CAPACITY);
        push_capped(&mut self.submitted, line, SUBMITTED_CAPACITY);
    }

    fn recall_older(&mut self) {
        let Some(newest) = self.history.len().checked_sub(1) else {
            return;
        };
        let index = match self.recall {
            Some(index) => index.saturating_sub(1),
            None => {
                self.stashed_input = Some(std::mem::take(&mut self.input));
                newest
            }
        };
        self.recall = Some(index);
        self.input = self.history[index].clone();
    }

    fn recall_newer(&mut self) {
        let Some(index) = self.recall else {
            return;
        };
        if index + 1 < self.history.len() {
            self.recall = Some(index + 1);
            self.input = self.history[index + 1].clone();
        } else {
            self.recall = None;
            self.input = self.stashed_input.take().unwrap_or_default();
        }
    }
}

fn push_capped(queue: &mut VecDeque<String>, value: String, capacity: usize) {
    while queue.len() >= capacity {
        queue.pop_front();
    }
    queue.push_back(value);
}

/// Top-anchored panel: newest output just above the input row.
pub(crate) fn draw_console(canvas: &mut Canvas<'_>, console: &CheatConsole) {
    if !console.is_open() {
        return;
    }
    let width = canvas.width() as i32;
    let max_chars = ((width - PANEL_PADDING * 2) / GLYPH_ADVANCE).max(1) as usize;

    let mut rows: Vec<String> = Vec::new();
    for line in console.output().rev() {
        for wrapped in wrap_text(line, max_chars).into_iter().rev() {
            rows.push(wrapped);
        }
        if rows.len() >= PANEL_MAX_ROWS {
            break;
        }
    }
    rows.truncate(PANEL_MAX_ROWS);
    rows.reverse();

    let input = format!("{INPUT_PREFIX}{}_", console.input());
    let input_chars: Vec<char> = input.chars().collect();
    let visible_input: String = input_chars[input_chars.len().saturating_sub(max_chars)..]
        .iter()
        .collect();

    let panel_height = (rows.len() as i32 + 1) * LINE_ADVANCE + PANEL_PADDING * 2;
    canvas.fill_rect(0, 0, width, panel_height, PANEL_COLOR);
    canvas.fill_rect(0, panel_height, width, 1, PANEL_EDGE_COLOR);

    let mut y = PANEL_PADDING;
    for row in &rows {
        canvas.text(PANEL_PADDING, y, row, TEXT_COLOR);
        y += LINE_ADVANCE;
    }
    canvas.text(PANEL_PADDING, y, &visible_input, TEXT_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_console() -> CheatConsole {
        let mut console = CheatConsole::default();
        console.toggle();
        console
    }

    fn enter(console: &mut CheatConsole, line: &str) {
        console.type_text(line);
        console.edit(KeyCode::Enter);
    }

    #[test]
    fn submitted_line_is_echoed_and_queued() {
        let mut console = open_console();
        enter(&mut console, "klapaucius 2");
        assert_eq!(console.input(), "");
        assert_eq!(console.output().last(), Some("> klapaucius 2"));
        assert_eq!(console.take_submitted(), vec!["klapaucius 2".to_string()]);
        assert!(console.take_submitted().is_empty());
    }

    #[test]
    fn blank_submission_does_nothing() {
        let mut console = open_console();
        enter(&mut console, "   ");
        assert_eq!(console.output().count(), 0);
        assert!(console.take_submitted().is_empty());
        assert!(console.history.is_empty());
    }

    #[test]
    fn escape_closes_and_discards_the_draft() {
        let mut console = open_console();
        console.type_text("half typed");
        console.edit(KeyCode::Escape);
        assert!(!console.is_open());
        assert_eq!(console.input(), "");
    }

    #[test]
    fn control_characters_and_overflow_are_not_typed() {
        let mut console = open_console();
        console.type_text("a\tb\n");
        assert_eq!(console.input(), "ab");
        console.type_text(&"z".repeat(INPUT_CAPACITY * 2));
        assert_eq!(console.input().chars().count(), INPUT_CAPACITY);
        for _ in 0..INPUT_CAPACITY + 3 {
            console.edit(KeyCode::Backspace);
        }
        assert_eq!(console.input(), "");
    }

    #[test]
    fn history_recall_walks_back_and_restores_the_draft() {
        let mut console = open_console();
        enter(&mut console, "help");
        enter(&mut console, "progress");
        console.type_text("kla");

        console.edit(KeyCode::ArrowUp);
        assert_eq!(console.input(), "progress");
        console.edit(KeyCode::ArrowUp);
        console.edit(KeyCode::ArrowUp);
        assert_eq!(console.input(), "help");
        console.edit(KeyCode::ArrowDown);
        assert_eq!(console.input(), "progress");
        console.edit(KeyCode::ArrowDown);
        assert_eq!(console.input(), "kla");
    }

    #[test]
    fn repeated_submissions_are_stored_once_in_history() {
        let mut console = open_console();
        enter(&mut console, "help");
        enter(&mut console, "help");
        assert_eq!(console.history.len(), 1);
        assert_eq!(console.take_submitted().len(), 2);
    }

    #[test]
    fn buffers_stay_within_capacity() {
        let mut console = open_console();
        for index in 0..OUTPUT_CAPACITY + 5 {
            console.print(format!("line {index}"));
        }
        assert_eq!(console.output().count(), OUTPUT_CAPACITY);
        assert_eq!(console.output().next(), Some("line 5"));

        for index in 0..SUBMITTED_CAPACITY + 2 {
            enter(&mut console, &format!("cmd {index}"));
        }
        assert_eq!(console.take_submitted().len(), SUBMITTED_CAPACITY);
        assert_eq!(console.history.len(), HISTORY_CAPACITY.min(SUBMITTED_CAPACITY + 2));
    }

    #[test]
    fn drawing_a_tiny_canvas_is_safe() {
        let mut console = open_console();
        console.print("a fairly long line of console output that must wrap");
        let mut frame = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut frame, 1, 1);
        draw_console(&mut canvas, &console);
        assert_eq!(frame, PANEL_COLOR.to_vec());
    }
}
