use tracing::{debug, info};

/// Identifies one `show` call. A token completes at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DialogueToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueAdvance {
    /// Moved to the line at `index`; the box stays open.
    Advanced { index: usize },
    /// Advanced past the last line. `token` is handed out exactly once.
    Closed { token: DialogueToken },
    /// Nothing was open.
    Hidden,
}

/// The single dialogue box shared by every scene of the process.
#[derive(Debug, Default)]
pub struct DialogueSession {
    lines: Vec<String>,
    cursor: usize,
    owner: Option<DialogueToken>,
    next_token: u64,
    abandoned: Vec<DialogueToken>,
}

impl DialogueSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the box on the first of `lines`. An open box is replaced, not
    /// stacked; the replaced token is reported through [`Self::take_abandoned`].
    pub fn show<I, S>(&mut self, lines: I) -> DialogueToken
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(previous) = self.owner.take() {
            debug!(token = previous.0, "dialogue_replaced");
            self.abandoned.push(previous);
        }
        self.next_token = self.next_token.saturating_add(1);
        let token = DialogueToken(self.next_token);
        self.lines = lines.into_iter().map(Into::into).collect();
        self.cursor = 0;
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.owner = Some(token);
        info!(
            token = token.0,
            line_count = self.lines.len(),
            line = self.lines[0].as_str(),
            "dialogue_shown"
        );
        token
    }

    pub fn advance_or_close(&mut self) -> DialogueAdvance {
        let Some(token) = self.owner else {
            return DialogueAdvance::Hidden;
        };
        self.cursor += 1;
        if let Some(line) = self.lines.get(self.cursor) {
            info!(
                token = token.0,
                index = self.cursor,
                line = line.as_str(),
                "dialogue_advanced"
            );
            return DialogueAdvance::Advanced { index: self.cursor };
        }
        self.owner = None;
        self.clear_lines();
        info!(token = token.0, "dialogue_closed");
        DialogueAdvance::Closed { token }
    }

    /// Closes the box without completing it. No-op when nothing is open.
    pub fn hide(&mut self) {
        let Some(token) = self.owner.take() else {
            return;
        };
        self.clear_lines();
        debug!(token = token.0, "dialogue_hidden");
        self.abandoned.push(token);
    }

    pub fn is_visible(&self) -> bool {
        self.owner.is_some()
    }

    pub fn owner(&self) -> Option<DialogueToken> {
        self.owner
    }

    pub fn current_line(&self) -> Option<&str> {
        self.owner?;
        self.lines.get(self.cursor).map(String::as_str)
    }

    pub fn line_index(&self) -> Option<usize> {
        self.owner.map(|_| self.cursor)
    }

    pub fn line_count(&self) -> usize {
        if self.owner.is_some() {
            self.lines.len()
        } else {
            0
        }
    }

    /// Tokens whose dialogue ended through `hide` or replacement instead of
    /// `advance_or_close`.
    pub fn take_abandoned(&mut self) -> Vec<DialogueToken> {
        std::mem::take(&mut self.abandoned)
    }

    fn clear_lines(&mut self) {
        self.lines.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_opens_on_first_line() {
        let mut dialogue = DialogueSession::new();
        dialogue.show(["one", "two"]);
        assert!(dialogue.is_visible());
        assert_eq!(dialogue.current_line(), Some("one"));
        assert_eq!(dialogue.line_count(), 2);
    }

    #[test]
    fn advancing_past_last_line_closes_once() {
        let mut dialogue = DialogueSession::new();
        let token = dialogue.show(["a", "b", "c"]);
        assert_eq!(
            dialogue.advance_or_close(),
            DialogueAdvance::Advanced { index: 1 }
        );
        assert_eq!(
            dialogue.advance_or_close(),
            DialogueAdvance::Advanced { index: 2 }
        );
        assert_eq!(dialogue.advance_or_close(), DialogueAdvance::Closed { token });
        assert_eq!(dialogue.advance_or_close(), DialogueAdvance::Hidden);
        assert!(!dialogue.is_visible());
        assert!(dialogue.take_abandoned().is_empty());
    }

    #[test]
    fn show_while_visible_replaces_and_resets_cursor() {
        let mut dialogue = DialogueSession::new();
        let first = dialogue.show(["a", "b"]);
        dialogue.advance_or_close();
        let second = dialogue.show(["x", "y", "z"]);
        assert_ne!(first, second);
        assert_eq!(dialogue.current_line(), Some("x"));
        assert_eq!(dialogue.line_index(), Some(0));
        assert_eq!(dialogue.take_abandoned(), vec![first]);
    }

    #[test]
    fn hide_is_idempotent() {
        let mut dialogue = DialogueSession::new();
        let token = dialogue.show(["a"]);
        dialogue.hide();
        dialogue.hide();
        assert!(!dialogue.is_visible());
        assert_eq!(dialogue.current_line(), None);
        assert_eq!(dialogue.take_abandoned(), vec![token]);
        assert!(dialogue.take_abandoned().is_empty());
    }

    #[test]
    fn empty_show_still_needs_one_confirm_to_close() {
        let mut dialogue = DialogueSession::new();
        let token = dialogue.show(Vec::<String>::new());
        assert!(dialogue.is_visible());
        assert_eq!(dialogue.advance_or_close(), DialogueAdvance::Closed { token });
    }
}
