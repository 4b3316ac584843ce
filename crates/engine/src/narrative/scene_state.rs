use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneState {
    Exploring,
    DialogueOpen,
    RunningSequence,
    MenuOpen,
}

impl SceneState {
    pub fn as_str(self) -> &'static str {
        match self {
            SceneState::Exploring => "exploring",
            SceneState::DialogueOpen => "dialogue_open",
            SceneState::RunningSequence => "running_sequence",
            SceneState::MenuOpen => "menu_open",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuKind {
    Pause,
    Help,
}

/// Tracks which of the four interaction states a scene is in. Dialogue and
/// sequence states are derived each tick; the menu state is explicit and
/// remembers what it interrupted.
#[derive(Debug, Clone)]
pub struct SceneStateMachine {
    scene: &'static str,
    current: SceneState,
    before_menu: SceneState,
    menu: Option<MenuKind>,
}

impl SceneStateMachine {
    pub fn new(scene: &'static str) -> Self {
        Self {
            scene,
            current: SceneState::Exploring,
            before_menu: SceneState::Exploring,
            menu: None,
        }
    }

    pub fn current(&self) -> SceneState {
        self.current
    }

    pub fn menu(&self) -> Option<MenuKind> {
        self.menu
    }

    pub fn is_exploring(&self) -> bool {
        self.current == SceneState::Exploring
    }

    /// Opens `kind`, or switches to it when another menu is already open.
    pub fn open_menu(&mut self, kind: MenuKind) {
        if self.menu.is_none() {
            self.before_menu = self.current;
        }
        self.menu = Some(kind);
        self.transition(SceneState::MenuOpen, "menu_opened");
    }

    pub fn close_menu(&mut self) {
        if self.menu.take().is_none() {
            return;
        }
        self.transition(self.before_menu, "menu_closed");
    }

    /// Re-derives the state from what is on screen. Ignored while a menu is up.
    pub fn sync(&mut self, dialogue_visible: bool, sequence_running: bool) {
        if self.menu.is_some() {
            return;
        }
        let (next, reason) = if dialogue_visible {
            (SceneState::DialogueOpen, "dialogue_visible")
        } else if sequence_running {
            (SceneState::RunningSequence, "sequence_running")
        } else {
            (SceneState::Exploring, "idle")
        };
        self.transition(next, reason);
    }

    fn transition(&mut self, next: SceneState, reason: &'static str) {
        if self.current == next {
            return;
        }
        debug!(
            scene = self.scene,
            from = self.current.as_str(),
            to = next.as_str(),
            reason,
            "scene_state_changed"
        );
        self.current = next;
    }
}
