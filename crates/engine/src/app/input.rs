#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Left,
    Right,
    Up,
    Down,
    Confirm,
    Interact,
    Cancel,
    Menu,
    Help,
}

const ACTION_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::Left,
        InputAction::Right,
        InputAction::Up,
        InputAction::Down,
        InputAction::Confirm,
        InputAction::Interact,
        InputAction::Cancel,
        InputAction::Menu,
        InputAction::Help,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::Left => 0,
            InputAction::Right => 1,
            InputAction::Up => 2,
            InputAction::Down => 3,
            InputAction::Confirm => 4,
            InputAction::Interact => 5,
            InputAction::Cancel => 6,
            InputAction::Menu => 7,
            InputAction::Help => 8,
        }
    }
}

/// Input as seen by one simulation tick: held actions plus the actions whose
/// key went down since the previous tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    down: ActionStates,
    pressed: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(down: ActionStates, pressed: ActionStates) -> Self {
        Self { down, pressed }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down.is_down(action)
    }

    pub fn just_pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.down.set(action, is_down);
        self
    }

    /// Marks `action` as pressed this tick (and held).
    pub fn with_action_pressed(mut self, action: InputAction, pressed: bool) -> Self {
        self.pressed.set(action, pressed);
        if pressed {
            self.down.set(action, true);
        }
        self
    }

    /// Held direction as a unit-free axis pair in screen space (+y is down).
    pub fn movement_axis(&self) -> (f32, f32) {
        let axis = |negative: InputAction, positive: InputAction| -> f32 {
            match (self.is_down(negative), self.is_down(positive)) {
                (true, false) => -1.0,
                (false, true) => 1.0,
                _ => 0.0,
            }
        };
        (
            axis(InputAction::Left, InputAction::Right),
            axis(InputAction::Up, InputAction::Down),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposing_directions_cancel_out() {
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::Left, true)
            .with_action_down(InputAction::Right, true)
            .with_action_down(InputAction::Down, true);
        assert_eq!(input.movement_axis(), (0.0, 1.0));
    }

    #[test]
    fn pressed_implies_down_but_not_the_reverse() {
        let input = InputSnapshot::empty()
            .with_action_pressed(InputAction::Confirm, true)
            .with_action_down(InputAction::Interact, true);
        assert!(input.is_down(InputAction::Confirm));
        assert!(input.just_pressed(InputAction::Confirm));
        assert!(input.is_down(InputAction::Interact));
        assert!(!input.just_pressed(InputAction::Interact));
    }

    #[test]
    fn action_indices_are_distinct() {
        let mut states = ActionStates::default();
        for action in InputAction::ALL {
            assert!(!states.is_down(action));
            states.set(action, true);
        }
        assert!(InputAction::ALL.iter().all(|action| states.is_down(*action)));
    }
}
