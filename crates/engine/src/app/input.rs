#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Interact,
    Quit,
}

impl InputAction {
    const fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// Held state of every action, one bit each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    bits: u8,
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        if is_down {
            self.bits |= action.mask();
        } else {
            self.bits &= !action.mask();
        }
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.bits & action.mask() != 0
    }
}
