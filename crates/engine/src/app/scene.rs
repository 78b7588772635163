use std::time::Duration;

use super::input::{ActionStates, InputAction};
use crate::tiles::PixelBuffer;
use crate::world::FrameInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Input state sampled once per fixed tick. Movement actions are held states;
/// `interact_pressed` is true only on the tick the key went down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    quit_requested: bool,
    interact_pressed: bool,
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, interact_pressed: bool, actions: ActionStates) -> Self {
        Self {
            quit_requested,
            interact_pressed,
            actions,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }

    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            up: self.is_down(InputAction::MoveUp),
            down: self.is_down(InputAction::MoveDown),
            left: self.is_down(InputAction::MoveLeft),
            right: self.is_down(InputAction::MoveRight),
            interact_pressed: self.interact_pressed,
        }
    }
}

/// A scene driven by the fixed-step loop. `render` draws into a canvas the size
/// of `canvas_size`, which the renderer scales to the window.
pub trait Scene {
    fn canvas_size(&self) -> (u32, u32);
    fn load(&mut self) {}
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    fn render(&mut self, canvas: &mut PixelBuffer, elapsed: Duration);
    fn unload(&mut self) {}
    fn debug_title(&self) -> Option<String> {
        None
    }
}
