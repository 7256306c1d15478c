use crate::action::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pressed {
    action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released;

impl Pressed {
    fn release(&self) -> Released {
        Released
    }
}

/// Plain key: asserts its action exactly while pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed(Pressed),
    Released(Released),
}

impl ButtonState {
    /// Latched at the press edge, so a fresh machine is already pressed
    pub fn new(action: Action) -> Self {
        Self::Pressed(Pressed { action })
    }

    pub fn transition(&mut self, pressed: bool) {
        match &self {
            Self::Pressed(state) if !pressed => *self = Self::Released(state.release()),
            _ => (),
        }
    }

    pub fn active(&self) -> Option<Action> {
        match self {
            ButtonState::Pressed(state) => Some(state.action),
            ButtonState::Released(_) => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ButtonState::Released(_))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use usbd_human_interface_device::page::{Consumer, Keyboard};

    #[test]
    fn press_then_release() {
        let mut state = ButtonState::new(Action::Key(Keyboard::A));
        assert_eq!(state.active(), Some(Action::Key(Keyboard::A)));
        assert!(!state.is_finished());

        state.transition(true);
        assert_eq!(state.active(), Some(Action::Key(Keyboard::A)));

        state.transition(false);
        assert_eq!(state.active(), None);
        assert!(state.is_finished());

        // Released is terminal
        state.transition(true);
        assert!(state.is_finished());
    }

    #[test]
    fn consumer_action() {
        let mut state = ButtonState::new(Action::Consumer(Consumer::Mute));
        assert_eq!(state.active(), Some(Action::Consumer(Consumer::Mute)));
        state.transition(false);
        assert_eq!(state.active(), None);
    }
}
