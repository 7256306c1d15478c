//! Chord substitution: simultaneous presses of member keys emit one
//! substitute action instead of their individual effects.

use heapless::Vec;

use crate::action::{KeyAction, Layer};

pub const COMBO_MAX_NUM: usize = 8;
pub const COMBO_MAX_LENGTH: usize = 4;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Combo {
    pub actions: Vec<KeyAction, COMBO_MAX_LENGTH>,
    pub output: KeyAction,
    /// Restrict matching to one layer; `None` matches everywhere
    pub layer: Option<Layer>,
    state: u8,
}

impl Combo {
    pub fn new<I: IntoIterator<Item = KeyAction>>(
        actions: I,
        output: KeyAction,
        layer: Option<Layer>,
    ) -> Self {
        let mut combo = Self {
            actions: Vec::new(),
            output,
            layer,
            state: 0,
        };
        for action in actions {
            combo.actions.push(action).ok();
        }
        combo
    }

    pub fn contains(&self, action: KeyAction) -> bool {
        action != KeyAction::No && self.actions.iter().any(|&a| a == action)
    }

    /// Feed one press of `action`; returns whether it advanced this combo
    pub(crate) fn update(&mut self, action: KeyAction, active_layer: Layer) -> bool {
        if action == KeyAction::No {
            return false;
        }
        if let Some(layer) = self.layer {
            if layer != active_layer {
                return false;
            }
        }

        let action_idx = self.actions.iter().position(|&a| a == action);
        if let Some(i) = action_idx {
            self.state |= 1 << i;
        } else if !self.done() {
            self.reset();
        }
        action_idx.is_some()
    }

    pub(crate) fn done(&self) -> bool {
        self.started() && self.keys_pressed() == self.actions.len() as u32
    }

    pub(crate) fn started(&self) -> bool {
        self.state != 0
    }

    pub(crate) fn keys_pressed(&self) -> u32 {
        self.state.count_ones()
    }

    pub(crate) fn reset(&mut self) {
        self.state = 0;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::action::{Action, Keyboard};

    fn k(code: Keyboard) -> KeyAction {
        KeyAction::Single(Action::Key(code))
    }

    #[test]
    fn progresses_to_done() {
        let mut combo = Combo::new([k(Keyboard::E), k(Keyboard::I)], k(Keyboard::Semicolon), None);
        assert!(!combo.started());

        assert!(combo.update(k(Keyboard::E), 0));
        assert!(combo.started());
        assert!(!combo.done());
        assert_eq!(combo.keys_pressed(), 1);

        assert!(combo.update(k(Keyboard::I), 0));
        assert!(combo.done());

        combo.reset();
        assert!(!combo.started());
    }

    #[test]
    fn foreign_press_resets_progress() {
        let mut combo = Combo::new([k(Keyboard::E), k(Keyboard::I)], k(Keyboard::Semicolon), None);
        combo.update(k(Keyboard::E), 0);
        assert!(combo.started());

        assert!(!combo.update(k(Keyboard::A), 0));
        assert!(!combo.started());
    }

    #[test]
    fn layer_restriction() {
        let mut combo =
            Combo::new([k(Keyboard::E), k(Keyboard::I)], k(Keyboard::Semicolon), Some(1));
        assert!(!combo.update(k(Keyboard::E), 0));
        assert!(!combo.started());

        assert!(combo.update(k(Keyboard::E), 1));
        assert!(combo.started());
    }

    #[test]
    fn no_action_never_matches() {
        let mut combo = Combo::new([k(Keyboard::E), KeyAction::No], k(Keyboard::Q), None);
        assert!(!combo.contains(KeyAction::No));
        assert!(!combo.update(KeyAction::No, 0));
    }
}
