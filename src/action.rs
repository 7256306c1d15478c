//! What a position in the keymap can do

pub use usbd_human_interface_device::page::{Consumer, Keyboard};

pub type Layer = u8;

/// Bitset over the eight HID modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Modifiers(u8);

#[rustfmt::skip]
static MODIFIER_KEYS: [(u8, Keyboard); 8] = [
    (1 << 0, Keyboard::LeftControl),
    (1 << 1, Keyboard::LeftShift),
    (1 << 2, Keyboard::LeftAlt),
    (1 << 3, Keyboard::LeftGUI),
    (1 << 4, Keyboard::RightControl),
    (1 << 5, Keyboard::RightShift),
    (1 << 6, Keyboard::RightAlt),
    (1 << 7, Keyboard::RightGUI),
];

impl Modifiers {
    pub const NONE: Self = Modifiers(0);
    pub const LCTL: Self = Modifiers(1 << 0);
    pub const LSFT: Self = Modifiers(1 << 1);
    pub const LALT: Self = Modifiers(1 << 2);
    pub const LGUI: Self = Modifiers(1 << 3);
    pub const RCTL: Self = Modifiers(1 << 4);
    pub const RSFT: Self = Modifiers(1 << 5);
    pub const RALT: Self = Modifiers(1 << 6);
    pub const RGUI: Self = Modifiers(1 << 7);
    pub const MEH: Self = Modifiers(Self::LCTL.0 | Self::LSFT.0 | Self::LALT.0);
    pub const HYPR: Self = Modifiers(Self::MEH.0 | Self::LGUI.0);

    pub const fn union(self, other: Self) -> Self {
        Modifiers(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Expand to the equivalent keycodes, left-hand modifiers first
    pub fn keycodes(self) -> impl Iterator<Item = Keyboard> {
        MODIFIER_KEYS
            .iter()
            .copied()
            .filter(move |&(bit, _)| self.0 & bit != 0)
            .map(|(_, key)| key)
    }
}

/// A single executable behavior.
///
/// `KeyAction` composes these into the per-position variants (tap/hold,
/// one-shot, ...); an `Action` on its own is what a machine ultimately
/// asserts or applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Plain keystroke
    Key(Keyboard),
    /// Keystroke with Shift wrapped around it
    Shifted(Keyboard),
    /// Keystroke with a modifier combination held (Ctrl-D, Hyper-Space, ...)
    WithModifiers(Keyboard, Modifiers),
    /// Consumer-page usage (media transport, volume)
    Consumer(Consumer),
    /// Bare modifier combination
    Modifier(Modifiers),
    /// Layer active while held
    MomentaryLayer(Layer),
    /// Replace the default layer
    DefaultLayer(Layer),
    /// Toggle caps-word
    CapsWordToggle,
    /// Underglow on/off
    LightToggle,
    LightValUp,
    LightValDown,
    /// Runtime tapping-term adjustment
    TermUp,
    TermDown,
    TermPrint,
}

/// The action stored at one key position on one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyAction {
    /// Swallows the key, never falls through
    No,
    /// Fall through to the next active layer below
    Transparent,
    Single(Action),
    /// Tap for `tap`, hold past the tapping term for `hold`
    TapHold { tap: Action, hold: Action },
    /// Tap to arm for the next key, hold for a plain momentary action
    OneShot(Action),
    /// Index into the tap-dance table
    TapDance(u8),
}

impl Default for KeyAction {
    fn default() -> Self {
        KeyAction::No
    }
}

pub(crate) fn is_modifier_code(code: Keyboard) -> bool {
    // LeftControl through RightGUI
    (0xE0..=0xE7).contains(&(code as u8))
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn modifier_union() {
        let mods = Modifiers::LCTL.union(Modifiers::LSFT);
        assert!(mods.contains(Modifiers::LCTL));
        assert!(mods.contains(Modifiers::LSFT));
        assert!(!mods.contains(Modifiers::LALT));
        assert!(!mods.is_empty());
        assert!(Modifiers::NONE.is_empty());
    }

    #[test]
    fn modifier_keycodes() {
        let keys: std::vec::Vec<_> = Modifiers::HYPR.keycodes().collect();
        assert_eq!(
            keys,
            [
                Keyboard::LeftControl,
                Keyboard::LeftShift,
                Keyboard::LeftAlt,
                Keyboard::LeftGUI
            ]
        );
        let keys: std::vec::Vec<_> = Modifiers::RSFT.keycodes().collect();
        assert_eq!(keys, [Keyboard::RightShift]);
    }

    #[test]
    fn modifier_code_range() {
        assert!(is_modifier_code(Keyboard::LeftShift));
        assert!(is_modifier_code(Keyboard::RightGUI));
        assert!(!is_modifier_code(Keyboard::A));
        assert!(!is_modifier_code(Keyboard::Space));
    }
}
