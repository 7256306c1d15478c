//! Associates presses to keymaps
//!
//! `Keymap` owns the layer-major action table and everything stateful about
//! it: the per-key machine slots, the layer stack, combos, tap dances,
//! one-shot and caps-word state. The board side feeds it one debounced
//! press-state snapshot per scan and reads back the HID keycode set.

use heapless::Vec;

use crate::action::{is_modifier_code, Action, KeyAction, Layer, Modifiers};
use crate::combo::{Combo, COMBO_MAX_LENGTH, COMBO_MAX_NUM};
use crate::keystate::button::ButtonState;
use crate::keystate::layer::{LayerState, MomentaryState};
use crate::keystate::modtap::{ModTapConfig, ModTapState};
use crate::keystate::oneshot::OneShotState;
use crate::keystate::tapdance::{TapDance, TapDanceState};
use crate::keystate::{Context, Duration, Instant, Key};
use crate::rgblight::LightEvent;

// Export as pub so that they can be used from the macros
#[doc(hidden)]
pub use paste::paste;
#[doc(hidden)]
pub use usbd_human_interface_device::page::{Consumer, Keyboard};

pub const TAP_DANCE_MAX_NUM: usize = 4;
const PENDING_MAX: usize = 8;

const TERM_STEP: Duration = 5;
const TERM_MIN: Duration = 50;
const TERM_MAX: Duration = 500;

/// Options for configurable action behavior
#[derive(Debug, Clone)]
pub struct BehaviorConfig {
    pub modtap: ModTapConfig,
    /// Window in which all members of a combo must arrive
    pub combo_term: Duration,
    /// How long an armed one-shot stays armed
    pub oneshot_timeout: Duration,
    pub autoshift_enabled: bool,
    /// Tap/hold actions whose repeat window is disabled
    pub quick_tap_exempt: Vec<KeyAction, 8>,
    /// Tap/hold actions eligible for retro shift
    pub autoshift_actions: Vec<KeyAction, 16>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            modtap: ModTapConfig::default(),
            combo_term: 50,
            oneshot_timeout: 3000,
            autoshift_enabled: true,
            quick_tap_exempt: Vec::new(),
            autoshift_actions: Vec::new(),
        }
    }
}

/// The pair of actions at one rotary-encoder position
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderAction {
    clockwise: Action,
    counter_clockwise: Action,
}

impl EncoderAction {
    pub const fn new(clockwise: Action, counter_clockwise: Action) -> Self {
        EncoderAction {
            clockwise,
            counter_clockwise,
        }
    }

    pub fn clockwise(&self) -> Action {
        self.clockwise
    }

    pub fn counter_clockwise(&self) -> Action {
        self.counter_clockwise
    }
}

#[derive(Debug, Default)]
pub struct KeymapFlags {
    pub rollover: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingPress {
    key: usize,
    action: KeyAction,
    at: Instant,
}

struct FiredCombo {
    state: ButtonState,
    members: Vec<usize, COMBO_MAX_LENGTH>,
}

pub struct Keymap<const SIZE: usize, const LAYERS: usize> {
    map: [[KeyAction; SIZE]; LAYERS],
    slots: [Option<Key>; SIZE],
    prev: [bool; SIZE],
    /// Machines latched this scan, which skip their first transition so a
    /// press replayed from the combo buffer is asserted for at least one
    /// scan even if the key is already back up
    fresh: [bool; SIZE],
    layers: LayerState<LAYERS>,
    behavior: BehaviorConfig,
    tap_dances: Vec<TapDance, TAP_DANCE_MAX_NUM>,
    combos: Vec<Combo, COMBO_MAX_NUM>,
    /// Presses withheld while a combo may still complete
    pending: Vec<PendingPress, PENDING_MAX>,
    fired: Vec<FiredCombo, 2>,
    armed_mods: Modifiers,
    armed_until: Instant,
    caps_word: bool,
    light_events: Vec<LightEvent, 4>,
    /// Consumer-page usages active this scan
    pub consumer: Vec<Consumer, 4>,
    pub flags: KeymapFlags,
}

impl<const SIZE: usize, const LAYERS: usize> Keymap<SIZE, LAYERS> {
    pub fn new(
        map: [[KeyAction; SIZE]; LAYERS],
        behavior: BehaviorConfig,
        tap_dances: Vec<TapDance, TAP_DANCE_MAX_NUM>,
        combos: Vec<Combo, COMBO_MAX_NUM>,
    ) -> Self {
        Keymap {
            map,
            slots: [None; SIZE],
            prev: [false; SIZE],
            fresh: [false; SIZE],
            layers: LayerState::new(),
            behavior,
            tap_dances,
            combos,
            pending: Vec::new(),
            fired: Vec::new(),
            armed_mods: Modifiers::NONE,
            armed_until: 0,
            caps_word: false,
            light_events: Vec::new(),
            consumer: Vec::new(),
            flags: KeymapFlags::default(),
        }
    }

    /// Run one scan: `presses` is the debounced state of every key, `keys`
    /// receives the keycodes to report. Overflowing `keys` sets the
    /// rollover flag instead of dropping state.
    pub fn process<const ROLLOVER: usize>(
        &mut self,
        presses: &[bool; SIZE],
        keys: &mut Vec<Keyboard, ROLLOVER>,
        now: Instant,
    ) {
        self.consumer.clear();
        if !self.armed_mods.is_empty() && self.armed_until <= now {
            self.armed_mods = Modifiers::NONE;
        }
        self.layers.expire_oneshot(now);

        let combo_lapsed = self
            .pending
            .first()
            .map_or(false, |p| now.saturating_sub(p.at) >= self.behavior.combo_term);
        if combo_lapsed {
            self.flush_pending();
        }

        for key in 0..SIZE {
            let pressed = presses[key];
            if pressed && !self.prev[key] {
                self.on_press(key, now);
            } else if !pressed && self.prev[key] {
                self.on_release(key);
            }
        }
        self.prev = *presses;

        self.step_machines(presses, now);
        self.collect(keys);
    }

    /// Resolve the action at `key` through the layer stack, skipping
    /// transparent entries, stopping at the default layer
    fn resolve(&self, key: usize) -> KeyAction {
        for layer in (0..LAYERS).rev() {
            let l = layer as Layer;
            if self.layers.considers(l) {
                let action = self.map[layer][key];
                if action != KeyAction::Transparent {
                    return action;
                }
            }
            if l == self.layers.default_layer() {
                break;
            }
        }
        KeyAction::No
    }

    fn on_press(&mut self, key: usize, now: Instant) {
        // a press elsewhere interrupts live hold decisions
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i != key {
                if let Some(machine) = slot {
                    machine.note_interrupt();
                }
            }
        }
        if self.slots[key].is_some() {
            // the live machine consumes the re-press in its own transition
            return;
        }

        let action = self.resolve(key);
        self.layers.consume_oneshot();

        if self.try_combo(key, action, now) {
            return;
        }
        if !self.pending.is_empty() {
            self.flush_pending();
        }
        self.apply_edge(action);
        self.latch(key, action, now);
    }

    fn on_release(&mut self, key: usize) {
        if self.pending.iter().any(|p| p.key == key) {
            // a member released before the chord completed: everyone is
            // an ordinary key after all
            self.flush_pending();
        }
        if let Some(index) = self.fired.iter().position(|f| f.members.contains(&key)) {
            self.fired[index].state.transition(false);
            if self.fired[index].state.is_finished() {
                self.fired.swap_remove(index);
            }
        }
    }

    /// Withhold the press if it may belong to a combo. Returns whether the
    /// press was claimed.
    fn try_combo(&mut self, key: usize, action: KeyAction, now: Instant) -> bool {
        let top = self.layers.highest();
        let participates = self
            .combos
            .iter()
            .any(|c| c.layer.map_or(true, |l| l == top) && c.contains(action));
        if !participates {
            return false;
        }
        if self.pending.push(PendingPress { key, action, at: now }).is_err() {
            self.flush_pending();
            return false;
        }
        let mut done = None;
        for (index, combo) in self.combos.iter_mut().enumerate() {
            if combo.update(action, top) && combo.done() {
                done = Some(index);
            }
        }
        if let Some(index) = done {
            self.fire_combo(index);
        }
        true
    }

    fn fire_combo(&mut self, index: usize) {
        #[cfg(feature = "defmt")]
        defmt::debug!("combo {} fired", index);

        let output = self.combos[index].output;
        let mut members: Vec<usize, COMBO_MAX_LENGTH> = Vec::new();
        {
            let combo = &self.combos[index];
            for press in self.pending.iter() {
                if combo.contains(press.action) {
                    members.push(press.key).ok();
                }
            }
        }
        let mut rest: Vec<PendingPress, PENDING_MAX> = Vec::new();
        for press in self.pending.iter() {
            if !members.contains(&press.key) {
                rest.push(*press).ok();
            }
        }
        self.pending = rest;

        if let KeyAction::Single(action) = output {
            self.fired
                .push(FiredCombo {
                    state: ButtonState::new(action),
                    members,
                })
                .ok();
        }
        for combo in self.combos.iter_mut() {
            combo.reset();
        }
        if !self.pending.is_empty() {
            self.flush_pending();
        }
    }

    /// Replay withheld presses as ordinary keys, in press order
    fn flush_pending(&mut self) {
        let pending = core::mem::take(&mut self.pending);
        for combo in self.combos.iter_mut() {
            combo.reset();
        }
        for press in pending.iter() {
            self.apply_edge(press.action);
            self.latch(press.key, press.action, press.at);
        }
    }

    /// One-shot effects that fire on the press edge itself
    fn apply_edge(&mut self, action: KeyAction) {
        let single = match action {
            KeyAction::Single(single) => single,
            _ => return,
        };
        match single {
            Action::DefaultLayer(layer) => self.layers.set_default(layer),
            Action::CapsWordToggle => self.caps_word = !self.caps_word,
            Action::LightToggle => {
                self.light_events.push(LightEvent::Toggle).ok();
            }
            Action::LightValUp => {
                self.light_events.push(LightEvent::ValUp).ok();
            }
            Action::LightValDown => {
                self.light_events.push(LightEvent::ValDown).ok();
            }
            Action::TermUp => {
                let term = &mut self.behavior.modtap.mod_timeout;
                *term = (*term + TERM_STEP).min(TERM_MAX);
            }
            Action::TermDown => {
                let term = &mut self.behavior.modtap.mod_timeout;
                *term = term.saturating_sub(TERM_STEP).max(TERM_MIN);
            }
            Action::TermPrint => {
                #[cfg(feature = "defmt")]
                defmt::info!("tapping term: {} ms", self.behavior.modtap.mod_timeout);
            }
            _ => (),
        }
    }

    fn latch(&mut self, key: usize, action: KeyAction, at: Instant) {
        let machine = match action {
            KeyAction::No | KeyAction::Transparent => None,
            KeyAction::Single(single) => match single {
                Action::MomentaryLayer(layer) => {
                    Some(Key::Layer(MomentaryState::new(layer, &mut self.layers)))
                }
                single => Some(Key::Button(ButtonState::new(single))),
            },
            KeyAction::TapHold { tap, hold } => {
                let quick_tap = !self.behavior.quick_tap_exempt.iter().any(|&a| a == action);
                let auto_shiftable = self.behavior.autoshift_actions.iter().any(|&a| a == action);
                Some(Key::ModTap(ModTapState::new(
                    tap,
                    hold,
                    at,
                    &self.behavior.modtap,
                    quick_tap,
                    auto_shiftable,
                )))
            }
            KeyAction::OneShot(single) => {
                let Keymap {
                    layers,
                    behavior,
                    armed_mods,
                    armed_until,
                    ..
                } = self;
                let mut ctx = Context {
                    layers,
                    modtap: &behavior.modtap,
                    autoshift: behavior.autoshift_enabled,
                    armed_mods,
                    armed_until,
                    oneshot_timeout: behavior.oneshot_timeout,
                };
                Some(Key::OneShot(OneShotState::new(single, &mut ctx)))
            }
            KeyAction::TapDance(index) => self
                .tap_dances
                .get(index as usize)
                .copied()
                .map(|config| Key::TapDance(TapDanceState::new(config, at))),
        };
        self.fresh[key] = machine.is_some();
        self.slots[key] = machine;
    }

    fn step_machines(&mut self, presses: &[bool; SIZE], now: Instant) {
        let Keymap {
            slots,
            fresh,
            layers,
            behavior,
            armed_mods,
            armed_until,
            ..
        } = self;
        let mut ctx = Context {
            layers,
            modtap: &behavior.modtap,
            autoshift: behavior.autoshift_enabled,
            armed_mods,
            armed_until,
            oneshot_timeout: behavior.oneshot_timeout,
        };
        for (key, slot) in slots.iter_mut().enumerate() {
            if fresh[key] {
                fresh[key] = false;
                continue;
            }
            if let Some(machine) = slot {
                machine.transition(presses[key], now, &mut ctx);
                if machine.is_finished() {
                    *slot = None;
                }
            }
        }
    }

    fn collect<const ROLLOVER: usize>(&mut self, keys: &mut Vec<Keyboard, ROLLOVER>) {
        let mut emitted_nonmod = false;
        for key in 0..SIZE {
            let machine = match self.slots[key] {
                Some(machine) => machine,
                None => continue,
            };
            if let Some(action) = machine.active() {
                emitted_nonmod |= self.emit(action, keys);
            }
        }
        for index in 0..self.fired.len() {
            let action = self.fired[index].state.active();
            if let Some(action) = action {
                emitted_nonmod |= self.emit(action, keys);
            }
        }
        if !self.armed_mods.is_empty() {
            for code in self.armed_mods.keycodes() {
                if keys.push(code).is_err() {
                    self.flags.rollover = true;
                }
            }
            if emitted_nonmod {
                self.armed_mods = Modifiers::NONE;
            }
        }
    }

    /// Returns whether the action produced a non-modifier usage (which is
    /// what consumes armed one-shot modifiers)
    fn emit<const ROLLOVER: usize>(
        &mut self,
        action: Action,
        keys: &mut Vec<Keyboard, ROLLOVER>,
    ) -> bool {
        match action {
            Action::Key(code) => {
                if self.caps_word {
                    if caps_word_shifts(code) {
                        self.push(Keyboard::LeftShift, keys);
                    } else if !caps_word_keeps(code) && !is_modifier_code(code) {
                        self.caps_word = false;
                    }
                }
                self.push(code, keys);
                !is_modifier_code(code)
            }
            Action::Shifted(code) => {
                if self.caps_word && !caps_word_shifts(code) && !caps_word_keeps(code) {
                    self.caps_word = false;
                }
                self.push(Keyboard::LeftShift, keys);
                self.push(code, keys);
                true
            }
            Action::WithModifiers(code, mods) => {
                if self.caps_word {
                    self.caps_word = false;
                }
                for modifier in mods.keycodes() {
                    self.push(modifier, keys);
                }
                self.push(code, keys);
                true
            }
            Action::Modifier(mods) => {
                for modifier in mods.keycodes() {
                    self.push(modifier, keys);
                }
                false
            }
            Action::Consumer(usage) => {
                self.consumer.push(usage).ok();
                true
            }
            _ => false,
        }
    }

    fn push<const ROLLOVER: usize>(&mut self, code: Keyboard, keys: &mut Vec<Keyboard, ROLLOVER>) {
        if keys.push(code).is_err() {
            #[cfg(feature = "defmt")]
            defmt::trace!("rollover");
            self.flags.rollover = true;
        }
    }

    /// Tap one encoder detent. The encoder map is layer-independent.
    pub fn encoder_update<const ROLLOVER: usize>(
        &mut self,
        encoders: &[EncoderAction],
        index: usize,
        clockwise: bool,
        keys: &mut Vec<Keyboard, ROLLOVER>,
    ) {
        if let Some(encoder) = encoders.get(index) {
            let action = if clockwise {
                encoder.clockwise()
            } else {
                encoder.counter_clockwise()
            };
            self.emit(action, keys);
        }
    }

    pub fn layer_state(&self) -> &LayerState<LAYERS> {
        &self.layers
    }

    pub fn is_layer_active(&self, layer: Layer) -> bool {
        self.layers.is_active(layer)
    }

    pub fn default_layer(&self) -> Layer {
        self.layers.default_layer()
    }

    pub fn caps_word_active(&self) -> bool {
        self.caps_word
    }

    pub fn set_autoshift(&mut self, enabled: bool) {
        self.behavior.autoshift_enabled = enabled;
    }

    pub fn autoshift_enabled(&self) -> bool {
        self.behavior.autoshift_enabled
    }

    pub fn tapping_term(&self) -> Duration {
        self.behavior.modtap.mod_timeout
    }

    pub fn take_light_events(&mut self) -> Vec<LightEvent, 4> {
        core::mem::take(&mut self.light_events)
    }
}

fn caps_word_shifts(code: Keyboard) -> bool {
    // A through Z
    (0x04..=0x1D).contains(&(code as u8))
}

fn caps_word_keeps(code: Keyboard) -> bool {
    // digits, minus, backspace
    (0x1E..=0x27).contains(&(code as u8))
        || matches!(code, Keyboard::Minus | Keyboard::DeleteBackspace)
}

#[macro_export]
macro_rules! make_keymap {
    // To allow `make_keymap![...]` be the same as `make_keymap!([...])`
    ( $( $t:tt ),* $(,)? ) => {[ $( make_action!($t) ),* ]};
}

#[rustfmt::skip]
#[macro_export]
macro_rules! make_key {
    // Shorthands
    (Esc)  => { $crate::keymap::Keyboard::Escape };
    (Tab)  => { $crate::keymap::Keyboard::Tab };
    (Spc)  => { $crate::keymap::Keyboard::Space };
    (Ent)  => { $crate::keymap::Keyboard::ReturnEnter };
    (Bsp)  => { $crate::keymap::Keyboard::DeleteBackspace };
    (Del)  => { $crate::keymap::Keyboard::DeleteForward };
    (Ins)  => { $crate::keymap::Keyboard::Insert };
    (Min)  => { $crate::keymap::Keyboard::Minus };
    (Eql)  => { $crate::keymap::Keyboard::Equal };
    (Bsl)  => { $crate::keymap::Keyboard::Backslash };
    (Grv)  => { $crate::keymap::Keyboard::Grave };
    (Quot) => { $crate::keymap::Keyboard::Apostrophe };
    (Scln) => { $crate::keymap::Keyboard::Semicolon };
    (Comm) => { $crate::keymap::Keyboard::Comma };
    (Slsh) => { $crate::keymap::Keyboard::ForwardSlash };
    (LBrc) => { $crate::keymap::Keyboard::LeftBrace };
    (RBrc) => { $crate::keymap::Keyboard::RightBrace };
    (Home) => { $crate::keymap::Keyboard::Home };
    (End)  => { $crate::keymap::Keyboard::End };
    (PgUp) => { $crate::keymap::Keyboard::PageUp };
    (PgDn) => { $crate::keymap::Keyboard::PageDown };
    (Left) => { $crate::keymap::Keyboard::LeftArrow };
    (Down) => { $crate::keymap::Keyboard::DownArrow };
    (Up)   => { $crate::keymap::Keyboard::UpArrow };
    (Rght) => { $crate::keymap::Keyboard::RightArrow };
    (PScr) => { $crate::keymap::Keyboard::PrintScreen };
    (Paus) => { $crate::keymap::Keyboard::Pause };
    (LSft) => { $crate::keymap::Keyboard::LeftShift };
    (LCtl) => { $crate::keymap::Keyboard::LeftControl };
    (LAlt) => { $crate::keymap::Keyboard::LeftAlt };
    (LGui) => { $crate::keymap::Keyboard::LeftGUI };

    // Have numbers translate to number keys
    ($n:literal) => {
        $crate::keymap::paste! { $crate::keymap::Keyboard::[<Keyboard $n>] }
    };

    // Fallback
    ($i:ident) => { $crate::keymap::Keyboard::$i };
}

#[macro_export]
macro_rules! make_action {
    (___) => { $crate::action::KeyAction::Transparent };
    (XXX) => { $crate::action::KeyAction::No };
    ((MT $mods:ident $tap:tt)) => {
        $crate::action::KeyAction::TapHold {
            tap: $crate::action::Action::Key(make_key!($tap)),
            hold: $crate::action::Action::Modifier($crate::action::Modifiers::$mods),
        }
    };
    ((LT $layer:tt $tap:tt)) => {
        $crate::action::KeyAction::TapHold {
            tap: $crate::action::Action::Key(make_key!($tap)),
            hold: $crate::action::Action::MomentaryLayer($layer),
        }
    };
    ((MO $layer:tt)) => {
        $crate::action::KeyAction::Single($crate::action::Action::MomentaryLayer($layer))
    };
    ((DF $layer:tt)) => {
        $crate::action::KeyAction::Single($crate::action::Action::DefaultLayer($layer))
    };
    ((OSM $mods:ident)) => {
        $crate::action::KeyAction::OneShot($crate::action::Action::Modifier(
            $crate::action::Modifiers::$mods,
        ))
    };
    ((OSL $layer:tt)) => {
        $crate::action::KeyAction::OneShot($crate::action::Action::MomentaryLayer($layer))
    };
    ((TD $index:tt)) => {
        $crate::action::KeyAction::TapDance($index)
    };
    ((SH $key:tt)) => {
        $crate::action::KeyAction::Single($crate::action::Action::Shifted(make_key!($key)))
    };
    ((WM $key:tt $mods:ident)) => {
        $crate::action::KeyAction::Single($crate::action::Action::WithModifiers(
            make_key!($key),
            $crate::action::Modifiers::$mods,
        ))
    };
    ((CS $usage:ident)) => {
        $crate::action::KeyAction::Single($crate::action::Action::Consumer(
            $crate::keymap::Consumer::$usage,
        ))
    };
    // Escape hatch for named aliases
    ({ $action:expr }) => { $action };
    ($key:tt) => {
        $crate::action::KeyAction::Single($crate::action::Action::Key(make_key!($key)))
    };
}

// Export the macros
pub use make_action;
pub use make_key;
pub use make_keymap;

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::action::Keyboard;

    fn no_dances() -> Vec<TapDance, TAP_DANCE_MAX_NUM> {
        Vec::new()
    }

    fn no_combos() -> Vec<Combo, COMBO_MAX_NUM> {
        Vec::new()
    }

    #[test]
    fn plain_keys_report_while_pressed() {
        let map = [make_keymap![A, B, C]];
        let mut keymap: Keymap<3, 1> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[false, false, false], &mut keys, 0);
        assert_eq!(keys, []);

        keymap.process(&[true, false, true], &mut keys, 1);
        assert_eq!(keys, [Keyboard::A, Keyboard::C]);

        keys.clear();
        keymap.process(&[false, false, true], &mut keys, 2);
        assert_eq!(keys, [Keyboard::C]);

        keys.clear();
        keymap.process(&[false, false, false], &mut keys, 3);
        assert_eq!(keys, []);
    }

    #[test]
    fn momentary_layer_shadows_and_transparency_falls_through() {
        let map: [[KeyAction; 3]; 3] = [
            make_keymap![A, (MO 1), (MO 2)],
            make_keymap![B, ___, ___],
            make_keymap![___, ___, ___],
        ];
        let mut keymap: Keymap<3, 3> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        // base layer
        keymap.process(&[true, false, false], &mut keys, 0);
        assert_eq!(keys, [Keyboard::A]);
        keys.clear();
        keymap.process(&[false, false, false], &mut keys, 1);

        // layer 1 shadows the base
        keymap.process(&[false, true, false], &mut keys, 2);
        assert!(keymap.is_layer_active(1));
        keymap.process(&[true, true, false], &mut keys, 3);
        assert_eq!(keys, [Keyboard::B]);
        keys.clear();
        keymap.process(&[false, false, false], &mut keys, 4);
        assert!(!keymap.is_layer_active(1));

        // layer 2 is all transparent: falls through to the base
        keymap.process(&[false, false, true], &mut keys, 5);
        keymap.process(&[true, false, true], &mut keys, 6);
        assert_eq!(keys, [Keyboard::A]);
    }

    #[test]
    fn latched_action_survives_layer_release() {
        let map: [[KeyAction; 2]; 2] = [make_keymap![A, (MO 1)], make_keymap![B, ___]];
        let mut keymap: Keymap<2, 2> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[false, true], &mut keys, 0);
        keymap.process(&[true, true], &mut keys, 1);
        assert_eq!(keys, [Keyboard::B]);

        // layer key released while B is still down: B stays latched
        keys.clear();
        keymap.process(&[true, false], &mut keys, 2);
        assert_eq!(keys, [Keyboard::B]);
    }

    #[test]
    fn default_layer_switch() {
        let map: [[KeyAction; 2]; 2] = [make_keymap![A, (DF 1)], make_keymap![B, (DF 0)]];
        let mut keymap: Keymap<2, 2> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[false, true], &mut keys, 0);
        assert_eq!(keymap.default_layer(), 1);
        keymap.process(&[false, false], &mut keys, 1);

        keymap.process(&[true, false], &mut keys, 2);
        assert_eq!(keys, [Keyboard::B]);
    }

    #[test]
    fn rollover_sets_flag() {
        let map = [make_keymap![A, B]];
        let mut keymap: Keymap<2, 1> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 1> = Vec::new();

        keymap.process(&[true, true], &mut keys, 0);
        assert_eq!(keys, [Keyboard::A]);
        assert!(keymap.flags.rollover);
    }

    #[test]
    fn oneshot_modifier_applies_to_next_key() {
        let map = [make_keymap![(OSM LSFT), A]];
        let mut keymap: Keymap<2, 1> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        // tap the one-shot
        keymap.process(&[true, false], &mut keys, 0);
        assert_eq!(keys, [Keyboard::LeftShift]);
        keys.clear();
        keymap.process(&[false, false], &mut keys, 1);
        // armed: the modifier stays in the report
        assert_eq!(keys, [Keyboard::LeftShift]);

        // next key gets the modifier, which consumes it
        keys.clear();
        keymap.process(&[false, true], &mut keys, 2);
        assert_eq!(keys, [Keyboard::A, Keyboard::LeftShift]);

        keys.clear();
        keymap.process(&[false, true], &mut keys, 3);
        assert_eq!(keys, [Keyboard::A]);
    }

    #[test]
    fn oneshot_expires() {
        let map = [[
            KeyAction::OneShot(Action::Modifier(Modifiers::LSFT)),
            make_action!(A),
        ]];
        let behavior = BehaviorConfig {
            oneshot_timeout: 10,
            ..BehaviorConfig::default()
        };
        let mut keymap: Keymap<2, 1> = Keymap::new(map, behavior, no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[true, false], &mut keys, 0);
        keys.clear();
        keymap.process(&[false, false], &mut keys, 1);
        assert_eq!(keys, [Keyboard::LeftShift]);

        keys.clear();
        keymap.process(&[false, false], &mut keys, 11);
        assert_eq!(keys, []);

        keymap.process(&[false, true], &mut keys, 12);
        assert_eq!(keys, [Keyboard::A]);
    }

    #[test]
    fn combo_fires_within_term() {
        let map = [make_keymap![E, I, A]];
        let mut combos = no_combos();
        combos
            .push(Combo::new(
                [make_action!(E), make_action!(I)],
                make_action!(Scln),
                None,
            ))
            .ok();
        let behavior = BehaviorConfig {
            combo_term: 5,
            ..BehaviorConfig::default()
        };
        let mut keymap: Keymap<3, 1> = Keymap::new(map, behavior, no_dances(), combos);
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[true, false, false], &mut keys, 0);
        assert_eq!(keys, []);

        keymap.process(&[true, true, false], &mut keys, 1);
        assert_eq!(keys, [Keyboard::Semicolon]);

        // held: the substitute stays down, members stay swallowed
        keys.clear();
        keymap.process(&[true, true, false], &mut keys, 2);
        assert_eq!(keys, [Keyboard::Semicolon]);

        keys.clear();
        keymap.process(&[false, true, false], &mut keys, 3);
        assert_eq!(keys, []);

        keys.clear();
        keymap.process(&[false, false, false], &mut keys, 4);
        assert_eq!(keys, []);
    }

    #[test]
    fn lone_member_flushes_after_term() {
        let map = [make_keymap![E, I, A]];
        let mut combos = no_combos();
        combos
            .push(Combo::new(
                [make_action!(E), make_action!(I)],
                make_action!(Scln),
                None,
            ))
            .ok();
        let behavior = BehaviorConfig {
            combo_term: 5,
            ..BehaviorConfig::default()
        };
        let mut keymap: Keymap<3, 1> = Keymap::new(map, behavior, no_dances(), combos);
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[true, false, false], &mut keys, 0);
        assert_eq!(keys, []);
        keymap.process(&[true, false, false], &mut keys, 2);
        assert_eq!(keys, []);

        // window lapses: the withheld press replays as a plain key
        keymap.process(&[true, false, false], &mut keys, 5);
        assert_eq!(keys, [Keyboard::E]);
    }

    #[test]
    fn non_member_press_interrupts_combo() {
        let map = [make_keymap![E, I, A]];
        let mut combos = no_combos();
        combos
            .push(Combo::new(
                [make_action!(E), make_action!(I)],
                make_action!(Scln),
                None,
            ))
            .ok();
        let behavior = BehaviorConfig {
            combo_term: 50,
            ..BehaviorConfig::default()
        };
        let mut keymap: Keymap<3, 1> = Keymap::new(map, behavior, no_dances(), combos);
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[true, false, false], &mut keys, 0);
        assert_eq!(keys, []);

        keymap.process(&[true, false, true], &mut keys, 1);
        assert_eq!(keys, [Keyboard::E, Keyboard::A]);
    }

    #[test]
    fn member_release_flushes_as_tap() {
        let map = [make_keymap![E, I, A]];
        let mut combos = no_combos();
        combos
            .push(Combo::new(
                [make_action!(E), make_action!(I)],
                make_action!(Scln),
                None,
            ))
            .ok();
        let behavior = BehaviorConfig {
            combo_term: 50,
            ..BehaviorConfig::default()
        };
        let mut keymap: Keymap<3, 1> = Keymap::new(map, behavior, no_dances(), combos);
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[true, false, false], &mut keys, 0);
        assert_eq!(keys, []);

        // released before the chord completed: replayed as one E tap,
        // asserted for a single scan
        keymap.process(&[false, false, false], &mut keys, 1);
        assert_eq!(keys, [Keyboard::E]);

        keys.clear();
        keymap.process(&[false, false, false], &mut keys, 2);
        assert_eq!(keys, []);
    }

    #[test]
    fn caps_word_shifts_alphas_until_break() {
        let map = [[
            KeyAction::Single(Action::CapsWordToggle),
            make_action!(A),
            make_action!(1),
            make_action!(Spc),
        ]];
        let mut keymap: Keymap<4, 1> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[true, false, false, false], &mut keys, 0);
        keymap.process(&[false, false, false, false], &mut keys, 1);
        assert!(keymap.caps_word_active());

        keymap.process(&[false, true, false, false], &mut keys, 2);
        assert_eq!(keys, [Keyboard::LeftShift, Keyboard::A]);
        keys.clear();
        keymap.process(&[false, false, false, false], &mut keys, 3);

        // digits pass through unshifted and keep caps-word alive
        keymap.process(&[false, false, true, false], &mut keys, 4);
        assert_eq!(keys, [Keyboard::Keyboard1]);
        assert!(keymap.caps_word_active());
        keys.clear();
        keymap.process(&[false, false, false, false], &mut keys, 5);

        // space breaks it
        keymap.process(&[false, false, false, true], &mut keys, 6);
        assert_eq!(keys, [Keyboard::Space]);
        assert!(!keymap.caps_word_active());
        keys.clear();
        keymap.process(&[false, false, false, false], &mut keys, 7);

        keymap.process(&[false, true, false, false], &mut keys, 8);
        assert_eq!(keys, [Keyboard::A]);
    }

    #[test]
    fn tapping_term_adjustment() {
        let map = [[
            KeyAction::Single(Action::TermUp),
            KeyAction::Single(Action::TermDown),
        ]];
        let mut keymap: Keymap<2, 1> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        assert_eq!(keymap.tapping_term(), 200);
        keymap.process(&[true, false], &mut keys, 0);
        assert_eq!(keymap.tapping_term(), 205);
        keymap.process(&[false, false], &mut keys, 1);
        keymap.process(&[false, true], &mut keys, 2);
        keymap.process(&[false, false], &mut keys, 3);
        keymap.process(&[false, true], &mut keys, 4);
        assert_eq!(keymap.tapping_term(), 195);
    }

    #[test]
    fn light_events_are_queued() {
        let map = [[
            KeyAction::Single(Action::LightToggle),
            KeyAction::Single(Action::LightValUp),
        ]];
        let mut keymap: Keymap<2, 1> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.process(&[true, false], &mut keys, 0);
        keymap.process(&[true, true], &mut keys, 1);
        let events = keymap.take_light_events();
        assert_eq!(events, [LightEvent::Toggle, LightEvent::ValUp]);
        assert!(keymap.take_light_events().is_empty());
    }

    #[test]
    fn encoder_taps() {
        let encoders = [
            EncoderAction::new(
                Action::Consumer(Consumer::VolumeIncrement),
                Action::Consumer(Consumer::VolumeDecrement),
            ),
            EncoderAction::new(
                Action::WithModifiers(Keyboard::Tab, Modifiers::LCTL),
                Action::WithModifiers(Keyboard::Tab, Modifiers::LCTL.union(Modifiers::LSFT)),
            ),
        ];
        let map = [make_keymap![A]];
        let mut keymap: Keymap<1, 1> =
            Keymap::new(map, BehaviorConfig::default(), no_dances(), no_combos());
        let mut keys: Vec<Keyboard, 8> = Vec::new();

        keymap.encoder_update(&encoders, 0, true, &mut keys);
        assert_eq!(keys, []);
        assert_eq!(keymap.consumer, [Consumer::VolumeIncrement]);

        keymap.encoder_update(&encoders, 1, false, &mut keys);
        assert_eq!(
            keys,
            [Keyboard::LeftControl, Keyboard::LeftShift, Keyboard::Tab]
        );
    }
}
