//! Per-key state machines
//!
//! A machine is latched to a key at its press edge, carrying the action the
//! layer stack resolved for it, and lives until it reports finished. That
//! can be after the physical release, since tap outputs are asserted during
//! a window that starts when the key comes back up.

use crate::action::{Action, Modifiers};

pub mod button;
pub mod layer;
pub mod modtap;
pub mod oneshot;
pub mod tapdance;

pub use crate::action::Layer;

pub type Duration = u64;
pub type Instant = u64;

/// Everything a machine transition may touch besides its own state.
pub struct Context<'a, const LAYERS: usize> {
    pub layers: &'a mut layer::LayerState<LAYERS>,
    pub modtap: &'a modtap::ModTapConfig,
    pub autoshift: bool,
    pub armed_mods: &'a mut Modifiers,
    pub armed_until: &'a mut Instant,
    pub oneshot_timeout: Duration,
}

/// A live machine latched to a pressed key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Button(button::ButtonState),
    Layer(layer::MomentaryState),
    ModTap(modtap::ModTapState),
    OneShot(oneshot::OneShotState),
    TapDance(tapdance::TapDanceState),
}

impl Key {
    /// Whether the slot can be re-latched (and the MCU go to sleep, if every
    /// key is finished)
    pub fn is_finished(&self) -> bool {
        match self {
            Key::Button(state) => state.is_finished(),
            Key::Layer(state) => state.is_finished(),
            Key::ModTap(state) => state.is_finished(),
            Key::OneShot(state) => state.is_finished(),
            Key::TapDance(state) => state.is_finished(),
        }
    }

    /// The action this machine currently asserts, if any
    pub fn active(&self) -> Option<Action> {
        match self {
            Key::Button(state) => state.active(),
            Key::Layer(_) => None,
            Key::ModTap(state) => state.active(),
            Key::OneShot(state) => state.active(),
            Key::TapDance(state) => state.active(),
        }
    }

    /// Another key was pressed while this machine is live
    pub fn note_interrupt(&mut self) {
        match self {
            Key::ModTap(state) => state.note_interrupt(),
            Key::OneShot(state) => state.note_interrupt(),
            _ => (),
        }
    }

    pub fn transition<const LAYERS: usize>(
        &mut self,
        pressed: bool,
        now: Instant,
        ctx: &mut Context<LAYERS>,
    ) {
        match self {
            Key::Button(state) => state.transition(pressed),
            Key::Layer(state) => state.transition(pressed, ctx.layers),
            Key::ModTap(state) => {
                state.transition(pressed, now, ctx.modtap, ctx.autoshift, ctx.layers)
            }
            Key::OneShot(state) => state.transition(pressed, now, ctx),
            Key::TapDance(state) => state.transition(pressed, now, ctx.modtap, ctx.layers),
        }
    }
}
