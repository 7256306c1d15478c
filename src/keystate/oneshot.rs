use super::{Context, Instant};
use crate::action::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Pressed; acts as a plain momentary modifier or layer
    Held { interrupted: bool },
    Done,
}

/// One-shot modifier or one-shot layer.
///
/// A tap (press and release with no other key in between) arms the action
/// for exactly the next key; holding it uses it as a plain momentary
/// modifier or layer. The armed state expires after the one-shot timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneShotState {
    action: Action,
    phase: Phase,
}

impl OneShotState {
    pub fn new<const LAYERS: usize>(action: Action, ctx: &mut Context<LAYERS>) -> Self {
        if let Action::MomentaryLayer(layer) = action {
            ctx.layers.activate(layer);
        }
        OneShotState {
            action,
            phase: Phase::Held { interrupted: false },
        }
    }

    pub fn note_interrupt(&mut self) {
        if let Phase::Held { interrupted } = &mut self.phase {
            *interrupted = true;
        }
    }

    pub fn transition<const LAYERS: usize>(
        &mut self,
        pressed: bool,
        now: Instant,
        ctx: &mut Context<LAYERS>,
    ) {
        match self.phase {
            Phase::Held { interrupted } if !pressed => {
                match self.action {
                    Action::MomentaryLayer(layer) => {
                        ctx.layers.deactivate(layer);
                        if !interrupted {
                            ctx.layers.arm_oneshot(layer, now + ctx.oneshot_timeout);
                        }
                    }
                    Action::Modifier(mods) if !interrupted => {
                        *ctx.armed_mods = ctx.armed_mods.union(mods);
                        *ctx.armed_until = now + ctx.oneshot_timeout;
                    }
                    _ => (),
                }
                self.phase = Phase::Done;
            }
            _ => (),
        }
    }

    /// While held, a one-shot modifier behaves as the modifier itself
    pub fn active(&self) -> Option<Action> {
        match (self.phase, self.action) {
            (Phase::Held { .. }, Action::Modifier(mods)) => Some(Action::Modifier(mods)),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::super::layer::LayerState;
    use super::super::modtap::ModTapConfig;
    use super::*;
    use crate::action::Modifiers;

    fn ctx<'a>(
        layers: &'a mut LayerState<4>,
        armed_mods: &'a mut Modifiers,
        armed_until: &'a mut Instant,
        modtap: &'a ModTapConfig,
    ) -> Context<'a, 4> {
        Context {
            layers,
            modtap,
            autoshift: false,
            armed_mods,
            armed_until,
            oneshot_timeout: 100,
        }
    }

    #[test]
    fn tap_arms_modifier() {
        let mut layers = LayerState::new();
        let mut mods = Modifiers::NONE;
        let mut until = 0;
        let modtap = ModTapConfig::default();
        let mut ctx = ctx(&mut layers, &mut mods, &mut until, &modtap);

        let mut state = OneShotState::new(Action::Modifier(Modifiers::LGUI), &mut ctx);
        assert_eq!(state.active(), Some(Action::Modifier(Modifiers::LGUI)));

        state.transition(false, 5, &mut ctx);
        assert!(state.is_finished());
        assert_eq!(state.active(), None);
        assert!(mods.contains(Modifiers::LGUI));
        assert_eq!(until, 105);
    }

    #[test]
    fn interrupted_hold_does_not_arm() {
        let mut layers = LayerState::new();
        let mut mods = Modifiers::NONE;
        let mut until = 0;
        let modtap = ModTapConfig::default();
        let mut ctx = ctx(&mut layers, &mut mods, &mut until, &modtap);

        let mut state = OneShotState::new(Action::Modifier(Modifiers::LSFT), &mut ctx);
        state.note_interrupt();
        state.transition(false, 5, &mut ctx);
        assert!(state.is_finished());
        assert!(mods.is_empty());
    }

    #[test]
    fn oneshot_layer_arms_and_momentarily_activates() {
        let mut layers = LayerState::new();
        let mut mods = Modifiers::NONE;
        let mut until = 0;
        let modtap = ModTapConfig::default();
        let mut ctx = ctx(&mut layers, &mut mods, &mut until, &modtap);

        let mut state = OneShotState::new(Action::MomentaryLayer(2), &mut ctx);
        assert!(ctx.layers.is_active(2));
        assert_eq!(state.active(), None);

        state.transition(false, 5, &mut ctx);
        assert!(!ctx.layers.is_active(2));
        assert!(ctx.layers.considers(2));

        ctx.layers.consume_oneshot();
        assert!(!ctx.layers.considers(2));
    }
}
