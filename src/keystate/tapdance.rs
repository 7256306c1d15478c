use super::layer::LayerState;
use super::modtap::ModTapConfig;
use super::{Duration, Instant};
use crate::action::Action;

/// One entry in the tap-dance table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TapDance {
    pub tap: Option<Action>,
    pub hold: Option<Action>,
    pub hold_after_tap: Option<Action>,
    pub double_tap: Option<Action>,
    pub tapping_term: Duration,
}

impl Default for TapDance {
    fn default() -> Self {
        TapDance {
            tap: None,
            hold: None,
            hold_after_tap: None,
            double_tap: None,
            tapping_term: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Pressed, waiting for the term to decide tap vs hold
    Pressed { count: u8, hold_at: Instant },
    /// Held past the term
    Holding { action: Action },
    /// Tap action asserted, emitted as soon as the key came back up
    Emitting {
        action: Action,
        release_at: Instant,
        until: Instant,
    },
    /// Assertion over, a follow-up tap may still arrive
    Between { until: Instant },
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapDanceState {
    config: TapDance,
    phase: Phase,
}

impl TapDanceState {
    pub fn new(config: TapDance, at: Instant) -> Self {
        TapDanceState {
            phase: Phase::Pressed {
                count: 1,
                hold_at: at + config.tapping_term,
            },
            config,
        }
    }

    pub fn transition<const LAYERS: usize>(
        &mut self,
        pressed: bool,
        now: Instant,
        modtap: &ModTapConfig,
        layers: &mut LayerState<LAYERS>,
    ) {
        match self.phase {
            Phase::Pressed { count, hold_at } if pressed && hold_at <= now => {
                let hold = if count < 2 {
                    self.config.hold
                } else {
                    self.config.hold_after_tap
                };
                match hold.or(self.config.tap) {
                    Some(action) => {
                        if let Action::MomentaryLayer(layer) = action {
                            layers.activate(layer);
                        }
                        self.phase = Phase::Holding { action };
                    }
                    None => self.phase = Phase::Done,
                }
            }
            Phase::Pressed { count, .. } if !pressed => {
                // tap early: assert the tap output on the release edge
                // instead of waiting out the term
                let tap = if count < 2 {
                    self.config.tap
                } else {
                    self.config.double_tap.or(self.config.tap)
                };
                match tap {
                    Some(action) => {
                        self.phase = Phase::Emitting {
                            action,
                            release_at: now + modtap.tap_release,
                            until: now + self.config.tapping_term,
                        };
                    }
                    None => self.phase = Phase::Done,
                }
            }
            Phase::Pressed { .. } => (),

            Phase::Holding { action } if !pressed => {
                if let Action::MomentaryLayer(layer) = action {
                    layers.deactivate(layer);
                }
                self.phase = Phase::Done;
            }
            Phase::Holding { .. } => (),

            Phase::Emitting { .. } if pressed => {
                self.phase = Phase::Pressed {
                    count: 2,
                    hold_at: now + self.config.tapping_term,
                };
            }
            Phase::Emitting {
                release_at, until, ..
            } if release_at <= now => {
                if until <= now {
                    self.phase = Phase::Done;
                } else {
                    self.phase = Phase::Between { until };
                }
            }
            Phase::Emitting { .. } => (),

            Phase::Between { until } if pressed => {
                let count = if now < until { 2 } else { 1 };
                self.phase = Phase::Pressed {
                    count,
                    hold_at: now + self.config.tapping_term,
                };
            }
            Phase::Between { until } if until <= now => self.phase = Phase::Done,
            Phase::Between { .. } => (),

            Phase::Done => (),
        }
    }

    pub fn active(&self) -> Option<Action> {
        match self.phase {
            Phase::Holding { action } => match action {
                Action::MomentaryLayer(_) => None,
                action => Some(action),
            },
            Phase::Emitting { action, .. } => Some(action),
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

    use super::*;
    use crate::action::{Keyboard, Modifiers};

    const MODTAP: ModTapConfig = ModTapConfig {
        mod_timeout: 2,
        tap_release: 2,
        tap_repeat: 6,
    };

    fn shift_paren() -> TapDance {
        TapDance {
            tap: Some(Action::Shifted(Keyboard::Keyboard0)),
            hold: Some(Action::Modifier(Modifiers::LSFT)),
            tapping_term: 4,
            ..TapDance::default()
        }
    }

    #[test]
    fn tap_emits_early_on_release() {
        let mut layers = LayerState::<2>::new();
        let mut state = TapDanceState::new(shift_paren(), 0);
        assert_eq!(state.active(), None);

        state.transition(false, 1, &MODTAP, &mut layers);
        assert_eq!(state.active(), Some(Action::Shifted(Keyboard::Keyboard0)));

        state.transition(false, 3, &MODTAP, &mut layers);
        assert_eq!(state.active(), None);
        state.transition(false, 5, &MODTAP, &mut layers);
        assert!(state.is_finished());
    }

    #[test]
    fn hold_engages_hold_action() {
        let mut layers = LayerState::<2>::new();
        let mut state = TapDanceState::new(shift_paren(), 0);

        state.transition(true, 4, &MODTAP, &mut layers);
        assert_eq!(state.active(), Some(Action::Modifier(Modifiers::LSFT)));
        state.transition(true, 9, &MODTAP, &mut layers);
        assert_eq!(state.active(), Some(Action::Modifier(Modifiers::LSFT)));

        state.transition(false, 10, &MODTAP, &mut layers);
        assert_eq!(state.active(), None);
        assert!(state.is_finished());
    }

    #[test]
    fn double_tap_falls_back_to_tap() {
        let mut layers = LayerState::<2>::new();
        let mut state = TapDanceState::new(shift_paren(), 0);

        state.transition(false, 1, &MODTAP, &mut layers);
        state.transition(true, 2, &MODTAP, &mut layers);
        assert_eq!(state.active(), None);
        state.transition(false, 3, &MODTAP, &mut layers);
        // no double_tap configured, so the second tap repeats the tap
        assert_eq!(state.active(), Some(Action::Shifted(Keyboard::Keyboard0)));
        state.transition(false, 5, &MODTAP, &mut layers);
        state.transition(false, 7, &MODTAP, &mut layers);
        assert!(state.is_finished());
    }

    #[test]
    fn hold_after_tap() {
        let mut layers = LayerState::<2>::new();
        let mut config = shift_paren();
        config.hold_after_tap = Some(Action::Key(Keyboard::F));
        let mut state = TapDanceState::new(config, 0);

        state.transition(false, 1, &MODTAP, &mut layers);
        state.transition(true, 2, &MODTAP, &mut layers);
        state.transition(true, 6, &MODTAP, &mut layers);
        assert_eq!(state.active(), Some(Action::Key(Keyboard::F)));
        state.transition(false, 7, &MODTAP, &mut layers);
        assert!(state.is_finished());
    }
}
