use super::layer::LayerState;
use super::{Duration, Instant};
use crate::action::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModTapConfig {
    /// Time before a held key becomes the hold action instead of the tap
    pub mod_timeout: Duration,
    /// Time during which the tap is asserted after the key is released (it
    /// has to be after the release as only then do we know it isn't a hold)
    pub tap_release: Duration,
    /// Time during which another press repeats the tap instead of
    /// re-entering the hold decision
    pub tap_repeat: Duration,
}

impl Default for ModTapConfig {
    fn default() -> Self {
        ModTapConfig {
            mod_timeout: 200,
            tap_release: 100,
            tap_repeat: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Pressed, deciding between tap and hold
    Deciding { hold_at: Instant, interrupted: bool },
    /// Held past the tapping term
    Holding { interrupted: bool },
    /// Tap asserted, key already released
    Tapping { release_at: Instant, repeat_until: Instant },
    /// Tap window over, a repeat press may still arrive
    Between { until: Instant },
    /// Repeat press holding the tap output
    Repeating,
    Done,
}

/// Tap/hold machine, shared by mod-tap and layer-tap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModTapState {
    tap: Action,
    hold: Action,
    /// When false, a press inside the repeat window re-enters the hold
    /// decision instead of repeating the tap
    quick_tap: bool,
    /// An uninterrupted hold resolves to the shifted tap key while
    /// autoshift is enabled
    auto_shiftable: bool,
    shifted: bool,
    phase: Phase,
}

impl ModTapState {
    pub fn new(
        tap: Action,
        hold: Action,
        at: Instant,
        config: &ModTapConfig,
        quick_tap: bool,
        auto_shiftable: bool,
    ) -> Self {
        ModTapState {
            tap,
            hold,
            quick_tap,
            auto_shiftable,
            shifted: false,
            phase: Phase::Deciding {
                hold_at: at + config.mod_timeout,
                interrupted: false,
            },
        }
    }

    pub fn note_interrupt(&mut self) {
        match &mut self.phase {
            Phase::Deciding { interrupted, .. } => *interrupted = true,
            Phase::Holding { interrupted } => *interrupted = true,
            _ => (),
        }
    }

    pub fn transition<const LAYERS: usize>(
        &mut self,
        pressed: bool,
        now: Instant,
        config: &ModTapConfig,
        autoshift: bool,
        layers: &mut LayerState<LAYERS>,
    ) {
        match self.phase {
            Phase::Deciding {
                hold_at,
                interrupted,
            } if pressed && hold_at <= now => {
                if let Action::MomentaryLayer(layer) = self.hold {
                    layers.activate(layer);
                }
                self.phase = Phase::Holding { interrupted };
            }
            Phase::Deciding { .. } if !pressed => {
                self.phase = Phase::Tapping {
                    release_at: now + config.tap_release,
                    repeat_until: now + config.tap_repeat,
                };
            }
            Phase::Deciding { .. } => (),

            Phase::Holding { interrupted } if !pressed => {
                if let Action::MomentaryLayer(layer) = self.hold {
                    layers.deactivate(layer);
                }
                let retro_shift = autoshift
                    && self.auto_shiftable
                    && !interrupted
                    && matches!(self.hold, Action::Modifier(_));
                if retro_shift {
                    self.shifted = true;
                    self.phase = Phase::Tapping {
                        release_at: now + config.tap_release,
                        repeat_until: now,
                    };
                } else {
                    self.phase = Phase::Done;
                }
            }
            Phase::Holding { .. } => (),

            Phase::Tapping { repeat_until, .. } if pressed => {
                self.repress(now, repeat_until, config);
            }
            Phase::Tapping {
                release_at,
                repeat_until,
            } if release_at <= now => {
                if repeat_until <= now {
                    self.phase = Phase::Done;
                } else {
                    self.phase = Phase::Between {
                        until: repeat_until,
                    };
                }
            }
            Phase::Tapping { .. } => (),

            Phase::Between { until } if pressed => {
                self.repress(now, until, config);
            }
            Phase::Between { until } if until <= now => self.phase = Phase::Done,
            Phase::Between { .. } => (),

            Phase::Repeating if !pressed => {
                self.phase = Phase::Between {
                    until: now + config.tap_repeat,
                };
            }
            Phase::Repeating => (),

            Phase::Done => (),
        }
    }

    fn repress(&mut self, now: Instant, repeat_until: Instant, config: &ModTapConfig) {
        if self.quick_tap && now < repeat_until {
            self.phase = Phase::Repeating;
        } else {
            self.shifted = false;
            self.phase = Phase::Deciding {
                hold_at: now + config.mod_timeout,
                interrupted: false,
            };
        }
    }

    pub fn active(&self) -> Option<Action> {
        match self.phase {
            Phase::Deciding { .. } | Phase::Between { .. } | Phase::Done => None,
            Phase::Holding { .. } => match self.hold {
                Action::MomentaryLayer(_) => None,
                hold => Some(hold),
            },
            Phase::Tapping { .. } | Phase::Repeating => match (self.shifted, self.tap) {
                (true, Action::Key(code)) => Some(Action::Shifted(code)),
                (_, tap) => Some(tap),
            },
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }
}
