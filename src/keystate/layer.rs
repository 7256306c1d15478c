use super::{Instant, Layer};

/// The shared layer stack: a per-layer active mask, the default layer, and
/// an optionally armed one-shot layer.
///
/// Layers stack by numeric priority: resolution walks from the top layer
/// down and stops at the default layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerState<const LAYERS: usize> {
    active: [bool; LAYERS],
    default_layer: Layer,
    oneshot: Option<(Layer, Instant)>,
}

impl<const LAYERS: usize> LayerState<LAYERS> {
    pub fn new() -> Self {
        LayerState {
            active: [false; LAYERS],
            default_layer: 0,
            oneshot: None,
        }
    }

    pub fn activate(&mut self, layer: Layer) {
        match self.active.get_mut(layer as usize) {
            Some(slot) => *slot = true,
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("layer {} out of range", layer);
            }
        }
    }

    pub fn deactivate(&mut self, layer: Layer) {
        match self.active.get_mut(layer as usize) {
            Some(slot) => *slot = false,
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("layer {} out of range", layer);
            }
        }
    }

    /// Momentary mask only; the default layer is tracked separately
    pub fn is_active(&self, layer: Layer) -> bool {
        self.active.get(layer as usize).copied().unwrap_or(false)
    }

    pub fn set_default(&mut self, layer: Layer) {
        if (layer as usize) < LAYERS {
            self.default_layer = layer;
        }
    }

    pub fn default_layer(&self) -> Layer {
        self.default_layer
    }

    pub fn arm_oneshot(&mut self, layer: Layer, until: Instant) {
        if (layer as usize) < LAYERS {
            self.oneshot = Some((layer, until));
        }
    }

    pub fn consume_oneshot(&mut self) {
        self.oneshot = None;
    }

    pub fn expire_oneshot(&mut self, now: Instant) {
        if let Some((_, until)) = self.oneshot {
            if now >= until {
                self.oneshot = None;
            }
        }
    }

    /// Whether `layer` takes part in action resolution
    pub fn considers(&self, layer: Layer) -> bool {
        self.is_active(layer)
            || layer == self.default_layer
            || matches!(self.oneshot, Some((armed, _)) if armed == layer)
    }

    /// The topmost layer taking part in resolution
    pub fn highest(&self) -> Layer {
        for layer in (0..LAYERS as Layer).rev() {
            if self.considers(layer) {
                return layer;
            }
        }
        self.default_layer
    }
}

impl<const LAYERS: usize> Default for LayerState<LAYERS> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engaged {
    layer: Layer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released;

impl Engaged {
    fn release(&self) -> Released {
        Released
    }
}

/// Momentary layer hold: the layer is active from press edge to release.
///
/// Invariant: release clears exactly the layer the press activated, even if
/// the mapping under the key has changed in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentaryState {
    Engaged(Engaged),
    Released(Released),
}

impl MomentaryState {
    /// Latched at the press edge; activates the layer immediately so that
    /// keys later in the same scan already resolve on it
    pub fn new<const LAYERS: usize>(layer: Layer, layers: &mut LayerState<LAYERS>) -> Self {
        layers.activate(layer);
        Self::Engaged(Engaged { layer })
    }

    pub fn transition<const LAYERS: usize>(
        &mut self,
        pressed: bool,
        layers: &mut LayerState<LAYERS>,
    ) {
        match &self {
            Self::Engaged(state) if !pressed => {
                layers.deactivate(state.layer);
                *self = Self::Released(state.release());
            }
            _ => (),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, MomentaryState::Released(_))
    }
}
