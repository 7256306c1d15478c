//! Layered RGB underglow
//!
//! Segment layers are ordered: later layers paint over earlier ones, so the
//! enabled set composites by priority. The physical LED driver consumes the
//! rendered frame elsewhere.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const OFF: Self = Hsv::new(0, 0, 0);

    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Hsv { h, s, v }
    }

    const fn scaled(self, val: u8) -> Self {
        Hsv {
            h: self.h,
            s: self.s,
            v: (self.v as u16 * val as u16 / 255) as u8,
        }
    }
}

/// A contiguous run of LED indices with one color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    pub start: u8,
    pub count: u8,
    pub color: Hsv,
}

impl Segment {
    pub const fn new(start: u8, count: u8, color: Hsv) -> Self {
        Segment {
            start,
            count,
            color,
        }
    }
}

/// Light-control requests raised by the keymap, drained by the board glue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightEvent {
    Toggle,
    ValUp,
    ValDown,
}

const VAL_STEP: u8 = 16;

/// Base fill plus an ordered stack of independently switched segment layers.
pub struct RgbLight<const LEDS: usize, const LAYERS: usize> {
    layers: [&'static [Segment]; LAYERS],
    enabled: [bool; LAYERS],
    base: Hsv,
    on: bool,
    val: u8,
}

impl<const LEDS: usize, const LAYERS: usize> RgbLight<LEDS, LAYERS> {
    pub fn new(layers: [&'static [Segment]; LAYERS]) -> Self {
        RgbLight {
            layers,
            enabled: [false; LAYERS],
            base: Hsv::OFF,
            on: true,
            val: 255,
        }
    }

    pub fn set_base(&mut self, base: Hsv) {
        self.base = base;
    }

    pub fn set_layer_state(&mut self, index: usize, enabled: bool) {
        if let Some(slot) = self.enabled.get_mut(index) {
            *slot = enabled;
        }
    }

    pub fn layer_state(&self, index: usize) -> bool {
        self.enabled.get(index).copied().unwrap_or(false)
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn val(&self) -> u8 {
        self.val
    }

    pub fn toggle(&mut self) {
        self.on = !self.on;
    }

    pub fn increase_val(&mut self) {
        self.val = self.val.saturating_add(VAL_STEP);
    }

    pub fn decrease_val(&mut self) {
        self.val = self.val.saturating_sub(VAL_STEP);
    }

    pub fn apply(&mut self, event: LightEvent) {
        match event {
            LightEvent::Toggle => self.toggle(),
            LightEvent::ValUp => self.increase_val(),
            LightEvent::ValDown => self.decrease_val(),
        }
    }

    /// Composite the enabled layers over the base fill.
    ///
    /// Segments reaching past the strip are clipped.
    pub fn render(&self) -> [Hsv; LEDS] {
        if !self.on {
            return [Hsv::OFF; LEDS];
        }
        let mut frame = [self.base; LEDS];
        for (index, segments) in self.layers.iter().enumerate() {
            if !self.enabled[index] {
                continue;
            }
            for segment in segments.iter() {
                let start = segment.start as usize;
                let end = (start + segment.count as usize).min(LEDS);
                for led in frame.iter_mut().take(end).skip(start) {
                    *led = segment.color;
                }
            }
        }
        if self.val != 255 {
            for led in frame.iter_mut() {
                *led = led.scaled(self.val);
            }
        }
        frame
    }
}
