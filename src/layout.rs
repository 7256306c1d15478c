//! The murtaza64 layout for the splitkb Kyria
//!
//! Colemak-DH base with home-row mods, a combined nav/numpad layer, a
//! symbol layer, function keys, an adjust layer for settings, a one-shot
//! modifier ("Callum") layer and two game layers that swap the default
//! layer. The underglow mirrors whichever layer is on top.
//!
//! Physical positions are flattened row-major: two 12-key rows, the 16-key
//! bottom row (including the inner thumb cluster keys), then the 10 thumb
//! keys.

use embedded_hal::digital::v2::OutputPin;
use heapless::Vec;

use crate::action::{Action, Consumer, KeyAction, Keyboard, Layer, Modifiers};
use crate::combo::{Combo, COMBO_MAX_NUM};
use crate::keymap::{BehaviorConfig, EncoderAction, Keymap, TAP_DANCE_MAX_NUM};
use crate::keystate::tapdance::TapDance;
use crate::rgblight::{Hsv, RgbLight, Segment};
use crate::keymap::make_key;
use crate::{make_action, make_keymap};

pub const COLEMAK_DH: Layer = 0;
pub const ADJUST: Layer = 1;
pub const CALLUM: Layer = 2;
pub const FUNCTION: Layer = 3;
pub const LEAGUE: Layer = 4;
pub const MODS: Layer = 5;
pub const NAV_NUM: Layer = 6;
pub const NUM: Layer = 7;
pub const SYM: Layer = 8;
pub const WASD: Layer = 9;

pub const SIZE: usize = 50;
pub const LAYERS: usize = 10;

pub type KeymapT = Keymap<SIZE, LAYERS>;
pub type RgbLightT = RgbLight<LEDS, LIGHT_LAYERS>;

// Home-row mods, pinky-to-index reading order
pub const R_ALT: KeyAction = make_action!((MT LALT R));
pub const S_CTRL: KeyAction = make_action!((MT LCTL S));
pub const T_SHIFT: KeyAction = make_action!((MT LSFT T));
pub const D_GUI: KeyAction = make_action!((MT LGUI D));
pub const N_SHIFT: KeyAction = make_action!((MT RSFT N));
pub const E_CTRL: KeyAction = make_action!((MT RCTL E));
pub const I_ALT: KeyAction = make_action!((MT RALT I));
pub const H_GUI: KeyAction = make_action!((MT RGUI H));

pub const ESC_CTL: KeyAction = make_action!((MT LCTL Esc));
pub const ENT_SHF: KeyAction = make_action!((MT LSFT Ent));
pub const SYM_BSP: KeyAction = make_action!((LT SYM Bsp));
pub const NAV_SPC: KeyAction = make_action!((LT NAV_NUM Spc));

// Hyper application shortcuts on the Callum layer
const HOMEROW: KeyAction = make_action!((WM Spc HYPR));
const BROWSER: KeyAction = make_action!((WM J HYPR));
const TERMINL: KeyAction = make_action!((WM K HYPR));
const SLACK: KeyAction = make_action!((WM L HYPR));

const CW_TOGG: KeyAction = KeyAction::Single(Action::CapsWordToggle);
const RGB_TOG: KeyAction = KeyAction::Single(Action::LightToggle);
const RGB_VAI: KeyAction = KeyAction::Single(Action::LightValUp);
const RGB_VAD: KeyAction = KeyAction::Single(Action::LightValDown);
const DT_UP: KeyAction = KeyAction::Single(Action::TermUp);
const DT_DOWN: KeyAction = KeyAction::Single(Action::TermDown);
const DT_PRNT: KeyAction = KeyAction::Single(Action::TermPrint);

const DF_COLEMAK: KeyAction = make_action!((DF COLEMAK_DH));
const DF_LEAGUE: KeyAction = make_action!((DF LEAGUE));
const DF_WASD: KeyAction = make_action!((DF WASD));

/// Tap for a right paren, hold for Shift
pub const SH_RP: u8 = 0;

#[rustfmt::skip]
pub const KEYMAP: [[KeyAction; SIZE]; LAYERS] = [
    // COLEMAK_DH
    make_keymap![
        ___,       Q,         W,         F,         P,          B,                                                  J,         L,          U,         Y,         Scln,      XXX,
        Tab,       A,         {R_ALT},   {S_CTRL},  {T_SHIFT},  G,                                                  M,         {N_SHIFT},  {E_CTRL},  {I_ALT},   O,         Quot,
        {CW_TOGG}, Z,         X,         C,         {D_GUI},    V,         XXX,       (CS Mute), XXX,       XXX,    K,         {H_GUI},    Comm,      Dot,       Slsh,      XXX,
                   (MO ADJUST), ___,     {ESC_CTL}, {SYM_BSP},  (OSM LGUI), (OSL CALLUM), {NAV_SPC}, {ENT_SHF}, ___, (MO FUNCTION)
    ],
    // ADJUST
    make_keymap![
        ___,       ___,       ___,       {DF_WASD}, {DT_UP},    ___,                                                ___,       ___,        ___,       ___,       ___,       ___,
        ___,       ___,       ___,       {DF_LEAGUE}, {DT_PRNT}, ___,                                               {RGB_TOG}, ___,        ___,       {RGB_VAI}, ___,       ___,
        ___,       ___,       ___,       {DF_COLEMAK}, {DT_DOWN}, ___,      ___,       ___,       ___,       ___,   ___,       ___,        ___,       {RGB_VAD}, ___,       ___,
                   ___,       ___,       ___,       ___,        ___,        ___,       ___,       ___,       ___,   ___
    ],
    // CALLUM
    make_keymap![
        ___,       ___,       ___,       ___,       {HOMEROW},  ___,                                                ___,       ___,        ___,       ___,       ___,       ___,
        ___,       ___,       (OSM LALT), (OSM LCTL), (OSM LSFT), ___,                                              ___,       {BROWSER},  {TERMINL}, {SLACK},   ___,       ___,
        ___,       ___,       (OSM MEH), (OSM HYPR), (OSM LGUI), ___,       ___,       ___,       ___,       ___,   ___,       ___,        ___,       ___,       ___,       ___,
                   ___,       ___,       ___,       ___,        ___,        ___,       ___,       ___,       ___,   ___
    ],
    // FUNCTION
    make_keymap![
        ___,       ___,       ___,       F12,       F11,        ___,                                                ___,       ___,        ___,       ___,       ___,       ___,
        ___,       F4,        F3,        F2,        F1,         ___,                                                ___,       ___,        ___,       ___,       ___,       ___,
        ___,       F9,        F8,        F7,        F6,         ___,       ___,       ___,       ___,       ___,    ___,       ___,        ___,       ___,       ___,       ___,
                   ___,       ___,       F5,        F10,        ___,        ___,       ___,       ___,       ___,   ___
    ],
    // LEAGUE
    make_keymap![
        Esc,       1,         2,         3,         4,          5,                                                  {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK},
        Tab,       Q,         W,         E,         R,          T,                                                  {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK},
        P,         A,         S,         D,         F,          B,         XXX,       (CS Mute), {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK},
                   LSft,      LCtl,      LAlt,      Spc,        XXX,        {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}
    ],
    // MODS
    make_keymap![
        ___,       ___,       ___,       ___,       ___,        ___,                                                ___,       ___,        ___,       ___,       ___,       ___,
        ___,       ___,       (OSM LALT), (OSM LCTL), (OSM LSFT), ___,                                              ___,       (OSM RSFT), (OSM RCTL), (OSM RALT), ___,      ___,
        ___,       ___,       ___,       ___,       (OSM LGUI), ___,       ___,       ___,       ___,       ___,    ___,       (OSM RGUI), ___,       ___,       ___,       ___,
                   ___,       ___,       ___,       ___,        ___,        ___,       ___,       ___,       ___,   ___
    ],
    // NAV_NUM
    make_keymap![
        ___,       ___,       7,         8,         9,          ___,                                                Home,      PgDn,       PgUp,      End,       ___,       Del,
        ___,       0,         4,         5,         6,          ___,                                                Left,      Down,       Up,        Rght,      ___,       Ins,
        ___,       ___,       1,         2,         3,          ___,       ___,       ___,       ___,       ___,    (CS ScanPreviousTrack), (CS PlayPause), ___, (CS ScanNextTrack), Paus, PScr,
                   ___,       ___,       ___,       ___,        ___,        ___,       ___,       ___,       ___,   ___
    ],
    // NUM
    make_keymap![
        ___,       ___,       ___,       ___,       ___,        ___,                                                ___,       ___,        ___,       ___,       ___,       ___,
        ___,       7,         5,         3,         1,          ___,                                                ___,       0,          2,         4,         6,         ___,
        ___,       ___,       ___,       ___,       9,          ___,       ___,       ___,       ___,       ___,    ___,       8,          ___,       ___,       ___,       ___,
                   ___,       ___,       ___,       ___,        ___,        ___,       ___,       ___,       ___,   ___
    ],
    // SYM
    make_keymap![
        ___,       ___,       Grv,       LBrc,      RBrc,       (SH 7),                                             ___,       (SH Eql),   (SH 1),    (SH 2),    ___,       ___,
        ___,       (SH 3),    (SH Grv),  (SH 9),    (TD SH_RP), (SH Bsl),                                           (SH 8),    Min,        Eql,       (SH 4),    Bsl,       ___,
        ___,       ___,       ___,       (SH LBrc), (SH RBrc),  (SH 6),    ___,       ___,       ___,       ___,    (SH 5),    (SH Min),   ___,       ___,       ___,       ___,
                   ___,       ___,       ___,       ___,        ___,        ___,       ___,       ___,       ___,   ___
    ],
    // WASD
    make_keymap![
        Esc,       1,         Q,         X,         E,          R,                                                  {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK},
        Tab,       LSft,      A,         W,         D,          F,                                                  {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK},
        LCtl,      2,         Z,         S,         C,          XXX,       XXX,       (CS Mute), {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK},
                   4,         3,         LAlt,      Spc,        XXX,        {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}, {DF_COLEMAK}
    ],
];

pub fn combos() -> Vec<Combo, COMBO_MAX_NUM> {
    let mut combos = Vec::new();
    combos
        .push(Combo::new([E_CTRL, I_ALT], make_action!(Scln), None))
        .ok();
    combos
        .push(Combo::new([R_ALT, S_CTRL], make_action!(Q), None))
        .ok();
    combos
        .push(Combo::new([make_action!(L), N_SHIFT], make_action!(J), None))
        .ok();
    combos
        .push(Combo::new([make_action!(P), T_SHIFT], make_action!(B), None))
        .ok();
    combos
}

pub fn tap_dances() -> Vec<TapDance, TAP_DANCE_MAX_NUM> {
    let mut dances = Vec::new();
    dances
        .push(TapDance {
            tap: Some(Action::Shifted(Keyboard::Keyboard0)),
            hold: Some(Action::Modifier(Modifiers::LSFT)),
            ..TapDance::default()
        })
        .ok();
    dances
}

pub fn behavior() -> BehaviorConfig {
    let mut behavior = BehaviorConfig::default();
    // tap-then-hold on the symbol-layer backspace should reach the layer,
    // not key auto-repeat
    behavior.quick_tap_exempt.push(SYM_BSP).ok();
    for action in [
        N_SHIFT, E_CTRL, I_ALT, H_GUI, T_SHIFT, S_CTRL, R_ALT, D_GUI,
    ] {
        behavior.autoshift_actions.push(action).ok();
    }
    behavior
}

pub fn keymap() -> KeymapT {
    Keymap::new(KEYMAP, behavior(), tap_dances(), combos())
}

pub const ENCODERS: [EncoderAction; 2] = [
    // volume
    EncoderAction::new(
        Action::Consumer(Consumer::VolumeIncrement),
        Action::Consumer(Consumer::VolumeDecrement),
    ),
    // browser tabs
    EncoderAction::new(
        Action::WithModifiers(Keyboard::Tab, Modifiers::LCTL),
        Action::WithModifiers(Keyboard::Tab, Modifiers::LCTL.union(Modifiers::LSFT)),
    ),
];

// RGB index map
// LEFT UNDERGLOW: 0..6                                  RIGHT UNDERGLOW: 31..37
//   30, 29, 28, 27, 26, 25,                             56, 57, 58, 59, 60, 61,
//   24, 23, 22, 21, 20, 19,                             50, 51, 52, 53, 54, 55,
//   18, 17, 16, 15, 14, 13, 12, 11,    42, 43,  44, 45, 46, 47, 48, 49,
//               10,  9,  8,  7,  6,    37, 38, 39, 40, 41

pub const LEDS: usize = 62;
pub const LIGHT_LAYERS: usize = 7;

const LEFT_UNDER: (u8, u8) = (0, 6);
const LEFT_KEYS: (u8, u8) = (6, 25);
const RIGHT_UNDER: (u8, u8) = (31, 6);
const RIGHT_KEYS: (u8, u8) = (37, 25);
const RIGHT_ALL: (u8, u8) = (31, 31);
const BOTH_ALL: (u8, u8) = (0, 62);

const HSV_BASE_WHITE: Hsv = Hsv::new(230, 60, 255);
const HSV_SYM_YELLOW: Hsv = Hsv::new(40, 180, 255);
const HSV_NAV_BLUE: Hsv = Hsv::new(150, 128, 255);
const HSV_NUM_GREEN: Hsv = Hsv::new(80, 160, 255);
const HSV_FUNC_PURPLE: Hsv = Hsv::new(200, 160, 255);
const HSV_ADJ_RED: Hsv = Hsv::new(10, 160, 255);
const HSV_DIM: Hsv = Hsv::new(230, 60, 50);

const fn run(region: (u8, u8), color: Hsv) -> Segment {
    Segment::new(region.0, region.1, color)
}

static BASE_LIGHT: [Segment; 5] = [
    run(BOTH_ALL, HSV_BASE_WHITE),
    Segment::new(38, 1, HSV_NAV_BLUE),
    Segment::new(41, 1, HSV_FUNC_PURPLE),
    Segment::new(7, 1, HSV_SYM_YELLOW),
    Segment::new(10, 1, HSV_ADJ_RED),
];

static SYM_LIGHT: [Segment; 11] = [
    run(LEFT_KEYS, HSV_DIM),
    run(RIGHT_KEYS, HSV_DIM),
    Segment::new(7, 1, HSV_SYM_YELLOW),
    Segment::new(13, 3, HSV_SYM_YELLOW),
    Segment::new(19, 5, HSV_SYM_YELLOW),
    Segment::new(25, 4, HSV_SYM_YELLOW),
    Segment::new(44, 2, HSV_SYM_YELLOW),
    Segment::new(50, 5, HSV_SYM_YELLOW),
    Segment::new(57, 3, HSV_SYM_YELLOW),
    run(LEFT_UNDER, HSV_SYM_YELLOW),
    run(RIGHT_UNDER, HSV_SYM_YELLOW),
];

static NAV_NUM_LIGHT: [Segment; 14] = [
    run(LEFT_KEYS, HSV_DIM),
    run(RIGHT_KEYS, HSV_DIM),
    Segment::new(38, 1, HSV_NAV_BLUE),
    Segment::new(14, 4, HSV_NUM_GREEN),
    Segment::new(20, 4, HSV_NUM_GREEN),
    Segment::new(7, 2, HSV_NUM_GREEN),
    run(LEFT_UNDER, HSV_NUM_GREEN),
    Segment::new(61, 1, HSV_NAV_BLUE),
    Segment::new(56, 4, HSV_NAV_BLUE),
    Segment::new(55, 1, HSV_NAV_BLUE),
    Segment::new(50, 4, HSV_NAV_BLUE),
    Segment::new(47, 3, HSV_NAV_BLUE),
    Segment::new(44, 2, HSV_NAV_BLUE),
    run(RIGHT_UNDER, HSV_NAV_BLUE),
];

static FUNC_LIGHT: [Segment; 8] = [
    run(LEFT_KEYS, HSV_DIM),
    run(RIGHT_KEYS, HSV_DIM),
    Segment::new(41, 1, HSV_FUNC_PURPLE),
    Segment::new(14, 4, HSV_FUNC_PURPLE),
    Segment::new(20, 4, HSV_FUNC_PURPLE),
    Segment::new(7, 2, HSV_FUNC_PURPLE),
    Segment::new(26, 2, HSV_FUNC_PURPLE),
    run(LEFT_UNDER, HSV_FUNC_PURPLE),
];

static CAPS_WORD_LIGHT: [Segment; 1] = [Segment::new(18, 1, HSV_NUM_GREEN)];

static LEAGUE_LIGHT: [Segment; 4] = [
    run(LEFT_UNDER, Hsv::new(160, 180, 255)),
    run(LEFT_KEYS, Hsv::new(27, 220, 255)),
    Segment::new(20, 4, Hsv::new(160, 180, 255)),
    run(RIGHT_ALL, HSV_DIM),
];

static ADJ_LIGHT: [Segment; 9] = [
    run(LEFT_KEYS, HSV_DIM),
    run(RIGHT_KEYS, HSV_DIM),
    Segment::new(10, 1, HSV_ADJ_RED),
    Segment::new(50, 1, HSV_ADJ_RED),
    Segment::new(15, 1, HSV_ADJ_RED),
    Segment::new(21, 1, HSV_ADJ_RED),
    Segment::new(27, 1, HSV_ADJ_RED),
    run(LEFT_UNDER, HSV_ADJ_RED),
    run(RIGHT_UNDER, HSV_ADJ_RED),
];

pub fn rgb_light() -> RgbLightT {
    RgbLight::new([
        &BASE_LIGHT,
        &SYM_LIGHT,
        &NAV_NUM_LIGHT,
        &FUNC_LIGHT,
        &CAPS_WORD_LIGHT,
        &LEAGUE_LIGHT,
        &ADJ_LIGHT,
    ])
}

/// Mirror keymap state into the underglow and the autoshift gate after a
/// scan, the way the firmware's layer-change callbacks would.
pub fn sync(keymap: &mut KeymapT, light: &mut RgbLightT) {
    light.set_layer_state(1, keymap.is_layer_active(SYM));
    light.set_layer_state(2, keymap.is_layer_active(NAV_NUM));
    light.set_layer_state(3, keymap.is_layer_active(FUNCTION));
    light.set_layer_state(6, keymap.is_layer_active(ADJUST));

    let default = keymap.default_layer();
    light.set_layer_state(0, default == COLEMAK_DH);
    light.set_layer_state(5, default == LEAGUE);
    // autoshift gets in the way of game inputs
    keymap.set_autoshift(default != LEAGUE);

    light.set_layer_state(4, keymap.caps_word_active());

    for event in keymap.take_light_events() {
        light.apply(event);
    }
}

/// Board bring-up the keymap owns: park the controller's onboard status
/// LED and seed the base underglow color.
pub fn post_init<P: OutputPin>(status_led: &mut P, light: &mut RgbLightT) -> Result<(), P::Error> {
    status_led.set_high()?;
    light.set_base(HSV_BASE_WHITE);
    light.set_layer_state(0, true);
    Ok(())
}
