//! Keymap firmware core for a splitkb Kyria.
//!
//! The board side delivers debounced per-key press states once per scan;
//! this crate turns them into HID keycode sets plus an RGB underglow frame.
//! Matrix scanning, debouncing, the USB/BLE transport and the LED driver
//! live outside this crate.

#![no_std]

pub mod action;
pub mod combo;
pub mod keymap;
pub mod keystate;
pub mod layout;
pub mod rgblight;
