#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
// Allow acronyms like LED
#![allow(clippy::upper_case_acronyms)]

//! **evseat: the input seat engine of a native compositor backend**
//!
//! This crate ingests raw Linux input events from a libinput-like
//! [`backend::InputSource`] and turns them into a normalized stream of
//! high-level [`event::Event`]s: pointer motion constrained by barriers,
//! pointer constraints and the monitor layout; buttons and scroll with
//! discrete-step emulation; keyboard keys with xkb state, LED sync and
//! auto-repeat; touch sequences; tablet tools, pads and touchpad gestures.
//!
//! The central type is [`seat::Seat`]. Feed it by polling the source fd and
//! calling [`seat::Seat::dispatch`], or register it on a calloop event loop
//! through [`dispatch::SeatDispatcher`], which also drives the key repeat
//! timer. Compositor-facing notifications that are not input events
//! (touch-mode changes, tool changes, bell, accessibility) arrive at a
//! single [`seat::SeatObserver`] sink.
//!
//! The concrete libinput binding, the cursor renderer and the Wayland
//! protocol layer are external collaborators: the engine only talks to the
//! interfaces in [`backend`] and to the observer.

pub mod backend;
pub mod barrier;
pub mod constraint;
pub mod device;
pub mod dispatch;
pub mod event;
pub mod keyboard;
pub mod seat;
pub mod tablet;
pub mod touch;
pub mod utils;
pub mod viewport;
pub mod virtual_device;

pub use backend::{InputSource, RawEvent};
pub use event::Event;
pub use keyboard::{Error, XkbConfig};
pub use seat::{Seat, SeatObserver};

/// Re-exports of the public dependencies in this crate's API.
pub mod reexports {
    pub use calloop;
    pub use xkbcommon;
}
