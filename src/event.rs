//! High-level events produced by the seat.
//!
//! Every event carries the millisecond timestamp, the modifier state at the
//! time of the event, the associated (logical) device and the physical
//! source device, plus the platform data the original event system kept out
//! of band: the microsecond timestamp, the evdev event code and, for
//! relative motion, the filtered and unaccelerated deltas.

use bitflags::bitflags;
use xkbcommon::xkb;

use crate::device::DeviceId;
use crate::tablet::ToolId;

/// Scroll step at which accumulated smooth scroll emits a discrete event.
pub const DISCRETE_SCROLL_STEP: f64 = 10.0;

pub(crate) fn us2ms(time_us: u64) -> u32 {
    (time_us / 1000) as u32
}

bitflags! {
    /// Modifier state, combining keyboard modifiers and pointer buttons.
    ///
    /// The low byte matches the xkb serialization of the effective
    /// modifiers; buttons 1..=5 occupy the following bits.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        /// Shift.
        const SHIFT = 1 << 0;
        /// Caps lock.
        const LOCK = 1 << 1;
        /// Control.
        const CONTROL = 1 << 2;
        /// Mod1 (usually Alt).
        const MOD1 = 1 << 3;
        /// Mod2 (usually Num lock).
        const MOD2 = 1 << 4;
        /// Mod3.
        const MOD3 = 1 << 5;
        /// Mod4 (usually Super).
        const MOD4 = 1 << 6;
        /// Mod5.
        const MOD5 = 1 << 7;
        /// Button 1.
        const BUTTON1 = 1 << 8;
        /// Button 2.
        const BUTTON2 = 1 << 9;
        /// Button 3.
        const BUTTON3 = 1 << 10;
        /// Button 4.
        const BUTTON4 = 1 << 11;
        /// Button 5.
        const BUTTON5 = 1 << 12;
    }
}

bitflags! {
    /// Flags qualifying an event.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventFlags: u32 {
        /// Synthetic key press produced by the auto-repeat timer.
        const REPEATED = 1 << 0;
        /// Discrete scroll emulated from accumulated smooth scroll.
        const POINTER_EMULATED = 1 << 1;
    }
}

bitflags! {
    /// Termination markers for smooth scroll sequences.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScrollFinishFlags: u32 {
        /// The horizontal axis sequence finished.
        const HORIZONTAL = 1 << 0;
        /// The vertical axis sequence finished.
        const VERTICAL = 1 << 1;
    }
}

/// What produced a scroll event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollSource {
    /// Scroll wheel clicks.
    Wheel,
    /// Finger scrolling on a touchpad.
    Finger,
    /// Continuous scrolling device.
    Continuous,
    /// Source not representable downstream (wheel tilt and friends).
    Unknown,
}

/// Direction of a discrete scroll event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    /// Scroll up.
    Up,
    /// Scroll down.
    Down,
    /// Scroll left.
    Left,
    /// Scroll right.
    Right,
}

/// Phase of a touchpad gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GesturePhase {
    /// Gesture started.
    Begin,
    /// Gesture progressed.
    Update,
    /// Gesture finished normally.
    End,
    /// Gesture was cancelled.
    Cancel,
}

/// What manipulated a pad ring or strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadSource {
    /// A finger on the ring or strip.
    Finger,
    /// Unknown interaction source.
    Unknown,
}

/// Identifier of a touch sequence, derived from the seat slot.
///
/// The value is `max(1, seat_slot + 1)` so that a sequence handle is never
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TouchSequence(u32);

impl TouchSequence {
    pub(crate) fn from_slot(seat_slot: i32) -> TouchSequence {
        TouchSequence((seat_slot + 1).max(1) as u32)
    }

    /// The seat slot this sequence stands for.
    pub fn slot(self) -> i32 {
        self.0 as i32 - 1
    }

    /// Raw non-zero sequence value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Relative motion attached to a pointer motion event.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RelativeMotion {
    /// Filtered horizontal delta actually applied to the pointer.
    pub dx: f64,
    /// Filtered vertical delta actually applied to the pointer.
    pub dy: f64,
    /// Unaccelerated horizontal delta from the device.
    pub dx_unaccel: f64,
    /// Unaccelerated vertical delta from the device.
    pub dy_unaccel: f64,
}

/// Event-kind specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A device was added to the seat.
    DeviceAdded,
    /// A device was removed from the seat.
    DeviceRemoved,
    /// Pointer or tablet tool motion.
    Motion {
        /// Final horizontal position in stage coordinates.
        x: f64,
        /// Final vertical position in stage coordinates.
        y: f64,
        /// Dense tablet axis vector, if the source is a tablet tool.
        axes: Option<Vec<f64>>,
        /// Tool in proximity, for tablet events.
        tool: Option<ToolId>,
    },
    /// A logical button was pressed.
    ButtonPress {
        /// Logical button number (1..=12).
        button: u32,
        /// Horizontal position at press time.
        x: f64,
        /// Vertical position at press time.
        y: f64,
        /// Tool in proximity, for tablet events.
        tool: Option<ToolId>,
    },
    /// A logical button was released.
    ButtonRelease {
        /// Logical button number (1..=12).
        button: u32,
        /// Horizontal position at release time.
        x: f64,
        /// Vertical position at release time.
        y: f64,
        /// Tool in proximity, for tablet events.
        tool: Option<ToolId>,
    },
    /// Smooth scroll motion.
    ScrollSmooth {
        /// Horizontal delta in discrete-step units (pixels / 10).
        dx: f64,
        /// Vertical delta in discrete-step units (pixels / 10).
        dy: f64,
        /// What produced the scroll.
        source: ScrollSource,
        /// Axis termination markers.
        finish: ScrollFinishFlags,
        /// Pointer position.
        x: f64,
        /// Pointer position.
        y: f64,
    },
    /// Discrete scroll step.
    ScrollDiscrete {
        /// Scroll direction.
        direction: ScrollDirection,
        /// What produced the scroll.
        source: ScrollSource,
        /// Pointer position.
        x: f64,
        /// Pointer position.
        y: f64,
    },
    /// A key was pressed (or auto-repeated, see [`EventFlags::REPEATED`]).
    KeyPress {
        /// Evdev keycode.
        keycode: u32,
        /// Keysym resolved against the current keyboard state.
        keysym: xkb::Keysym,
    },
    /// A key was released.
    KeyRelease {
        /// Evdev keycode.
        keycode: u32,
        /// Keysym resolved against the current keyboard state.
        keysym: xkb::Keysym,
    },
    /// A touch sequence started.
    TouchBegin {
        /// Sequence handle.
        sequence: TouchSequence,
        /// Horizontal position in stage coordinates.
        x: f64,
        /// Vertical position in stage coordinates.
        y: f64,
    },
    /// A touch sequence moved.
    TouchUpdate {
        /// Sequence handle.
        sequence: TouchSequence,
        /// Horizontal position in stage coordinates.
        x: f64,
        /// Vertical position in stage coordinates.
        y: f64,
    },
    /// A touch sequence ended.
    TouchEnd {
        /// Sequence handle.
        sequence: TouchSequence,
        /// Last horizontal position in stage coordinates.
        x: f64,
        /// Last vertical position in stage coordinates.
        y: f64,
    },
    /// A touch sequence was cancelled.
    TouchCancel {
        /// Sequence handle.
        sequence: TouchSequence,
        /// Last horizontal position in stage coordinates.
        x: f64,
        /// Last vertical position in stage coordinates.
        y: f64,
    },
    /// A tablet tool entered proximity.
    ProximityIn {
        /// The tool now in proximity.
        tool: ToolId,
    },
    /// A tablet tool left proximity.
    ProximityOut {
        /// The tool that left proximity.
        tool: ToolId,
    },
    /// Touchpad pinch gesture.
    TouchpadPinch {
        /// Gesture phase.
        phase: GesturePhase,
        /// Pointer position.
        x: f64,
        /// Pointer position.
        y: f64,
        /// Horizontal center-of-gravity delta.
        dx: f64,
        /// Vertical center-of-gravity delta.
        dy: f64,
        /// Rotation delta in degrees.
        angle_delta: f64,
        /// Absolute scale relative to the gesture start.
        scale: f64,
        /// Number of fingers.
        n_fingers: u32,
    },
    /// Touchpad swipe gesture.
    TouchpadSwipe {
        /// Gesture phase.
        phase: GesturePhase,
        /// Pointer position.
        x: f64,
        /// Pointer position.
        y: f64,
        /// Horizontal delta.
        dx: f64,
        /// Vertical delta.
        dy: f64,
        /// Number of fingers.
        n_fingers: u32,
    },
    /// A tablet pad button was pressed.
    PadButtonPress {
        /// Pad button number.
        button: u32,
        /// Mode group index.
        group: u32,
        /// Mode within the group.
        mode: u32,
    },
    /// A tablet pad button was released.
    PadButtonRelease {
        /// Pad button number.
        button: u32,
        /// Mode group index.
        group: u32,
        /// Mode within the group.
        mode: u32,
    },
    /// A tablet pad strip moved.
    PadStrip {
        /// Strip number.
        number: u32,
        /// What moved the strip.
        source: PadSource,
        /// Position in [0, 1], or -1 when the interaction stopped.
        value: f64,
        /// Mode group index.
        group: u32,
        /// Mode within the group.
        mode: u32,
    },
    /// A tablet pad ring moved.
    PadRing {
        /// Ring number.
        number: u32,
        /// What moved the ring.
        source: PadSource,
        /// Angle in degrees, or -1 when the interaction stopped.
        angle: f64,
        /// Mode group index.
        group: u32,
        /// Mode within the group.
        mode: u32,
    },
}

/// A high-level input event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event time in milliseconds.
    pub time: u32,
    /// Event time in microseconds.
    pub time_us: u64,
    /// Modifier state at the time of the event.
    pub modifiers: Modifiers,
    /// Associated device: the logical pointer or keyboard for most events,
    /// the physical device for tablet and pad events.
    pub device: DeviceId,
    /// Physical device the raw event came from.
    pub source_device: DeviceId,
    /// Event flags.
    pub flags: EventFlags,
    /// Evdev code of the key or button, where applicable.
    pub event_code: Option<u32>,
    /// Relative motion data, attached to motion events produced from
    /// relative input.
    pub relative_motion: Option<RelativeMotion>,
    /// Kind-specific payload.
    pub kind: EventKind,
}

impl Event {
    /// Whether this is a motion event.
    pub fn is_motion(&self) -> bool {
        matches!(self.kind, EventKind::Motion { .. })
    }
}

/// Fold a discarded motion event into the newer one that supersedes it.
///
/// Host event queues may compress consecutive unflushed motion events; the
/// surviving event keeps its (newer) absolute coordinates while the relative
/// deltas of both accumulate. Events without relative motion data are left
/// untouched.
pub fn compress_motion(event: &mut Event, discarded: &Event) {
    let Some(old) = discarded.relative_motion else {
        return;
    };
    let new = event.relative_motion.unwrap_or_default();
    event.relative_motion = Some(RelativeMotion {
        dx: old.dx + new.dx,
        dy: old.dy + new.dy,
        dx_unaccel: old.dx_unaccel + new.dx_unaccel,
        dy_unaccel: old.dy_unaccel + new.dy_unaccel,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion_event(dx: f64, dy: f64, x: f64, y: f64) -> Event {
        Event {
            time: 0,
            time_us: 0,
            modifiers: Modifiers::empty(),
            device: DeviceId::from_raw(2),
            source_device: DeviceId::from_raw(4),
            flags: EventFlags::empty(),
            event_code: None,
            relative_motion: Some(RelativeMotion {
                dx,
                dy,
                dx_unaccel: dx,
                dy_unaccel: dy,
            }),
            kind: EventKind::Motion {
                x,
                y,
                axes: None,
                tool: None,
            },
        }
    }

    #[test]
    fn sequence_is_never_zero() {
        assert_eq!(TouchSequence::from_slot(-1).raw(), 1);
        assert_eq!(TouchSequence::from_slot(0).raw(), 1);
        assert_eq!(TouchSequence::from_slot(5).raw(), 6);
        assert_eq!(TouchSequence::from_slot(5).slot(), 5);
    }

    #[test]
    fn compression_accumulates_deltas_keeps_newer_coords() {
        let discarded = motion_event(3.0, -1.0, 13.0, 15.0);
        let mut survivor = motion_event(2.0, 2.0, 15.0, 17.0);
        compress_motion(&mut survivor, &discarded);

        let relative = survivor.relative_motion.unwrap();
        assert_eq!(relative.dx, 5.0);
        assert_eq!(relative.dy, 1.0);
        assert!(matches!(
            survivor.kind,
            EventKind::Motion { x, y, .. } if x == 15.0 && y == 17.0
        ));
    }

    #[test]
    fn compression_without_relative_data_is_a_no_op() {
        let mut survivor = motion_event(2.0, 2.0, 15.0, 17.0);
        let mut discarded = motion_event(0.0, 0.0, 1.0, 1.0);
        discarded.relative_motion = None;
        let before = survivor.clone();
        compress_motion(&mut survivor, &discarded);
        assert_eq!(survivor, before);
    }
}
