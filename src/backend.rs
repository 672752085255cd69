//! Inbound interface to the raw event source.
//!
//! The engine does not bind libinput itself; it consumes an [`InputSource`],
//! an object owning the device file descriptors and a pollable fd, which
//! yields already-typed [`RawEvent`]s. A concrete binding lives outside this
//! crate and receives a [`DevicePermission`] capability for opening device
//! nodes.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{OwnedFd, RawFd};
use std::path::Path;

use bitflags::bitflags;

use crate::event::PadSource;
use crate::tablet::{ToolCapabilities, ToolKind};

/// Identifier a source assigns to one of its devices.
///
/// Stable for the lifetime of the device within the source; reused values
/// after removal are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

bitflags! {
    /// Capabilities reported for a raw device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceCapabilities: u32 {
        /// Pointer motion and buttons.
        const POINTER = 1 << 0;
        /// Keyboard keys.
        const KEYBOARD = 1 << 1;
        /// Touch contacts.
        const TOUCH = 1 << 2;
        /// Tablet tools (pens and friends).
        const TABLET_TOOL = 1 << 3;
        /// Tablet pad buttons, rings and strips.
        const TABLET_PAD = 1 << 4;
        /// Touchpad gestures.
        const GESTURE = 1 << 5;
        /// Switches (lid, tablet-mode).
        const SWITCH = 1 << 6;
    }
}

bitflags! {
    /// Keyboard LEDs pushed back to devices.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Leds: u32 {
        /// Caps lock LED.
        const CAPS_LOCK = 1 << 0;
        /// Num lock LED.
        const NUM_LOCK = 1 << 1;
        /// Scroll lock LED.
        const SCROLL_LOCK = 1 << 2;
    }
}

/// Static description of a raw device, delivered with
/// [`RawEvent::DeviceAdded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Capability set of the device.
    pub capabilities: DeviceCapabilities,
    /// Tap finger count; non-zero identifies a touchpad.
    pub tap_finger_count: u32,
    /// Whether the device carries a tablet-mode switch.
    pub has_tablet_mode_switch: bool,
}

/// State of a key on a keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    /// Key was released.
    Released,
    /// Key was pressed.
    Pressed,
    /// Synthetic auto-repeat press, only ever produced by the engine.
    ///
    /// Sources must not emit this state; it exists so repeated key events
    /// can skip xkb state updates.
    Autorepeat,
}

/// State of a button on a pointer or tablet tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    /// Button was released.
    Released,
    /// Button was pressed.
    Pressed,
}

/// Source of a scroll axis event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisSource {
    /// Scroll wheel, in discrete clicks.
    Wheel,
    /// Finger scrolling on a touchpad; terminated by a 0-valued event.
    Finger,
    /// Continuous scrolling device.
    Continuous,
    /// Tilting the scroll wheel.
    WheelTilt,
}

/// One scroll axis of a pointer axis event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAxis {
    /// Motion-equivalent scroll value in pixels.
    pub value: f64,
    /// Discrete click count, only meaningful for wheel sources.
    pub discrete: f64,
}

/// Proximity of a tablet tool to its tablet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProximityState {
    /// Tool left the detectable range.
    Out,
    /// Tool entered the detectable range.
    In,
}

/// Contact state of a tablet tool tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TipState {
    /// Tip no longer touches the surface.
    Up,
    /// Tip touches the surface.
    Down,
}

/// Switch kinds reported by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchKind {
    /// Laptop lid switch.
    Lid,
    /// Tablet-mode switch on convertibles.
    TabletMode,
}

/// State of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchState {
    /// Switch is off.
    Off,
    /// Switch is on.
    On,
}

/// Identity and capabilities of a tablet tool as reported by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolInfo {
    /// Hardware serial number.
    pub serial: u64,
    /// Physical tool kind.
    pub kind: ToolKind,
    /// Axes the tool is capable of, beyond x/y.
    pub capabilities: ToolCapabilities,
}

/// Snapshot of all tablet tool axes carried by a tool event.
///
/// `x` and `y` are normalized to [0, 1]; the translator scales them by the
/// viewport extents. Axes the tool is not capable of are zero.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TabletAxes {
    /// Normalized horizontal position.
    pub x: f64,
    /// Normalized vertical position.
    pub y: f64,
    /// Relative horizontal motion in pixels.
    pub dx: f64,
    /// Relative vertical motion in pixels.
    pub dy: f64,
    /// Distance from the tablet surface, normalized to [0, 1].
    pub distance: f64,
    /// Pressure, normalized to [0, 1].
    pub pressure: f64,
    /// Tilt around the x axis in degrees.
    pub tilt_x: f64,
    /// Tilt around the y axis in degrees.
    pub tilt_y: f64,
    /// Z rotation in degrees.
    pub rotation: f64,
    /// Slider position, normalized to [-1, 1].
    pub slider: f64,
    /// Wheel delta in degrees.
    pub wheel: f64,
}

/// A typed raw event popped from the source queue.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    /// A device appeared on the seat.
    DeviceAdded {
        /// Source handle of the new device.
        device: SourceId,
        /// Description of the new device.
        info: DeviceInfo,
    },
    /// A device disappeared from the seat.
    DeviceRemoved {
        /// Source handle of the removed device.
        device: SourceId,
    },
    /// A keyboard key changed state.
    KeyboardKey {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Evdev key code.
        key: u32,
        /// New key state; never [`KeyState::Autorepeat`].
        state: KeyState,
        /// Seat-wide count of devices holding this key after the event.
        seat_key_count: u32,
    },
    /// Relative pointer motion.
    PointerMotion {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Accelerated horizontal delta.
        dx: f64,
        /// Accelerated vertical delta.
        dy: f64,
        /// Unaccelerated horizontal delta.
        dx_unaccel: f64,
        /// Unaccelerated vertical delta.
        dy_unaccel: f64,
    },
    /// Absolute pointer motion, coordinates normalized to [0, 1].
    PointerMotionAbsolute {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Normalized horizontal position.
        x: f64,
        /// Normalized vertical position.
        y: f64,
    },
    /// A pointer button changed state.
    PointerButton {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Evdev button code.
        button: u32,
        /// New button state.
        state: ButtonState,
        /// Seat-wide count of devices holding this button after the event.
        seat_button_count: u32,
    },
    /// Scroll motion on one or both axes.
    PointerAxis {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// What produced the scroll.
        source: AxisSource,
        /// Horizontal axis, if present in the event.
        horizontal: Option<ScrollAxis>,
        /// Vertical axis, if present in the event.
        vertical: Option<ScrollAxis>,
    },
    /// A new touch point went down.
    TouchDown {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Seat-wide slot of the touch point.
        seat_slot: i32,
        /// Normalized horizontal position.
        x: f64,
        /// Normalized vertical position.
        y: f64,
    },
    /// A touch point moved.
    TouchMotion {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Seat-wide slot of the touch point.
        seat_slot: i32,
        /// Normalized horizontal position.
        x: f64,
        /// Normalized vertical position.
        y: f64,
    },
    /// A touch point was lifted.
    TouchUp {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Seat-wide slot of the touch point.
        seat_slot: i32,
    },
    /// A touch sequence was cancelled by the source.
    TouchCancel {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Seat-wide slot of the touch point.
        seat_slot: i32,
    },
    /// A pinch gesture started.
    GesturePinchBegin {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Number of fingers in the gesture.
        n_fingers: u32,
    },
    /// A pinch gesture progressed.
    GesturePinchUpdate {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Number of fingers in the gesture.
        n_fingers: u32,
        /// Horizontal center-of-gravity delta.
        dx: f64,
        /// Vertical center-of-gravity delta.
        dy: f64,
        /// Absolute scale relative to the gesture start.
        scale: f64,
        /// Rotation delta in degrees since the last event.
        angle_delta: f64,
    },
    /// A pinch gesture ended.
    GesturePinchEnd {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Number of fingers in the gesture.
        n_fingers: u32,
        /// Whether the gesture was cancelled rather than finished.
        cancelled: bool,
    },
    /// A swipe gesture started.
    GestureSwipeBegin {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Number of fingers in the gesture.
        n_fingers: u32,
    },
    /// A swipe gesture progressed.
    GestureSwipeUpdate {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Number of fingers in the gesture.
        n_fingers: u32,
        /// Horizontal delta.
        dx: f64,
        /// Vertical delta.
        dy: f64,
    },
    /// A swipe gesture ended.
    GestureSwipeEnd {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Number of fingers in the gesture.
        n_fingers: u32,
        /// Whether the gesture was cancelled rather than finished.
        cancelled: bool,
    },
    /// Tablet tool axis motion.
    TabletToolAxis {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Tool producing the event.
        tool: ToolInfo,
        /// Axis snapshot.
        axes: TabletAxes,
    },
    /// Tablet tool proximity change.
    TabletToolProximity {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Tool producing the event.
        tool: ToolInfo,
        /// Axis snapshot.
        axes: TabletAxes,
        /// New proximity state.
        state: ProximityState,
    },
    /// Tablet tool tip contact change.
    TabletToolTip {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Tool producing the event.
        tool: ToolInfo,
        /// Axis snapshot.
        axes: TabletAxes,
        /// New tip state.
        state: TipState,
    },
    /// Tablet tool button change.
    TabletToolButton {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Tool producing the event.
        tool: ToolInfo,
        /// Evdev button code.
        button: u32,
        /// New button state.
        state: ButtonState,
        /// Axis snapshot.
        axes: TabletAxes,
    },
    /// Tablet pad button change.
    TabletPadButton {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Pad button number.
        button: u32,
        /// Mode group index.
        group: u32,
        /// Mode within the group.
        mode: u32,
        /// New button state.
        state: ButtonState,
    },
    /// Tablet pad strip position change.
    TabletPadStrip {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
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
    /// Tablet pad ring position change.
    TabletPadRing {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
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
    /// A switch toggled.
    SwitchToggle {
        /// Originating device.
        device: SourceId,
        /// Event time in microseconds.
        time_us: u64,
        /// Which switch toggled.
        switch: SwitchKind,
        /// New switch state.
        state: SwitchState,
    },
}

/// The raw event source driving a seat.
///
/// One implementation wraps a libinput context; tests use scripted fakes.
/// All methods are called from the seat's dispatch thread.
pub trait InputSource {
    /// Pollable fd signalling that [`InputSource::dispatch`] has work.
    fn fd(&self) -> RawFd;

    /// Drain the kernel-side queue into the source's event queue.
    fn dispatch(&mut self) -> io::Result<()>;

    /// Pop the next queued raw event.
    fn next_event(&mut self) -> Option<RawEvent>;

    /// Suspend the source, closing device fds (tty switch away).
    ///
    /// Queued device-removed events must still be observable through
    /// [`InputSource::next_event`] afterwards.
    fn suspend(&mut self);

    /// Resume a suspended source, re-probing devices.
    fn resume(&mut self) -> io::Result<()>;

    /// Push keyboard LED state to a device.
    fn update_leds(&mut self, device: SourceId, leds: Leds);
}

impl fmt::Debug for dyn InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSource").field("fd", &self.fd()).finish()
    }
}

/// Capability for opening and closing input device nodes.
///
/// Sources call into this instead of opening devices directly, so hosts can
/// route the access through a session service (logind and friends).
pub trait DevicePermission {
    /// Open the device node at `path` with the given open flags.
    fn open(&mut self, path: &Path, flags: i32) -> io::Result<OwnedFd>;

    /// Close a device fd previously returned by [`DevicePermission::open`].
    fn close(&mut self, fd: OwnedFd);
}

/// Default [`DevicePermission`] opening devices directly.
///
/// Uses `O_RDWR | O_NONBLOCK` regardless of the requested flags, the mode
/// evdev devices are expected to be driven in.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectOpen;

impl DevicePermission for DirectOpen {
    fn open(&mut self, path: &Path, _flags: i32) -> io::Result<OwnedFd> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        Ok(file.into())
    }

    fn close(&mut self, fd: OwnedFd) {
        drop(fd);
    }
}
