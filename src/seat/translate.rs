//! Translation of raw source events into high-level seat events.
//!
//! One entry point, [`Seat::process_device_event`], dispatches on the raw
//! event kind. The `notify_*` methods are also the injection points used by
//! virtual devices.

use tracing::{debug, warn};
use xkbcommon::xkb;

use super::Seat;
use crate::backend::{
    AxisSource, ButtonState, KeyState, ProximityState, RawEvent, TabletAxes, TipState, ToolInfo,
};
use crate::device::{DeviceId, DeviceKind, MappingMode};
use crate::event::{
    us2ms, Event, EventFlags, EventKind, GesturePhase, Modifiers, PadSource, ScrollDirection,
    ScrollFinishFlags, ScrollSource, TouchSequence, DISCRETE_SCROLL_STEP,
};
use crate::tablet::{Tool, ToolKind};
use crate::utils::Point;

const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const BTN_MIDDLE: u32 = 0x112;
const BTN_TOOL_PEN: u32 = 0x140;
const BTN_STYLUS3: u32 = 0x149;
pub(crate) const BTN_TOUCH: u32 = 0x14a;
const BTN_STYLUS: u32 = 0x14b;
const BTN_STYLUS2: u32 = 0x14c;

// logical buttons 1..=5 in the modifier mask; right and middle are swapped
// for compatibility with what downstream consumers expect
const MASK_MAP: [Modifiers; 5] = [
    Modifiers::BUTTON1,
    Modifiers::BUTTON3,
    Modifiers::BUTTON2,
    Modifiers::BUTTON4,
    Modifiers::BUTTON5,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TouchPhase {
    Begin,
    Update,
    End,
    Cancel,
}

/// Map an evdev button code to the logical button number.
///
/// Left/right/middle (and their stylus equivalents) map to 1/3/2; further
/// buttons land past the legacy scroll buttons 4..=7.
fn logical_button(button: u32, is_tablet: bool) -> u32 {
    match button {
        BTN_LEFT | BTN_TOUCH => 1,
        BTN_RIGHT | BTN_STYLUS => 3,
        BTN_MIDDLE | BTN_STYLUS2 => 2,
        BTN_STYLUS3 => 8,
        _ => {
            if is_tablet {
                button.wrapping_sub(BTN_TOOL_PEN).wrapping_add(4)
            } else {
                button.wrapping_sub(BTN_LEFT - 1).wrapping_add(4)
            }
        }
    }
}

fn translate_scroll_source(source: AxisSource) -> ScrollSource {
    match source {
        AxisSource::Wheel => ScrollSource::Wheel,
        AxisSource::Finger => ScrollSource::Finger,
        AxisSource::Continuous => ScrollSource::Continuous,
        AxisSource::WheelTilt => ScrollSource::Unknown,
    }
}

fn discrete_to_direction(discrete_dx: f64, discrete_dy: f64) -> Option<ScrollDirection> {
    if discrete_dx > 0.0 {
        Some(ScrollDirection::Right)
    } else if discrete_dx < 0.0 {
        Some(ScrollDirection::Left)
    } else if discrete_dy > 0.0 {
        Some(ScrollDirection::Down)
    } else if discrete_dy < 0.0 {
        Some(ScrollDirection::Up)
    } else {
        None
    }
}

impl Seat {
    pub(crate) fn stage_extents(&self) -> (f64, f64) {
        self.viewports
            .as_ref()
            .map(|viewports| viewports.extents())
            .unwrap_or((0.0, 0.0))
    }

    // ---- keyboard ----

    /// Feed a key state change into the seat.
    ///
    /// This is the injection point for virtual keyboards; the per-seat key
    /// counter still collapses overlapping presses from several devices.
    pub fn notify_key(&mut self, device: DeviceId, time_us: u64, key: u32, state: KeyState) {
        self.notify_key_full(device, time_us, key, state, true);
    }

    pub(crate) fn notify_key_full(
        &mut self,
        device: DeviceId,
        time_us: u64,
        key: u32,
        state: KeyState,
        update_keys: bool,
    ) {
        if state != KeyState::Autorepeat {
            // drop repeated presses, e.g. the same key held on two keyboards
            let pressed = state == KeyState::Pressed;
            let Some(count) = self.update_button_count(key, pressed) else {
                return;
            };
            if (pressed && count > 1) || (!pressed && count != 0) {
                debug!(
                    key = format_args!("{key:#x}"),
                    count, "dropping repeated key event"
                );
                return;
            }
        }

        let modifiers = self.keyboard.modifiers(self.button_state);
        let keysym = self.keyboard.keysym(key);

        // passing repeated presses to xkb would confuse it into locking
        // modifiers, so synthetic repeats skip the state update
        let mut flags = EventFlags::empty();
        let changed = if state == KeyState::Autorepeat {
            flags |= EventFlags::REPEATED;
            0
        } else {
            self.keyboard.update_key(key, state == KeyState::Pressed)
        };

        let kind = if state == KeyState::Released {
            EventKind::KeyRelease { keycode: key, keysym }
        } else {
            EventKind::KeyPress { keycode: key, keysym }
        };

        let keyboard = self.keyboard();
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers,
            device: keyboard,
            source_device: device,
            flags,
            event_code: Some(key),
            relative_motion: None,
            kind,
        });

        if update_keys && (changed & xkb::STATE_LEDS) != 0 {
            self.emit(|observer| observer.mods_state_changed());
            self.sync_leds();
            self.maybe_notify_toggle_keys();
        }

        if state == KeyState::Released
            || !self.repeat_enabled()
            || !self.keyboard.key_repeats(key)
        {
            self.clear_repeat_timer();
            return;
        }

        let count = self.bump_repeat_count(state == KeyState::Pressed);
        self.repeat_key = key;
        match count {
            1 | 2 => {
                let interval = if count == 1 {
                    self.repeat_delay()
                } else {
                    self.repeat_interval()
                };
                self.clear_repeat_timer();
                self.arm_repeat_timer(device, interval);
            }
            _ => {}
        }
    }

    // ---- buttons ----

    /// Feed a button state change into the seat.
    pub fn notify_button(&mut self, device_id: DeviceId, time_us: u64, button: u32, state: ButtonState) {
        let pressed = state == ButtonState::Pressed;
        let Some(count) = self.update_button_count(button, pressed) else {
            return;
        };
        if (pressed && count > 1) || (!pressed && count != 0) {
            debug!(
                button = format_args!("{button:#x}"),
                count, "dropping repeated button event"
            );
            return;
        }

        let (kind, position, tool) = match self.device(device_id) {
            Some(device) => (device.kind, device.position, device.current_tool()),
            None => (DeviceKind::Pointer, Point::default(), None),
        };
        let is_tablet = kind == DeviceKind::Tablet;

        let button_nr = logical_button(button, is_tablet);
        if !(1..=12).contains(&button_nr) {
            warn!("unhandled button event {button:#x}");
            return;
        }

        if let Some(mask) = MASK_MAP.get((button_nr - 1) as usize) {
            if pressed {
                self.button_state |= *mask;
            } else {
                self.button_state &= !*mask;
            }
        }

        let modifiers = self.keyboard.modifiers(self.button_state);
        let (x, y) = if is_tablet {
            (position.x, position.y)
        } else {
            (self.pointer_x, self.pointer_y)
        };

        // the tool's button table may remap the reported event code
        let mut event_code = button;
        if let Some(tool) = tool.and_then(|id| self.device(device_id).and_then(|d| d.tool(id))) {
            if let Some(mapped) = tool.button_code(button_nr) {
                event_code = mapped;
            }
        }

        let tool = if is_tablet { tool } else { None };
        let kind = if pressed {
            EventKind::ButtonPress {
                button: button_nr,
                x,
                y,
                tool,
            }
        } else {
            EventKind::ButtonRelease {
                button: button_nr,
                x,
                y,
                tool,
            }
        };

        let associated = if is_tablet { device_id } else { self.pointer() };
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers,
            device: associated,
            source_device: device_id,
            flags: EventFlags::empty(),
            event_code: Some(event_code),
            relative_motion: None,
            kind,
        });
    }

    // ---- scroll ----

    fn notify_scroll(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        dx: f64,
        dy: f64,
        source: ScrollSource,
        finish: ScrollFinishFlags,
        emulated: bool,
    ) {
        let modifiers = self.keyboard.modifiers(self.button_state);
        let mut flags = EventFlags::empty();
        if emulated {
            flags |= EventFlags::POINTER_EMULATED;
        }

        // axis values are in pointer motion space; scroll deltas downstream
        // are in discrete steps
        let scroll_factor = 1.0 / DISCRETE_SCROLL_STEP;
        let pointer = self.pointer();
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers,
            device: pointer,
            source_device: device_id,
            flags,
            event_code: None,
            relative_motion: None,
            kind: EventKind::ScrollSmooth {
                dx: dx * scroll_factor,
                dy: dy * scroll_factor,
                source,
                finish,
                x: self.pointer_x,
                y: self.pointer_y,
            },
        });
    }

    fn notify_discrete_scroll_event(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        direction: ScrollDirection,
        source: ScrollSource,
        emulated: bool,
    ) {
        let modifiers = self.keyboard.modifiers(self.button_state);
        let mut flags = EventFlags::empty();
        if emulated {
            flags |= EventFlags::POINTER_EMULATED;
        }

        let pointer = self.pointer();
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers,
            device: pointer,
            source_device: device_id,
            flags,
            event_code: None,
            relative_motion: None,
            kind: EventKind::ScrollDiscrete {
                direction,
                source,
                x: self.pointer_x,
                y: self.pointer_y,
            },
        });
    }

    fn check_notify_discrete_scroll(&mut self, device_id: DeviceId, time_us: u64, source: ScrollSource) {
        let n_xscrolls = (self.accum_scroll_dx.abs() / DISCRETE_SCROLL_STEP).floor() as u32;
        let n_yscrolls = (self.accum_scroll_dy.abs() / DISCRETE_SCROLL_STEP).floor() as u32;

        for _ in 0..n_xscrolls {
            let direction = if self.accum_scroll_dx > 0.0 {
                ScrollDirection::Right
            } else {
                ScrollDirection::Left
            };
            self.notify_discrete_scroll_event(device_id, time_us, direction, source, true);
        }

        for _ in 0..n_yscrolls {
            let direction = if self.accum_scroll_dy > 0.0 {
                ScrollDirection::Down
            } else {
                ScrollDirection::Up
            };
            self.notify_discrete_scroll_event(device_id, time_us, direction, source, true);
        }

        self.accum_scroll_dx %= DISCRETE_SCROLL_STEP;
        self.accum_scroll_dy %= DISCRETE_SCROLL_STEP;
    }

    /// Feed continuous scroll into the seat, accumulating towards emulated
    /// discrete events.
    pub fn notify_scroll_continuous(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        dx: f64,
        dy: f64,
        source: ScrollSource,
        finish: ScrollFinishFlags,
    ) {
        if finish.contains(ScrollFinishFlags::HORIZONTAL) {
            self.accum_scroll_dx = 0.0;
        } else {
            self.accum_scroll_dx += dx;
        }
        if finish.contains(ScrollFinishFlags::VERTICAL) {
            self.accum_scroll_dy = 0.0;
        } else {
            self.accum_scroll_dy += dy;
        }

        self.notify_scroll(device_id, time_us, dx, dy, source, finish, false);
        self.check_notify_discrete_scroll(device_id, time_us, source);
    }

    /// Feed wheel clicks into the seat.
    pub fn notify_discrete_scroll(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        discrete_dx: f64,
        discrete_dy: f64,
        source: ScrollSource,
    ) {
        self.notify_scroll(
            device_id,
            time_us,
            discrete_dx * DISCRETE_SCROLL_STEP,
            discrete_dy * DISCRETE_SCROLL_STEP,
            source,
            ScrollFinishFlags::empty(),
            true,
        );
        let Some(direction) = discrete_to_direction(discrete_dx, discrete_dy) else {
            warn!("discrete scroll event without a direction");
            return;
        };
        self.notify_discrete_scroll_event(device_id, time_us, direction, source, false);
    }

    // ---- touch ----

    fn notify_touch_event(
        &mut self,
        device_id: DeviceId,
        phase: TouchPhase,
        time_us: u64,
        seat_slot: i32,
        x: f64,
        y: f64,
    ) {
        let sequence = TouchSequence::from_slot(seat_slot);
        let mapped_view = self.device(device_id).and_then(|device| device.mapped_view);
        let (x, y) = self.map_device_coords(mapped_view, x, y);

        // begin/update carry an implicit button press for legacy pointer
        // emulation consumers
        let mut modifiers = self.keyboard.modifiers(self.button_state);
        if matches!(phase, TouchPhase::Begin | TouchPhase::Update) {
            modifiers |= Modifiers::BUTTON1;
        }

        let kind = match phase {
            TouchPhase::Begin => EventKind::TouchBegin { sequence, x, y },
            TouchPhase::Update => EventKind::TouchUpdate { sequence, x, y },
            TouchPhase::End => EventKind::TouchEnd { sequence, x, y },
            TouchPhase::Cancel => EventKind::TouchCancel { sequence, x, y },
        };

        let pointer = self.pointer();
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers,
            device: pointer,
            source_device: device_id,
            flags: EventFlags::empty(),
            event_code: None,
            relative_motion: None,
            kind,
        });
    }

    /// Start a touch sequence at a stage position.
    pub fn notify_touch_down(&mut self, device_id: DeviceId, time_us: u64, seat_slot: i32, x: f64, y: f64) {
        match self.touch_states.acquire(seat_slot) {
            Ok(state) => state.coords = Point::new(x, y),
            Err(err) => {
                warn!("ignoring touch down: {err}");
                return;
            }
        }
        self.notify_touch_event(device_id, TouchPhase::Begin, time_us, seat_slot, x, y);
    }

    /// Move a touch sequence to a stage position.
    ///
    /// Unknown slots are silently ignored.
    pub fn notify_touch_motion(&mut self, device_id: DeviceId, time_us: u64, seat_slot: i32, x: f64, y: f64) {
        let Some(state) = self.touch_states.lookup_mut(seat_slot) else {
            return;
        };
        state.coords = Point::new(x, y);
        self.notify_touch_event(device_id, TouchPhase::Update, time_us, seat_slot, x, y);
    }

    /// End a touch sequence.
    ///
    /// Unknown slots are silently ignored.
    pub fn notify_touch_up(&mut self, device_id: DeviceId, time_us: u64, seat_slot: i32) {
        let Some(state) = self.touch_states.lookup(seat_slot) else {
            return;
        };
        let coords = state.coords;
        self.notify_touch_event(device_id, TouchPhase::End, time_us, seat_slot, coords.x, coords.y);
        self.touch_states.release(seat_slot);
    }

    /// Cancel a touch sequence.
    ///
    /// Unknown slots are silently ignored.
    pub fn notify_touch_cancel(&mut self, device_id: DeviceId, time_us: u64, seat_slot: i32) {
        let Some(state) = self.touch_states.lookup(seat_slot) else {
            return;
        };
        let coords = state.coords;
        self.notify_touch_event(device_id, TouchPhase::Cancel, time_us, seat_slot, coords.x, coords.y);
        self.touch_states.release(seat_slot);
    }

    // ---- gestures ----

    #[allow(clippy::too_many_arguments)]
    fn notify_pinch_gesture_event(
        &mut self,
        device_id: DeviceId,
        phase: GesturePhase,
        time_us: u64,
        dx: f64,
        dy: f64,
        angle_delta: f64,
        scale: f64,
        n_fingers: u32,
    ) {
        let modifiers = self.keyboard.modifiers(self.button_state);
        let pointer = self.pointer();
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers,
            device: pointer,
            source_device: device_id,
            flags: EventFlags::empty(),
            event_code: None,
            relative_motion: None,
            kind: EventKind::TouchpadPinch {
                phase,
                x: self.pointer_x,
                y: self.pointer_y,
                dx,
                dy,
                angle_delta,
                scale,
                n_fingers,
            },
        });
    }

    fn notify_swipe_gesture_event(
        &mut self,
        device_id: DeviceId,
        phase: GesturePhase,
        time_us: u64,
        n_fingers: u32,
        dx: f64,
        dy: f64,
    ) {
        let modifiers = self.keyboard.modifiers(self.button_state);
        let pointer = self.pointer();
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers,
            device: pointer,
            source_device: device_id,
            flags: EventFlags::empty(),
            event_code: None,
            relative_motion: None,
            kind: EventKind::TouchpadSwipe {
                phase,
                x: self.pointer_x,
                y: self.pointer_y,
                dx,
                dy,
                n_fingers,
            },
        });
    }

    // ---- tablet ----

    fn update_tool(&mut self, device_id: DeviceId, info: Option<&ToolInfo>) {
        let Some(device) = self.device_mut(device_id) else {
            return;
        };

        let changed = match info {
            Some(info) => {
                let tool_id = crate::tablet::ToolId {
                    serial: info.serial,
                    kind: info.kind,
                };
                let index = match device.tools.iter().position(|tool| tool.id() == tool_id) {
                    Some(index) => index,
                    None => {
                        device.tools.push(Tool::new(info));
                        device.tools.len() - 1
                    }
                };
                if device.last_tool != Some(index) {
                    device.last_tool = Some(index);
                    Some(Some(tool_id))
                } else {
                    None
                }
            }
            None => {
                if device.last_tool.take().is_some() {
                    Some(None)
                } else {
                    None
                }
            }
        };

        if let Some(tool) = changed {
            self.emit(|observer| observer.tool_changed(device_id, tool));
        }
    }

    fn process_tablet_axes(&mut self, device_id: DeviceId, time_us: u64, info: &ToolInfo, axes: &TabletAxes) {
        let extents = self.stage_extents();
        let tool_id = crate::tablet::ToolId {
            serial: info.serial,
            kind: info.kind,
        };

        let (vector, mapping_mode) = match self.device(device_id) {
            Some(device) => {
                let vector = match device.tool(tool_id) {
                    Some(tool) => tool.translate_axes(axes, extents),
                    None => Tool::new(info).translate_axes(axes, extents),
                };
                (vector, device.mapping_mode)
            }
            None => return,
        };

        let relative = mapping_mode == MappingMode::Relative
            || matches!(info.kind, ToolKind::Mouse | ToolKind::Lens);
        if relative {
            self.notify_relative_tool_motion(device_id, time_us, axes.dx, axes.dy, Some(vector));
        } else {
            self.notify_absolute_motion(
                device_id,
                time_us,
                axes.x * extents.0,
                axes.y * extents.1,
                Some(vector),
            );
        }
    }

    fn notify_proximity(&mut self, device_id: DeviceId, time_us: u64, state: ProximityState) {
        let Some(tool) = self.device(device_id).and_then(|device| device.current_tool()) else {
            warn!("proximity event without a tool");
            return;
        };

        let kind = match state {
            ProximityState::In => EventKind::ProximityIn { tool },
            ProximityState::Out => EventKind::ProximityOut { tool },
        };

        let modifiers = self.keyboard.modifiers(self.button_state);
        let pointer = self.pointer();
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers,
            device: pointer,
            source_device: device_id,
            flags: EventFlags::empty(),
            event_code: None,
            relative_motion: None,
            kind,
        });
    }

    // ---- pad ----

    fn notify_pad_button(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        button: u32,
        group: u32,
        mode: u32,
        state: ButtonState,
    ) {
        let kind = match state {
            ButtonState::Pressed => EventKind::PadButtonPress { button, group, mode },
            ButtonState::Released => EventKind::PadButtonRelease { button, group, mode },
        };
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers: Modifiers::empty(),
            device: device_id,
            source_device: device_id,
            flags: EventFlags::empty(),
            event_code: None,
            relative_motion: None,
            kind,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn notify_pad_strip(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        number: u32,
        source: PadSource,
        value: f64,
        group: u32,
        mode: u32,
    ) {
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers: Modifiers::empty(),
            device: device_id,
            source_device: device_id,
            flags: EventFlags::empty(),
            event_code: None,
            relative_motion: None,
            kind: EventKind::PadStrip {
                number,
                source,
                value,
                group,
                mode,
            },
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn notify_pad_ring(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        number: u32,
        source: PadSource,
        angle: f64,
        group: u32,
        mode: u32,
    ) {
        self.queue_event(Event {
            time: us2ms(time_us),
            time_us,
            modifiers: Modifiers::empty(),
            device: device_id,
            source_device: device_id,
            flags: EventFlags::empty(),
            event_code: None,
            relative_motion: None,
            kind: EventKind::PadRing {
                number,
                source,
                angle,
                group,
                mode,
            },
        });
    }

    // ---- dispatch ----

    pub(crate) fn process_device_event(&mut self, event: RawEvent) {
        let source_id = match &event {
            RawEvent::KeyboardKey { device, .. }
            | RawEvent::PointerMotion { device, .. }
            | RawEvent::PointerMotionAbsolute { device, .. }
            | RawEvent::PointerButton { device, .. }
            | RawEvent::PointerAxis { device, .. }
            | RawEvent::TouchDown { device, .. }
            | RawEvent::TouchMotion { device, .. }
            | RawEvent::TouchUp { device, .. }
            | RawEvent::TouchCancel { device, .. }
            | RawEvent::GesturePinchBegin { device, .. }
            | RawEvent::GesturePinchUpdate { device, .. }
            | RawEvent::GesturePinchEnd { device, .. }
            | RawEvent::GestureSwipeBegin { device, .. }
            | RawEvent::GestureSwipeUpdate { device, .. }
            | RawEvent::GestureSwipeEnd { device, .. }
            | RawEvent::TabletToolAxis { device, .. }
            | RawEvent::TabletToolProximity { device, .. }
            | RawEvent::TabletToolTip { device, .. }
            | RawEvent::TabletToolButton { device, .. }
            | RawEvent::TabletPadButton { device, .. }
            | RawEvent::TabletPadStrip { device, .. }
            | RawEvent::TabletPadRing { device, .. }
            | RawEvent::SwitchToggle { device, .. } => *device,
            RawEvent::DeviceAdded { .. } | RawEvent::DeviceRemoved { .. } => return,
        };

        let Some(id) = self.device_by_source(source_id) else {
            warn!(?source_id, "event from a device this seat does not know");
            return;
        };

        match event {
            RawEvent::KeyboardKey {
                time_us,
                key,
                state,
                seat_key_count,
                ..
            } => {
                if state == KeyState::Autorepeat {
                    warn!("source emitted a synthetic key state, dropping");
                    return;
                }
                // ignore key events that are not seat-wide state changes
                let pressed = state == KeyState::Pressed;
                if (pressed && seat_key_count != 1) || (!pressed && seat_key_count != 0) {
                    debug!(
                        key = format_args!("{key:#x}"),
                        seat_key_count, "dropping key event, not a seat-wide change"
                    );
                    return;
                }
                self.notify_key(id, time_us, key, state);
            }

            RawEvent::PointerMotion {
                time_us,
                dx,
                dy,
                dx_unaccel,
                dy_unaccel,
                ..
            } => {
                self.notify_relative_motion(id, time_us, dx, dy, dx_unaccel, dy_unaccel);
            }

            RawEvent::PointerMotionAbsolute { time_us, x, y, .. } => {
                let (stage_w, stage_h) = self.stage_extents();
                self.notify_absolute_motion(id, time_us, x * stage_w, y * stage_h, None);
            }

            RawEvent::PointerButton {
                time_us,
                button,
                state,
                seat_button_count,
                ..
            } => {
                // ignore button events that are not seat-wide state changes
                let pressed = state == ButtonState::Pressed;
                if (pressed && seat_button_count != 1) || (!pressed && seat_button_count != 0) {
                    debug!(
                        button = format_args!("{button:#x}"),
                        seat_button_count, "dropping button event, not a seat-wide change"
                    );
                    return;
                }
                self.notify_button(id, time_us, button, state);
            }

            RawEvent::PointerAxis {
                time_us,
                source,
                horizontal,
                vertical,
                ..
            } => {
                let scroll_source = translate_scroll_source(source);
                match scroll_source {
                    ScrollSource::Wheel => {
                        let discrete_dx = horizontal.map(|axis| axis.discrete).unwrap_or(0.0);
                        let discrete_dy = vertical.map(|axis| axis.discrete).unwrap_or(0.0);
                        self.notify_discrete_scroll(id, time_us, discrete_dx, discrete_dy, scroll_source);
                    }
                    _ => {
                        let mut finish = ScrollFinishFlags::empty();
                        let mut dx = 0.0;
                        let mut dy = 0.0;
                        if let Some(axis) = horizontal {
                            dx = axis.value;
                            if dx.abs() < f64::EPSILON {
                                finish |= ScrollFinishFlags::HORIZONTAL;
                            }
                        }
                        if let Some(axis) = vertical {
                            dy = axis.value;
                            if dy.abs() < f64::EPSILON {
                                finish |= ScrollFinishFlags::VERTICAL;
                            }
                        }
                        self.notify_scroll_continuous(id, time_us, dx, dy, scroll_source, finish);
                    }
                }
            }

            RawEvent::TouchDown {
                time_us,
                seat_slot,
                x,
                y,
                ..
            } => {
                let (stage_w, stage_h) = self.stage_extents();
                self.notify_touch_down(id, time_us, seat_slot, x * stage_w, y * stage_h);
            }

            RawEvent::TouchMotion {
                time_us,
                seat_slot,
                x,
                y,
                ..
            } => {
                let (stage_w, stage_h) = self.stage_extents();
                self.notify_touch_motion(id, time_us, seat_slot, x * stage_w, y * stage_h);
            }

            RawEvent::TouchUp {
                time_us, seat_slot, ..
            } => {
                self.notify_touch_up(id, time_us, seat_slot);
            }

            RawEvent::TouchCancel {
                time_us, seat_slot, ..
            } => {
                self.notify_touch_cancel(id, time_us, seat_slot);
            }

            RawEvent::GesturePinchBegin {
                time_us, n_fingers, ..
            } => {
                self.notify_pinch_gesture_event(
                    id,
                    GesturePhase::Begin,
                    time_us,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    n_fingers,
                );
            }

            RawEvent::GesturePinchUpdate {
                time_us,
                n_fingers,
                dx,
                dy,
                scale,
                angle_delta,
                ..
            } => {
                self.notify_pinch_gesture_event(
                    id,
                    GesturePhase::Update,
                    time_us,
                    dx,
                    dy,
                    angle_delta,
                    scale,
                    n_fingers,
                );
            }

            RawEvent::GesturePinchEnd {
                time_us,
                n_fingers,
                cancelled,
                ..
            } => {
                let phase = if cancelled {
                    GesturePhase::Cancel
                } else {
                    GesturePhase::End
                };
                self.notify_pinch_gesture_event(id, phase, time_us, 0.0, 0.0, 0.0, 0.0, n_fingers);
            }

            RawEvent::GestureSwipeBegin {
                time_us, n_fingers, ..
            } => {
                self.notify_swipe_gesture_event(id, GesturePhase::Begin, time_us, n_fingers, 0.0, 0.0);
            }

            RawEvent::GestureSwipeUpdate {
                time_us,
                n_fingers,
                dx,
                dy,
                ..
            } => {
                self.notify_swipe_gesture_event(id, GesturePhase::Update, time_us, n_fingers, dx, dy);
            }

            RawEvent::GestureSwipeEnd {
                time_us,
                n_fingers,
                cancelled,
                ..
            } => {
                let phase = if cancelled {
                    GesturePhase::Cancel
                } else {
                    GesturePhase::End
                };
                self.notify_swipe_gesture_event(id, phase, time_us, n_fingers, 0.0, 0.0);
            }

            RawEvent::TabletToolAxis {
                time_us, tool, axes, ..
            } => {
                self.process_tablet_axes(id, time_us, &tool, &axes);
            }

            RawEvent::TabletToolProximity {
                time_us,
                tool,
                state,
                ..
            } => {
                if state == ProximityState::In {
                    self.update_tool(id, Some(&tool));
                }
                self.notify_proximity(id, time_us, state);
                if state == ProximityState::Out {
                    self.update_tool(id, None);
                }
            }

            RawEvent::TabletToolButton {
                time_us,
                tool,
                button,
                state,
                axes,
                ..
            } => {
                self.process_tablet_axes(id, time_us, &tool, &axes);
                self.notify_button(id, time_us, button, state);
            }

            RawEvent::TabletToolTip {
                time_us,
                tool,
                state,
                axes,
                ..
            } => {
                // flush axes before tip down but after tip up, so the
                // contact transition sees correct coordinates
                match state {
                    TipState::Down => {
                        self.process_tablet_axes(id, time_us, &tool, &axes);
                        self.notify_button(id, time_us, BTN_TOUCH, ButtonState::Pressed);
                    }
                    TipState::Up => {
                        self.notify_button(id, time_us, BTN_TOUCH, ButtonState::Released);
                        self.process_tablet_axes(id, time_us, &tool, &axes);
                    }
                }
            }

            RawEvent::TabletPadButton {
                time_us,
                button,
                group,
                mode,
                state,
                ..
            } => {
                self.notify_pad_button(id, time_us, button, group, mode, state);
            }

            RawEvent::TabletPadStrip {
                time_us,
                number,
                source,
                value,
                group,
                mode,
                ..
            } => {
                self.notify_pad_strip(id, time_us, number, source, value, group, mode);
            }

            RawEvent::TabletPadRing {
                time_us,
                number,
                source,
                angle,
                group,
                mode,
                ..
            } => {
                self.notify_pad_ring(id, time_us, number, source, angle, group, mode);
            }

            RawEvent::SwitchToggle { switch, state, .. } => {
                if switch == crate::backend::SwitchKind::TabletMode {
                    self.set_tablet_mode_switch(state == crate::backend::SwitchState::On);
                }
            }

            RawEvent::DeviceAdded { .. } | RawEvent::DeviceRemoved { .. } => {}
        }
    }
}
