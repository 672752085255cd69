//! The seat: shared input state and the public engine surface.
//!
//! A [`Seat`] owns the event source, every device, the keyboard state, the
//! touch table, the barrier manager and the outbound event queue. All
//! methods must be called from the thread driving the dispatch loop.

mod motion;
mod translate;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

use tracing::{debug, info, warn};
use xkbcommon::xkb;

use crate::backend::{DeviceInfo, InputSource, KeyState, Leds, RawEvent, SourceId};
use crate::barrier::BarrierManager;
use crate::constraint::PointerConstraint;
use crate::device::{Device, DeviceId, DeviceIdPool, DeviceKind, MappingMode};
use crate::event::{Event, EventKind, Modifiers, TouchSequence};
use crate::keyboard::{Error, KeyboardState, XkbConfig};
use crate::tablet::ToolId;
use crate::touch::{TouchSlotMap, VirtualSlotPool};
use crate::utils::Point;
use crate::viewport::Viewports;
use crate::virtual_device::VirtualDevice;

/// Initial pointer position after seat creation, safely inside any stage.
pub const INITIAL_POINTER_X: f64 = 16.0;
/// Initial pointer position after seat creation, safely inside any stage.
pub const INITIAL_POINTER_Y: f64 = 16.0;

/// Default auto-repeat delay in milliseconds.
pub const DEFAULT_REPEAT_DELAY_MS: u32 = 250;
/// Default auto-repeat interval in milliseconds.
pub const DEFAULT_REPEAT_INTERVAL_MS: u32 = 33;

// KEY_CNT from linux/input-event-codes.h; bounds the per-seat press counters
pub(crate) const KEY_CNT: usize = 0x300;

bitflags::bitflags! {
    /// Keyboard accessibility features toggled by the host.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KbdA11yFlags: u32 {
        /// Keyboard accessibility is enabled.
        const ENABLED = 1 << 0;
        /// Ignore quickly repeated presses of the same key.
        const BOUNCE_KEYS_ENABLED = 1 << 1;
        /// Require keys to be held before registering.
        const SLOW_KEYS_ENABLED = 1 << 2;
        /// Latch modifier keys.
        const STICKY_KEYS_ENABLED = 1 << 3;
        /// Announce lock key state changes.
        const TOGGLE_KEYS_ENABLED = 1 << 4;
        /// Drive the pointer from the keypad.
        const MOUSE_KEYS_ENABLED = 1 << 5;
        /// Beep when a feature is toggled.
        const FEATURE_STATE_CHANGE_BEEP = 1 << 6;
    }
}

/// Error returned by [`Seat::query_state`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    /// The device or touch sequence is not known to this seat.
    #[error("no state for the given device or sequence")]
    NotFound,
}

/// Pending change to the host-managed repeat timer.
///
/// The engine schedules auto-repeat by queueing these operations; the loop
/// integration applies them after every dispatch (see the `dispatch`
/// module). At most one operation is pending, the latest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatTimerOp {
    /// (Re-)arm the timer to fire once after the given delay.
    Arm(Duration),
    /// Cancel the timer.
    Cancel,
}

/// Observer for seat-level notifications that are not input events.
///
/// The seat holds a single sink; multiplex externally if several listeners
/// are needed. All methods have empty defaults.
pub trait SeatObserver {
    /// Touch mode flipped (touchscreen present and usable).
    fn touch_mode_changed(&mut self, _enabled: bool) {}

    /// The xkb modifier state changed in a way that affects LEDs.
    fn mods_state_changed(&mut self) {}

    /// The tool in proximity on a tablet changed.
    fn tool_changed(&mut self, _device: DeviceId, _tool: Option<ToolId>) {}

    /// The host should ring the bell.
    fn bell(&mut self) {}

    /// Keyboard accessibility flags changed.
    fn kbd_a11y_flags_changed(&mut self, _new_flags: KbdA11yFlags, _what_changed: KbdA11yFlags) {}

    /// Sticky-keys latched/locked modifiers changed.
    fn kbd_a11y_mods_state_changed(&mut self, _latched: u32, _locked: u32) {}

    /// A lock key toggled while toggle-keys notifications are enabled.
    fn toggle_keys_changed(&mut self, _leds: Leds) {}

    /// The pointer was warped; cursor renderers should update.
    fn pointer_warped(&mut self, _x: f64, _y: f64) {}
}

/// The input seat engine.
pub struct Seat {
    name: String,
    source: Box<dyn InputSource>,
    pub(crate) keyboard: KeyboardState,

    devices: Vec<Device>,
    source_ids: HashMap<SourceId, DeviceId>,
    ids: DeviceIdPool,
    core_pointer: DeviceId,
    core_keyboard: DeviceId,

    pub(crate) touch_states: TouchSlotMap,
    virtual_slots: VirtualSlotPool,

    pub(crate) button_state: Modifiers,
    button_count: Vec<u32>,

    pub(crate) pointer_x: f64,
    pub(crate) pointer_y: f64,
    pub(crate) accum_scroll_dx: f64,
    pub(crate) accum_scroll_dy: f64,

    barrier_manager: BarrierManager,
    constraint: Option<Box<dyn PointerConstraint>>,
    pub(crate) viewports: Option<Viewports>,
    pub(crate) stage_views_scaled: bool,

    observer: Option<Box<dyn SeatObserver>>,
    queue: VecDeque<Event>,

    released: bool,
    tablet_mode_switch_state: bool,
    has_touchscreen: bool,
    has_tablet_switch: bool,
    touch_mode: bool,
    a11y_flags: KbdA11yFlags,

    repeat: bool,
    repeat_delay: u32,
    repeat_interval: u32,
    pub(crate) repeat_key: u32,
    repeat_count: u32,
    repeat_device: Option<DeviceId>,
    repeat_armed: bool,
    timer_op: Option<RepeatTimerOp>,
}

impl fmt::Debug for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seat")
            .field("name", &self.name)
            .field("devices", &self.devices)
            .field("pointer", &(self.pointer_x, self.pointer_y))
            .field("touch_mode", &self.touch_mode)
            .field("released", &self.released)
            .finish()
    }
}

impl Seat {
    /// Create a seat around an event source.
    ///
    /// The seat starts with the two logical core devices, the pointer parked
    /// at ([`INITIAL_POINTER_X`], [`INITIAL_POINTER_Y`]) and auto-repeat
    /// enabled with the default delay and interval.
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn InputSource>,
        xkb_config: XkbConfig<'_>,
    ) -> Result<Seat, Error> {
        let name = name.into();
        info!(seat = name.as_str(), "creating input seat");

        let keyboard = KeyboardState::new(&xkb_config)?;

        let mut ids = DeviceIdPool::new();
        let core_pointer = ids.acquire();
        let core_keyboard = ids.acquire();

        let mut pointer = Device::new_logical(core_pointer, DeviceKind::Pointer);
        pointer.position = Point::new(INITIAL_POINTER_X, INITIAL_POINTER_Y);
        let kbd_device = Device::new_logical(core_keyboard, DeviceKind::Keyboard);

        Ok(Seat {
            name,
            source,
            keyboard,
            devices: vec![pointer, kbd_device],
            source_ids: HashMap::new(),
            ids,
            core_pointer,
            core_keyboard,
            touch_states: TouchSlotMap::new(),
            virtual_slots: VirtualSlotPool::new(),
            button_state: Modifiers::empty(),
            button_count: vec![0; KEY_CNT],
            pointer_x: INITIAL_POINTER_X,
            pointer_y: INITIAL_POINTER_Y,
            accum_scroll_dx: 0.0,
            accum_scroll_dy: 0.0,
            barrier_manager: BarrierManager::new(),
            constraint: None,
            viewports: None,
            stage_views_scaled: false,
            observer: None,
            queue: VecDeque::new(),
            released: false,
            tablet_mode_switch_state: false,
            has_touchscreen: false,
            has_tablet_switch: false,
            touch_mode: false,
            a11y_flags: KbdA11yFlags::empty(),
            repeat: true,
            repeat_delay: DEFAULT_REPEAT_DELAY_MS,
            repeat_interval: DEFAULT_REPEAT_INTERVAL_MS,
            repeat_key: 0,
            repeat_count: 0,
            repeat_device: None,
            repeat_armed: false,
            timer_op: None,
        })
    }

    /// Name of the seat.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install the observer receiving seat notifications.
    pub fn set_observer(&mut self, observer: Box<dyn SeatObserver>) {
        self.observer = Some(observer);
    }

    pub(crate) fn emit<F: FnOnce(&mut dyn SeatObserver)>(&mut self, f: F) {
        if let Some(observer) = &mut self.observer {
            f(observer.as_mut());
        }
    }

    /// The logical core pointer.
    pub fn pointer(&self) -> DeviceId {
        self.core_pointer
    }

    /// The logical core keyboard.
    pub fn keyboard(&self) -> DeviceId {
        self.core_keyboard
    }

    /// Current pointer position in stage coordinates.
    pub fn pointer_position(&self) -> Point {
        Point::new(self.pointer_x, self.pointer_y)
    }

    /// Iterate over all devices, the logical core devices included.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    /// Look up a device by id.
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|device| device.id == id)
    }

    pub(crate) fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.iter_mut().find(|device| device.id == id)
    }

    pub(crate) fn device_by_source(&self, source: SourceId) -> Option<DeviceId> {
        self.source_ids.get(&source).copied()
    }

    /// The keymap in use.
    pub fn keymap(&self) -> &xkb::Keymap {
        self.keyboard.keymap()
    }

    /// The seat's keyboard state.
    pub fn keyboard_state(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Whether touch mode is active.
    pub fn touch_mode(&self) -> bool {
        self.touch_mode
    }

    /// Pollable fd of the underlying event source.
    pub fn source_fd(&self) -> RawFd {
        self.source.fd()
    }

    /// The barrier manager of this seat.
    pub fn barrier_manager_mut(&mut self) -> &mut BarrierManager {
        &mut self.barrier_manager
    }

    /// Install or clear the pointer constraint.
    ///
    /// Installing a constraint immediately re-constrains the current pointer
    /// position.
    pub fn set_pointer_constraint(&mut self, constraint: Option<Box<dyn PointerConstraint>>) {
        self.constraint = constraint;
        if self.constraint.is_some() {
            let origin = Point::new(self.pointer_x, self.pointer_y);
            let constrained = self
                .constraint
                .as_mut()
                .map(|c| c.constrain(0, origin, origin))
                .unwrap_or(origin);
            if constrained != origin {
                self.warp_pointer(constrained.x, constrained.y);
            }
        }
    }

    pub(crate) fn constrain_with_constraint(&mut self, time_ms: u32, origin: Point, pos: Point) -> Point {
        match &mut self.constraint {
            Some(constraint) => constraint.constrain(time_ms, origin, pos),
            None => pos,
        }
    }

    pub(crate) fn constrain_with_barriers(&mut self, time_ms: u32, origin: Point, pos: &mut Point) {
        self.barrier_manager.constrain(time_ms, origin, pos);
    }

    /// Set or clear the viewport layout.
    pub fn set_viewports(&mut self, viewports: Option<Viewports>) {
        self.viewports = viewports;
    }

    /// Tell the engine whether stage views are already scaled, which
    /// disables cross-output relative motion scaling.
    pub fn set_stage_views_scaled(&mut self, scaled: bool) {
        self.stage_views_scaled = scaled;
    }

    /// Map a device's absolute coordinates onto one view, or back to the
    /// whole stage.
    pub fn map_device_to_view(&mut self, device: DeviceId, view: Option<usize>) {
        if let Some(device) = self.device_mut(device) {
            device.mapped_view = view;
        }
    }

    /// Set a tablet's coordinate mapping mode.
    pub fn set_device_mapping_mode(&mut self, device: DeviceId, mode: MappingMode) {
        if let Some(device) = self.device_mut(device) {
            device.mapping_mode = mode;
        }
    }

    /// Mutable access to a cached tablet tool, for configuring its pressure
    /// curve or button-code table.
    pub fn tool_mut(&mut self, device: DeviceId, tool: ToolId) -> Option<&mut crate::tablet::Tool> {
        self.device_mut(device)?.tool_mut(tool)
    }

    // ---- event queue ----

    pub(crate) fn queue_event(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Number of translated events waiting to be drained.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Pop the oldest translated event.
    pub fn pop_event(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    /// Drain all translated events.
    pub fn drain_events(&mut self) -> std::collections::vec_deque::Drain<'_, Event> {
        self.queue.drain(..)
    }

    // ---- dispatch loop ----

    /// Drain the source's kernel queue and translate everything queued.
    pub fn dispatch(&mut self) -> io::Result<()> {
        self.source.dispatch()?;
        self.process_source_events();
        Ok(())
    }

    pub(crate) fn process_source_events(&mut self) {
        while let Some(event) = self.source.next_event() {
            self.process_event(event);
        }
    }

    fn process_event(&mut self, event: RawEvent) {
        if self.process_base_event(&event) {
            return;
        }
        self.process_device_event(event);
    }

    fn process_base_event(&mut self, event: &RawEvent) -> bool {
        match event {
            RawEvent::DeviceAdded { device, info } => {
                self.add_source_device(*device, info.clone());
                true
            }
            RawEvent::DeviceRemoved { device } => {
                self.remove_source_device(*device);
                true
            }
            _ => false,
        }
    }

    // ---- device registry ----

    fn add_source_device(&mut self, source_id: SourceId, info: DeviceInfo) {
        if self.source_ids.contains_key(&source_id) {
            warn!(?source_id, "source re-announced a known device");
            return;
        }

        let id = self.ids.acquire();
        let mut device = Device::new_physical(id, Some(source_id), &info);
        device.leader = match device.kind {
            DeviceKind::Keyboard => Some(self.core_keyboard),
            DeviceKind::Pointer => Some(self.core_pointer),
            _ => None,
        };

        info!(name = info.name.as_str(), kind = ?device.kind, id = id.raw(), "new device");

        let is_touchscreen = device.kind == DeviceKind::Touchscreen;
        let is_tablet_switch = device.has_tablet_mode_switch;

        self.devices.push(device);
        self.source_ids.insert(source_id, id);

        self.has_touchscreen |= is_touchscreen;
        self.has_tablet_switch |= is_tablet_switch;

        self.queue_device_event(id, EventKind::DeviceAdded);

        if is_touchscreen || is_tablet_switch {
            self.update_touch_mode();
        }

        // a new keyboard starts with stale LEDs
        let leds = self.keyboard.led_state();
        if !leds.is_empty() {
            self.source.update_leds(source_id, leds);
        }
    }

    fn remove_source_device(&mut self, source_id: SourceId) {
        let Some(id) = self.source_ids.remove(&source_id) else {
            warn!(?source_id, "source removed an unknown device");
            return;
        };
        self.remove_device_common(id);
    }

    pub(crate) fn remove_device_common(&mut self, id: DeviceId) {
        let Some(index) = self.devices.iter().position(|device| device.id == id) else {
            warn!(id = id.raw(), "removing unknown device");
            return;
        };
        let device = self.devices.remove(index);

        info!(name = device.name.as_str(), id = id.raw(), "removed device");

        let was_touchscreen = device.kind == DeviceKind::Touchscreen;
        let was_tablet_switch = device.has_tablet_mode_switch;

        if was_touchscreen {
            self.has_touchscreen = self
                .devices
                .iter()
                .any(|device| device.kind == DeviceKind::Touchscreen);
        }
        if was_tablet_switch {
            self.has_tablet_switch = self.devices.iter().any(|device| device.has_tablet_mode_switch);
        }
        if was_touchscreen || was_tablet_switch {
            self.update_touch_mode();
        }

        if self.repeat_armed && self.repeat_device == Some(id) {
            self.clear_repeat_timer();
        }

        self.ids.release(id);
        self.queue_device_event(id, EventKind::DeviceRemoved);
    }

    fn queue_device_event(&mut self, id: DeviceId, kind: EventKind) {
        let modifiers = self.keyboard.modifiers(self.button_state);
        self.queue_event(Event {
            time: 0,
            time_us: 0,
            modifiers,
            device: id,
            source_device: id,
            flags: Default::default(),
            event_code: None,
            relative_motion: None,
            kind,
        });
    }

    // ---- touch mode ----

    pub(crate) fn set_tablet_mode_switch(&mut self, on: bool) {
        self.tablet_mode_switch_state = on;
        self.update_touch_mode();
    }

    pub(crate) fn update_touch_mode(&mut self) {
        // no touchscreen, no touch mode; with a tablet-mode switch, honor
        // it being off; without one (kiosks), presence is enough
        let touch_mode = self.has_touchscreen
            && (!self.has_tablet_switch || self.tablet_mode_switch_state);

        if self.touch_mode != touch_mode {
            self.touch_mode = touch_mode;
            debug!(touch_mode, "touch mode changed");
            self.emit(|observer| observer.touch_mode_changed(touch_mode));
        }
    }

    // ---- keyboard configuration ----

    /// Replace the keyboard map.
    ///
    /// The xkb state is rebuilt; latched and locked modifiers and the layout
    /// index survive. Callers should make sure no key is held.
    pub fn set_keyboard_map(&mut self, keymap: xkb::Keymap) {
        self.keyboard.set_keymap(keymap);
        self.sync_leds();
    }

    /// Compile and install a keymap from an xkb configuration.
    pub fn set_keyboard_config(&mut self, config: &XkbConfig<'_>) -> Result<(), Error> {
        let keymap = self.keyboard.compile(config)?;
        self.set_keyboard_map(keymap);
        Ok(())
    }

    /// Switch the keyboard layout index.
    pub fn set_keyboard_layout_index(&mut self, idx: u32) {
        self.keyboard.set_layout_index(idx);
    }

    /// The active keyboard layout index.
    pub fn keyboard_layout_index(&self) -> u32 {
        self.keyboard.layout_index()
    }

    /// Set or clear numlock.
    pub fn set_keyboard_numlock(&mut self, enabled: bool) {
        self.keyboard.set_numlock(enabled);
        self.sync_leds();
    }

    /// Configure key auto-repeat.
    pub fn set_keyboard_repeat(&mut self, enabled: bool, delay_ms: u32, interval_ms: u32) {
        self.repeat = enabled;
        self.repeat_delay = delay_ms;
        self.repeat_interval = interval_ms;
    }

    /// Push the current LED state to every device.
    pub fn sync_leds(&mut self) {
        let leds = self.keyboard.led_state();
        let sources: Vec<SourceId> = self.devices.iter().filter_map(|device| device.source).collect();
        for source in sources {
            self.source.update_leds(source, leds);
        }
    }

    pub(crate) fn update_xkb_state(&mut self) {
        self.keyboard.rebuild_state();
        self.sync_leds();
    }

    // ---- repeat timer ----

    pub(crate) fn clear_repeat_timer(&mut self) {
        if self.repeat_armed {
            self.repeat_armed = false;
            self.repeat_device = None;
            self.timer_op = Some(RepeatTimerOp::Cancel);
        }
    }

    pub(crate) fn arm_repeat_timer(&mut self, device: DeviceId, interval_ms: u32) {
        self.repeat_device = Some(device);
        self.repeat_armed = true;
        self.timer_op = Some(RepeatTimerOp::Arm(Duration::from_millis(u64::from(interval_ms))));
    }

    pub(crate) fn repeat_enabled(&self) -> bool {
        self.repeat
    }

    pub(crate) fn repeat_delay(&self) -> u32 {
        self.repeat_delay
    }

    /// Current auto-repeat interval in milliseconds.
    pub fn repeat_interval(&self) -> u32 {
        self.repeat_interval
    }

    pub(crate) fn bump_repeat_count(&mut self, pressed: bool) -> u32 {
        if pressed {
            self.repeat_count = 0;
        }
        self.repeat_count += 1;
        self.repeat_count
    }

    /// Take the pending repeat-timer operation, if any.
    ///
    /// Loop integrations call this after every dispatch, event injection and
    /// timer firing, and apply the operation to their timer source.
    pub fn take_repeat_timer_op(&mut self) -> Option<RepeatTimerOp> {
        self.timer_op.take()
    }

    /// Drive the auto-repeat timer.
    ///
    /// Called by the loop integration when the armed deadline elapses, with
    /// the current time. Pending source events are dispatched first since
    /// they may cancel the repeat. Returns `true` when the timer stays
    /// armed and should fire again after [`Seat::repeat_interval`].
    pub fn dispatch_key_repeat(&mut self, time_us: u64) -> bool {
        // events queued in the source may cancel the repeat timer
        if let Err(err) = self.dispatch() {
            warn!("dispatch before key repeat failed: {err}");
        }
        if !self.repeat_armed {
            return false;
        }
        let Some(device) = self.repeat_device else {
            warn!("repeat timer armed without a device");
            self.repeat_armed = false;
            return false;
        };

        let key = self.repeat_key;
        self.notify_key_full(device, time_us, key, KeyState::Autorepeat, false);
        self.repeat_armed
    }

    // ---- per-seat button counter ----

    /// Count a press or release towards the per-seat button counter.
    ///
    /// Returns `None` for a release whose counter is already 0 (a phantom
    /// release, e.g. for a press swallowed before a reclaim); such events
    /// are dropped by the callers.
    pub(crate) fn update_button_count(&mut self, button: u32, pressed: bool) -> Option<u32> {
        let Some(count) = self.button_count.get_mut(button as usize) else {
            warn!(button, "button code out of range");
            return None;
        };
        if pressed {
            *count += 1;
            Some(*count)
        } else if *count == 0 {
            debug!(button = format_args!("{button:#x}"), "release with count already 0");
            None
        } else {
            *count -= 1;
            Some(*count)
        }
    }

    /// Current press count of a key or button code.
    pub fn button_count(&self, button: u32) -> u32 {
        self.button_count.get(button as usize).copied().unwrap_or(0)
    }

    // ---- release / reclaim ----

    /// Suspend input processing for a tty switch.
    ///
    /// The source closes its device fds; remaining events are drained.
    /// Calling this twice without a reclaim in between warns and does
    /// nothing.
    pub fn release_devices(&mut self) {
        if self.released {
            warn!("release_devices() called twice without reclaim_devices()");
            return;
        }

        self.clear_repeat_timer();
        self.source.suspend();
        self.process_source_events();
        self.released = true;
    }

    /// Resume input processing after a tty switch.
    ///
    /// The source re-probes devices; the xkb state is rebuilt with latched
    /// and locked modifiers preserved and LEDs re-synced. Calling this
    /// without a prior release warns and does nothing.
    pub fn reclaim_devices(&mut self) {
        if !self.released {
            warn!("reclaim_devices() called without a previous release_devices()");
            return;
        }

        if let Err(err) = self.source.resume() {
            warn!("failed to resume the event source: {err}");
        }
        self.update_xkb_state();
        self.process_source_events();
        self.released = false;
    }

    /// Whether the seat is released for a tty switch.
    pub fn is_released(&self) -> bool {
        self.released
    }

    // ---- pointer surface ----

    /// Warp the pointer to the given stage position.
    ///
    /// Emits a motion event at time 0 and notifies the observer so cursor
    /// renderers can update.
    pub fn warp_pointer(&mut self, x: f64, y: f64) {
        let pointer = self.core_pointer;
        self.notify_absolute_motion(pointer, 0, x, y, None);
        let (px, py) = (self.pointer_x, self.pointer_y);
        self.emit(|observer| observer.pointer_warped(px, py));
    }

    /// Query the state of a device or touch sequence.
    pub fn query_state(
        &self,
        device: DeviceId,
        sequence: Option<TouchSequence>,
    ) -> Result<(Point, Modifiers), QueryError> {
        if let Some(sequence) = sequence {
            let state = self
                .touch_states
                .lookup(sequence.slot())
                .ok_or(QueryError::NotFound)?;
            return Ok((state.coords, self.keyboard.modifiers(Modifiers::empty())));
        }

        let device = self.device(device).ok_or(QueryError::NotFound)?;
        Ok((device.position, self.keyboard.modifiers(self.button_state)))
    }

    // ---- virtual devices ----

    /// Create a virtual input device of the given kind.
    ///
    /// Virtual touchscreens reserve a range of touch slots that stays clear
    /// of physical slots and of other virtual devices.
    pub fn create_virtual_device(&mut self, kind: DeviceKind) -> VirtualDevice {
        let id = self.ids.acquire();
        let mut device = Device::new_virtual(id, kind);
        device.leader = match kind {
            DeviceKind::Keyboard => Some(self.core_keyboard),
            DeviceKind::Pointer => Some(self.core_pointer),
            _ => None,
        };

        let slot_base = (kind == DeviceKind::Touchscreen).then(|| self.virtual_slots.reserve_next());

        info!(id = id.raw(), ?kind, ?slot_base, "new virtual device");

        let is_touchscreen = kind == DeviceKind::Touchscreen;
        self.devices.push(device);
        self.has_touchscreen |= is_touchscreen;
        self.queue_device_event(id, EventKind::DeviceAdded);
        if is_touchscreen {
            self.update_touch_mode();
        }

        VirtualDevice::new(id, kind, slot_base)
    }

    pub(crate) fn destroy_virtual_device(&mut self, id: DeviceId, slot_base: Option<u32>) {
        if let Some(base) = slot_base {
            self.virtual_slots.release(base);
        }
        self.remove_device_common(id);
    }

    // ---- accessibility and bell ----

    /// Forward changed keyboard accessibility flags to the observer and
    /// remember them for toggle-keys notifications.
    pub fn notify_kbd_a11y_flags_changed(&mut self, new_flags: KbdA11yFlags, what_changed: KbdA11yFlags) {
        self.a11y_flags = new_flags;
        self.emit(|observer| observer.kbd_a11y_flags_changed(new_flags, what_changed));
    }

    /// Forward a sticky-keys modifier change to the observer.
    pub fn notify_kbd_a11y_mods_state_changed(&mut self, latched: u32, locked: u32) {
        self.emit(|observer| observer.kbd_a11y_mods_state_changed(latched, locked));
    }

    /// Ask the host to ring the bell.
    pub fn notify_bell(&mut self) {
        self.emit(|observer| observer.bell());
    }

    pub(crate) fn maybe_notify_toggle_keys(&mut self) {
        if self.a11y_flags.contains(KbdA11yFlags::TOGGLE_KEYS_ENABLED) {
            let leds = self.keyboard.led_state();
            self.emit(|observer| observer.toggle_keys_changed(leds));
        }
    }
}
