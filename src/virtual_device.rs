//! Virtual input devices.
//!
//! A virtual device is a seat-owned device without a source backing it;
//! hosts use it to inject input (remote desktop, test harnesses, on-screen
//! keyboards). Virtual touchscreens own a reserved slot range so their
//! touch points never collide with physical ones or with other virtual
//! devices.

use tracing::warn;

use crate::backend::{ButtonState, KeyState};
use crate::device::{DeviceId, DeviceKind};
use crate::seat::Seat;
use crate::touch::MAX_TOUCH_SLOTS_PER_VIRTUAL_DEVICE;

/// Handle to a virtual input device created by `Seat::create_virtual_device`.
///
/// All injection goes through the owning seat, so every method takes it as
/// an argument. Destroy the device with [`VirtualDevice::destroy`]; dropping
/// the handle leaks the device id and slot reservation.
#[derive(Debug)]
pub struct VirtualDevice {
    device: DeviceId,
    kind: DeviceKind,
    slot_base: Option<u32>,
}

impl VirtualDevice {
    pub(crate) fn new(device: DeviceId, kind: DeviceKind, slot_base: Option<u32>) -> VirtualDevice {
        VirtualDevice {
            device,
            kind,
            slot_base,
        }
    }

    /// Device id of this virtual device.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Kind of the virtual device.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Reserved touch slot base, for virtual touchscreens.
    pub fn slot_base(&self) -> Option<u32> {
        self.slot_base
    }

    /// Inject a key state change.
    pub fn notify_key(&self, seat: &mut Seat, time_us: u64, key: u32, state: KeyState) {
        seat.notify_key(self.device, time_us, key, state);
    }

    /// Inject a button state change.
    pub fn notify_button(&self, seat: &mut Seat, time_us: u64, button: u32, state: ButtonState) {
        seat.notify_button(self.device, time_us, button, state);
    }

    /// Inject relative pointer motion.
    pub fn notify_relative_motion(&self, seat: &mut Seat, time_us: u64, dx: f64, dy: f64) {
        seat.notify_relative_motion(self.device, time_us, dx, dy, dx, dy);
    }

    /// Inject absolute pointer motion in stage coordinates.
    pub fn notify_absolute_motion(&self, seat: &mut Seat, time_us: u64, x: f64, y: f64) {
        seat.notify_absolute_motion(self.device, time_us, x, y, None);
    }

    /// Inject a touch down on a device-local slot.
    pub fn notify_touch_down(&self, seat: &mut Seat, time_us: u64, slot: u32, x: f64, y: f64) {
        let Some(seat_slot) = self.seat_slot(slot) else {
            return;
        };
        seat.notify_touch_down(self.device, time_us, seat_slot, x, y);
    }

    /// Inject touch motion on a device-local slot.
    pub fn notify_touch_motion(&self, seat: &mut Seat, time_us: u64, slot: u32, x: f64, y: f64) {
        let Some(seat_slot) = self.seat_slot(slot) else {
            return;
        };
        seat.notify_touch_motion(self.device, time_us, seat_slot, x, y);
    }

    /// Inject a touch up on a device-local slot.
    pub fn notify_touch_up(&self, seat: &mut Seat, time_us: u64, slot: u32) {
        let Some(seat_slot) = self.seat_slot(slot) else {
            return;
        };
        seat.notify_touch_up(self.device, time_us, seat_slot);
    }

    fn seat_slot(&self, slot: u32) -> Option<i32> {
        let Some(base) = self.slot_base else {
            warn!("touch injection on a virtual device without touch slots");
            return None;
        };
        if slot >= MAX_TOUCH_SLOTS_PER_VIRTUAL_DEVICE {
            warn!(slot, "touch slot beyond the reserved range");
            return None;
        }
        Some((base + slot) as i32)
    }

    /// Remove the device from the seat, releasing its id and any reserved
    /// touch slots.
    pub fn destroy(self, seat: &mut Seat) {
        seat.destroy_virtual_device(self.device, self.slot_base);
    }
}
