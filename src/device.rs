//! Input devices known to the seat.
//!
//! The seat owns every [`Device`]; the rest of the engine and all emitted
//! events refer to devices through [`DeviceId`] handles. Two logical devices
//! (the core pointer and core keyboard) exist from seat creation; physical
//! keyboards and pointers are attached to them as their leader.

use crate::backend::{DeviceCapabilities, DeviceInfo, SourceId};
use crate::tablet::{Tool, ToolId};
use crate::utils::Point;

/// First id handed out; 0 and 1 are reserved by convention for the core
/// pointer and core keyboard leaders of the windowing system the ids are
/// reported to.
pub const INITIAL_DEVICE_ID: u32 = 2;

const DEVICE_ID_GROW_STEP: u32 = 10;

/// Stable handle of a device within its seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u32);

impl DeviceId {
    pub(crate) fn from_raw(id: u32) -> DeviceId {
        DeviceId(id)
    }

    /// Raw integer value of the id.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Kind of an input device. Kinds are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Relative pointing device.
    Pointer,
    /// Keyboard.
    Keyboard,
    /// Device with no recognized capability.
    Extension,
    /// Joystick.
    Joystick,
    /// Drawing tablet.
    Tablet,
    /// Touchpad.
    Touchpad,
    /// Direct-touch screen.
    Touchscreen,
    /// Pen tool device.
    Pen,
    /// Eraser tool device.
    Eraser,
    /// Cursor tool device.
    Cursor,
    /// Tablet pad.
    Pad,
}

impl DeviceKind {
    /// Classify a raw device from its capabilities.
    ///
    /// Tap configurability identifies touchpads among pointer devices;
    /// tablet capabilities win over the generic pointer capability a tablet
    /// may also advertise.
    pub fn classify(info: &DeviceInfo) -> DeviceKind {
        let caps = info.capabilities;
        if caps.contains(DeviceCapabilities::TABLET_TOOL) {
            DeviceKind::Tablet
        } else if caps.contains(DeviceCapabilities::TABLET_PAD) {
            DeviceKind::Pad
        } else if info.tap_finger_count > 0 {
            DeviceKind::Touchpad
        } else if caps.contains(DeviceCapabilities::POINTER) {
            DeviceKind::Pointer
        } else if caps.contains(DeviceCapabilities::TOUCH) {
            DeviceKind::Touchscreen
        } else if caps.contains(DeviceCapabilities::KEYBOARD) {
            DeviceKind::Keyboard
        } else {
            DeviceKind::Extension
        }
    }
}

/// Whether a device is a physical device or a logical aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputMode {
    /// Concrete hardware (or virtual) device.
    Physical,
    /// Logical device merging the state of its physical children.
    Logical,
}

/// How tablet coordinates map to the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingMode {
    /// The tablet surface maps onto the stage (or a mapped view).
    Absolute,
    /// The tablet behaves like a relative pointing device.
    Relative,
}

/// An input device owned by the seat.
#[derive(Debug)]
pub struct Device {
    pub(crate) id: DeviceId,
    pub(crate) name: String,
    pub(crate) kind: DeviceKind,
    pub(crate) mode: InputMode,
    pub(crate) leader: Option<DeviceId>,
    pub(crate) source: Option<SourceId>,
    pub(crate) has_tablet_mode_switch: bool,
    pub(crate) position: Point,
    pub(crate) mapping_mode: MappingMode,
    pub(crate) mapped_view: Option<usize>,
    pub(crate) tools: Vec<Tool>,
    pub(crate) last_tool: Option<usize>,
}

impl Device {
    pub(crate) fn new_logical(id: DeviceId, kind: DeviceKind) -> Device {
        let name = match kind {
            DeviceKind::Keyboard => "Virtual core keyboard",
            _ => "Virtual core pointer",
        };
        Device {
            id,
            name: name.to_owned(),
            kind,
            mode: InputMode::Logical,
            leader: None,
            source: None,
            has_tablet_mode_switch: false,
            position: Point::default(),
            mapping_mode: MappingMode::Absolute,
            mapped_view: None,
            tools: Vec::new(),
            last_tool: None,
        }
    }

    pub(crate) fn new_virtual(id: DeviceId, kind: DeviceKind) -> Device {
        let mut device = Device::new_logical(id, kind);
        device.name = format!("Virtual {kind:?} device");
        device.mode = InputMode::Physical;
        device
    }

    pub(crate) fn new_physical(id: DeviceId, source: Option<SourceId>, info: &DeviceInfo) -> Device {
        Device {
            id,
            name: info.name.clone(),
            kind: DeviceKind::classify(info),
            mode: InputMode::Physical,
            leader: None,
            source,
            has_tablet_mode_switch: info.has_tablet_mode_switch,
            position: Point::default(),
            mapping_mode: MappingMode::Absolute,
            mapped_view: None,
            tools: Vec::new(),
            last_tool: None,
        }
    }

    /// Id of this device.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Device name as reported by the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the device.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Input mode of the device.
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Leader this physical device feeds, if any.
    pub fn leader(&self) -> Option<DeviceId> {
        self.leader
    }

    /// Last cached position of the device in stage coordinates.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Coordinate mapping mode, meaningful for tablets.
    pub fn mapping_mode(&self) -> MappingMode {
        self.mapping_mode
    }

    /// Tool currently in proximity, for tablets.
    pub fn current_tool(&self) -> Option<ToolId> {
        self.last_tool.map(|idx| self.tools[idx].id())
    }

    /// Look up a cached tool by identity.
    pub fn tool(&self, id: ToolId) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.id() == id)
    }

    /// Mutable access to a cached tool.
    pub fn tool_mut(&mut self, id: ToolId) -> Option<&mut Tool> {
        self.tools.iter_mut().find(|tool| tool.id() == id)
    }
}

/// Allocator for the small integer ids devices are known by.
///
/// Ids ascend from [`INITIAL_DEVICE_ID`]. Released ids are kept in a sorted
/// free list and handed out lowest-first, so allocation order is
/// deterministic across add/remove churn.
#[derive(Debug)]
pub(crate) struct DeviceIdPool {
    next: u32,
    free: Vec<u32>,
}

impl DeviceIdPool {
    pub(crate) fn new() -> DeviceIdPool {
        DeviceIdPool {
            next: INITIAL_DEVICE_ID,
            free: Vec::new(),
        }
    }

    pub(crate) fn acquire(&mut self) -> DeviceId {
        if self.free.is_empty() {
            for _ in 0..DEVICE_ID_GROW_STEP {
                self.free.push(self.next);
                self.next += 1;
            }
        }
        DeviceId(self.free.remove(0))
    }

    pub(crate) fn release(&mut self, id: DeviceId) {
        let pos = self.free.partition_point(|&free| free < id.0);
        self.free.insert(pos, id.0);
    }
}
