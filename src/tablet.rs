//! Tablet tools.
//!
//! A tool is identified by its hardware serial and kind within a tablet
//! device; repeated proximity-in with the same identity yields the same
//! cached [`Tool`]. Tools own their pressure curve and button-code table.

use std::collections::HashMap;

use crate::backend::{TabletAxes, ToolInfo};
use bitflags::bitflags;

/// Physical kind of a tablet tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// A generic pen.
    Pen,
    /// An eraser.
    Eraser,
    /// A paintbrush-like tool.
    Brush,
    /// A pencil-like tool.
    Pencil,
    /// An airbrush-like tool.
    Airbrush,
    /// A mouse bound to the tablet.
    Mouse,
    /// A mouse tool with a lens.
    Lens,
}

bitflags! {
    /// Axes a tool reports beyond x/y.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ToolCapabilities: u32 {
        /// Distance axis.
        const DISTANCE = 1 << 0;
        /// Pressure axis.
        const PRESSURE = 1 << 1;
        /// Tilt axes.
        const TILT = 1 << 2;
        /// Z-rotation axis.
        const ROTATION = 1 << 3;
        /// Slider axis.
        const SLIDER = 1 << 4;
        /// Wheel axis.
        const WHEEL = 1 << 5;
    }
}

/// Identity of a tool within its device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolId {
    /// Hardware serial number.
    pub serial: u64,
    /// Physical tool kind.
    pub kind: ToolKind,
}

/// A cached tablet tool.
#[derive(Debug, Clone)]
pub struct Tool {
    serial: u64,
    kind: ToolKind,
    capabilities: ToolCapabilities,
    pressure_curve: Vec<(f64, f64)>,
    button_map: HashMap<u32, u32>,
}

impl Tool {
    pub(crate) fn new(info: &ToolInfo) -> Tool {
        Tool {
            serial: info.serial,
            kind: info.kind,
            capabilities: info.capabilities,
            pressure_curve: Vec::new(),
            button_map: HashMap::new(),
        }
    }

    /// Identity of this tool.
    pub fn id(&self) -> ToolId {
        ToolId {
            serial: self.serial,
            kind: self.kind,
        }
    }

    /// Kind of the tool.
    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    /// Capability set of the tool.
    pub fn capabilities(&self) -> ToolCapabilities {
        self.capabilities
    }

    /// Install a pressure curve as piecewise-linear control points.
    ///
    /// Points are (input, output) pairs in [0, 1]² and are sorted by input;
    /// an empty list restores the identity curve. Inputs outside the first
    /// and last control point clamp to their outputs.
    pub fn set_pressure_curve(&mut self, mut points: Vec<(f64, f64)>) {
        points.retain(|&(x, y)| (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y));
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.pressure_curve = points;
    }

    /// Map a raw pressure value through the tool's curve.
    pub fn translate_pressure(&self, pressure: f64) -> f64 {
        let pressure = pressure.clamp(0.0, 1.0);
        if self.pressure_curve.is_empty() {
            return pressure;
        }

        let first = self.pressure_curve[0];
        if pressure <= first.0 {
            return first.1;
        }
        for window in self.pressure_curve.windows(2) {
            let (x0, y0) = window[0];
            let (x1, y1) = window[1];
            if pressure <= x1 {
                if x1 == x0 {
                    return y1;
                }
                let t = (pressure - x0) / (x1 - x0);
                return y0 + (y1 - y0) * t;
            }
        }
        self.pressure_curve[self.pressure_curve.len() - 1].1
    }

    /// Remap a logical button number to an evdev event code.
    ///
    /// Mapping to 0 removes the entry.
    pub fn set_button_code(&mut self, logical_button: u32, event_code: u32) {
        if event_code == 0 {
            self.button_map.remove(&logical_button);
        } else {
            self.button_map.insert(logical_button, event_code);
        }
    }

    /// Remapped evdev code for a logical button, if any.
    pub fn button_code(&self, logical_button: u32) -> Option<u32> {
        self.button_map.get(&logical_button).copied()
    }

    /// Build the dense axis vector for an event from this tool.
    ///
    /// The vector always starts with the position scaled into the stage
    /// extents, followed by the axes the tool is capable of, in a fixed
    /// order: distance, pressure (through the pressure curve), tilt x/y,
    /// rotation, slider, wheel.
    pub fn translate_axes(&self, axes: &TabletAxes, extents: (f64, f64)) -> Vec<f64> {
        let mut out = Vec::with_capacity(9);
        out.push(axes.x * extents.0);
        out.push(axes.y * extents.1);

        if self.capabilities.contains(ToolCapabilities::DISTANCE) {
            out.push(axes.distance);
        }
        if self.capabilities.contains(ToolCapabilities::PRESSURE) {
            out.push(self.translate_pressure(axes.pressure));
        }
        if self.capabilities.contains(ToolCapabilities::TILT) {
            out.push(axes.tilt_x);
            out.push(axes.tilt_y);
        }
        if self.capabilities.contains(ToolCapabilities::ROTATION) {
            out.push(axes.rotation);
        }
        if self.capabilities.contains(ToolCapabilities::SLIDER) {
            out.push(axes.slider);
        }
        if self.capabilities.contains(ToolCapabilities::WHEEL) {
            out.push(axes.wheel);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pen(capabilities: ToolCapabilities) -> Tool {
        Tool::new(&ToolInfo {
            serial: 7,
            kind: ToolKind::Pen,
            capabilities,
        })
    }

    #[test]
    fn identity_pressure_by_default() {
        let tool = pen(ToolCapabilities::PRESSURE);
        assert_eq!(tool.translate_pressure(0.0), 0.0);
        assert_eq!(tool.translate_pressure(0.3), 0.3);
        assert_eq!(tool.translate_pressure(1.0), 1.0);
        assert_eq!(tool.translate_pressure(1.5), 1.0);
    }

    #[test]
    fn curve_interpolates_between_control_points() {
        let mut tool = pen(ToolCapabilities::PRESSURE);
        tool.set_pressure_curve(vec![(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)]);
        assert_eq!(tool.translate_pressure(0.25), 0.125);
        assert_eq!(tool.translate_pressure(0.5), 0.25);
        assert_eq!(tool.translate_pressure(0.75), 0.625);

        tool.set_pressure_curve(Vec::new());
        assert_eq!(tool.translate_pressure(0.75), 0.75);
    }

    #[test]
    fn axis_vector_only_carries_capable_axes() {
        let tool = pen(ToolCapabilities::PRESSURE | ToolCapabilities::TILT);
        let axes = TabletAxes {
            x: 0.5,
            y: 0.25,
            pressure: 0.3,
            tilt_x: 10.0,
            tilt_y: -5.0,
            distance: 0.9,
            ..TabletAxes::default()
        };
        let vector = tool.translate_axes(&axes, (1920.0, 1080.0));
        // distance is dropped: the tool cannot report it
        assert_eq!(vector, vec![960.0, 270.0, 0.3, 10.0, -5.0]);
    }

    #[test]
    fn axis_vector_order_is_fixed() {
        let tool = pen(ToolCapabilities::all());
        let axes = TabletAxes {
            x: 0.0,
            y: 0.0,
            distance: 1.0,
            pressure: 2.0,
            tilt_x: 3.0,
            tilt_y: 4.0,
            rotation: 5.0,
            slider: 6.0,
            wheel: 7.0,
            ..TabletAxes::default()
        };
        let vector = tool.translate_axes(&axes, (100.0, 100.0));
        // pressure clamps to [0, 1] on its way through the identity curve
        assert_eq!(vector, vec![0.0, 0.0, 1.0, 1.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn button_codes_can_be_remapped_and_cleared() {
        let mut tool = pen(ToolCapabilities::empty());
        assert_eq!(tool.button_code(2), None);
        tool.set_button_code(2, 0x14b);
        assert_eq!(tool.button_code(2), Some(0x14b));
        tool.set_button_code(2, 0);
        assert_eq!(tool.button_code(2), None);
    }
}
