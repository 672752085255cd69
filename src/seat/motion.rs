//! Pointer motion pipeline: the constrain chain, cross-output relative
//! motion scaling and absolute motion event construction.

use tracing::trace;

use super::Seat;
use crate::device::{DeviceId, DeviceKind};
use crate::event::{us2ms, Event, EventKind, RelativeMotion};
use crate::utils::{Line, Point};
use crate::viewport::{Direction, Viewports};

impl Seat {
    /// Run the constrain chain on a candidate pointer position.
    ///
    /// Order is fixed: barriers first, then the external constraint, then
    /// the monitor clamp that keeps the pointer from escaping the stage.
    pub(crate) fn constrain_pointer(&mut self, time_us: u64, current: Point, candidate: Point) -> Point {
        let time_ms = us2ms(time_us);

        let mut pos = candidate;
        self.constrain_with_barriers(time_ms, current, &mut pos);
        pos = self.constrain_with_constraint(time_ms, current, pos);

        if let Some(viewports) = &self.viewports {
            // moving inside a monitor is fine
            if viewports.view_at(pos).is_none() {
                clamp_to_current_view(viewports, current, &mut pos);
            }
        }

        pos
    }

    /// Scale a relative motion for the view it starts in, walking across
    /// outputs when the motion leaves it.
    pub(crate) fn filter_relative_motion(&self, current: Point, dx: f64, dy: f64) -> (f64, f64) {
        if self.stage_views_scaled {
            return (dx, dy);
        }
        let Some(viewports) = &self.viewports else {
            return (dx, dy);
        };
        let Some(view) = viewports.view_at(current) else {
            return (dx, dy);
        };

        let scale = viewports.view(view).map(|view| view.scale).unwrap_or(1.0);
        let new_dx = dx * scale;
        let new_dy = dy * scale;

        match viewports.view_at((current.x + new_dx, current.y + new_dy)) {
            Some(dest) if dest != view => {
                // crossing monitors: bisect the motion segment, applying
                // each view's scale to the part that travels through it
                relative_motion_across_outputs(viewports, view, current, dx, dy)
            }
            _ => (new_dx, new_dy),
        }
    }

    /// Feed absolute motion in stage coordinates into the seat.
    ///
    /// Non-tablet motion runs through the constrain chain and moves the
    /// seat pointer; tablets keep their own position and skip constraints.
    pub fn notify_absolute_motion(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        x: f64,
        y: f64,
        axes: Option<Vec<f64>>,
    ) {
        let event = self.new_absolute_motion_event(device_id, time_us, x, y, axes);
        self.queue_event(event);
    }

    /// Feed relative motion into the seat, applying cross-output scaling.
    pub fn notify_relative_motion(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        dx: f64,
        dy: f64,
        dx_unaccel: f64,
        dy_unaccel: f64,
    ) {
        let current = Point::new(self.pointer_x, self.pointer_y);
        let (dx, dy) = self.filter_relative_motion(current, dx, dy);

        let new_x = self.pointer_x + dx;
        let new_y = self.pointer_y + dy;
        let mut event = self.new_absolute_motion_event(device_id, time_us, new_x, new_y, None);
        event.relative_motion = Some(RelativeMotion {
            dx,
            dy,
            dx_unaccel,
            dy_unaccel,
        });

        self.queue_event(event);
    }

    /// Relative tool motion: the tablet's cached position moves by the raw
    /// delta while the attached relative data is scaled like pointer
    /// motion.
    pub(crate) fn notify_relative_tool_motion(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        dx: f64,
        dy: f64,
        axes: Option<Vec<f64>>,
    ) {
        let position = self
            .device(device_id)
            .map(|device| device.position)
            .unwrap_or_default();
        let x = position.x + dx;
        let y = position.y + dy;

        let current = Point::new(self.pointer_x, self.pointer_y);
        let (dx, dy) = self.filter_relative_motion(current, dx, dy);

        let mut event = self.new_absolute_motion_event(device_id, time_us, x, y, axes);
        event.relative_motion = Some(RelativeMotion {
            dx,
            dy,
            dx_unaccel: 0.0,
            dy_unaccel: 0.0,
        });

        self.queue_event(event);
    }

    /// Translate stage coordinates through a device's output mapping.
    ///
    /// Identity for most devices; a device mapped to one view has its
    /// coordinates squeezed proportionally into that view's rectangle.
    pub(crate) fn map_device_coords(&self, mapped_view: Option<usize>, x: f64, y: f64) -> (f64, f64) {
        let Some(viewports) = &self.viewports else {
            return (x, y);
        };
        let Some(view) = mapped_view.and_then(|index| viewports.view(index)) else {
            return (x, y);
        };
        let (stage_w, stage_h) = viewports.extents();
        if stage_w <= 0.0 || stage_h <= 0.0 {
            return (x, y);
        }
        let rect = view.rect;
        (
            rect.x as f64 + (x / stage_w) * rect.width as f64,
            rect.y as f64 + (y / stage_h) * rect.height as f64,
        )
    }

    fn new_absolute_motion_event(
        &mut self,
        device_id: DeviceId,
        time_us: u64,
        x: f64,
        y: f64,
        axes: Option<Vec<f64>>,
    ) -> Event {
        let (kind, mapped_view, tool) = match self.device(device_id) {
            Some(device) => (device.kind, device.mapped_view, device.current_tool()),
            None => (DeviceKind::Pointer, None, None),
        };
        let is_tablet = kind == DeviceKind::Tablet;

        let (x, y) = if is_tablet {
            (x, y)
        } else {
            let current = Point::new(self.pointer_x, self.pointer_y);
            let constrained = self.constrain_pointer(time_us, current, Point::new(x, y));
            (constrained.x, constrained.y)
        };

        // the event position may additionally be mapped onto one view; the
        // cached device position keeps the untranslated coordinates
        let (event_x, event_y) = self.map_device_coords(mapped_view, x, y);

        trace!(x = event_x, y = event_y, device = device_id.raw(), "motion");

        let modifiers = self.keyboard.modifiers(self.button_state);
        let associated = if is_tablet { device_id } else { self.pointer() };

        if let Some(device) = self.device_mut(device_id) {
            device.position = Point::new(x, y);
        }
        if !is_tablet {
            self.pointer_x = x;
            self.pointer_y = y;
            let pointer = self.pointer();
            if let Some(core) = self.device_mut(pointer) {
                core.position = Point::new(x, y);
            }
        }

        Event {
            time: us2ms(time_us),
            time_us,
            modifiers,
            device: associated,
            source_device: device_id,
            flags: Default::default(),
            event_code: None,
            relative_motion: None,
            kind: EventKind::Motion {
                x: event_x,
                y: event_y,
                axes,
                tool: if is_tablet { tool } else { None },
            },
        }
    }
}

// escape prevention: when the candidate left every view, clamp it into the
// view the pointer is coming from
fn clamp_to_current_view(viewports: &Viewports, current: Point, pos: &mut Point) {
    let Some(index) = viewports.view_at(current) else {
        return;
    };
    let Some(view) = viewports.view(index) else {
        return;
    };
    let rect = view.rect;

    if pos.x < rect.left() as f64 {
        pos.x = rect.left() as f64;
    }
    if pos.x >= rect.right() as f64 {
        pos.x = (rect.right() - 1) as f64;
    }
    if pos.y < rect.top() as f64 {
        pos.y = rect.top() as f64;
    }
    if pos.y >= rect.bottom() as f64 {
        pos.y = (rect.bottom() - 1) as f64;
    }
}

fn relative_motion_across_outputs(
    viewports: &Viewports,
    start_view: usize,
    current: Point,
    dx: f64,
    dy: f64,
) -> (f64, f64) {
    let mut view = Some(start_view);
    let mut pos = current;
    let mut target = current;
    let (mut dx, mut dy) = (dx, dy);
    let mut direction: Option<Direction> = None;

    while let Some(index) = view {
        let Some(info) = viewports.view(index) else {
            break;
        };
        let rect = info.rect;
        let scale = info.scale;

        let motion = Line::new(pos, (pos.x + dx * scale, pos.y + dy * scale));
        let left = Line::new(
            (rect.left() as f64, rect.top() as f64),
            (rect.left() as f64, rect.bottom() as f64),
        );
        let right = Line::new(
            (rect.right() as f64, rect.top() as f64),
            (rect.right() as f64, rect.bottom() as f64),
        );
        let top = Line::new(
            (rect.left() as f64, rect.top() as f64),
            (rect.right() as f64, rect.top() as f64),
        );
        let bottom = Line::new(
            (rect.left() as f64, rect.bottom() as f64),
            (rect.right() as f64, rect.bottom() as f64),
        );

        target = motion.b;

        // never turn straight back through the edge we just crossed
        let intersection = if direction != Some(Direction::Right)
            && motion.intersection(&left).is_some()
        {
            direction = Some(Direction::Left);
            motion.intersection(&left)
        } else if direction != Some(Direction::Left) && motion.intersection(&right).is_some() {
            direction = Some(Direction::Right);
            motion.intersection(&right)
        } else if direction != Some(Direction::Down) && motion.intersection(&top).is_some() {
            direction = Some(Direction::Up);
            motion.intersection(&top)
        } else if direction != Some(Direction::Up) && motion.intersection(&bottom).is_some() {
            direction = Some(Direction::Down);
            motion.intersection(&bottom)
        } else {
            // the remaining motion fits this view
            break;
        };

        let Some(hit) = intersection else { break };
        dx -= hit.x - motion.a.x;
        dy -= hit.y - motion.a.y;
        pos = hit;

        view = direction.and_then(|direction| viewports.neighbor(index, direction));
    }

    (target.x - current.x, target.y - current.y)
}
