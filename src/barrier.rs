//! Pointer barriers.
//!
//! Barriers are axis-aligned line segments the pointer cannot cross unless
//! the crossing direction is explicitly allowed. A blocked crossing snaps
//! the candidate coordinate onto the barrier segment. Barriers are stateful:
//! once hit, a barrier keeps clamping while the pointer pushes against it
//! and releases only when the motion backs away or leaves the segment
//! range.

use bitflags::bitflags;
use tracing::warn;

use crate::utils::Point;

bitflags! {
    /// Directions in which crossing a barrier is allowed.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BarrierDirections: u32 {
        /// Motion towards increasing x may cross.
        const POSITIVE_X = 1 << 0;
        /// Motion towards increasing y may cross.
        const POSITIVE_Y = 1 << 1;
        /// Motion towards decreasing x may cross.
        const NEGATIVE_X = 1 << 2;
        /// Motion towards decreasing y may cross.
        const NEGATIVE_Y = 1 << 3;
    }
}

/// Handle of an installed barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarrierId(u32);

/// An axis-aligned pointer barrier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barrier {
    /// First endpoint of the segment.
    pub x1: i32,
    /// First endpoint of the segment.
    pub y1: i32,
    /// Second endpoint of the segment.
    pub x2: i32,
    /// Second endpoint of the segment.
    pub y2: i32,
    /// Allowed crossing directions.
    pub directions: BarrierDirections,
}

impl Barrier {
    fn is_vertical(&self) -> bool {
        self.x1 == self.x2
    }

    fn is_horizontal(&self) -> bool {
        self.y1 == self.y2
    }
}

#[derive(Debug)]
struct BarrierEntry {
    id: BarrierId,
    barrier: Barrier,
    hit: bool,
}

/// Collection of barriers applied to pointer motion.
#[derive(Debug, Default)]
pub struct BarrierManager {
    barriers: Vec<BarrierEntry>,
    next_id: u32,
}

impl BarrierManager {
    pub(crate) fn new() -> BarrierManager {
        BarrierManager::default()
    }

    /// Install a barrier.
    ///
    /// Non-axis-aligned segments are rejected with a warning and yield a
    /// handle that clamps nothing.
    pub fn add(&mut self, barrier: Barrier) -> BarrierId {
        let id = BarrierId(self.next_id);
        self.next_id += 1;
        if !barrier.is_vertical() && !barrier.is_horizontal() {
            warn!(?barrier, "ignoring non-axis-aligned barrier");
            return id;
        }
        self.barriers.push(BarrierEntry {
            id,
            barrier,
            hit: false,
        });
        id
    }

    /// Remove a barrier. Returns whether it was installed.
    pub fn remove(&mut self, id: BarrierId) -> bool {
        let before = self.barriers.len();
        self.barriers.retain(|entry| entry.id != id);
        before != self.barriers.len()
    }

    /// Remove all barriers.
    pub fn clear(&mut self) {
        self.barriers.clear();
    }

    /// Number of installed barriers.
    pub fn len(&self) -> usize {
        self.barriers.len()
    }

    /// Whether no barrier is installed.
    pub fn is_empty(&self) -> bool {
        self.barriers.is_empty()
    }

    /// Clamp a candidate pointer position against all barriers.
    ///
    /// `prev` is the current pointer position, `pos` the candidate which may
    /// be rewritten in place.
    pub fn constrain(&mut self, _time_ms: u32, prev: Point, pos: &mut Point) {
        for entry in &mut self.barriers {
            entry.constrain(prev, pos);
        }
    }
}

impl BarrierEntry {
    fn constrain(&mut self, prev: Point, pos: &mut Point) {
        let barrier = self.barrier;
        if barrier.is_vertical() {
            let x = barrier.x1 as f64;
            let (low, high) = ordered(barrier.y1, barrier.y2);

            if self.hit {
                // held: keep clamping while the pointer pushes against the
                // line within the segment range
                let pushing = if prev.x <= x { pos.x >= x } else { pos.x <= x };
                if pushing && pos.y >= low && pos.y <= high {
                    pos.x = x;
                    return;
                }
                self.hit = false;
                return;
            }

            let blocked_positive = !barrier.directions.contains(BarrierDirections::POSITIVE_X);
            let blocked_negative = !barrier.directions.contains(BarrierDirections::NEGATIVE_X);
            let crosses_positive = prev.x < x && pos.x >= x;
            let crosses_negative = prev.x > x && pos.x <= x;

            if (crosses_positive && blocked_positive) || (crosses_negative && blocked_negative) {
                if let Some(yc) = crossing(prev.x, pos.x, prev.y, pos.y, x) {
                    if yc >= low && yc <= high {
                        pos.x = x;
                        self.hit = true;
                    }
                }
            }
        } else {
            let y = barrier.y1 as f64;
            let (low, high) = ordered(barrier.x1, barrier.x2);

            if self.hit {
                let pushing = if prev.y <= y { pos.y >= y } else { pos.y <= y };
                if pushing && pos.x >= low && pos.x <= high {
                    pos.y = y;
                    return;
                }
                self.hit = false;
                return;
            }

            let blocked_positive = !barrier.directions.contains(BarrierDirections::POSITIVE_Y);
            let blocked_negative = !barrier.directions.contains(BarrierDirections::NEGATIVE_Y);
            let crosses_positive = prev.y < y && pos.y >= y;
            let crosses_negative = prev.y > y && pos.y <= y;

            if (crosses_positive && blocked_positive) || (crosses_negative && blocked_negative) {
                if let Some(xc) = crossing(prev.y, pos.y, prev.x, pos.x, y) {
                    if xc >= low && xc <= high {
                        pos.y = y;
                        self.hit = true;
                    }
                }
            }
        }
    }
}

fn ordered(a: i32, b: i32) -> (f64, f64) {
    (a.min(b) as f64, a.max(b) as f64)
}

// cross-axis coordinate where the motion passes the barrier line
fn crossing(from: f64, to: f64, cross_from: f64, cross_to: f64, line: f64) -> Option<f64> {
    let span = to - from;
    if span == 0.0 {
        return Some(cross_from);
    }
    let t = (line - from) / span;
    Some(cross_from + (cross_to - cross_from) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_wall() -> Barrier {
        Barrier {
            x1: 100,
            y1: 0,
            x2: 100,
            y2: 200,
            directions: BarrierDirections::empty(),
        }
    }

    #[test]
    fn blocked_crossing_snaps_onto_the_segment() {
        let mut manager = BarrierManager::new();
        manager.add(vertical_wall());

        let mut pos = Point::new(150.0, 50.0);
        manager.constrain(0, Point::new(90.0, 50.0), &mut pos);
        assert_eq!(pos, Point::new(100.0, 50.0));
    }

    #[test]
    fn motion_outside_the_segment_range_passes() {
        let mut manager = BarrierManager::new();
        manager.add(vertical_wall());

        let mut pos = Point::new(150.0, 300.0);
        manager.constrain(0, Point::new(90.0, 300.0), &mut pos);
        assert_eq!(pos, Point::new(150.0, 300.0));
    }

    #[test]
    fn allowed_direction_passes() {
        let mut manager = BarrierManager::new();
        manager.add(Barrier {
            directions: BarrierDirections::POSITIVE_X,
            ..vertical_wall()
        });

        let mut pos = Point::new(150.0, 50.0);
        manager.constrain(0, Point::new(90.0, 50.0), &mut pos);
        assert_eq!(pos, Point::new(150.0, 50.0));

        // the reverse direction is still blocked
        let mut pos = Point::new(50.0, 50.0);
        manager.constrain(0, Point::new(150.0, 50.0), &mut pos);
        assert_eq!(pos, Point::new(100.0, 50.0));
    }

    #[test]
    fn held_barrier_keeps_clamping_until_motion_backs_away() {
        let mut manager = BarrierManager::new();
        manager.add(vertical_wall());

        let mut pos = Point::new(150.0, 50.0);
        manager.constrain(0, Point::new(90.0, 50.0), &mut pos);
        assert_eq!(pos.x, 100.0);

        // still pushing from the barrier line itself
        let mut pos = Point::new(120.0, 60.0);
        manager.constrain(0, Point::new(100.0, 50.0), &mut pos);
        assert_eq!(pos, Point::new(100.0, 60.0));

        // backing away releases the barrier
        let mut pos = Point::new(80.0, 60.0);
        manager.constrain(0, Point::new(100.0, 60.0), &mut pos);
        assert_eq!(pos, Point::new(80.0, 60.0));

        // and a fresh crossing hits again
        let mut pos = Point::new(130.0, 60.0);
        manager.constrain(0, Point::new(80.0, 60.0), &mut pos);
        assert_eq!(pos, Point::new(100.0, 60.0));
    }

    #[test]
    fn horizontal_barrier_clamps_vertical_motion() {
        let mut manager = BarrierManager::new();
        manager.add(Barrier {
            x1: 0,
            y1: 100,
            x2: 200,
            y2: 100,
            directions: BarrierDirections::empty(),
        });

        let mut pos = Point::new(50.0, 170.0);
        manager.constrain(0, Point::new(50.0, 30.0), &mut pos);
        assert_eq!(pos, Point::new(50.0, 100.0));
    }

    #[test]
    fn removed_barrier_no_longer_clamps() {
        let mut manager = BarrierManager::new();
        let id = manager.add(vertical_wall());
        assert!(manager.remove(id));
        assert!(!manager.remove(id));

        let mut pos = Point::new(150.0, 50.0);
        manager.constrain(0, Point::new(90.0, 50.0), &mut pos);
        assert_eq!(pos, Point::new(150.0, 50.0));
    }
}
