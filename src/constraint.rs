//! External pointer confinement.

use crate::utils::Point;

/// Region confinement applied to pointer motion.
///
/// Installed through `Seat::set_pointer_constraint`; the constrain chain
/// runs it after barriers and before the monitor clamp. Implementations get
/// the current pointer position and the candidate and may rewrite the
/// candidate.
pub trait PointerConstraint {
    /// Constrain a candidate pointer position.
    fn constrain(&mut self, time_ms: u32, origin: Point, candidate: Point) -> Point;
}

impl<F> PointerConstraint for F
where
    F: FnMut(u32, Point, Point) -> Point,
{
    fn constrain(&mut self, time_ms: u32, origin: Point, candidate: Point) -> Point {
        self(time_ms, origin, candidate)
    }
}
