//! Shared primitives: geometry and time.

mod clock;
mod geometry;

pub use clock::Clock;
pub use geometry::{Line, Point, Rectangle};
