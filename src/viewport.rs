//! Read-only description of the monitor layout.
//!
//! The compositor hands the seat a [`Viewports`] value describing every
//! monitor rectangle in the global coordinate space together with its scale
//! factor. The engine only queries it: hit tests for the constrain chain,
//! directional neighbors for cross-output motion, and the overall extents
//! used to scale normalized device coordinates.

use crate::utils::{Point, Rectangle};

/// Direction towards a neighboring view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards decreasing y.
    Up,
    /// Towards increasing y.
    Down,
    /// Towards decreasing x.
    Left,
    /// Towards increasing x.
    Right,
}

/// One monitor rectangle with its scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// Monitor rectangle in global coordinates.
    pub rect: Rectangle,
    /// Scale factor of the monitor.
    pub scale: f64,
}

impl View {
    /// Create a new view.
    pub fn new(rect: Rectangle, scale: f64) -> View {
        View { rect, scale }
    }
}

/// Ordered set of views forming the stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewports {
    views: Vec<View>,
}

impl Viewports {
    /// Create a viewport set from its views.
    pub fn new(views: Vec<View>) -> Viewports {
        Viewports { views }
    }

    /// Number of views.
    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    /// The view at the given index.
    pub fn view(&self, index: usize) -> Option<&View> {
        self.views.get(index)
    }

    /// Iterate over all views.
    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.iter()
    }

    /// Index of the view containing the given point.
    pub fn view_at(&self, point: impl Into<Point>) -> Option<usize> {
        let point = point.into();
        self.views.iter().position(|view| view.rect.contains(point))
    }

    /// Index of the view adjacent to `index` in `direction`.
    ///
    /// Neighbors share an edge: the candidate's opposite edge coordinate
    /// must equal this view's edge and the cross-axis ranges must overlap.
    pub fn neighbor(&self, index: usize, direction: Direction) -> Option<usize> {
        let view = self.views.get(index)?.rect;
        self.views.iter().position(|other| {
            let other = other.rect;
            match direction {
                Direction::Left => other.right() == view.left() && vertical_overlap(&view, &other),
                Direction::Right => other.left() == view.right() && vertical_overlap(&view, &other),
                Direction::Up => other.bottom() == view.top() && horizontal_overlap(&view, &other),
                Direction::Down => other.top() == view.bottom() && horizontal_overlap(&view, &other),
            }
        })
    }

    /// Overall extents of the stage: the maximum right and bottom edge over
    /// all views.
    pub fn extents(&self) -> (f64, f64) {
        let width = self.views.iter().map(|view| view.rect.right()).max().unwrap_or(0);
        let height = self.views.iter().map(|view| view.rect.bottom()).max().unwrap_or(0);
        (width as f64, height as f64)
    }
}

fn vertical_overlap(a: &Rectangle, b: &Rectangle) -> bool {
    b.top() < a.bottom() && b.bottom() > a.top()
}

fn horizontal_overlap(a: &Rectangle, b: &Rectangle) -> bool {
    b.left() < a.right() && b.right() > a.left()
}
