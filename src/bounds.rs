use crate::config::Layout;
use crate::geom::Point;
use crate::grid::TimeGrid;

/// The editing rectangle pointer positions are clamped into before they are
/// snapped.
///
/// There is no lower edge: a position below the last pitch row is kept as
/// is, and the controller clamps the resulting pitch instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
}

impl Bounds {
    pub fn new(grid: &TimeGrid, layout: &Layout) -> Self {
        Bounds {
            min_x: grid.origin_x(),
            max_x: grid.origin_x() + grid.grid_width(),
            min_y: layout.header_height + layout.padding,
        }
    }

    pub fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(self.min_x, self.max_x), p.y.max(self.min_y))
    }
}
