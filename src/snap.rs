use crate::geom::Point;
use crate::grid::TimeGrid;
use crate::pitch::PitchAxis;

/// Slack, in steps, so a value that already sits on a grid line never
/// floors to the line before it.
const EPS: f64 = 1e-9;

/// Quantizes pixel positions: x to the grid line at or before it (when a
/// quantize division is set), y always to the top of its pitch row.
#[derive(Debug, Clone, Copy)]
pub struct SnapEngine {
    origin_x: f64,
    increment: Option<f64>,
    origin_y: f64,
    row_height: f64,
}

impl SnapEngine {
    pub fn new(grid: &TimeGrid, axis: &PitchAxis) -> Self {
        SnapEngine {
            origin_x: grid.origin_x(),
            increment: grid.snap_increment(),
            origin_y: axis.header_height(),
            row_height: axis.row_height(),
        }
    }

    pub fn snap_x(&self, x: f64) -> f64 {
        match self.increment {
            Some(inc) => floor_to(x, self.origin_x, inc),
            None => x,
        }
    }

    pub fn snap_y(&self, y: f64) -> f64 {
        floor_to(y, self.origin_y, self.row_height)
    }

    pub fn snap(&self, p: Point) -> Point {
        Point::new(self.snap_x(p.x), self.snap_y(p.y))
    }
}

fn floor_to(v: f64, origin: f64, step: f64) -> f64 {
    let steps = ((v - origin) / step + EPS).floor();
    steps * step + origin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;

    fn engine(quantize: &str) -> SnapEngine {
        let layout = Layout::default();
        let mut grid = TimeGrid::new(&layout);
        grid.set_quantize_division(quantize).unwrap();
        SnapEngine::new(&grid, &PitchAxis::new(&layout))
    }

    #[test]
    fn floors_to_grid_line() {
        let s = engine("1/8");
        assert_eq!(s.snap_x(34.0), 34.0);
        assert_eq!(s.snap_x(65.0), 34.0);
        assert_eq!(s.snap_x(65.25), 65.25);
        assert_eq!(s.snap_x(100.0), 96.5);
        assert_eq!(s.snap_y(29.9), 20.0);
        assert_eq!(s.snap_y(30.0), 30.0);
    }

    #[test]
    fn no_quantize_passes_x_through() {
        let s = engine("0");
        assert_eq!(s.snap_x(47.3), 47.3);
        assert_eq!(s.snap(Point::new(47.3, 47.3)), Point::new(47.3, 40.0));
    }

    #[test]
    fn idempotent() {
        for q in ["1/8", "1/12", "1/9", "1/15", "3/16", "1", "0"] {
            let s = engine(q);
            let mut x = 20.0;
            while x < 1100.0 {
                let p = Point::new(x, x * 0.77 + 13.0);
                let once = s.snap(p);
                assert_eq!(s.snap(once), once, "quantize {q}, x {x}");
                x += 3.3;
            }
        }
    }
}
