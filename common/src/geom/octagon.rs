use super::int_box::IntBox;
use super::line::{CRIT_INT, Line};
use super::point::{FloatPoint, IntPoint};

/// Convex shape bounded by horizontal, vertical and diagonal lines.
///
/// `ulx <= x - y <= lrx` and `llx <= x + y <= urx` bound the diagonals.
/// Border lines are numbered counter clockwise: 0 bottom, 1 lower right
/// diagonal, 2 right, 3 upper right diagonal, 4 top, 5 upper left diagonal,
/// 6 left, 7 lower left diagonal. Corner `i` is the start point of line `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntOctagon {
    pub lx: i64,
    pub ly: i64,
    pub rx: i64,
    pub uy: i64,
    pub ulx: i64,
    pub lrx: i64,
    pub llx: i64,
    pub urx: i64,
}

const DIAG_CRIT: i64 = 2 * CRIT_INT;

fn ceil_half(value: i64) -> i64 {
    -((-value).div_euclid(2))
}

impl IntOctagon {
    pub const CRIT: IntOctagon = IntOctagon {
        lx: -CRIT_INT,
        ly: -CRIT_INT,
        rx: CRIT_INT,
        uy: CRIT_INT,
        ulx: -DIAG_CRIT,
        lrx: DIAG_CRIT,
        llx: -DIAG_CRIT,
        urx: DIAG_CRIT,
    };

    #[allow(clippy::too_many_arguments)]
    pub fn new(lx: i64, ly: i64, rx: i64, uy: i64, ulx: i64, lrx: i64, llx: i64, urx: i64) -> Self {
        Self {
            lx,
            ly,
            rx,
            uy,
            ulx,
            lrx,
            llx,
            urx,
        }
        .normalize()
    }

    pub fn from_box(b: &IntBox) -> Self {
        Self {
            lx: b.ll.x,
            ly: b.ll.y,
            rx: b.ur.x,
            uy: b.ur.y,
            ulx: b.ll.x - b.ur.y,
            lrx: b.ur.x - b.ll.y,
            llx: b.ll.x + b.ll.y,
            urx: b.ur.x + b.ur.y,
        }
    }

    /// Regular octagon enclosing the circle around `centre`.
    pub fn circle_approx(centre: IntPoint, radius: i64) -> Self {
        let diag = (radius as f64 * std::f64::consts::SQRT_2).round() as i64;
        Self::new(
            centre.x - radius,
            centre.y - radius,
            centre.x + radius,
            centre.y + radius,
            centre.x - centre.y - diag,
            centre.x - centre.y + diag,
            centre.x + centre.y - diag,
            centre.x + centre.y + diag,
        )
    }

    /// Tightens every bound so that it is attained by the shape.
    pub fn normalize(mut self) -> Self {
        for _ in 0..4 {
            let before = self;
            self.ulx = self.ulx.max(self.lx - self.uy);
            self.lrx = self.lrx.min(self.rx - self.ly);
            self.llx = self.llx.max(self.lx + self.ly);
            self.urx = self.urx.min(self.rx + self.uy);

            self.lx = self.lx.max(self.ulx + self.ly).max(self.llx - self.uy);
            self.rx = self.rx.min(self.lrx + self.uy).min(self.urx - self.ly);
            self.ly = self.ly.max(self.llx - self.rx).max(self.lx - self.lrx);
            self.uy = self.uy.min(self.urx - self.lx).min(self.rx - self.ulx);

            // Axis bounds beyond the crossing of two diagonals, rounded outwards.
            self.lx = self.lx.max((self.llx + self.ulx).div_euclid(2));
            self.rx = self.rx.min(ceil_half(self.urx + self.lrx));
            self.ly = self.ly.max((self.llx - self.lrx).div_euclid(2));
            self.uy = self.uy.min(ceil_half(self.urx - self.ulx));
            if self.is_empty() {
                return self;
            }
            if self == before {
                break;
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lx > self.rx || self.ly > self.uy || self.ulx > self.lrx || self.llx > self.urx
    }

    pub fn intersection(&self, other: &IntOctagon) -> IntOctagon {
        IntOctagon {
            lx: self.lx.max(other.lx),
            ly: self.ly.max(other.ly),
            rx: self.rx.min(other.rx),
            uy: self.uy.min(other.uy),
            ulx: self.ulx.max(other.ulx),
            lrx: self.lrx.min(other.lrx),
            llx: self.llx.max(other.llx),
            urx: self.urx.min(other.urx),
        }
        .normalize()
    }

    pub fn bounding_box(&self) -> IntBox {
        IntBox::new(self.lx, self.ly, self.rx, self.uy)
    }

    pub fn corner(&self, no: usize) -> IntPoint {
        match no % 8 {
            0 => IntPoint::new(self.llx - self.ly, self.ly),
            1 => IntPoint::new(self.lrx + self.ly, self.ly),
            2 => IntPoint::new(self.rx, self.rx - self.lrx),
            3 => IntPoint::new(self.rx, self.urx - self.rx),
            4 => IntPoint::new(self.urx - self.uy, self.uy),
            5 => IntPoint::new(self.ulx + self.uy, self.uy),
            6 => IntPoint::new(self.lx, self.lx - self.ulx),
            _ => IntPoint::new(self.lx, self.llx - self.lx),
        }
    }

    pub fn border_line(&self, no: usize) -> Line {
        let dir = match no % 8 {
            0 => IntPoint::new(1, 0),
            1 => IntPoint::new(1, 1),
            2 => IntPoint::new(0, 1),
            3 => IntPoint::new(-1, 1),
            4 => IntPoint::new(-1, 0),
            5 => IntPoint::new(-1, -1),
            6 => IntPoint::new(0, -1),
            _ => IntPoint::new(1, -1),
        };
        Line::from_direction(self.corner(no), dir)
    }

    /// Twice the area, exact in integers.
    fn double_area(&self) -> i128 {
        let mut sum: i128 = 0;
        for i in 0..8 {
            sum += self.corner(i).determinant(self.corner(i + 1));
        }
        sum
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.double_area() as f64 * 0.5
    }

    pub fn dimension(&self) -> i32 {
        if self.is_empty() {
            return -1;
        }
        if self.double_area() > 0 {
            return 2;
        }
        let first = self.corner(0);
        if (1..8).all(|i| self.corner(i) == first) {
            0
        } else {
            1
        }
    }

    /// Enlarges the octagon by `dist`, diagonals by the rounded euclidean amount.
    pub fn offset(&self, dist: i64) -> IntOctagon {
        let diag = (dist as f64 * std::f64::consts::SQRT_2).round() as i64;
        IntOctagon {
            lx: self.lx - dist,
            ly: self.ly - dist,
            rx: self.rx + dist,
            uy: self.uy + dist,
            ulx: self.ulx - diag,
            lrx: self.lrx + diag,
            llx: self.llx - diag,
            urx: self.urx + diag,
        }
        .normalize()
    }

    pub fn remove_border_line(&self, no: usize) -> IntOctagon {
        let mut result = *self;
        match no % 8 {
            0 => result.ly = -CRIT_INT,
            1 => result.lrx = DIAG_CRIT,
            2 => result.rx = CRIT_INT,
            3 => result.urx = DIAG_CRIT,
            4 => result.uy = CRIT_INT,
            5 => result.ulx = -DIAG_CRIT,
            6 => result.lx = -CRIT_INT,
            _ => result.llx = -DIAG_CRIT,
        }
        result.normalize()
    }

    /// Half plane on the left of an axis parallel or diagonal line, clipped to the limits.
    pub fn half_plane(line: &Line) -> Option<IntOctagon> {
        let d = line.direction();
        let p = line.a;
        let mut result = IntOctagon::CRIT;
        match (d.x.signum(), d.y.signum()) {
            (1, 0) => result.ly = p.y,
            (-1, 0) => result.uy = p.y,
            (0, 1) => result.rx = p.x,
            (0, -1) => result.lx = p.x,
            (1, 1) if d.x == d.y => result.lrx = p.x - p.y,
            (-1, -1) if d.x == d.y => result.ulx = p.x - p.y,
            (-1, 1) if d.x == -d.y => result.urx = p.x + p.y,
            (1, -1) if d.x == -d.y => result.llx = p.x + p.y,
            _ => return None,
        }
        Some(result.normalize())
    }

    pub fn contains_point(&self, p: FloatPoint) -> bool {
        p.x >= self.lx as f64
            && p.x <= self.rx as f64
            && p.y >= self.ly as f64
            && p.y <= self.uy as f64
            && p.x - p.y >= self.ulx as f64
            && p.x - p.y <= self.lrx as f64
            && p.x + p.y >= self.llx as f64
            && p.x + p.y <= self.urx as f64
    }

    pub fn contains(&self, other: &IntOctagon) -> bool {
        other.lx >= self.lx
            && other.ly >= self.ly
            && other.rx <= self.rx
            && other.uy <= self.uy
            && other.ulx >= self.ulx
            && other.lrx <= self.lrx
            && other.llx >= self.llx
            && other.urx <= self.urx
    }

    /// Euclidean widths between the four pairs of opposite border lines.
    fn widths(&self) -> [f64; 4] {
        let sqrt2 = std::f64::consts::SQRT_2;
        [
            (self.rx - self.lx) as f64,
            (self.uy - self.ly) as f64,
            (self.lrx - self.ulx) as f64 / sqrt2,
            (self.urx - self.llx) as f64 / sqrt2,
        ]
    }

    pub fn min_width(&self) -> f64 {
        self.widths().into_iter().fold(f64::MAX, f64::min)
    }

    pub fn max_width(&self) -> f64 {
        self.widths().into_iter().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_conversion_keeps_corners() {
        let b = IntBox::new(0, 0, 10, 20);
        let oct = IntOctagon::from_box(&b);
        assert_eq!(oct.dimension(), 2);
        assert_eq!(oct.bounding_box(), b);
        assert_eq!(oct.corner(0), IntPoint::new(0, 0));
        assert_eq!(oct.corner(1), IntPoint::new(10, 0));
        assert_eq!(oct.corner(4), IntPoint::new(10, 20));
        assert!((oct.area() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn diagonal_cut_normalizes_bounds() {
        let b = IntOctagon::from_box(&IntBox::new(0, 0, 10, 10));
        // keeps x + y <= 10
        let cut = IntOctagon::half_plane(&Line::new(IntPoint::new(10, 0), IntPoint::new(0, 10))).unwrap();
        let triangle = b.intersection(&cut);
        assert_eq!(triangle.dimension(), 2);
        assert!((triangle.area() - 50.0).abs() < 1e-9);
        assert_eq!(triangle.urx, 10);
        assert_eq!(triangle.corner(2), IntPoint::new(10, 0));
    }

    #[test]
    fn border_lines_have_interior_on_the_left() {
        let oct = IntOctagon::circle_approx(IntPoint::new(0, 0), 100);
        let centre = FloatPoint::new(0.0, 0.0);
        for i in 0..8 {
            assert!(oct.border_line(i).signed_distance(centre) > 0.0);
        }
    }

    fn diamond(cx: i64, r: i64) -> IntOctagon {
        IntOctagon::new(-100, -100, 100, 100, cx - r, cx + r, cx - r, cx + r)
    }

    #[test]
    fn diamond_gets_axis_bounds_at_the_diagonal_crossings() {
        let d = diamond(0, 10);
        assert_eq!(d.bounding_box(), IntBox::new(-10, -10, 10, 10));
        assert_eq!(d.corner(2), IntPoint::new(10, 0));
        assert_eq!(d.corner(6), IntPoint::new(-10, 0));
        assert!((d.area() - 200.0).abs() < 1e-9);
        for i in 0..8 {
            assert!(d.contains_point(d.corner(i).to_float()));
        }
    }

    #[test]
    fn overlapping_diamonds_intersect_in_two_dimensions() {
        let common = diamond(0, 10).intersection(&diamond(15, 10));
        assert_eq!(common.dimension(), 2);
        assert!((common.area() - 12.5).abs() < 1.0);
        assert_eq!(diamond(0, 10).intersection(&diamond(20, 10)).dimension(), 0);
        assert!(diamond(0, 10).intersection(&diamond(21, 10)).is_empty());
    }

    #[test]
    fn touching_octagons_have_dimension_one_intersection() {
        let a = IntOctagon::from_box(&IntBox::new(0, 0, 10, 10));
        let b = IntOctagon::from_box(&IntBox::new(10, 0, 20, 10));
        assert_eq!(a.intersection(&b).dimension(), 1);
    }
}
