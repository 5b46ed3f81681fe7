use super::int_box::IntBox;
use super::line::{EPSILON, FloatLine, Line};
use super::octagon::IntOctagon;
use super::point::{FloatPoint, IntPoint};
use super::simplex::Simplex;

/// Convex shape of a tile on one layer.
#[derive(Clone, Debug, PartialEq)]
pub enum TileShape {
    Box(IntBox),
    Octagon(IntOctagon),
    Simplex(Simplex),
}

impl From<IntBox> for TileShape {
    fn from(b: IntBox) -> Self {
        TileShape::Box(b)
    }
}

impl From<IntOctagon> for TileShape {
    fn from(o: IntOctagon) -> Self {
        TileShape::Octagon(o)
    }
}

impl From<Simplex> for TileShape {
    fn from(s: Simplex) -> Self {
        TileShape::Simplex(s)
    }
}

impl TileShape {
    /// Shape covered by a trace segment from `a` to `b` with the given half width.
    /// Axis parallel segments give boxes, diagonal ones octagons.
    pub fn segment(a: IntPoint, b: IntPoint, half_width: i64) -> TileShape {
        let d = b - a;
        if d.x == 0 || d.y == 0 {
            return TileShape::Box(IntBox::spanning(a, b).offset(half_width));
        }
        if d.x.abs() == d.y.abs() {
            let mut oct = IntOctagon::from_box(&IntBox::spanning(a, b));
            if d.x == d.y {
                oct.ulx = a.x - a.y;
                oct.lrx = a.x - a.y;
            } else {
                oct.llx = a.x + a.y;
                oct.urx = a.x + a.y;
            }
            return TileShape::Octagon(oct.normalize().offset(half_width));
        }
        let perp = IntPoint::new(-d.y, d.x);
        let hw = half_width as f64;
        let lines = [
            Line::from_direction(a, d).translate(-hw),
            Line::from_direction(b, perp).translate(-hw),
            Line::from_direction(b, -d).translate(-hw),
            Line::from_direction(a, -perp).translate(-hw),
        ];
        TileShape::Simplex(Simplex::from_lines(&lines))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TileShape::Box(b) => b.is_empty(),
            TileShape::Octagon(o) => o.is_empty(),
            TileShape::Simplex(s) => s.is_empty(),
        }
    }

    pub fn dimension(&self) -> i32 {
        match self {
            TileShape::Box(b) => b.dimension(),
            TileShape::Octagon(o) => o.dimension(),
            TileShape::Simplex(s) => s.dimension(),
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            TileShape::Box(b) => b.area(),
            TileShape::Octagon(o) => o.area(),
            TileShape::Simplex(s) => s.area(),
        }
    }

    pub fn bounding_box(&self) -> IntBox {
        match self {
            TileShape::Box(b) => *b,
            TileShape::Octagon(o) => {
                if o.is_empty() {
                    IntBox::EMPTY
                } else {
                    o.bounding_box()
                }
            }
            TileShape::Simplex(s) => s.bounding_box(),
        }
    }

    pub fn bounding_octagon(&self) -> IntOctagon {
        match self {
            TileShape::Box(b) => IntOctagon::from_box(b),
            TileShape::Octagon(o) => *o,
            TileShape::Simplex(s) => s.bounding_octagon(),
        }
    }

    pub fn to_simplex(&self) -> Simplex {
        match self {
            TileShape::Box(b) => Simplex::from_box(b),
            TileShape::Octagon(o) => Simplex::from_octagon(o),
            TileShape::Simplex(s) => s.clone(),
        }
    }

    pub fn intersection(&self, other: &TileShape) -> TileShape {
        match (self, other) {
            (TileShape::Box(a), TileShape::Box(b)) => TileShape::Box(a.intersection(b)),
            (TileShape::Simplex(_), _) | (_, TileShape::Simplex(_)) => {
                TileShape::Simplex(self.to_simplex().intersection(&other.to_simplex()))
            }
            _ => TileShape::Octagon(self.bounding_octagon().intersection(&other.bounding_octagon())),
        }
    }

    /// True if the shapes have at least one common point.
    pub fn intersects(&self, other: &TileShape) -> bool {
        if !self.bounding_box().intersects(&other.bounding_box()) {
            return false;
        }
        self.intersection(other).dimension() >= 0
    }

    /// True if the shapes have a common part of dimension 2.
    pub fn overlaps(&self, other: &TileShape) -> bool {
        if !self.bounding_box().intersects(&other.bounding_box()) {
            return false;
        }
        self.intersection(other).dimension() == 2
    }

    pub fn contains_point(&self, p: FloatPoint) -> bool {
        match self {
            TileShape::Box(b) => !b.is_empty() && b.contains_point(p),
            TileShape::Octagon(o) => !o.is_empty() && o.contains_point(p),
            TileShape::Simplex(s) => s.contains_point(p),
        }
    }

    pub fn contains_inside(&self, p: FloatPoint) -> bool {
        if self.dimension() < 2 {
            return false;
        }
        (0..self.border_line_count()).all(|i| self.border_line(i).signed_distance(p) > EPSILON)
    }

    pub fn contains_shape(&self, other: &TileShape) -> bool {
        if other.is_empty() {
            return true;
        }
        match (self, other) {
            (TileShape::Box(a), TileShape::Box(b)) => a.contains(b),
            (TileShape::Octagon(a), TileShape::Octagon(b)) => a.contains(b),
            _ => other.corners().into_iter().all(|p| self.contains_point(p)),
        }
    }

    pub fn corners(&self) -> Vec<FloatPoint> {
        match self {
            TileShape::Box(b) => (0..4).map(|i| b.corner(i).to_float()).collect(),
            TileShape::Octagon(o) => (0..8).map(|i| o.corner(i).to_float()).collect(),
            TileShape::Simplex(s) => s.corners().to_vec(),
        }
    }

    pub fn corner(&self, no: usize) -> FloatPoint {
        match self {
            TileShape::Box(b) => b.corner(no).to_float(),
            TileShape::Octagon(o) => o.corner(no).to_float(),
            TileShape::Simplex(s) => s.corners()[no % s.corners().len().max(1)],
        }
    }

    pub fn border_line_count(&self) -> usize {
        match self {
            TileShape::Box(_) => 4,
            TileShape::Octagon(_) => 8,
            TileShape::Simplex(s) => s.border_line_count(),
        }
    }

    pub fn border_line(&self, no: usize) -> Line {
        match self {
            TileShape::Box(b) => b.border_line(no),
            TileShape::Octagon(o) => o.border_line(no),
            TileShape::Simplex(s) => s.border_line(no),
        }
    }

    /// The piece of border line `no` between its two corners.
    pub fn border_segment(&self, no: usize) -> FloatLine {
        FloatLine::new(self.corner(no), self.corner(no + 1))
    }

    /// Enlarges the shape by `dist`; negative values shrink it.
    pub fn offset(&self, dist: i64) -> TileShape {
        match self {
            TileShape::Box(b) => TileShape::Box(b.offset(dist)),
            TileShape::Octagon(o) => TileShape::Octagon(o.offset(dist)),
            TileShape::Simplex(s) => TileShape::Simplex(s.offset(dist as f64)),
        }
    }

    pub fn nearest_point(&self, p: FloatPoint) -> FloatPoint {
        if let TileShape::Box(b) = self {
            return b.nearest_point(p);
        }
        if self.contains_point(p) {
            return p;
        }
        let corners = self.corners();
        let n = corners.len();
        let mut best = p;
        let mut best_dist = f64::MAX;
        for i in 0..n {
            let seg = FloatLine::new(corners[i], corners[(i + 1) % n]);
            let q = seg.nearest_segment_point(p);
            let d = q.distance_square(p);
            if d < best_dist {
                best_dist = d;
                best = q;
            }
        }
        best
    }

    pub fn centre_of_gravity(&self) -> FloatPoint {
        let corners = self.corners();
        if corners.is_empty() {
            return FloatPoint::default();
        }
        let origin = corners[0];
        let mut area = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 1..corners.len().saturating_sub(1) {
            let a = corners[i] - origin;
            let b = corners[i + 1] - origin;
            let w = a.determinant(b);
            area += w;
            cx += w * (a.x + b.x) / 3.0;
            cy += w * (a.y + b.y) / 3.0;
        }
        if area.abs() < EPSILON {
            let n = corners.len() as f64;
            let sx: f64 = corners.iter().map(|p| p.x).sum();
            let sy: f64 = corners.iter().map(|p| p.y).sum();
            return FloatPoint::new(sx / n, sy / n);
        }
        FloatPoint::new(origin.x + cx / area, origin.y + cy / area)
    }

    /// Smallest distance between two parallel lines enclosing the shape.
    pub fn min_width(&self) -> f64 {
        match self {
            TileShape::Box(b) => b.min_width() as f64,
            TileShape::Octagon(o) => o.min_width(),
            TileShape::Simplex(s) => {
                let corners = s.corners();
                s.lines()
                    .iter()
                    .map(|l| {
                        corners
                            .iter()
                            .map(|p| l.signed_distance(*p))
                            .fold(0.0, f64::max)
                    })
                    .fold(f64::MAX, f64::min)
            }
        }
    }

    pub fn max_width(&self) -> f64 {
        match self {
            TileShape::Box(b) => b.max_width() as f64,
            TileShape::Octagon(o) => o.max_width(),
            TileShape::Simplex(s) => {
                let corners = s.corners();
                let mut result: f64 = 0.0;
                for (i, p) in corners.iter().enumerate() {
                    for q in &corners[i + 1..] {
                        result = result.max(p.distance(*q));
                    }
                }
                result
            }
        }
    }

    /// Segment between the two corners farthest apart.
    pub fn diagonal_corner_segment(&self) -> Option<FloatLine> {
        let corners = self.corners();
        let first = *corners.first()?;
        let mut best = FloatLine::point(first);
        let mut best_len = 0.0;
        for (i, p) in corners.iter().enumerate() {
            for q in &corners[i + 1..] {
                let len = p.distance_square(*q);
                if len > best_len {
                    best_len = len;
                    best = FloatLine::new(*p, *q);
                }
            }
        }
        Some(best)
    }

    /// Index of the border line that contains both end points of `segment`.
    pub fn touching_side(&self, segment: &FloatLine) -> Option<usize> {
        let tolerance = 0.5;
        (0..self.border_line_count()).find(|&i| {
            let line = self.border_line(i);
            line.signed_distance(segment.a).abs() < tolerance
                && line.signed_distance(segment.b).abs() < tolerance
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_intersection_promotes_representation() {
        let b = TileShape::Box(IntBox::new(0, 0, 10, 10));
        let o = TileShape::Octagon(IntOctagon::from_box(&IntBox::new(5, 5, 20, 20)));
        assert!(matches!(b.intersection(&o), TileShape::Octagon(_)));
        let s = TileShape::Simplex(Simplex::from_box(&IntBox::new(5, 5, 20, 20)));
        let cut = b.intersection(&s);
        assert!(matches!(cut, TileShape::Simplex(_)));
        assert!((cut.area() - 25.0).abs() < 1e-6);
    }

    #[test]
    fn segment_shapes_follow_direction() {
        let h = TileShape::segment(IntPoint::new(0, 0), IntPoint::new(100, 0), 5);
        assert_eq!(h, TileShape::Box(IntBox::new(-5, -5, 105, 5)));
        let d = TileShape::segment(IntPoint::new(0, 0), IntPoint::new(100, 100), 5);
        assert!(matches!(d, TileShape::Octagon(_)));
        assert!(d.contains_point(FloatPoint::new(50.0, 50.0)));
        assert!(!d.contains_point(FloatPoint::new(50.0, 70.0)));
        let f = TileShape::segment(IntPoint::new(0, 0), IntPoint::new(100, 50), 5);
        assert!(matches!(f, TileShape::Simplex(_)));
        assert_eq!(f.dimension(), 2);
        assert!(f.contains_point(FloatPoint::new(50.0, 25.0)));
        assert!(!f.contains_point(FloatPoint::new(50.0, 40.0)));
    }

    #[test]
    fn touching_side_of_a_shared_edge() {
        let a = TileShape::Box(IntBox::new(0, 0, 10, 10));
        let b = TileShape::Box(IntBox::new(10, 2, 20, 8));
        let touch = a.intersection(&b);
        let seg = FloatLine::new(touch.corner(0), touch.corner(2));
        assert_eq!(a.touching_side(&seg), Some(1));
        assert_eq!(b.touching_side(&seg), Some(3));
    }

    #[test]
    fn nearest_point_outside_octagon() {
        let o = TileShape::Octagon(IntOctagon::from_box(&IntBox::new(0, 0, 10, 10)));
        let p = o.nearest_point(FloatPoint::new(15.0, 5.0));
        assert!(p.approx_eq(FloatPoint::new(10.0, 5.0), 1e-9));
        let c = o.centre_of_gravity();
        assert!(c.approx_eq(FloatPoint::new(5.0, 5.0), 1e-9));
    }
}
