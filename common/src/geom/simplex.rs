use super::int_box::IntBox;
use super::line::{EPSILON, Line};
use super::octagon::IntOctagon;
use super::point::{FloatPoint, IntPoint};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("polygon needs at least 3 corners, got {0}")]
    TooFewCorners(usize),
    #[error("polygon is not convex at corner {0}")]
    NotConvex(usize),
}

/// Convex polygon given by its border lines in counter clockwise order.
/// The interior is on the left of every line. The corners are cached,
/// corner `i` is the start point of line `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct Simplex {
    lines: Vec<Line>,
    corners: Vec<FloatPoint>,
}

impl Simplex {
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            corners: Vec::new(),
        }
    }

    /// Intersection of the half planes on the left of `lines`, clipped to the
    /// coordinate limits. Redundant lines are removed.
    pub fn from_lines(lines: &[Line]) -> Self {
        let crit = IntBox::CRIT;
        let mut poly: Vec<(FloatPoint, Line)> = (0..4)
            .map(|i| (crit.corner(i).to_float(), crit.border_line(i)))
            .collect();

        for line in lines {
            poly = clip(&poly, line);
            if poly.is_empty() {
                return Self::empty();
            }
        }
        Self::from_clipped(poly)
    }

    pub fn from_box(b: &IntBox) -> Self {
        if b.is_empty() {
            return Self::empty();
        }
        let lines: Vec<Line> = (0..4).map(|i| b.border_line(i)).collect();
        Self::from_lines(&lines)
    }

    pub fn from_octagon(oct: &IntOctagon) -> Self {
        if oct.is_empty() {
            return Self::empty();
        }
        let lines: Vec<Line> = (0..8).map(|i| oct.border_line(i)).collect();
        Self::from_lines(&lines)
    }

    /// Convex polygon from counter clockwise corners.
    pub fn from_corners(corners: &[IntPoint]) -> Result<Self, GeometryError> {
        let n = corners.len();
        if n < 3 {
            return Err(GeometryError::TooFewCorners(n));
        }
        let mut lines = Vec::with_capacity(n);
        for i in 0..n {
            let a = corners[i];
            let b = corners[(i + 1) % n];
            let c = corners[(i + 2) % n];
            if a == b {
                continue;
            }
            let line = Line::new(a, b);
            if line.side_of(c) == super::line::Side::OnTheRight {
                return Err(GeometryError::NotConvex((i + 1) % n));
            }
            lines.push(line);
        }
        Ok(Self::from_lines(&lines))
    }

    fn from_clipped(mut poly: Vec<(FloatPoint, Line)>) -> Self {
        let corners: Vec<FloatPoint> = poly.iter().map(|(p, _)| *p).collect();
        if polygon_dimension(&corners) == 2 {
            // drop edges of zero length
            let mut i = 0;
            while i < poly.len() && poly.len() > 3 {
                let next = (i + 1) % poly.len();
                if poly[i].0.distance(poly[next].0) < EPSILON {
                    poly.remove(i);
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = 0;
            while i < poly.len() && poly.len() > 1 {
                let next = (i + 1) % poly.len();
                if poly[i].1 == poly[next].1 {
                    poly.remove(next);
                } else {
                    i += 1;
                }
            }
        }
        Self {
            corners: poly.iter().map(|(p, _)| *p).collect(),
            lines: poly.into_iter().map(|(_, l)| l).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn corners(&self) -> &[FloatPoint] {
        &self.corners
    }

    pub fn border_line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn border_line(&self, no: usize) -> Line {
        self.lines[no % self.lines.len()]
    }

    pub fn dimension(&self) -> i32 {
        polygon_dimension(&self.corners)
    }

    pub fn area(&self) -> f64 {
        if self.dimension() < 2 {
            return 0.0;
        }
        let origin = self.corners[0];
        let mut sum = 0.0;
        for i in 1..self.corners.len() - 1 {
            sum += (self.corners[i] - origin).determinant(self.corners[i + 1] - origin);
        }
        0.5 * sum
    }

    pub fn intersection(&self, other: &Simplex) -> Simplex {
        if self.is_empty() || other.is_empty() {
            return Simplex::empty();
        }
        let mut lines = self.lines.clone();
        lines.extend_from_slice(&other.lines);
        Simplex::from_lines(&lines)
    }

    pub fn contains_point(&self, p: FloatPoint) -> bool {
        !self.is_empty() && self.lines.iter().all(|l| l.signed_distance(p) >= -EPSILON)
    }

    pub fn contains_inside(&self, p: FloatPoint) -> bool {
        self.dimension() == 2 && self.lines.iter().all(|l| l.signed_distance(p) > EPSILON)
    }

    /// Moves every border line outwards by `dist`; negative values shrink.
    pub fn offset(&self, dist: f64) -> Simplex {
        if self.is_empty() {
            return Simplex::empty();
        }
        let lines: Vec<Line> = self.lines.iter().map(|l| l.translate(-dist)).collect();
        Simplex::from_lines(&lines)
    }

    pub fn remove_border_line(&self, no: usize) -> Simplex {
        if self.lines.is_empty() {
            return self.clone();
        }
        let no = no % self.lines.len();
        let lines: Vec<Line> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != no)
            .map(|(_, l)| *l)
            .collect();
        Simplex::from_lines(&lines)
    }

    pub fn bounding_box(&self) -> IntBox {
        if self.is_empty() {
            return IntBox::EMPTY;
        }
        let (mut llx, mut lly, mut urx, mut ury) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for p in &self.corners {
            llx = llx.min(p.x);
            lly = lly.min(p.y);
            urx = urx.max(p.x);
            ury = ury.max(p.y);
        }
        IntBox::new(
            (llx + EPSILON).floor() as i64,
            (lly + EPSILON).floor() as i64,
            (urx - EPSILON).ceil() as i64,
            (ury - EPSILON).ceil() as i64,
        )
    }

    pub fn bounding_octagon(&self) -> IntOctagon {
        if self.is_empty() {
            return IntOctagon::from_box(&IntBox::EMPTY);
        }
        let b = self.bounding_box();
        let (mut ulx, mut lrx, mut llx, mut urx) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for p in &self.corners {
            ulx = ulx.min(p.x - p.y);
            lrx = lrx.max(p.x - p.y);
            llx = llx.min(p.x + p.y);
            urx = urx.max(p.x + p.y);
        }
        IntOctagon::new(
            b.ll.x,
            b.ll.y,
            b.ur.x,
            b.ur.y,
            (ulx + EPSILON).floor() as i64,
            (lrx - EPSILON).ceil() as i64,
            (llx + EPSILON).floor() as i64,
            (urx - EPSILON).ceil() as i64,
        )
    }
}

/// Clips a labelled polygon against the half plane on the left of `line`.
fn clip(poly: &[(FloatPoint, Line)], line: &Line) -> Vec<(FloatPoint, Line)> {
    let n = poly.len();
    let mut result = Vec::with_capacity(n + 1);
    for i in 0..n {
        let (p, label) = poly[i];
        let q = poly[(i + 1) % n].0;
        let dp = line.signed_distance(p);
        let dq = line.signed_distance(q);
        let p_in = dp >= -EPSILON;
        let q_in = dq >= -EPSILON;
        if p_in {
            result.push((p, label));
            if !q_in {
                result.push((crossing(p, q, dp, dq), *line));
            }
        } else if q_in {
            result.push((crossing(p, q, dp, dq), label));
        }
    }
    result
}

fn crossing(p: FloatPoint, q: FloatPoint, dp: f64, dq: f64) -> FloatPoint {
    let denom = dp - dq;
    if denom.abs() < f64::EPSILON {
        return p;
    }
    let t = dp / denom;
    FloatPoint::new(p.x + t * (q.x - p.x), p.y + t * (q.y - p.y))
}

/// Dimension of the convex hull of `corners`, -1 if there are none.
pub fn polygon_dimension(corners: &[FloatPoint]) -> i32 {
    if corners.is_empty() {
        return -1;
    }
    let first = corners[0];
    let far = corners
        .iter()
        .copied()
        .max_by(|a, b| first.distance_square(*a).total_cmp(&first.distance_square(*b)))
        .unwrap_or(first);
    let len = first.distance(far);
    if len < EPSILON {
        return 0;
    }
    let dir = far - first;
    let thick = corners
        .iter()
        .any(|p| (dir.determinant(*p - first) / len).abs() > EPSILON);
    if thick { 2 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Simplex {
        Simplex::from_box(&IntBox::new(0, 0, 10, 10))
    }

    #[test]
    fn box_conversion_has_four_lines() {
        let s = square();
        assert_eq!(s.border_line_count(), 4);
        assert_eq!(s.dimension(), 2);
        assert!((s.area() - 100.0).abs() < 1e-6);
        assert_eq!(s.bounding_box(), IntBox::new(0, 0, 10, 10));
    }

    #[test]
    fn redundant_lines_are_removed() {
        let mut lines: Vec<Line> = (0..4).map(|i| IntBox::new(0, 0, 10, 10).border_line(i)).collect();
        lines.push(IntBox::new(-5, -5, 20, 20).border_line(0));
        let s = Simplex::from_lines(&lines);
        assert_eq!(s.border_line_count(), 4);
    }

    #[test]
    fn triangle_from_diagonal_cut() {
        let cut = Line::new(IntPoint::new(10, 0), IntPoint::new(0, 10));
        let s = square().intersection(&Simplex::from_lines(&[cut]));
        assert_eq!(s.border_line_count(), 3);
        assert!((s.area() - 50.0).abs() < 1e-6);
        assert!(s.contains_point(FloatPoint::new(2.0, 2.0)));
        assert!(!s.contains_point(FloatPoint::new(8.0, 8.0)));
    }

    #[test]
    fn touching_squares_intersect_in_a_segment() {
        let other = Simplex::from_box(&IntBox::new(10, 0, 20, 10));
        let touch = square().intersection(&other);
        assert_eq!(touch.dimension(), 1);
        assert_eq!(touch.area(), 0.0);
        let apart = Simplex::from_box(&IntBox::new(11, 0, 20, 10));
        assert!(square().intersection(&apart).is_empty());
    }

    #[test]
    fn offset_enlarges_and_shrinks() {
        let grown = square().offset(5.0);
        assert!((grown.area() - 400.0).abs() < 1e-6);
        let shrunk = square().offset(-2.0);
        assert!((shrunk.area() - 36.0).abs() < 1e-6);
    }

    #[test]
    fn concave_polygon_is_rejected() {
        let corners = [
            IntPoint::new(0, 0),
            IntPoint::new(10, 0),
            IntPoint::new(5, 2),
            IntPoint::new(10, 10),
            IntPoint::new(0, 10),
        ];
        assert_eq!(Simplex::from_corners(&corners), Err(GeometryError::NotConvex(2)));
        assert_eq!(
            Simplex::from_corners(&corners[..2]),
            Err(GeometryError::TooFewCorners(2))
        );
    }
}
