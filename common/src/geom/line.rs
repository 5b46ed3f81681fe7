use super::point::{FloatPoint, IntPoint};

/// Coordinates are kept inside `[-CRIT_INT, CRIT_INT]`. Shapes that are unbounded
/// in some direction are clipped to this limit.
pub const CRIT_INT: i64 = 1 << 25;

/// Tolerance for float comparisons on coordinates derived from integer lines.
pub const EPSILON: f64 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    OnTheLeft,
    OnTheRight,
    Collinear,
}

/// Directed line through two distinct integer points. For border lines of a
/// tile shape the interior lies on the left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Line {
    pub a: IntPoint,
    pub b: IntPoint,
}

impl Line {
    pub const fn new(a: IntPoint, b: IntPoint) -> Self {
        Self { a, b }
    }

    /// Line through `a` with the given direction vector.
    pub fn from_direction(a: IntPoint, dir: IntPoint) -> Self {
        Self { a, b: a + dir }
    }

    #[inline]
    pub fn direction(&self) -> IntPoint {
        self.b - self.a
    }

    pub fn opposite(&self) -> Line {
        Line::new(self.b, self.a)
    }

    pub fn is_vertical(&self) -> bool {
        self.a.x == self.b.x
    }

    /// Exact side test for an integer point.
    pub fn side_of(&self, p: IntPoint) -> Side {
        let det = self.direction().determinant(p - self.a);
        if det > 0 {
            Side::OnTheLeft
        } else if det < 0 {
            Side::OnTheRight
        } else {
            Side::Collinear
        }
    }

    /// Signed euclidean distance of `p`, positive on the left.
    pub fn signed_distance(&self, p: FloatPoint) -> f64 {
        let d = self.direction().to_float();
        let len = d.length();
        if len == 0.0 {
            return 0.0;
        }
        d.determinant(p - self.a.to_float()) / len
    }

    pub fn intersection(&self, other: &Line) -> Option<FloatPoint> {
        let d1 = self.direction();
        let d2 = other.direction();
        let det = d1.determinant(d2);
        if det == 0 {
            return None;
        }
        // a1 + t * d1 on the other line: det(d2, a1 + t*d1 - a2) = 0
        let diff = other.a - self.a;
        let t_num = diff.determinant(d2);
        let t = t_num as f64 / det as f64;
        let a = self.a.to_float();
        let d = d1.to_float();
        Some(FloatPoint::new(a.x + t * d.x, a.y + t * d.y))
    }

    /// Shifts the line by `dist` to its left side. The direction is kept exact,
    /// the anchor point is rounded to the integer grid.
    pub fn translate(&self, dist: f64) -> Line {
        let d = self.direction().to_float();
        let len = d.length();
        if len == 0.0 {
            return *self;
        }
        let shift = FloatPoint::new(-d.y / len * dist, d.x / len * dist);
        let a = (self.a.to_float() + shift).round();
        Line::from_direction(a, self.direction())
    }
}

/// Float line segment from `a` to `b`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatLine {
    pub a: FloatPoint,
    pub b: FloatPoint,
}

impl FloatLine {
    pub const fn new(a: FloatPoint, b: FloatPoint) -> Self {
        Self { a, b }
    }

    pub fn point(p: FloatPoint) -> Self {
        Self { a: p, b: p }
    }

    pub fn middle(&self) -> FloatPoint {
        self.a.middle_point(self.b)
    }

    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    pub fn nearest_segment_point(&self, p: FloatPoint) -> FloatPoint {
        let d = self.b - self.a;
        let len_sq = d.scalar_product(d);
        if len_sq == 0.0 {
            return self.a;
        }
        let t = ((p - self.a).scalar_product(d) / len_sq).clamp(0.0, 1.0);
        FloatPoint::new(self.a.x + t * d.x, self.a.y + t * d.y)
    }

    pub fn segment_distance(&self, p: FloatPoint) -> f64 {
        self.nearest_segment_point(p).distance(p)
    }

    /// Shortens the segment by `offset` at both ends. A segment shorter than
    /// `2 * offset` collapses to its middle point.
    pub fn shrink_segment(&self, offset: f64) -> FloatLine {
        let len = self.length();
        if len <= 2.0 * offset {
            return FloatLine::point(self.middle());
        }
        let d = self.b - self.a;
        let f = offset / len;
        FloatLine::new(
            FloatPoint::new(self.a.x + d.x * f, self.a.y + d.y * f),
            FloatPoint::new(self.b.x - d.x * f, self.b.y - d.y * f),
        )
    }

    /// Splits the segment into `count` consecutive pieces of equal length.
    pub fn divide_segment_into_sections(&self, count: usize) -> Vec<FloatLine> {
        let count = count.max(1);
        let d = self.b - self.a;
        (0..count)
            .map(|i| {
                let t0 = i as f64 / count as f64;
                let t1 = (i + 1) as f64 / count as f64;
                FloatLine::new(
                    FloatPoint::new(self.a.x + d.x * t0, self.a.y + d.y * t0),
                    FloatPoint::new(self.a.x + d.x * t1, self.a.y + d.y * t1),
                )
            })
            .collect()
    }

    /// Orthogonal projection of `other` onto this segment, clipped to it.
    pub fn segment_projection(&self, other: &FloatLine) -> Option<FloatLine> {
        let d = self.b - self.a;
        let len_sq = d.scalar_product(d);
        if len_sq == 0.0 {
            return Some(*self);
        }
        let ta = (other.a - self.a).scalar_product(d) / len_sq;
        let tb = (other.b - self.a).scalar_product(d) / len_sq;
        let (lo, hi) = if ta <= tb { (ta, tb) } else { (tb, ta) };
        let lo = lo.max(0.0);
        let hi = hi.min(1.0);
        if lo > hi {
            return None;
        }
        Some(FloatLine::new(
            FloatPoint::new(self.a.x + d.x * lo, self.a.y + d.y * lo),
            FloatPoint::new(self.a.x + d.x * hi, self.a.y + d.y * hi),
        ))
    }
}
