use super::line::{CRIT_INT, Line};
use super::point::{FloatPoint, IntPoint};
use serde::{Deserialize, Serialize};

/// Closed axis parallel box. Border lines are numbered counter clockwise
/// starting with the bottom side, corner `i` is the start point of line `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntBox {
    pub ll: IntPoint,
    pub ur: IntPoint,
}

impl IntBox {
    pub const EMPTY: IntBox = IntBox {
        ll: IntPoint::new(CRIT_INT, CRIT_INT),
        ur: IntPoint::new(-CRIT_INT, -CRIT_INT),
    };

    pub const CRIT: IntBox = IntBox {
        ll: IntPoint::new(-CRIT_INT, -CRIT_INT),
        ur: IntPoint::new(CRIT_INT, CRIT_INT),
    };

    pub const fn new(llx: i64, lly: i64, urx: i64, ury: i64) -> Self {
        Self {
            ll: IntPoint::new(llx, lly),
            ur: IntPoint::new(urx, ury),
        }
    }

    pub fn from_point(p: IntPoint) -> Self {
        Self { ll: p, ur: p }
    }

    /// Smallest box containing both points.
    pub fn spanning(a: IntPoint, b: IntPoint) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    pub fn is_empty(&self) -> bool {
        self.ll.x > self.ur.x || self.ll.y > self.ur.y
    }

    pub fn width(&self) -> i64 {
        self.ur.x - self.ll.x
    }

    pub fn height(&self) -> i64 {
        self.ur.y - self.ll.y
    }

    pub fn max_width(&self) -> i64 {
        self.width().max(self.height())
    }

    pub fn min_width(&self) -> i64 {
        self.width().min(self.height())
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.width() as f64 * self.height() as f64
    }

    pub fn dimension(&self) -> i32 {
        if self.is_empty() {
            -1
        } else if self.ll == self.ur {
            0
        } else if self.ll.x == self.ur.x || self.ll.y == self.ur.y {
            1
        } else {
            2
        }
    }

    pub fn intersection(&self, other: &IntBox) -> IntBox {
        IntBox::new(
            self.ll.x.max(other.ll.x),
            self.ll.y.max(other.ll.y),
            self.ur.x.min(other.ur.x),
            self.ur.y.min(other.ur.y),
        )
    }

    pub fn union(&self, other: &IntBox) -> IntBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        IntBox::new(
            self.ll.x.min(other.ll.x),
            self.ll.y.min(other.ll.y),
            self.ur.x.max(other.ur.x),
            self.ur.y.max(other.ur.y),
        )
    }

    pub fn intersects(&self, other: &IntBox) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn contains_point(&self, p: FloatPoint) -> bool {
        p.x >= self.ll.x as f64
            && p.x <= self.ur.x as f64
            && p.y >= self.ll.y as f64
            && p.y <= self.ur.y as f64
    }

    pub fn contains_inside(&self, p: FloatPoint) -> bool {
        p.x > self.ll.x as f64
            && p.x < self.ur.x as f64
            && p.y > self.ll.y as f64
            && p.y < self.ur.y as f64
    }

    pub fn contains(&self, other: &IntBox) -> bool {
        other.ll.x >= self.ll.x
            && other.ll.y >= self.ll.y
            && other.ur.x <= self.ur.x
            && other.ur.y <= self.ur.y
    }

    /// Enlarges the box by `dist` on every side, shrinks for negative values.
    pub fn offset(&self, dist: i64) -> IntBox {
        IntBox::new(
            self.ll.x - dist,
            self.ll.y - dist,
            self.ur.x + dist,
            self.ur.y + dist,
        )
    }

    pub fn corner(&self, no: usize) -> IntPoint {
        match no % 4 {
            0 => self.ll,
            1 => IntPoint::new(self.ur.x, self.ll.y),
            2 => self.ur,
            _ => IntPoint::new(self.ll.x, self.ur.y),
        }
    }

    pub fn border_line(&self, no: usize) -> Line {
        match no % 4 {
            0 => Line::from_direction(self.ll, IntPoint::new(1, 0)),
            1 => Line::from_direction(IntPoint::new(self.ur.x, self.ll.y), IntPoint::new(0, 1)),
            2 => Line::from_direction(self.ur, IntPoint::new(-1, 0)),
            _ => Line::from_direction(IntPoint::new(self.ll.x, self.ur.y), IntPoint::new(0, -1)),
        }
    }

    /// The box with side `no` pushed out to the coordinate limit.
    pub fn remove_border_line(&self, no: usize) -> IntBox {
        let mut result = *self;
        match no % 4 {
            0 => result.ll.y = -CRIT_INT,
            1 => result.ur.x = CRIT_INT,
            2 => result.ur.y = CRIT_INT,
            _ => result.ll.x = -CRIT_INT,
        }
        result
    }

    /// Half plane on the left of an axis parallel line, clipped to the limits.
    pub fn half_plane(line: &Line) -> Option<IntBox> {
        let d = line.direction();
        let mut result = IntBox::CRIT;
        if d.y == 0 && d.x > 0 {
            result.ll.y = line.a.y;
        } else if d.y == 0 && d.x < 0 {
            result.ur.y = line.a.y;
        } else if d.x == 0 && d.y > 0 {
            result.ur.x = line.a.x;
        } else if d.x == 0 && d.y < 0 {
            result.ll.x = line.a.x;
        } else {
            return None;
        }
        Some(result)
    }

    pub fn nearest_point(&self, p: FloatPoint) -> FloatPoint {
        FloatPoint::new(
            p.x.clamp(self.ll.x as f64, self.ur.x as f64),
            p.y.clamp(self.ll.y as f64, self.ur.y as f64),
        )
    }

    pub fn centre_of_gravity(&self) -> FloatPoint {
        self.ll.to_float().middle_point(self.ur.to_float())
    }
}
