use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

pub type IntPoint = Point<i64>;
pub type FloatPoint = Point<f64>;

impl<T> Point<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl<T: Add<Output = T>> Add for Point<T> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<T: Sub<Output = T>> Sub for Point<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<T: Neg<Output = T>> Neg for Point<T> {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl<T: Mul<Output = T> + Copy> Mul<T> for Point<T> {
    type Output = Self;
    fn mul(self, rhs: T) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl IntPoint {
    #[inline]
    pub fn to_float(self) -> FloatPoint {
        FloatPoint::new(self.x as f64, self.y as f64)
    }

    /// Cross product of `self` and `other` seen as vectors, exact.
    #[inline]
    pub fn determinant(self, other: IntPoint) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }

    #[inline]
    pub fn scalar_product(self, other: IntPoint) -> i128 {
        self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128
    }
}

impl FloatPoint {
    #[inline]
    pub fn round(self) -> IntPoint {
        IntPoint::new(self.x.round() as i64, self.y.round() as i64)
    }

    #[inline]
    pub fn distance_square(self, other: FloatPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(self, other: FloatPoint) -> f64 {
        self.distance_square(other).sqrt()
    }

    /// Manhattan style distance with separate cost factors per axis.
    #[inline]
    pub fn weighted_distance(self, other: FloatPoint, horizontal: f64, vertical: f64) -> f64 {
        (self.x - other.x).abs() * horizontal + (self.y - other.y).abs() * vertical
    }

    #[inline]
    pub fn middle_point(self, other: FloatPoint) -> FloatPoint {
        FloatPoint::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    #[inline]
    pub fn determinant(self, other: FloatPoint) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn scalar_product(self, other: FloatPoint) -> f64 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn approx_eq(self, other: FloatPoint, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

/// Sign of a number, used where only the direction of a delta matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signum {
    Negative,
    Zero,
    Positive,
}

impl Signum {
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            Signum::Positive
        } else if value < 0.0 {
            Signum::Negative
        } else {
            Signum::Zero
        }
    }
}
