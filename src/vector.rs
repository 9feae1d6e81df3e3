use crate::error::{Error, Result};
use num_traits::{One, Zero};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Add, Mul, Neg, Sub};

/// The coordinate ring of a surface.
///
/// A commutative ordered ring whose comparisons are exact, so that the sign
/// of a cross or dot product of vectors can be decided without error. No
/// division is required anywhere in the crate.
pub trait Ring:
    Clone
    + Eq
    + Ord
    + Debug
    + Display
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
}

impl<T> Ring for T where
    T: Clone
        + Eq
        + Ord
        + Debug
        + Display
        + Zero
        + One
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<Output = T>
        + Neg<Output = T>
{
}

/// Multiply a ring element by a machine integer with double-and-add, so rings
/// only need their own multiplication for ring-by-ring products.
pub(crate) fn scalar_mul<T: Ring>(t: &T, k: i64) -> T {
    if k == 0 {
        return T::zero();
    }
    let negative = k < 0;
    let mut k = k.unsigned_abs();
    let mut acc = T::zero();
    let mut base = t.clone();
    while k > 0 {
        if k & 1 == 1 {
            acc = acc + base.clone();
        }
        k >>= 1;
        if k > 0 {
            base = base.clone() + base;
        }
    }
    if negative {
        -acc
    } else {
        acc
    }
}

/// Whether a turn from one vector to another is mathematically positive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ccw {
    Clockwise,
    Collinear,
    CounterClockwise,
}

/// The relative orientation of two vectors as seen by their dot product.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Orientation {
    Same,
    Orthogonal,
    Opposite,
}

/// A planar vector with exact coordinates in the ring `T`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Vector<T> {
    pub x: T,
    pub y: T,
}

impl<T: Ring> Vector<T> {
    pub fn new(x: T, y: T) -> Self {
        Vector { x, y }
    }

    pub fn zero() -> Self {
        Vector {
            x: T::zero(),
            y: T::zero(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }

    /// The cross product `self.x * rhs.y - self.y * rhs.x`.
    pub fn cross(&self, rhs: &Self) -> T {
        self.x.clone() * rhs.y.clone() - self.y.clone() * rhs.x.clone()
    }

    pub fn dot(&self, rhs: &Self) -> T {
        self.x.clone() * rhs.x.clone() + self.y.clone() * rhs.y.clone()
    }

    pub fn length_squared(&self) -> T {
        self.dot(self)
    }

    /// Is `rhs` clockwise, collinear, or counterclockwise from `self`?
    pub fn ccw(&self, rhs: &Self) -> Ccw {
        match self.cross(rhs).cmp(&T::zero()) {
            Ordering::Greater => Ccw::CounterClockwise,
            Ordering::Equal => Ccw::Collinear,
            Ordering::Less => Ccw::Clockwise,
        }
    }

    pub fn orientation(&self, rhs: &Self) -> Orientation {
        match self.dot(rhs).cmp(&T::zero()) {
            Ordering::Greater => Orientation::Same,
            Ordering::Equal => Orientation::Orthogonal,
            Ordering::Less => Orientation::Opposite,
        }
    }

    /// Does this vector point along the same ray as `other`?
    pub fn parallel_same(&self, other: &Self) -> bool {
        self.ccw(other) == Ccw::Collinear && self.orientation(other) == Orientation::Same
    }

    /// Whether this vector lies in the half-open angular interval
    /// `[begin, end)` swept counterclockwise from `begin`.
    ///
    /// When `begin` and `end` span the same ray the interval is a full turn,
    /// so everything is contained. A zero vector has no direction and is
    /// rejected.
    pub fn in_sector(&self, begin: &Self, end: &Self) -> Result<bool> {
        if self.is_zero() || begin.is_zero() || end.is_zero() {
            return Err(Error::InvalidArgument(
                "vectors defining or tested against a sector must be non-zero".to_string(),
            ));
        }
        if self.parallel_same(begin) {
            return Ok(true);
        }
        if self.parallel_same(end) {
            return Ok(false);
        }
        Ok(match begin.ccw(end) {
            Ccw::Collinear => {
                if begin.orientation(end) == Orientation::Same {
                    // A full turn contains every direction.
                    true
                } else {
                    begin.ccw(self) == Ccw::CounterClockwise
                }
            }
            Ccw::CounterClockwise => {
                begin.ccw(self) == Ccw::CounterClockwise && self.ccw(end) == Ccw::CounterClockwise
            }
            Ccw::Clockwise => {
                // The complement of the interval [end, begin), which spans
                // less than a half turn.
                !(end.ccw(self) == Ccw::CounterClockwise
                    && self.ccw(begin) == Ccw::CounterClockwise)
            }
        })
    }
}

impl<T: Ring> Add for Vector<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Vector {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl<T: Ring> Sub for Vector<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Vector {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl<T: Ring> Neg for Vector<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Vector {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl<T: Ring> Display for Vector<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A strict weak order on non-zero vectors by the slope of the line they
/// span, with downward verticals smallest and upward verticals largest.
///
/// Vectors on the same non-vertical line compare equivalent regardless of
/// direction, which makes this suitable as a set key for slopes.
#[derive(Copy, Clone, Debug, Default)]
pub struct CompareSlope;

impl CompareSlope {
    /// The three-way comparison underlying [`CompareSlope::lt`].
    pub fn cmp<T: Ring>(&self, lhs: &Vector<T>, rhs: &Vector<T>) -> Ordering {
        debug_assert!(!lhs.is_zero() && !rhs.is_zero());
        let zero = T::zero();
        let rank = |v: &Vector<T>| -> i8 {
            // Verticals sort before and after every proper slope.
            match v.x.cmp(&zero) {
                Ordering::Equal => {
                    if v.y < zero {
                        -1
                    } else {
                        1
                    }
                }
                _ => 0,
            }
        };
        let lr = rank(lhs);
        let rr = rank(rhs);
        if lr != rr {
            return lr.cmp(&rr);
        }
        if lr != 0 {
            return Ordering::Equal;
        }
        // lhs.y / lhs.x versus rhs.y / rhs.x by cross multiplication; the
        // product of the signs of the denominators fixes the direction.
        let diff = lhs.y.clone() * rhs.x.clone() - rhs.y.clone() * lhs.x.clone();
        let flip = (lhs.x < zero) != (rhs.x < zero);
        let ord = diff.cmp(&zero);
        if flip {
            ord.reverse()
        } else {
            ord
        }
    }

    pub fn lt<T: Ring>(&self, lhs: &Vector<T>, rhs: &Vector<T>) -> bool {
        self.cmp(lhs, rhs) == Ordering::Less
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for Vector<i64> {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        // Small coordinates so products stay far away from overflow.
        let range: Vec<i64> = (-50..=50).collect();
        Vector {
            x: *g.choose(&range).unwrap(),
            y: *g.choose(&range).unwrap(),
        }
    }
}
