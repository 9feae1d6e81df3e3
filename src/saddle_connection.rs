use crate::chain::Chain;
use crate::half_edge::HalfEdge;
use crate::vector::{Ring, Vector};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A straight segment between two singularities of a surface whose interior
/// passes through none.
///
/// `source` and `target` name the outgoing sectors at the two endpoints: the
/// connection leaves its start inside the sector counterclockwise of
/// `source`, and arrives at its end pointing into the sector of `target`.
/// The chain records the unfolded path; its evaluation equals `vector`.
///
/// Two connections are equal when their vectors and both sectors agree; the
/// chain is derived data and does not participate in comparisons.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SaddleConnection<T> {
    source: HalfEdge,
    target: HalfEdge,
    chain: Chain,
    vector: Vector<T>,
}

impl<T: Ring> SaddleConnection<T> {
    pub fn new(source: HalfEdge, target: HalfEdge, chain: Chain, vector: Vector<T>) -> Self {
        SaddleConnection {
            source,
            target,
            chain,
            vector,
        }
    }

    pub fn source(&self) -> HalfEdge {
        self.source
    }

    pub fn target(&self) -> HalfEdge {
        self.target
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn vector(&self) -> &Vector<T> {
        &self.vector
    }

    pub fn length_squared(&self) -> T {
        self.vector.length_squared()
    }

    /// The same segment travelled backwards.
    pub fn reversed(&self) -> Self {
        SaddleConnection {
            source: self.target,
            target: self.source,
            chain: -self.chain.clone(),
            vector: -self.vector.clone(),
        }
    }

    /// Concatenate with a connection that departs where this one arrives.
    pub fn extended(&self, rhs: &Self) -> Self {
        SaddleConnection {
            source: self.source,
            target: rhs.target,
            chain: self.chain.clone() + rhs.chain.clone(),
            vector: self.vector.clone() + rhs.vector.clone(),
        }
    }
}

impl<T: Ring> PartialEq for SaddleConnection<T> {
    fn eq(&self, rhs: &Self) -> bool {
        self.source == rhs.source && self.target == rhs.target && self.vector == rhs.vector
    }
}

impl<T: Ring> Eq for SaddleConnection<T> {}

impl<T: Ring> std::ops::Neg for SaddleConnection<T> {
    type Output = Self;

    fn neg(self) -> Self {
        self.reversed()
    }
}

impl<T: Ring> Display for SaddleConnection<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} from {} to {}", self.vector, self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(id: i64) -> HalfEdge {
        HalfEdge::new(id)
    }

    fn along(id: i64, x: i64, y: i64) -> SaddleConnection<i64> {
        SaddleConnection::new(
            h(id),
            h(-id),
            Chain::from_half_edge(h(id), 3),
            Vector::new(x, y),
        )
    }

    #[test]
    fn reversal_is_an_involution() {
        let c = along(1, 1, 0);
        assert_eq!(c.reversed().reversed(), c);
        assert_eq!(c.reversed().vector(), &Vector::new(-1, 0));
        assert_eq!(c.reversed().source(), h(-1));
    }

    #[test]
    fn equality_ignores_the_chain() {
        let c = along(1, 1, 0);
        let mut other = c.clone();
        other = SaddleConnection::new(
            other.source(),
            other.target(),
            Chain::zero(3),
            other.vector().clone(),
        );
        assert_eq!(c, other);
    }

    #[test]
    fn extension_adds_vectors() {
        let c = along(1, 1, 0).extended(&along(2, 0, 1));
        assert_eq!(c.vector(), &Vector::new(1, 1));
        assert_eq!(c.source(), h(1));
        assert_eq!(c.target(), h(-2));
    }
}
