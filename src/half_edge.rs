#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One of the two oriented sides of an edge, identified by a non-zero signed
/// integer. `-e` denotes the opposite side of the same edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct HalfEdge(i64);

impl HalfEdge {
    /// Create a half edge from its id. Panics on zero, which is not a valid
    /// id since ids must be closed under negation.
    pub fn new(id: i64) -> Self {
        assert!(id != 0, "half edge ids must be non-zero");
        HalfEdge(id)
    }

    pub fn id(self) -> i64 {
        self.0
    }

    /// The undirected edge this half edge belongs to.
    pub fn edge(self) -> Edge {
        Edge(self.0.abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Offset into dense per-half-edge storage: the half edges
    /// `1, -1, 2, -2, …` are laid out consecutively.
    pub fn index(self) -> usize {
        let e = (self.0.abs() - 1) as usize;
        2 * e + if self.0 < 0 { 1 } else { 0 }
    }

    /// The half edge stored at the given dense index.
    pub fn from_index(index: usize) -> Self {
        let id = (index / 2 + 1) as i64;
        HalfEdge(if index % 2 == 0 { id } else { -id })
    }
}

impl std::ops::Neg for HalfEdge {
    type Output = HalfEdge;

    fn neg(self) -> HalfEdge {
        HalfEdge(-self.0)
    }
}

impl Display for HalfEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An undirected edge, canonically represented by its positive half edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Edge(i64);

impl Edge {
    pub fn new(id: i64) -> Self {
        assert!(id > 0, "edge ids are positive");
        Edge(id)
    }

    pub fn id(self) -> i64 {
        self.0
    }

    /// The canonical positive representative.
    pub fn positive(self) -> HalfEdge {
        HalfEdge(self.0)
    }

    pub fn negative(self) -> HalfEdge {
        HalfEdge(-self.0)
    }

    /// Offset into dense per-edge storage.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn from_index(index: usize) -> Self {
        Edge(index as i64 + 1)
    }
}

impl From<HalfEdge> for Edge {
    fn from(e: HalfEdge) -> Edge {
        e.edge()
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_roundtrips() {
        for id in &[1i64, -1, 2, -2, 17, -17] {
            let e = HalfEdge::new(*id);
            assert_eq!(HalfEdge::from_index(e.index()), e);
        }
        assert_eq!(HalfEdge::new(1).index(), 0);
        assert_eq!(HalfEdge::new(-1).index(), 1);
        assert_eq!(HalfEdge::new(2).index(), 2);
    }

    #[test]
    fn edges() {
        let e = HalfEdge::new(-3);
        assert_eq!(e.edge(), Edge::new(3));
        assert_eq!(e.edge().positive(), HalfEdge::new(3));
        assert_eq!(e.edge().negative(), e);
        assert_eq!(-e, HalfEdge::new(3));
    }
}
