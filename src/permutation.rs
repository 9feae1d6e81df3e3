use crate::error::{Error, Result};
use crate::half_edge::HalfEdge;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A permutation of the half edges `1, -1, …, n, -n`, stored densely together
/// with its inverse so both directions apply in constant time.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Permutation {
    next: Vec<HalfEdge>,
    prev: Vec<HalfEdge>,
}

impl Permutation {
    /// Build a permutation from disjoint cycles. Every half edge of
    /// `1, -1, …, n, -n` must appear exactly once.
    pub fn from_cycles(cycles: &[Vec<HalfEdge>]) -> Result<Self> {
        let count: usize = cycles.iter().map(|c| c.len()).sum();
        if count == 0 || count % 2 != 0 {
            return Err(Error::InvalidArgument(
                "cycles must cover a non-empty set of half edge pairs".to_string(),
            ));
        }
        let identity = HalfEdge::new(1);
        let mut next = vec![identity; count];
        let mut prev = vec![identity; count];
        let mut seen = vec![false; count];
        for cycle in cycles {
            for (i, &e) in cycle.iter().enumerate() {
                let to = cycle[(i + 1) % cycle.len()];
                if e.index() >= count || to.index() >= count {
                    return Err(Error::InvalidArgument(format!(
                        "half edge {} out of range for {} half edges",
                        e, count
                    )));
                }
                if seen[e.index()] {
                    return Err(Error::InvalidArgument(format!(
                        "half edge {} appears twice",
                        e
                    )));
                }
                seen[e.index()] = true;
                next[e.index()] = to;
                prev[to.index()] = e;
            }
        }
        if !seen.iter().all(|&s| s) {
            return Err(Error::InvalidArgument(
                "not every half edge appears in a cycle".to_string(),
            ));
        }
        Ok(Permutation { next, prev })
    }

    /// The number of edges, i.e. half the number of half edges.
    pub fn edge_count(&self) -> usize {
        self.next.len() / 2
    }

    pub fn half_edge_count(&self) -> usize {
        self.next.len()
    }

    /// The image of `e`.
    pub fn apply(&self, e: HalfEdge) -> HalfEdge {
        self.next[e.index()]
    }

    /// The preimage of `e`.
    pub fn preimage(&self, e: HalfEdge) -> HalfEdge {
        self.prev[e.index()]
    }

    /// Redirect the image of `from` to `to`, keeping the inverse in sync.
    /// The caller is responsible for restoring bijectivity before the
    /// permutation is used again.
    pub(crate) fn set(&mut self, from: HalfEdge, to: HalfEdge) {
        self.next[from.index()] = to;
        self.prev[to.index()] = from;
    }

    /// Exchange the names `a` and `b` (and `-a` and `-b`) without changing
    /// the underlying permutation.
    pub(crate) fn rename_swap(&mut self, a: HalfEdge, b: HalfEdge) {
        if a == b {
            return;
        }
        let rename = |e: HalfEdge| -> HalfEdge {
            if e == a {
                b
            } else if e == b {
                a
            } else if e == -a {
                -b
            } else if e == -b {
                -a
            } else {
                e
            }
        };
        let mut next = self.next.clone();
        let mut prev = self.prev.clone();
        for e in self.half_edges() {
            let image = rename(self.apply(e));
            next[rename(e).index()] = image;
            prev[image.index()] = rename(e);
        }
        self.next = next;
        self.prev = prev;
    }

    /// Drop the trailing `count` edges; they must already be fixed points or
    /// only map among themselves.
    pub(crate) fn truncate(&mut self, count: usize) {
        let keep = self.next.len() - 2 * count;
        self.next.truncate(keep);
        self.prev.truncate(keep);
    }

    /// All half edges in the order `1, -1, 2, -2, …`.
    pub fn half_edges(&self) -> impl Iterator<Item = HalfEdge> {
        (0..self.next.len()).map(HalfEdge::from_index)
    }

    /// The orbits of this permutation, each starting at its smallest index.
    pub fn cycles(&self) -> Vec<Vec<HalfEdge>> {
        let mut cycles = Vec::new();
        let mut seen = vec![false; self.next.len()];
        for start in self.half_edges() {
            if seen[start.index()] {
                continue;
            }
            let mut cycle = Vec::new();
            let mut e = start;
            loop {
                seen[e.index()] = true;
                cycle.push(e);
                e = self.apply(e);
                if e == start {
                    break;
                }
            }
            cycles.push(cycle);
        }
        cycles
    }

    /// The length of the orbit through `e`.
    pub fn cycle_length(&self, e: HalfEdge) -> usize {
        let mut len = 1;
        let mut walk = self.apply(e);
        while walk != e {
            walk = self.apply(walk);
            len += 1;
        }
        len
    }
}

impl Display for Permutation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for cycle in self.cycles() {
            write!(f, "(")?;
            for (i, e) in cycle.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", e)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(id: i64) -> HalfEdge {
        HalfEdge::new(id)
    }

    fn torus_faces() -> Permutation {
        Permutation::from_cycles(&[
            vec![h(1), h(2), h(3)],
            vec![h(-1), h(-2), h(-3)],
        ])
        .unwrap()
    }

    #[test]
    fn apply_and_preimage() {
        let p = torus_faces();
        assert_eq!(p.apply(h(1)), h(2));
        assert_eq!(p.apply(h(3)), h(1));
        assert_eq!(p.preimage(h(2)), h(1));
        assert_eq!(p.preimage(h(-1)), h(-3));
        assert_eq!(p.edge_count(), 3);
    }

    #[test]
    fn rejects_double_occurrence() {
        assert!(Permutation::from_cycles(&[vec![h(1), h(1)]]).is_err());
        assert!(Permutation::from_cycles(&[vec![h(1), h(2)]]).is_err());
    }

    #[test]
    fn cycles_roundtrip() {
        let p = torus_faces();
        let cycles = p.cycles();
        let q = Permutation::from_cycles(&cycles).unwrap();
        assert_eq!(p, q);
        assert_eq!(p.cycle_length(h(1)), 3);
    }

    #[test]
    fn rename_swap_preserves_structure() {
        let mut p = torus_faces();
        p.rename_swap(h(1), h(3));
        // The cycle (1 2 3) became (3 2 1).
        assert_eq!(p.apply(h(3)), h(2));
        assert_eq!(p.apply(h(2)), h(1));
        assert_eq!(p.apply(h(1)), h(3));
        assert_eq!(p.apply(h(-3)), h(-2));
        assert_eq!(p.cycle_length(h(1)), 3);
    }

    #[test]
    fn display_is_cycle_notation() {
        let p = torus_faces();
        assert_eq!(format!("{}", p), "(1, 2, 3)(-1, -2, -3)");
    }
}
