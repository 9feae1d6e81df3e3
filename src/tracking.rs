use crate::combinatorial::Triangulation;
use crate::half_edge::{Edge, HalfEdge};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A dense map from half edges to values.
///
/// Storage is a flat vector indexed by [`HalfEdge::index`], so lookups are
/// array accesses. The map does not watch a triangulation by itself; the
/// surface owning both forwards the relevant [`crate::Subscriber`] events to
/// [`HalfEdgeMap::swap`] and [`HalfEdgeMap::truncate`] so the slots follow
/// every renaming.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct HalfEdgeMap<V> {
    data: Vec<V>,
}

impl<V> HalfEdgeMap<V> {
    /// Initialise a value for every half edge of the triangulation.
    pub fn new(triangulation: &Triangulation, mut values: impl FnMut(HalfEdge) -> V) -> Self {
        HalfEdgeMap {
            data: triangulation.half_edges().map(|e| values(e)).collect(),
        }
    }

    pub fn get(&self, e: HalfEdge) -> &V {
        &self.data[e.index()]
    }

    pub fn get_mut(&mut self, e: HalfEdge) -> &mut V {
        &mut self.data[e.index()]
    }

    pub fn set(&mut self, e: HalfEdge, value: V) {
        self.data[e.index()] = value;
    }

    /// Exchange the values of `a` and `b` and of their negatives; the slot
    /// counterpart of [`Triangulation::swap`].
    pub fn swap(&mut self, a: HalfEdge, b: HalfEdge) {
        if a == b {
            return;
        }
        self.data.swap(a.index(), b.index());
        self.data.swap((-a).index(), (-b).index());
    }

    /// Drop the values of the trailing `edges` edge pairs; the slot
    /// counterpart of erasing trailing edges.
    pub fn truncate(&mut self, edges: usize) {
        let keep = self.data.len() - 2 * edges;
        self.data.truncate(keep);
    }

    /// Move values between keys: every value whose key matches `search` is
    /// re-filed under the key `adapt` returns for it.
    pub fn rekey(
        &mut self,
        search: impl Fn(HalfEdge) -> bool,
        adapt: impl Fn(HalfEdge) -> HalfEdge,
    ) where
        V: Clone,
    {
        let moves: Vec<(HalfEdge, HalfEdge)> = (0..self.data.len())
            .map(HalfEdge::from_index)
            .filter(|e| search(*e))
            .map(|e| (e, adapt(e)))
            .collect();
        let snapshot = self.data.clone();
        for (from, to) in moves {
            self.data[to.index()] = snapshot[from.index()].clone();
        }
    }

    /// Keys and values in storage order `1, -1, 2, -2, …`.
    pub fn iter(&self) -> impl Iterator<Item = (HalfEdge, &V)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (HalfEdge::from_index(i), v))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A dense map from undirected edges to values, for attributes that do not
/// distinguish a half edge from its negative.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct EdgeMap<V> {
    data: Vec<V>,
}

impl<V> EdgeMap<V> {
    pub fn new(triangulation: &Triangulation, mut values: impl FnMut(Edge) -> V) -> Self {
        EdgeMap {
            data: triangulation.edges().map(|e| values(e)).collect(),
        }
    }

    pub fn get(&self, e: Edge) -> &V {
        &self.data[e.index()]
    }

    pub fn get_mut(&mut self, e: Edge) -> &mut V {
        &mut self.data[e.index()]
    }

    pub fn set(&mut self, e: Edge, value: V) {
        self.data[e.index()] = value;
    }

    pub fn swap(&mut self, a: Edge, b: Edge) {
        if a == b {
            return;
        }
        self.data.swap(a.index(), b.index());
    }

    pub fn truncate(&mut self, edges: usize) {
        let keep = self.data.len() - edges;
        self.data.truncate(keep);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Edge, &V)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (Edge::from_index(i), v))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(id: i64) -> HalfEdge {
        HalfEdge::new(id)
    }

    fn torus() -> Triangulation {
        Triangulation::from_faces(&[
            vec![h(1), h(2), h(3)],
            vec![h(-1), h(-2), h(-3)],
        ])
        .unwrap()
    }

    #[test]
    fn init_and_lookup() {
        let t = torus();
        let map = HalfEdgeMap::new(&t, |e| e.id() * 10);
        assert_eq!(*map.get(h(2)), 20);
        assert_eq!(*map.get(h(-3)), -30);
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn swap_moves_both_halves() {
        let t = torus();
        let mut map = HalfEdgeMap::new(&t, |e| e.id());
        map.swap(h(1), h(3));
        assert_eq!(*map.get(h(1)), 3);
        assert_eq!(*map.get(h(-1)), -3);
        assert_eq!(*map.get(h(3)), 1);
        assert_eq!(*map.get(h(-3)), -1);
        assert_eq!(*map.get(h(2)), 2);
    }

    #[test]
    fn truncate_drops_trailing_pairs() {
        let t = torus();
        let mut map = HalfEdgeMap::new(&t, |e| e.id());
        map.truncate(2);
        assert_eq!(map.len(), 2);
        assert_eq!(*map.get(h(-1)), -1);
    }

    #[test]
    fn rekey_refiles_values() {
        let t = torus();
        let mut map = HalfEdgeMap::new(&t, |e| e.id());
        map.rekey(|e| e == h(1), |_| h(2));
        assert_eq!(*map.get(h(2)), 1);
        assert_eq!(*map.get(h(1)), 1);
    }

    #[test]
    fn edge_map_is_even() {
        let t = torus();
        let mut map = EdgeMap::new(&t, |e| e.id());
        map.swap(Edge::new(1), Edge::new(2));
        assert_eq!(*map.get(Edge::new(1)), 2);
        assert_eq!(map.iter().count(), 3);
    }
}
