use crate::error::{Error, Result};
use crate::half_edge::{Edge, HalfEdge};
use crate::permutation::Permutation;
use log::trace;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A vertex of a triangulation, canonically named by the outgoing half edge
/// with the smallest storage index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vertex(HalfEdge);

impl Vertex {
    pub fn representative(self) -> HalfEdge {
        self.0
    }
}

impl Display for Vertex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v({})", self.0)
    }
}

/// The structural changes of a triangulation, in the order attribute stores
/// must observe them. Every mutation finishes its fan-out before it returns.
pub trait Subscriber {
    /// The faces around `e` have been rotated; permutations are already in
    /// their new state.
    fn after_flip(&mut self, triangulation: &Triangulation, e: HalfEdge) -> Result<()>;
    /// `e` is about to be contracted; permutations are still in their old
    /// state so stores may read every pre-collapse value.
    fn before_collapse(&mut self, triangulation: &Triangulation, e: Edge) -> Result<()>;
    /// The names `a` and `b` (and their negatives) are about to be exchanged.
    fn before_swap(&mut self, triangulation: &Triangulation, a: HalfEdge, b: HalfEdge);
    /// The given edges, currently the highest-numbered ones, are about to be
    /// removed.
    fn before_erase(&mut self, triangulation: &Triangulation, edges: &[Edge]);
}

/// A subscriber for triangulations that carry no attributes.
pub struct NoSubscriber;

impl Subscriber for NoSubscriber {
    fn after_flip(&mut self, _: &Triangulation, _: HalfEdge) -> Result<()> {
        Ok(())
    }
    fn before_collapse(&mut self, _: &Triangulation, _: Edge) -> Result<()> {
        Ok(())
    }
    fn before_swap(&mut self, _: &Triangulation, _: HalfEdge, _: HalfEdge) {}
    fn before_erase(&mut self, _: &Triangulation, _: &[Edge]) {}
}

/// A triangulated surface without any geometry: two permutations of the half
/// edges, one walking counterclockwise around each source vertex and one
/// walking along each face boundary.
///
/// Face cycles have length three, except that a collapsed surface may contain
/// faces of the form `(e, -e)`, a single edge pair identified head to tail.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Triangulation {
    vertices: Permutation,
    faces: Permutation,
}

impl Triangulation {
    /// Build a triangulation from its face cycles; the vertex permutation is
    /// derived from them.
    pub fn from_faces(cycles: &[Vec<HalfEdge>]) -> Result<Self> {
        let faces = Permutation::from_cycles(cycles)?;
        let vertices = Self::vertices_from_faces(&faces);
        let triangulation = Triangulation { vertices, faces };
        for cycle in cycles {
            if cycle.len() != 3 {
                return Err(Error::InvalidArgument(format!(
                    "face {:?} does not have three sides",
                    cycle
                )));
            }
        }
        triangulation.check()?;
        Ok(triangulation)
    }

    /// Build a triangulation from an explicit pair of permutations. The two
    /// must be related by `vertices(e) == -faces⁻¹(e)`.
    pub fn from_permutations(vertices: Permutation, faces: Permutation) -> Result<Self> {
        if vertices.half_edge_count() != faces.half_edge_count() {
            return Err(Error::InvalidArgument(
                "vertex and face permutations act on different half edges".to_string(),
            ));
        }
        let triangulation = Triangulation { vertices, faces };
        for e in triangulation.half_edges() {
            if triangulation.vertices.apply(e) != -triangulation.faces.preimage(e) {
                return Err(Error::InvalidArgument(format!(
                    "vertex and face permutations are inconsistent at {}",
                    e
                )));
            }
            if triangulation.faces.cycle_length(e) != 3 {
                return Err(Error::InvalidArgument(format!(
                    "face of {} does not have three sides",
                    e
                )));
            }
        }
        Ok(triangulation)
    }

    fn vertices_from_faces(faces: &Permutation) -> Permutation {
        let cycles: Vec<Vec<HalfEdge>> = {
            // σ(e) = -φ⁻¹(e); reconstruct it as cycles so the permutation
            // builder validates bijectivity for us.
            let mut seen = vec![false; faces.half_edge_count()];
            let mut cycles = Vec::new();
            for start in faces.half_edges() {
                if seen[start.index()] {
                    continue;
                }
                let mut cycle = Vec::new();
                let mut e = start;
                loop {
                    seen[e.index()] = true;
                    cycle.push(e);
                    e = -faces.preimage(e);
                    if e == start {
                        break;
                    }
                }
                cycles.push(cycle);
            }
            cycles
        };
        Permutation::from_cycles(&cycles).expect("derived vertex cycles cover all half edges")
    }

    /// Internal consistency of the permutation pair.
    pub(crate) fn check(&self) -> Result<()> {
        for e in self.half_edges() {
            if self.vertices.apply(e) != -self.faces.preimage(e) {
                return Err(Error::InvariantViolated(format!(
                    "vertex and face permutations disagree at {}",
                    e
                )));
            }
        }
        Ok(())
    }

    pub fn edge_count(&self) -> usize {
        self.faces.edge_count()
    }

    pub fn half_edges(&self) -> impl Iterator<Item = HalfEdge> {
        self.faces.half_edges()
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> {
        (0..self.edge_count()).map(Edge::from_index)
    }

    pub fn next_in_face(&self, e: HalfEdge) -> HalfEdge {
        self.faces.apply(e)
    }

    pub fn previous_in_face(&self, e: HalfEdge) -> HalfEdge {
        self.faces.preimage(e)
    }

    pub fn next_at_vertex(&self, e: HalfEdge) -> HalfEdge {
        self.vertices.apply(e)
    }

    pub fn previous_at_vertex(&self, e: HalfEdge) -> HalfEdge {
        self.vertices.preimage(e)
    }

    /// Whether `e` lies in a collapsed face, i.e. a face consisting of a
    /// single edge pair identified head to tail.
    pub fn is_in_collapsed_face(&self, e: HalfEdge) -> bool {
        self.next_in_face(e) == -e
    }

    /// Whether both faces at `e` are genuine triangles.
    pub fn is_flippable(&self, e: HalfEdge) -> bool {
        self.next_in_face(e) != -e
            && self.next_in_face(-e) != e
            && self.faces.cycle_length(e) == 3
            && self.faces.cycle_length(-e) == 3
    }

    pub fn face_cycles(&self) -> Vec<Vec<HalfEdge>> {
        self.faces.cycles()
    }

    pub fn vertex_cycles(&self) -> Vec<Vec<HalfEdge>> {
        self.vertices.cycles()
    }

    /// The vertex a half edge emanates from.
    pub fn source(&self, e: HalfEdge) -> Vertex {
        let mut best = e;
        let mut walk = self.next_at_vertex(e);
        while walk != e {
            if walk.index() < best.index() {
                best = walk;
            }
            walk = self.next_at_vertex(walk);
        }
        Vertex(best)
    }

    /// The vertex a half edge points to.
    pub fn target(&self, e: HalfEdge) -> Vertex {
        self.source(-e)
    }

    /// The half edges leaving `vertex`, counterclockwise.
    pub fn out_edges(&self, vertex: Vertex) -> Vec<HalfEdge> {
        let mut out = vec![vertex.0];
        let mut walk = self.next_at_vertex(vertex.0);
        while walk != vertex.0 {
            out.push(walk);
            walk = self.next_at_vertex(walk);
        }
        out
    }

    pub fn vertices(&self) -> Vec<Vertex> {
        let mut seen = vec![false; 2 * self.edge_count()];
        let mut vertices = Vec::new();
        for e in self.half_edges() {
            if seen[e.index()] {
                continue;
            }
            let v = self.source(e);
            for out in self.out_edges(v) {
                seen[out.index()] = true;
            }
            vertices.push(v);
        }
        vertices
    }

    /// Replace the diagonal `{e, -e}` of the quadrilateral formed by its two
    /// triangles with the other diagonal, turning the faces `(a, b, e)` and
    /// `(c, d, -e)` into `(a, -e, d)` and `(c, e, b)`.
    pub fn flip<S: Subscriber>(&mut self, e: HalfEdge, subscriber: &mut S) -> Result<()> {
        if !self.is_flippable(e) {
            return Err(Error::InvalidArgument(format!(
                "cannot flip {}: both sides must be triangles",
                e
            )));
        }
        trace!("flipping half edge {}", e);

        let a = self.faces.apply(e);
        let b = self.faces.apply(a);
        let c = self.faces.apply(-e);
        let d = self.faces.apply(c);

        self.faces.set(a, -e);
        self.faces.set(-e, d);
        self.faces.set(d, a);
        self.faces.set(c, e);
        self.faces.set(e, b);
        self.faces.set(b, c);

        for x in &[a, b, c, d, e, -e] {
            let x = *x;
            self.vertices.set(x, -self.faces.preimage(x));
        }

        subscriber.after_flip(self, e)
    }

    /// Exchange the identifiers `a` and `b` (and `-a` and `-b`) without
    /// changing the combinatorics.
    pub fn swap<S: Subscriber>(&mut self, a: HalfEdge, b: HalfEdge, subscriber: &mut S) {
        if a == b {
            return;
        }
        trace!("swapping half edges {} and {}", a, b);
        subscriber.before_swap(self, a, b);
        self.faces.rename_swap(a, b);
        self.vertices.rename_swap(a, b);
    }

    /// Remove the given edges. They must be the highest-numbered edges and
    /// their face and vertex cycles must not reach any kept edge.
    pub fn erase<S: Subscriber>(&mut self, edges: &[Edge], subscriber: &mut S) -> Result<()> {
        if edges.is_empty() {
            return Ok(());
        }
        let keep = self.edge_count() - edges.len();
        for (i, edge) in edges.iter().enumerate() {
            if edge.index() < keep || edges[..i].contains(edge) {
                return Err(Error::InvalidArgument(format!(
                    "edge {} is not among the trailing edges",
                    edge
                )));
            }
        }
        for edge in edges {
            for e in &[edge.positive(), edge.negative()] {
                if self.faces.apply(*e).edge().index() < keep
                    || self.vertices.apply(*e).edge().index() < keep
                {
                    return Err(Error::InvalidArgument(format!(
                        "edge {} is still attached to the kept surface",
                        edge
                    )));
                }
            }
        }
        trace!("erasing {} edges", edges.len());
        subscriber.before_erase(self, edges);
        self.faces.truncate(edges.len());
        self.vertices.truncate(edges.len());
        Ok(())
    }

    /// Contract the edge of `e`, identifying its two endpoints. The faces on
    /// either side disappear: their remaining two half edges are glued into a
    /// single edge, or become a collapsed face when they already form one
    /// edge pair. Returns the two half edges that replace the collapsed pair.
    pub fn collapse<S: Subscriber>(
        &mut self,
        e: HalfEdge,
        subscriber: &mut S,
    ) -> Result<(HalfEdge, HalfEdge)> {
        if self.next_in_face(e) == -e || self.next_in_face(-e) == e {
            return Err(Error::InvalidArgument(format!(
                "cannot collapse {}: the edge lies in a collapsed face",
                e
            )));
        }
        if self.faces.cycle_length(e) != 3 || self.faces.cycle_length(-e) != 3 {
            return Err(Error::InvalidArgument(format!(
                "cannot collapse {}: both sides must be triangles",
                e
            )));
        }
        trace!("collapsing half edge {}", e);

        subscriber.before_collapse(self, e.edge())?;

        // The faces are (c, e, b) and (a, -e, d).
        let b = self.faces.apply(e);
        let c = self.faces.apply(b);
        let d = self.faces.apply(-e);
        let a = self.faces.apply(d);

        // Identifications of the outer half edges, as pairs of half edges
        // that become one, plus the edges that disappear and the collapsed
        // faces that appear.
        let mut renames: Vec<(HalfEdge, HalfEdge)> = Vec::new();
        let mut doomed: Vec<Edge> = vec![e.edge()];
        let mut collapsed_faces: Vec<HalfEdge> = Vec::new();

        let glue = |renames: &mut Vec<(HalfEdge, HalfEdge)>,
                    doomed: &mut Vec<Edge>,
                    survivor: HalfEdge,
                    loser: HalfEdge| {
            renames.push((loser, survivor));
            renames.push((-loser, -survivor));
            doomed.push(loser.edge());
        };

        if a == -c && b == -d {
            // The entire gadget reduces to a single collapsed edge pair.
            glue(&mut renames, &mut doomed, a, b);
            collapsed_faces.push(a);
        } else if a == -c {
            // The inner edge shared by both faces collapses as well; the two
            // outer edges merge onto it from either side.
            glue(&mut renames, &mut doomed, a, b);
            glue(&mut renames, &mut doomed, -a, d);
        } else if b == -d {
            glue(&mut renames, &mut doomed, b, -c);
            glue(&mut renames, &mut doomed, -b, -a);
        } else if a == -d || b == -c {
            if a == -d {
                // The side of (a, -e, d) already consists of one edge pair.
                collapsed_faces.push(a);
            } else {
                let (survivor, loser) = if d.edge().index() <= a.edge().index() {
                    (d, -a)
                } else {
                    (-a, d)
                };
                glue(&mut renames, &mut doomed, survivor, loser);
            }
            if b == -c {
                collapsed_faces.push(b);
            } else {
                let (survivor, loser) = if b.edge().index() <= c.edge().index() {
                    (b, -c)
                } else {
                    (-c, b)
                };
                glue(&mut renames, &mut doomed, survivor, loser);
            }
        } else {
            let gadget = [a, b, c, d, -a, -b, -c, -d];
            for (i, x) in gadget.iter().enumerate() {
                if gadget[..i].contains(x) {
                    return Err(Error::InvariantViolated(format!(
                        "unhandled identification in gadget ({} {} {})({} {} {})",
                        e, b, c, -e, d, a
                    )));
                }
            }
            let (survivor, loser) = if b.edge().index() <= c.edge().index() {
                (b, -c)
            } else {
                (-c, b)
            };
            glue(&mut renames, &mut doomed, survivor, loser);
            let (survivor, loser) = if d.edge().index() <= a.edge().index() {
                (d, -a)
            } else {
                (-a, d)
            };
            glue(&mut renames, &mut doomed, survivor, loser);
        }

        let resolve = |mut x: HalfEdge| -> HalfEdge {
            loop {
                let mut changed = false;
                for (from, to) in &renames {
                    if x == *from {
                        x = *to;
                        changed = true;
                    }
                }
                if !changed {
                    return x;
                }
            }
        };

        // Rebuild the face cycles in the surviving names. The two faces at
        // the collapsed edge disappear; collapsed faces take their place
        // where a side degenerated to one edge pair.
        let mut cycles: Vec<Vec<HalfEdge>> = Vec::new();
        for cycle in self.faces.cycles() {
            if cycle.contains(&e) || cycle.contains(&-e) {
                continue;
            }
            cycles.push(cycle.into_iter().map(resolve).collect());
        }
        for x in &collapsed_faces {
            let x = resolve(*x);
            cycles.push(vec![x, -x]);
        }

        // Compact the edge names: swap every doomed edge into the trailing
        // positions, then truncate.
        doomed.sort_unstable();
        doomed.dedup();
        let keep = self.edge_count() - doomed.len();
        let mut compaction: Vec<(HalfEdge, HalfEdge)> = Vec::new();
        {
            let doomed_high: Vec<Edge> = doomed.iter().filter(|d| d.index() >= keep).cloned().collect();
            let mut free_high = (keep..self.edge_count())
                .map(Edge::from_index)
                .filter(|t| !doomed_high.contains(t));
            for low in doomed.iter().filter(|d| d.index() < keep) {
                let high = free_high.next().expect("as many free trailing slots as leading doomed edges");
                compaction.push((low.positive(), high.positive()));
            }
        }
        for (x, y) in &compaction {
            subscriber.before_swap(self, *x, *y);
        }
        let erased: Vec<Edge> = (keep..self.edge_count()).map(Edge::from_index).collect();
        subscriber.before_erase(self, &erased);

        let rename_compact = |x: HalfEdge| -> HalfEdge {
            for (low, high) in &compaction {
                if x.edge() == high.edge() {
                    return if x.is_positive() {
                        *low
                    } else {
                        -*low
                    };
                }
            }
            x
        };
        for cycle in &mut cycles {
            for x in cycle.iter_mut() {
                *x = rename_compact(*x);
            }
        }

        self.faces = Permutation::from_cycles(&cycles).map_err(|err| {
            Error::InvariantViolated(format!("collapse left inconsistent faces: {}", err))
        })?;
        self.vertices = Self::vertices_from_faces(&self.faces);

        Ok((rename_compact(resolve(b)), rename_compact(resolve(d))))
    }

    /// A table of the permutations, row per derived attribute, for debugging.
    pub fn debug_table(&self) -> String {
        use prettytable::{Cell, Row, Table};
        let mut table = Table::new();
        let mut headers = Row::empty();
        headers.add_cell(Cell::new("-"));
        let mut in_face = Row::empty();
        in_face.add_cell(Cell::new("face.next"));
        let mut at_vertex = Row::empty();
        at_vertex.add_cell(Cell::new("vertex.next"));
        for e in self.half_edges() {
            headers.add_cell(Cell::new(&format!("{}", e)));
            in_face.add_cell(Cell::new(&format!("{}", self.next_in_face(e))));
            at_vertex.add_cell(Cell::new(&format!("{}", self.next_at_vertex(e))));
        }
        table.add_row(headers);
        table.add_row(in_face);
        table.add_row(at_vertex);
        table.to_string()
    }
}

impl Display for Triangulation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(id: i64) -> HalfEdge {
        HalfEdge::new(id)
    }

    pub(crate) fn torus() -> Triangulation {
        Triangulation::from_faces(&[
            vec![h(1), h(2), h(3)],
            vec![h(-1), h(-2), h(-3)],
        ])
        .unwrap()
    }

    #[test]
    fn torus_has_one_vertex() {
        let t = torus();
        assert_eq!(t.vertices().len(), 1);
        assert_eq!(t.out_edges(t.source(h(1))).len(), 6);
        assert_eq!(t.next_at_vertex(h(1)), h(-3));
    }

    #[test]
    fn doubled_triangle_has_three_vertices() {
        let t = Triangulation::from_faces(&[
            vec![h(1), h(2), h(3)],
            vec![h(-3), h(-2), h(-1)],
        ])
        .unwrap();
        assert_eq!(t.vertices().len(), 3);
        assert_eq!(t.next_at_vertex(h(1)), h(-3));
        assert_eq!(t.out_edges(t.source(h(1))).len(), 2);
    }

    #[test]
    fn flip_updates_faces() {
        let mut t = torus();
        t.flip(h(3), &mut NoSubscriber).unwrap();
        // (1, 2, 3)(-1, -2, -3) with e = 3, i.e. (a, b, e) = (1, 2, 3) and
        // (c, d, -e) = (-1, -2, -3), becomes (1, -3, -2)(-1, 3, 2).
        assert_eq!(t.next_in_face(h(1)), h(-3));
        assert_eq!(t.next_in_face(h(-3)), h(-2));
        assert_eq!(t.next_in_face(h(-2)), h(1));
        assert_eq!(t.next_in_face(h(-1)), h(3));
        assert_eq!(t.next_in_face(h(3)), h(2));
        assert_eq!(t.next_in_face(h(2)), h(-1));
        t.check().unwrap();
        assert_eq!(t.vertices().len(), 1);
    }

    #[test]
    fn flip_and_flip_back_is_identity() {
        let original = torus();
        let mut t = original.clone();
        t.flip(h(3), &mut NoSubscriber).unwrap();
        t.flip(h(3), &mut NoSubscriber).unwrap();
        assert_eq!(t, original);
    }

    #[test]
    fn collapse_torus_leaves_collapsed_face() {
        let mut t = torus();
        let (r1, r2) = t.collapse(h(2), &mut NoSubscriber).unwrap();
        assert_eq!(t.edge_count(), 1);
        assert!(t.is_in_collapsed_face(h(1)));
        assert_eq!(t.next_in_face(h(1)), h(-1));
        assert_eq!(r1, h(-1));
        assert_eq!(r2, h(1));
        t.check().unwrap();
    }

    #[test]
    fn collapse_rejects_collapsed_faces() {
        let mut t = torus();
        t.collapse(h(2), &mut NoSubscriber).unwrap();
        assert!(t.collapse(h(1), &mut NoSubscriber).is_err());
    }

    #[test]
    fn swap_renames() {
        let mut t = torus();
        t.swap(h(1), h(2), &mut NoSubscriber);
        assert_eq!(t.next_in_face(h(2)), h(1));
        assert_eq!(t.next_in_face(h(1)), h(3));
        t.check().unwrap();
    }

    #[test]
    fn rejects_inconsistent_permutations() {
        let faces = Permutation::from_cycles(&[
            vec![h(1), h(2), h(3)],
            vec![h(-1), h(-2), h(-3)],
        ])
        .unwrap();
        let vertices = Permutation::from_cycles(&[vec![
            h(1),
            h(2),
            h(3),
            h(-1),
            h(-2),
            h(-3),
        ]])
        .unwrap();
        assert!(Triangulation::from_permutations(vertices, faces).is_err());
    }

    #[test]
    fn from_permutations_accepts_derived_pair() {
        let t = torus();
        let rebuilt = Triangulation::from_permutations(
            Permutation::from_cycles(&t.vertex_cycles()).unwrap(),
            Permutation::from_cycles(&t.face_cycles()).unwrap(),
        )
        .unwrap();
        assert_eq!(rebuilt, t);
    }
}
