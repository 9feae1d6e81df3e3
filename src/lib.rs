//! Translation surfaces as triangulations with exact vector coordinates.
//!
//! A [`FlatTriangulation`] glues Euclidean triangles along their edges by
//! translation. On top of it this crate enumerates [saddle
//! connections](SaddleConnection) by unfolding triangles along straight
//! lines, and contracts all edges parallel to a chosen vertical direction
//! into a [`CollapsedTriangulation`] that remembers the contracted
//! connections through later flips and collapses.

#![allow(clippy::many_single_char_names)]

pub mod chain;
pub mod collapsed;
pub mod combinatorial;
pub mod connections;
pub mod developing;
pub mod error;
pub mod flat;
pub mod flow;
pub mod half_edge;
pub mod permutation;
pub mod saddle_connection;
pub mod tracking;
pub mod vector;
pub mod vertical;

pub use chain::Chain;
pub use collapsed::CollapsedTriangulation;
pub use combinatorial::{NoSubscriber, Subscriber, Triangulation, Vertex};
pub use connections::{SaddleConnections, SaddleConnectionsByLength};
pub use developing::{follow_direction, Bound, DevelopingMap};
pub use error::{Error, Result};
pub use flat::FlatTriangulation;
pub use flow::{ContourConnection, FlowComponent, FlowDecomposition};
pub use half_edge::{Edge, HalfEdge};
pub use permutation::Permutation;
pub use saddle_connection::SaddleConnection;
pub use tracking::{EdgeMap, HalfEdgeMap};
pub use vector::{Ccw, CompareSlope, Orientation, Ring, Vector};
pub use vertical::Vertical;
