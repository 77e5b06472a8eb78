//! Mesh aggregate and topology builder: derives the shared edge-midpoint
//! nodes, boundary labels, triangle adjacency and the outflow ("exit")
//! triangle list from the raw vertex/triangle/boundary-edge lists produced
//! by the parsers in `io`.

use std::collections::BTreeMap;

use tracing::info;

use crate::domain::geometry::{
    det, heron_area, BoundaryEdge, Point, Triangle, Vertex, LABEL_OUTFLOW,
};
use crate::error::TopologyError;

/// Raw parser output: coordinates, corner-index triples and boundary edges
/// (endpoint indices plus segment label), all in 0-based input numbering.
#[derive(Debug, Clone)]
pub struct RawMesh2d {
    pub vertices: Vec<Point>,
    pub triangles: Vec<[usize; 3]>,
    pub edges: Vec<(usize, usize, i32)>,
}

/// State of an undirected triangle edge while the builder walks the
/// triangle list: the midpoint dof it created and which triangles claimed
/// the edge so far.
struct EdgeSlot {
    midpoint: usize,
    owner: usize,
    shared: bool,
}

/// The enriched mesh. `vertices` holds the original corners first, then the
/// derived midpoints in creation order; `ndof` is the total P2 node count
/// (corners plus midpoints) while `nv` remains the P1/pressure node count.
/// Immutable once built.
#[derive(Debug)]
pub struct Mesh2d {
    pub nv: usize,
    pub nbt: usize,
    pub nbe: usize,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub edges: Vec<BoundaryEdge>,
    pub neighbors: Vec<Vec<usize>>,
    pub exit_triangles: Vec<usize>,
    pub ndof: usize,
}

impl Mesh2d {
    /// Runs the topology builder on a raw mesh.
    ///
    /// Boundary labels are propagated from boundary edges to their endpoint
    /// vertices and, once discovered, to the midpoint of that edge. A
    /// vertex touched by several boundary edges keeps the label of the
    /// last edge in file order (last-write-wins, see DESIGN.md).
    pub fn build(raw: RawMesh2d) -> Result<Self, TopologyError> {
        let nv = raw.vertices.len();
        let nbt = raw.triangles.len();
        let nbe = raw.edges.len();

        let mut vertices: Vec<Vertex> = raw
            .vertices
            .iter()
            .enumerate()
            .map(|(i, &p)| Vertex::new(p, i))
            .collect();

        for (k, corners) in raw.triangles.iter().enumerate() {
            for &c in corners {
                if c >= nv {
                    return Err(TopologyError::BadVertexIndex(k, c));
                }
            }
        }

        // Edge-label map keyed by the sorted endpoint pair, and endpoint
        // label propagation.
        let mut edge_labels: BTreeMap<(usize, usize), i32> = BTreeMap::new();
        for &(s1, s2, label) in &raw.edges {
            let key = if s2 > s1 { (s1, s2) } else { (s2, s1) };
            edge_labels.insert(key, label);
            vertices[s1].label = label;
            vertices[s2].label = label;
        }

        let edges: Vec<BoundaryEdge> = raw
            .edges
            .iter()
            .map(|&(s1, s2, label)| BoundaryEdge {
                v: [vertices[s1], vertices[s2]],
                label,
            })
            .collect();

        // Midpoint derivation and adjacency. The first triangle to claim an
        // undirected edge creates its midpoint; the second one reuses it
        // and the pair become neighbors. A third claim is not a planar
        // mesh.
        let mut n = nv;
        let mut slots: BTreeMap<(usize, usize), EdgeSlot> = BTreeMap::new();
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); nbt];
        let mut exit_triangles: Vec<usize> = Vec::new();
        let mut triangles: Vec<Triangle> = Vec::with_capacity(nbt);
        let mut total_area = 0.0;

        for (k, corners) in raw.triangles.iter().enumerate() {
            let v = [
                vertices[corners[0]],
                vertices[corners[1]],
                vertices[corners[2]],
            ];
            let area = heron_area(v[0].point, v[1].point, v[2].point);
            if area <= 0.0 {
                return Err(TopologyError::DegenerateTriangle(k));
            }
            total_area += area;

            let mut mid = [v[0]; 3];
            for a in 0..3 {
                // Edge opposite corner a.
                let s1 = v[(a + 1) % 3].index;
                let s2 = v[(a + 2) % 3].index;
                let key = if s2 > s1 { (s1, s2) } else { (s2, s1) };

                let p0 = vertices[key.0].point;
                let p1 = vertices[key.1].point;
                let midpoint = Point::new((p0.x + p1.x) / 2.0, (p0.y + p1.y) / 2.0);

                let mid_index = match slots.get_mut(&key) {
                    None => {
                        let index = n;
                        n += 1;
                        slots.insert(
                            key,
                            EdgeSlot {
                                midpoint: index,
                                owner: k,
                                shared: false,
                            },
                        );
                        let mut vtx = Vertex::new(midpoint, index);
                        if let Some(&label) = edge_labels.get(&key) {
                            vtx.label = label;
                        }
                        vertices.push(vtx);
                        index
                    }
                    Some(slot) => {
                        if slot.shared {
                            return Err(TopologyError::EdgeSharedByThree(key.0, key.1));
                        }
                        slot.shared = true;
                        neighbors[k].push(slot.owner);
                        neighbors[slot.owner].push(k);
                        slot.midpoint
                    }
                };

                let mut vtx = Vertex::new(midpoint, mid_index);
                if let Some(&label) = edge_labels.get(&key) {
                    vtx.label = label;
                    if label == LABEL_OUTFLOW {
                        exit_triangles.push(k);
                    }
                }
                mid[a] = vtx;
            }

            triangles.push(Triangle {
                index: k,
                v,
                mid,
                area,
            });
        }

        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }
        exit_triangles.sort_unstable();
        exit_triangles.dedup();

        info!(
            nv,
            nbt,
            nbe,
            ndof = n,
            total_area,
            "mesh topology built"
        );

        Ok(Self {
            nv,
            nbt,
            nbe,
            vertices,
            triangles,
            edges,
            neighbors,
            exit_triangles,
            ndof: n,
        })
    }

    /// Global dof number of local P2 node `i` (0..6) of triangle `k`:
    /// corners for i < 3, midpoints for 3 <= i < 6.
    pub fn global_dof(&self, k: usize, i: usize) -> usize {
        let t = &self.triangles[k];
        if i < 3 {
            t.v[i].index
        } else {
            t.mid[i - 3].index
        }
    }

    /// Boundary label of local P2 node `i` of triangle `k`.
    pub fn node_label(&self, k: usize, i: usize) -> i32 {
        let t = &self.triangles[k];
        if i < 3 {
            t.v[i].label
        } else {
            t.mid[i - 3].label
        }
    }

    /// Physical position of local P2 node `i` of triangle `k`.
    pub fn node_point(&self, k: usize, i: usize) -> Point {
        let t = &self.triangles[k];
        if i < 3 {
            t.v[i].point
        } else {
            t.mid[i - 3].point
        }
    }

    /// True when the corner ordering of every triangle is counter-clockwise
    /// (the orientation assumed by the affine-map Jacobian).
    pub fn is_positively_oriented(&self) -> bool {
        self.triangles
            .iter()
            .all(|t| det(t.corner(0), t.corner(1), t.corner(2)) > 0.0)
    }
}
