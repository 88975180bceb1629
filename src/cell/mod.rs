//! The convex polyhedron of a single generator.
//!
//! A [`Cell`] is stored as a planar adjacency graph: every vertex keeps its
//! edge-adjacent vertices in counter-clockwise order as seen from outside the
//! polyhedron. Faces are never stored explicitly, they are traced on demand by
//! walking the graph: arriving at vertex `b` along the edge `a -> b`, the next
//! vertex of the same face is the neighbor of `b` listed just before `a`.
//!
//! When neighbor tracking is enabled a parallel channel stores, for the edge
//! `v -> ed[v][j]`, the id of the face lying between the neighbors `j` and
//! `j + 1`. That is the id of the particle, wall or box side whose half-space
//! produced the face.

mod cut;
mod measure;

use crate::bounds::box_side;
use crate::error::VoroError;
use smallvec::SmallVec;

/// Default relative tolerance, scaled by the size of the initial shape.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

pub(crate) type EdgeList = SmallVec<[u32; 8]>;
pub(crate) type FaceIdList = SmallVec<[i32; 8]>;

/// A flat list of face polygons: `spans` holds `(start, len, id)` into `verts`.
#[derive(Clone, Debug, Default)]
pub(crate) struct FaceSet {
    pub verts: Vec<u32>,
    pub spans: Vec<(usize, usize, i32)>,
}

impl FaceSet {
    pub fn clear(&mut self) {
        self.verts.clear();
        self.spans.clear();
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn face(&self, f: usize) -> (&[u32], i32) {
        let (start, len, id) = self.spans[f];
        (&self.verts[start..start + len], id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u32], i32)> + '_ {
        (0..self.spans.len()).map(move |f| self.face(f))
    }
}

/// Buffers reused by [`Cell::cut`] so that cutting does not allocate once warm.
#[derive(Clone, Debug, Default)]
pub(crate) struct CutScratch {
    pub u: Vec<f64>,
    pub state: Vec<i8>,
    pub visited: Vec<bool>,
    pub offsets: Vec<usize>,
    pub faces: FaceSet,
    pub clipped: FaceSet,
    pub new_pts: Vec<[f64; 3]>,
    pub edge_keys: Vec<(u32, u32, u32)>,
    pub cap: Vec<(u32, u32)>,
    pub counts: Vec<u32>,
    pub remap: Vec<u32>,
    pub pairs: Vec<SmallVec<[(u32, u32, i32); 8]>>,
    pub pts: Vec<[f64; 3]>,
    pub ed: Vec<EdgeList>,
    pub ne: Vec<FaceIdList>,
}

/// A convex polyhedron with coordinates relative to its generator.
///
/// A cell is a scratch object: it is reset to an initial shape, clipped by a
/// sequence of half-spaces, read out, and then reused for the next generator.
#[derive(Clone, Debug)]
pub struct Cell {
    pub(crate) pts: Vec<[f64; 3]>,
    pub(crate) ed: Vec<EdgeList>,
    pub(crate) ne: Vec<FaceIdList>,
    track_neighbors: bool,
    tolerance: f64,
    tol: f64,
    max_rsq: f64,
    holds_origin: bool,
    scratch: CutScratch,
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Cell {
    /// Creates an empty cell. Call one of the `init_*` methods before cutting.
    pub fn new(track_neighbors: bool) -> Self {
        Self {
            pts: Vec::new(),
            ed: Vec::new(),
            ne: Vec::new(),
            track_neighbors,
            tolerance: DEFAULT_TOLERANCE,
            tol: 0.0,
            max_rsq: 0.0,
            holds_origin: false,
            scratch: CutScratch::default(),
        }
    }

    /// Sets the relative tolerance used to merge vertices lying on a cutting plane.
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
        self.tol = tolerance * self.max_rsq.sqrt();
    }

    pub fn tracks_neighbors(&self) -> bool {
        self.track_neighbors
    }

    pub fn is_empty(&self) -> bool {
        self.pts.is_empty()
    }

    /// Squared distance from the generator to the farthest vertex.
    pub fn max_radius_squared(&self) -> f64 {
        self.max_rsq
    }

    pub(crate) fn clear(&mut self) {
        self.pts.clear();
        self.ed.clear();
        self.ne.clear();
        self.max_rsq = 0.0;
        self.holds_origin = false;
    }

    /// Makes this cell a copy of `other`, reusing the existing allocations.
    pub fn copy_from(&mut self, other: &Cell) {
        self.pts.clone_from(&other.pts);
        self.ed.clone_from(&other.ed);
        self.ne.clone_from(&other.ne);
        self.track_neighbors = other.track_neighbors;
        self.tolerance = other.tolerance;
        self.tol = other.tol;
        self.max_rsq = other.max_rsq;
        self.holds_origin = other.holds_origin;
    }

    /// Rewrites the id `from` to `to` on every face.
    pub(crate) fn relabel_faces(&mut self, from: i32, to: i32) {
        for id in self.ne.iter_mut().flat_map(|ids| ids.iter_mut()) {
            if *id == from {
                *id = to;
            }
        }
    }

    pub(crate) fn face_id(&self, v: usize, j: usize) -> i32 {
        if self.track_neighbors { self.ne[v][j] } else { 0 }
    }

    /// Resets the cell to the axis-aligned box `[min, max]`, in coordinates
    /// relative to the generator. Faces carry the box side ids.
    ///
    /// Fails with [`VoroError::DegenerateBounds`] if any axis has zero,
    /// negative or non-finite extent; the cell is then left empty.
    pub fn init_box(&mut self, min: [f64; 3], max: [f64; 3]) -> Result<(), VoroError> {
        for axis in 0..3 {
            if !(min[axis] < max[axis] && min[axis].is_finite() && max[axis].is_finite()) {
                self.clear();
                return Err(VoroError::DegenerateBounds { axis, min: min[axis], max: max[axis] });
            }
        }
        let mut pts = std::mem::take(&mut self.scratch.pts);
        pts.clear();
        for i in 0..8 {
            pts.push([
                if i & 1 == 0 { min[0] } else { max[0] },
                if i & 2 == 0 { min[1] } else { max[1] },
                if i & 4 == 0 { min[2] } else { max[2] },
            ]);
        }
        let mut faces = std::mem::take(&mut self.scratch.faces);
        faces.clear();
        let sides: [([u32; 4], i32); 6] = [
            ([0, 4, 6, 2], box_side(0, false)),
            ([1, 3, 7, 5], box_side(0, true)),
            ([0, 1, 5, 4], box_side(1, false)),
            ([2, 6, 7, 3], box_side(1, true)),
            ([0, 2, 3, 1], box_side(2, false)),
            ([4, 5, 7, 6], box_side(2, true)),
        ];
        for (quad, id) in sides {
            faces.spans.push((faces.verts.len(), 4, id));
            faces.verts.extend_from_slice(&quad);
        }
        let holds_origin = (0..3).all(|a| min[a] <= 0.0 && max[a] >= 0.0);
        let linked = self.install(pts, &faces, holds_origin);
        self.scratch.faces = faces;
        linked.map_err(|reason| VoroError::Topology { id: box_side(0, false), reason })
    }

    /// Resets the cell to the regular octahedron with vertices at `(+-l, 0, 0)`,
    /// `(0, +-l, 0)` and `(0, 0, +-l)`. Every face carries `id`.
    pub fn init_octahedron(&mut self, l: f64, id: i32) -> Result<(), VoroError> {
        let vertices = [
            [l, 0.0, 0.0],
            [-l, 0.0, 0.0],
            [0.0, l, 0.0],
            [0.0, -l, 0.0],
            [0.0, 0.0, l],
            [0.0, 0.0, -l],
        ];
        let mut faces = Vec::with_capacity(8);
        for x in [0usize, 1] {
            for y in [2usize, 3] {
                for z in [4usize, 5] {
                    faces.push(vec![x, y, z]);
                }
            }
        }
        self.init_polyhedron(&vertices, &faces, id)
    }

    /// Resets the cell to the tetrahedron spanned by four points.
    pub fn init_tetrahedron(&mut self, p: [[f64; 3]; 4], id: i32) -> Result<(), VoroError> {
        let faces = vec![vec![1, 2, 3], vec![0, 3, 2], vec![0, 1, 3], vec![0, 2, 1]];
        self.init_polyhedron(&p, &faces, id)
    }

    /// Resets the cell to an arbitrary convex polyhedron.
    ///
    /// # Arguments
    ///
    /// * `vertices` - Vertex positions relative to the generator.
    /// * `faces` - Vertex index loops, one per face. Winding is corrected to
    ///             face outwards, so either orientation is accepted.
    /// * `id` - Face id reported for every face of the shape.
    pub fn init_polyhedron(
        &mut self,
        vertices: &[[f64; 3]],
        faces: &[Vec<usize>],
        id: i32,
    ) -> Result<(), VoroError> {
        let reject = |reason| VoroError::Topology { id, reason };
        if vertices.len() < 4 || faces.len() < 4 {
            return Err(reject("a polyhedron needs at least four vertices and faces"));
        }
        let inv = 1.0 / vertices.len() as f64;
        let mut inside = [0.0; 3];
        for p in vertices {
            for a in 0..3 {
                inside[a] += p[a] * inv;
            }
        }

        let mut set = FaceSet::default();
        let mut holds_origin = true;
        for face in faces {
            if face.len() < 3 || face.iter().any(|&v| v >= vertices.len()) {
                return Err(reject("face with fewer than three valid vertices"));
            }
            let mut loop_: Vec<u32> = face.iter().map(|&v| v as u32).collect();
            let n = newell_normal(vertices, &loop_);
            let p0 = vertices[face[0]];
            let side = dot(n, sub(p0, inside));
            if side == 0.0 {
                return Err(reject("degenerate face"));
            }
            if side < 0.0 {
                loop_.reverse();
            }
            if dot(n, p0) * side.signum() < 0.0 {
                holds_origin = false;
            }
            set.spans.push((set.verts.len(), loop_.len(), id));
            set.verts.extend_from_slice(&loop_);
        }
        self.install(vertices.to_vec(), &set, holds_origin)
            .map_err(reject)
    }

    /// Replaces the vertex graph by the one described by `faces`.
    /// On failure the cell is left untouched.
    fn install(&mut self, pts: Vec<[f64; 3]>, faces: &FaceSet, holds_origin: bool) -> Result<(), &'static str> {
        let mut ed = std::mem::take(&mut self.scratch.ed);
        let mut ne = std::mem::take(&mut self.scratch.ne);
        let result = link_faces(
            pts.len(),
            faces,
            self.track_neighbors,
            &mut ed,
            &mut ne,
            &mut self.scratch.pairs,
        );
        if result.is_err() {
            self.scratch.ed = ed;
            self.scratch.ne = ne;
            self.scratch.pts = pts;
            return result;
        }
        self.scratch.pts = std::mem::replace(&mut self.pts, pts);
        self.scratch.ed = std::mem::replace(&mut self.ed, ed);
        self.scratch.ne = std::mem::replace(&mut self.ne, ne);
        self.max_rsq = self.pts.iter().map(|p| dot(*p, *p)).fold(0.0, f64::max);
        self.tol = self.tolerance * self.max_rsq.sqrt();
        self.holds_origin = holds_origin;
        Ok(())
    }

    /// Traces every face of the cell into `out`.
    ///
    /// If `edge_face` is given it receives, for each directed edge in the
    /// order of `offsets`, the index of the face it belongs to.
    pub(crate) fn trace_faces(
        &self,
        visited: &mut Vec<bool>,
        offsets: &mut Vec<usize>,
        out: &mut FaceSet,
        mut edge_face: Option<&mut Vec<usize>>,
    ) {
        out.clear();
        offsets.clear();
        let mut total = 0;
        for list in &self.ed {
            offsets.push(total);
            total += list.len();
        }
        visited.clear();
        visited.resize(total, false);
        if let Some(ef) = edge_face.as_deref_mut() {
            ef.clear();
            ef.resize(total, usize::MAX);
        }

        for v in 0..self.ed.len() {
            for j in 0..self.ed[v].len() {
                if visited[offsets[v] + j] {
                    continue;
                }
                let start = out.verts.len();
                let face = out.spans.len();
                let id = self.face_id(v, j);
                let (mut cur, mut k) = (v, j);
                loop {
                    let slot = offsets[cur] + k;
                    visited[slot] = true;
                    if let Some(ef) = edge_face.as_deref_mut() {
                        ef[slot] = face;
                    }
                    out.verts.push(cur as u32);
                    let next = self.ed[cur][k] as usize;
                    let back = match self.ed[next].iter().position(|&w| w as usize == cur) {
                        Some(b) => b,
                        None => break,
                    };
                    k = if back == 0 { self.ed[next].len() - 1 } else { back - 1 };
                    cur = next;
                    if (cur == v && k == j) || out.verts.len() - start > total {
                        break;
                    }
                }
                out.spans.push((start, out.verts.len() - start, id));
            }
        }
    }

    /// Traces the faces into a freshly allocated set.
    pub(crate) fn faces(&self) -> FaceSet {
        let mut out = FaceSet::default();
        self.trace_faces(&mut Vec::new(), &mut Vec::new(), &mut out, None);
        out
    }
}

/// Builds the adjacency graph of `n` vertices from counter-clockwise face loops.
///
/// For each face corner `a -> v -> b`, the edge `v -> b` belongs to the face and
/// `b` directly precedes `a` in the neighbor list of `v`.
pub(crate) fn link_faces(
    n: usize,
    faces: &FaceSet,
    track: bool,
    ed: &mut Vec<EdgeList>,
    ne: &mut Vec<FaceIdList>,
    pairs: &mut Vec<SmallVec<[(u32, u32, i32); 8]>>,
) -> Result<(), &'static str> {
    if pairs.len() < n {
        pairs.resize(n, SmallVec::new());
    }
    for p in pairs.iter_mut().take(n) {
        p.clear();
    }
    for (verts, id) in faces.iter() {
        let len = verts.len();
        for k in 0..len {
            let a = verts[(k + len - 1) % len];
            let v = verts[k] as usize;
            let b = verts[(k + 1) % len];
            if v >= n {
                return Err("face refers to a missing vertex");
            }
            pairs[v].push((b, a, id));
        }
    }

    ed.resize(n, SmallVec::new());
    if track {
        ne.resize(n, SmallVec::new());
    } else {
        ne.clear();
    }
    for v in 0..n {
        let fan = &pairs[v];
        ed[v].clear();
        if track {
            ne[v].clear();
        }
        if fan.len() < 3 {
            return Err("vertex of order below three");
        }
        let first = fan[0].0;
        let mut cur = first;
        loop {
            let Some(&(b, a, id)) = fan.iter().find(|e| e.0 == cur) else {
                return Err("open vertex fan");
            };
            ed[v].push(b);
            if track {
                ne[v].push(id);
            }
            cur = a;
            if cur == first {
                break;
            }
            if ed[v].len() > fan.len() {
                return Err("vertex fan does not close");
            }
        }
        if ed[v].len() != fan.len() {
            return Err("vertex fan splits into several cycles");
        }
    }
    Ok(())
}

#[inline]
pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Area-weighted normal of a polygon (twice the vector area).
pub(crate) fn newell_normal(pts: &[[f64; 3]], face: &[u32]) -> [f64; 3] {
    let mut n = [0.0; 3];
    let len = face.len();
    for k in 0..len {
        let p = pts[face[k] as usize];
        let q = pts[face[(k + 1) % len] as usize];
        n[0] += (p[1] - q[1]) * (p[2] + q[2]);
        n[1] += (p[2] - q[2]) * (p[0] + q[0]);
        n[2] += (p[0] - q[0]) * (p[1] + q[1]);
    }
    n
}
