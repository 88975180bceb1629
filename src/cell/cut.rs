use super::{dot, link_faces, norm, Cell, CutScratch, FaceSet};
use crate::error::VoroError;

const IN: i8 = -1;
const ON: i8 = 0;
const OUT: i8 = 1;

impl Cell {
    /// Cuts the cell by the plane `x . normal = rsq / 2`, keeping the side that
    /// contains `x . normal < rsq / 2`.
    ///
    /// For a neighbor at relative position `d` the bisector is obtained with
    /// `normal = d` and `rsq = |d|^2`; the power diagram adds `r_i^2 - r_j^2`
    /// to `rsq`.
    ///
    /// Returns `Ok(true)` if the cell still exists (whether or not the plane
    /// touched it) and `Ok(false)` if the cut removed it entirely. Removing a
    /// cell whose generator lies strictly inside the kept half-space is an
    /// internal inconsistency and yields [`VoroError::EmptiedCell`].
    pub fn cut(&mut self, normal: [f64; 3], rsq: f64, id: i32) -> Result<bool, VoroError> {
        if self.is_empty() {
            return Ok(false);
        }
        let len = norm(normal);
        if !(len > 0.0 && len.is_finite() && rsq.is_finite()) {
            return Ok(true);
        }
        let n = [normal[0] / len, normal[1] / len, normal[2] / len];
        let offset = rsq / (2.0 * len);
        let tol = self.tol;

        let mut scratch = std::mem::take(&mut self.scratch);
        let outcome = self.cut_with(&mut scratch, n, offset, tol, id);
        self.scratch = scratch;
        outcome
    }

    /// Cuts by the perpendicular bisector between the generator and a
    /// neighbor at relative position `delta`.
    pub fn cut_bisector(&mut self, delta: [f64; 3], id: i32) -> Result<bool, VoroError> {
        self.cut(delta, dot(delta, delta), id)
    }

    /// Cuts by the plane through `point` (relative to the generator) whose
    /// `normal` points out of the region to keep.
    pub fn cut_through(&mut self, point: [f64; 3], normal: [f64; 3], id: i32) -> Result<bool, VoroError> {
        self.cut(normal, 2.0 * dot(point, normal), id)
    }

    /// Returns whether cutting by `(normal, rsq)` would change the cell.
    pub fn plane_intersects(&self, normal: [f64; 3], rsq: f64) -> bool {
        let len = norm(normal);
        if self.is_empty() || !(len > 0.0) {
            return false;
        }
        let n = [normal[0] / len, normal[1] / len, normal[2] / len];
        let offset = rsq / (2.0 * len);
        self.pts.iter().any(|p| dot(n, *p) - offset > self.tol)
    }

    fn cut_with(
        &mut self,
        s: &mut CutScratch,
        n: [f64; 3],
        offset: f64,
        tol: f64,
        id: i32,
    ) -> Result<bool, VoroError> {
        // Classify every vertex against the plane; vertices within tolerance
        // count as lying on it and are kept without creating new vertices.
        let count = self.pts.len();
        s.u.clear();
        s.state.clear();
        let (mut n_in, mut n_out) = (0usize, 0usize);
        for p in &self.pts {
            let u = dot(n, *p) - offset;
            let state = if u > tol {
                n_out += 1;
                OUT
            } else if u < -tol {
                n_in += 1;
                IN
            } else {
                ON
            };
            s.u.push(u);
            s.state.push(state);
        }
        if n_out == 0 {
            return Ok(true);
        }
        if n_in == 0 {
            if self.holds_origin && offset > tol {
                log::error!(
                    "cut by {} at offset {:e} emptied a cell holding its generator ({} vertices)",
                    id, offset, count
                );
                return Err(VoroError::EmptiedCell { id, offset });
            }
            self.clear();
            return Ok(false);
        }

        self.trace_faces(&mut s.visited, &mut s.offsets, &mut s.faces, None);

        s.clipped.clear();
        s.new_pts.clear();
        s.edge_keys.clear();
        s.cap.clear();
        for f in 0..s.faces.len() {
            let (start, len, face_id) = s.faces.spans[f];
            if !self.clip_face(s, start, len, face_id, count, tol) {
                log::warn!("abandoning irregular cut by {}: face {} crosses the plane twice", id, face_id);
                return Ok(true);
            }
        }

        if !close_cap(s, id) {
            log::warn!("abandoning degenerate cut by {}: cap of {} edges is not a single loop", id, s.cap.len());
            return Ok(true);
        }
        drop_order_two_vertices(s, count);

        // Compact the surviving vertices: old indices first, then new ones.
        let total = count + s.new_pts.len();
        s.remap.clear();
        s.remap.resize(total, u32::MAX);
        s.pts.clear();
        for &v in &s.clipped.verts {
            let v = v as usize;
            if s.remap[v] == u32::MAX {
                s.remap[v] = s.pts.len() as u32;
                s.pts.push(if v < count { self.pts[v] } else { s.new_pts[v - count] });
            }
        }
        for v in s.clipped.verts.iter_mut() {
            *v = s.remap[*v as usize];
        }
        if s.pts.len() < 4 || s.clipped.len() < 4 {
            log::warn!("abandoning degenerate cut by {}: {} vertices survive", id, s.pts.len());
            return Ok(true);
        }

        let track = self.tracks_neighbors();
        if let Err(reason) = link_faces(s.pts.len(), &s.clipped, track, &mut s.ed, &mut s.ne, &mut s.pairs) {
            log::warn!("abandoning cut by {}: {}", id, reason);
            return Ok(true);
        }

        std::mem::swap(&mut self.pts, &mut s.pts);
        std::mem::swap(&mut self.ed, &mut s.ed);
        std::mem::swap(&mut self.ne, &mut s.ne);
        self.max_rsq = self.pts.iter().map(|p| dot(*p, *p)).fold(0.0, f64::max);
        if offset <= tol {
            self.holds_origin = false;
        }
        Ok(true)
    }

    /// Clips one face polygon against the plane, in the manner of
    /// Sutherland-Hodgman. Indices `>= count` address new intersection points.
    ///
    /// The clipped polygon runs from its exit point straight to its entry
    /// point along the plane, so the cap face receives the reversed edge
    /// `entry -> exit`. Returns false if the face crosses the plane more than
    /// once, which only happens when tolerance classification is inconsistent.
    fn clip_face(&self, s: &mut CutScratch, start: usize, len: usize, face_id: i32, count: usize, tol: f64) -> bool {
        let out_start = s.clipped.verts.len();
        let mut exit = None;
        let mut entry = None;
        for k in 0..len {
            let p = s.faces.verts[start + k];
            let q = s.faces.verts[start + (k + 1) % len];
            let (sp, sq) = (s.state[p as usize], s.state[q as usize]);
            if sp != OUT {
                s.clipped.verts.push(p);
            }
            if sp != OUT && sq == OUT {
                let x = if sp == ON { p } else { self.intersect(s, p, q, count, tol) };
                if sp == IN {
                    s.clipped.verts.push(x);
                }
                if exit.replace(x).is_some() {
                    return false;
                }
            } else if sp == OUT && sq != OUT {
                let e = if sq == ON { q } else { self.intersect(s, p, q, count, tol) };
                if sq == IN {
                    s.clipped.verts.push(e);
                }
                if entry.replace(e).is_some() {
                    return false;
                }
            }
        }
        if let (Some(x), Some(e)) = (exit, entry) {
            if x != e {
                s.cap.push((e, x));
            }
        }

        // Collapse repeated indices, including across the wrap-around.
        let mut w = out_start;
        for r in out_start..s.clipped.verts.len() {
            let v = s.clipped.verts[r];
            if w > out_start && s.clipped.verts[w - 1] == v {
                continue;
            }
            s.clipped.verts[w] = v;
            w += 1;
        }
        while w - out_start > 1 && s.clipped.verts[w - 1] == s.clipped.verts[out_start] {
            w -= 1;
        }
        s.clipped.verts.truncate(w);
        if w - out_start >= 3 {
            s.clipped.spans.push((out_start, w - out_start, face_id));
        } else {
            s.clipped.verts.truncate(out_start);
        }
        true
    }

    /// Returns the index of the point where the plane crosses the edge `p-q`,
    /// creating it on first use. Both endpoints are strictly off the plane.
    fn intersect(&self, s: &mut CutScratch, p: u32, q: u32, count: usize, tol: f64) -> u32 {
        let (lo, hi) = if p < q { (p, q) } else { (q, p) };
        if let Some(&(_, _, v)) = s.edge_keys.iter().find(|k| k.0 == lo && k.1 == hi) {
            return v;
        }
        let (a, b) = (self.pts[lo as usize], self.pts[hi as usize]);
        let (ua, ub) = (s.u[lo as usize], s.u[hi as usize]);
        let t = ua / (ua - ub);
        let x = [
            a[0] + t * (b[0] - a[0]),
            a[1] + t * (b[1] - a[1]),
            a[2] + t * (b[2] - a[2]),
        ];
        let tol_sq = tol * tol;
        let merged = s.new_pts.iter().position(|y| {
            let d = [x[0] - y[0], x[1] - y[1], x[2] - y[2]];
            dot(d, d) <= tol_sq
        });
        let v = match merged {
            Some(i) => (count + i) as u32,
            None => {
                s.new_pts.push(x);
                (count + s.new_pts.len() - 1) as u32
            }
        };
        s.edge_keys.push((lo, hi, v));
        v
    }
}

/// Chains the recorded `entry -> exit` edges into the cap polygon.
fn close_cap(s: &mut CutScratch, id: i32) -> bool {
    if s.cap.len() < 3 {
        return false;
    }
    let first = s.cap[0].0;
    let start = s.clipped.verts.len();
    let mut cur = first;
    loop {
        let mut next = s.cap.iter().filter(|c| c.0 == cur);
        let (Some(&(_, to)), None) = (next.next(), next.next()) else {
            s.clipped.verts.truncate(start);
            return false;
        };
        s.clipped.verts.push(cur);
        cur = to;
        if cur == first {
            break;
        }
        if s.clipped.verts.len() - start > s.cap.len() {
            s.clipped.verts.truncate(start);
            return false;
        }
    }
    let len = s.clipped.verts.len() - start;
    if len != s.cap.len() {
        s.clipped.verts.truncate(start);
        return false;
    }
    s.clipped.spans.push((start, len, id));
    true
}

/// Removes vertices shared by fewer than three faces. They sit in the middle
/// of a straight edge after a face was clipped away next to them.
fn drop_order_two_vertices(s: &mut CutScratch, count: usize) {
    let total = count + s.new_pts.len();
    loop {
        s.counts.clear();
        s.counts.resize(total, 0);
        for &v in &s.clipped.verts {
            s.counts[v as usize] += 1;
        }
        if !s.clipped.verts.iter().any(|&v| s.counts[v as usize] < 3) {
            return;
        }
        let mut rebuilt = FaceSet::default();
        std::mem::swap(&mut rebuilt, &mut s.clipped);
        for (verts, face_id) in rebuilt.iter() {
            let start = s.clipped.verts.len();
            s.clipped
                .verts
                .extend(verts.iter().copied().filter(|&v| s.counts[v as usize] >= 3));
            let len = s.clipped.verts.len() - start;
            if len >= 3 {
                s.clipped.spans.push((start, len, face_id));
            } else {
                s.clipped.verts.truncate(start);
            }
        }
        rebuilt.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> Cell {
        let mut cell = Cell::new(true);
        cell.init_box([-0.5; 3], [0.5; 3]).unwrap();
        cell
    }

    #[test]
    fn test_cut_halves_cube() {
        let mut cell = unit_cube();
        assert!(cell.cut([0.0, 0.0, 1.0], 0.0, 7).unwrap());
        assert!((cell.volume() - 0.5).abs() < 1e-12);
        assert_eq!(cell.number_of_faces(), 6);
        assert!(cell.neighbors().contains(&7));
        assert!(!cell.neighbors().contains(&crate::bounds::BOX_ID_TOP));
    }

    #[test]
    fn test_cut_outside_is_noop() {
        let mut cell = unit_cube();
        let before = cell.vertices();
        assert!(cell.cut_bisector([3.0, 0.0, 0.0], 1).unwrap());
        assert_eq!(cell.vertices(), before);
        assert!(!cell.plane_intersects([3.0, 0.0, 0.0], 9.0));
    }

    #[test]
    fn test_cut_off_corner() {
        let mut cell = unit_cube();
        // Plane x + y + z = 1 removes the corner (0.5, 0.5, 0.5).
        assert!(cell.cut([1.0, 1.0, 1.0], 2.0, 3).unwrap());
        assert_eq!(cell.number_of_vertices(), 10);
        assert_eq!(cell.number_of_faces(), 7);
        let removed = (0.5f64).powi(3) / 6.0;
        assert!((cell.volume() - (1.0 - removed)).abs() < 1e-12);
    }

    #[test]
    fn test_cut_through_vertices_merges() {
        let mut cell = unit_cube();
        // The plane x + y = 0 passes exactly through four cube vertices.
        assert!(cell.cut([1.0, 1.0, 0.0], 0.0, 4).unwrap());
        assert_eq!(cell.number_of_vertices(), 6);
        assert_eq!(cell.number_of_faces(), 5);
        assert!((cell.volume() - 0.5).abs() < 1e-12);
        // Repeating the same cut changes nothing.
        assert!(cell.cut([1.0, 1.0, 0.0], 0.0, 4).unwrap());
        assert_eq!(cell.number_of_vertices(), 6);
    }

    #[test]
    fn test_cut_removing_everything() {
        let mut cell = unit_cube();
        // A wall plane that excludes the whole cell is a legal deletion.
        assert!(!cell.cut([1.0, 0.0, 0.0], -2.0, -1000).unwrap());
        assert!(cell.is_empty());
        assert!(!cell.cut([1.0, 0.0, 0.0], 1.0, 1).unwrap());
    }

    #[test]
    fn test_emptying_interior_cell_is_error() {
        let mut cell = Cell::new(true);
        cell.init_box([1.0; 3], [2.0; 3]).unwrap();
        assert!(!cell.holds_origin);
        // Pretend the generator were inside: the bisector x = 0.5 keeps the
        // generator but removes every vertex, which must be reported.
        cell.holds_origin = true;
        assert!(matches!(
            cell.cut([1.0, 0.0, 0.0], 1.0, 9),
            Err(VoroError::EmptiedCell { id: 9, .. })
        ));
    }

    #[test]
    fn test_copies_cut_independently() {
        let mut original = unit_cube();
        original.cut_through([0.3, 0.3, 0.3], [1.0, 1.0, 1.0], 4).unwrap();
        let volume = original.volume();
        let vertices = original.vertices();

        let point = [0.1, -0.05, 0.0];
        let normal = [1.0, 2.0, 0.5];
        let mut below = original.clone();
        let mut above = Cell::new(true);
        above.copy_from(&original);
        assert!(below.cut_through(point, normal, 5).unwrap());
        assert!(above.cut_through(point, [-normal[0], -normal[1], -normal[2]], 6).unwrap());

        assert!(below.volume() > 0.0 && above.volume() > 0.0);
        assert!((below.volume() + above.volume() - volume).abs() < 1e-12);
        assert!(below.neighbors().contains(&5) && !below.neighbors().contains(&6));
        assert!(above.neighbors().contains(&6) && !above.neighbors().contains(&5));
        assert_eq!(original.vertices(), vertices);
        assert_eq!(original.volume(), volume);
    }

    #[test]
    fn test_max_radius_shrinks() {
        let mut cell = unit_cube();
        let r0 = cell.max_radius_squared();
        cell.cut_bisector([0.6, 0.0, 0.0], 2).unwrap();
        assert!(cell.max_radius_squared() < r0 + 1e-15);
        for p in cell.vertices() {
            assert!(p[0] <= 0.3 + 1e-12);
        }
    }
}
