use super::{cross, dot, newell_normal, norm, sub, Cell, FaceSet};
use std::f64::consts::PI;

impl Cell {
    pub fn number_of_vertices(&self) -> usize {
        self.pts.len()
    }

    pub fn number_of_edges(&self) -> usize {
        self.ed.iter().map(|e| e.len()).sum::<usize>() / 2
    }

    pub fn number_of_faces(&self) -> usize {
        // Euler's formula for a closed convex polyhedron.
        if self.is_empty() {
            return 0;
        }
        2 + self.number_of_edges() - self.number_of_vertices()
    }

    /// Vertex positions relative to the generator.
    pub fn vertices(&self) -> Vec<[f64; 3]> {
        self.pts.clone()
    }

    /// Vertex positions in absolute coordinates, given the generator position.
    pub fn vertices_at(&self, origin: [f64; 3]) -> Vec<[f64; 3]> {
        self.pts
            .iter()
            .map(|p| [p[0] + origin[0], p[1] + origin[1], p[2] + origin[2]])
            .collect()
    }

    /// The number of edges meeting at each vertex.
    pub fn vertex_orders(&self) -> Vec<usize> {
        self.ed.iter().map(|e| e.len()).collect()
    }

    /// Vertex index loops of every face, counter-clockwise seen from outside.
    pub fn face_vertices(&self) -> Vec<Vec<usize>> {
        self.faces()
            .iter()
            .map(|(f, _)| f.iter().map(|&v| v as usize).collect())
            .collect()
    }

    pub fn face_orders(&self) -> Vec<usize> {
        self.faces().iter().map(|(f, _)| f.len()).collect()
    }

    /// Histogram of face orders: entry `k` counts the faces with `k` edges.
    pub fn face_freq_table(&self) -> Vec<usize> {
        let mut table = Vec::new();
        for (f, _) in self.faces().iter() {
            if table.len() <= f.len() {
                table.resize(f.len() + 1, 0);
            }
            table[f.len()] += 1;
        }
        table
    }

    /// The id of the particle, wall or box side behind every face, in the
    /// same order as the other per-face readouts. Empty when the cell does
    /// not track neighbors.
    pub fn neighbors(&self) -> Vec<i32> {
        if !self.tracks_neighbors() {
            return Vec::new();
        }
        self.faces().iter().map(|(_, id)| id).collect()
    }

    pub fn face_areas(&self) -> Vec<f64> {
        self.faces()
            .iter()
            .map(|(f, _)| 0.5 * norm(newell_normal(&self.pts, f)))
            .collect()
    }

    pub fn surface_area(&self) -> f64 {
        self.face_areas().iter().sum()
    }

    /// Outward unit normals of every face.
    pub fn normals(&self) -> Vec<[f64; 3]> {
        self.faces().iter().map(|(f, _)| unit(newell_normal(&self.pts, f))).collect()
    }

    pub fn face_perimeters(&self) -> Vec<f64> {
        self.faces()
            .iter()
            .map(|(f, _)| {
                (0..f.len())
                    .map(|k| {
                        let p = self.pts[f[k] as usize];
                        let q = self.pts[f[(k + 1) % f.len()] as usize];
                        norm(sub(q, p))
                    })
                    .sum()
            })
            .collect()
    }

    /// Sum of the lengths of all edges.
    pub fn total_edge_distance(&self) -> f64 {
        let mut total = 0.0;
        for (v, list) in self.ed.iter().enumerate() {
            for &b in list {
                if (b as usize) > v {
                    total += norm(sub(self.pts[b as usize], self.pts[v]));
                }
            }
        }
        total
    }

    pub fn volume(&self) -> f64 {
        let faces = self.faces();
        let mut vol = 0.0;
        for_each_triangle(&self.pts, &faces, |a, b, c| {
            vol += dot(a, cross(b, c));
        });
        vol / 6.0
    }

    /// Centroid relative to the generator.
    pub fn centroid(&self) -> [f64; 3] {
        let faces = self.faces();
        let mut vol = 0.0;
        let mut sum = [0.0; 3];
        for_each_triangle(&self.pts, &faces, |a, b, c| {
            let det = dot(a, cross(b, c));
            vol += det;
            for k in 0..3 {
                sum[k] += det * (a[k] + b[k] + c[k]);
            }
        });
        if vol.abs() < f64::MIN_POSITIVE {
            return [0.0; 3];
        }
        let f = 1.0 / (4.0 * vol);
        [sum[0] * f, sum[1] * f, sum[2] * f]
    }

    /// Solid angle subtended by every face at the generator.
    pub fn solid_angles(&self) -> Vec<f64> {
        let faces = self.faces();
        let mut angles = Vec::with_capacity(faces.len());
        for (f, _) in faces.iter() {
            let a = self.pts[f[0] as usize];
            let mut omega = 0.0;
            for k in 1..f.len() - 1 {
                let b = self.pts[f[k] as usize];
                let c = self.pts[f[k + 1] as usize];
                let (la, lb, lc) = (norm(a), norm(b), norm(c));
                let numer = dot(a, cross(b, c));
                let denom = la * lb * lc + dot(a, b) * lc + dot(a, c) * lb + dot(b, c) * la;
                omega += 2.0 * numer.atan2(denom);
            }
            angles.push(omega);
        }
        angles
    }

    /// Volume and surface area of the cell dilated by a ball of radius `r`.
    ///
    /// Uses the Steiner polynomial of a convex body,
    /// `V(r) = V + S r + M r^2 + 4/3 pi r^3`, where `M` sums every edge
    /// length times half its exterior dihedral angle. The area is `dV/dr`.
    pub fn minkowski(&self, r: f64) -> (f64, f64) {
        if self.is_empty() {
            return (0.0, 0.0);
        }
        let mut faces = FaceSet::default();
        let mut offsets = Vec::new();
        let mut edge_face = Vec::new();
        self.trace_faces(&mut Vec::new(), &mut offsets, &mut faces, Some(&mut edge_face));

        let normals: Vec<[f64; 3]> = faces.iter().map(|(f, _)| unit(newell_normal(&self.pts, f))).collect();
        let mut volume = 0.0;
        for_each_triangle(&self.pts, &faces, |a, b, c| volume += dot(a, cross(b, c)));
        volume /= 6.0;
        let area: f64 = faces.iter().map(|(f, _)| 0.5 * norm(newell_normal(&self.pts, f))).sum();

        let mut breadth = 0.0;
        for (v, list) in self.ed.iter().enumerate() {
            for (j, &b) in list.iter().enumerate() {
                let b = b as usize;
                if b < v {
                    continue;
                }
                let Some(back) = self.ed[b].iter().position(|&w| w as usize == v) else {
                    continue;
                };
                let n1 = normals[edge_face[offsets[v] + j]];
                let n2 = normals[edge_face[offsets[b] + back]];
                let angle = norm(cross(n1, n2)).atan2(dot(n1, n2));
                breadth += 0.5 * norm(sub(self.pts[b], self.pts[v])) * angle;
            }
        }

        let r2 = r * r;
        (
            volume + area * r + breadth * r2 + 4.0 / 3.0 * PI * r2 * r,
            area + 2.0 * breadth * r + 4.0 * PI * r2,
        )
    }
}

fn unit(n: [f64; 3]) -> [f64; 3] {
    let len = norm(n);
    if len == 0.0 { n } else { [n[0] / len, n[1] / len, n[2] / len] }
}

/// Fans every face into triangles sharing its first vertex.
fn for_each_triangle<F>(pts: &[[f64; 3]], faces: &FaceSet, mut f: F)
where
    F: FnMut([f64; 3], [f64; 3], [f64; 3]),
{
    for (face, _) in faces.iter() {
        let a = pts[face[0] as usize];
        for k in 1..face.len().saturating_sub(1) {
            f(a, pts[face[k] as usize], pts[face[k + 1] as usize]);
        }
    }
}
