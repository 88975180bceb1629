//! Concrete wall shapes.
//!
//! Curved surfaces are applied as a single tangent plane through the surface
//! point closest to the generator, so the clipped boundary converges to the
//! true surface as the particle density increases.

use super::WallGeometry;
use crate::cell::{cross, dot, newell_normal, norm, sub, Cell};
use crate::error::VoroError;

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = norm(v);
    if len == 0.0 { [0.0, 0.0, 1.0] } else { [v[0] / len, v[1] / len, v[2] / len] }
}

fn add_scaled(p: [f64; 3], d: [f64; 3], s: f64) -> [f64; 3] {
    [p[0] + d[0] * s, p[1] + d[1] * s, p[2] + d[2] * s]
}

fn neg(v: [f64; 3]) -> [f64; 3] {
    [-v[0], -v[1], -v[2]]
}

/// Splits `d` into its component along the unit `axis` and the perpendicular rest.
fn split_axial(d: [f64; 3], axis: [f64; 3]) -> (f64, [f64; 3]) {
    let h = dot(d, axis);
    (h, add_scaled(d, axis, -h))
}

/// A wall defined by a plane.
///
/// The plane partitions space into two regions: valid (inside) and invalid (outside).
/// The normal vector points towards the valid region.
#[derive(Debug)]
pub struct PlaneGeometry {
    /// A point on the plane.
    pub point: [f64; 3],
    /// The unit normal of the plane, pointing towards the valid region.
    pub normal: [f64; 3],
}

impl PlaneGeometry {
    /// Creates a new `PlaneGeometry`.
    ///
    /// # Arguments
    ///
    /// * `point` - A point on the plane.
    /// * `normal` - The normal vector of the plane, pointing towards the valid region.
    ///              It will be normalized.
    pub fn new(point: [f64; 3], normal: [f64; 3]) -> Self {
        Self { point, normal: normalize(normal) }
    }
}

impl WallGeometry for PlaneGeometry {
    fn contains(&self, point: &[f64; 3]) -> bool {
        dot(sub(*point, self.point), self.normal) >= 0.0
    }

    fn cut(&self, _generator: &[f64; 3], callback: &mut dyn FnMut([f64; 3], [f64; 3])) {
        callback(self.point, neg(self.normal));
    }
}

/// A wall defined by a sphere.
///
/// The valid region is inside the sphere.
#[derive(Debug)]
pub struct SphereGeometry {
    pub center: [f64; 3],
    pub radius: f64,
}

impl SphereGeometry {
    pub fn new(center: [f64; 3], radius: f64) -> Self {
        Self { center, radius }
    }
}

impl WallGeometry for SphereGeometry {
    fn contains(&self, point: &[f64; 3]) -> bool {
        let d = sub(*point, self.center);
        dot(d, d) <= self.radius * self.radius
    }

    fn cut(&self, generator: &[f64; 3], callback: &mut dyn FnMut([f64; 3], [f64; 3])) {
        let d = sub(*generator, self.center);
        let dist = norm(d);
        if dist == 0.0 {
            return;
        }
        let u = [d[0] / dist, d[1] / dist, d[2] / dist];
        callback(add_scaled(self.center, u, self.radius), u);
    }
}

/// A wall defined by a spherical shell.
///
/// The valid region lies between the inner and the outer sphere.
#[derive(Debug)]
pub struct SphericalShellGeometry {
    pub center: [f64; 3],
    pub inner_radius: f64,
    pub outer_radius: f64,
}

impl SphericalShellGeometry {
    /// Creates a new `SphericalShellGeometry`.
    ///
    /// # Arguments
    ///
    /// * `center` - The common center of both spheres.
    /// * `inner_radius` - Radius of the excluded core.
    /// * `outer_radius` - Radius of the outer boundary.
    pub fn new(center: [f64; 3], inner_radius: f64, outer_radius: f64) -> Self {
        Self { center, inner_radius, outer_radius }
    }
}

impl WallGeometry for SphericalShellGeometry {
    fn contains(&self, point: &[f64; 3]) -> bool {
        let d = sub(*point, self.center);
        let r2 = dot(d, d);
        r2 >= self.inner_radius * self.inner_radius && r2 <= self.outer_radius * self.outer_radius
    }

    fn cut(&self, generator: &[f64; 3], callback: &mut dyn FnMut([f64; 3], [f64; 3])) {
        let d = sub(*generator, self.center);
        let dist = norm(d);
        if dist == 0.0 {
            return;
        }
        let u = [d[0] / dist, d[1] / dist, d[2] / dist];
        callback(add_scaled(self.center, u, self.outer_radius), u);
        callback(add_scaled(self.center, u, self.inner_radius), neg(u));
    }
}

/// A wall defined by an infinite cylinder.
///
/// The valid region is inside the cylinder.
#[derive(Debug)]
pub struct CylinderGeometry {
    /// A point on the cylinder's axis.
    pub center: [f64; 3],
    /// The unit direction of the cylinder's axis.
    pub axis: [f64; 3],
    pub radius: f64,
}

impl CylinderGeometry {
    /// Creates a new `CylinderGeometry`.
    ///
    /// # Arguments
    ///
    /// * `center` - A point on the cylinder's axis.
    /// * `axis` - The direction of the cylinder's axis. It will be normalized.
    /// * `radius` - The radius of the cylinder.
    pub fn new(center: [f64; 3], axis: [f64; 3], radius: f64) -> Self {
        Self { center, axis: normalize(axis), radius }
    }

    fn tangent(&self, generator: &[f64; 3]) -> Option<([f64; 3], [f64; 3])> {
        let (h, perp) = split_axial(sub(*generator, self.center), self.axis);
        let dist = norm(perp);
        if dist == 0.0 {
            return None;
        }
        let u = [perp[0] / dist, perp[1] / dist, perp[2] / dist];
        let on_axis = add_scaled(self.center, self.axis, h);
        Some((add_scaled(on_axis, u, self.radius), u))
    }
}

impl WallGeometry for CylinderGeometry {
    fn contains(&self, point: &[f64; 3]) -> bool {
        let (_, perp) = split_axial(sub(*point, self.center), self.axis);
        dot(perp, perp) <= self.radius * self.radius
    }

    fn cut(&self, generator: &[f64; 3], callback: &mut dyn FnMut([f64; 3], [f64; 3])) {
        if let Some((point, normal)) = self.tangent(generator) {
            callback(point, normal);
        }
    }
}

/// A wall defined by a cylinder of finite length with flat end caps.
///
/// The valid region is inside the cylinder between both caps.
#[derive(Debug)]
pub struct FiniteCylinderGeometry {
    side: CylinderGeometry,
    pub length: f64,
}

impl FiniteCylinderGeometry {
    /// Creates a new `FiniteCylinderGeometry`.
    ///
    /// # Arguments
    ///
    /// * `base` - Center of the first end cap.
    /// * `axis` - Direction from the first to the second cap. It will be normalized.
    /// * `length` - Distance between the caps.
    /// * `radius` - The radius of the cylinder.
    pub fn new(base: [f64; 3], axis: [f64; 3], length: f64, radius: f64) -> Self {
        Self { side: CylinderGeometry::new(base, axis, radius), length }
    }
}

impl WallGeometry for FiniteCylinderGeometry {
    fn contains(&self, point: &[f64; 3]) -> bool {
        let h = dot(sub(*point, self.side.center), self.side.axis);
        h >= 0.0 && h <= self.length && self.side.contains(point)
    }

    fn cut(&self, generator: &[f64; 3], callback: &mut dyn FnMut([f64; 3], [f64; 3])) {
        let axis = self.side.axis;
        callback(self.side.center, neg(axis));
        callback(add_scaled(self.side.center, axis, self.length), axis);
        self.side.cut(generator, callback);
    }
}

/// A wall defined by an infinite cone.
///
/// The valid region is inside the cone.
#[derive(Debug)]
pub struct ConeGeometry {
    /// The apex of the cone.
    pub tip: [f64; 3],
    /// The unit direction of the cone's axis, pointing into the cone.
    pub axis: [f64; 3],
    /// The half-angle of the cone in radians.
    pub angle: f64,
}

impl ConeGeometry {
    /// Creates a new `ConeGeometry`.
    ///
    /// # Arguments
    ///
    /// * `tip` - The apex of the cone.
    /// * `axis` - The direction of the cone's axis. It will be normalized.
    /// * `angle` - The half-angle of the cone in radians.
    pub fn new(tip: [f64; 3], axis: [f64; 3], angle: f64) -> Self {
        Self { tip, axis: normalize(axis), angle }
    }
}

impl WallGeometry for ConeGeometry {
    fn contains(&self, point: &[f64; 3]) -> bool {
        let (h, perp) = split_axial(sub(*point, self.tip), self.axis);
        h >= 0.0 && norm(perp) <= h * self.angle.tan()
    }

    fn cut(&self, generator: &[f64; 3], callback: &mut dyn FnMut([f64; 3], [f64; 3])) {
        let d = sub(*generator, self.tip);
        let (h, perp) = split_axial(d, self.axis);
        let r = norm(perp);
        if r == 0.0 {
            return;
        }
        let radial = [perp[0] / r, perp[1] / r, perp[2] / r];
        let (sin_a, cos_a) = self.angle.sin_cos();

        // Foot of the perpendicular from the generator onto the surface line
        // through the tip, measured in the (axial, radial) half-plane.
        let dist = r * cos_a - h * sin_a;
        let foot_h = h + dist * sin_a;
        let foot_r = r - dist * cos_a;
        if foot_h < 0.0 {
            let len = norm(d);
            if len > 0.0 {
                callback(self.tip, [d[0] / len, d[1] / len, d[2] / len]);
            }
            return;
        }
        let surface = add_scaled(add_scaled(self.tip, self.axis, foot_h), radial, foot_r);
        let normal = [
            cos_a * radial[0] - sin_a * self.axis[0],
            cos_a * radial[1] - sin_a * self.axis[1],
            cos_a * radial[2] - sin_a * self.axis[2],
        ];
        callback(surface, normal);
    }
}

/// A wall defined by the intersection of half-spaces.
#[derive(Debug)]
pub struct ConvexPolyhedronGeometry {
    /// Each entry holds a point on the plane and the normal pointing OUT of the valid region.
    pub planes: Vec<([f64; 3], [f64; 3])>,
}

impl ConvexPolyhedronGeometry {
    /// Creates a new `ConvexPolyhedronGeometry` from (point, outward normal) pairs.
    pub fn new(planes: Vec<([f64; 3], [f64; 3])>) -> Self {
        Self { planes: planes.into_iter().map(|(p, n)| (p, normalize(n))).collect() }
    }

    fn from_directions(center: [f64; 3], inradius: f64, directions: &[[f64; 3]]) -> Self {
        let planes = directions
            .iter()
            .map(|&d| {
                let n = normalize(d);
                (add_scaled(center, n, inradius), n)
            })
            .collect();
        Self { planes }
    }

    /// Creates a regular tetrahedron with the given circumradius.
    pub fn new_tetrahedron(center: [f64; 3], radius: f64) -> Self {
        let dirs = [[-1.0, -1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, -1.0]];
        Self::from_directions(center, radius / 3.0, &dirs)
    }

    /// Creates a cube with the given circumradius.
    pub fn new_hexahedron(center: [f64; 3], radius: f64) -> Self {
        let dirs = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ];
        Self::from_directions(center, radius / 3.0f64.sqrt(), &dirs)
    }

    /// Creates a regular octahedron with the given circumradius.
    pub fn new_octahedron(center: [f64; 3], radius: f64) -> Self {
        let mut dirs = Vec::with_capacity(8);
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    dirs.push([x, y, z]);
                }
            }
        }
        Self::from_directions(center, radius / 3.0f64.sqrt(), &dirs)
    }
}

impl WallGeometry for ConvexPolyhedronGeometry {
    fn contains(&self, point: &[f64; 3]) -> bool {
        self.planes.iter().all(|(p, n)| dot(sub(*point, *p), *n) <= 0.0)
    }

    fn cut(&self, _generator: &[f64; 3], callback: &mut dyn FnMut([f64; 3], [f64; 3])) {
        for (p, n) in &self.planes {
            callback(*p, *n);
        }
    }
}

/// A convex polyhedron that replaces the container box as the starting
/// shape of every cell, which bounds a finite packing without clipping a
/// large box plane by plane.
#[derive(Debug)]
pub struct InitialShapeGeometry {
    vertices: Vec<[f64; 3]>,
    faces: Vec<Vec<usize>>,
    planes: Vec<([f64; 3], [f64; 3])>,
}

impl InitialShapeGeometry {
    /// Creates the shape from absolute vertex positions and face loops.
    /// Fails if the faces do not close up into a polyhedron.
    pub fn new(vertices: Vec<[f64; 3]>, faces: Vec<Vec<usize>>) -> Result<Self, VoroError> {
        Cell::new(false).init_polyhedron(&vertices, &faces, 0)?;

        let inv = 1.0 / vertices.len() as f64;
        let mut inside = [0.0; 3];
        for p in &vertices {
            inside = add_scaled(inside, *p, inv);
        }
        let planes = faces
            .iter()
            .map(|f| {
                let loop_: Vec<u32> = f.iter().map(|&v| v as u32).collect();
                let mut n = normalize(newell_normal(&vertices, &loop_));
                let p = vertices[f[0]];
                if dot(n, sub(p, inside)) < 0.0 {
                    n = neg(n);
                }
                (p, n)
            })
            .collect();
        Ok(Self { vertices, faces, planes })
    }

    pub fn cuboid(min: [f64; 3], max: [f64; 3]) -> Result<Self, VoroError> {
        let mut vertices = Vec::with_capacity(8);
        for i in 0..8 {
            vertices.push([
                if i & 1 == 0 { min[0] } else { max[0] },
                if i & 2 == 0 { min[1] } else { max[1] },
                if i & 4 == 0 { min[2] } else { max[2] },
            ]);
        }
        let faces = vec![
            vec![0, 4, 6, 2],
            vec![1, 3, 7, 5],
            vec![0, 1, 5, 4],
            vec![2, 6, 7, 3],
            vec![0, 2, 3, 1],
            vec![4, 5, 7, 6],
        ];
        Self::new(vertices, faces)
    }

    pub fn octahedron(center: [f64; 3], l: f64) -> Result<Self, VoroError> {
        let mut vertices = Vec::with_capacity(6);
        for axis in 0..3 {
            for sign in [1.0, -1.0] {
                let mut p = center;
                p[axis] += sign * l;
                vertices.push(p);
            }
        }
        let mut faces = Vec::with_capacity(8);
        for x in [0, 1] {
            for y in [2, 3] {
                for z in [4, 5] {
                    faces.push(vec![x, y, z]);
                }
            }
        }
        Self::new(vertices, faces)
    }

    pub fn tetrahedron(p: [[f64; 3]; 4]) -> Result<Self, VoroError> {
        let volume = dot(sub(p[1], p[0]), cross(sub(p[2], p[0]), sub(p[3], p[0])));
        if volume == 0.0 {
            return Err(VoroError::Topology { id: 0, reason: "flat tetrahedron" });
        }
        Self::new(p.to_vec(), vec![vec![1, 2, 3], vec![0, 3, 2], vec![0, 1, 3], vec![0, 2, 1]])
    }
}

impl WallGeometry for InitialShapeGeometry {
    fn contains(&self, point: &[f64; 3]) -> bool {
        self.planes.iter().all(|(p, n)| dot(sub(*point, *p), *n) <= 0.0)
    }

    fn cut(&self, _generator: &[f64; 3], _callback: &mut dyn FnMut([f64; 3], [f64; 3])) {}

    fn initial_shape(&self, generator: &[f64; 3], id: i32, cell: &mut Cell) -> Result<bool, VoroError> {
        let rel: Vec<[f64; 3]> = self.vertices.iter().map(|v| sub(*v, *generator)).collect();
        cell.init_polyhedron(&rel, &self.faces, id)?;
        Ok(true)
    }
}
