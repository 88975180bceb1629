//! Periodic images of the primary domain.
//!
//! The container is periodic under the lattice spanned by
//! `a = (bx, 0, 0)`, `b = (bxy, by, 0)` and `c = (bxz, byz, bz)`, restricted
//! to the periodic axes. With shear, a virtual block outside the primary grid
//! does not coincide with a single real block; it overlaps at most two real
//! blocks along y and two along x, which [`Lattice::images`] enumerates
//! together with the translation that carries particles there.

use super::config::ContainerConfig;
use super::grid::BlockGrid;
use crate::cell::{dot, norm, Cell};
use crate::error::VoroError;
use smallvec::SmallVec;

/// Face id given to the faces of the unit Voronoi cell. Those faces are
/// bisectors with periodic images of the generator itself. Stored particles
/// have them relabelled with their own id once the cell is complete; ghost
/// cells keep this value.
pub const SELF_IMAGE_ID: i32 = i32::MIN;

/// One real block overlapping a virtual block, and the translation that maps
/// the real block's particles onto the virtual one.
pub(crate) type Image = (usize, [f64; 3]);

#[derive(Clone, Debug)]
pub(crate) struct Lattice {
    min: [f64; 3],
    /// Box lengths `bx`, `by` and `bz`.
    len: [f64; 3],
    /// `bxy`, `bxz` and `byz`.
    shear: [f64; 3],
    periodic: [bool; 3],
    res: [i32; 3],
    size: [f64; 3],
}

impl Lattice {
    pub fn new(config: &ContainerConfig, grid: &BlockGrid) -> Self {
        let b = &config.bounds;
        Self {
            min: b.min,
            len: [b.extent(0), b.extent(1), b.extent(2)],
            shear: config.shear,
            periodic: config.periodic,
            res: [grid.res[0] as i32, grid.res[1] as i32, grid.res[2] as i32],
            size: grid.size,
        }
    }

    pub fn is_sheared(&self) -> bool {
        self.shear.iter().any(|&s| s != 0.0)
    }

    pub fn is_fully_periodic(&self) -> bool {
        self.periodic.iter().all(|&p| p)
    }

    /// The three lattice vectors `a`, `b` and `c`.
    pub fn vectors(&self) -> [[f64; 3]; 3] {
        let [bx, by, bz] = self.len;
        let [bxy, bxz, byz] = self.shear;
        [[bx, 0.0, 0.0], [bxy, by, 0.0], [bxz, byz, bz]]
    }

    pub fn translation(&self, i: i32, j: i32, k: i32) -> [f64; 3] {
        let [bx, by, bz] = self.len;
        let [bxy, bxz, byz] = self.shear;
        let (i, j, k) = (i as f64, j as f64, k as f64);
        [i * bx + j * bxy + k * bxz, j * by + k * byz, k * bz]
    }

    /// Half the sum of the lengths of the periodic lattice vectors. Along a
    /// periodic axis every cell lies within this distance of its generator.
    pub fn image_radius(&self) -> f64 {
        let v = self.vectors();
        0.5 * (0..3).filter(|&a| self.periodic[a]).map(|a| norm(v[a])).sum::<f64>()
    }

    /// Maps `pos` into the primary domain by subtracting whole lattice
    /// vectors, reducing z first, then y, then x. Returns `None` if the point
    /// lies outside the domain along a non-periodic axis.
    ///
    /// The second value counts the lattice vectors removed along each axis,
    /// so `pos == p + translation(n[0], n[1], n[2])` for the returned `p`.
    pub fn remap(&self, pos: [f64; 3]) -> Option<([f64; 3], [i32; 3])> {
        let mut p = pos;
        let mut image = [0i32; 3];
        if !p.iter().all(|x| x.is_finite()) {
            return None;
        }
        for axis in (0..3).rev() {
            let rel = p[axis] - self.min[axis];
            if !self.periodic[axis] {
                if rel < 0.0 || rel > self.len[axis] {
                    return None;
                }
                continue;
            }
            let n = (rel / self.len[axis]).floor();
            if n != 0.0 {
                let v = self.vectors()[axis];
                for a in 0..3 {
                    p[a] -= n * v[a];
                }
                image[axis] = n as i32;
            }
        }
        Some((p, image))
    }

    /// Real blocks and translations covering the virtual block `vb`.
    ///
    /// Along z the virtual layer is a plain periodic copy. The y layer of that
    /// copy is shifted by `k * byz`, so it straddles at most two real layers;
    /// the same holds along x with `k * bxz + j * bxy`.
    pub fn images(&self, vb: [i32; 3]) -> SmallVec<[Image; 4]> {
        let mut out = SmallVec::new();
        let Some((k, rk)) = self.wrap(2, vb[2] as f64) else {
            return out;
        };
        let [bxy, bxz, byz] = self.shear;
        let sy = k as f64 * byz;
        for (j, rj) in self.wraps(1, vb[1], sy) {
            let sx = k as f64 * bxz + j as f64 * bxy;
            for (i, ri) in self.wraps(0, vb[0], sx) {
                let block = ri as usize + self.res[0] as usize * (rj as usize + self.res[1] as usize * rk as usize);
                out.push((block, self.translation(i, j, k)));
            }
        }
        out
    }

    /// Splits an unwrapped block index into (period, real index).
    fn wrap(&self, axis: usize, m: f64) -> Option<(i32, i32)> {
        let m = m as i32;
        let n = self.res[axis];
        if self.periodic[axis] {
            Some((m.div_euclid(n), m.rem_euclid(n)))
        } else if (0..n).contains(&m) {
            Some((0, m))
        } else {
            None
        }
    }

    /// Real layers along `axis` whose images, shifted by `shift`, overlap the
    /// virtual layer `v`.
    fn wraps(&self, axis: usize, v: i32, shift: f64) -> SmallVec<[(i32, i32); 2]> {
        let mut out = SmallVec::new();
        if shift == 0.0 {
            out.extend(self.wrap(axis, v as f64));
            return out;
        }
        let first = (v as f64 - shift / self.size[axis]).floor();
        out.extend(self.wrap(axis, first));
        out.extend(self.wrap(axis, first + 1.0));
        out
    }

    /// Builds the Voronoi cell of a generator among its own periodic images.
    ///
    /// Every cell of a fully periodic container lies inside this shape, so it
    /// serves as the starting polyhedron there.
    pub fn unit_voronoi_cell(&self, track_neighbors: bool, tolerance: f64) -> Result<Cell, VoroError> {
        let mut cell = Cell::new(track_neighbors);
        cell.set_tolerance(tolerance);
        let h = 0.5 * self.vectors().iter().map(|v| norm(*v)).sum::<f64>();
        cell.init_box([-h; 3], [h; 3])?;

        let reach = 2.0 * cell.max_radius_squared().sqrt();
        let [bx, by, bz] = self.len;
        let [bxy, bxz, byz] = self.shear;
        let mut vectors = Vec::new();
        let kmax = (reach / bz).floor() as i32;
        for k in -kmax..=kmax {
            let (ty, tz) = (k as f64 * byz, k as f64 * bz);
            let jmin = ((-reach - ty) / by).ceil() as i32;
            let jmax = ((reach - ty) / by).floor() as i32;
            for j in jmin..=jmax {
                let tx = j as f64 * bxy + k as f64 * bxz;
                let imin = ((-reach - tx) / bx).ceil() as i32;
                let imax = ((reach - tx) / bx).floor() as i32;
                for i in imin..=imax {
                    if i == 0 && j == 0 && k == 0 {
                        continue;
                    }
                    let t = [i as f64 * bx + tx, j as f64 * by + ty, tz];
                    let t2 = dot(t, t);
                    if t2 < reach * reach {
                        vectors.push((t2, t));
                    }
                }
            }
        }
        vectors.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (t2, t) in vectors {
            if cell.plane_intersects(t, t2) {
                cell.cut(t, t2, SELF_IMAGE_ID)?;
            }
        }
        log::debug!(
            "unit Voronoi cell: {} vertices, {} faces, volume {:.6}",
            cell.number_of_vertices(),
            cell.number_of_faces(),
            cell.volume()
        );
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::BoundingBox;

    fn lattice(config: &ContainerConfig) -> Lattice {
        let grid = BlockGrid::new(&config.bounds, config.grid, config.periodic);
        Lattice::new(config, &grid)
    }

    fn cube_config() -> ContainerConfig {
        ContainerConfig::new(BoundingBox::new([0.0; 3], [10.0; 3]))
            .grid(5, 5, 5)
            .periodic(true, true, true)
    }

    #[test]
    fn test_remap_orthogonal() {
        let l = lattice(&cube_config());
        let (p, image) = l.remap([-1.0, 23.0, 10.0]).unwrap();
        assert!((p[0] - 9.0).abs() < 1e-12);
        assert!((p[1] - 3.0).abs() < 1e-12);
        assert!(p[2].abs() < 1e-12);
        assert_eq!(image, [-1, 2, 1]);

        let (_, image) = l.remap([5.0, 5.0, 5.0]).unwrap();
        assert_eq!(image, [0, 0, 0]);

        let open = lattice(&cube_config().periodic(true, false, true));
        assert!(open.remap([1.0, -0.5, 1.0]).is_none());
        assert!(open.remap([1.0, 10.0, 1.0]).is_some());
    }

    #[test]
    fn test_remap_sheared() {
        let l = lattice(&cube_config().shear(3.0, 0.0, 4.0));
        // One period up in z shifts y by 4.
        let (p, image) = l.remap([5.0, 5.0, 12.0]).unwrap();
        assert!((p[2] - 2.0).abs() < 1e-12);
        assert!((p[1] - 1.0).abs() < 1e-12);
        assert!((p[0] - 5.0).abs() < 1e-12);
        assert_eq!(image, [0, 0, 1]);
        // Here y wraps as well and shifts x by 3.
        let (p, image) = l.remap([5.0, 15.0, 12.0]).unwrap();
        assert!((p[2] - 2.0).abs() < 1e-12);
        assert!((p[1] - 1.0).abs() < 1e-12);
        assert!((p[0] - 2.0).abs() < 1e-12);
        assert_eq!(image, [0, 1, 1]);
    }

    #[test]
    fn test_remap_image_restores_position() {
        let l = lattice(&cube_config().shear(3.0, -2.0, 4.0));
        for pos in [[-7.0, 31.0, -14.0], [25.0, -3.0, 22.5], [0.0, 10.0, 30.0]] {
            let (p, image) = l.remap(pos).unwrap();
            assert!(p.iter().all(|x| (0.0..10.0).contains(x)), "{:?} -> {:?}", pos, p);
            let t = l.translation(image[0], image[1], image[2]);
            for a in 0..3 {
                assert!((p[a] + t[a] - pos[a]).abs() < 1e-12, "{:?} -> {:?} {:?}", pos, p, image);
            }
        }
    }

    #[test]
    fn test_images_orthogonal() {
        let l = lattice(&cube_config());
        let imgs = l.images([-1, 2, 5]);
        assert_eq!(imgs.len(), 1);
        let (block, t) = imgs[0];
        assert_eq!(block, 4 + 5 * (2 + 5 * 0));
        assert_eq!(t, [-10.0, 0.0, 10.0]);

        let open = lattice(&cube_config().periodic(false, true, true));
        assert!(open.images([-1, 0, 0]).is_empty());
    }

    #[test]
    fn test_images_sheared() {
        // Block size 2, byz = 3 shifts the layer above by one and a half blocks.
        let l = lattice(&cube_config().shear(0.0, 0.0, 3.0));
        let imgs = l.images([0, 2, 5]);
        assert_eq!(imgs.len(), 2);
        let rows: Vec<i32> = imgs.iter().map(|(b, _)| ((b / 5) % 5) as i32).collect();
        assert_eq!(rows, vec![0, 1]);
        for (_, t) in &imgs {
            assert_eq!(t[2], 10.0);
            assert_eq!(t[1], 3.0);
        }
    }

    #[test]
    fn test_unit_cell_of_cube_is_cube() {
        let l = lattice(&cube_config());
        let cell = l.unit_voronoi_cell(true, 1e-10).unwrap();
        assert!((cell.volume() - 1000.0).abs() < 1e-8);
        assert_eq!(cell.number_of_faces(), 6);
        assert!(cell.neighbors().iter().all(|&id| id == SELF_IMAGE_ID));
    }

    #[test]
    fn test_unit_cell_of_sheared_lattice() {
        let l = lattice(&cube_config().shear(4.0, 3.0, 2.0));
        let cell = l.unit_voronoi_cell(false, 1e-10).unwrap();
        assert!((cell.volume() - 1000.0).abs() < 1e-6);
    }
}
