use crate::bounds::BoundingBox;
use crate::error::VoroError;

/// Chebyshev radius of the precomputed block offset table.
const TABLE_RADIUS: i32 = 4;

/// Geometry of the block grid and the order in which blocks are searched.
///
/// Blocks are addressed by integer coordinates `(i, j, k)`. Coordinates
/// outside `[0, n)` along a periodic axis refer to virtual blocks holding
/// periodic images; the lattice resolves them to real blocks.
#[derive(Clone, Debug)]
pub(crate) struct BlockGrid {
    /// Number of blocks along each axis.
    pub res: [usize; 3],
    /// Scale factor from coordinate to block index.
    pub scale: [f64; 3],
    /// Maximum valid fractional block index.
    pub limit: [f64; 3],
    /// Block edge lengths.
    pub size: [f64; 3],
    pub min: [f64; 3],
    pub periodic: [bool; 3],
    /// Offsets with Chebyshev norm up to `TABLE_RADIUS`, sorted by the
    /// squared lower bound of their distance.
    search_order: Vec<([i32; 3], f64)>,
    h_min: f64,
}

impl BlockGrid {
    pub fn new(bounds: &BoundingBox, res: [usize; 3], periodic: [bool; 3]) -> Self {
        let mut scale = [0.0; 3];
        let mut limit = [0.0; 3];
        let mut size = [0.0; 3];
        for a in 0..3 {
            scale[a] = res[a] as f64 / bounds.extent(a);
            limit[a] = res[a] as f64 - 1e-5;
            size[a] = 1.0 / scale[a];
        }

        let mut search_order = Vec::with_capacity(((2 * TABLE_RADIUS + 1) as usize).pow(3));
        for z in -TABLE_RADIUS..=TABLE_RADIUS {
            for y in -TABLE_RADIUS..=TABLE_RADIUS {
                for x in -TABLE_RADIUS..=TABLE_RADIUS {
                    let d = [x, y, z];
                    search_order.push((d, lower_bound_sq(d, size)));
                }
            }
        }
        search_order.sort_by(|a, b| a.1.total_cmp(&b.1));

        Self {
            res,
            scale,
            limit,
            size,
            min: bounds.min,
            periodic,
            search_order,
            h_min: size.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    pub fn block_count(&self) -> usize {
        self.res[0] * self.res[1] * self.res[2]
    }

    /// Integer block coordinates of a point inside the primary domain.
    pub fn coords(&self, p: &[f64; 3]) -> [i32; 3] {
        let mut c = [0; 3];
        for a in 0..3 {
            c[a] = ((p[a] - self.min[a]) * self.scale[a]).clamp(0.0, self.limit[a]) as i32;
        }
        c
    }

    /// Position of `p` inside its block, as a fraction of the block size.
    pub fn fraction(&self, p: &[f64; 3], coords: [i32; 3]) -> [f64; 3] {
        let mut f = [0.0; 3];
        for a in 0..3 {
            f[a] = ((p[a] - self.min[a]) * self.scale[a] - coords[a] as f64).clamp(0.0, 1.0);
        }
        f
    }

    pub fn index(&self, c: [i32; 3]) -> usize {
        c[0] as usize + self.res[0] * (c[1] as usize + self.res[1] * c[2] as usize)
    }

    pub fn index_of(&self, p: &[f64; 3]) -> usize {
        self.index(self.coords(p))
    }

    /// Visits the blocks around `home` that may hold points within
    /// `sqrt(limit_sq)` of the point at fraction `frac` inside `home`.
    ///
    /// Blocks come in increasing order of a lower bound of their distance, so
    /// the walk stops as soon as that bound exceeds the limit. The visitor may
    /// shrink `limit_sq` and returns `Ok(false)` to end the walk early.
    pub fn walk<F>(&self, home: [i32; 3], frac: [f64; 3], limit_sq: &mut f64, mut visit: F) -> Result<bool, VoroError>
    where
        F: FnMut([i32; 3], &mut f64) -> Result<bool, VoroError>,
    {
        let mut range = [(0, 0); 3];
        let mut reach = 0;
        for a in 0..3 {
            range[a] = if self.periodic[a] {
                (i32::MIN / 2, i32::MAX / 2)
            } else {
                let n = self.res[a] as i32;
                reach = reach.max(home[a]).max(n - 1 - home[a]);
                (-home[a], n - 1 - home[a])
            };
        }
        if self.periodic.iter().any(|&p| p) {
            reach = i32::MAX;
        }

        let in_range = |d: [i32; 3]| (0..3).all(|a| d[a] >= range[a].0 && d[a] <= range[a].1);

        for &(d, lower) in &self.search_order {
            if lower > *limit_sq {
                break;
            }
            if !in_range(d) || self.distance_sq(d, frac) > *limit_sq {
                continue;
            }
            if !visit([home[0] + d[0], home[1] + d[1], home[2] + d[2]], limit_sq)? {
                return Ok(false);
            }
        }

        // Beyond the table, sweep whole Chebyshev shells.
        let mut s = TABLE_RADIUS + 1;
        while s <= reach {
            let lower = (s - 1) as f64 * self.h_min;
            if lower * lower > *limit_sq {
                break;
            }
            for dz in (-s).max(range[2].0)..=s.min(range[2].1) {
                for dy in (-s).max(range[1].0)..=s.min(range[1].1) {
                    let on_shell = dz.abs() == s || dy.abs() == s;
                    let mut dx = (-s).max(range[0].0);
                    let dx_end = s.min(range[0].1);
                    while dx <= dx_end {
                        let d = [dx, dy, dz];
                        dx = if on_shell || dx == s { dx + 1 } else { s.max(dx + 1) };
                        if !on_shell && d[0].abs() != s {
                            continue;
                        }
                        if self.distance_sq(d, frac) > *limit_sq {
                            continue;
                        }
                        if !visit([home[0] + d[0], home[1] + d[1], home[2] + d[2]], limit_sq)? {
                            return Ok(false);
                        }
                    }
                }
            }
            s += 1;
        }
        Ok(true)
    }

    /// Exact squared distance from the point at `frac` in the home block to
    /// the block at offset `d`.
    fn distance_sq(&self, d: [i32; 3], frac: [f64; 3]) -> f64 {
        let mut sum = 0.0;
        for a in 0..3 {
            let gap = if d[a] > 0 {
                (d[a] as f64 - frac[a]) * self.size[a]
            } else if d[a] < 0 {
                (-(d[a] + 1) as f64 + frac[a]) * self.size[a]
            } else {
                0.0
            };
            let gap = gap.max(0.0);
            sum += gap * gap;
        }
        sum
    }
}

fn lower_bound_sq(d: [i32; 3], size: [f64; 3]) -> f64 {
    let mut sum = 0.0;
    for a in 0..3 {
        let gap = (d[a].abs() - 1).max(0) as f64 * size[a];
        sum += gap * gap;
    }
    sum
}
