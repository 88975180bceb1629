use crate::bounds::BoundingBox;
use crate::cell::DEFAULT_TOLERANCE;
use crate::error::VoroError;

/// Initial number of particle slots reserved in a block on its first insert.
pub const DEFAULT_INIT_MEM: usize = 8;

/// Hard limit on the particles held by one block.
pub const MAX_PARTICLE_MEMORY: usize = 16_777_216;

/// Target number of particles per block used by [`guess_grid`].
const PARTICLES_PER_BLOCK: f64 = 5.6;

/// Construction parameters of a [`Container`](crate::Container).
///
/// Built with chained setters and validated once by `Container::new`:
///
/// ```
/// use vorotess::{BoundingBox, ContainerConfig};
/// let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [10.0; 3]))
///     .auto_grid(1000)
///     .periodic(true, true, false);
/// assert_eq!(config.grid, [6, 6, 6]);
/// ```
#[derive(Clone, Debug)]
pub struct ContainerConfig {
    pub bounds: BoundingBox,
    /// Number of blocks along x, y and z.
    pub grid: [usize; 3],
    pub periodic: [bool; 3],
    /// Lattice shear `(bxy, bxz, byz)`: the periodic images are spanned by
    /// `a = (bx, 0, 0)`, `b = (bxy, by, 0)` and `c = (bxz, byz, bz)`.
    pub shear: [f64; 3],
    /// Particle slots reserved per block on first use.
    pub init_mem: usize,
    /// Power (Laguerre) diagram mode: every particle carries a radius.
    pub poly: bool,
    /// Record the id behind every face of computed cells.
    pub track_neighbors: bool,
    /// Relative tolerance for vertex merging in cells.
    pub tolerance: f64,
}

impl ContainerConfig {
    pub fn new(bounds: BoundingBox) -> Self {
        Self {
            bounds,
            grid: [1, 1, 1],
            periodic: [false; 3],
            shear: [0.0; 3],
            init_mem: DEFAULT_INIT_MEM,
            poly: false,
            track_neighbors: true,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn grid(mut self, nx: usize, ny: usize, nz: usize) -> Self {
        self.grid = [nx, ny, nz];
        self
    }

    /// Chooses the grid for roughly `expected` particles, see [`guess_grid`].
    pub fn auto_grid(mut self, expected: usize) -> Self {
        self.grid = guess_grid(&self.bounds, expected);
        self
    }

    pub fn periodic(mut self, x: bool, y: bool, z: bool) -> Self {
        self.periodic = [x, y, z];
        self
    }

    pub fn shear(mut self, bxy: f64, bxz: f64, byz: f64) -> Self {
        self.shear = [bxy, bxz, byz];
        self
    }

    pub fn init_mem(mut self, init_mem: usize) -> Self {
        self.init_mem = init_mem;
        self
    }

    pub fn poly(mut self, poly: bool) -> Self {
        self.poly = poly;
        self
    }

    pub fn track_neighbors(mut self, track: bool) -> Self {
        self.track_neighbors = track;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<(), VoroError> {
        self.bounds.validate()?;
        let [nx, ny, nz] = self.grid;
        let blocks = nx.checked_mul(ny).and_then(|n| n.checked_mul(nz));
        if nx == 0 || ny == 0 || nz == 0 || blocks.is_none_or(|n| n > i32::MAX as usize) {
            return Err(VoroError::InvalidGrid { nx, ny, nz });
        }
        let [px, py, pz] = self.periodic;
        let checks = [
            ("bxy", self.shear[0], px && py, "x and y"),
            ("bxz", self.shear[1], px && pz, "x and z"),
            ("byz", self.shear[2], py && pz, "y and z"),
        ];
        for (component, value, allowed, axes) in checks {
            if !value.is_finite() || (value != 0.0 && !allowed) {
                return Err(VoroError::InvalidShear { component, value, axes });
            }
        }
        if self.init_mem == 0 || self.init_mem > MAX_PARTICLE_MEMORY {
            return Err(VoroError::BlockOverflow { block: 0, requested: self.init_mem, limit: MAX_PARTICLE_MEMORY });
        }
        Ok(())
    }

    pub fn is_sheared(&self) -> bool {
        self.shear.iter().any(|&s| s != 0.0)
    }
}

/// Picks a grid resolution that puts about 5.6 particles in every block.
pub fn guess_grid(bounds: &BoundingBox, expected: usize) -> [usize; 3] {
    let ilscale = (expected as f64 / (PARTICLES_PER_BLOCK * bounds.volume())).cbrt();
    let mut grid = [1; 3];
    for (axis, n) in grid.iter_mut().enumerate() {
        let guess = bounds.extent(axis) * ilscale + 1.0;
        *n = if guess.is_finite() { (guess as usize).max(1) } else { 1 };
    }
    grid
}
