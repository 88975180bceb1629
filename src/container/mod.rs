//! Particle storage and cell computation.
//!
//! The [`Container`] buckets particles into a uniform grid of blocks. A cell is
//! computed by resetting a [`Cell`] to the domain box (or a wall-supplied
//! shape), applying the walls, and then cutting it by every particle found in
//! an expanding block search. The search ends once no remaining block can hold
//! a particle whose bisector reaches the cell.

pub mod config;
pub(crate) mod grid;
pub(crate) mod lattice;

use crate::bounds::BoundingBox;
use crate::cell::{dot, Cell};
use crate::error::VoroError;
use crate::loops::{LoopAll, ParticleOrder};
use crate::wall::Wall;
use config::{ContainerConfig, MAX_PARTICLE_MEMORY};
use grid::BlockGrid;
use lattice::Lattice;
pub use lattice::SELF_IMAGE_ID;
use rand::Rng;
use rayon::prelude::*;
use std::io::BufRead;
use std::path::Path;

/// A stored particle. `radius` is zero outside power-diagram mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub id: i32,
    pub pos: [f64; 3],
    pub radius: f64,
}

/// One bucket of the grid.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub(crate) particles: Vec<Particle>,
}

impl Block {
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

/// Address of a stored particle: block index and slot inside the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleRef {
    pub block: usize,
    pub index: usize,
}

/// Result of a point location query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Located {
    pub id: i32,
    /// Position of the particle, or of its periodic image nearest to the query.
    pub pos: [f64; 3],
    pub particle: ParticleRef,
}

/// A spatial container of particles, optionally periodic and sheared.
#[derive(Debug)]
pub struct Container {
    config: ContainerConfig,
    grid: BlockGrid,
    lattice: Lattice,
    blocks: Vec<Block>,
    walls: Vec<Wall>,
    /// Largest particle radius stored so far.
    max_radius: f64,
    count: usize,
    /// Half-width of the starting box along sheared periodic axes.
    image_radius: f64,
    /// Starting shape of every cell in a fully periodic domain.
    unit_cell: Option<Cell>,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Result<Self, VoroError> {
        config.validate()?;
        let grid = BlockGrid::new(&config.bounds, config.grid, config.periodic);
        let lattice = Lattice::new(&config, &grid);
        let unit_cell = if lattice.is_fully_periodic() {
            Some(lattice.unit_voronoi_cell(config.track_neighbors, config.tolerance)?)
        } else {
            None
        };
        log::debug!(
            "container {:?} with {:?} blocks, periodic {:?}, shear {:?}",
            config.bounds,
            config.grid,
            config.periodic,
            config.shear
        );
        Ok(Self {
            blocks: vec![Block::default(); grid.block_count()],
            image_radius: lattice.image_radius(),
            config,
            grid,
            lattice,
            walls: Vec::new(),
            max_radius: 0.0,
            count: 0,
            unit_cell,
        })
    }

    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.push(wall);
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// Inserts a particle. Returns `Ok(false)` if the position lies outside
    /// the domain along a non-periodic axis.
    pub fn put(&mut self, id: i32, pos: [f64; 3]) -> Result<bool, VoroError> {
        if self.config.poly {
            return Err(VoroError::InvalidRadius { id, radius: 0.0 });
        }
        Ok(self.insert(id, pos, 0.0)?.is_some())
    }

    /// Inserts a weighted particle into a power-diagram container.
    pub fn put_poly(&mut self, id: i32, pos: [f64; 3], radius: f64) -> Result<bool, VoroError> {
        self.check_radius(id, radius)?;
        Ok(self.insert(id, pos, radius)?.is_some())
    }

    /// Like [`Container::put`], but reports which periodic image `pos` was
    /// taken from: the number of lattice vectors subtracted along x, y and z
    /// to bring it into the primary domain. All zero for a point already
    /// inside it. Returns `Ok(None)` where `put` returns `Ok(false)`.
    pub fn put_with_image(&mut self, id: i32, pos: [f64; 3]) -> Result<Option<[i32; 3]>, VoroError> {
        if self.config.poly {
            return Err(VoroError::InvalidRadius { id, radius: 0.0 });
        }
        Ok(self.insert(id, pos, 0.0)?.map(|(_, image)| image))
    }

    pub fn put_poly_with_image(&mut self, id: i32, pos: [f64; 3], radius: f64) -> Result<Option<[i32; 3]>, VoroError> {
        self.check_radius(id, radius)?;
        Ok(self.insert(id, pos, radius)?.map(|(_, image)| image))
    }

    /// Inserts a particle and records where it went in `order`.
    pub fn put_ordered(&mut self, order: &mut ParticleOrder, id: i32, pos: [f64; 3]) -> Result<bool, VoroError> {
        if self.config.poly {
            return Err(VoroError::InvalidRadius { id, radius: 0.0 });
        }
        self.insert_ordered(order, id, pos, 0.0)
    }

    pub fn put_poly_ordered(
        &mut self,
        order: &mut ParticleOrder,
        id: i32,
        pos: [f64; 3],
        radius: f64,
    ) -> Result<bool, VoroError> {
        self.check_radius(id, radius)?;
        self.insert_ordered(order, id, pos, radius)
    }

    fn check_radius(&self, id: i32, radius: f64) -> Result<(), VoroError> {
        if !self.config.poly {
            return Err(VoroError::UnexpectedRadius { id });
        }
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(VoroError::InvalidRadius { id, radius });
        }
        Ok(())
    }

    fn insert_ordered(&mut self, order: &mut ParticleOrder, id: i32, pos: [f64; 3], radius: f64) -> Result<bool, VoroError> {
        match self.insert(id, pos, radius)? {
            Some((r, _)) => {
                order.push(r);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert(&mut self, id: i32, pos: [f64; 3], radius: f64) -> Result<Option<(ParticleRef, [i32; 3])>, VoroError> {
        if id < 0 {
            return Err(VoroError::InvalidId { id });
        }
        let Some((p, image)) = self.lattice.remap(pos) else {
            log::debug!("particle {} at {:?} lies outside the container", id, pos);
            return Ok(None);
        };
        let block = self.grid.index_of(&p);
        let b = &mut self.blocks[block].particles;
        if b.len() == b.capacity() {
            if b.len() >= MAX_PARTICLE_MEMORY {
                log::error!("block {} is full at {} particles", block, b.len());
                return Err(VoroError::BlockOverflow { block, requested: b.len() + 1, limit: MAX_PARTICLE_MEMORY });
            }
            let grown = if b.capacity() == 0 { self.config.init_mem } else { 2 * b.capacity() };
            let grown = grown.min(MAX_PARTICLE_MEMORY);
            b.reserve_exact(grown - b.len());
            log::trace!("block {} grown to {} particles", block, grown);
        }
        b.push(Particle { id, pos: p, radius });
        self.max_radius = self.max_radius.max(radius);
        self.count += 1;
        Ok(Some((ParticleRef { block, index: b.len() - 1 }, image)))
    }

    /// Reads whitespace-separated `id x y z` records (`id x y z r` in
    /// power-diagram mode). Blank lines and lines starting with `#` are
    /// skipped. Returns the number of particles inserted.
    pub fn import<R: BufRead>(&mut self, reader: R) -> Result<usize, VoroError> {
        self.import_with(reader, None)
    }

    pub fn import_ordered<R: BufRead>(&mut self, order: &mut ParticleOrder, reader: R) -> Result<usize, VoroError> {
        self.import_with(reader, Some(order))
    }

    pub fn import_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, VoroError> {
        let file = std::fs::File::open(path)?;
        self.import(std::io::BufReader::new(file))
    }

    fn import_with<R: BufRead>(&mut self, reader: R, mut order: Option<&mut ParticleOrder>) -> Result<usize, VoroError> {
        let fields = if self.config.poly { 5 } else { 4 };
        let mut inserted = 0;
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let parse_err = |reason: String| VoroError::Parse { line: n + 1, reason };
            let tokens: Vec<&str> = text.split_whitespace().collect();
            if tokens.len() != fields {
                return Err(parse_err(format!("expected {} fields, found {}", fields, tokens.len())));
            }
            let id: i32 = tokens[0]
                .parse()
                .map_err(|e| parse_err(format!("bad id {:?}: {}", tokens[0], e)))?;
            let mut values = [0.0; 4];
            for (v, t) in values.iter_mut().zip(&tokens[1..]) {
                *v = t.parse().map_err(|e| parse_err(format!("bad number {:?}: {}", t, e)))?;
            }
            let pos = [values[0], values[1], values[2]];
            let placed = match (order.as_deref_mut(), self.config.poly) {
                (Some(o), true) => self.put_poly_ordered(o, id, pos, values[3])?,
                (Some(o), false) => self.put_ordered(o, id, pos)?,
                (None, true) => self.put_poly(id, pos, values[3])?,
                (None, false) => self.put(id, pos)?,
            };
            if placed {
                inserted += 1;
            }
        }
        log::debug!("imported {} particles", inserted);
        Ok(inserted)
    }

    /// Removes every particle, keeping the block allocations.
    pub fn clear(&mut self) {
        for b in &mut self.blocks {
            b.particles.clear();
        }
        self.count = 0;
        self.max_radius = 0.0;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether `pos` lies in the domain and satisfies every wall.
    pub fn point_inside(&self, pos: &[f64; 3]) -> bool {
        self.lattice.remap(*pos).is_some() && self.walls.iter().all(|w| w.contains(pos))
    }

    /// Inserts `count` uniformly random particles that satisfy every wall,
    /// numbered after the particles already stored. Gives up after
    /// `1000 * count` rejected draws. Returns the number inserted.
    pub fn fill_random<R: Rng>(&mut self, count: usize, rng: &mut R) -> Result<usize, VoroError> {
        let bounds = self.config.bounds;
        let max_attempts = count.saturating_mul(1000);
        let mut next_id = self.count as i32;
        let (mut found, mut attempts) = (0, 0);
        while found < count && attempts < max_attempts {
            attempts += 1;
            let mut p = [0.0; 3];
            for a in 0..3 {
                p[a] = bounds.min[a] + rng.r#gen::<f64>() * bounds.extent(a);
            }
            if !self.walls.iter().all(|w| w.contains(&p)) {
                continue;
            }
            if self.put(next_id, p)? {
                next_id += 1;
                found += 1;
            }
        }
        if found < count {
            log::warn!("placed only {} of {} random particles", found, count);
        }
        Ok(found)
    }

    pub fn particle(&self, r: ParticleRef) -> &Particle {
        &self.blocks[r.block].particles[r.index]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// A scratch cell configured like this container's cells.
    pub fn new_cell(&self) -> Cell {
        let mut cell = Cell::new(self.config.track_neighbors);
        cell.set_tolerance(self.config.tolerance);
        cell
    }

    /// Computes the cell of a stored particle into `cell`.
    /// Returns `Ok(false)` if walls or power cuts removed the cell.
    pub fn compute_cell(&self, cell: &mut Cell, r: ParticleRef) -> Result<bool, VoroError> {
        let p = *self.particle(r);
        self.compute_at(cell, p.pos, p.radius, Some(r), p.id)
    }

    /// Computes the cell a particle at `pos` would have, without inserting it.
    ///
    /// In a fully periodic container, faces shared with the ghost's own
    /// periodic images report [`SELF_IMAGE_ID`] in [`Cell::neighbors`], since
    /// the ghost has no id of its own.
    pub fn compute_ghost_cell(&self, cell: &mut Cell, pos: [f64; 3], radius: f64) -> Result<bool, VoroError> {
        if self.config.poly && !(radius > 0.0 && radius.is_finite()) {
            return Err(VoroError::InvalidRadius { id: -1, radius });
        }
        let Some((g, _)) = self.lattice.remap(pos) else {
            cell.clear();
            return Ok(false);
        };
        let radius = if self.config.poly { radius } else { 0.0 };
        self.compute_at(cell, g, radius, None, -1)
    }

    fn reset_cell(&self, cell: &mut Cell, g: &[f64; 3]) -> Result<(), VoroError> {
        for wall in &self.walls {
            if wall.initial_shape(g, cell)? {
                return Ok(());
            }
        }
        if let Some(unit) = &self.unit_cell {
            cell.copy_from(unit);
            return Ok(());
        }
        let b = &self.config.bounds;
        let (mut lo, mut hi) = ([0.0; 3], [0.0; 3]);
        for a in 0..3 {
            if !self.config.periodic[a] {
                lo[a] = b.min[a] - g[a];
                hi[a] = b.max[a] - g[a];
            } else if self.lattice.is_sheared() {
                lo[a] = -self.image_radius;
                hi[a] = self.image_radius;
            } else {
                lo[a] = -0.5 * b.extent(a);
                hi[a] = 0.5 * b.extent(a);
            }
        }
        cell.init_box(lo, hi)
    }

    fn compute_at(
        &self,
        cell: &mut Cell,
        g: [f64; 3],
        radius: f64,
        own: Option<ParticleRef>,
        id: i32,
    ) -> Result<bool, VoroError> {
        self.reset_cell(cell, &g)?;
        if cell.is_empty() {
            return Ok(false);
        }
        for wall in &self.walls {
            if !wall.cut_cell(cell, &g)? {
                return Ok(false);
            }
        }

        let r2_max = self.max_radius * self.max_radius;
        let ri2 = radius * radius;
        let limit = |rsq: f64| {
            let rho = rsq.sqrt();
            let l = rho + (rsq + r2_max - ri2).max(0.0).sqrt();
            l * l
        };
        let home = self.grid.coords(&g);
        let frac = self.grid.fraction(&g, home);
        let mut limit_sq = limit(cell.max_radius_squared());
        let mut cuts = 0usize;

        let alive = self.grid.walk(home, frac, &mut limit_sq, |vb, limit_sq| {
            for (block, t) in self.lattice.images(vb) {
                let shifted = t != [0.0; 3];
                for (index, q) in self.blocks[block].particles.iter().enumerate() {
                    if !shifted && own == Some(ParticleRef { block, index }) {
                        continue;
                    }
                    let d = [q.pos[0] + t[0] - g[0], q.pos[1] + t[1] - g[1], q.pos[2] + t[2] - g[2]];
                    let d2 = dot(d, d);
                    if d2 == 0.0 {
                        log::warn!("particle {} coincides with generator {}, skipping", q.id, id);
                        continue;
                    }
                    let rsq = d2 + ri2 - q.radius * q.radius;
                    // The plane lies beyond the farthest vertex.
                    if rsq > 0.0 && rsq * rsq > 4.0 * cell.max_radius_squared() * d2 {
                        continue;
                    }
                    cuts += 1;
                    if !cell.cut(d, rsq, q.id)? {
                        return Ok(false);
                    }
                    *limit_sq = limit(cell.max_radius_squared());
                }
            }
            Ok(true)
        })?;

        if alive && own.is_some() && self.unit_cell.is_some() {
            cell.relabel_faces(SELF_IMAGE_ID, id);
        }
        log::trace!("cell {} finished after {} cuts, alive {}", id, cuts, alive);
        Ok(alive)
    }

    /// Finds the particle whose cell contains `pos`: the one of least power
    /// distance `|x - p|^2 - r^2`, which is the nearest particle in a plain
    /// container. Returns `None` if the container is empty or `pos` lies
    /// outside a non-periodic axis.
    pub fn find_voronoi_cell(&self, pos: [f64; 3]) -> Option<Located> {
        if self.count == 0 {
            return None;
        }
        let (p, _) = self.lattice.remap(pos)?;
        let r2_max = self.max_radius * self.max_radius;
        let home = self.grid.coords(&p);
        let frac = self.grid.fraction(&p, home);
        let mut best: Option<(f64, Located)> = None;
        let mut limit_sq = f64::INFINITY;

        let walked = self.grid.walk(home, frac, &mut limit_sq, |vb, limit_sq| {
            for (block, t) in self.lattice.images(vb) {
                for (index, q) in self.blocks[block].particles.iter().enumerate() {
                    let img = [q.pos[0] + t[0], q.pos[1] + t[1], q.pos[2] + t[2]];
                    let d = [img[0] - p[0], img[1] - p[1], img[2] - p[2]];
                    let power = dot(d, d) - q.radius * q.radius;
                    if best.is_none_or(|(b, _)| power < b) {
                        let shifted = [img[0] + pos[0] - p[0], img[1] + pos[1] - p[1], img[2] + pos[2] - p[2]];
                        best = Some((power, Located { id: q.id, pos: shifted, particle: ParticleRef { block, index } }));
                        *limit_sq = power + r2_max;
                    }
                }
            }
            Ok(true)
        });
        if let Err(e) = walked {
            log::error!("point location at {:?} failed: {}", pos, e);
            return None;
        }
        best.map(|(_, l)| l)
    }

    /// Computes every cell in parallel and maps it through `f`.
    ///
    /// Each rayon worker owns one scratch cell. The output follows the
    /// block storage order of [`LoopAll`]; removed cells map to `None`.
    pub fn par_map_cells<T, F>(&self, f: F) -> Result<Vec<Option<T>>, VoroError>
    where
        T: Send,
        F: Fn(&Particle, &Cell) -> T + Sync + Send,
    {
        let refs: Vec<ParticleRef> = LoopAll::new(self).collect();
        refs.into_par_iter()
            .map_init(
                || self.new_cell(),
                |cell, r| {
                    if self.compute_cell(cell, r)? {
                        Ok(Some(f(self.particle(r), cell)))
                    } else {
                        Ok(None)
                    }
                },
            )
            .collect()
    }

    pub fn sum_cell_volumes(&self) -> Result<f64, VoroError> {
        let volumes = self.par_map_cells(|_, cell| cell.volume())?;
        Ok(volumes.into_iter().flatten().sum())
    }

    /// Computes every cell and returns how many survived.
    pub fn compute_all_cells(&self) -> Result<usize, VoroError> {
        let alive = self.par_map_cells(|_, _| ())?;
        Ok(alive.iter().filter(|c| c.is_some()).count())
    }

    /// Volume of the periodic domain or bounding box.
    pub fn total_volume(&self) -> f64 {
        self.config.bounds.volume()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn grid(&self) -> [usize; 3] {
        self.grid.res
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.config.bounds
    }

    pub fn is_periodic(&self, axis: usize) -> bool {
        self.config.periodic[axis]
    }

    pub fn is_poly(&self) -> bool {
        self.config.poly
    }

    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub(crate) fn block_grid(&self) -> &BlockGrid {
        &self.grid
    }

    pub(crate) fn lattice(&self) -> &Lattice {
        &self.lattice
    }
}
