//! Restartable traversals over the particles of a [`Container`].
//!
//! Every loop follows the same protocol: [`start`](LoopAll::start) positions it
//! on the first particle, [`advance`](LoopAll::advance) moves to the next one,
//! and both return `false` once the traversal is exhausted. While positioned,
//! the current particle's id, position and radius are read straight from its
//! block. The loops also implement [`Iterator`].

use crate::container::lattice::Image;
use crate::container::{Container, Particle, ParticleRef};
use smallvec::SmallVec;

/// Insertion order recorded by [`Container::put_ordered`].
#[derive(Clone, Debug, Default)]
pub struct ParticleOrder {
    refs: Vec<ParticleRef>,
}

impl ParticleOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self { refs: Vec::with_capacity(n) }
    }

    pub(crate) fn push(&mut self, r: ParticleRef) {
        self.refs.push(r);
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn clear(&mut self) {
        self.refs.clear();
    }

    pub fn as_slice(&self) -> &[ParticleRef] {
        &self.refs
    }
}

/// Visits every particle once, in block storage order.
pub struct LoopAll<'a> {
    con: &'a Container,
    cur: Option<ParticleRef>,
    fresh: bool,
}

impl<'a> LoopAll<'a> {
    pub fn new(con: &'a Container) -> Self {
        Self { con, cur: None, fresh: true }
    }

    pub fn start(&mut self) -> bool {
        self.fresh = false;
        self.cur = self.seek(0, 0);
        self.cur.is_some()
    }

    pub fn advance(&mut self) -> bool {
        self.cur = self.cur.and_then(|r| self.seek(r.block, r.index + 1));
        self.cur.is_some()
    }

    fn seek(&self, mut block: usize, mut index: usize) -> Option<ParticleRef> {
        let blocks = self.con.blocks();
        while block < blocks.len() {
            if index < blocks[block].len() {
                return Some(ParticleRef { block, index });
            }
            block += 1;
            index = 0;
        }
        None
    }

    pub fn current(&self) -> Option<ParticleRef> {
        self.cur
    }

    pub fn particle(&self) -> Option<&'a Particle> {
        let con = self.con;
        self.cur.map(|r| con.particle(r))
    }

    pub fn id(&self) -> Option<i32> {
        self.particle().map(|p| p.id)
    }

    pub fn pos(&self) -> Option<[f64; 3]> {
        self.particle().map(|p| p.pos)
    }

    pub fn radius(&self) -> Option<f64> {
        self.particle().map(|p| p.radius)
    }
}

impl Iterator for LoopAll<'_> {
    type Item = ParticleRef;

    fn next(&mut self) -> Option<ParticleRef> {
        let moved = if self.fresh { self.start() } else { self.advance() };
        if moved { self.cur } else { None }
    }
}

/// Replays the order recorded in a [`ParticleOrder`].
pub struct LoopOrder<'a> {
    con: &'a Container,
    order: &'a ParticleOrder,
    next: usize,
    fresh: bool,
}

impl<'a> LoopOrder<'a> {
    pub fn new(con: &'a Container, order: &'a ParticleOrder) -> Self {
        Self { con, order, next: 0, fresh: true }
    }

    pub fn start(&mut self) -> bool {
        self.fresh = false;
        self.next = 1;
        !self.order.is_empty()
    }

    pub fn advance(&mut self) -> bool {
        if self.next <= self.order.len() {
            self.next += 1;
        }
        self.next <= self.order.len()
    }

    pub fn current(&self) -> Option<ParticleRef> {
        self.next.checked_sub(1).and_then(|i| self.order.refs.get(i)).copied()
    }

    pub fn particle(&self) -> Option<&'a Particle> {
        let con = self.con;
        self.current().map(|r| con.particle(r))
    }

    pub fn id(&self) -> Option<i32> {
        self.particle().map(|p| p.id)
    }

    pub fn pos(&self) -> Option<[f64; 3]> {
        self.particle().map(|p| p.pos)
    }

    pub fn radius(&self) -> Option<f64> {
        self.particle().map(|p| p.radius)
    }
}

impl Iterator for LoopOrder<'_> {
    type Item = ParticleRef;

    fn next(&mut self) -> Option<ParticleRef> {
        let moved = if self.fresh { self.start() } else { self.advance() };
        if moved { self.current() } else { None }
    }
}

#[derive(Clone, Copy, Debug)]
enum Region {
    Blocks,
    Sphere { center: [f64; 3], r2: f64 },
    Box { min: [f64; 3], max: [f64; 3] },
}

/// Visits the particles of the blocks overlapping a region, optionally
/// keeping only those inside it.
///
/// In periodic containers the region may extend past the domain; particles
/// are then reported at the position of the periodic image that falls in the
/// region.
pub struct LoopSubset<'a> {
    con: &'a Container,
    region: Region,
    bounds_test: bool,
    lo: [i32; 3],
    hi: [i32; 3],
    vb: Option<[i32; 3]>,
    images: SmallVec<[Image; 4]>,
    image: usize,
    index: usize,
    cur: Option<(ParticleRef, [f64; 3])>,
    fresh: bool,
}

impl<'a> LoopSubset<'a> {
    pub fn new(con: &'a Container) -> Self {
        Self {
            con,
            region: Region::Blocks,
            bounds_test: false,
            lo: [0; 3],
            hi: [-1; 3],
            vb: None,
            images: SmallVec::new(),
            image: 0,
            index: 0,
            cur: None,
            fresh: true,
        }
    }

    /// Restricts the loop to a sphere. With `bounds_test` off, every particle
    /// of the overlapped blocks is visited.
    pub fn setup_sphere(&mut self, center: [f64; 3], r: f64, bounds_test: bool) {
        let min = [center[0] - r, center[1] - r, center[2] - r];
        let max = [center[0] + r, center[1] + r, center[2] + r];
        self.set_block_range(&min, &max);
        self.region = Region::Sphere { center, r2: r * r };
        self.bounds_test = bounds_test;
    }

    pub fn setup_box(&mut self, min: [f64; 3], max: [f64; 3], bounds_test: bool) {
        self.set_block_range(&min, &max);
        self.region = Region::Box { min, max };
        self.bounds_test = bounds_test;
    }

    /// Restricts the loop to an inclusive range of block coordinates, which
    /// may leave the grid along periodic axes.
    pub fn setup_intbox(&mut self, lo: [i32; 3], hi: [i32; 3]) {
        let grid = self.con.block_grid();
        for a in 0..3 {
            let (mut l, mut h) = (lo[a], hi[a]);
            if !grid.periodic[a] {
                l = l.max(0);
                h = h.min(grid.res[a] as i32 - 1);
            }
            self.lo[a] = l;
            self.hi[a] = h;
        }
        self.region = Region::Blocks;
        self.bounds_test = false;
        self.reset();
    }

    fn set_block_range(&mut self, min: &[f64; 3], max: &[f64; 3]) {
        let grid = self.con.block_grid();
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        for a in 0..3 {
            lo[a] = ((min[a] - grid.min[a]) * grid.scale[a]).floor() as i32;
            hi[a] = ((max[a] - grid.min[a]) * grid.scale[a]).floor() as i32;
        }
        self.setup_intbox(lo, hi);
    }

    fn reset(&mut self) {
        self.vb = None;
        self.images.clear();
        self.image = 0;
        self.index = 0;
        self.cur = None;
        self.fresh = true;
    }

    pub fn start(&mut self) -> bool {
        self.reset();
        self.fresh = false;
        self.step()
    }

    pub fn advance(&mut self) -> bool {
        if self.cur.is_none() {
            return false;
        }
        self.step()
    }

    fn next_block(&mut self) -> bool {
        if (0..3).any(|a| self.lo[a] > self.hi[a]) {
            return false;
        }
        let vb = match self.vb {
            None => self.lo,
            Some(mut vb) => {
                let mut a = 0;
                loop {
                    if a == 3 {
                        return false;
                    }
                    vb[a] += 1;
                    if vb[a] <= self.hi[a] {
                        break;
                    }
                    vb[a] = self.lo[a];
                    a += 1;
                }
                vb
            }
        };
        self.images = self.con.lattice().images(vb);
        self.vb = Some(vb);
        self.image = 0;
        self.index = 0;
        true
    }

    fn step(&mut self) -> bool {
        let con = self.con;
        loop {
            let Some(&(block, t)) = self.images.get(self.image) else {
                if !self.next_block() {
                    self.cur = None;
                    return false;
                }
                continue;
            };
            let particles = con.blocks()[block].particles();
            if self.index >= particles.len() {
                self.image += 1;
                self.index = 0;
                continue;
            }
            let index = self.index;
            self.index += 1;
            let q = &particles[index];
            let p = [q.pos[0] + t[0], q.pos[1] + t[1], q.pos[2] + t[2]];
            if !self.owns(&p) || (self.bounds_test && !self.inside(&p)) {
                continue;
            }
            self.cur = Some((ParticleRef { block, index }, p));
            return true;
        }
    }

    /// Under shear a real block's image may straddle several virtual blocks;
    /// report it only from the one holding the image position.
    fn owns(&self, p: &[f64; 3]) -> bool {
        let (Some(vb), true) = (self.vb, self.con.lattice().is_sheared()) else {
            return true;
        };
        let grid = self.con.block_grid();
        (0..3).all(|a| {
            let mut c = ((p[a] - grid.min[a]) * grid.scale[a]).floor() as i32;
            if !grid.periodic[a] {
                c = c.clamp(0, grid.res[a] as i32 - 1);
            }
            c == vb[a]
        })
    }

    fn inside(&self, p: &[f64; 3]) -> bool {
        match self.region {
            Region::Blocks => true,
            Region::Sphere { center, r2 } => {
                let d = [p[0] - center[0], p[1] - center[1], p[2] - center[2]];
                d[0] * d[0] + d[1] * d[1] + d[2] * d[2] <= r2
            }
            Region::Box { min, max } => (0..3).all(|a| p[a] >= min[a] && p[a] <= max[a]),
        }
    }

    pub fn current(&self) -> Option<ParticleRef> {
        self.cur.map(|(r, _)| r)
    }

    pub fn particle(&self) -> Option<&'a Particle> {
        let con = self.con;
        self.current().map(|r| con.particle(r))
    }

    pub fn id(&self) -> Option<i32> {
        self.particle().map(|p| p.id)
    }

    /// Position of the current particle's image inside the region.
    pub fn pos(&self) -> Option<[f64; 3]> {
        self.cur.map(|(_, p)| p)
    }

    pub fn radius(&self) -> Option<f64> {
        self.particle().map(|p| p.radius)
    }
}

impl Iterator for LoopSubset<'_> {
    type Item = (ParticleRef, [f64; 3]);

    fn next(&mut self) -> Option<Self::Item> {
        let moved = if self.fresh { self.start() } else { self.advance() };
        if moved { self.cur } else { None }
    }
}
