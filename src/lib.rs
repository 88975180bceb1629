//! # vorotess
//!
//! `vorotess` computes 3D Voronoi and power (Laguerre) tessellations cell by
//! cell. It is usable from Rust and, through `wasm-bindgen`, from JavaScript.
//!
//! ## Features
//!
//! - **Cell kernel**: convex polyhedra stored as vertex graphs, clipped by
//!   half-spaces, with volume, area, centroid, neighbor and Minkowski readouts.
//! - **Block grid**: particles bucketed in a uniform grid searched block by
//!   block in order of distance, stopping once no further particle can cut.
//! - **Periodic domains**: any combination of periodic axes, including
//!   sheared (parallelepiped) lattices.
//! - **Walls**: planes, spheres, shells, cylinders, cones, convex polyhedra
//!   and custom starting shapes.
//! - **Parallel**: whole-container computations run on `rayon`, one scratch
//!   cell per worker.
//!
//! ## Example
//!
//! ```
//! use vorotess::{BoundingBox, Container, ContainerConfig};
//!
//! let config = ContainerConfig::new(BoundingBox::new([0.0; 3], [2.0; 3])).grid(2, 2, 2);
//! let mut con = Container::new(config).unwrap();
//! for (id, x) in [0.5, 1.5].into_iter().enumerate() {
//!     con.put(id as i32, [x, 1.0, 1.0]).unwrap();
//! }
//! assert!((con.sum_cell_volumes().unwrap() - 8.0).abs() < 1e-10);
//! ```

pub mod bounds;
pub mod cell;
pub mod container;
pub mod error;
pub mod loops;
pub mod wall;
pub mod wasm;

pub use bounds::{
    BoundingBox, BOX_ID_BACK, BOX_ID_BOTTOM, BOX_ID_FRONT, BOX_ID_LEFT, BOX_ID_RIGHT, BOX_ID_TOP,
};
pub use cell::{Cell, DEFAULT_TOLERANCE};
pub use container::config::{guess_grid, ContainerConfig, DEFAULT_INIT_MEM, MAX_PARTICLE_MEMORY};
pub use container::{Block, Container, Located, Particle, ParticleRef, SELF_IMAGE_ID};
pub use error::VoroError;
pub use loops::{LoopAll, LoopOrder, LoopSubset, ParticleOrder};
pub use wall::geometries;
pub use wall::{Wall, WallGeometry, WALL_ID_MAX};
