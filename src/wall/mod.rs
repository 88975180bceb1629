pub mod geometries;

use crate::cell::Cell;
use crate::error::VoroError;

/// The maximum ID for walls. Wall IDs must be less than or equal to this value
/// to avoid conflicts with non-negative particle IDs and the box side IDs.
pub const WALL_ID_MAX: i32 = -1000;

/// A boundary constraint on the tessellation.
///
/// A `Wall` wraps a `WallGeometry` implementation and gives it a unique
/// integer ID. This ID is reported by [`Cell::neighbors`] for faces that were
/// created by this wall.
#[derive(Debug)]
pub struct Wall {
    id: i32,
    inner: Box<dyn WallGeometry>,
}

impl Wall {
    /// Creates a new `Wall` from anything implementing `WallGeometry`.
    pub fn new(id: i32, geometry: Box<dyn WallGeometry>) -> Result<Self, VoroError> {
        if id > WALL_ID_MAX {
            return Err(VoroError::InvalidWallId { id, max: WALL_ID_MAX });
        }
        Ok(Self { id, inner: geometry })
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn geometry(&self) -> &dyn WallGeometry {
        self.inner.as_ref()
    }

    pub fn contains(&self, point: &[f64; 3]) -> bool {
        self.inner.contains(point)
    }

    /// Lets the wall replace the default box as the starting shape of `cell`.
    pub fn initial_shape(&self, generator: &[f64; 3], cell: &mut Cell) -> Result<bool, VoroError> {
        self.inner.initial_shape(generator, self.id, cell)
    }

    /// Clips `cell`, whose generator sits at `generator`, by every plane the
    /// geometry produces. Returns `Ok(false)` if the cell was removed.
    pub fn cut_cell(&self, cell: &mut Cell, generator: &[f64; 3]) -> Result<bool, VoroError> {
        let mut outcome = Ok(true);
        // Once the cell is gone or a cut failed, the remaining planes are
        // still emitted by the geometry but no longer applied.
        self.inner.cut(generator, &mut |point, normal| {
            if let Ok(true) = outcome {
                let rel = [
                    point[0] - generator[0],
                    point[1] - generator[1],
                    point[2] - generator[2],
                ];
                outcome = cell.cut_through(rel, normal, self.id);
            }
        });
        outcome
    }
}

/// Trait defining the geometry and logic of a wall.
/// Must be Send + Sync so a container can be shared between worker threads.
pub trait WallGeometry: Send + Sync + std::fmt::Debug {
    /// Checks if a point is inside the valid region defined by the wall.
    fn contains(&self, point: &[f64; 3]) -> bool;

    /// Emits the clipping planes for a given generator as (point_on_plane, plane_normal).
    /// The normal points OUT of the valid region (towards the region to be clipped).
    /// Planes emitted after one of them has removed the cell are ignored.
    fn cut(&self, generator: &[f64; 3], callback: &mut dyn FnMut([f64; 3], [f64; 3]));

    /// Resets `cell` to a wall-supplied starting polyhedron instead of the
    /// container box. Returns false if the geometry has no such shape.
    fn initial_shape(&self, _generator: &[f64; 3], _id: i32, _cell: &mut Cell) -> Result<bool, VoroError> {
        Ok(false)
    }
}
