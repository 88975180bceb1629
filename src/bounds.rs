use crate::error::VoroError;

/// Face ID of the box side at minimum x, it is negative to prevent conflicts with particle IDs.
pub const BOX_ID_LEFT: i32 = -1;
/// Face ID of the box side at maximum x, it is negative to prevent conflicts with particle IDs.
pub const BOX_ID_RIGHT: i32 = -2;
/// Face ID of the box side at minimum y, it is negative to prevent conflicts with particle IDs.
pub const BOX_ID_FRONT: i32 = -3;
/// Face ID of the box side at maximum y, it is negative to prevent conflicts with particle IDs.
pub const BOX_ID_BACK: i32 = -4;
/// Face ID of the box side at minimum z, it is negative to prevent conflicts with particle IDs.
pub const BOX_ID_BOTTOM: i32 = -5;
/// Face ID of the box side at maximum z, it is negative to prevent conflicts with particle IDs.
pub const BOX_ID_TOP: i32 = -6;

/// Returns the face ID of a box side.
///
/// # Arguments
///
/// * `axis` - 0, 1 or 2 for x, y and z.
/// * `is_max` - whether the side lies at the maximum of the axis.
pub fn box_side(axis: usize, is_max: bool) -> i32 {
    -1 - (axis as i32 * 2 + is_max as i32)
}

/// Axis-aligned bounding box of the simulation domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// Checks that every axis has a strictly positive, finite extent.
    pub fn validate(&self) -> Result<(), VoroError> {
        for axis in 0..3 {
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
                return Err(VoroError::DegenerateBounds { axis, min: lo, max: hi });
            }
        }
        Ok(())
    }

    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    pub fn volume(&self) -> f64 {
        self.extent(0) * self.extent(1) * self.extent(2)
    }

    pub fn contains(&self, p: &[f64; 3]) -> bool {
        (0..3).all(|a| p[a] >= self.min[a] && p[a] <= self.max[a])
    }

    pub fn center(&self) -> [f64; 3] {
        [
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
            0.5 * (self.min[2] + self.max[2]),
        ]
    }
}
