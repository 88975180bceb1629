use thiserror::Error;

/// Errors reported by cell construction, walls and the container.
#[derive(Debug, Error)]
pub enum VoroError {
    #[error("bounds along axis {axis} are degenerate: [{min}, {max}]")]
    DegenerateBounds { axis: usize, min: f64, max: f64 },

    #[error("grid resolution must be at least one block per axis, got {nx}x{ny}x{nz}")]
    InvalidGrid { nx: usize, ny: usize, nz: usize },

    #[error("shear component {component} = {value} requires periodicity along {axes}")]
    InvalidShear { component: &'static str, value: f64, axes: &'static str },

    #[error("particle {id} has non-positive or non-finite radius {radius}")]
    InvalidRadius { id: i32, radius: f64 },

    #[error("particle {id} was given a radius but the container is not in power-diagram mode")]
    UnexpectedRadius { id: i32 },

    #[error("particle ids must be non-negative, got {id}")]
    InvalidId { id: i32 },

    #[error("wall id {id} must be <= {max}")]
    InvalidWallId { id: i32, max: i32 },

    #[error("block {block} cannot grow to {requested} particles (limit {limit})")]
    BlockOverflow { block: usize, requested: usize, limit: usize },

    #[error("cut by {id} at offset {offset} removed a cell that strictly contains its generator")]
    EmptiedCell { id: i32, offset: f64 },

    #[error("cell topology broke while cutting by {id}: {reason}")]
    Topology { id: i32, reason: &'static str },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
