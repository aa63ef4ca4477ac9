//! Error types for cloth setup and configuration.
//!
//! Only the configuration boundary is fallible. Once a cloth is accepted by
//! the solver, simulation never returns an error.

use thiserror::Error;

use crate::solver::ClothId;

/// Errors raised while building fabrics, configuring cloths, or addressing
/// cloths inside a solver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClothError {
    /// A fixed-width collection would overflow its bitmask.
    #[error("too many {what}: {count} exceeds the maximum of {max}")]
    CapacityExceeded {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// Two buffers that must have equal length do not.
    #[error("{what}: expected {expected} elements, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An index refers past the end of the data it addresses.
    #[error("{what}: index {index} out of range for length {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Fabric topology is malformed.
    #[error("invalid fabric: {0}")]
    InvalidFabric(String),

    /// A scalar parameter is outside its valid range.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    /// The handle does not refer to a cloth owned by this solver.
    #[error("no cloth with id {0:?}")]
    ClothNotFound(ClothId),
}

/// Convenience alias for `Result<T, ClothError>`.
pub type ClothResult<T> = Result<T, ClothError>;

/// Fails with [`ClothError::CapacityExceeded`] if `count > max`.
pub(crate) fn check_capacity(what: &'static str, count: usize, max: usize) -> ClothResult<()> {
    if count > max {
        return Err(ClothError::CapacityExceeded { what, count, max });
    }
    Ok(())
}

/// Fails with [`ClothError::SizeMismatch`] if the lengths differ.
pub(crate) fn check_size(what: &'static str, expected: usize, actual: usize) -> ClothResult<()> {
    if expected != actual {
        return Err(ClothError::SizeMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Fails with [`ClothError::IndexOutOfRange`] if any index is `>= len`.
pub(crate) fn check_indices<I>(what: &'static str, indices: I, len: usize) -> ClothResult<()>
where
    I: IntoIterator<Item = u32>,
{
    for index in indices {
        if index as usize >= len {
            return Err(ClothError::IndexOutOfRange {
                what,
                index: index as usize,
                len,
            });
        }
    }
    Ok(())
}
