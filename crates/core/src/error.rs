//! Core errors

use thiserror::Error;

/// Errors raised while building or decoding core domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Shape {shape:?} describes {expected} elements, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Shape {shape:?} describes more elements than fit in memory")]
    ShapeOverflow { shape: Vec<usize> },

    #[error("Payload of {actual} bytes does not hold {elements} {element_type} elements")]
    PayloadSize {
        element_type: String,
        elements: usize,
        actual: usize,
    },
}
