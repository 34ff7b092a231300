//! Error types for tessel.
//!
//! Predicates never fail: geometric ambiguity (collinear, cocircular, coplanar)
//! is reported through tri-state return values. Everything in this module is a
//! structural or input failure.

use thiserror::Error;

use crate::mesh::HalfEdgeId;

/// Result type alias using [`GeometryError`].
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Errors that can occur while building or editing geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The input cannot produce the requested structure: too few points, a
    /// zero-extent bounding box, or all points collinear/coplanar.
    #[error("degenerate input: {reason}")]
    DegenerateInput {
        /// What made the input degenerate.
        reason: String,
    },

    /// An edge flip was requested on an edge that cannot be flipped.
    #[error("half-edge {halfedge:?} cannot be flipped: {reason}")]
    NotFlippable {
        /// The half-edge passed to the flip.
        halfedge: HalfEdgeId,
        /// Why the flip was rejected.
        reason: &'static str,
    },

    /// Two forced edges cross or overlap.
    #[error("constraint edges {first} and {second} intersect")]
    ConflictingConstraints {
        /// Index of the first conflicting constraint.
        first: usize,
        /// Index of the second conflicting constraint.
        second: usize,
    },

    /// A bounded loop hit its safety cap.
    #[error("{operation} exceeded its limit of {limit} iterations")]
    IterationLimitExceeded {
        /// The operation that gave up.
        operation: &'static str,
        /// The configured cap.
        limit: usize,
    },

    /// An internal consistency check failed. This is always a bug.
    #[error("mesh invariant violated: {0}")]
    InvariantViolation(String),

    /// A point lies outside the region covered by the triangulation.
    #[error("point ({x}, {y}) lies outside the triangulated domain")]
    OutsideDomain {
        /// X coordinate of the offending point.
        x: f64,
        /// Y coordinate of the offending point.
        y: f64,
    },

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl GeometryError {
    /// Create a degenerate input error.
    pub fn degenerate(reason: impl Into<String>) -> Self {
        GeometryError::DegenerateInput {
            reason: reason.into(),
        }
    }

    /// Create an invariant violation, logging it at error level first.
    pub fn invariant(details: impl Into<String>) -> Self {
        let details = details.into();
        log::error!("mesh invariant violated: {details}");
        GeometryError::InvariantViolation(details)
    }

    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        GeometryError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Whether the caller can reasonably recover from this error.
    ///
    /// Only [`GeometryError::InvariantViolation`] is unrecoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GeometryError::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = GeometryError::degenerate("fewer than 3 points");
        assert_eq!(err.to_string(), "degenerate input: fewer than 3 points");

        let err = GeometryError::IterationLimitExceeded {
            operation: "jarvis march",
            limit: 10,
        };
        assert_eq!(err.to_string(), "jarvis march exceeded its limit of 10 iterations");
    }

    #[test]
    fn test_recoverable() {
        assert!(GeometryError::degenerate("x").is_recoverable());
        assert!(!GeometryError::invariant("twin mismatch").is_recoverable());
    }
}
