//! Error types for jarfill.
//!
//! None of these abort a whole fill. The session reports them per substance
//! or per step and carries on with whatever is still valid.

use crate::substance::SubstanceId;
use std::fmt;

/// Errors raised while configuring, sampling or capping a fill.
#[derive(Debug)]
pub enum FillError {
    /// A band percentage was outside `[0, 100]` or not finite.
    InvalidPercent {
        /// The offending value.
        value: f32,
    },
    /// Band start lies above band end.
    InvalidBand {
        /// Start percentage.
        start: f32,
        /// End percentage.
        end: f32,
    },
    /// Density is zero, negative or not finite.
    InvalidDensity {
        /// The offending density.
        density: f32,
    },
    /// The height bucket closest to the cap height has too few vertices.
    DegenerateCap {
        /// Vertices found in the bucket.
        vertex_count: usize,
    },
    /// The container has no vertices to build a cap from.
    EmptyContainer,
    /// The surface has no area to sample.
    ZeroArea,
    /// The session already holds the maximum number of substances.
    TooManySubstances {
        /// Session limit.
        max: usize,
    },
    /// No substance with this id is part of the session.
    UnknownSubstance(SubstanceId),
    /// Failed to parse a configuration document.
    Config(serde_json::Error),
    /// Failed to read a configuration file.
    Io(std::io::Error),
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillError::InvalidPercent { value } => {
                write!(f, "Fill percentage {} is outside 0..=100", value)
            }
            FillError::InvalidBand { start, end } => {
                write!(f, "Band start {}% lies above band end {}%", start, end)
            }
            FillError::InvalidDensity { density } => {
                write!(f, "Density {} must be a positive number of particles per percent", density)
            }
            FillError::DegenerateCap { vertex_count } => write!(
                f,
                "Cannot build a top surface from {} vertices, at least 3 are required",
                vertex_count
            ),
            FillError::EmptyContainer => write!(f, "Container surface has no vertices"),
            FillError::ZeroArea => write!(f, "Surface has zero area and cannot be sampled"),
            FillError::TooManySubstances { max } => {
                write!(f, "Cannot add more than {} substances to a jar", max)
            }
            FillError::UnknownSubstance(id) => write!(f, "No substance with id {}", id),
            FillError::Config(e) => write!(f, "Failed to parse fill configuration: {}", e),
            FillError::Io(e) => write!(f, "Failed to read fill configuration: {}", e),
        }
    }
}

impl std::error::Error for FillError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FillError::Config(e) => Some(e),
            FillError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FillError {
    fn from(e: serde_json::Error) -> Self {
        FillError::Config(e)
    }
}

impl From<std::io::Error> for FillError {
    fn from(e: std::io::Error) -> Self {
        FillError::Io(e)
    }
}
