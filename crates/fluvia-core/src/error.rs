//! Engine error type. Every failure mode is a precondition violation:
//! an analysis asked to run on nothing, or before its inputs exist.
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HydrologyError {
    /// An input grid (usually the heightmap) has zero size.
    #[error("{what} is empty")]
    EmptyGrid { what: &'static str },

    /// A derived grid required by this analysis has not been computed yet.
    #[error("{needed} has not been computed; run it before {before}")]
    MissingPrerequisite {
        needed: &'static str,
        before: &'static str,
    },
}
