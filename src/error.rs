//! Errors for weighted selection.

use thiserror::Error;

/// Why a sampling call was rejected.
///
/// Every variant is a deterministic function of the input: the same
/// collection sampled the same way fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    /// The weight source is not integer, float/decimal or numeric text.
    #[error("weight source `{source_name}` is not numeric")]
    NonNumericWeight { source_name: String },

    /// The element type has no field with this name.
    #[error("type `{type_name}` has no field `{field}`")]
    FieldNotFound {
        field: String,
        type_name: &'static str,
    },

    /// String weights were used and this element's string is not a number.
    #[error("string weight at index {index} does not parse as a number")]
    MixedRepresentationRejected { index: usize },

    /// Weights sum to zero, so there is nothing to draw from.
    #[error("weights sum to zero")]
    ZeroTotalWeight,

    /// No elements.
    #[error("cannot sample from an empty collection")]
    EmptyCollection,

    /// Weight is below zero.
    #[error("weight at index {index} is negative")]
    NegativeWeight { index: usize },

    /// Weight is NaN or infinite.
    #[error("weight at index {index} is not finite")]
    NonFiniteWeight { index: usize },

    /// A weight or the running total does not fit the accumulation domain.
    #[error("weights overflow the accumulation domain")]
    WeightOverflow,
}
