//! `fukubiki`: weighted random selection.
//!
//! Picks one element of a slice (or one entry of a map) with probability
//! proportional to its weight. Weights may be integers, floats, decimals or
//! numeric strings; a collection always uses a single representation, chosen
//! by its type.
//!
//! Exposed modules:
//! - `coerce`: weight kinds, accumulation domains and the `Weight` trait.
//! - `extract`: where weights come from (`Direct`, `By`, `Named`).
//! - `sampler`: the cumulative-scan sampler and `WeightedSampler`.
//! - `map`: key/value sampling over a single-pass `MapSnapshot`.
//!
//! ```
//! use fukubiki::{sample_index_with_rng, SampleError};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let i = sample_index_with_rng(&[1u32, 3, 6], &mut rng)?;
//! assert!(i < 3);
//! # Ok::<(), SampleError>(())
//! ```

#![forbid(unsafe_code)]

pub mod coerce;
pub mod error;
pub mod extract;
pub mod map;
pub mod sampler;

pub use coerce::{Domain, Weight, WeightKind, Weights};
pub use error::SampleError;
pub use extract::{By, Direct, Field, FieldAccessor, Named, WeightExtractor};
pub use map::{
    sample_key, sample_key_by, sample_key_by_key, sample_key_by_key_with_rng, sample_key_keyed_by,
    sample_key_with_rng, sample_value, sample_value_by, sample_value_by_key,
    sample_value_by_key_with_rng, sample_value_keyed_by, sample_value_with_rng, MapSnapshot,
};
pub use sampler::{
    sample, sample_by, sample_index, sample_index_by, sample_index_with_rng, sample_with_rng,
    WeightedSampler,
};
