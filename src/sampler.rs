//! Weighted selection of one element.
//!
//! Picks index `i` with probability `w[i] / sum(w)`:
//!
//! 1. coerce every weight into one domain and sum them (checked),
//! 2. draw `r` uniformly from `[0, total)`,
//! 3. scan in order, returning the first `i` whose weight exceeds what is
//!    left of `r`.
//!
//! Integer draws use Lemire's multiply-and-reject reduction (Lemire, 2019,
//! *Fast Random Integer Generation in an Interval*), so there is no modulo
//! bias for totals that do not divide 2^64. Decimal weights are rescaled to
//! integer units at one common scale and drawn the same way over `u128`, so
//! they are exact at every magnitude `Decimal` can hold.
//!
//! Notes:
//! - `*_with_rng` / `*_by` entrypoints take the RNG explicitly; the plain
//!   functions call `rand::rng()` and are not reproducible.

use std::ops::Sub;

use rand::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::coerce::{Weight, Weights};
use crate::error::SampleError;
use crate::extract::{Direct, WeightExtractor};

/// Uniform integer in `[0, bound)`.
///
/// # Panics
///
/// Panics if `bound == 0`.
pub fn bounded_u64<R: RngCore + ?Sized>(rng: &mut R, bound: u64) -> u64 {
    assert!(bound > 0, "bounded_u64: bound must be > 0");
    let mut m = u128::from(rng.next_u64()) * u128::from(bound);
    let mut low = m as u64;
    if low < bound {
        // 2^64 mod bound: the number of low products to reject.
        let threshold = bound.wrapping_neg() % bound;
        while low < threshold {
            m = u128::from(rng.next_u64()) * u128::from(bound);
            low = m as u64;
        }
    }
    (m >> 64) as u64
}

/// Uniform integer in `[0, bound)` for 128-bit bounds.
///
/// Bounds that fit in `u64` go through [`bounded_u64`]; wider bounds use
/// masked rejection, which needs fewer than two tries on average.
///
/// # Panics
///
/// Panics if `bound == 0`.
pub fn bounded_u128<R: RngCore + ?Sized>(rng: &mut R, bound: u128) -> u128 {
    assert!(bound > 0, "bounded_u128: bound must be > 0");
    if let Ok(narrow) = u64::try_from(bound) {
        return u128::from(bounded_u64(rng, narrow));
    }
    let mask = u128::MAX >> (bound - 1).leading_zeros();
    loop {
        let x = ((u128::from(rng.next_u64()) << 64) | u128::from(rng.next_u64())) & mask;
        if x < bound {
            return x;
        }
    }
}

/// Weights as integer multiples of `10^-scale`, with their total.
///
/// `None` if a unit count or the total does not fit in `u128`. Weights finer
/// than `scale` are truncated.
fn units_at(weights: &[Decimal], scale: u32) -> Option<(Vec<u128>, u128)> {
    let mut total = 0u128;
    let mut units = Vec::with_capacity(weights.len());
    for w in weights {
        let mantissa = u128::try_from(w.mantissa()).ok()?;
        let u = if scale >= w.scale() {
            mantissa.checked_mul(10u128.checked_pow(scale - w.scale())?)?
        } else {
            mantissa / 10u128.pow(w.scale() - scale)
        };
        total = total.checked_add(u)?;
        units.push(u);
    }
    Some((units, total))
}

/// Integer units at the finest scale whose total fits in `u128`.
fn common_units(weights: &[Decimal]) -> Result<(Vec<u128>, u128), SampleError> {
    let finest = weights.iter().map(Decimal::scale).max().unwrap_or(0);
    (0..=finest)
        .rev()
        .find_map(|scale| units_at(weights, scale))
        .ok_or_else(|| {
            debug!(len = weights.len(), "decimal weights overflow");
            SampleError::WeightOverflow
        })
}

/// Index selected by `draw` under the cumulative scan.
///
/// If `draw` is not below the total, the last positive weight is selected.
pub fn locate<T>(weights: &[T], draw: T) -> usize
where
    T: Copy + Default + PartialOrd + Sub<Output = T>,
{
    let mut remainder = draw;
    for (i, &w) in weights.iter().enumerate() {
        if remainder < w {
            return i;
        }
        remainder = remainder - w;
    }
    let zero = T::default();
    weights
        .iter()
        .rposition(|&w| w > zero)
        .unwrap_or(weights.len().saturating_sub(1))
}

fn select<R: RngCore + ?Sized>(weights: &Weights, rng: &mut R) -> Result<usize, SampleError> {
    let index = match weights {
        Weights::Unsigned(w) => {
            let total = w
                .iter()
                .try_fold(0u64, |acc, &x| acc.checked_add(x))
                .ok_or_else(|| {
                    debug!(len = w.len(), "integer weights overflow u64");
                    SampleError::WeightOverflow
                })?;
            if total == 0 {
                debug!(len = w.len(), "integer weights sum to zero");
                return Err(SampleError::ZeroTotalWeight);
            }
            let draw = bounded_u64(rng, total);
            trace!(total, draw, "integer draw");
            locate(w, draw)
        }
        Weights::Decimal(w) => {
            let (units, total) = common_units(w)?;
            if total == 0 {
                debug!(len = w.len(), "decimal weights sum to zero");
                return Err(SampleError::ZeroTotalWeight);
            }
            let draw = bounded_u128(rng, total);
            trace!(%total, %draw, "decimal draw");
            locate(&units, draw)
        }
    };
    trace!(index, "selected");
    Ok(index)
}

/// Sample an index of `items`, reading weights with `extractor`.
///
/// A single element is returned without reading its weight and without
/// consuming randomness.
pub fn sample_index_by<T, E, R>(items: &[T], extractor: &E, rng: &mut R) -> Result<usize, SampleError>
where
    E: WeightExtractor<T> + ?Sized,
    R: Rng + ?Sized,
{
    sample_index_iter(items.iter(), extractor, rng)
}

/// Shared path for slices and map snapshots.
pub(crate) fn sample_index_iter<'a, T, I, E, R>(
    items: I,
    extractor: &E,
    rng: &mut R,
) -> Result<usize, SampleError>
where
    T: 'a + ?Sized,
    I: IntoIterator<Item = &'a T>,
    I::IntoIter: ExactSizeIterator,
    E: WeightExtractor<T> + ?Sized,
    R: Rng + ?Sized,
{
    let items = items.into_iter();
    let len = items.len();
    if len == 0 {
        return Err(SampleError::EmptyCollection);
    }
    let domain = extractor.domain()?;
    trace!(len, ?domain, "weighted sample");
    if len == 1 {
        return Ok(0);
    }
    let weights = extractor.weights(items)?;
    debug_assert_eq!(weights.len(), len);
    debug_assert_eq!(weights.domain(), domain);
    select(&weights, rng)
}

/// Sample an index of `items`, each element being its own weight.
pub fn sample_index<W: Weight>(items: &[W]) -> Result<usize, SampleError> {
    let mut rng = rand::rng();
    sample_index_with_rng(items, &mut rng)
}

/// [`sample_index`] with a caller-supplied RNG.
pub fn sample_index_with_rng<W, R>(items: &[W], rng: &mut R) -> Result<usize, SampleError>
where
    W: Weight,
    R: Rng + ?Sized,
{
    sample_index_by(items, &Direct, rng)
}

/// Sample an element of `items`, reading weights with `extractor`.
pub fn sample_by<'a, T, E, R>(items: &'a [T], extractor: &E, rng: &mut R) -> Result<&'a T, SampleError>
where
    E: WeightExtractor<T> + ?Sized,
    R: Rng + ?Sized,
{
    sample_index_by(items, extractor, rng).map(|i| &items[i])
}

/// Sample an element of `items`, each element being its own weight.
pub fn sample<W: Weight>(items: &[W]) -> Result<&W, SampleError> {
    let mut rng = rand::rng();
    sample_with_rng(items, &mut rng)
}

/// [`sample`] with a caller-supplied RNG.
pub fn sample_with_rng<'a, W, R>(items: &'a [W], rng: &mut R) -> Result<&'a W, SampleError>
where
    W: Weight,
    R: Rng + ?Sized,
{
    sample_by(items, &Direct, rng)
}

/// Reusable sampling configuration owning its generator.
///
/// `new()` seeds a `StdRng` from `rand::rng()`. `with_seed` restarts it from
/// a fixed seed, so two samplers built with the same seed produce the same
/// sequence of picks. Successive calls on one sampler advance the generator.
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    rng: StdRng,
    seed: Option<u64>,
}

impl Default for WeightedSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightedSampler {
    /// Create an unseeded sampler.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
            seed: None,
        }
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = Some(seed);
        self
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// The owned generator, for calls that take an RNG explicitly.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Sample an index, reading weights with `extractor`.
    pub fn sample_index_by<T, E>(&mut self, items: &[T], extractor: &E) -> Result<usize, SampleError>
    where
        E: WeightExtractor<T> + ?Sized,
    {
        sample_index_by(items, extractor, &mut self.rng)
    }

    /// Sample an index, each element being its own weight.
    pub fn sample_index<W: Weight>(&mut self, items: &[W]) -> Result<usize, SampleError> {
        self.sample_index_by(items, &Direct)
    }

    /// Sample an element, reading weights with `extractor`.
    pub fn sample_by<'a, T, E>(&mut self, items: &'a [T], extractor: &E) -> Result<&'a T, SampleError>
    where
        E: WeightExtractor<T> + ?Sized,
    {
        self.sample_index_by(items, extractor).map(|i| &items[i])
    }

    /// Sample an element, each element being its own weight.
    pub fn sample<'a, W: Weight>(&mut self, items: &'a [W]) -> Result<&'a W, SampleError> {
        self.sample_by(items, &Direct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{By, Field, FieldAccessor, Named};
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("decimal literal")
    }

    fn frequencies(weights: &[u32], n: usize, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut counts = vec![0usize; weights.len()];
        for _ in 0..n {
            let i = sample_index_with_rng(weights, &mut rng).expect("valid weights");
            counts[i] += 1;
        }
        counts.iter().map(|&c| c as f64 / n as f64).collect()
    }

    #[test]
    fn scan_picks_cumulative_bucket() {
        // Cumulative sums 1, 4, 10.
        let w = [1u64, 3, 6];
        assert_eq!(locate(&w, 0), 0);
        assert_eq!(locate(&w, 1), 1);
        assert_eq!(locate(&w, 3), 1);
        assert_eq!(locate(&w, 4), 2);
        assert_eq!(locate(&w, 7), 2);
        assert_eq!(locate(&w, 9), 2);
    }

    #[test]
    fn scan_skips_zero_weights() {
        let w = [0u64, 2, 0, 1];
        assert_eq!(locate(&w, 0), 1);
        assert_eq!(locate(&w, 1), 1);
        assert_eq!(locate(&w, 2), 3);
    }

    #[test]
    fn scan_falls_back_to_last_positive_weight() {
        let w = [dec("0.5"), dec("0.5"), Decimal::ZERO];
        assert_eq!(locate(&w, Decimal::ONE), 1);
    }

    #[test]
    fn bounded_draw_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for bound in [1u64, 2, 3, 7, 10, 1 << 63, u64::MAX - 1, u64::MAX] {
            for _ in 0..1_000 {
                assert!(bounded_u64(&mut rng, bound) < bound);
            }
        }
    }

    #[test]
    fn bounded_draw_is_uniform() {
        // 2^64 is not a multiple of 3: naive modulo would favour 0.
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let n = 90_000;
        let mut counts = [0usize; 3];
        for _ in 0..n {
            counts[bounded_u64(&mut rng, 3) as usize] += 1;
        }
        let expected = n as f64 / 3.0;
        let chi2: f64 = counts
            .iter()
            .map(|&c| {
                let diff = c as f64 - expected;
                diff * diff / expected
            })
            .sum();
        // df = 2; p < 1e-4 at ~18.4.
        assert!(chi2 < 18.4, "chi2={chi2:.2} counts={counts:?}");
    }

    #[test]
    fn wide_bounded_draw_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for bound in [1u128, 3, u128::from(u64::MAX) + 1, 1 << 100, u128::MAX] {
            for _ in 0..1_000 {
                assert!(bounded_u128(&mut rng, bound) < bound);
            }
        }
    }

    #[test]
    fn wide_bounded_draw_reaches_upper_half() {
        // Bound just above 2^64 is the masked path's worst case.
        let bound = (1u128 << 64) + 1;
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let high = (0..10_000)
            .filter(|_| bounded_u128(&mut rng, bound) >= bound / 2)
            .count();
        assert!((4_500..5_500).contains(&high), "high={high}");
    }

    #[test]
    fn decimal_units_share_one_scale() {
        let w = [dec("0.5"), dec("1.25"), dec("2")];
        let (units, total) = common_units(&w).expect("fits");
        assert_eq!(units, vec![50, 125, 200]);
        assert_eq!(total, 375);
    }

    #[test]
    fn decimal_units_coarsen_when_too_wide() {
        let w = [Decimal::MAX, Decimal::MAX, dec("0.5")];
        assert_eq!(units_at(&w, 28), None);
        let (units, total) = common_units(&w).expect("fits at a coarser scale");
        assert_eq!(units[0], units[1]);
        assert_eq!(total, units[0] * 2 + units[2]);
        assert!(units[0] > 0);
    }

    #[test]
    fn largest_decimals_sample_without_overflow() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let w = [Decimal::MAX, Decimal::MAX];
        let mut seen = [false; 2];
        for _ in 0..200 {
            seen[sample_index_with_rng(&w, &mut rng).expect("sum fits in units")] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn tiny_decimal_weights_are_fair() {
        let w = [1e-27f64, 1e-27];
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let n = 100_000;
        let first = (0..n)
            .filter(|_| sample_index_with_rng(&w, &mut rng) == Ok(0))
            .count();
        let f = first as f64 / n as f64;
        assert!((f - 0.5).abs() < 0.01, "f={f}");
    }

    #[test]
    fn weights_below_decimal_precision_still_sample() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let w = [1e-30f64, 1e-30, 2e-30];
        let mut counts = [0usize; 3];
        for _ in 0..10_000 {
            counts[sample_index_with_rng(&w, &mut rng).expect("positive weights")] += 1;
        }
        assert!(counts.iter().all(|&c| c > 0), "{counts:?}");
        assert!(counts[2] > counts[0] && counts[2] > counts[1], "{counts:?}");
    }

    #[test]
    fn integer_frequencies_match_weights() {
        let w = [1u32, 2, 3, 4];
        let freq = frequencies(&w, 100_000, 42);
        for (i, f) in freq.iter().enumerate() {
            let expected = w[i] as f64 / 10.0;
            assert!((f - expected).abs() < 0.01, "i={i} f={f} expected={expected}");
        }
    }

    #[test]
    fn decimal_frequencies_match_weights() {
        let w = [0.5f64, 1.5, 2.0];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 100_000;
        let mut counts = [0usize; 3];
        for _ in 0..n {
            counts[sample_index_with_rng(&w, &mut rng).expect("valid weights")] += 1;
        }
        for (i, &c) in counts.iter().enumerate() {
            let f = c as f64 / n as f64;
            let expected = w[i] / 4.0;
            assert!((f - expected).abs() < 0.01, "i={i} f={f} expected={expected}");
        }
    }

    #[test]
    fn string_weights_sample() {
        let w = ["0", "3.5", "0"];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..100 {
            assert_eq!(sample_with_rng(&w, &mut rng), Ok(&"3.5"));
        }
    }

    #[test]
    fn zero_weights_are_never_selected() {
        let w = [0u8, 5, 0, 5, 0];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..1_000 {
            let i = sample_index_with_rng(&w, &mut rng).expect("valid weights");
            assert!(i == 1 || i == 3, "picked zero-weight index {i}");
        }
    }

    #[test]
    fn empty_collection_fails() {
        let w: [u32; 0] = [];
        assert_eq!(sample_index(&w), Err(SampleError::EmptyCollection));
    }

    #[test]
    fn single_element_needs_no_draw() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let before = rng.clone().next_u64();
        assert_eq!(sample_index_with_rng(&[0u32], &mut rng), Ok(0));
        assert_eq!(sample_index_with_rng(&["not a number"], &mut rng), Ok(0));
        assert_eq!(rng.next_u64(), before);
    }

    #[test]
    fn zero_total_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            sample_index_with_rng(&[0u32, 0, 0], &mut rng),
            Err(SampleError::ZeroTotalWeight)
        );
        assert_eq!(
            sample_index_with_rng(&[0.0f64, 0.0], &mut rng),
            Err(SampleError::ZeroTotalWeight)
        );
    }

    #[test]
    fn integer_overflow_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            sample_index_with_rng(&[u64::MAX, 1], &mut rng),
            Err(SampleError::WeightOverflow)
        );
    }

    #[test]
    fn bad_weights_fail_before_drawing() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            sample_index_with_rng(&[1i32, -1], &mut rng),
            Err(SampleError::NegativeWeight { index: 1 })
        );
        assert_eq!(
            sample_index_with_rng(&[f64::INFINITY, 1.0], &mut rng),
            Err(SampleError::NonFiniteWeight { index: 0 })
        );
        assert_eq!(
            sample_index_with_rng(&["1", "2", "many"], &mut rng),
            Err(SampleError::MixedRepresentationRejected { index: 2 })
        );
    }

    #[derive(Debug, PartialEq)]
    struct Entry {
        value: char,
        weight: u32,
    }

    impl FieldAccessor for Entry {
        fn field(name: &str) -> Option<Field<Self>> {
            match name {
                "weight" => Some(Field::Unsigned(|e| u64::from(e.weight))),
                "value" => Some(Field::Opaque),
                _ => None,
            }
        }
    }

    #[test]
    fn field_weights_match_direct_weights() {
        let entries: Vec<Entry> = "abcde"
            .chars()
            .zip([3u32, 1, 4, 1, 5])
            .map(|(value, weight)| Entry { value, weight })
            .collect();
        let weights: Vec<u32> = entries.iter().map(|e| e.weight).collect();

        let mut rng_field = ChaCha8Rng::seed_from_u64(17);
        let mut rng_direct = ChaCha8Rng::seed_from_u64(17);
        let mut rng_by = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..1_000 {
            let a = sample_index_by(&entries, &Named("weight"), &mut rng_field).expect("field ok");
            let b = sample_index_with_rng(&weights, &mut rng_direct).expect("weights ok");
            let c = sample_index_by(&entries, &By(|e: &Entry| e.weight), &mut rng_by)
                .expect("closure ok");
            assert_eq!(a, b);
            assert_eq!(a, c);
        }
    }

    #[test]
    fn field_errors_surface() {
        let entries = [
            Entry { value: 'a', weight: 1 },
            Entry { value: 'b', weight: 2 },
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(sample_by(&entries, &Named("weight"), &mut rng).is_ok_and(|e| "ab".contains(e.value)));
        assert!(matches!(
            sample_by(&entries, &Named("missing"), &mut rng),
            Err(SampleError::FieldNotFound { .. })
        ));
        assert!(matches!(
            sample_by(&entries, &Named("value"), &mut rng),
            Err(SampleError::NonNumericWeight { .. })
        ));
        // Resolved before the single-element shortcut.
        assert!(matches!(
            sample_by(&entries[..1], &Named("missing"), &mut rng),
            Err(SampleError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn index_then_lookup_equals_sample() {
        let w = [2u16, 7, 1, 8, 2, 8];
        let mut rng_a = ChaCha8Rng::seed_from_u64(23);
        let mut rng_b = ChaCha8Rng::seed_from_u64(23);
        for _ in 0..500 {
            let i = sample_index_with_rng(&w, &mut rng_a).expect("valid weights");
            let x = sample_with_rng(&w, &mut rng_b).expect("valid weights");
            assert!(std::ptr::eq(&w[i], x));
        }
    }

    #[test]
    fn seeded_samplers_repeat_the_same_sequence() {
        let w = [5u32, 10, 20, 40, 80];
        let mut a = WeightedSampler::new().with_seed(99);
        let mut b = WeightedSampler::new().with_seed(99);
        assert_eq!(a.seed(), Some(99));
        let picks: Vec<usize> = (0..50).map(|_| a.sample_index(&w).expect("valid weights")).collect();
        for &i in &picks {
            assert_eq!(b.sample_index(&w), Ok(i));
        }
        assert_eq!(a.clone().sample(&w), b.sample(&w));
    }

    #[test]
    fn seeded_sampler_advances_between_calls() {
        let w = [1u8, 1];
        let mut sampler = WeightedSampler::new().with_seed(7);
        let mut seen = [false; 2];
        for _ in 0..200 {
            seen[sampler.sample_index(&w).expect("valid weights")] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn unseeded_sampler_covers_support() {
        let w = [1u8, 1];
        let mut sampler = WeightedSampler::default();
        assert_eq!(sampler.seed(), None);
        let mut seen = [false; 2];
        for _ in 0..200 {
            seen[sampler.sample_index(&w).expect("valid weights")] = true;
        }
        assert_eq!(seen, [true, true]);
        assert!(sample(&w).is_ok());
    }
}
