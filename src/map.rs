//! Weighted selection over key/value maps.
//!
//! Either side of the map can carry the weight while either side is returned.
//! Both sides come from one [`MapSnapshot`], taken in a single enumeration,
//! so position `i` in the key list and position `i` in the value list always
//! belong to the same entry, whatever the map's iteration order.

use rand::Rng;

use crate::coerce::Weight;
use crate::error::SampleError;
use crate::extract::{Direct, WeightExtractor};
use crate::sampler::{sample_index_iter, WeightedSampler};

/// Parallel key and value references of one map, in one iteration order.
#[derive(Debug, Clone)]
pub struct MapSnapshot<'a, K, V> {
    keys: Vec<&'a K>,
    values: Vec<&'a V>,
}

impl<'a, K, V> MapSnapshot<'a, K, V> {
    /// Snapshot any map-like source: `&HashMap`, `&BTreeMap`, an iterator of
    /// `(&K, &V)` pairs.
    pub fn new<M>(map: M) -> Self
    where
        M: IntoIterator<Item = (&'a K, &'a V)>,
    {
        let (keys, values) = map.into_iter().unzip();
        Self { keys, values }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[&'a K] {
        &self.keys
    }

    pub fn values(&self) -> &[&'a V] {
        &self.values
    }

    /// Entry index, weighted by keys.
    pub fn index_by_keys<E, R>(&self, extractor: &E, rng: &mut R) -> Result<usize, SampleError>
    where
        E: WeightExtractor<K> + ?Sized,
        R: Rng + ?Sized,
    {
        sample_index_iter(self.keys.iter().copied(), extractor, rng)
    }

    /// Entry index, weighted by values.
    pub fn index_by_values<E, R>(&self, extractor: &E, rng: &mut R) -> Result<usize, SampleError>
    where
        E: WeightExtractor<V> + ?Sized,
        R: Rng + ?Sized,
    {
        sample_index_iter(self.values.iter().copied(), extractor, rng)
    }

    pub fn value_by_values<E, R>(&self, extractor: &E, rng: &mut R) -> Result<&'a V, SampleError>
    where
        E: WeightExtractor<V> + ?Sized,
        R: Rng + ?Sized,
    {
        self.index_by_values(extractor, rng).map(|i| self.values[i])
    }

    pub fn value_by_keys<E, R>(&self, extractor: &E, rng: &mut R) -> Result<&'a V, SampleError>
    where
        E: WeightExtractor<K> + ?Sized,
        R: Rng + ?Sized,
    {
        self.index_by_keys(extractor, rng).map(|i| self.values[i])
    }

    pub fn key_by_keys<E, R>(&self, extractor: &E, rng: &mut R) -> Result<&'a K, SampleError>
    where
        E: WeightExtractor<K> + ?Sized,
        R: Rng + ?Sized,
    {
        self.index_by_keys(extractor, rng).map(|i| self.keys[i])
    }

    pub fn key_by_values<E, R>(&self, extractor: &E, rng: &mut R) -> Result<&'a K, SampleError>
    where
        E: WeightExtractor<V> + ?Sized,
        R: Rng + ?Sized,
    {
        self.index_by_values(extractor, rng).map(|i| self.keys[i])
    }
}

/// Sample a value, weighted by values.
pub fn sample_value<'a, K, V, M>(map: M) -> Result<&'a V, SampleError>
where
    K: 'a,
    V: Weight + 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut rng = rand::rng();
    sample_value_with_rng(map, &mut rng)
}

/// [`sample_value`] with a caller-supplied RNG.
pub fn sample_value_with_rng<'a, K, V, M, R>(map: M, rng: &mut R) -> Result<&'a V, SampleError>
where
    K: 'a,
    V: Weight + 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
    R: Rng + ?Sized,
{
    MapSnapshot::new(map).value_by_values(&Direct, rng)
}

/// Sample a value, weighted by its key.
pub fn sample_value_by_key_with_rng<'a, K, V, M, R>(map: M, rng: &mut R) -> Result<&'a V, SampleError>
where
    K: Weight + 'a,
    V: 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
    R: Rng + ?Sized,
{
    MapSnapshot::new(map).value_by_keys(&Direct, rng)
}

/// Sample a key, weighted by its value.
pub fn sample_key<'a, K, V, M>(map: M) -> Result<&'a K, SampleError>
where
    K: 'a,
    V: Weight + 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut rng = rand::rng();
    sample_key_with_rng(map, &mut rng)
}

/// [`sample_key`] with a caller-supplied RNG.
pub fn sample_key_with_rng<'a, K, V, M, R>(map: M, rng: &mut R) -> Result<&'a K, SampleError>
where
    K: 'a,
    V: Weight + 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
    R: Rng + ?Sized,
{
    MapSnapshot::new(map).key_by_values(&Direct, rng)
}

/// Sample a key, weighted by the key itself.
pub fn sample_key_by_key_with_rng<'a, K, V, M, R>(map: M, rng: &mut R) -> Result<&'a K, SampleError>
where
    K: Weight + 'a,
    V: 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
    R: Rng + ?Sized,
{
    MapSnapshot::new(map).key_by_keys(&Direct, rng)
}

/// Sample a value, weighted by its key.
pub fn sample_value_by_key<'a, K, V, M>(map: M) -> Result<&'a V, SampleError>
where
    K: Weight + 'a,
    V: 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut rng = rand::rng();
    sample_value_by_key_with_rng(map, &mut rng)
}

/// Sample a key, weighted by the key itself.
pub fn sample_key_by_key<'a, K, V, M>(map: M) -> Result<&'a K, SampleError>
where
    K: Weight + 'a,
    V: 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut rng = rand::rng();
    sample_key_by_key_with_rng(map, &mut rng)
}

/// Sample a value, reading weights from values with `extractor`.
pub fn sample_value_by<'a, K, V, M, E, R>(map: M, extractor: &E, rng: &mut R) -> Result<&'a V, SampleError>
where
    K: 'a,
    V: 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
    E: WeightExtractor<V> + ?Sized,
    R: Rng + ?Sized,
{
    MapSnapshot::new(map).value_by_values(extractor, rng)
}

/// Sample a key, reading weights from values with `extractor`.
pub fn sample_key_by<'a, K, V, M, E, R>(map: M, extractor: &E, rng: &mut R) -> Result<&'a K, SampleError>
where
    K: 'a,
    V: 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
    E: WeightExtractor<V> + ?Sized,
    R: Rng + ?Sized,
{
    MapSnapshot::new(map).key_by_values(extractor, rng)
}

/// Sample a value, reading weights from keys with `extractor`.
pub fn sample_value_keyed_by<'a, K, V, M, E, R>(
    map: M,
    extractor: &E,
    rng: &mut R,
) -> Result<&'a V, SampleError>
where
    K: 'a,
    V: 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
    E: WeightExtractor<K> + ?Sized,
    R: Rng + ?Sized,
{
    MapSnapshot::new(map).value_by_keys(extractor, rng)
}

/// Sample a key, reading weights from keys with `extractor`.
pub fn sample_key_keyed_by<'a, K, V, M, E, R>(
    map: M,
    extractor: &E,
    rng: &mut R,
) -> Result<&'a K, SampleError>
where
    K: 'a,
    V: 'a,
    M: IntoIterator<Item = (&'a K, &'a V)>,
    E: WeightExtractor<K> + ?Sized,
    R: Rng + ?Sized,
{
    MapSnapshot::new(map).key_by_keys(extractor, rng)
}

impl WeightedSampler {
    /// Sample a map value, reading weights from values with `extractor`.
    pub fn sample_map_value_by<'a, K, V, M, E>(&mut self, map: M, extractor: &E) -> Result<&'a V, SampleError>
    where
        K: 'a,
        V: 'a,
        M: IntoIterator<Item = (&'a K, &'a V)>,
        E: WeightExtractor<V> + ?Sized,
    {
        sample_value_by(map, extractor, self.rng_mut())
    }

    /// Sample a map value, weighted by values.
    pub fn sample_map_value<'a, K, V, M>(&mut self, map: M) -> Result<&'a V, SampleError>
    where
        K: 'a,
        V: Weight + 'a,
        M: IntoIterator<Item = (&'a K, &'a V)>,
    {
        self.sample_map_value_by(map, &Direct)
    }

    /// Sample a map key, reading weights from values with `extractor`.
    pub fn sample_map_key_by<'a, K, V, M, E>(&mut self, map: M, extractor: &E) -> Result<&'a K, SampleError>
    where
        K: 'a,
        V: 'a,
        M: IntoIterator<Item = (&'a K, &'a V)>,
        E: WeightExtractor<V> + ?Sized,
    {
        sample_key_by(map, extractor, self.rng_mut())
    }

    /// Sample a map key, weighted by values.
    pub fn sample_map_key<'a, K, V, M>(&mut self, map: M) -> Result<&'a K, SampleError>
    where
        K: 'a,
        V: Weight + 'a,
        M: IntoIterator<Item = (&'a K, &'a V)>,
    {
        self.sample_map_key_by(map, &Direct)
    }
}
