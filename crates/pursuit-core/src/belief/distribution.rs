//! Weighted mapping over discrete keys, the shared primitive of every estimator.

use rand::Rng;
use std::collections::BTreeMap;
use thiserror::Error;

/// Non-negative weights over discrete keys. Missing keys read as zero.
///
/// Backed by an ordered map so iteration (and therefore seeded sampling) is
/// reproducible across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteDistribution<K: Ord + Clone> {
    weights: BTreeMap<K, f64>,
}

impl<K: Ord + Clone> Default for DiscreteDistribution<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone> DiscreteDistribution<K> {
    pub fn new() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    /// Uniform weights over `keys`, already normalized.
    pub fn uniform<I: IntoIterator<Item = K>>(keys: I) -> Self {
        let mut dist: Self = keys.into_iter().map(|key| (key, 1.0)).collect();
        dist.normalize();
        dist
    }

    /// Empirical distribution of a sample: each occurrence contributes equal weight.
    pub fn from_counts<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let mut dist = Self::new();
        for key in samples {
            dist.add(key.clone(), 1.0);
        }
        dist.normalize();
        dist
    }

    pub fn get(&self, key: &K) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: K, weight: f64) {
        debug_assert!(weight >= 0.0, "distribution weights must be non-negative");
        self.weights.insert(key, weight);
    }

    pub fn add(&mut self, key: K, weight: f64) {
        debug_assert!(weight >= 0.0, "distribution weights must be non-negative");
        *self.weights.entry(key).or_insert(0.0) += weight;
    }

    pub fn clear(&mut self) {
        self.weights.clear();
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.weights.iter().map(|(key, weight)| (key, *weight))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.weights.keys()
    }

    /// Keys carrying strictly positive weight.
    pub fn support(&self) -> impl Iterator<Item = &K> {
        self.weights
            .iter()
            .filter(|(_, weight)| **weight > 0.0)
            .map(|(key, _)| key)
    }

    /// Rescales weights to sum to one. A zero-total distribution is left untouched.
    pub fn normalize(&mut self) {
        let total = self.total();
        if total == 0.0 {
            return;
        }
        for weight in self.weights.values_mut() {
            *weight /= total;
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Key with the largest weight; ties resolve to the smallest key.
    pub fn arg_max(&self) -> Option<&K> {
        let mut best: Option<(&K, f64)> = None;
        for (key, weight) in &self.weights {
            match best {
                Some((_, best_weight)) if *weight <= best_weight => {}
                _ => best = Some((key, *weight)),
            }
        }
        best.map(|(key, _)| key)
    }

    /// Draws a key with probability proportional to its weight.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<K, DistributionError> {
        let total = self.total();
        if total <= 0.0 || !total.is_finite() {
            return Err(DistributionError::ZeroTotal);
        }

        let mut choice = rng.gen_range(0.0..total);
        let mut last_positive = None;
        for (key, weight) in &self.weights {
            if *weight <= 0.0 {
                continue;
            }
            if choice < *weight {
                return Ok(key.clone());
            }
            choice -= *weight;
            last_positive = Some(key);
        }

        // Floating point drift can leave a sliver past the final bucket.
        last_positive.cloned().ok_or(DistributionError::ZeroTotal)
    }

    /// Draws `count` keys independently, with replacement.
    pub fn sample_many<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<K>, DistributionError> {
        (0..count).map(|_| self.sample(rng)).collect()
    }

    /// Shannon entropy (nats) of the normalized distribution.
    pub fn entropy(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        self.weights
            .values()
            .filter(|weight| **weight > 0.0)
            .map(|weight| {
                let p = weight / total;
                -p * p.ln()
            })
            .sum()
    }

    /// Folds weights onto new keys, summing collisions.
    pub fn map_keys<J, F>(&self, mut project: F) -> DiscreteDistribution<J>
    where
        J: Ord + Clone,
        F: FnMut(&K) -> J,
    {
        let mut out = DiscreteDistribution::new();
        for (key, weight) in &self.weights {
            out.add(project(key), *weight);
        }
        out
    }
}

impl<K: Ord + Clone> FromIterator<(K, f64)> for DiscreteDistribution<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut dist = Self::new();
        for (key, weight) in iter {
            dist.add(key, weight);
        }
        dist
    }
}

impl<K: Ord + Clone> IntoIterator for DiscreteDistribution<K> {
    type Item = (K, f64);
    type IntoIter = std::collections::btree_map::IntoIter<K, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.weights.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DistributionError {
    #[error("cannot sample from a distribution with zero total weight")]
    ZeroTotal,
}
