//! Standard-normal draws as an injected capability.
//!
//! The samplers never own a generator. Callers pass anything implementing
//! [`NormalSource`]: an adapter over a `rand` RNG for real use, or a
//! fixed vector in tests.

use rand::Rng;
use rand_distr::StandardNormal;

/// Source of i.i.d. N(0, 1) vectors.
pub trait NormalSource {
    /// Draw a vector of `k` independent standard normals.
    fn draw_standard_normal(&mut self, k: usize) -> Vec<f64>;
}

/// Adapts any `rand::Rng` into a [`NormalSource`].
#[derive(Debug, Clone)]
pub struct RngNormalSource<R> {
    rng: R,
}

impl<R: Rng> RngNormalSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> NormalSource for RngNormalSource<R> {
    fn draw_standard_normal(&mut self, k: usize) -> Vec<f64> {
        (0..k).map(|_| self.rng.sample(StandardNormal)).collect()
    }
}

/// Replays one fixed vector on every call, whatever `k` is requested.
///
/// Length mismatches are left to the consumer to reject.
#[derive(Debug, Clone)]
pub struct FixedNormals {
    values: Vec<f64>,
}

impl FixedNormals {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// All-zero draw of length `k`; turns a sampler into its posterior mean.
    pub fn zeros(k: usize) -> Self {
        Self {
            values: vec![0.0; k],
        }
    }
}

impl NormalSource for FixedNormals {
    fn draw_standard_normal(&mut self, _k: usize) -> Vec<f64> {
        self.values.clone()
    }
}

impl<N: NormalSource + ?Sized> NormalSource for &mut N {
    fn draw_standard_normal(&mut self, k: usize) -> Vec<f64> {
        (**self).draw_standard_normal(k)
    }
}
