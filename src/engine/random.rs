use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of randomness for surge, availability and driver sampling.
///
/// Ranges are inclusive on both ends.
pub trait RandomSource: Send + std::fmt::Debug {
    fn int_in(&mut self, low: u32, high: u32) -> u32;
    fn float_in(&mut self, low: f64, high: f64) -> f64;

    /// Index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;
}

#[derive(Debug)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl RandomSource for SeededRandom {
    fn int_in(&mut self, low: u32, high: u32) -> u32 {
        self.rng.gen_range(low..=high)
    }

    fn float_in(&mut self, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..=high)
    }

    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed cycle of unit fractions in `[0, 1]`.
///
/// Each draw maps the next fraction linearly onto the requested range, so
/// `0.0` always yields the low end and `1.0` the high end.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    fractions: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(fractions: Vec<f64>) -> Self {
        let fractions = if fractions.is_empty() {
            vec![0.0]
        } else {
            fractions.into_iter().map(|f| f.clamp(0.0, 1.0)).collect()
        };
        Self {
            fractions,
            cursor: 0,
        }
    }

    /// Always draws the low end of every range.
    pub fn lowest() -> Self {
        Self::new(vec![0.0])
    }

    /// Always draws the high end of every range.
    pub fn highest() -> Self {
        Self::new(vec![1.0])
    }

    fn next_fraction(&mut self) -> f64 {
        let fraction = self.fractions[self.cursor % self.fractions.len()];
        self.cursor = self.cursor.wrapping_add(1);
        fraction
    }
}

impl RandomSource for SequenceRandom {
    fn int_in(&mut self, low: u32, high: u32) -> u32 {
        let span = f64::from(high - low) + 1.0;
        let offset = (self.next_fraction() * span).floor() as u32;
        (low + offset).min(high)
    }

    fn float_in(&mut self, low: f64, high: f64) -> f64 {
        low + self.next_fraction() * (high - low)
    }

    fn index(&mut self, len: usize) -> usize {
        let offset = (self.next_fraction() * len as f64).floor() as usize;
        offset.min(len.saturating_sub(1))
    }
}
