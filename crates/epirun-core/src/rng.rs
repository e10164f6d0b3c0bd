//! Deterministic RNG wrapper and per-run seed derivation.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use siphasher::sip::SipHasher13;

/// Seed used by Latin hypercube sampling when none is configured.
pub const DEFAULT_SAMPLING_SEED: u64 = 1;

/// Deterministic RNG handle used by the sampling strategies.
///
/// The handle wraps `StdRng` seeded from a `u64`. Two handles built from the
/// same seed emit identical sequences for a given `rand` release, which is
/// what makes a Latin hypercube sweep reproducible run to run.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws a uniform sample from `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Returns a mutable reference to the underlying RNG (shuffles, ranges).
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

/// Derives the seed handed to the engine for a single run.
///
/// Seeds are SipHash-1-3 of `(master_seed, run_number)` with zero keys, so a
/// run keeps its seed when the run selection narrows the sweep.
pub fn derive_run_seed(master_seed: u64, run_number: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(run_number);
    hasher.finish()
}

/// Master seed policy for a sweep: a fixed integer or fresh entropy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedPolicy {
    /// Draw a master seed from OS entropy at setup time.
    #[default]
    Random,
    /// Use the configured master seed.
    Fixed(u64),
}

impl SeedPolicy {
    /// Resolves the policy into a concrete master seed.
    pub fn master_seed(&self) -> u64 {
        match self {
            SeedPolicy::Fixed(seed) => *seed,
            SeedPolicy::Random => rand::thread_rng().gen_range(0..1_000_000_000),
        }
    }
}

impl Serialize for SeedPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SeedPolicy::Random => serializer.serialize_str("random"),
            SeedPolicy::Fixed(seed) => serializer.serialize_u64(*seed),
        }
    }
}

impl<'de> Deserialize<'de> for SeedPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seed(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Seed(seed) => Ok(SeedPolicy::Fixed(seed)),
            Raw::Text(text) if text == "random" => Ok(SeedPolicy::Random),
            Raw::Text(text) => text.parse::<u64>().map(SeedPolicy::Fixed).map_err(|_| {
                de::Error::custom(format!(
                    "random_seed must be an integer or \"random\", got {text:?}"
                ))
            }),
        }
    }
}
