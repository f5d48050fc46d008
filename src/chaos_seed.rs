use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Independent random draws made from one chaos seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaosStream {
    /// Which flight, how long, why, and scenario delay picks
    Disruptions,
    /// Whether an autonomous tick fires
    Ticks,
}

impl ChaosStream {
    fn id(self) -> u64 {
        match self {
            ChaosStream::Disruptions => 1,
            ChaosStream::Ticks => 2,
        }
    }
}

/// Seed for every random choice the engine makes. A seeded engine replays
/// the same disruptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChaosSeed(u64);

impl ChaosSeed {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Configured seed, or a fresh one from the OS when unset
    pub fn from_option(seed: Option<u64>) -> Self {
        Self(seed.unwrap_or_else(rand::random))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// ChaCha8 keyed by the seed, on the stream's own ChaCha stream id.
    pub fn rng(&self, stream: ChaosStream) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.0);
        rng.set_stream(stream.id());
        rng
    }
}
