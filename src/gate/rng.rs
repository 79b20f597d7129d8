use rand::Rng;

/// Source of the gate's percentage roll.
pub trait RandomSource: Send {
    /// Uniform draw from `0..100`.
    fn roll_percent(&mut self) -> u8;
}

/// Process-wide thread RNG; the production source.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn roll_percent(&mut self) -> u8 {
        rand::rng().random_range(0..100)
    }
}

/// Splitmix64 stream: reproducible rolls for a given seed.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    state: u64,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl RandomSource for SeededRandom {
    fn roll_percent(&mut self) -> u8 {
        u8::try_from(self.next_u64() % 100).unwrap_or(0)
    }
}

/// Always returns the same roll.
#[derive(Debug, Clone, Copy)]
pub struct FixedRoll(pub u8);

impl RandomSource for FixedRoll {
    fn roll_percent(&mut self) -> u8 {
        self.0.min(99)
    }
}
