use std::fmt;

use noise::{NoiseFn, Perlin};

/// Smooth deterministic scalar field over `(x, y, t)`, normalized to `[0, 1]`.
#[derive(Clone)]
pub struct FlowField {
    seed: u32,
    noise: Perlin,
}

impl fmt::Debug for FlowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowField").field("seed", &self.seed).finish()
    }
}

impl FlowField {
    /// Time offset separating the direction channel from the magnitude channel.
    pub const CHANNEL_OFFSET: f64 = 10_000.0;

    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            noise: Perlin::new(seed),
        }
    }

    pub fn sample(&self, x: f64, y: f64, t: f64) -> f32 {
        let n = self.noise.get([x, y, t]);
        ((n + 1.0) * 0.5).clamp(0.0, 1.0) as f32
    }

    /// Same field, shifted along the time axis by `channel` offsets.
    pub fn sample_channel(&self, x: f64, y: f64, t: f64, channel: u32) -> f32 {
        self.sample(x, y, t + Self::CHANNEL_OFFSET * channel as f64)
    }
}
