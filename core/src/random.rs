//! Randomness seam for generated identifiers.
//!
//! Production code uses `SystemRandom`; tests inject a deterministic port so
//! generated ids can be asserted exactly.

use rand::Rng;

/// Symbols a tracking id is drawn from.
pub const TRACK_ID_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a session tracking id.
pub const TRACK_ID_LEN: usize = 24;

pub trait RandomPort: Send + Sync {
    /// Uniform index in `0..upper`. `upper` is never zero.
    fn gen_index(&self, upper: usize) -> usize;
}

/// Thread-local RNG backed randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl RandomPort for SystemRandom {
    fn gen_index(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Random string of `len` symbols from `[a-z0-9]`.
pub fn random_string(random: &dyn RandomPort, len: usize) -> String {
    (0..len)
        .map(|_| TRACK_ID_ALPHABET[random.gen_index(TRACK_ID_ALPHABET.len())] as char)
        .collect()
}
