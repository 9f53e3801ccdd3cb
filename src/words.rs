// Target-word picking for each round.

use std::time::{SystemTime, UNIX_EPOCH};

// ----------------------------- tiny RNG (no external crate) -----------------------------

/// Deterministic xorshift32 RNG; plenty for choosing one of a handful of words.
#[derive(Clone, Debug)]
struct Rng32 { state: u32 }

impl Rng32 {
    fn from_seed(seed: u32) -> Self { Self { state: seed | 1 } }

    #[inline] fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform in `0..n` (n > 0).
    #[inline] fn below(&mut self, n: usize) -> usize {
        // Top 24 bits -> [0,1), scaled; avoids the low-bit bias of `%`.
        let f = (self.next_u32() >> 8) as f32 / ((1u32 << 24) as f32);
        ((f * n as f32) as usize).min(n - 1)
    }
}

/// Picks a target word uniformly from a fixed list. Repeats are allowed.
#[derive(Clone, Debug)]
pub struct WordPicker {
    words: Vec<String>,
    rng: Rng32,
}

impl WordPicker {
    /// `words` must not be empty (the config validator guarantees it).
    pub fn new(words: Vec<String>, seed: u32) -> Self {
        Self { words, rng: Rng32::from_seed(seed) }
    }

    /// Seeded from the wall clock.
    pub fn from_clock(words: Vec<String>) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
            .unwrap_or(0xC0FFEE);
        Self::new(words, seed)
    }

    pub fn pick(&mut self) -> String {
        if self.words.is_empty() {
            return String::new();
        }
        let i = self.rng.below(self.words.len());
        self.words[i].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_only_listed_words() {
        let words: Vec<String> = ["Fish", "Boat", "Bird"].iter().map(|s| s.to_string()).collect();
        let mut picker = WordPicker::new(words.clone(), 42);
        for _ in 0..200 {
            assert!(words.contains(&picker.pick()));
        }
    }

    #[test]
    fn eventually_picks_every_word() {
        let words: Vec<String> = ["Sun", "Mug", "Car"].iter().map(|s| s.to_string()).collect();
        let mut picker = WordPicker::new(words.clone(), 7);
        let seen: std::collections::HashSet<String> = (0..200).map(|_| picker.pick()).collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn same_seed_same_sequence() {
        let words: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let mut a = WordPicker::new(words.clone(), 99);
        let mut b = WordPicker::new(words, 99);
        for _ in 0..20 {
            assert_eq!(a.pick(), b.pick());
        }
    }
}
