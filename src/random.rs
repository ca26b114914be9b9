//! Random draws used by the simulation, behind a trait so tests can script them.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait SimRandom {
  /// True with probability `p`.
  fn chance(&mut self, p: f64) -> bool;
  /// Index in `0..len`; 0 when `len` is 0.
  fn pick(&mut self, len: usize) -> usize;
  /// Value in `[low, high)`.
  fn uniform(&mut self, low: f64, high: f64) -> f64;
}

impl<R: Rng> SimRandom for R {
  fn chance(&mut self, p: f64) -> bool {
    self.gen_bool(p.clamp(0.0, 1.0))
  }

  fn pick(&mut self, len: usize) -> usize {
    if len == 0 {
      return 0;
    }
    self.gen_range(0..len)
  }

  fn uniform(&mut self, low: f64, high: f64) -> f64 {
    if high <= low {
      return low;
    }
    self.gen_range(low..high)
  }
}

pub fn seeded(seed: Option<u64>) -> StdRng {
  match seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  }
}

/// Replays queued outcomes in order. Exhausted queues fall back to
/// `false`, index 0 and the low bound.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRandom {
  chances: VecDeque<bool>,
  picks: VecDeque<usize>,
  uniforms: VecDeque<f64>,
}

impl ScriptedRandom {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_chances(mut self, outcomes: impl IntoIterator<Item = bool>) -> Self {
    self.chances.extend(outcomes);
    self
  }

  pub fn with_picks(mut self, picks: impl IntoIterator<Item = usize>) -> Self {
    self.picks.extend(picks);
    self
  }

  pub fn with_uniforms(mut self, values: impl IntoIterator<Item = f64>) -> Self {
    self.uniforms.extend(values);
    self
  }
}

impl SimRandom for ScriptedRandom {
  fn chance(&mut self, _p: f64) -> bool {
    self.chances.pop_front().unwrap_or(false)
  }

  fn pick(&mut self, len: usize) -> usize {
    match self.picks.pop_front() {
      Some(i) if len > 0 => i.min(len - 1),
      _ => 0,
    }
  }

  fn uniform(&mut self, low: f64, high: f64) -> f64 {
    match self.uniforms.pop_front() {
      Some(v) if high > low => v.clamp(low, high),
      _ => low,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_seed_same_draws() {
    let mut a = seeded(Some(7));
    let mut b = seeded(Some(7));
    for _ in 0..32 {
      assert_eq!(a.uniform(1.0, 4.0), b.uniform(1.0, 4.0));
      assert_eq!(a.chance(0.3), b.chance(0.3));
    }
  }

  #[test]
  fn uniform_stays_in_range() {
    let mut rng = seeded(Some(99));
    for _ in 0..1000 {
      let v = rng.uniform(1.0, 4.0);
      assert!((1.0..4.0).contains(&v));
    }
    assert_eq!(rng.pick(0), 0);
  }

  #[test]
  fn scripted_replays_then_defaults() {
    let mut rng = ScriptedRandom::new()
      .with_chances([true])
      .with_picks([5])
      .with_uniforms([2.5]);
    assert!(rng.chance(0.3));
    assert!(!rng.chance(0.3));
    assert_eq!(rng.pick(2), 1);
    assert_eq!(rng.uniform(1.0, 4.0), 2.5);
    assert_eq!(rng.uniform(1.0, 4.0), 1.0);
  }
}
