use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
  pub server_port: u16,
  pub timings: Timings,
  pub sse_interval: Duration,
  pub seed: Option<u64>,
  pub strict_ids: bool,
}

/// Periods of the three background processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
  pub bot_tick: Duration,
  pub task_decay: Duration,
  pub auto_assign: Duration,
  pub task_decay_enabled: bool,
}

impl Default for Timings {
  fn default() -> Self {
    Self {
      bot_tick: Duration::from_secs(10),
      task_decay: Duration::from_secs(3),
      auto_assign: Duration::from_secs(3),
      task_decay_enabled: true,
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      server_port: 8080,
      timings: Timings::default(),
      sse_interval: Duration::from_secs(2),
      seed: None,
      strict_ids: false,
    }
  }
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let defaults = Self::default();
    let millis = |key: &str, default: Duration| -> Result<Duration> {
      let ms = parse_or(&lookup, key, default.as_millis() as u64)?;
      anyhow::ensure!(ms > 0, "{key} must be greater than zero");
      Ok(Duration::from_millis(ms))
    };

    Ok(Self {
      server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port)?,
      timings: Timings {
        bot_tick: millis("BOT_TICK_MS", defaults.timings.bot_tick)?,
        task_decay: millis("TASK_DECAY_MS", defaults.timings.task_decay)?,
        auto_assign: millis("AUTO_ASSIGN_MS", defaults.timings.auto_assign)?,
        task_decay_enabled: parse_or(&lookup, "TASK_DECAY_ENABLED", defaults.timings.task_decay_enabled)?,
      },
      sse_interval: millis("SSE_INTERVAL_MS", defaults.sse_interval)?,
      seed: lookup("SIM_SEED")
        .map(|raw| raw.trim().parse::<u64>().with_context(|| format!("invalid SIM_SEED {raw:?}")))
        .transpose()?,
      strict_ids: parse_or(&lookup, "STRICT_IDS", defaults.strict_ids)?,
    })
  }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  match lookup(key) {
    Some(raw) if !raw.trim().is_empty() => raw
      .trim()
      .parse()
      .with_context(|| format!("invalid value for {key}: {raw:?}")),
    _ => Ok(default),
  }
}
