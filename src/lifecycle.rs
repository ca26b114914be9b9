//! Battery-driven status machine applied to every bot on each bot-tick.
//!
//! charging -> idle once charged, busy -> charging on low battery,
//! idle -> busy at random when there is charge to spare, error stays put.

use chrono::{DateTime, Utc};

use crate::models::{Bot, BotStatus, AVAILABLE_BATTERY_FLOOR, NO_TASK};
use crate::random::SimRandom;

pub const CHARGE_RATE: u8 = 5;
pub const CHARGED_AT: u8 = 95;
pub const BUSY_DRAIN: u8 = 2;
pub const LOW_BATTERY: u8 = 15;
pub const IDLE_DRAIN: u8 = 1;
pub const SPONTANEOUS_WORK_CHANCE: f64 = 0.3;
pub const SPONTANEOUS_TASKS: [&str; 2] = ["Package Delivery", "Inventory Scan"];
pub const MIN_SPEED: f64 = 1.0;
pub const MAX_SPEED: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub from: BotStatus,
  pub to: BotStatus,
}

pub fn work_speed(rng: &mut dyn SimRandom) -> f64 {
  rng.uniform(MIN_SPEED, MAX_SPEED)
}

/// Advances one bot by a single tick and stamps it. Returns the status change, if any.
pub fn advance(bot: &mut Bot, rng: &mut dyn SimRandom, now: DateTime<Utc>) -> Option<Transition> {
  let from = bot.status;
  match bot.status {
    BotStatus::Charging => {
      bot.battery = bot.battery.saturating_add(CHARGE_RATE).min(100);
      if bot.battery >= CHARGED_AT {
        bot.status = BotStatus::Idle;
        bot.current_task = NO_TASK.to_string();
        bot.speed = 0.0;
      }
    }
    BotStatus::Busy => {
      bot.battery = bot.battery.saturating_sub(BUSY_DRAIN);
      if bot.battery <= LOW_BATTERY {
        bot.status = BotStatus::Charging;
        bot.current_task = NO_TASK.to_string();
        bot.speed = 0.0;
      }
    }
    BotStatus::Idle => {
      let before = bot.battery;
      bot.battery = bot.battery.saturating_sub(IDLE_DRAIN);
      // The draw happens for every idle bot; the charge gate uses the pre-tick level.
      if rng.chance(SPONTANEOUS_WORK_CHANCE) && before > AVAILABLE_BATTERY_FLOOR {
        bot.status = BotStatus::Busy;
        bot.current_task = SPONTANEOUS_TASKS[rng.pick(SPONTANEOUS_TASKS.len())].to_string();
        bot.speed = work_speed(rng);
      }
    }
    BotStatus::Error => {}
  }
  bot.last_updated = now;

  if bot.status == from {
    None
  } else {
    Some(Transition { from, to: bot.status })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::random::{seeded, ScriptedRandom};

  fn bot(status: BotStatus, battery: u8) -> Bot {
    Bot::new(1, "Alpha", battery, status, Utc::now())
  }

  #[test]
  fn charging_bot_finishes_at_threshold() {
    let mut b = bot(BotStatus::Charging, 92);
    let now = Utc::now();
    let t = advance(&mut b, &mut ScriptedRandom::new(), now);
    assert_eq!(b.battery, 97);
    assert_eq!(b.status, BotStatus::Idle);
    assert_eq!(b.current_task, NO_TASK);
    assert_eq!(b.last_updated, now);
    assert_eq!(t, Some(Transition { from: BotStatus::Charging, to: BotStatus::Idle }));
  }

  #[test]
  fn charging_caps_at_full() {
    let mut b = bot(BotStatus::Charging, 98);
    advance(&mut b, &mut ScriptedRandom::new(), Utc::now());
    assert_eq!(b.battery, 100);
  }

  #[test]
  fn charging_below_threshold_keeps_charging() {
    let mut b = bot(BotStatus::Charging, 45);
    assert!(advance(&mut b, &mut ScriptedRandom::new(), Utc::now()).is_none());
    assert_eq!(b.battery, 50);
    assert_eq!(b.status, BotStatus::Charging);
  }

  #[test]
  fn busy_bot_trips_to_charging() {
    let mut b = bot(BotStatus::Busy, 16).working("Package Delivery", 3.5);
    advance(&mut b, &mut ScriptedRandom::new(), Utc::now());
    assert_eq!(b.battery, 14);
    assert_eq!(b.status, BotStatus::Charging);
    assert_eq!(b.current_task, NO_TASK);
    assert_eq!(b.speed, 0.0);
  }

  #[test]
  fn busy_bot_never_goes_negative() {
    let mut b = bot(BotStatus::Busy, 1).working("Inventory Scan", 2.0);
    advance(&mut b, &mut ScriptedRandom::new(), Utc::now());
    assert_eq!(b.battery, 0);
  }

  #[test]
  fn idle_bot_takes_spontaneous_work() {
    let mut b = bot(BotStatus::Idle, 60);
    let mut rng = ScriptedRandom::new().with_chances([true]).with_picks([1]).with_uniforms([2.0]);
    advance(&mut b, &mut rng, Utc::now());
    assert_eq!(b.battery, 59);
    assert_eq!(b.status, BotStatus::Busy);
    assert_eq!(b.current_task, "Inventory Scan");
    assert_eq!(b.speed, 2.0);
  }

  #[test]
  fn idle_gate_uses_pre_tick_battery() {
    // 31 drains to 30 but still qualifies.
    let mut b = bot(BotStatus::Idle, 31);
    advance(&mut b, &mut ScriptedRandom::new().with_chances([true]), Utc::now());
    assert_eq!(b.status, BotStatus::Busy);

    let mut b = bot(BotStatus::Idle, 30);
    advance(&mut b, &mut ScriptedRandom::new().with_chances([true]), Utc::now());
    assert_eq!(b.status, BotStatus::Idle);
    assert_eq!(b.battery, 29);
  }

  #[test]
  fn error_bot_only_gets_stamped() {
    let mut b = bot(BotStatus::Error, 23);
    b.current_task = "System Error".into();
    let now = Utc::now();
    assert!(advance(&mut b, &mut ScriptedRandom::new().with_chances([true]), now).is_none());
    assert_eq!(b.battery, 23);
    assert_eq!(b.current_task, "System Error");
    assert_eq!(b.last_updated, now);
  }

  #[test]
  fn invariants_hold_over_long_random_runs() {
    let mut rng = seeded(Some(2024));
    let mut bots: Vec<Bot> = [
      (BotStatus::Idle, 85),
      (BotStatus::Charging, 45),
      (BotStatus::Busy, 92),
      (BotStatus::Error, 23),
      (BotStatus::Idle, 31),
    ]
    .into_iter()
    .map(|(s, b)| {
      let bot = bot(s, b);
      if s == BotStatus::Busy { bot.working("Package Delivery", 3.5) } else { bot }
    })
    .collect();

    for _ in 0..500 {
      for b in bots.iter_mut() {
        advance(b, &mut rng, Utc::now());
        assert!(b.battery <= 100);
        if b.speed > 0.0 {
          assert_eq!(b.status, BotStatus::Busy);
        }
        if b.status == BotStatus::Charging {
          assert_eq!(b.current_task, NO_TASK);
        }
      }
    }
  }
}
