//! Read-only fleet metrics for the analytics view.

use serde::Serialize;

use crate::models::{Bot, BotId, BotStatus, Priority, Task, AVAILABLE_BATTERY_FLOOR};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCounts {
  pub high: usize,
  pub medium: usize,
  pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotHealth {
  pub id: BotId,
  pub name: String,
  pub health_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetAnalytics {
  pub total_bots: usize,
  pub busy_bots: usize,
  pub idle_bots: usize,
  pub charging_bots: usize,
  pub error_bots: usize,
  pub available_bots: usize,
  pub low_battery_bots: usize,
  pub total_tasks: usize,
  pub pending_tasks: usize,
  pub priorities: PriorityCounts,
  pub avg_battery: u32,
  pub bot_utilization: u32,
  pub error_rate: u32,
  pub avg_speed: f64,
  pub avg_task_time: u32,
  pub completed_tasks: usize,
  pub task_completion_rate: u32,
  pub tasks_processed: usize,
  pub health: Vec<BotHealth>,
}

fn percent(part: usize, whole: usize) -> u32 {
  if whole == 0 {
    return 0;
  }
  (part as f64 * 100.0 / whole as f64).round() as u32
}

/// Battery, docked for faults and for running low while working or charging.
pub fn health_score(bot: &Bot) -> u8 {
  let mut score = bot.battery as i32;
  match bot.status {
    BotStatus::Error => score -= 30,
    BotStatus::Charging if bot.battery < 20 => score -= 10,
    BotStatus::Busy if bot.battery < 30 => score -= 15,
    _ => {}
  }
  score.clamp(0, 100) as u8
}

impl FleetAnalytics {
  pub fn compute(bots: &[Bot], tasks: &[Task]) -> Self {
    let count = |status: BotStatus| bots.iter().filter(|b| b.status == status).count();
    let total_bots = bots.len();
    let busy_bots = count(BotStatus::Busy);
    let error_bots = count(BotStatus::Error);

    let mut priorities = PriorityCounts::default();
    for task in tasks {
      match task.priority {
        Priority::High => priorities.high += 1,
        Priority::Medium => priorities.medium += 1,
        Priority::Low => priorities.low += 1,
      }
    }

    let avg_battery = if total_bots == 0 {
      0
    } else {
      (bots.iter().map(|b| b.battery as f64).sum::<f64>() / total_bots as f64).round() as u32
    };

    let speeds: Vec<f64> = bots
      .iter()
      .filter(|b| b.status == BotStatus::Busy && b.speed > 0.0)
      .map(|b| b.speed)
      .collect();
    let avg_speed = if speeds.is_empty() { 0.0 } else { speeds.iter().sum::<f64>() / speeds.len() as f64 };
    let avg_task_time = if avg_speed > 0.0 { (60.0 / avg_speed).round() as u32 } else { 0 };

    let total_tasks = tasks.len();
    let completed_tasks = bots.iter().filter(|b| b.last_completed_task.is_some()).count();
    let task_completion_rate = if total_tasks > 0 {
      percent(completed_tasks, total_tasks + completed_tasks)
    } else {
      0
    };

    Self {
      total_bots,
      busy_bots,
      idle_bots: count(BotStatus::Idle),
      charging_bots: count(BotStatus::Charging),
      error_bots,
      available_bots: bots.iter().filter(|b| b.is_available()).count(),
      low_battery_bots: bots.iter().filter(|b| b.battery < AVAILABLE_BATTERY_FLOOR).count(),
      total_tasks,
      pending_tasks: tasks.iter().filter(|t| t.is_pending()).count(),
      priorities,
      avg_battery,
      bot_utilization: percent(busy_bots, total_bots),
      error_rate: percent(error_bots, total_bots),
      avg_speed,
      avg_task_time,
      completed_tasks,
      task_completion_rate,
      tasks_processed: completed_tasks + busy_bots,
      health: bots
        .iter()
        .map(|b| BotHealth { id: b.id, name: b.name.clone(), health_score: health_score(b) })
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use crate::seed;

  #[test]
  fn seeded_fleet_metrics() {
    let now = Utc::now();
    let a = FleetAnalytics::compute(&seed::bots(now), &seed::tasks(now));
    assert_eq!(a.total_bots, 10);
    assert_eq!((a.busy_bots, a.idle_bots, a.charging_bots, a.error_bots), (4, 3, 2, 1));
    assert_eq!(a.available_bots, 3);
    assert_eq!(a.low_battery_bots, 1);
    assert_eq!(a.priorities, PriorityCounts { high: 1, medium: 1, low: 1 });
    // (85+45+92+23+78+65+88+34+91+56) / 10
    assert_eq!(a.avg_battery, 66);
    assert_eq!(a.bot_utilization, 40);
    assert_eq!(a.error_rate, 10);
    // (3.5 + 2.1 + 4.2 + 1.8) / 4 = 2.9
    assert!((a.avg_speed - 2.9).abs() < 1e-9);
    assert_eq!(a.avg_task_time, 21);
    assert_eq!(a.completed_tasks, 0);
    assert_eq!(a.task_completion_rate, 0);
    assert_eq!(a.tasks_processed, 4);
  }

  #[test]
  fn empty_fleet_is_all_zero() {
    let a = FleetAnalytics::compute(&[], &[]);
    assert_eq!(a.avg_battery, 0);
    assert_eq!(a.bot_utilization, 0);
    assert_eq!(a.avg_task_time, 0);
    assert!(a.health.is_empty());
  }

  #[test]
  fn health_score_penalties() {
    let now = Utc::now();
    assert_eq!(health_score(&Bot::new(1, "a", 23, BotStatus::Error, now)), 0);
    assert_eq!(health_score(&Bot::new(1, "a", 80, BotStatus::Error, now)), 50);
    assert_eq!(health_score(&Bot::new(1, "a", 15, BotStatus::Charging, now)), 5);
    assert_eq!(health_score(&Bot::new(1, "a", 25, BotStatus::Busy, now)), 10);
    assert_eq!(health_score(&Bot::new(1, "a", 91, BotStatus::Idle, now)), 91);
  }

  #[test]
  fn completion_rate_counts_bots_with_history() {
    let now = Utc::now();
    let mut bots = seed::bots(now);
    bots[0].last_completed_task = Some("A → B".into());
    let a = FleetAnalytics::compute(&bots, &seed::tasks(now));
    // 1 / (3 + 1)
    assert_eq!(a.task_completion_rate, 25);
    assert_eq!(a.tasks_processed, 5);
  }
}
