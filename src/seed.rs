use chrono::{DateTime, Utc};

use crate::models::{Bot, BotStatus, Priority, Task, TaskStatus, DEFAULT_ESTIMATED_TIME};

/// The fixed fleet every process starts with.
pub fn bots(now: DateTime<Utc>) -> Vec<Bot> {
  use BotStatus::*;
  vec![
    Bot::new(1, "Alpha", 85, Idle, now),
    Bot::new(2, "Beta", 45, Charging, now),
    Bot::new(3, "Gamma", 92, Busy, now).working("Package Delivery", 3.5),
    Bot::new(4, "Delta", 23, Error, now).working("System Error", 0.0),
    Bot::new(5, "Epsilon", 78, Busy, now).working("Inventory Scan", 2.1),
    Bot::new(6, "Zeta", 65, Idle, now),
    Bot::new(7, "Eta", 88, Busy, now).working("Data Processing", 4.2),
    Bot::new(8, "Theta", 34, Charging, now),
    Bot::new(9, "Iota", 91, Idle, now),
    Bot::new(10, "Kappa", 56, Busy, now).working("Route Optimization", 1.8),
  ]
}

pub fn tasks(now: DateTime<Utc>) -> Vec<Task> {
  let task = |id, pickup: &str, drop: &str, priority, comments: &str| Task {
    id,
    pickup: pickup.to_string(),
    drop: drop.to_string(),
    priority,
    status: TaskStatus::Pending,
    comments: comments.to_string(),
    estimated_time: DEFAULT_ESTIMATED_TIME,
    created_at: now,
  };
  vec![
    task(1, "Warehouse A", "Customer X", Priority::High, "Fragile items"),
    task(2, "Storage B", "Retail Store", Priority::Medium, "Heavy load"),
    task(3, "Factory C", "Distribution Center", Priority::Low, "Regular delivery"),
  ]
}
