use serde::{Serialize, Deserialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

pub type BotId = u32;
pub type TaskId = u64;

/// Sentinel activity for a bot with nothing to do.
pub const NO_TASK: &str = "None";
/// Bots at or below this charge are never handed work.
pub const AVAILABLE_BATTERY_FLOOR: u8 = 30;
pub const DEFAULT_ESTIMATED_TIME: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
  Idle,
  Busy,
  Charging,
  Error,
}

impl BotStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      BotStatus::Idle => "idle",
      BotStatus::Busy => "busy",
      BotStatus::Charging => "charging",
      BotStatus::Error => "error",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bot {
  pub id: BotId,
  pub name: String,
  pub battery: u8,
  pub status: BotStatus,
  pub current_task: String,
  pub speed: f64,
  pub last_updated: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_completed_task: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub task_assigned_at: Option<DateTime<Utc>>,
}

impl Bot {
  pub fn new(id: BotId, name: impl Into<String>, battery: u8, status: BotStatus, now: DateTime<Utc>) -> Self {
    Self {
      id,
      name: name.into(),
      battery: battery.min(100),
      status,
      current_task: NO_TASK.to_string(),
      speed: 0.0,
      last_updated: now,
      last_completed_task: None,
      task_assigned_at: None,
    }
  }

  pub fn working(mut self, task: impl Into<String>, speed: f64) -> Self {
    self.current_task = task.into();
    self.speed = speed;
    self
  }

  /// Idle with enough charge to take a task.
  pub fn is_available(&self) -> bool {
    self.status == BotStatus::Idle && self.battery > AVAILABLE_BATTERY_FLOOR
  }

  /// Re-establishes the status/speed/task coupling after an arbitrary merge.
  pub(crate) fn normalize(&mut self) {
    self.battery = self.battery.min(100);
    if self.status != BotStatus::Busy || !self.speed.is_finite() || self.speed < 0.0 {
      self.speed = 0.0;
    }
    if self.status == BotStatus::Charging {
      self.current_task = NO_TASK.to_string();
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
  High,
  #[default]
  Medium,
  Low,
}

impl Priority {
  pub fn rank(&self) -> u8 {
    match self {
      Priority::High => 3,
      Priority::Medium => 2,
      Priority::Low => 1,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
  Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id: TaskId,
  pub pickup: String,
  pub drop: String,
  pub priority: Priority,
  pub status: TaskStatus,
  pub comments: String,
  pub estimated_time: u32,
  pub created_at: DateTime<Utc>,
}

impl Task {
  /// "<pickup> → <drop>", the label a bot carries while doing this task.
  pub fn route(&self) -> String {
    format!("{} → {}", self.pickup, self.drop)
  }

  pub fn is_pending(&self) -> bool {
    self.status == TaskStatus::Pending
  }
}

fn default_estimated_time() -> u32 {
  DEFAULT_ESTIMATED_TIME
}

/// Caller-supplied fields for a new task; the store fills in id, status and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
  pub pickup: String,
  pub drop: String,
  #[serde(default)]
  pub priority: Priority,
  #[serde(default)]
  pub comments: String,
  #[serde(default = "default_estimated_time")]
  pub estimated_time: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assigned_bot: Option<BotId>,
}

impl TaskDraft {
  pub fn new(pickup: impl Into<String>, drop: impl Into<String>, priority: Priority) -> Self {
    Self {
      pickup: pickup.into(),
      drop: drop.into(),
      priority,
      comments: String::new(),
      estimated_time: DEFAULT_ESTIMATED_TIME,
      assigned_bot: None,
    }
  }
}

/// Partial bot update. Battery is signed so out-of-range values clamp instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotPatch {
  pub name: Option<String>,
  pub battery: Option<i32>,
  pub status: Option<BotStatus>,
  pub current_task: Option<String>,
  pub speed: Option<f64>,
  pub last_completed_task: Option<String>,
  pub task_assigned_at: Option<DateTime<Utc>>,
}

impl BotPatch {
  pub fn released() -> Self {
    Self {
      status: Some(BotStatus::Idle),
      current_task: Some(NO_TASK.to_string()),
      speed: Some(0.0),
      ..Self::default()
    }
  }

  pub fn charging() -> Self {
    Self {
      status: Some(BotStatus::Charging),
      current_task: Some(NO_TASK.to_string()),
      speed: Some(0.0),
      ..Self::default()
    }
  }

  pub(crate) fn apply(self, bot: &mut Bot) {
    if let Some(name) = self.name {
      bot.name = name;
    }
    if let Some(battery) = self.battery {
      bot.battery = battery.clamp(0, 100) as u8;
    }
    if let Some(status) = self.status {
      bot.status = status;
    }
    if let Some(task) = self.current_task {
      bot.current_task = task;
    }
    if let Some(speed) = self.speed {
      bot.speed = speed;
    }
    if let Some(done) = self.last_completed_task {
      bot.last_completed_task = Some(done);
    }
    if let Some(at) = self.task_assigned_at {
      bot.task_assigned_at = Some(at);
    }
    bot.normalize();
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  Success,
  Warning,
  Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub id: Uuid,
  #[serde(rename = "type")]
  pub kind: EventKind,
  pub message: String,
  pub timestamp: DateTime<Utc>,
}

/// One dispatcher decision, with the fleet counts seen when it was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEvent {
  pub id: Uuid,
  pub message: String,
  #[serde(rename = "type")]
  pub kind: EventKind,
  pub timestamp: DateTime<Utc>,
  pub bots_available: usize,
  pub tasks_pending: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
  pub bots: Vec<Bot>,
  pub tasks: Vec<Task>,
  pub notifications: Vec<Notification>,
  pub last_update: DateTime<Utc>,
  pub auto_assign: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bot(status: BotStatus, battery: u8) -> Bot {
    Bot::new(1, "Alpha", battery, status, Utc::now())
  }

  #[test]
  fn availability_boundary_is_exclusive() {
    assert!(!bot(BotStatus::Idle, 30).is_available());
    assert!(bot(BotStatus::Idle, 31).is_available());
    assert!(!bot(BotStatus::Charging, 90).is_available());
  }

  #[test]
  fn patch_clamps_battery_and_drops_speed_off_busy() {
    let mut b = bot(BotStatus::Busy, 50).working("Inventory Scan", 2.5);
    BotPatch { battery: Some(140), status: Some(BotStatus::Idle), ..BotPatch::default() }.apply(&mut b);
    assert_eq!(b.battery, 100);
    assert_eq!(b.speed, 0.0);

    BotPatch { battery: Some(-20), ..BotPatch::default() }.apply(&mut b);
    assert_eq!(b.battery, 0);
  }

  #[test]
  fn charging_patch_clears_current_task() {
    let mut b = bot(BotStatus::Busy, 50).working("A → B", 3.0);
    BotPatch { status: Some(BotStatus::Charging), ..BotPatch::default() }.apply(&mut b);
    assert_eq!(b.current_task, NO_TASK);
    assert_eq!(b.speed, 0.0);
  }

  #[test]
  fn draft_defaults_from_json() {
    let draft: TaskDraft = serde_json::from_str(r#"{"pickup":"Dock 1","drop":"Bay 4"}"#).unwrap();
    assert_eq!(draft.priority, Priority::Medium);
    assert_eq!(draft.estimated_time, DEFAULT_ESTIMATED_TIME);
    assert!(draft.assigned_bot.is_none());
  }

  #[test]
  fn wire_names_match_dashboard_contract() {
    let n = Notification {
      id: Uuid::nil(),
      kind: EventKind::Warning,
      message: "x".into(),
      timestamp: Utc::now(),
    };
    let value = serde_json::to_value(&n).unwrap();
    assert_eq!(value["type"], "warning");

    let value = serde_json::to_value(bot(BotStatus::Charging, 10)).unwrap();
    assert_eq!(value["status"], "charging");
    assert_eq!(value["currentTask"], "None");
    assert!(value.get("lastCompletedTask").is_none());
  }
}
