//! Canonical owner of the bot and task collections.
//!
//! Everything that changes a bot or a task goes through a method here. Missing
//! ids are absorbed as no-ops unless the store was built in strict mode, in
//! which case the same calls report `FleetError::*NotFound` and still leave the
//! collections untouched.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::FleetError;
use crate::lifecycle;
use crate::models::{
  Bot, BotId, BotPatch, BotStatus, EventKind, FleetSnapshot, Notification, Task, TaskDraft, TaskId, TaskStatus,
};
use crate::random::SimRandom;
use crate::seed;

pub const NOTIFICATION_CAPACITY: usize = 10;

pub struct FleetStore {
  bots: Vec<Bot>,
  tasks: Vec<Task>,
  notifications: VecDeque<Notification>,
  last_update: DateTime<Utc>,
  last_task_id: TaskId,
  strict: bool,
  clock: Arc<dyn Clock>,
}

impl FleetStore {
  pub fn new(bots: Vec<Bot>, tasks: Vec<Task>, clock: Arc<dyn Clock>) -> Self {
    let last_task_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);
    Self {
      bots,
      tasks,
      notifications: VecDeque::with_capacity(NOTIFICATION_CAPACITY),
      last_update: clock.now(),
      last_task_id,
      strict: false,
      clock,
    }
  }

  /// Store preloaded with the standard fleet, queue and welcome notice.
  pub fn seeded(clock: Arc<dyn Clock>) -> Self {
    let now = clock.now();
    let mut store = Self::new(seed::bots(now), seed::tasks(now), clock);
    store.notify(EventKind::Info, "System initialized successfully");
    store
  }

  pub fn strict(mut self, strict: bool) -> Self {
    self.strict = strict;
    self
  }

  pub fn is_strict(&self) -> bool {
    self.strict
  }

  pub fn clock(&self) -> &Arc<dyn Clock> {
    &self.clock
  }

  pub fn bots(&self) -> &[Bot] {
    &self.bots
  }

  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
    self.notifications.iter()
  }

  pub fn last_update(&self) -> DateTime<Utc> {
    self.last_update
  }

  pub fn bot(&self, id: BotId) -> Option<&Bot> {
    self.bots.iter().find(|b| b.id == id)
  }

  pub fn task(&self, id: TaskId) -> Option<&Task> {
    self.tasks.iter().find(|t| t.id == id)
  }

  pub fn pending_tasks(&self) -> impl Iterator<Item = &Task> {
    self.tasks.iter().filter(|t| t.is_pending())
  }

  /// Idle bots with charge to spare, in fleet order.
  pub fn available_bots(&self) -> impl Iterator<Item = &Bot> {
    self.bots.iter().filter(|b| b.is_available())
  }

  pub fn has_pending(&self) -> bool {
    self.pending_tasks().next().is_some()
  }

  pub fn snapshot(&self, auto_assign: bool) -> FleetSnapshot {
    FleetSnapshot {
      bots: self.bots.clone(),
      tasks: self.tasks.clone(),
      notifications: self.notifications.iter().cloned().collect(),
      last_update: self.last_update,
      auto_assign,
    }
  }

  /// Queues a new pending task at the front and returns its id.
  pub fn add_task(&mut self, draft: TaskDraft) -> TaskId {
    let now = self.clock.now();
    let id = self.next_task_id(now);
    let task = Task {
      id,
      pickup: draft.pickup,
      drop: draft.drop,
      priority: draft.priority,
      status: TaskStatus::Pending,
      comments: draft.comments,
      estimated_time: draft.estimated_time.max(1),
      created_at: now,
    };
    let message = format!("Task \"{}\" created", task.route());
    info!(task_id = id, priority = ?task.priority, "task queued: {}", task.route());
    self.tasks.insert(0, task);
    self.notify(EventKind::Info, message);
    id
  }

  /// Merges `patch` into the bot. Does not touch `last_updated`.
  pub fn update_bot(&mut self, id: BotId, patch: BotPatch) -> Result<(), FleetError> {
    match self.bots.iter_mut().find(|b| b.id == id) {
      Some(bot) => {
        patch.apply(bot);
        debug!(bot_id = id, status = bot.status.as_str(), battery = bot.battery, "bot updated");
        Ok(())
      }
      None => self.missing(FleetError::BotNotFound(id)),
    }
  }

  pub fn remove_task(&mut self, id: TaskId) -> Result<Option<Task>, FleetError> {
    match self.tasks.iter().position(|t| t.id == id) {
      Some(index) => {
        let task = self.tasks.remove(index);
        debug!(task_id = id, "task removed");
        Ok(Some(task))
      }
      None => self.missing(FleetError::TaskNotFound(id)).map(|_| None),
    }
  }

  pub fn clear_notification(&mut self, id: Uuid) -> Result<(), FleetError> {
    match self.notifications.iter().position(|n| n.id == id) {
      Some(index) => {
        self.notifications.remove(index);
        Ok(())
      }
      None => self.missing(FleetError::NotificationNotFound(id)),
    }
  }

  /// One bot-tick pass over the whole fleet, in fleet order.
  pub fn bot_tick(&mut self, rng: &mut dyn SimRandom) {
    let now = self.clock.now();
    for bot in self.bots.iter_mut() {
      if let Some(change) = lifecycle::advance(bot, rng, now) {
        info!(
          bot_id = bot.id,
          battery = bot.battery,
          "bot {} {} -> {}",
          bot.name,
          change.from.as_str(),
          change.to.as_str()
        );
      }
    }
    self.last_update = now;
  }

  /// Drops the first pending task by position, as if it completed unattended.
  pub fn decay_task(&mut self) -> Option<Task> {
    let index = self.tasks.iter().position(|t| t.is_pending())?;
    let task = self.tasks.remove(index);
    info!(task_id = task.id, "task completed automatically: {}", task.route());
    self.notify(EventKind::Success, "Task completed automatically");
    Some(task)
  }

  /// Stops a busy bot or resets a faulted one.
  pub fn stop_bot(&mut self, id: BotId) -> Result<(), FleetError> {
    match self.bot(id).map(|b| b.status) {
      Some(BotStatus::Busy | BotStatus::Error) => self.update_bot(id, BotPatch::released()),
      Some(_) => Ok(()),
      None => self.missing(FleetError::BotNotFound(id)),
    }
  }

  pub fn charge_bot(&mut self, id: BotId) -> Result<(), FleetError> {
    match self.bot(id).map(|b| b.status) {
      Some(BotStatus::Error) => Ok(()),
      Some(_) => self.update_bot(id, BotPatch::charging()),
      None => self.missing(FleetError::BotNotFound(id)),
    }
  }

  /// Releases every bot that is neither charging nor faulted. Returns how many changed.
  pub fn set_all_idle(&mut self) -> usize {
    let mut changed = 0;
    for bot in self.bots.iter_mut().filter(|b| !matches!(b.status, BotStatus::Charging | BotStatus::Error)) {
      if bot.status != BotStatus::Idle {
        changed += 1;
      }
      BotPatch::released().apply(bot);
    }
    info!(changed, "all eligible bots set idle");
    changed
  }

  pub fn charge_all(&mut self) -> usize {
    let mut changed = 0;
    for bot in self.bots.iter_mut().filter(|b| b.status != BotStatus::Error) {
      if bot.status != BotStatus::Charging {
        changed += 1;
      }
      BotPatch::charging().apply(bot);
    }
    info!(changed, "all eligible bots sent to charge");
    changed
  }

  fn notify(&mut self, kind: EventKind, message: impl Into<String>) {
    self.notifications.push_front(Notification {
      id: Uuid::new_v4(),
      kind,
      message: message.into(),
      timestamp: self.clock.now(),
    });
    self.notifications.truncate(NOTIFICATION_CAPACITY);
  }

  fn next_task_id(&mut self, now: DateTime<Utc>) -> TaskId {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    self.last_task_id = millis.max(self.last_task_id + 1);
    self.last_task_id
  }

  fn missing(&self, err: FleetError) -> Result<(), FleetError> {
    if self.strict {
      return Err(err);
    }
    debug!("ignored: {}", err);
    Ok(())
  }
}
