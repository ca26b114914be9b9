use std::collections::{BinaryHeap, VecDeque};
use std::cmp::{Ordering, Reverse};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::FleetError;
use crate::lifecycle::work_speed;
use crate::models::{AssignmentEvent, BotId, BotPatch, BotStatus, EventKind, Task, TaskId};
use crate::random::SimRandom;
use crate::store::FleetStore;

pub const HISTORY_CAPACITY: usize = 10;
/// A busy bot needs more than this to be freed by hand.
pub const FREE_BATTERY_FLOOR: u8 = 20;

/// Pending task ranked for dispatch: higher priority first, then older,
/// then earlier in the queue.
#[derive(Debug)]
struct QueuedTask<'a> {
  task: &'a Task,
  position: usize,
}

impl QueuedTask<'_> {
  fn key(&self) -> (u8, Reverse<chrono::DateTime<chrono::Utc>>, Reverse<usize>) {
    (self.task.priority.rank(), Reverse(self.task.created_at), Reverse(self.position))
  }
}

impl Eq for QueuedTask<'_> {}

impl PartialEq for QueuedTask<'_> {
  fn eq(&self, other: &Self) -> bool {
    self.key() == other.key()
  }
}

impl PartialOrd for QueuedTask<'_> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for QueuedTask<'_> {
  fn cmp(&self, other: &Self) -> Ordering {
    self.key().cmp(&other.key())
  }
}

/// Pending tasks in dispatch order.
pub fn dispatch_order(tasks: &[Task]) -> Vec<&Task> {
  let mut queue: BinaryHeap<QueuedTask> = tasks
    .iter()
    .enumerate()
    .filter(|(_, t)| t.is_pending())
    .map(|(position, task)| QueuedTask { task, position })
    .collect();
  let mut ordered = Vec::with_capacity(queue.len());
  while let Some(next) = queue.pop() {
    ordered.push(next.task);
  }
  ordered
}

pub fn next_task(tasks: &[Task]) -> Option<&Task> {
  tasks
    .iter()
    .enumerate()
    .filter(|(_, t)| t.is_pending())
    .map(|(position, task)| QueuedTask { task, position })
    .max()
    .map(|q| q.task)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AssignOutcome {
  Assigned { task_id: TaskId, bot_id: BotId },
  Paused,
  NoPendingTasks,
  NoAvailableBots,
  /// Task or bot id did not resolve; nothing changed.
  Unresolved,
}

/// Matches queued work to idle bots, one pair per cycle.
pub struct Dispatcher {
  auto_assign: bool,
  history: VecDeque<AssignmentEvent>,
  clock: Arc<dyn Clock>,
}

impl Dispatcher {
  pub fn new(clock: Arc<dyn Clock>) -> Self {
    Self {
      auto_assign: true,
      history: VecDeque::with_capacity(HISTORY_CAPACITY),
      clock,
    }
  }

  pub fn is_auto_assign(&self) -> bool {
    self.auto_assign
  }

  pub fn toggle_auto_assign(&mut self) -> bool {
    self.auto_assign = !self.auto_assign;
    info!(enabled = self.auto_assign, "auto-assign toggled");
    self.auto_assign
  }

  /// Newest first.
  pub fn history(&self) -> impl Iterator<Item = &AssignmentEvent> {
    self.history.iter()
  }

  /// Whether the periodic cycle should be running at all.
  pub fn is_armed(&self, store: &FleetStore) -> bool {
    self.auto_assign && store.has_pending()
  }

  pub fn auto_assign_cycle(&mut self, store: &mut FleetStore, rng: &mut dyn SimRandom) -> AssignOutcome {
    if !self.auto_assign {
      return AssignOutcome::Paused;
    }
    let Some(task_id) = next_task(store.tasks()).map(|t| t.id) else {
      return AssignOutcome::NoPendingTasks;
    };
    let Some(bot_id) = store.available_bots().next().map(|b| b.id) else {
      warn!(task_id, "no available bots for assignment");
      self.record(store, "No available bots for assignment", EventKind::Warning);
      return AssignOutcome::NoAvailableBots;
    };
    match self.assign_task_to_bot(store, task_id, bot_id, rng) {
      Ok(outcome) => outcome,
      Err(_) => AssignOutcome::Unresolved,
    }
  }

  /// Hands `task_id` to `bot_id`: the task leaves the queue and the bot goes busy on its route.
  pub fn assign_task_to_bot(
    &mut self,
    store: &mut FleetStore,
    task_id: TaskId,
    bot_id: BotId,
    rng: &mut dyn SimRandom,
  ) -> Result<AssignOutcome, FleetError> {
    let Some(route) = store.task(task_id).map(|t| t.route()) else {
      return unresolved(store, FleetError::TaskNotFound(task_id));
    };
    let Some(name) = store.bot(bot_id).map(|b| b.name.clone()) else {
      return unresolved(store, FleetError::BotNotFound(bot_id));
    };

    // Counts are taken before the pair is applied.
    let message = format!("Task {task_id} assigned to {name}");
    self.record(store, message, EventKind::Success);

    store.remove_task(task_id)?;
    store.update_bot(
      bot_id,
      BotPatch {
        status: Some(BotStatus::Busy),
        current_task: Some(route.clone()),
        speed: Some(work_speed(rng)),
        last_completed_task: Some(route.clone()),
        task_assigned_at: Some(self.clock.now()),
        ..BotPatch::default()
      },
    )?;
    info!(task_id, bot_id, "assigned {} to {}", route, name);
    Ok(AssignOutcome::Assigned { task_id, bot_id })
  }

  /// Assigns a chosen task to the first available bot, ignoring queue order.
  pub fn assign_manually(
    &mut self,
    store: &mut FleetStore,
    task_id: TaskId,
    rng: &mut dyn SimRandom,
  ) -> Result<AssignOutcome, FleetError> {
    if store.task(task_id).is_none() {
      return unresolved(store, FleetError::TaskNotFound(task_id));
    }
    let first = store.available_bots().next().map(|b| b.id);
    match first {
      Some(bot_id) => self.assign_task_to_bot(store, task_id, bot_id, rng),
      None => {
        warn!(task_id, "no available bots at the moment");
        Ok(AssignOutcome::NoAvailableBots)
      }
    }
  }

  /// Releases the first busy bot that still has some charge.
  pub fn free_bot(&mut self, store: &mut FleetStore) -> Option<BotId> {
    let (bot_id, name) = store
      .bots()
      .iter()
      .find(|b| b.status == BotStatus::Busy && b.battery > FREE_BATTERY_FLOOR)
      .map(|b| (b.id, b.name.clone()))?;
    store.update_bot(bot_id, BotPatch::released()).ok()?;
    self.record(store, format!("Manually freed {name} for new tasks"), EventKind::Info);
    Some(bot_id)
  }

  fn record(&mut self, store: &FleetStore, message: impl Into<String>, kind: EventKind) {
    self.history.push_front(AssignmentEvent {
      id: Uuid::new_v4(),
      message: message.into(),
      kind,
      timestamp: self.clock.now(),
      bots_available: store.available_bots().count(),
      tasks_pending: store.pending_tasks().count(),
    });
    self.history.truncate(HISTORY_CAPACITY);
  }
}

fn unresolved(store: &FleetStore, err: FleetError) -> Result<AssignOutcome, FleetError> {
  if store.is_strict() {
    Err(err)
  } else {
    Ok(AssignOutcome::Unresolved)
  }
}
