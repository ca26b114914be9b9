//! Synchronous fleet core: store, dispatcher and random source under one owner.
//!
//! Every method runs to completion on `&mut self`, so the engine only has to
//! call them one at a time to keep mutations serialized.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::analytics::FleetAnalytics;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dispatcher::{AssignOutcome, Dispatcher};
use crate::error::FleetError;
use crate::models::{AssignmentEvent, BotId, BotPatch, FleetSnapshot, TaskDraft, TaskId};
use crate::random::{seeded, SimRandom};
use crate::store::FleetStore;

/// The periodic processes, each of which can also be stepped by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Process {
  BotTick,
  TaskDecay,
  AutoAssign,
}

pub struct Fleet {
  store: FleetStore,
  dispatcher: Dispatcher,
  rng: Box<dyn SimRandom + Send>,
}

impl Fleet {
  pub fn new(store: FleetStore, rng: Box<dyn SimRandom + Send>) -> Self {
    let dispatcher = Dispatcher::new(store.clock().clone());
    Self { store, dispatcher, rng }
  }

  pub fn from_config(config: &Config) -> Self {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = FleetStore::seeded(clock).strict(config.strict_ids);
    Self::new(store, Box::new(seeded(config.seed)))
  }

  pub fn store(&self) -> &FleetStore {
    &self.store
  }

  pub fn dispatcher(&self) -> &Dispatcher {
    &self.dispatcher
  }

  pub fn run(&mut self, process: Process) {
    debug!(?process, "process tick");
    match process {
      Process::BotTick => self.store.bot_tick(&mut *self.rng),
      Process::TaskDecay => {
        self.store.decay_task();
      }
      Process::AutoAssign => {
        self.dispatcher.auto_assign_cycle(&mut self.store, &mut *self.rng);
      }
    }
  }

  /// True while the auto-assign timer should be firing.
  pub fn auto_assign_armed(&self) -> bool {
    self.dispatcher.is_armed(&self.store)
  }

  pub fn snapshot(&self) -> FleetSnapshot {
    self.store.snapshot(self.dispatcher.is_auto_assign())
  }

  pub fn analytics(&self) -> FleetAnalytics {
    FleetAnalytics::compute(self.store.bots(), self.store.tasks())
  }

  pub fn history(&self) -> Vec<AssignmentEvent> {
    self.dispatcher.history().cloned().collect()
  }

  /// Queues the draft; a named bot that is available takes the task straight away.
  pub fn add_task(&mut self, draft: TaskDraft) -> TaskId {
    let assigned_bot = draft.assigned_bot;
    let task_id = self.store.add_task(draft);
    if let Some(bot_id) = assigned_bot {
      if self.store.bot(bot_id).is_some_and(|b| b.is_available()) {
        let outcome = self.dispatcher.assign_task_to_bot(&mut self.store, task_id, bot_id, &mut *self.rng);
        debug!(task_id, bot_id, ?outcome, "assigned on creation");
      }
    }
    task_id
  }

  pub fn update_bot(&mut self, id: BotId, patch: BotPatch) -> Result<(), FleetError> {
    self.store.update_bot(id, patch)
  }

  pub fn remove_task(&mut self, id: TaskId) -> Result<(), FleetError> {
    self.store.remove_task(id).map(|_| ())
  }

  pub fn clear_notification(&mut self, id: Uuid) -> Result<(), FleetError> {
    self.store.clear_notification(id)
  }

  pub fn refresh_now(&mut self) {
    self.run(Process::BotTick);
  }

  pub fn toggle_auto_assign(&mut self) -> bool {
    self.dispatcher.toggle_auto_assign()
  }

  pub fn assign_manually(&mut self, task_id: TaskId) -> Result<AssignOutcome, FleetError> {
    self.dispatcher.assign_manually(&mut self.store, task_id, &mut *self.rng)
  }

  pub fn assign_task_to_bot(&mut self, task_id: TaskId, bot_id: BotId) -> Result<AssignOutcome, FleetError> {
    self.dispatcher.assign_task_to_bot(&mut self.store, task_id, bot_id, &mut *self.rng)
  }

  pub fn free_bot(&mut self) -> Option<BotId> {
    self.dispatcher.free_bot(&mut self.store)
  }

  pub fn stop_bot(&mut self, id: BotId) -> Result<(), FleetError> {
    self.store.stop_bot(id)
  }

  pub fn charge_bot(&mut self, id: BotId) -> Result<(), FleetError> {
    self.store.charge_bot(id)
  }

  pub fn set_all_idle(&mut self) -> usize {
    self.store.set_all_idle()
  }

  pub fn charge_all(&mut self) -> usize {
    self.store.charge_all()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};
  use crate::clock::ManualClock;
  use crate::models::{BotStatus, Priority};
  use crate::random::ScriptedRandom;

  fn fleet(rng: ScriptedRandom) -> Fleet {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 5, 7, 30, 0).unwrap()));
    Fleet::new(FleetStore::seeded(clock), Box::new(rng))
  }

  #[test]
  fn auto_assign_step_takes_high_priority_seed_task() {
    let mut fleet = fleet(ScriptedRandom::new());
    fleet.run(Process::AutoAssign);
    // Alpha is the first idle bot above the floor.
    let alpha = fleet.store().bot(1).unwrap();
    assert_eq!(alpha.status, BotStatus::Busy);
    assert_eq!(alpha.current_task, "Warehouse A → Customer X");
    assert!(fleet.store().task(1).is_none());
    assert_eq!(fleet.store().tasks().len(), 2);
  }

  #[test]
  fn arming_follows_toggle_and_queue() {
    let mut fleet = fleet(ScriptedRandom::new());
    assert!(fleet.auto_assign_armed());
    fleet.toggle_auto_assign();
    assert!(!fleet.auto_assign_armed());
    fleet.toggle_auto_assign();
    for _ in 0..3 {
      fleet.run(Process::TaskDecay);
    }
    assert!(!fleet.auto_assign_armed());
    assert!(fleet.snapshot().auto_assign);
  }

  #[test]
  fn add_task_with_available_bot_assigns_immediately() {
    let mut fleet = fleet(ScriptedRandom::new());
    let mut draft = TaskDraft::new("Dock 2", "Bay 9", Priority::Low);
    draft.assigned_bot = Some(9);
    let id = fleet.add_task(draft);
    assert!(fleet.store().task(id).is_none());
    assert_eq!(fleet.store().bot(9).unwrap().current_task, "Dock 2 → Bay 9");
  }

  #[test]
  fn add_task_with_unavailable_bot_stays_queued() {
    let mut fleet = fleet(ScriptedRandom::new());
    let mut draft = TaskDraft::new("Dock 2", "Bay 9", Priority::Low);
    // Delta is faulted.
    draft.assigned_bot = Some(4);
    let id = fleet.add_task(draft);
    assert!(fleet.store().task(id).is_some());
  }

  #[test]
  fn refresh_now_runs_one_bot_tick() {
    let mut fleet = fleet(ScriptedRandom::new());
    fleet.refresh_now();
    assert_eq!(fleet.store().bot(1).unwrap().battery, 84);
    assert_eq!(fleet.store().bot(3).unwrap().battery, 90);
  }
}
