//! Runs a [`Fleet`] on its own task and drives the periodic processes.
//!
//! Timers and commands are multiplexed in a single `select!` loop, so each
//! timer callback or command runs to completion before the next one starts.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analytics::FleetAnalytics;
use crate::config::Timings;
use crate::dispatcher::AssignOutcome;
use crate::error::FleetError;
use crate::fleet::{Fleet, Process};
use crate::models::{AssignmentEvent, BotId, BotPatch, FleetSnapshot, TaskDraft, TaskId};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<T>;

enum Command {
  Snapshot(Reply<FleetSnapshot>),
  Analytics(Reply<FleetAnalytics>),
  History(Reply<Vec<AssignmentEvent>>),
  AddTask(TaskDraft, Reply<TaskId>),
  UpdateBot(BotId, BotPatch, Reply<Result<(), FleetError>>),
  RemoveTask(TaskId, Reply<Result<(), FleetError>>),
  ClearNotification(Uuid, Reply<Result<(), FleetError>>),
  RefreshNow(Reply<()>),
  ToggleAutoAssign(Reply<bool>),
  AssignManually(TaskId, Reply<Result<AssignOutcome, FleetError>>),
  FreeBot(Reply<Option<BotId>>),
  StopBot(BotId, Reply<Result<(), FleetError>>),
  ChargeBot(BotId, Reply<Result<(), FleetError>>),
  SetAllIdle(Reply<usize>),
  ChargeAll(Reply<usize>),
  Shutdown,
}

/// Cloneable front door to a running engine.
#[derive(Clone)]
pub struct FleetHandle {
  tx: mpsc::Sender<Command>,
}

impl FleetHandle {
  async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, FleetError> {
    let (reply, rx) = oneshot::channel();
    self.tx.send(make(reply)).await.map_err(|_| FleetError::EngineStopped)?;
    rx.await.map_err(|_| FleetError::EngineStopped)
  }

  pub async fn snapshot(&self) -> Result<FleetSnapshot, FleetError> {
    self.request(Command::Snapshot).await
  }

  pub async fn analytics(&self) -> Result<FleetAnalytics, FleetError> {
    self.request(Command::Analytics).await
  }

  pub async fn history(&self) -> Result<Vec<AssignmentEvent>, FleetError> {
    self.request(Command::History).await
  }

  pub async fn add_task(&self, draft: TaskDraft) -> Result<TaskId, FleetError> {
    self.request(|reply| Command::AddTask(draft, reply)).await
  }

  pub async fn update_bot(&self, id: BotId, patch: BotPatch) -> Result<(), FleetError> {
    self.request(|reply| Command::UpdateBot(id, patch, reply)).await?
  }

  pub async fn remove_task(&self, id: TaskId) -> Result<(), FleetError> {
    self.request(|reply| Command::RemoveTask(id, reply)).await?
  }

  pub async fn clear_notification(&self, id: Uuid) -> Result<(), FleetError> {
    self.request(|reply| Command::ClearNotification(id, reply)).await?
  }

  pub async fn refresh_now(&self) -> Result<(), FleetError> {
    self.request(Command::RefreshNow).await
  }

  /// Returns the new auto-assign state.
  pub async fn toggle_auto_assign(&self) -> Result<bool, FleetError> {
    self.request(Command::ToggleAutoAssign).await
  }

  pub async fn assign_manually(&self, task_id: TaskId) -> Result<AssignOutcome, FleetError> {
    self.request(|reply| Command::AssignManually(task_id, reply)).await?
  }

  pub async fn free_bot(&self) -> Result<Option<BotId>, FleetError> {
    self.request(Command::FreeBot).await
  }

  pub async fn stop_bot(&self, id: BotId) -> Result<(), FleetError> {
    self.request(|reply| Command::StopBot(id, reply)).await?
  }

  pub async fn charge_bot(&self, id: BotId) -> Result<(), FleetError> {
    self.request(|reply| Command::ChargeBot(id, reply)).await?
  }

  pub async fn set_all_idle(&self) -> Result<usize, FleetError> {
    self.request(Command::SetAllIdle).await
  }

  pub async fn charge_all(&self) -> Result<usize, FleetError> {
    self.request(Command::ChargeAll).await
  }

  pub async fn shutdown(&self) {
    let _ = self.tx.send(Command::Shutdown).await;
  }
}

/// Moves `fleet` onto a tokio task. Must be called inside a runtime.
pub fn spawn_engine(fleet: Fleet, timings: Timings) -> (FleetHandle, JoinHandle<()>) {
  let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
  let join = tokio::spawn(run(fleet, timings, rx));
  (FleetHandle { tx }, join)
}

/// Like `setInterval`: the first tick lands one full period from now.
fn every(period: Duration) -> Interval {
  let mut timer = interval_at(Instant::now() + period, period);
  timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
  timer
}

async fn run(mut fleet: Fleet, timings: Timings, mut rx: mpsc::Receiver<Command>) {
  let mut bot_timer = every(timings.bot_tick);
  let mut decay_timer = every(timings.task_decay);
  let mut assign_timer = every(timings.auto_assign);
  let mut armed = fleet.auto_assign_armed();
  info!(
    bot_tick_ms = timings.bot_tick.as_millis() as u64,
    task_decay_ms = timings.task_decay.as_millis() as u64,
    auto_assign_ms = timings.auto_assign.as_millis() as u64,
    "fleet engine started"
  );

  loop {
    tokio::select! {
      _ = bot_timer.tick() => fleet.run(Process::BotTick),
      _ = decay_timer.tick(), if timings.task_decay_enabled => fleet.run(Process::TaskDecay),
      _ = assign_timer.tick(), if armed => fleet.run(Process::AutoAssign),
      command = rx.recv() => match command {
        Some(Command::Shutdown) | None => break,
        Some(command) => handle(&mut fleet, command),
      },
    }

    let now_armed = fleet.auto_assign_armed();
    if now_armed && !armed {
      // Resume a full period after re-arming rather than firing a backlog.
      assign_timer.reset();
    }
    armed = now_armed;
  }
  info!("fleet engine stopped");
}

fn handle(fleet: &mut Fleet, command: Command) {
  let delivered = match command {
    Command::Snapshot(reply) => reply.send(fleet.snapshot()).is_ok(),
    Command::Analytics(reply) => reply.send(fleet.analytics()).is_ok(),
    Command::History(reply) => reply.send(fleet.history()).is_ok(),
    Command::AddTask(draft, reply) => reply.send(fleet.add_task(draft)).is_ok(),
    Command::UpdateBot(id, patch, reply) => reply.send(fleet.update_bot(id, patch)).is_ok(),
    Command::RemoveTask(id, reply) => reply.send(fleet.remove_task(id)).is_ok(),
    Command::ClearNotification(id, reply) => reply.send(fleet.clear_notification(id)).is_ok(),
    Command::RefreshNow(reply) => reply.send(fleet.refresh_now()).is_ok(),
    Command::ToggleAutoAssign(reply) => reply.send(fleet.toggle_auto_assign()).is_ok(),
    Command::AssignManually(id, reply) => reply.send(fleet.assign_manually(id)).is_ok(),
    Command::FreeBot(reply) => reply.send(fleet.free_bot()).is_ok(),
    Command::StopBot(id, reply) => reply.send(fleet.stop_bot(id)).is_ok(),
    Command::ChargeBot(id, reply) => reply.send(fleet.charge_bot(id)).is_ok(),
    Command::SetAllIdle(reply) => reply.send(fleet.set_all_idle()).is_ok(),
    Command::ChargeAll(reply) => reply.send(fleet.charge_all()).is_ok(),
    Command::Shutdown => true,
  };
  if !delivered {
    warn!("caller went away before the reply was sent");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use chrono::Utc;
  use tokio_test::assert_ok;
  use crate::clock::{Clock, ManualClock};
  use crate::models::{BotStatus, Priority};
  use crate::random::ScriptedRandom;
  use crate::store::FleetStore;

  fn fleet() -> Fleet {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
    Fleet::new(FleetStore::seeded(clock), Box::new(ScriptedRandom::new()))
  }

  fn timings(decay: bool) -> Timings {
    Timings {
      bot_tick: Duration::from_secs(10),
      task_decay: Duration::from_secs(3),
      auto_assign: Duration::from_secs(3),
      task_decay_enabled: decay,
    }
  }

  #[tokio::test(start_paused = true)]
  async fn nothing_fires_before_first_period() {
    let (handle, _join) = spawn_engine(fleet(), timings(true));
    tokio::time::sleep(Duration::from_millis(2900)).await;
    let snap = assert_ok!(handle.snapshot().await);
    assert_eq!(snap.tasks.len(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn auto_assign_fires_on_its_period() {
    let (handle, _join) = spawn_engine(fleet(), timings(false));
    tokio::time::sleep(Duration::from_millis(3100)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.tasks.len(), 2);
    assert_eq!(snap.bots[0].status, BotStatus::Busy);

    let history = handle.history().await.unwrap();
    assert_eq!(history.len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn paused_auto_assign_never_ticks_and_resumes_cleanly() {
    let (handle, _join) = spawn_engine(fleet(), timings(false));
    assert!(!handle.toggle_auto_assign().await.unwrap());
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(handle.snapshot().await.unwrap().tasks.len(), 3);
    assert!(handle.history().await.unwrap().is_empty());

    assert!(handle.toggle_auto_assign().await.unwrap());
    // No backlog burst: the first cycle lands one period after re-enabling.
    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert_eq!(handle.snapshot().await.unwrap().tasks.len(), 3);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.snapshot().await.unwrap().tasks.len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn decay_drains_queue_one_per_period() {
    let mut t = timings(true);
    t.auto_assign = Duration::from_secs(3600);
    let (handle, _join) = spawn_engine(fleet(), t);
    tokio::time::sleep(Duration::from_millis(6100)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.tasks.len(), 1);
    assert_eq!(
      snap.notifications.iter().filter(|n| n.message == "Task completed automatically").count(),
      2
    );
  }

  #[tokio::test(start_paused = true)]
  async fn bot_tick_runs_every_ten_seconds() {
    let mut t = timings(false);
    t.auto_assign = Duration::from_secs(3600);
    let (handle, _join) = spawn_engine(fleet(), t);
    tokio::time::sleep(Duration::from_millis(10_100)).await;
    let snap = handle.snapshot().await.unwrap();
    // Beta charges 45 -> 50.
    assert_eq!(snap.bots[1].battery, 50);
  }

  #[tokio::test]
  async fn actions_round_trip_through_handle() {
    let mut t = timings(false);
    t.auto_assign = Duration::from_secs(3600);
    let (handle, join) = spawn_engine(fleet(), t);

    let id = handle.add_task(TaskDraft::new("Dock 1", "Bay 4", Priority::Low)).await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().tasks[0].id, id);
    assert_eq!(handle.assign_manually(id).await.unwrap(), AssignOutcome::Assigned { task_id: id, bot_id: 1 });
    assert_ok!(handle.update_bot(404, BotPatch::default()).await);
    assert_ok!(handle.remove_task(404).await);
    assert_eq!(handle.free_bot().await.unwrap(), Some(1));

    handle.shutdown().await;
    join.await.unwrap();
    assert_eq!(handle.snapshot().await, Err(FleetError::EngineStopped));
  }
}
