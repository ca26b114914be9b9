use thiserror::Error;
use uuid::Uuid;

use crate::models::{BotId, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
  #[error("bot {0} not found")]
  BotNotFound(BotId),
  #[error("task {0} not found")]
  TaskNotFound(TaskId),
  #[error("notification {0} not found")]
  NotificationNotFound(Uuid),
  #[error("invalid task draft: {0}")]
  InvalidDraft(String),
  #[error("fleet engine is not running")]
  EngineStopped,
}

impl FleetError {
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      FleetError::BotNotFound(_) | FleetError::TaskNotFound(_) | FleetError::NotificationNotFound(_)
    )
  }
}
