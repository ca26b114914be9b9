use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, error};
use warp::Filter;
use warp::http::StatusCode;

use crate::engine::FleetHandle;
use crate::error::FleetError;
use crate::models::{TaskDraft, TaskId};
use super::{reject, with_fleet};

const MAX_LABEL_LEN: usize = 80;
const MAX_COMMENT_LEN: usize = 500;

fn sanitize_input(input: &str) -> bool {
  static LABEL: OnceLock<Regex> = OnceLock::new();
  let re = LABEL.get_or_init(|| Regex::new(r"^[\w\s.,#/&()'\-]+$").expect("label pattern is valid"));
  re.is_match(input)
}

/// Checks what the dashboard form used to: both locations present and plain text.
pub fn validate_draft(draft: &TaskDraft) -> Result<(), String> {
  for (field, value) in [("pickup", &draft.pickup), ("drop", &draft.drop)] {
    let value = value.trim();
    if value.is_empty() {
      return Err(format!("Missing field '{}'", field));
    }
    if value.chars().count() > MAX_LABEL_LEN || !sanitize_input(value) {
      return Err(format!("Invalid or unsafe value for field '{}'", field));
    }
  }
  if draft.comments.chars().count() > MAX_COMMENT_LEN {
    return Err("'comments' is too long".into());
  }
  if draft.estimated_time == 0 {
    return Err("'estimatedTime' must be a positive number of minutes".into());
  }
  Ok(())
}

pub fn task_routes(handle: FleetHandle) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  let list = warp::path!("tasks")
    .and(warp::get())
    .and(with_fleet(handle.clone()))
    .and_then(handle_list_tasks);

  let submit = warp::path!("tasks")
    .and(warp::post())
    .and(warp::body::json())
    .and(with_fleet(handle.clone()))
    .and_then(handle_submit_task);

  let delete = warp::path!("tasks" / TaskId)
    .and(warp::delete())
    .and(with_fleet(handle.clone()))
    .and_then(handle_delete_task);

  let assign = warp::path!("tasks" / TaskId / "assign")
    .and(warp::post())
    .and(with_fleet(handle))
    .and_then(handle_assign_task);

  list.or(submit).or(delete).or(assign)
}

async fn handle_list_tasks(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let snapshot = handle.snapshot().await.map_err(reject)?;
  Ok(warp::reply::json(&snapshot.tasks))
}

async fn handle_submit_task(mut draft: TaskDraft, handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  if let Err(e) = validate_draft(&draft) {
    error!("Task validation failed: {}", e);
    return Err(reject(FleetError::InvalidDraft(e)));
  }
  draft.pickup = draft.pickup.trim().to_string();
  draft.drop = draft.drop.trim().to_string();

  let task_id = handle.add_task(draft).await.map_err(reject)?;
  info!("Task {} submitted successfully", task_id);
  let body = warp::reply::json(&serde_json::json!({ "taskId": task_id, "status": "pending" }));
  Ok(warp::reply::with_status(body, StatusCode::CREATED))
}

async fn handle_delete_task(task_id: TaskId, handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  handle.remove_task(task_id).await.map_err(reject)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn handle_assign_task(task_id: TaskId, handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let outcome = handle.assign_manually(task_id).await.map_err(reject)?;
  Ok(warp::reply::json(&outcome))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Priority;

  #[test]
  fn accepts_plain_locations() {
    let draft = TaskDraft::new("Warehouse A", "Dock 3/B", Priority::High);
    assert_eq!(validate_draft(&draft), Ok(()));
  }

  #[test]
  fn rejects_blank_and_markup() {
    let blank = TaskDraft::new("  ", "Bay 1", Priority::Low);
    assert_eq!(validate_draft(&blank), Err("Missing field 'pickup'".into()));

    let markup = TaskDraft::new("Bay 1", "<script>", Priority::Low);
    assert!(validate_draft(&markup).unwrap_err().contains("'drop'"));

    let mut zero = TaskDraft::new("Bay 1", "Bay 2", Priority::Low);
    zero.estimated_time = 0;
    assert!(validate_draft(&zero).is_err());
  }

  #[test]
  fn comments_are_free_text() {
    let mut draft = TaskDraft::new("Warehouse A", "Bay 2", Priority::Medium);
    draft.comments = "Fragile items! Handle with care: glass? ask @front-desk".into();
    assert_eq!(validate_draft(&draft), Ok(()));

    draft.comments = "x".repeat(MAX_COMMENT_LEN + 1);
    assert!(validate_draft(&draft).is_err());
  }
}
