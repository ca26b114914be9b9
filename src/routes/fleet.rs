use uuid::Uuid;
use warp::Filter;
use warp::http::StatusCode;

use crate::engine::FleetHandle;
use super::{reject, with_fleet};

pub fn fleet_routes(handle: FleetHandle) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  let state = warp::path!("state")
    .and(warp::get())
    .and(with_fleet(handle.clone()))
    .and_then(handle_state);

  let analytics = warp::path!("analytics")
    .and(warp::get())
    .and(with_fleet(handle.clone()))
    .and_then(handle_analytics);

  let history = warp::path!("history")
    .and(warp::get())
    .and(with_fleet(handle.clone()))
    .and_then(handle_history);

  let refresh = warp::path!("refresh")
    .and(warp::post())
    .and(with_fleet(handle.clone()))
    .and_then(handle_refresh);

  let toggle = warp::path!("auto-assign" / "toggle")
    .and(warp::post())
    .and(with_fleet(handle.clone()))
    .and_then(handle_toggle);

  let clear = warp::path!("notifications" / Uuid)
    .and(warp::delete())
    .and(with_fleet(handle))
    .and_then(handle_clear_notification);

  state.or(analytics).or(history).or(refresh).or(toggle).or(clear)
}

async fn handle_state(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let snapshot = handle.snapshot().await.map_err(reject)?;
  Ok(warp::reply::json(&snapshot))
}

async fn handle_analytics(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let analytics = handle.analytics().await.map_err(reject)?;
  Ok(warp::reply::json(&analytics))
}

async fn handle_history(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let history = handle.history().await.map_err(reject)?;
  Ok(warp::reply::json(&history))
}

async fn handle_refresh(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  handle.refresh_now().await.map_err(reject)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn handle_toggle(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let enabled = handle.toggle_auto_assign().await.map_err(reject)?;
  Ok(warp::reply::json(&serde_json::json!({ "autoAssign": enabled })))
}

async fn handle_clear_notification(id: Uuid, handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  handle.clear_notification(id).await.map_err(reject)?;
  Ok(StatusCode::NO_CONTENT)
}
