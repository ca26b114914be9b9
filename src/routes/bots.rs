use warp::Filter;
use warp::http::StatusCode;

use crate::engine::FleetHandle;
use crate::models::{BotId, BotPatch};
use super::{reject, with_fleet};

pub fn bot_routes(handle: FleetHandle) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  let list = warp::path!("bots")
    .and(warp::get())
    .and(with_fleet(handle.clone()))
    .and_then(handle_list_bots);

  let patch = warp::path!("bots" / BotId)
    .and(warp::patch())
    .and(warp::body::json())
    .and(with_fleet(handle.clone()))
    .and_then(handle_patch_bot);

  let stop = warp::path!("bots" / BotId / "stop")
    .and(warp::post())
    .and(with_fleet(handle.clone()))
    .and_then(handle_stop_bot);

  let charge = warp::path!("bots" / BotId / "charge")
    .and(warp::post())
    .and(with_fleet(handle.clone()))
    .and_then(handle_charge_bot);

  let idle_all = warp::path!("bots" / "idle-all")
    .and(warp::post())
    .and(with_fleet(handle.clone()))
    .and_then(handle_idle_all);

  let charge_all = warp::path!("bots" / "charge-all")
    .and(warp::post())
    .and(with_fleet(handle.clone()))
    .and_then(handle_charge_all);

  let free = warp::path!("bots" / "free")
    .and(warp::post())
    .and(with_fleet(handle))
    .and_then(handle_free_bot);

  list
    .or(idle_all)
    .or(charge_all)
    .or(free)
    .or(patch)
    .or(stop)
    .or(charge)
}

async fn handle_list_bots(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let snapshot = handle.snapshot().await.map_err(reject)?;
  Ok(warp::reply::json(&snapshot.bots))
}

async fn handle_patch_bot(bot_id: BotId, patch: BotPatch, handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  handle.update_bot(bot_id, patch).await.map_err(reject)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn handle_stop_bot(bot_id: BotId, handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  handle.stop_bot(bot_id).await.map_err(reject)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn handle_charge_bot(bot_id: BotId, handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  handle.charge_bot(bot_id).await.map_err(reject)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn handle_idle_all(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let changed = handle.set_all_idle().await.map_err(reject)?;
  Ok(warp::reply::json(&serde_json::json!({ "changed": changed })))
}

async fn handle_charge_all(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let changed = handle.charge_all().await.map_err(reject)?;
  Ok(warp::reply::json(&serde_json::json!({ "changed": changed })))
}

async fn handle_free_bot(handle: FleetHandle) -> Result<impl warp::Reply, warp::Rejection> {
  let freed = handle.free_bot().await.map_err(reject)?;
  Ok(warp::reply::json(&serde_json::json!({ "botId": freed })))
}
