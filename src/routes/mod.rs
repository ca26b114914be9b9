use std::convert::Infallible;
use std::time::Duration;

use serde::Serialize;
use tracing::error;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::engine::FleetHandle;
use crate::error::FleetError;

pub mod bots;
pub mod fleet;
pub mod sse;
pub mod tasks;

#[derive(Debug)]
pub struct FleetRejection(pub FleetError);
impl warp::reject::Reject for FleetRejection {}

pub(crate) fn reject(err: FleetError) -> Rejection {
  warp::reject::custom(FleetRejection(err))
}

pub(crate) fn with_fleet(handle: FleetHandle) -> impl Filter<Extract = (FleetHandle,), Error = Infallible> + Clone {
  warp::any().map(move || handle.clone())
}

pub fn routes(
  handle: FleetHandle,
  sse_interval: Duration,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
  tasks::task_routes(handle.clone())
    .or(bots::bot_routes(handle.clone()))
    .or(fleet::fleet_routes(handle.clone()))
    .or(sse::sse_route(handle, sse_interval))
    .recover(handle_rejection)
}

#[derive(Serialize)]
struct ErrorBody {
  code: u16,
  message: String,
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
  let (code, message) = if let Some(FleetRejection(err)) = rejection.find::<FleetRejection>() {
    let code = match err {
      e if e.is_not_found() => StatusCode::NOT_FOUND,
      FleetError::InvalidDraft(_) => StatusCode::BAD_REQUEST,
      FleetError::EngineStopped => StatusCode::SERVICE_UNAVAILABLE,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, err.to_string())
  } else if rejection.is_not_found() {
    (StatusCode::NOT_FOUND, "not found".to_string())
  } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
    (StatusCode::BAD_REQUEST, e.to_string())
  } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
    (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
  } else {
    error!("unhandled rejection: {:?}", rejection);
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
  };

  let body = warp::reply::json(&ErrorBody { code: code.as_u16(), message });
  Ok(warp::reply::with_status(body, code))
}
