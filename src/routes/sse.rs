use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tracing::{debug, error};
use warp::Filter;

use crate::engine::FleetHandle;
use super::with_fleet;

/// Pushes a full fleet snapshot every `every`.
pub fn sse_route(handle: FleetHandle, every: Duration) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  warp::path!("sse")
    .and(warp::get())
    .and(with_fleet(handle))
    .map(move |handle: FleetHandle| handle_sse(handle, every))
}

fn handle_sse(handle: FleetHandle, every: Duration) -> impl warp::Reply {
  let interval = IntervalStream::new(tokio::time::interval(every));
  let stream = interval
    .then(move |_| {
      let handle = handle.clone();
      async move {
        match handle.snapshot().await {
          Ok(snapshot) => match warp::sse::Event::default().event("snapshot").json_data(&snapshot) {
            Ok(event) => Some(Ok::<_, Infallible>(event)),
            Err(e) => {
              error!("Failed to encode snapshot event: {:?}", e);
              None
            }
          },
          Err(e) => {
            debug!("Snapshot unavailable for SSE: {}", e);
            None
          }
        }
      }
    })
    .filter_map(|x| x);

  warp::sse::reply(warp::sse::keep_alive().stream(stream))
}
