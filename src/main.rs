use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use fleetsim::{config::Config, engine::spawn_engine, fleet::Fleet, routes::routes};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();
  let config = Config::from_env().context("Failed to read configuration")?;

  let (handle, engine) = spawn_engine(Fleet::from_config(&config), config.timings);
  let api = routes(handle.clone(), config.sse_interval);

  let (addr, server) = warp::serve(api)
    .try_bind_with_graceful_shutdown(([0, 0, 0, 0], config.server_port), async {
      let _ = tokio::signal::ctrl_c().await;
    })
    .context("Failed to bind HTTP listener")?;
  info!(%addr, strict_ids = config.strict_ids, "fleet API listening");
  server.await;

  handle.shutdown().await;
  engine.await.context("Fleet engine panicked")?;
  Ok(())
}
