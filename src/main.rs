mod config;
mod entity;
mod error;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  plugins::{App, cron, server},
  prelude::*,
  state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "affiliate=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;

  info!("Starting Affiliate Server v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::new(config).await?);

  App::new()
    .register(server::Plugin)
    .register(cron::CommissionJobs)
    .run(app)
    .await;

  Ok(())
}
