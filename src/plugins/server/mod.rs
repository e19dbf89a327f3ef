mod handlers;

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
  Router,
  routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let governor_limiter = governor_conf.limiter().clone();

    tokio::spawn(async move {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        governor_limiter.retain_recent();
      }
    });

    let port = app.config.port;

    let router = Router::new()
      .route("/health", get(handlers::health))
      .route("/api/track", get(handlers::track))
      .route("/api/affiliates", post(handlers::register))
      .route("/api/affiliates/{id}", get(handlers::get_affiliate))
      .route("/api/affiliates/code/{code}", get(handlers::affiliate_by_code))
      .route("/api/affiliates/{id}/status", put(handlers::set_status))
      .route(
        "/api/affiliates/{id}/commission",
        put(handlers::set_commission),
      )
      .route("/api/affiliates/{id}/referrals", get(handlers::referrals))
      .route("/api/affiliates/{id}/products", get(handlers::products))
      .route(
        "/api/affiliates/{id}/products/{product_id}",
        put(handlers::set_markup).delete(handlers::remove_markup),
      )
      .route(
        "/api/affiliates/{id}/products/{product_id}/price",
        get(handlers::price),
      )
      .route(
        "/api/affiliates/{id}/stats",
        get(handlers::stats).post(handlers::recompute_stats),
      )
      .route(
        "/api/affiliates/{id}/payouts",
        get(handlers::payouts).post(handlers::request_payout),
      )
      .route("/api/payouts/{id}/settle", post(handlers::settle))
      .route(
        "/api/payouts/{id}/commissions",
        get(handlers::payout_commissions),
      )
      .route("/api/orders", post(handlers::place_order))
      .route("/api/orders/{id}", get(handlers::get_order))
      .route("/api/orders/{id}/items", get(handlers::order_items))
      .route("/api/orders/{id}/job", get(handlers::order_job))
      .route(
        "/api/orders/{id}/commissions",
        get(handlers::commissions).post(handlers::calculate),
      )
      .route(
        "/api/orders/{id}/commissions/affiliate",
        post(handlers::calculate_affiliate),
      )
      .route("/api/orders/{id}/confirm", post(handlers::confirm))
      .route("/api/orders/{id}/cancel", post(handlers::cancel))
      .route(
        "/api/companies/{id}/commissions/stats",
        get(handlers::commission_stats),
      )
      .route("/api/jobs/dead", get(handlers::dead_jobs))
      .route("/api/jobs/{id}/requeue", post(handlers::requeue_job))
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .with_state(app)
      .into_make_service_with_connect_info::<SocketAddr>();

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;

    info!("HTTP Server listening on {addr}");

    axum::serve(listener, router).await.context("HTTP server error")?;
    Ok(())
  }
}
