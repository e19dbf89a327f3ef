use std::{net::SocketAddr, sync::Arc};

use axum::{
  Json,
  extract::{ConnectInfo, Path, Query, State},
  http::{HeaderMap, StatusCode, header::USER_AGENT},
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{
    AffiliateStatus, CommissionMode, PaymentDetails, ReferralSource,
    affiliate, affiliate_payout, affiliate_product, affiliate_referral,
    commission, commission_job, order, order_item,
  },
  prelude::*,
  state::AppState,
  sv::{
    AffiliateStats, CommissionFilter, CommissionStats, ExternalSettlement,
    NewOrder, PayoutAllocation, PriceQuote, ReferralMeta, RegisterAffiliate,
  },
};

type App = State<Arc<AppState>>;
type Reply<T> = Result<Json<T>>;

#[derive(Serialize)]
pub struct Status {
  success: bool,
  msg: Option<String>,
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let code = match self.kind() {
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Conflict => StatusCode::CONFLICT,
      ErrorKind::InvalidState => StatusCode::UNPROCESSABLE_ENTITY,
      ErrorKind::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
      ErrorKind::Validation => StatusCode::BAD_REQUEST,
      ErrorKind::Internal => {
        error!("Request failed: {}", self);
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };

    let body = Status { success: false, msg: Some(self.user_message()) };
    (code, Json(body)).into_response()
  }
}

pub async fn health() -> Json<Status> {
  Json(Status { success: true, msg: None })
}

pub async fn register(
  State(app): App,
  Json(req): Json<RegisterAffiliate>,
) -> Reply<affiliate::Model> {
  Ok(Json(app.sv().affiliate.register(req).await?))
}

pub async fn get_affiliate(
  State(app): App,
  Path(id): Path<i32>,
) -> Reply<affiliate::Model> {
  Ok(Json(app.sv().affiliate.by_id(id).await?))
}

pub async fn affiliate_by_code(
  State(app): App,
  Path(code): Path<String>,
) -> Reply<affiliate::Model> {
  Ok(Json(app.sv().affiliate.by_code(&code).await?))
}

#[derive(Deserialize)]
pub struct SetCommission {
  mode: CommissionMode,
  /// Basis points.
  rate: i32,
}

pub async fn set_commission(
  State(app): App,
  Path(id): Path<i32>,
  Json(req): Json<SetCommission>,
) -> Reply<affiliate::Model> {
  let affiliate =
    app.sv().affiliate.set_commission(id, req.mode, req.rate).await?;
  Ok(Json(affiliate))
}

#[derive(Deserialize)]
pub struct SetStatus {
  status: AffiliateStatus,
}

pub async fn set_status(
  State(app): App,
  Path(id): Path<i32>,
  Json(req): Json<SetStatus>,
) -> Reply<affiliate::Model> {
  Ok(Json(app.sv().affiliate.set_status(id, req.status).await?))
}

#[derive(Deserialize)]
pub struct TrackQuery {
  #[serde(rename = "ref")]
  code: Option<String>,
  affiliate: Option<String>,
  customer_id: Option<i64>,
  url: Option<String>,
  #[serde(default)]
  source: ReferralSource,
}

/// Attribution entry point for `?ref=` and `?affiliate=` links. Safe to hit
/// on every page view.
pub async fn track(
  State(app): App,
  ConnectInfo(peer): ConnectInfo<SocketAddr>,
  headers: HeaderMap,
  Query(query): Query<TrackQuery>,
) -> Reply<affiliate_referral::Model> {
  let code = query
    .code
    .or(query.affiliate)
    .ok_or_else(|| Error::InvalidArgs("Missing `ref` parameter".into()))?;

  let meta = ReferralMeta {
    ip_address: peer.ip().to_string(),
    user_agent: headers
      .get(USER_AGENT)
      .and_then(|ua| ua.to_str().ok())
      .map(Into::into),
    landing_url: query.url,
    source: query.source,
  };

  let referral =
    app.sv().referral.track(code.trim(), query.customer_id, meta).await?;
  Ok(Json(referral))
}

pub async fn referrals(
  State(app): App,
  Path(id): Path<i32>,
) -> Reply<Vec<affiliate_referral::Model>> {
  Ok(Json(app.sv().referral.by_affiliate(id, 100).await?))
}

pub async fn price(
  State(app): App,
  Path((id, product_id)): Path<(i32, i32)>,
) -> Reply<PriceQuote> {
  Ok(Json(app.sv().pricing.price(id, product_id).await?))
}

#[derive(Deserialize)]
pub struct SetMarkup {
  markup: i64,
}

pub async fn set_markup(
  State(app): App,
  Path((id, product_id)): Path<(i32, i32)>,
  Json(req): Json<SetMarkup>,
) -> Reply<affiliate_product::Model> {
  let mapping = app
    .sv()
    .pricing
    .create_affiliate_product(id, product_id, req.markup)
    .await?;
  Ok(Json(mapping))
}

pub async fn remove_markup(
  State(app): App,
  Path((id, product_id)): Path<(i32, i32)>,
) -> Reply<Status> {
  app.sv().pricing.deactivate(id, product_id).await?;
  Ok(Json(Status { success: true, msg: None }))
}

pub async fn products(
  State(app): App,
  Path(id): Path<i32>,
) -> Reply<Vec<affiliate_product::Model>> {
  Ok(Json(app.sv().pricing.mappings(id).await?))
}

pub async fn place_order(
  State(app): App,
  Json(req): Json<NewOrder>,
) -> Reply<order::Model> {
  Ok(Json(app.sv().order.place(req).await?))
}

pub async fn get_order(
  State(app): App,
  Path(id): Path<i32>,
) -> Reply<order::Model> {
  Ok(Json(app.sv().order.by_id(id).await?))
}

pub async fn order_items(
  State(app): App,
  Path(id): Path<i32>,
) -> Reply<Vec<order_item::Model>> {
  Ok(Json(app.sv().order.items(id).await?))
}

pub async fn order_job(
  State(app): App,
  Path(id): Path<i32>,
) -> Reply<commission_job::Model> {
  Ok(Json(app.sv().jobs.by_order(id).await?))
}

pub async fn commissions(
  State(app): App,
  Path(order_id): Path<i32>,
) -> Reply<Vec<commission::Model>> {
  Ok(Json(app.sv().commission.by_order(order_id).await?))
}

pub async fn calculate(
  State(app): App,
  Path(order_id): Path<i32>,
) -> Reply<Vec<commission::Model>> {
  Ok(Json(app.sv().commission.calculate_commissions(order_id).await?))
}

#[derive(Deserialize)]
pub struct AffiliateCommission {
  affiliate_id: i32,
  mode: CommissionMode,
}

pub async fn calculate_affiliate(
  State(app): App,
  Path(order_id): Path<i32>,
  Json(req): Json<AffiliateCommission>,
) -> Reply<Option<commission::Model>> {
  let row = app
    .sv()
    .commission
    .calculate_affiliate_commission(order_id, req.affiliate_id, req.mode)
    .await?;
  Ok(Json(row))
}

#[derive(Serialize)]
pub struct Updated {
  updated: u64,
}

pub async fn confirm(
  State(app): App,
  Path(order_id): Path<i32>,
) -> Reply<Updated> {
  let updated = app.sv().commission.confirm_for_order(order_id).await?;
  Ok(Json(Updated { updated }))
}

pub async fn cancel(
  State(app): App,
  Path(order_id): Path<i32>,
) -> Reply<Updated> {
  let updated = app.sv().commission.cancel_for_order(order_id).await?;
  Ok(Json(Updated { updated }))
}

pub async fn commission_stats(
  State(app): App,
  Path(company_id): Path<i64>,
  Query(filter): Query<CommissionFilter>,
) -> Reply<CommissionStats> {
  Ok(Json(app.sv().commission.stats(company_id, filter).await?))
}

#[derive(Deserialize)]
pub struct PayoutRequest {
  amount: i64,
  payment_details: PaymentDetails,
}

pub async fn request_payout(
  State(app): App,
  Path(id): Path<i32>,
  Json(req): Json<PayoutRequest>,
) -> Reply<PayoutAllocation> {
  let alloc = app
    .sv()
    .payout
    .process_payout(id, req.amount, req.payment_details)
    .await?;
  Ok(Json(alloc))
}

pub async fn payouts(
  State(app): App,
  Path(id): Path<i32>,
) -> Reply<Vec<affiliate_payout::Model>> {
  Ok(Json(app.sv().payout.by_affiliate(id).await?))
}

pub async fn settle(
  State(app): App,
  Path(payout_id): Path<i32>,
  Json(req): Json<ExternalSettlement>,
) -> Reply<affiliate_payout::Model> {
  Ok(Json(app.sv().payout.record_external_payout(payout_id, req).await?))
}

pub async fn payout_commissions(
  State(app): App,
  Path(payout_id): Path<i32>,
) -> Reply<Vec<commission::Model>> {
  let sv = app.sv();
  sv.payout.by_id(payout_id).await?;
  Ok(Json(sv.payout.commissions(payout_id).await?))
}

pub async fn stats(
  State(app): App,
  Path(id): Path<i32>,
) -> Reply<AffiliateStats> {
  Ok(Json(app.sv().stats.get(id).await?))
}

pub async fn recompute_stats(
  State(app): App,
  Path(id): Path<i32>,
) -> Reply<AffiliateStats> {
  Ok(Json(app.sv().stats.update_affiliate_stats(id).await?))
}

pub async fn dead_jobs(State(app): App) -> Reply<Vec<commission_job::Model>> {
  Ok(Json(app.sv().jobs.dead_letters().await?))
}

pub async fn requeue_job(
  State(app): App,
  Path(job_id): Path<i32>,
) -> Reply<commission_job::Model> {
  Ok(Json(app.sv().jobs.requeue(job_id).await?))
}
