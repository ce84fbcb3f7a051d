//! Billing endpoints: purchases, pricing and account checks.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use billing::{
    BillingQueries, CouponView, CreditsView, PriceQuote, PriceRequest, PricingEngine,
    PurchaseReceipt, PurchaseSaga, SubscriptionView,
};
use cache::SnapshotCache;
use common::{ProductId, UserId};
use domain::{AccountStore, ProductStore, PurchaseKind, PurchaseRequest};
use events::EventSink;
use provider::BillingProvider;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<St, P, C, K> {
    pub purchase: PurchaseSaga<St, P, K>,
    pub pricing: PricingEngine<C, P, St>,
    pub queries: BillingQueries<St, P>,
}

// -- Request types --

/// Body of `POST /billing/barcodes/buy`.
///
/// Authentication lives upstream; the caller supplies the user id
/// directly.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: PurchaseKind,
    pub index: Option<usize>,
    pub code: Option<String>,
}

/// Body of `POST /billing/calculate-price`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatePriceRequest {
    pub product_id: String,
    pub package_index: Option<usize>,
    pub plan_code: Option<String>,
    pub coupon_code: Option<String>,
}

/// Query string of the account check endpoints.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: String,
}

// -- Handlers --

/// POST /billing/barcodes/buy — run the purchase saga.
pub async fn buy<St, P, C, K>(
    State(state): State<Arc<AppState<St, P, C, K>>>,
    Json(req): Json<BuyRequest>,
) -> Result<Json<PurchaseReceipt>, ApiError>
where
    St: AccountStore + ProductStore + 'static,
    P: BillingProvider + 'static,
    C: SnapshotCache + 'static,
    K: EventSink + 'static,
{
    let user_id = UserId::new(req.user_id);
    let request = PurchaseRequest {
        user_id: user_id.clone(),
        kind: req.kind,
        package_index: req.index,
        plan_code: req.code,
    };

    let receipt = state.purchase.buy(request).await?;
    tracing::info!(%user_id, index = ?req.index, "buy barcodes succeeded");
    Ok(Json(receipt))
}

/// POST /billing/calculate-price — quote a purchase.
pub async fn calculate_price<St, P, C, K>(
    State(state): State<Arc<AppState<St, P, C, K>>>,
    Json(req): Json<CalculatePriceRequest>,
) -> Result<Json<PriceQuote>, ApiError>
where
    St: AccountStore + ProductStore + 'static,
    P: BillingProvider + 'static,
    C: SnapshotCache + 'static,
    K: EventSink + 'static,
{
    let product_id = Uuid::parse_str(&req.product_id)
        .map(ProductId::from_uuid)
        .map_err(|e| {
            ApiError(billing::BillingError::Validation(format!(
                "invalid productId: {e}"
            )))
        })?;

    let quote = state
        .pricing
        .calculate_price(&PriceRequest {
            product_id,
            package_index: req.package_index,
            plan_code: req.plan_code,
            coupon_code: req.coupon_code,
        })
        .await?;
    Ok(Json(quote))
}

/// POST /billing/check/coupon/{code} — validate a coupon code.
pub async fn check_coupon<St, P, C, K>(
    State(state): State<Arc<AppState<St, P, C, K>>>,
    Path(code): Path<String>,
) -> Result<Json<CouponView>, ApiError>
where
    St: AccountStore + ProductStore + 'static,
    P: BillingProvider + 'static,
    C: SnapshotCache + 'static,
    K: EventSink + 'static,
{
    Ok(Json(state.queries.check_coupon(&code).await?))
}

/// GET /billing/check/credits — current wallet balance.
pub async fn check_credits<St, P, C, K>(
    State(state): State<Arc<AppState<St, P, C, K>>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CreditsView>, ApiError>
where
    St: AccountStore + ProductStore + 'static,
    P: BillingProvider + 'static,
    C: SnapshotCache + 'static,
    K: EventSink + 'static,
{
    let user_id = UserId::new(query.user_id);
    Ok(Json(state.queries.check_credits(&user_id).await?))
}

/// GET /billing/check/subscription — current provider subscription.
pub async fn check_subscription<St, P, C, K>(
    State(state): State<Arc<AppState<St, P, C, K>>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<SubscriptionView>, ApiError>
where
    St: AccountStore + ProductStore + 'static,
    P: BillingProvider + 'static,
    C: SnapshotCache + 'static,
    K: EventSink + 'static,
{
    let user_id = UserId::new(query.user_id);
    Ok(Json(state.queries.check_subscription(&user_id).await?))
}
