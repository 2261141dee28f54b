use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::model::{
    AverageTicketRow, ChannelSummary, DailySummary, DeliveryPerformanceRow, InactiveCustomerRow,
    LowMarginProductRow, PopularProductRow, StoreSummary,
};
use crate::store::traits::AnalyticsStore;

pub type AppState<S> = Arc<S>;

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub const MAX_DAYS: i32 = 365;
pub const MAX_LIMIT: i64 = 100;
const MAX_CHANNEL_LEN: usize = 50;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn internal_error(endpoint: &str, e: anyhow::Error) -> (StatusCode, Json<ErrorResponse>) {
    log::error!("{} failed: {:#}", endpoint, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&e.to_string())),
    )
}

/// Unwrap a query string, turning malformed values into a JSON 400.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, (StatusCode, Json<ErrorResponse>)> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| bad_request(&rejection.body_text()))
}

fn validate_days(name: &str, value: Option<i32>, default: i32) -> Result<i32, (StatusCode, Json<ErrorResponse>)> {
    let days = value.unwrap_or(default);
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(bad_request(&format!(
            "{} must be between 1 and {}",
            name, MAX_DAYS
        )));
    }
    Ok(days)
}

fn validate_limit(value: Option<i64>, default: i64) -> Result<i64, (StatusCode, Json<ErrorResponse>)> {
    let limit = value.unwrap_or(default);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(bad_request(&format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(limit)
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PopularProductsQuery {
    /// Case-insensitive substring of the channel name
    pub channel: Option<String>,
    pub days: Option<i32>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowMarginQuery {
    pub days: Option<i32>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InactiveCustomersQuery {
    pub min_orders: Option<i64>,
    pub inactive_days: Option<i32>,
    pub limit: Option<i64>,
}

pub async fn list_stores<S: AnalyticsStore>(
    State(store): State<AppState<S>>,
) -> ApiResult<Vec<StoreSummary>> {
    store
        .list_stores()
        .await
        .map(Json)
        .map_err(|e| internal_error("list_stores", e))
}

pub async fn list_channels<S: AnalyticsStore>(
    State(store): State<AppState<S>>,
) -> ApiResult<Vec<ChannelSummary>> {
    store
        .list_channels()
        .await
        .map(Json)
        .map_err(|e| internal_error("list_channels", e))
}

pub async fn daily_summary<S: AnalyticsStore>(
    State(store): State<AppState<S>>,
) -> ApiResult<DailySummary> {
    store
        .daily_summary()
        .await
        .map(Json)
        .map_err(|e| internal_error("daily_summary", e))
}

pub async fn popular_products<S: AnalyticsStore>(
    State(store): State<AppState<S>>,
    query: Result<Query<PopularProductsQuery>, QueryRejection>,
) -> ApiResult<Vec<PopularProductRow>> {
    let params = query_params(query)?;
    let channel = params.channel.unwrap_or_else(|| "ifood".to_string());
    let channel = channel.trim();
    if channel.is_empty() || channel.len() > MAX_CHANNEL_LEN {
        return Err(bad_request(&format!(
            "channel must be 1 to {} characters",
            MAX_CHANNEL_LEN
        )));
    }
    let days = validate_days("days", params.days, 30)?;
    let limit = validate_limit(params.limit, 15)?;

    store
        .popular_products(channel, days, limit)
        .await
        .map(Json)
        .map_err(|e| internal_error("popular_products", e))
}

pub async fn average_ticket<S: AnalyticsStore>(
    State(store): State<AppState<S>>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Vec<AverageTicketRow>> {
    let params = query_params(query)?;
    let days = validate_days("days", params.days, 30)?;

    store
        .average_ticket(days)
        .await
        .map(Json)
        .map_err(|e| internal_error("average_ticket", e))
}

pub async fn low_margin_products<S: AnalyticsStore>(
    State(store): State<AppState<S>>,
    query: Result<Query<LowMarginQuery>, QueryRejection>,
) -> ApiResult<Vec<LowMarginProductRow>> {
    let params = query_params(query)?;
    let days = validate_days("days", params.days, 30)?;
    let limit = validate_limit(params.limit, 20)?;

    store
        .low_margin_products(days, limit)
        .await
        .map(Json)
        .map_err(|e| internal_error("low_margin_products", e))
}

pub async fn delivery_performance<S: AnalyticsStore>(
    State(store): State<AppState<S>>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Vec<DeliveryPerformanceRow>> {
    let params = query_params(query)?;
    let days = validate_days("days", params.days, 30)?;

    store
        .delivery_performance(days)
        .await
        .map(Json)
        .map_err(|e| internal_error("delivery_performance", e))
}

pub async fn inactive_customers<S: AnalyticsStore>(
    State(store): State<AppState<S>>,
    query: Result<Query<InactiveCustomersQuery>, QueryRejection>,
) -> ApiResult<Vec<InactiveCustomerRow>> {
    let params = query_params(query)?;
    let min_orders = params.min_orders.unwrap_or(3);
    if min_orders < 1 {
        return Err(bad_request("min_orders must be at least 1"));
    }
    let inactive_days = validate_days("inactive_days", params.inactive_days, 30)?;
    let limit = validate_limit(params.limit, 25)?;

    store
        .inactive_customers(min_orders, inactive_days, limit)
        .await
        .map(Json)
        .map_err(|e| internal_error("inactive_customers", e))
}
