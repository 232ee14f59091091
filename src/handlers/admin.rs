use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::services::aggregation::{self, Analytics, BookingView, Overview};
use crate::services::availability::parse_date;
use crate::services::booking;
use crate::state::AppState;
use crate::store::BookingFilter;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

async fn all_views(state: &AppState) -> Result<Vec<BookingView>, AppError> {
    booking::list_views(
        state.bookings.as_ref(),
        state.payments.as_ref(),
        state.memberships.as_ref(),
        state.clock.as_ref(),
        &BookingFilter::default(),
    )
    .await
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub customer_id: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            BookingStatus::parse(s).ok_or_else(|| AppError::InvalidInput(format!("unknown status: {s}")))
        })
        .transpose()?;
    let date = query.date.as_deref().map(parse_date).transpose()?;

    let filter = BookingFilter {
        date,
        customer_id: query.customer_id,
        status,
        limit: Some(query.limit.unwrap_or(50)),
    };
    let views = booking::list_views(
        state.bookings.as_ref(),
        state.payments.as_ref(),
        state.memberships.as_ref(),
        state.clock.as_ref(),
        &filter,
    )
    .await?;

    Ok(Json(views))
}

// DELETE /api/admin/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    booking::delete_booking(state.bookings.as_ref(), &id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/admin/overview
pub async fn get_overview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Overview>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let views = all_views(&state).await?;
    Ok(Json(aggregation::overview(&views, state.clock.now().date())))
}

// GET /api/admin/analytics
#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub top: Option<usize>,
}

pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Analytics>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let views = all_views(&state).await?;
    let top_n = query.top.unwrap_or(state.config.analytics_top_n);
    Ok(Json(aggregation::analytics(&views, top_n)))
}
