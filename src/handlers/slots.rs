use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::SlotTime;
use crate::services::availability;
use crate::state::AppState;

// GET /api/slots?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    date: String,
    occupied: Vec<SlotTime>,
    available: Vec<SlotTime>,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let raw = query
        .date
        .ok_or_else(|| AppError::InvalidInput("date is required".to_string()))?;
    let occupied = availability::occupied_slots_on(state.bookings.as_ref(), &raw).await?;
    let date = availability::parse_date(&raw)?;
    let available =
        availability::available_slots(&state.config.schedule, date, &occupied, state.clock.now());

    Ok(Json(SlotsResponse {
        date: date.to_string(),
        occupied: occupied.into_iter().collect(),
        available,
    }))
}
