use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{ApiResponse, TripPlan, TripPlanInput, TripPlanPatch, TripRequirement},
    planner::{TransportRequest, TripPlanner},
    store::PlanStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PlanStore>,
    pub planner: Arc<TripPlanner>,
    pub demo_mode: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate-trip-plan", post(generate_trip_plan).get(service_status))
        .route("/api/suggest-transportation", post(suggest_transportation))
        .route("/api/plans", get(list_plans))
        .route("/api/plans/:id", get(get_plan).put(update_plan).delete(delete_plan))
        .with_state(state)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn service_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "trip-plan-generator",
        "model": state.planner.model_name(),
        "demoMode": state.demo_mode,
        "endpoints": {
            "POST /api/generate-trip-plan": "Generate a trip plan",
            "POST /api/suggest-transportation": "Suggest ways to travel",
            "GET /api/plans": "List stored plans",
            "GET|PUT|DELETE /api/plans/:id": "Read, update or delete a plan"
        }
    }))
}

pub async fn generate_trip_plan(
    State(state): State<AppState>,
    Json(body): Json<TripPlanInput>,
) -> Result<Json<ApiResponse<TripPlan>>, AppError> {
    let requirement = TripRequirement::try_from(body)?;
    tracing::info!("🚀 Generating trip plan: {}", requirement.title);

    let plan = state.planner.generate(&requirement).await;
    state.store.save(plan.clone()).await?;

    let message = if plan.degraded {
        "Trip plan created with placeholder content; please edit it manually"
    } else {
        "Trip plan generated"
    };
    Ok(Json(ApiResponse::ok(plan).with_message(message)))
}

pub async fn suggest_transportation(
    State(state): State<AppState>,
    Json(body): Json<TransportRequest>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let suggestions = state.planner.suggest_transportation(body).await?;
    Ok(Json(ApiResponse::ok(suggestions)))
}

pub async fn list_plans(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TripPlan>>>, AppError> {
    Ok(Json(ApiResponse::ok(state.store.list().await?)))
}

pub async fn get_plan(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TripPlan>>, AppError> {
    let plan = state.store.get(&id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(ApiResponse::ok(plan)))
}

pub async fn update_plan(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(patch): Json<TripPlanPatch>,
) -> Result<Json<ApiResponse<TripPlan>>, AppError> {
    let plan = state.store.update(&id, patch).await?.ok_or(AppError::NotFound)?;
    tracing::info!("✏️ Updated trip plan {}", id);
    Ok(Json(ApiResponse::ok(plan).with_message("Trip plan updated")))
}

pub async fn delete_plan(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    if !state.store.delete(&id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!("🗑️ Deleted trip plan {}", id);
    Ok(Json(ApiResponse::ok(json!({ "id": id })).with_message("Trip plan deleted")))
}
