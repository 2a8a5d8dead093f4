use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::{api::ApiJson, auth::CurrentUser, error::ApiResult, main_lib::AppState};
use goalcoach_core::goals::{
    Goal, GoalUpdate, Milestone, MilestoneUpdate, NewGoal, NewMilestone, NewProgressEvent,
};

#[derive(Deserialize)]
struct TagInput {
    name: String,
}

async fn get_goals(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Goal>>> {
    let goals = state.goal_service.get_goals(&user_id)?;
    Ok(Json(goals))
}

async fn get_goal(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<Goal>> {
    let goal = state.goal_service.get_goal(&user_id, &id)?;
    Ok(Json(goal))
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(goal): ApiJson<NewGoal>,
) -> ApiResult<(StatusCode, Json<Goal>)> {
    let g = state.goal_service.create_goal(&user_id, goal).await?;
    Ok((StatusCode::CREATED, Json(g)))
}

async fn update_goal(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(update): ApiJson<GoalUpdate>,
) -> ApiResult<Json<Goal>> {
    let g = state.goal_service.update_goal(&user_id, &id, update).await?;
    Ok(Json(g))
}

async fn log_progress(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(event): ApiJson<NewProgressEvent>,
) -> ApiResult<(StatusCode, Json<Goal>)> {
    let g = state.goal_service.log_progress(&user_id, &id, event).await?;
    Ok((StatusCode::CREATED, Json(g)))
}

async fn add_milestone(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(milestone): ApiJson<NewMilestone>,
) -> ApiResult<(StatusCode, Json<Milestone>)> {
    let m = state
        .goal_service
        .add_milestone(&user_id, &id, milestone)
        .await?;
    Ok((StatusCode::CREATED, Json(m)))
}

async fn update_milestone(
    Path((id, milestone_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(update): ApiJson<MilestoneUpdate>,
) -> ApiResult<Json<Milestone>> {
    let m = state
        .goal_service
        .update_milestone(&user_id, &id, &milestone_id, update)
        .await?;
    Ok(Json(m))
}

async fn add_tag(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(tag): ApiJson<TagInput>,
) -> ApiResult<Json<Goal>> {
    let g = state.goal_service.add_tag(&user_id, &id, &tag.name).await?;
    Ok(Json(g))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/goals", get(get_goals).post(create_goal))
        .route("/goals/{id}", get(get_goal).patch(update_goal))
        .route("/goals/{id}/progress", post(log_progress))
        .route("/goals/{id}/milestones", post(add_milestone))
        .route("/goals/{id}/milestones/{milestone_id}", patch(update_milestone))
        .route("/goals/{id}/tags", post(add_tag))
}
