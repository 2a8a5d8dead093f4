use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use futures_core::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    api::ApiJson,
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use goalcoach_core::coach::{
    ChatMessageInput, ChatReply, CoachConversation, CoachInsight, CoachMessage, CompletionRate,
    ExecuteProposalInput, ExecuteResult, UndoResult,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteActionInput {
    insight_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRateQuery {
    window_days: Option<i64>,
}

async fn get_insight(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Response> {
    match state.coach_service.get_summary(&user_id)? {
        Some(insight) => Ok(Json(insight).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn generate_insight(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<CoachInsight>> {
    let insight = state.coach_service.generate_summary(&user_id).await?;
    Ok(Json(insight))
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<CoachInsight>> {
    let insight = state.coach_service.get_or_generate_summary(&user_id).await?;
    Ok(Json(insight))
}

async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<CoachConversation>>> {
    let conversations = state.coach_service.list_conversations(&user_id)?;
    Ok(Json(conversations))
}

async fn list_messages(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<CoachMessage>>> {
    let messages = state.coach_service.list_messages(&user_id, &id)?;
    Ok(Json(messages))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(input): ApiJson<ChatMessageInput>,
) -> ApiResult<Json<ChatReply>> {
    let reply = state.coach_service.send_chat_message(&user_id, input).await?;
    Ok(Json(reply))
}

#[derive(Serialize)]
struct TokenPayload<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct StreamErrorPayload {
    error: String,
}

fn json_event<T: Serialize>(name: &'static str, payload: &T) -> Option<SseEvent> {
    match SseEvent::default().event(name).json_data(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::error!("Failed to serialize SSE payload for {}: {}", name, err);
            None
        }
    }
}

/// Streams the assistant reply as `token` events, then one `done` event with
/// the persisted reply or one `error` event.
async fn send_message_stream(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(input): ApiJson<ChatMessageInput>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel::<SseEvent>();
    let _ = tx.send(SseEvent::default().comment("stream-open"));

    tokio::spawn(async move {
        let token_tx = tx.clone();
        let on_token = move |token: &str| {
            if let Some(event) = json_event("token", &TokenPayload { token }) {
                let _ = token_tx.send(event);
            }
        };
        let result = state
            .coach_service
            .send_chat_message_stream(&user_id, input, &on_token)
            .await;
        let last = match result {
            Ok(reply) => json_event("done", &reply),
            Err(err) => {
                let (_, message) = ApiError::from(err).status_and_message();
                tracing::warn!("Streamed chat message failed: {}", message);
                json_event("error", &StreamErrorPayload { error: message })
            }
        };
        if let Some(event) = last {
            let _ = tx.send(event);
        }
    });

    let stream =
        tokio_stream::StreamExt::map(UnboundedReceiverStream::new(rx), Ok::<_, Infallible>);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// The body is optional; only delete proposals need `confirmText`.
async fn execute_action(
    Path(proposal_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    body: Bytes,
) -> ApiResult<Json<ExecuteResult>> {
    let input: ExecuteProposalInput = if body.iter().all(u8::is_ascii_whitespace) {
        ExecuteProposalInput::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let result = state
        .coach_service
        .execute_proposal(&user_id, &proposal_id, input.confirm_text)
        .await?;
    Ok(Json(result))
}

async fn undo_action(
    Path(proposal_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<UndoResult>> {
    let result = state
        .coach_service
        .undo_proposal(&user_id, &proposal_id)
        .await?;
    Ok(Json(result))
}

async fn complete_action(
    Path(goal_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(input): ApiJson<CompleteActionInput>,
) -> ApiResult<StatusCode> {
    state
        .coach_service
        .complete_action(&user_id, &goal_id, &input.insight_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn completion_rate(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(query): Query<CompletionRateQuery>,
) -> ApiResult<Json<CompletionRate>> {
    let rate = state
        .coach_service
        .completion_rate(&user_id, query.window_days)?;
    Ok(Json(rate))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/coach/insight", get(get_insight))
        .route("/coach/insight/generate", post(generate_insight))
        .route("/coach/summary", get(get_summary))
        .route("/coach/chat/conversations", get(list_conversations))
        .route("/coach/chat/conversations/{id}/messages", get(list_messages))
        .route("/coach/chat/message", post(send_message))
        .route("/coach/chat/message/stream", post(send_message_stream))
        .route("/coach/chat/actions/{proposal_id}/execute", post(execute_action))
        .route("/coach/chat/actions/{proposal_id}/undo", post(undo_action))
        .route("/coach/actions/{goal_id}/complete", post(complete_action))
        .route("/coach/actions/completion-rate", get(completion_rate))
}
