mod common;

use axum::http::{Method, StatusCode};
use common::{build_test_router, send, USER};
use serde_json::json;

#[tokio::test]
async fn goal_lifecycle_is_scoped_per_user() {
    let (app, _tmp) = build_test_router().await;

    let (status, goal) = send(
        &app,
        Method::POST,
        "/api/v1/goals",
        Some(USER),
        Some(json!({ "title": "Learn guitar" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(goal["status"], "ACTIVE");
    let goal_id = goal["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        Method::POST,
        &format!("/api/v1/goals/{goal_id}/progress"),
        Some(USER),
        Some(json!({ "value": 40, "note": "first chords" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(updated["currentProgress"], 40);
    assert_eq!(updated["progressEvents"][0]["note"], "first chords");

    let (status, fetched) = send(
        &app,
        Method::GET,
        &format!("/api/v1/goals/{goal_id}"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["currentProgress"], 40);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/goals/{goal_id}"),
        Some("someone-else"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_body_uses_error_envelope() {
    let (app, _tmp) = build_test_router().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/goals",
        Some(USER),
        Some(json!({ "details": "no title" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn chat_proposal_executes_once() {
    let (app, _tmp) = build_test_router().await;

    let (status, reply) = send(
        &app,
        Method::POST,
        "/api/v1/coach/chat/message",
        Some(USER),
        Some(json!({ "message": "create a goal called Run a 5k in 30 days" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actions = reply["proposedActions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["type"], "create_goal");
    assert_eq!(actions[0]["status"], "pending");
    let proposal_id = actions[0]["id"].as_str().unwrap().to_string();
    let conversation_id = reply["conversation"]["id"].as_str().unwrap().to_string();

    let execute_uri = format!("/api/v1/coach/chat/actions/{proposal_id}/execute");
    let (status, result) = send(&app, Method::POST, &execute_uri, Some(USER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["resultType"], "goal_created");
    assert_eq!(result["goal"]["title"], "Run a 5k");

    let (status, body) = send(&app, Method::POST, &execute_uri, Some(USER), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, messages) = send(
        &app,
        Method::GET,
        &format!("/api/v1/coach/chat/conversations/{conversation_id}/messages"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["proposedActions"][0]["status"], "executed");
}

#[tokio::test]
async fn delete_needs_confirmation_and_can_be_undone() {
    let (app, _tmp) = build_test_router().await;

    let (_, goal) = send(
        &app,
        Method::POST,
        "/api/v1/goals",
        Some(USER),
        Some(json!({ "title": "Learn Spanish" })),
    )
    .await;
    let goal_id = goal["id"].as_str().unwrap().to_string();

    let (status, reply) = send(
        &app,
        Method::POST,
        "/api/v1/coach/chat/message",
        Some(USER),
        Some(json!({ "message": "I want to delete my goal learn spanish" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let action = &reply["proposedActions"][0];
    assert_eq!(action["type"], "delete_goal");
    assert_eq!(action["riskLevel"], "high");
    let proposal_id = action["id"].as_str().unwrap().to_string();
    let execute_uri = format!("/api/v1/coach/chat/actions/{proposal_id}/execute");

    let (status, _) = send(&app, Method::POST, &execute_uri, Some(USER), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, result) = send(
        &app,
        Method::POST,
        &execute_uri,
        Some(USER),
        Some(json!({ "confirmText": "DELETE" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["resultType"], "goal_deleted");
    assert!(result["undoExpiresAt"].is_string());

    let (status, undone) = send(
        &app,
        Method::POST,
        &format!("/api/v1/coach/chat/actions/{proposal_id}/undo"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(undone["goalId"], goal_id);
    assert_eq!(undone["goal"]["status"], "ACTIVE");
}

#[tokio::test]
async fn insight_summary_and_completion_rate() {
    let (app, _tmp) = build_test_router().await;

    let (status, _) = send(&app, Method::GET, "/api/v1/coach/insight", Some(USER), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, goal) = send(
        &app,
        Method::POST,
        "/api/v1/goals",
        Some(USER),
        Some(json!({ "title": "Ship side project" })),
    )
    .await;
    let goal_id = goal["id"].as_str().unwrap().to_string();

    let (status, insight) =
        send(&app, Method::GET, "/api/v1/coach/summary", Some(USER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["source"], "rules");
    assert_eq!(insight["summary"]["topPriorities"][0]["goalId"], goal_id);
    let insight_id = insight["id"].as_str().unwrap().to_string();

    let (status, cached) = send(&app, Method::GET, "/api/v1/coach/insight", Some(USER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cached["id"], insight_id);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/coach/actions/{goal_id}/complete"),
        Some(USER),
        Some(json!({ "insightId": insight_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, rate) = send(
        &app,
        Method::GET,
        "/api/v1/coach/actions/completion-rate?windowDays=7",
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rate["windowDays"], 7);
    assert_eq!(rate["completedActions"], 1);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/coach/actions/completion-rate?windowDays=0",
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Splits an event-stream body into `(event, data)` pairs, skipping comments.
fn sse_events(body: &str) -> Vec<(String, serde_json::Value)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    name = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data = serde_json::from_str(rest.trim()).ok();
                }
            }
            Some((name?, data?))
        })
        .collect()
}

#[tokio::test]
async fn streamed_chat_emits_tokens_then_reply() {
    let (app, _tmp) = build_test_router().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/coach/chat/message/stream",
        Some(USER),
        Some(json!({ "message": "Please create a goal called Read more books in 30 days" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.as_str().unwrap().to_string();
    assert!(body.starts_with(':') && body.contains("stream-open"));

    let events = sse_events(&body);
    let (last_name, reply) = events.last().unwrap();
    assert_eq!(last_name, "done");
    let streamed: String = events
        .iter()
        .filter(|(name, _)| name == "token")
        .map(|(_, data)| data["token"].as_str().unwrap().to_string())
        .collect();
    assert!(!streamed.is_empty());
    assert_eq!(streamed, reply["assistantMessage"]["content"].as_str().unwrap());
    assert_eq!(reply["proposedActions"].as_array().unwrap().len(), 1);

    let conversation_id = reply["conversation"]["id"].as_str().unwrap();
    let (status, messages) = send(
        &app,
        Method::GET,
        &format!("/api/v1/coach/chat/conversations/{conversation_id}/messages"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn streamed_chat_reports_errors_as_events() {
    let (app, _tmp) = build_test_router().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/coach/chat/message/stream",
        Some(USER),
        Some(json!({ "message": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = sse_events(body.as_str().unwrap());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "error");
    assert_eq!(events[0].1["error"], "Message is required");
}
